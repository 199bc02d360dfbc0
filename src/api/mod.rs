// ==========================================
// 注塑生产管理系统 - API 层
// ==========================================
// 职责: 提供业务 API 接口（仓储 + 引擎在同一事务内组合）
// ==========================================

pub mod error;
pub mod order_api;
pub mod register_api;
pub mod validator;

// 重导出核心类型
pub use error::{ApiError, ApiResult};
pub use order_api::{
    BatchInput, BatchSummary, CreateOrderRequest, MaterialInput, OrderApi, OrderSummary,
    PigmentInput,
};
pub use register_api::{
    CreateRegisterRequest, HourlyDetailInput, RegisterApi, RegisterMassChange, RegisterView,
    SyncItemResult, SyncReport, SyncWeighInItem, WeighInInput,
};
