// ==========================================
// 注塑生产管理系统 - 领域模型层
// ==========================================
// 职责: 定义领域实体、类型
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod batch;
pub mod order;
pub mod recipe;
pub mod register;
pub mod status_history;
pub mod types;

// 重导出核心类型
pub use batch::{BaseMassColumn, BatchMetrics, ColorBatch};
pub use order::{OrderMetrics, ProductionOrder, TechnicalSnapshot, TechnicalSnapshotPatch};
pub use recipe::{MaterialLine, PigmentLine};
pub use register::{DailyRegister, HourlyDetail, RegisterSnapshot, RegisterTotals, WeighIn};
pub use status_history::{OrderStatusChange, StatusAction};
pub use types::{MassSource, MaterialKind, ProductionStrategy, ShotRounding, UnknownVariantError};
