// ==========================================
// 注塑生产管理系统 - 核心库
// ==========================================
// 职责: 生产订单计算、批次分摊、原料备料、班次登记对账
// 技术栈: Rust + SQLite
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 引擎层 - 业务规则
pub mod engine;

// 配置层 - 系统配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA/建表）
pub mod db;

// 日志系统
pub mod logging;

// API 层 - 业务接口
pub mod api;

// 应用层 - 共享状态
pub mod app;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{MassSource, MaterialKind, ProductionStrategy, ShotRounding};

// 领域实体
pub use domain::{
    ColorBatch, DailyRegister, HourlyDetail, MaterialLine, OrderStatusChange, PigmentLine,
    ProductionOrder, TechnicalSnapshot, WeighIn,
};

// 引擎
pub use engine::{
    BatchDistributor, DailyRegisterReconciler, MaterialProvisioner, OrderMetricsEngine,
    PigmentProvisioner,
};

// API
pub use api::{ApiError, OrderApi, RegisterApi};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "注塑生产管理系统";
