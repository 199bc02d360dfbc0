// ==========================================
// 注塑生产管理系统 - 引擎层
// ==========================================
// 红线: 引擎只做计算，不拼 SQL、不读配置表
// ==========================================
// 级联顺序: OrderMetricsEngine → BatchDistributor → Material/PigmentProvisioner
// 独立引擎: DailyRegisterReconciler（只读登记快照）
// ==========================================

pub mod batch_distribution;
pub mod error;
pub mod order_metrics;
pub mod provisioning;
pub mod register_reconciler;

// 重导出核心引擎
pub use batch_distribution::BatchDistributor;
pub use error::{parse_strategy, EngineError, EngineResult};
pub use order_metrics::{extra_pct, loss_pct, MetricsWarning, OrderMetricsEngine, RecomputeReport};
pub use provisioning::{MaterialProvisioner, PigmentProvisioner};
pub use register_reconciler::{DailyRegisterReconciler, LiveOrderValues, WeightValidation};
