// ==========================================
// 注塑生产管理系统 - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================
// 职责: 提供数据访问接口,屏蔽数据库细节
// 约束: 所有查询使用参数化,防止 SQL 注入
// 约束: 写操作通过 UnitOfWork 在单一事务内完成
// ==========================================

pub mod error;
pub mod order_repo;
pub mod register_repo;
pub mod status_history_repo;
pub mod unit_of_work;

// 重导出核心仓储
pub use error::{RepositoryError, RepositoryResult};
pub use order_repo::OrderRepository;
pub use register_repo::RegisterRepository;
pub use status_history_repo::StatusHistoryRepository;
pub use unit_of_work::{TxScope, UnitOfWork};
