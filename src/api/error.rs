// ==========================================
// 注塑生产管理系统 - API层错误类型
// ==========================================
// 职责: 定义API层错误类型，转换Repository / Engine 错误为用户可读的错误消息
// ==========================================

use crate::engine::error::EngineError;
use crate::repository::error::RepositoryError;
use thiserror::Error;

/// API层错误类型
#[derive(Error, Debug)]
pub enum ApiError {
    // ==========================================
    // 业务规则错误
    // ==========================================
    #[error("无效输入: {0}")]
    InvalidInput(String),

    #[error("资源未找到: {0}")]
    NotFound(String),

    #[error("业务规则违反: {0}")]
    BusinessRuleViolation(String),

    /// 订单已关闭，不允许新增 / 修改登记
    #[error("订单已关闭: order_no={0}")]
    OrderClosed(String),

    /// 策略取值不认识（配置错误）
    #[error("未知的生产策略: {0}")]
    UnknownStrategy(String),

    /// 技术快照不合法
    #[error("技术快照异常: {0}")]
    MalformedSnapshot(String),

    // ==========================================
    // 数据访问错误
    // ==========================================
    #[error("数据库错误: {0}")]
    DatabaseError(String),

    #[error("数据库连接失败: {0}")]
    DatabaseConnectionError(String),

    #[error("数据库事务失败: {0}")]
    DatabaseTransactionError(String),

    // ==========================================
    // 通用错误
    // ==========================================
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// ==========================================
// 从 RepositoryError 转换
// ==========================================
impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound { entity, id } => {
                ApiError::NotFound(format!("{}(id={})不存在", entity, id))
            }
            RepositoryError::LockError(msg) => {
                ApiError::DatabaseConnectionError(format!("数据库锁获取失败: {}", msg))
            }
            RepositoryError::DatabaseTransactionError(msg) => {
                ApiError::DatabaseTransactionError(msg)
            }
            RepositoryError::DatabaseQueryError(msg) => ApiError::DatabaseError(msg),
            RepositoryError::UniqueConstraintViolation(msg) => {
                ApiError::BusinessRuleViolation(format!("唯一约束违反: {}", msg))
            }
            RepositoryError::ForeignKeyViolation(msg) => {
                ApiError::BusinessRuleViolation(format!("外键约束违反: {}", msg))
            }
            RepositoryError::FieldValueError { field, message } => {
                ApiError::DatabaseError(format!("字段{}错误: {}", field, message))
            }
            RepositoryError::Other(err) => ApiError::Other(err),
        }
    }
}

// ==========================================
// 从 EngineError 转换
// ==========================================
impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::UnknownStrategy(value) => ApiError::UnknownStrategy(value),
            e @ EngineError::MalformedSnapshot { .. } => ApiError::MalformedSnapshot(e.to_string()),
        }
    }
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repository_not_found_maps_to_not_found() {
        let err: ApiError = RepositoryError::not_found("ProductionOrder", "OP-9").into();
        match err {
            ApiError::NotFound(msg) => assert!(msg.contains("OP-9")),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_engine_unknown_strategy_is_preserved() {
        let err: ApiError = EngineError::UnknownStrategy("POR_PESO".to_string()).into();
        assert!(matches!(err, ApiError::UnknownStrategy(v) if v == "POR_PESO"));
    }
}
