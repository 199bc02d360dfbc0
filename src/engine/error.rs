// ==========================================
// 注塑生产管理系统 - 引擎层错误类型
// ==========================================
// 工具: thiserror 派生宏
// ==========================================

use crate::domain::types::{ProductionStrategy, UnknownVariantError};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    /// 不认识的生产策略（配置错误，不允许默认为任何一种）
    #[error("未知的生产策略: {0}")]
    UnknownStrategy(String),

    /// 技术快照不合法（仅在开启 reject_negative_loss 时出现）
    #[error("技术快照异常 (order_no={order_no}): {message}")]
    MalformedSnapshot { order_no: String, message: String },
}

/// Result 类型别名
pub type EngineResult<T> = Result<T, EngineError>;

/// 解析外部输入的策略字符串
pub fn parse_strategy(raw: &str) -> EngineResult<ProductionStrategy> {
    raw.parse::<ProductionStrategy>()
        .map_err(|e: UnknownVariantError| EngineError::UnknownStrategy(e.value))
}
