// ==========================================
// 注塑生产管理系统 - 领域类型定义
// ==========================================
// 职责: 生产策略、物料类别、打数取整策略、产出重量来源
// 序列化格式: SCREAMING_SNAKE_CASE (与数据库一致)
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// 未知的枚举取值（配置错误，必须快速失败）
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("未知的{kind}取值: {value}")]
pub struct UnknownVariantError {
    pub kind: &'static str,
    pub value: String,
}

impl UnknownVariantError {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

// ==========================================
// 生产策略 (Production Strategy)
// ==========================================
// 红线: 不认识的策略不允许默认为任何一种
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProductionStrategy {
    ByWeight,   // 按重量
    ByQuantity, // 按数量（打）
    ByStock,    // 补齐库存（各批次手工输入）
}

impl ProductionStrategy {
    pub fn to_db_str(&self) -> &'static str {
        match self {
            ProductionStrategy::ByWeight => "BY_WEIGHT",
            ProductionStrategy::ByQuantity => "BY_QUANTITY",
            ProductionStrategy::ByStock => "BY_STOCK",
        }
    }
}

impl fmt::Display for ProductionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

impl FromStr for ProductionStrategy {
    type Err = UnknownVariantError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "BY_WEIGHT" => Ok(ProductionStrategy::ByWeight),
            "BY_QUANTITY" => Ok(ProductionStrategy::ByQuantity),
            "BY_STOCK" => Ok(ProductionStrategy::ByStock),
            _ => Err(UnknownVariantError::new("生产策略", s)),
        }
    }
}

// ==========================================
// 原料类别 (Material Kind)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MaterialKind {
    Virgin,  // 新料
    Regrind, // 回料（二次料）
}

impl MaterialKind {
    pub fn to_db_str(&self) -> &'static str {
        match self {
            MaterialKind::Virgin => "VIRGIN",
            MaterialKind::Regrind => "REGRIND",
        }
    }
}

impl fmt::Display for MaterialKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

impl FromStr for MaterialKind {
    type Err = UnknownVariantError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "VIRGIN" => Ok(MaterialKind::Virgin),
            "REGRIND" => Ok(MaterialKind::Regrind),
            _ => Err(UnknownVariantError::new("原料类别", s)),
        }
    }
}

// ==========================================
// 批次打数取整策略 (Shot Rounding)
// ==========================================
// 说明: 历史版本曾向上取整，当前默认保留小数
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ShotRounding {
    None, // 保留小数
    Ceil, // 向上取整
}

impl ShotRounding {
    pub fn apply(&self, shots: f64) -> f64 {
        match self {
            ShotRounding::None => shots,
            ShotRounding::Ceil => shots.ceil(),
        }
    }
}

impl fmt::Display for ShotRounding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShotRounding::None => write!(f, "NONE"),
            ShotRounding::Ceil => write!(f, "CEIL"),
        }
    }
}

impl FromStr for ShotRounding {
    type Err = UnknownVariantError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "NONE" => Ok(ShotRounding::None),
            "CEIL" => Ok(ShotRounding::Ceil),
            _ => Err(UnknownVariantError::new("打数取整策略", s)),
        }
    }
}

// ==========================================
// 班次产出重量来源 (Mass Source)
// ==========================================
// 优先级: 实测称重 > 登记快照理论值 > 订单当前理论值 > 无
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MassSource {
    WeighIn,
    SnapshotTheoretical,
    OrderTheoretical,
    Unavailable,
}

impl MassSource {
    pub fn to_db_str(&self) -> &'static str {
        match self {
            MassSource::WeighIn => "WEIGH_IN",
            MassSource::SnapshotTheoretical => "SNAPSHOT_THEORETICAL",
            MassSource::OrderTheoretical => "ORDER_THEORETICAL",
            MassSource::Unavailable => "UNAVAILABLE",
        }
    }
}

impl fmt::Display for MassSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

impl FromStr for MassSource {
    type Err = UnknownVariantError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "WEIGH_IN" => Ok(MassSource::WeighIn),
            "SNAPSHOT_THEORETICAL" => Ok(MassSource::SnapshotTheoretical),
            "ORDER_THEORETICAL" => Ok(MassSource::OrderTheoretical),
            "UNAVAILABLE" => Ok(MassSource::Unavailable),
            _ => Err(UnknownVariantError::new("重量来源", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strategy_round_trip_db_str() {
        for s in [
            ProductionStrategy::ByWeight,
            ProductionStrategy::ByQuantity,
            ProductionStrategy::ByStock,
        ] {
            assert_eq!(s.to_db_str().parse::<ProductionStrategy>().unwrap(), s);
        }
    }

    #[test]
    fn test_strategy_unknown_value_rejected() {
        let err = "POR_PESO".parse::<ProductionStrategy>().unwrap_err();
        assert_eq!(err.value, "POR_PESO");
        assert!("".parse::<ProductionStrategy>().is_err());
    }

    #[test]
    fn test_strategy_parse_is_case_insensitive() {
        assert_eq!(
            " by_stock ".parse::<ProductionStrategy>().unwrap(),
            ProductionStrategy::ByStock
        );
    }

    #[test]
    fn test_shot_rounding_apply() {
        assert_eq!(ShotRounding::None.apply(10.2), 10.2);
        assert_eq!(ShotRounding::Ceil.apply(10.2), 11.0);
        assert_eq!(ShotRounding::Ceil.apply(10.0), 10.0);
    }
}
