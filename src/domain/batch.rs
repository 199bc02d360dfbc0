// ==========================================
// 注塑生产管理系统 - 颜色批次领域模型
// ==========================================
// 红线: 三个基准重量列同一时刻只有一个有值，由订单策略决定
// ==========================================

use crate::domain::recipe::{MaterialLine, PigmentLine};
use crate::domain::types::ProductionStrategy;
use serde::{Deserialize, Serialize};

// ==========================================
// BaseMassColumn - 批次基准重量（按策略区分的判别视图）
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "column", content = "kg", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BaseMassColumn {
    ByQuantity(f64), // 订单基准 / 批次数
    ByWeight(f64),   // 订单基准 / 批次数
    Stock(f64),      // 批次手工库存输入
}

impl BaseMassColumn {
    pub fn kg(&self) -> f64 {
        match self {
            BaseMassColumn::ByQuantity(v)
            | BaseMassColumn::ByWeight(v)
            | BaseMassColumn::Stock(v) => *v,
        }
    }

    pub fn strategy(&self) -> ProductionStrategy {
        match self {
            BaseMassColumn::ByQuantity(_) => ProductionStrategy::ByQuantity,
            BaseMassColumn::ByWeight(_) => ProductionStrategy::ByWeight,
            BaseMassColumn::Stock(_) => ProductionStrategy::ByStock,
        }
    }

    /// 拆分为持久化的三列 (by_quantity, by_weight, stock)
    pub fn to_columns(&self) -> (Option<f64>, Option<f64>, Option<f64>) {
        match *self {
            BaseMassColumn::ByQuantity(v) => (Some(v), None, None),
            BaseMassColumn::ByWeight(v) => (None, Some(v), None),
            BaseMassColumn::Stock(v) => (None, None, Some(v)),
        }
    }

    /// 从持久化的三列还原
    ///
    /// # 返回
    /// - Ok(None): 尚未计算（三列均为空）
    /// - Ok(Some(..)): 恰有一列有值
    /// - Err(..): 多列同时有值（数据被破坏）
    pub fn from_columns(
        by_quantity: Option<f64>,
        by_weight: Option<f64>,
        stock: Option<f64>,
    ) -> Result<Option<Self>, String> {
        match (by_quantity, by_weight, stock) {
            (None, None, None) => Ok(None),
            (Some(v), None, None) => Ok(Some(BaseMassColumn::ByQuantity(v))),
            (None, Some(v), None) => Ok(Some(BaseMassColumn::ByWeight(v))),
            (None, None, Some(v)) => Ok(Some(BaseMassColumn::Stock(v))),
            _ => Err(format!(
                "基准重量列冲突: by_quantity={:?}, by_weight={:?}, stock={:?}",
                by_quantity, by_weight, stock
            )),
        }
    }
}

// ==========================================
// BatchMetrics - 批次派生指标
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchMetrics {
    pub base_mass: Option<BaseMassColumn>,
    pub extra_mass_kg: f64,
    pub shots: f64,
    pub labor_hours: f64,
}

impl BatchMetrics {
    pub fn base_mass_kg(&self) -> f64 {
        self.base_mass.map(|b| b.kg()).unwrap_or(0.0)
    }

    /// 基准 + 追加 (kg)
    pub fn total_with_extra_kg(&self) -> f64 {
        self.base_mass_kg() + self.extra_mass_kg
    }
}

// ==========================================
// ColorBatch - 颜色批次
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColorBatch {
    pub batch_id: String,
    pub order_no: String,
    pub seq_no: i32,
    pub color_name: String,
    pub stock_kg_manual: Option<f64>, // 仅 BY_STOCK 使用
    pub workers: u32,
    pub metrics: BatchMetrics,
    pub materials: Vec<MaterialLine>,
    pub pigments: Vec<PigmentLine>,
}

impl ColorBatch {
    pub fn new(order_no: &str, seq_no: i32, color_name: &str, workers: u32) -> Self {
        Self {
            batch_id: uuid::Uuid::new_v4().to_string(),
            order_no: order_no.to_string(),
            seq_no,
            color_name: color_name.to_string(),
            stock_kg_manual: None,
            workers,
            metrics: BatchMetrics::default(),
            materials: Vec::new(),
            pigments: Vec::new(),
        }
    }
}
