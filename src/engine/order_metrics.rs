// ==========================================
// 注塑生产管理系统 - 订单合计计算引擎
// ==========================================
// 职责: 按策略与技术快照计算订单合计，并自上而下级联到批次 / 原料明细
// 输入: ProductionOrder + 其全部 ColorBatch
// 输出: 覆写 order.metrics、batch.metrics、material_line.required_mass_kg
// 红线: 每次重算覆写全部派生字段，不做增量失效
// 红线: 负损耗率不截断，需上报
// ==========================================

use crate::config::EngineConfig;
use crate::domain::batch::ColorBatch;
use crate::domain::order::{OrderMetrics, ProductionOrder, TechnicalSnapshot};
use crate::domain::types::ProductionStrategy;
use crate::engine::batch_distribution::BatchDistributor;
use crate::engine::error::{EngineError, EngineResult};
use chrono::{Duration, NaiveDateTime};
use serde::Serialize;
use tracing::instrument;

/// 追加率分级阈值
pub const FULL_RECOVERY_LIMIT: f64 = 0.05;
pub const HALF_RECOVERY_LIMIT: f64 = 0.10;

/// 半额上界（含）的比较容差，0.10 由浮点运算得出时可能为 0.1000000000000001
/// 全额上界 5% 为严格小于，不加容差
const TIER_EPSILON: f64 = 1e-9;

// ==========================================
// 纯公式
// ==========================================

/// 损耗率 = (单模总重 - 单件重 × 模穴) / 单模总重；单模总重为 0 时取 0
pub fn loss_pct(snapshot: &TechnicalSnapshot) -> f64 {
    if snapshot.shot_mass_g > 0.0 {
        (snapshot.shot_mass_g - snapshot.net_shot_mass_g()) / snapshot.shot_mass_g
    } else {
        0.0
    }
}

/// 追加率（分级回收规则）
///
/// - loss < 5%: 全额
/// - 5% ≤ loss ≤ 10%: 半额（两端均含）
/// - loss > 10%: 0
pub fn extra_pct(loss_pct: f64) -> f64 {
    if loss_pct < FULL_RECOVERY_LIMIT {
        loss_pct
    } else if loss_pct <= HALF_RECOVERY_LIMIT + TIER_EPSILON {
        loss_pct * 0.5
    } else {
        0.0
    }
}

/// 预计完工 = 开工时间 + 天数（自然日，允许小数天）；天数 ≤ 0 时无完工时间
pub fn finish_date(start: NaiveDateTime, days: f64) -> Option<NaiveDateTime> {
    if days <= 0.0 || !days.is_finite() {
        return None;
    }
    let millis = (days * 86_400_000.0).round();
    if millis > i64::MAX as f64 {
        return None;
    }
    start.checked_add_signed(Duration::milliseconds(millis as i64))
}

// ==========================================
// 重算报告
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MetricsWarning {
    /// 单件重 × 模穴 > 单模总重
    NegativeLoss { loss_pct: f64 },
    /// 单模总重或周期缺失，工时估算被禁用
    TimeEstimateDisabled,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RecomputeReport {
    pub batch_count: usize,
    pub warnings: Vec<MetricsWarning>,
}

// ==========================================
// OrderMetricsEngine - 订单合计引擎
// ==========================================
pub struct OrderMetricsEngine {
    distributor: BatchDistributor,
    reject_negative_loss: bool,
}

impl OrderMetricsEngine {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            distributor: BatchDistributor::new(config.batch_shot_rounding),
            reject_negative_loss: config.reject_negative_loss,
        }
    }

    /// 计算订单合计（不修改入参）
    pub fn compute(&self, order: &ProductionOrder, batches: &[ColorBatch]) -> OrderMetrics {
        let s = &order.snapshot;

        let loss = loss_pct(s);
        let extra = extra_pct(loss);

        // 生产基准重量
        let base_mass_kg = match order.strategy {
            ProductionStrategy::ByWeight => order.target_mass_kg.unwrap_or(0.0),
            ProductionStrategy::ByQuantity => {
                order.target_dozens.unwrap_or(0.0) * 12.0 * s.unit_mass_g / 1000.0
            }
            ProductionStrategy::ByStock => batches
                .iter()
                .map(|b| b.stock_kg_manual.unwrap_or(0.0))
                .sum(),
        };

        // 打数
        let dozens = match order.strategy {
            ProductionStrategy::ByQuantity => order.target_dozens.unwrap_or(0.0),
            _ if s.unit_mass_g > 0.0 => base_mass_kg * 1000.0 / s.unit_mass_g / 12.0,
            _ => 0.0,
        };

        let extra_mass_kg = base_mass_kg * extra;
        let delivered_mass_kg = base_mass_kg + extra_mass_kg;

        let (mass_with_loss_kg, natural_loss_kg) = if s.shot_mass_g > 0.0 {
            let with_loss = base_mass_kg * (1.0 + loss);
            (with_loss, with_loss - base_mass_kg)
        } else {
            (0.0, 0.0)
        };

        // 工时估算
        let (hours, days) = if s.shot_mass_g > 0.0 && s.cycle_time_s > 0.0 {
            let shots = delivered_mass_kg * 1000.0 / s.shot_mass_g;
            let hours = shots * s.cycle_time_s / 3600.0;
            let days = if s.shift_hours > 0.0 {
                hours / s.shift_hours
            } else {
                0.0
            };
            (hours, days)
        } else {
            (0.0, 0.0)
        };

        OrderMetrics {
            loss_pct: loss,
            extra_pct: extra,
            base_mass_kg,
            dozens,
            total_dozens: dozens.round(),
            extra_mass_kg,
            delivered_mass_kg,
            mass_with_loss_kg,
            natural_loss_kg,
            hours,
            days,
            finish_date: finish_date(s.start_date, days),
            active_batch_count: (batches.len() as u32).max(1),
            color_family: order.resolve_color_family(),
        }
    }

    /// 重算订单并级联到全部批次与原料明细
    ///
    /// # 返回
    /// - Ok(RecomputeReport): 含告警（负损耗率等）
    /// - Err(MalformedSnapshot): 开启 reject_negative_loss 且损耗率为负
    #[instrument(skip(self, order, batches), fields(
        order_no = %order.order_no,
        strategy = %order.strategy,
        batch_count = batches.len()
    ))]
    pub fn recompute(
        &self,
        order: &mut ProductionOrder,
        batches: &mut [ColorBatch],
    ) -> EngineResult<RecomputeReport> {
        let metrics = self.compute(order, batches);
        let mut report = RecomputeReport {
            batch_count: batches.len(),
            warnings: Vec::new(),
        };

        if metrics.loss_pct < 0.0 {
            if self.reject_negative_loss {
                return Err(EngineError::MalformedSnapshot {
                    order_no: order.order_no.clone(),
                    message: format!(
                        "单件重 × 模穴 ({:.3} g) 大于单模总重 ({:.3} g)",
                        order.snapshot.net_shot_mass_g(),
                        order.snapshot.shot_mass_g
                    ),
                });
            }
            tracing::warn!(
                order_no = %order.order_no,
                loss_pct = metrics.loss_pct,
                "损耗率为负: 单件重 × 模穴大于单模总重"
            );
            report.warnings.push(MetricsWarning::NegativeLoss {
                loss_pct: metrics.loss_pct,
            });
        }

        if order.snapshot.shot_mass_g <= 0.0 || order.snapshot.cycle_time_s <= 0.0 {
            report.warnings.push(MetricsWarning::TimeEstimateDisabled);
        }

        order.metrics = metrics;

        // 自上而下: 批次读取已更新的订单合计
        for batch in batches.iter_mut() {
            self.distributor.distribute(order, batch);
        }

        tracing::debug!(
            base_mass_kg = order.metrics.base_mass_kg,
            extra_mass_kg = order.metrics.extra_mass_kg,
            days = order.metrics.days,
            "订单合计已重算"
        );
        Ok(report)
    }
}
