// ==========================================
// 注塑生产管理系统 - 批次分配引擎
// ==========================================
// 职责: 按订单合计计算单个颜色批次的份额、追加、打数、人工工时
// 输入: 已完成重算的订单（读取其派生字段，不重新推导）
// 输出: 更新 ColorBatch.metrics 及其原料明细的需求重量
// 红线: 三个基准重量列只填充与订单策略对应的一列
// ==========================================

use crate::domain::batch::{BaseMassColumn, BatchMetrics, ColorBatch};
use crate::domain::order::ProductionOrder;
use crate::domain::types::{ProductionStrategy, ShotRounding};
use crate::engine::provisioning::MaterialProvisioner;

// ==========================================
// BatchDistributor - 批次分配器
// ==========================================
pub struct BatchDistributor {
    shot_rounding: ShotRounding,
}

impl BatchDistributor {
    pub fn new(shot_rounding: ShotRounding) -> Self {
        Self { shot_rounding }
    }

    /// 计算批次派生指标（纯函数）
    ///
    /// # 参数
    /// - order: 派生字段已更新的订单
    /// - batch: 目标批次（读取手工库存与人数）
    pub fn compute(&self, order: &ProductionOrder, batch: &ColorBatch) -> BatchMetrics {
        let m = &order.metrics;
        let n = m.active_batch_count.max(1) as f64;

        let base_mass = match order.strategy {
            ProductionStrategy::ByQuantity => BaseMassColumn::ByQuantity(m.base_mass_kg / n),
            ProductionStrategy::ByWeight => BaseMassColumn::ByWeight(m.base_mass_kg / n),
            // 库存输入已计入订单合计，不再均分
            ProductionStrategy::ByStock => BaseMassColumn::Stock(batch.stock_kg_manual.unwrap_or(0.0)),
        };

        let extra_mass_kg = m.extra_mass_kg / n;

        let shot_mass_g = order.snapshot.shot_mass_g;
        let shots = if shot_mass_g > 0.0 {
            self.shot_rounding
                .apply((base_mass.kg() + extra_mass_kg) * 1000.0 / shot_mass_g)
        } else {
            0.0
        };

        let labor_hours = m.days * order.snapshot.shift_hours * batch.workers as f64 / n;

        BatchMetrics {
            base_mass: Some(base_mass),
            extra_mass_kg,
            shots,
            labor_hours,
        }
    }

    /// 写回批次派生指标，并级联到原料明细
    pub fn distribute(&self, order: &ProductionOrder, batch: &mut ColorBatch) {
        batch.metrics = self.compute(order, batch);

        let loss_pct = order.metrics.loss_pct;
        for line in batch.materials.iter_mut() {
            MaterialProvisioner::provision(line, &batch.metrics, loss_pct);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order::{OrderMetrics, TechnicalSnapshot};
    use chrono::NaiveDate;

    fn order(strategy: ProductionStrategy, metrics: OrderMetrics) -> ProductionOrder {
        let start = NaiveDate::from_ymd_opt(2026, 4, 6)
            .unwrap()
            .and_hms_opt(7, 0, 0)
            .unwrap();
        ProductionOrder {
            order_no: "OP-200".to_string(),
            product_name: None,
            mold: None,
            machine_code: None,
            created_at: start,
            strategy,
            target_mass_kg: None,
            target_dozens: None,
            snapshot: TechnicalSnapshot {
                unit_mass_g: 50.0,
                cavities: 2,
                shot_mass_g: 110.0,
                cycle_time_s: 30.0,
                shift_hours: 24.0,
                start_date: start,
            },
            product_color_family: None,
            legacy_color_family: None,
            active: true,
            metrics,
        }
    }

    #[test]
    fn test_by_weight_fills_only_weight_column() {
        let o = order(
            ProductionStrategy::ByWeight,
            OrderMetrics {
                base_mass_kg: 300.0,
                extra_mass_kg: 30.0,
                active_batch_count: 3,
                ..Default::default()
            },
        );
        let mut batch = ColorBatch::new("OP-200", 1, "AZUL", 1);
        batch.stock_kg_manual = Some(999.0);
        BatchDistributor::new(ShotRounding::None).distribute(&o, &mut batch);

        assert_eq!(batch.metrics.base_mass, Some(BaseMassColumn::ByWeight(100.0)));
        assert!((batch.metrics.extra_mass_kg - 10.0).abs() < 1e-9);
        assert!((batch.metrics.shots - 110.0 * 1000.0 / 110.0).abs() < 1e-9);
    }

    #[test]
    fn test_by_stock_uses_manual_input_undivided() {
        let o = order(
            ProductionStrategy::ByStock,
            OrderMetrics {
                base_mass_kg: 80.0,
                extra_mass_kg: 0.0,
                active_batch_count: 2,
                ..Default::default()
            },
        );
        let mut batch = ColorBatch::new("OP-200", 1, "VERDE", 1);
        batch.stock_kg_manual = Some(30.0);
        BatchDistributor::new(ShotRounding::None).distribute(&o, &mut batch);
        assert_eq!(batch.metrics.base_mass, Some(BaseMassColumn::Stock(30.0)));
    }

    #[test]
    fn test_labor_hours_split_by_batch_count() {
        let o = order(
            ProductionStrategy::ByWeight,
            OrderMetrics {
                base_mass_kg: 100.0,
                days: 2.0,
                active_batch_count: 4,
                ..Default::default()
            },
        );
        let mut batch = ColorBatch::new("OP-200", 1, "NEGRO", 3);
        BatchDistributor::new(ShotRounding::None).distribute(&o, &mut batch);
        // 2 天 × 24 h × 3 人 / 4 批
        assert!((batch.metrics.labor_hours - 36.0).abs() < 1e-9);
    }

    #[test]
    fn test_shot_rounding_ceil() {
        let o = order(
            ProductionStrategy::ByWeight,
            OrderMetrics {
                base_mass_kg: 1.0,
                active_batch_count: 1,
                ..Default::default()
            },
        );
        let batch = ColorBatch::new("OP-200", 1, "BLANCO", 1);
        let fractional = BatchDistributor::new(ShotRounding::None).compute(&o, &batch);
        let rounded = BatchDistributor::new(ShotRounding::Ceil).compute(&o, &batch);
        assert!((fractional.shots - 1000.0 / 110.0).abs() < 1e-9);
        assert_eq!(rounded.shots, 10.0);
    }

    #[test]
    fn test_zero_shot_mass_gives_zero_shots() {
        let mut o = order(
            ProductionStrategy::ByWeight,
            OrderMetrics {
                base_mass_kg: 10.0,
                active_batch_count: 1,
                ..Default::default()
            },
        );
        o.snapshot.shot_mass_g = 0.0;
        let batch = ColorBatch::new("OP-200", 1, "GRIS", 1);
        assert_eq!(BatchDistributor::new(ShotRounding::Ceil).compute(&o, &batch).shots, 0.0);
    }
}
