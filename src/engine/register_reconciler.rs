// ==========================================
// 注塑生产管理系统 - 班次登记对账引擎
// ==========================================
// 职责: 按"最佳可用证据"计算班次总打数、件数、产出重量
// 优先级: 实测称重 > 登记快照理论值 > 订单当前理论值 > 0
// 红线: 实测称重合计 > 0 时，产出重量必须等于实测合计
// ==========================================

use crate::domain::register::{DailyRegister, HourlyDetail, RegisterSnapshot, RegisterTotals, WeighIn};
use crate::domain::types::MassSource;
use serde::Serialize;
use tracing::instrument;

/// 订单当前技术参数（登记快照不完整时的兜底）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LiveOrderValues {
    pub shot_mass_g: f64,
    pub cavities: u32,
}

/// 称重校验结果
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeightValidation {
    pub register_id: String,
    pub measured_kg: f64,
    pub theoretical_kg: f64,
    pub difference_kg: f64,
    pub tolerance_kg: f64,
    pub matches: bool,
}

// ==========================================
// DailyRegisterReconciler - 班次对账
// ==========================================
pub struct DailyRegisterReconciler {
    tolerance_kg: f64,
}

impl DailyRegisterReconciler {
    pub fn new(tolerance_kg: f64) -> Self {
        Self { tolerance_kg }
    }

    /// 总打数: 计数器差值为正时取差值，否则取小时明细合计（计数器清零 / 无计数器）
    ///
    /// 件数与合计均饱和运算，超界输入由 API 层拒绝
    pub fn total_shots(register: &DailyRegister, details: &[HourlyDetail]) -> i64 {
        let diff = register.end_counter.saturating_sub(register.start_counter);
        if diff > 0 {
            diff
        } else {
            details.iter().fold(0i64, |acc, d| acc.saturating_add(d.shots))
        }
    }

    /// 小时明细派生值: (件数, 重量 kg)
    pub fn detail_values(snapshot: &RegisterSnapshot, shots: i64) -> (i64, f64) {
        let pieces = shots.saturating_mul(snapshot.cavities as i64);
        let mass_kg = shots as f64 * snapshot.net_shot_mass_g() / 1000.0;
        (pieces, mass_kg)
    }

    /// 理论单模总重 (g) 及其来源
    fn theoretical_shot_mass(
        snapshot: &RegisterSnapshot,
        live: Option<LiveOrderValues>,
    ) -> (f64, MassSource) {
        let snap = snapshot.shot_mass_g();
        if snap > 0.0 {
            return (snap, MassSource::SnapshotTheoretical);
        }
        match live {
            Some(v) if v.shot_mass_g > 0.0 => (v.shot_mass_g, MassSource::OrderTheoretical),
            _ => (0.0, MassSource::Unavailable),
        }
    }

    /// 计算班次合计
    #[instrument(skip_all, fields(register_id = %register.register_id))]
    pub fn reconcile(
        &self,
        register: &DailyRegister,
        details: &[HourlyDetail],
        weigh_ins: &[WeighIn],
        live: Option<LiveOrderValues>,
    ) -> RegisterTotals {
        let total_shots = Self::total_shots(register, details);

        let cavities = if register.snapshot.cavities > 0 {
            register.snapshot.cavities
        } else {
            live.map(|v| v.cavities).unwrap_or(0)
        };
        let total_pieces = total_shots.saturating_mul(cavities as i64);

        let measured: f64 = weigh_ins.iter().map(|w| w.mass_kg).sum();
        if measured > 0.0 {
            return RegisterTotals {
                total_shots,
                total_pieces,
                output_mass_kg: measured,
                mass_source: MassSource::WeighIn,
            };
        }

        let (shot_mass_g, source) = Self::theoretical_shot_mass(&register.snapshot, live);
        if source == MassSource::OrderTheoretical {
            tracing::warn!(
                order_no = %register.order_no,
                "登记快照单模重量为 0，使用订单当前单模总重"
            );
        }

        RegisterTotals {
            total_shots,
            total_pieces,
            output_mass_kg: total_shots as f64 * shot_mass_g / 1000.0,
            mass_source: source,
        }
    }

    /// 称重校验: 实测合计 vs 理论合计
    pub fn validate_weight(
        &self,
        register: &DailyRegister,
        details: &[HourlyDetail],
        weigh_ins: &[WeighIn],
        live: Option<LiveOrderValues>,
    ) -> WeightValidation {
        let total_shots = Self::total_shots(register, details);
        let (shot_mass_g, _) = Self::theoretical_shot_mass(&register.snapshot, live);

        let measured_kg: f64 = weigh_ins.iter().map(|w| w.mass_kg).sum();
        let theoretical_kg = total_shots as f64 * shot_mass_g / 1000.0;
        let difference_kg = measured_kg - theoretical_kg;
        let matches = difference_kg.abs() <= self.tolerance_kg;

        if !matches {
            tracing::warn!(
                register_id = %register.register_id,
                measured_kg,
                theoretical_kg,
                difference_kg,
                "实测重量与理论重量不符"
            );
        }

        WeightValidation {
            register_id: register.register_id.clone(),
            measured_kg,
            theoretical_kg,
            difference_kg,
            tolerance_kg: self.tolerance_kg,
            matches,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn register(start: i64, end: i64, snapshot: RegisterSnapshot) -> DailyRegister {
        let date = NaiveDate::from_ymd_opt(2026, 5, 11).unwrap();
        DailyRegister {
            register_id: "R-1".to_string(),
            order_no: "OP-7".to_string(),
            machine_code: "INY-02".to_string(),
            production_date: date,
            shift: "MAÑANA".to_string(),
            start_time: Some("06:00".to_string()),
            operator: None,
            start_counter: start,
            end_counter: end,
            snapshot,
            totals: RegisterTotals::default(),
            created_at: date.and_hms_opt(6, 0, 0).unwrap(),
        }
    }

    fn snap() -> RegisterSnapshot {
        RegisterSnapshot {
            cavities: 2,
            unit_mass_g: 50.0,
            runner_mass_g: 0.0,
        }
    }

    fn detail(shots: i64) -> HourlyDetail {
        HourlyDetail {
            detail_id: format!("D-{}", shots),
            register_id: "R-1".to_string(),
            seq_no: 1,
            hour_label: "07:00".to_string(),
            operator: None,
            color: None,
            shots,
            pieces: 0,
            mass_kg: 0.0,
        }
    }

    fn weigh(kg: f64) -> WeighIn {
        WeighIn {
            weigh_in_id: format!("W-{}", kg),
            register_id: "R-1".to_string(),
            mass_kg: kg,
            color: None,
            weighed_at: NaiveDate::from_ymd_opt(2026, 5, 11)
                .unwrap()
                .and_hms_opt(9, 30, 0)
                .unwrap(),
        }
    }

    fn reconciler() -> DailyRegisterReconciler {
        DailyRegisterReconciler::new(5.0)
    }

    #[test]
    fn test_extreme_counts_saturate() {
        let mut wide = snap();
        wide.cavities = u32::MAX;
        let r = register(0, i64::MAX, wide);
        let totals = reconciler().reconcile(&r, &[], &[], None);
        assert_eq!(totals.total_shots, i64::MAX);
        assert_eq!(totals.total_pieces, i64::MAX);

        let reset = register(10, 0, wide);
        let totals = reconciler().reconcile(&reset, &[detail(i64::MAX), detail(1)], &[], None);
        assert_eq!(totals.total_shots, i64::MAX);

        let (pieces, _) = DailyRegisterReconciler::detail_values(&wide, i64::MAX);
        assert_eq!(pieces, i64::MAX);
    }

    #[test]
    fn test_counters_take_precedence_over_details() {
        let r = register(1000, 1100, snap());
        let totals = reconciler().reconcile(&r, &[detail(40)], &[], None);
        assert_eq!(totals.total_shots, 100);
        assert_eq!(totals.total_pieces, 200);
        assert!((totals.output_mass_kg - 10.0).abs() < 1e-9);
        assert_eq!(totals.mass_source, MassSource::SnapshotTheoretical);
    }

    #[test]
    fn test_counter_reset_falls_back_to_details() {
        let r = register(9990, 15, snap());
        let totals = reconciler().reconcile(&r, &[detail(30), detail(45)], &[], None);
        assert_eq!(totals.total_shots, 75);
    }

    #[test]
    fn test_weigh_ins_win_over_theoretical() {
        let r = register(0, 100, snap());
        let totals = reconciler().reconcile(&r, &[], &[weigh(4.5), weigh(20.0)], None);
        assert!((totals.output_mass_kg - 24.5).abs() < 1e-9);
        assert_eq!(totals.mass_source, MassSource::WeighIn);
    }

    #[test]
    fn test_incomplete_snapshot_uses_live_order() {
        let empty = RegisterSnapshot {
            cavities: 0,
            unit_mass_g: 0.0,
            runner_mass_g: 0.0,
        };
        let r = register(0, 10, empty);
        let live = LiveOrderValues {
            shot_mass_g: 200.0,
            cavities: 4,
        };
        let totals = reconciler().reconcile(&r, &[], &[], Some(live));
        assert!((totals.output_mass_kg - 2.0).abs() < 1e-9);
        assert_eq!(totals.total_pieces, 40);
        assert_eq!(totals.mass_source, MassSource::OrderTheoretical);

        let unavailable = reconciler().reconcile(&r, &[], &[], None);
        assert_eq!(unavailable.output_mass_kg, 0.0);
        assert_eq!(unavailable.mass_source, MassSource::Unavailable);
    }

    #[test]
    fn test_runner_included_in_theoretical_mass() {
        let s = RegisterSnapshot {
            cavities: 2,
            unit_mass_g: 50.0,
            runner_mass_g: 10.0,
        };
        let totals = reconciler().reconcile(&register(0, 100, s), &[], &[], None);
        assert!((totals.output_mass_kg - 11.0).abs() < 1e-9);
    }

    #[test]
    fn test_validate_weight_within_tolerance() {
        let r = register(0, 100, snap());
        let ok = reconciler().validate_weight(&r, &[], &[weigh(4.5), weigh(5.5)], None);
        assert!((ok.theoretical_kg - 10.0).abs() < 1e-9);
        assert!((ok.measured_kg - 10.0).abs() < 1e-9);
        assert!(ok.matches);

        let off = reconciler().validate_weight(
            &r,
            &[],
            &[weigh(4.5), weigh(5.5), weigh(20.0)],
            None,
        );
        assert!((off.difference_kg - 20.0).abs() < 1e-9);
        assert!(!off.matches);
    }

    #[test]
    fn test_detail_values_use_net_mass() {
        let s = RegisterSnapshot {
            cavities: 4,
            unit_mass_g: 25.0,
            runner_mass_g: 8.0,
        };
        let (pieces, kg) = DailyRegisterReconciler::detail_values(&s, 60);
        assert_eq!(pieces, 240);
        assert!((kg - 6.0).abs() < 1e-9);
    }
}
