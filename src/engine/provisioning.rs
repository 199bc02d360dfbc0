// ==========================================
// 注塑生产管理系统 - 原料 / 色粉备料引擎
// ==========================================
// 职责: 计算批次内每条原料明细的需求重量
// 红线: (1 + 损耗率) 的备料放大与"追加率"是两个独立概念，不得合并
// 红线: 不校验原料配比之和是否为 1.0
// ==========================================

use crate::domain::batch::BatchMetrics;
use crate::domain::recipe::{MaterialLine, PigmentLine};

// ==========================================
// MaterialProvisioner - 原料备料
// ==========================================
pub struct MaterialProvisioner;

impl MaterialProvisioner {
    /// 原料需求重量 (kg) = (批次基准 + 批次追加) × (1 + 损耗率) × 配比
    pub fn required_mass_kg(batch: &BatchMetrics, loss_pct: f64, fraction: f64) -> f64 {
        batch.total_with_extra_kg() * (1.0 + loss_pct) * fraction
    }

    /// 写回一条原料明细
    pub fn provision(line: &mut MaterialLine, batch: &BatchMetrics, loss_pct: f64) {
        line.required_mass_kg = Self::required_mass_kg(batch, loss_pct, line.fraction);
    }
}

// ==========================================
// PigmentProvisioner - 色粉备料
// ==========================================
// 剂量为每批固定克数，不随批次重量缩放
pub struct PigmentProvisioner;

impl PigmentProvisioner {
    pub fn dose_g(line: &PigmentLine) -> f64 {
        line.dose_g
    }
}
