// ==========================================
// 注塑生产管理系统 - 班次生产登记领域模型
// ==========================================
// 红线: 登记快照（模穴/单重/流道）在创建时复制，之后不随订单变化
// 红线: 有实测称重时，实测值优先于理论值
// ==========================================

use crate::domain::types::MassSource;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

// ==========================================
// RegisterSnapshot - 登记技术快照
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegisterSnapshot {
    pub cavities: u32,
    pub unit_mass_g: f64,
    pub runner_mass_g: f64,
}

impl RegisterSnapshot {
    /// 单模净重 (g)
    pub fn net_shot_mass_g(&self) -> f64 {
        self.unit_mass_g * self.cavities as f64
    }

    /// 单模总重 (g) = 单件 × 模穴 + 流道
    pub fn shot_mass_g(&self) -> f64 {
        self.net_shot_mass_g() + self.runner_mass_g
    }
}

// ==========================================
// RegisterTotals - 登记派生合计
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegisterTotals {
    pub total_shots: i64,
    pub total_pieces: i64,
    pub output_mass_kg: f64,
    pub mass_source: MassSource,
}

impl Default for RegisterTotals {
    fn default() -> Self {
        Self {
            total_shots: 0,
            total_pieces: 0,
            output_mass_kg: 0.0,
            mass_source: MassSource::Unavailable,
        }
    }
}

// ==========================================
// DailyRegister - 班次生产登记
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyRegister {
    pub register_id: String,
    pub order_no: String,
    pub machine_code: String,
    pub production_date: NaiveDate,
    pub shift: String,
    pub start_time: Option<String>,
    pub operator: Option<String>,

    // ===== 计数器 =====
    pub start_counter: i64,
    pub end_counter: i64,

    // ===== 快照 =====
    pub snapshot: RegisterSnapshot,

    // ===== 派生合计 =====
    pub totals: RegisterTotals,

    pub created_at: NaiveDateTime,
}

// ==========================================
// HourlyDetail - 小时明细
// ==========================================
// 计数器不可用（清零/无计数器）时，作为总打数来源
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourlyDetail {
    pub detail_id: String,
    pub register_id: String,
    pub seq_no: i32,
    pub hour_label: String,
    pub operator: Option<String>,
    pub color: Option<String>,
    pub shots: i64,
    pub pieces: i64,  // 派生: 打数 × 模穴
    pub mass_kg: f64, // 派生: 打数 × 单模净重 / 1000
}

// ==========================================
// WeighIn - 实测称重（单包）
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeighIn {
    pub weigh_in_id: String,
    pub register_id: String,
    pub mass_kg: f64,
    pub color: Option<String>,
    pub weighed_at: NaiveDateTime,
}
