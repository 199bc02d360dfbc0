// ==========================================
// 注塑生产管理系统 - 生产订单领域模型
// ==========================================
// 红线: 技术快照在建单时复制，之后只能经"更新指标"路径修改
// 红线: 派生字段为持久化缓存，读取时不重新计算
// ==========================================

use crate::domain::types::ProductionStrategy;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

// ==========================================
// TechnicalSnapshot - 技术参数快照
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TechnicalSnapshot {
    pub unit_mass_g: f64,        // 单件净重 (g)
    pub cavities: u32,           // 模穴数
    pub shot_mass_g: f64,        // 单模总重，含流道 (g)
    pub cycle_time_s: f64,       // 成型周期 (s)，0 表示未设置
    pub shift_hours: f64,        // 班次时长 (h)
    pub start_date: NaiveDateTime, // 计划开工时间
}

impl TechnicalSnapshot {
    /// 单模净重 (g) = 单件净重 × 模穴数
    pub fn net_shot_mass_g(&self) -> f64 {
        self.unit_mass_g * self.cavities as f64
    }

    /// 单模流道重量 (g)，快照不完整时取 0
    pub fn runner_mass_g(&self) -> f64 {
        (self.shot_mass_g - self.net_shot_mass_g()).max(0.0)
    }

    /// 应用一次指标更新（仅更新补丁中出现的字段）
    pub fn apply(&mut self, patch: &TechnicalSnapshotPatch) {
        if let Some(v) = patch.unit_mass_g {
            self.unit_mass_g = v;
        }
        if let Some(v) = patch.cavities {
            self.cavities = v;
        }
        if let Some(v) = patch.shot_mass_g {
            self.shot_mass_g = v;
        }
        if let Some(v) = patch.cycle_time_s {
            self.cycle_time_s = v;
        }
        if let Some(v) = patch.shift_hours {
            self.shift_hours = v;
        }
        if let Some(v) = patch.start_date {
            self.start_date = v;
        }
    }
}

/// 技术快照补丁（例如模具损坏减少模穴、实测周期调整）
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TechnicalSnapshotPatch {
    #[serde(default)]
    pub unit_mass_g: Option<f64>,
    #[serde(default)]
    pub cavities: Option<u32>,
    #[serde(default)]
    pub shot_mass_g: Option<f64>,
    #[serde(default)]
    pub cycle_time_s: Option<f64>,
    #[serde(default)]
    pub shift_hours: Option<f64>,
    #[serde(default)]
    pub start_date: Option<NaiveDateTime>,
}

impl TechnicalSnapshotPatch {
    pub fn is_empty(&self) -> bool {
        self.unit_mass_g.is_none()
            && self.cavities.is_none()
            && self.shot_mass_g.is_none()
            && self.cycle_time_s.is_none()
            && self.shift_hours.is_none()
            && self.start_date.is_none()
    }
}

// ==========================================
// OrderMetrics - 订单派生指标（持久化缓存）
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrderMetrics {
    pub loss_pct: f64,               // 损耗率 (merma)
    pub extra_pct: f64,              // 追加率（分级回收规则）
    pub base_mass_kg: f64,           // 生产基准重量
    pub dozens: f64,                 // 打数（精确值）
    pub total_dozens: f64,           // 打数（取整，展示用）
    pub extra_mass_kg: f64,          // 追加重量
    pub delivered_mass_kg: f64,      // 交付机台重量
    pub mass_with_loss_kg: f64,      // 含自然损耗重量
    pub natural_loss_kg: f64,        // 自然损耗重量
    pub hours: f64,                  // 预计工时 (h)
    pub days: f64,                   // 预计天数
    pub finish_date: Option<NaiveDateTime>, // 预计完工（自然日累加）
    pub active_batch_count: u32,     // 活跃批次数（下限 1）
    pub color_family: Option<String>, // 色系标签
}

// ==========================================
// ProductionOrder - 生产订单
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductionOrder {
    // ===== 主键 =====
    pub order_no: String,

    // ===== 抬头 =====
    pub product_name: Option<String>,
    pub mold: Option<String>,
    pub machine_code: Option<String>,
    pub created_at: NaiveDateTime,

    // ===== 策略与目标 =====
    pub strategy: ProductionStrategy,
    pub target_mass_kg: Option<f64>, // 仅 BY_WEIGHT 使用
    pub target_dozens: Option<f64>,  // 仅 BY_QUANTITY 使用

    // ===== 技术快照 =====
    pub snapshot: TechnicalSnapshot,

    // ===== 色系来源 =====
    pub product_color_family: Option<String>, // 关联产品色系
    pub legacy_color_family: Option<String>,  // 旧版自由文本

    // ===== 状态 =====
    pub active: bool, // true = 开放登记

    // ===== 派生指标 =====
    pub metrics: OrderMetrics,
}

impl ProductionOrder {
    /// 解析色系标签: 关联产品色系 > 旧版文本 > 无
    pub fn resolve_color_family(&self) -> Option<String> {
        non_blank(self.product_color_family.as_deref())
            .or_else(|| non_blank(self.legacy_color_family.as_deref()))
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
