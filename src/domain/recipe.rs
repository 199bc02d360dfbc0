// ==========================================
// 注塑生产管理系统 - 配方明细（原料 / 色粉）
// ==========================================
// 说明: 批次内原料配比之和不强制等于 1.0
// 说明: 色粉剂量为固定克数，不随批次重量缩放
// ==========================================

use crate::domain::types::MaterialKind;
use serde::{Deserialize, Serialize};

/// 原料明细
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialLine {
    pub line_id: String,
    pub batch_id: String,
    pub seq_no: i32,
    pub material_name: String,
    pub material_kind: MaterialKind,
    pub fraction: f64,         // 配比 0.0 - 1.0
    pub required_mass_kg: f64, // 派生: 需求重量
}

impl MaterialLine {
    pub fn new(
        batch_id: &str,
        seq_no: i32,
        material_name: &str,
        material_kind: MaterialKind,
        fraction: f64,
    ) -> Self {
        Self {
            line_id: uuid::Uuid::new_v4().to_string(),
            batch_id: batch_id.to_string(),
            seq_no,
            material_name: material_name.to_string(),
            material_kind,
            fraction,
            required_mass_kg: 0.0,
        }
    }
}

/// 色粉明细（每批固定剂量，克）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PigmentLine {
    pub line_id: String,
    pub batch_id: String,
    pub seq_no: i32,
    pub pigment_name: String,
    pub dose_g: f64,
}

impl PigmentLine {
    pub fn new(batch_id: &str, seq_no: i32, pigment_name: &str, dose_g: f64) -> Self {
        Self {
            line_id: uuid::Uuid::new_v4().to_string(),
            batch_id: batch_id.to_string(),
            seq_no,
            pigment_name: pigment_name.to_string(),
            dose_g,
        }
    }
}
