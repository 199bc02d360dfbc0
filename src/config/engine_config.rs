// ==========================================
// 注塑生产管理系统 - 引擎配置快照
// ==========================================
// 说明: 启动时从 EngineConfigReader 读取一次，之后以值传给引擎（引擎内不查库）
// ==========================================

use crate::config::engine_config_trait::EngineConfigReader;
use crate::domain::types::ShotRounding;
use serde::{Deserialize, Serialize};
use std::error::Error;

pub const DEFAULT_WEIGHT_MATCH_TOLERANCE_KG: f64 = 5.0;
pub const DEFAULT_SHIFT_HOURS: f64 = 24.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub weight_match_tolerance_kg: f64,
    pub default_shift_hours: f64,
    pub batch_shot_rounding: ShotRounding,
    pub reject_negative_loss: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            weight_match_tolerance_kg: DEFAULT_WEIGHT_MATCH_TOLERANCE_KG,
            default_shift_hours: DEFAULT_SHIFT_HOURS,
            batch_shot_rounding: ShotRounding::None,
            reject_negative_loss: false,
        }
    }
}

impl EngineConfig {
    /// 从配置读取器加载
    pub async fn load(reader: &dyn EngineConfigReader) -> Result<Self, Box<dyn Error>> {
        let config = Self {
            weight_match_tolerance_kg: reader.get_weight_match_tolerance_kg().await?,
            default_shift_hours: reader.get_default_shift_hours().await?,
            batch_shot_rounding: reader.get_batch_shot_rounding().await?,
            reject_negative_loss: reader.get_reject_negative_loss().await?,
        };
        tracing::debug!(?config, "引擎配置已加载");
        Ok(config)
    }
}
