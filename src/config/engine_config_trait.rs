// ==========================================
// 注塑生产管理系统 - 引擎配置读取 Trait
// ==========================================
// 职责: 定义计算引擎所需的配置读取接口（不包含实现）
// 红线: 不包含配置写入、不包含业务逻辑
// ==========================================

use crate::domain::types::ShotRounding;
use async_trait::async_trait;
use std::error::Error;

// ==========================================
// EngineConfigReader Trait
// ==========================================
// 实现者: ConfigManager（从 config_kv 表读取）
#[async_trait]
pub trait EngineConfigReader: Send + Sync {
    /// 称重校验容差 (kg)
    ///
    /// # 默认值
    /// - 5.0
    async fn get_weight_match_tolerance_kg(&self) -> Result<f64, Box<dyn Error>>;

    /// 新建订单未给出班次时长时使用的默认值 (h)
    ///
    /// # 默认值
    /// - 24.0
    async fn get_default_shift_hours(&self) -> Result<f64, Box<dyn Error>>;

    /// 批次打数取整策略
    ///
    /// # 默认值
    /// - NONE（保留小数）
    async fn get_batch_shot_rounding(&self) -> Result<ShotRounding, Box<dyn Error>>;

    /// 是否在写入时拒绝负损耗率的快照
    ///
    /// # 默认值
    /// - false（保留负值并告警）
    async fn get_reject_negative_loss(&self) -> Result<bool, Box<dyn Error>>;
}
