// ==========================================
// 注塑生产管理系统 - 输入校验
// ==========================================
// 职责: API 入参的格式与取值范围校验（不访问数据库）
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::domain::order::TechnicalSnapshotPatch;

/// 必填文本
pub fn require_text(field: &str, value: &str) -> ApiResult<()> {
    if value.trim().is_empty() {
        return Err(ApiError::InvalidInput(format!("{}不能为空", field)));
    }
    Ok(())
}

/// 非负有限数值
pub fn require_non_negative(field: &str, value: f64) -> ApiResult<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(ApiError::InvalidInput(format!(
            "{}必须为非负数: {}",
            field, value
        )));
    }
    Ok(())
}

pub fn require_non_negative_opt(field: &str, value: Option<f64>) -> ApiResult<()> {
    match value {
        Some(v) => require_non_negative(field, v),
        None => Ok(()),
    }
}

/// 原料配比 ∈ [0, 1]
pub fn require_fraction(field: &str, value: f64) -> ApiResult<()> {
    if !value.is_finite() || !(0.0..=1.0).contains(&value) {
        return Err(ApiError::InvalidInput(format!(
            "{}必须在 0 到 1 之间: {}",
            field, value
        )));
    }
    Ok(())
}

/// 模穴数 ≥ 1
pub fn require_cavities(value: u32) -> ApiResult<()> {
    if value < 1 {
        return Err(ApiError::InvalidInput("模穴数必须 ≥ 1".to_string()));
    }
    Ok(())
}

/// 人数 ≥ 0，缺省为 1
pub fn resolve_workers(field: &str, value: Option<i32>) -> ApiResult<u32> {
    match value {
        None => Ok(1),
        Some(v) if v < 0 => Err(ApiError::InvalidInput(format!(
            "{}不能为负数: {}",
            field, v
        ))),
        Some(v) => Ok(v as u32),
    }
}

/// 计数器 / 打数上限（9 位计数器），乘以任意 u32 模穴数不溢出 i64
pub const MAX_COUNTER_VALUE: i64 = 999_999_999;

/// 计数器 ∈ [0, MAX_COUNTER_VALUE]（结束值小于开始值视为计数器清零，允许）
pub fn require_counters(start: i64, end: i64) -> ApiResult<()> {
    if start < 0 || end < 0 {
        return Err(ApiError::InvalidInput(format!(
            "计数器不能为负数: start={}, end={}",
            start, end
        )));
    }
    if start > MAX_COUNTER_VALUE || end > MAX_COUNTER_VALUE {
        return Err(ApiError::InvalidInput(format!(
            "计数器超出上限 {}: start={}, end={}",
            MAX_COUNTER_VALUE, start, end
        )));
    }
    Ok(())
}

pub fn require_shots(value: i64) -> ApiResult<()> {
    if value < 0 {
        return Err(ApiError::InvalidInput(format!("打数不能为负数: {}", value)));
    }
    if value > MAX_COUNTER_VALUE {
        return Err(ApiError::InvalidInput(format!(
            "打数超出上限 {}: {}",
            MAX_COUNTER_VALUE, value
        )));
    }
    Ok(())
}

/// 指标更新补丁校验
pub fn validate_snapshot_patch(patch: &TechnicalSnapshotPatch) -> ApiResult<()> {
    if patch.is_empty() {
        return Err(ApiError::InvalidInput("指标更新内容为空".to_string()));
    }
    if let Some(c) = patch.cavities {
        require_cavities(c)?;
    }
    require_non_negative_opt("单件重量", patch.unit_mass_g)?;
    require_non_negative_opt("单模总重", patch.shot_mass_g)?;
    require_non_negative_opt("成型周期", patch.cycle_time_s)?;
    require_non_negative_opt("班次时长", patch.shift_hours)?;
    Ok(())
}
