// ==========================================
// 注塑生产管理系统 - 订单状态变更历史
// ==========================================
// 用途: 记录订单的多次开启 / 关闭，审计追踪
// ==========================================

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

// ==========================================
// OrderStatusChange - 订单状态变更记录
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderStatusChange {
    pub change_id: String,
    pub order_no: String,
    pub previous_active: Option<bool>, // None = 新建
    pub new_active: bool,
    pub changed_at: NaiveDateTime,
    pub changed_by: Option<String>,
    pub reason: Option<String>,
}

// ==========================================
// StatusAction - 变更动作（派生）
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StatusAction {
    Created,
    Reopened,
    Closed,
}

impl OrderStatusChange {
    pub fn action(&self) -> StatusAction {
        match (self.previous_active, self.new_active) {
            (None, _) => StatusAction::Created,
            (Some(_), true) => StatusAction::Reopened,
            (Some(_), false) => StatusAction::Closed,
        }
    }
}
