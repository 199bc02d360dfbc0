// ==========================================
// 注塑生产管理系统 - 订单状态历史仓储
// ==========================================
// 表: order_status_history（只追加，不修改）
// ==========================================

use crate::domain::status_history::OrderStatusChange;
use crate::repository::error::RepositoryResult;
use rusqlite::{params, Connection};

pub struct StatusHistoryRepository<'a> {
    conn: &'a Connection,
}

impl<'a> StatusHistoryRepository<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    pub fn insert(&self, change: &OrderStatusChange) -> RepositoryResult<()> {
        self.conn.execute(
            r#"
            INSERT INTO order_status_history (
                change_id, order_no, previous_active, new_active, changed_at, changed_by, reason
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                change.change_id,
                change.order_no,
                change.previous_active,
                change.new_active,
                change.changed_at,
                change.changed_by,
                change.reason,
            ],
        )?;
        Ok(())
    }

    /// 按时间顺序列出订单的状态变更
    pub fn list_by_order(&self, order_no: &str) -> RepositoryResult<Vec<OrderStatusChange>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT change_id, order_no, previous_active, new_active, changed_at, changed_by, reason
            FROM order_status_history
            WHERE order_no = ?1
            ORDER BY changed_at, rowid
            "#,
        )?;
        let rows = stmt.query_map(params![order_no], |row| {
            Ok(OrderStatusChange {
                change_id: row.get(0)?,
                order_no: row.get(1)?,
                previous_active: row.get(2)?,
                new_active: row.get(3)?,
                changed_at: row.get(4)?,
                changed_by: row.get(5)?,
                reason: row.get(6)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }
}
