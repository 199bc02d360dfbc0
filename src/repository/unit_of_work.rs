// ==========================================
// 注塑生产管理系统 - 工作单元（事务边界）
// ==========================================
// 职责: 为"订单 → 批次 → 配方明细"及"登记 → 称重/明细"的级联重算提供单一事务
// 红线: 闭包返回 Err 时整体回滚，不允许提交部分结果
// ==========================================

use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::order_repo::OrderRepository;
use crate::repository::register_repo::RegisterRepository;
use crate::repository::status_history_repo::StatusHistoryRepository;
use rusqlite::Connection;
use std::sync::{Arc, Mutex, MutexGuard};

// ==========================================
// UnitOfWork - 工作单元
// ==========================================
pub struct UnitOfWork {
    conn: Arc<Mutex<Connection>>,
}

impl UnitOfWork {
    /// 创建新的 UnitOfWork 实例
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = crate::db::open_sqlite_connection(db_path)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 在单一事务内执行闭包
    ///
    /// # 返回
    /// - Ok(T): 闭包成功且事务已提交
    /// - Err(E): 闭包失败或提交失败，事务已回滚（Transaction drop 时回滚）
    pub fn execute<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&TxScope<'_>) -> Result<T, E>,
        E: From<RepositoryError>,
    {
        let mut conn = self.get_conn()?;
        let tx = conn
            .transaction()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        let scope = TxScope { conn: &tx };
        let value = f(&scope)?;

        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
        Ok(value)
    }

    /// 只读访问（不开启写事务）
    pub fn read<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&TxScope<'_>) -> Result<T, E>,
        E: From<RepositoryError>,
    {
        let conn = self.get_conn()?;
        let scope = TxScope { conn: &conn };
        f(&scope)
    }
}

// ==========================================
// TxScope - 事务内的仓储入口
// ==========================================
pub struct TxScope<'a> {
    conn: &'a Connection,
}

impl<'a> TxScope<'a> {
    pub fn orders(&self) -> OrderRepository<'a> {
        OrderRepository::new(self.conn)
    }

    pub fn registers(&self) -> RegisterRepository<'a> {
        RegisterRepository::new(self.conn)
    }

    pub fn history(&self) -> StatusHistoryRepository<'a> {
        StatusHistoryRepository::new(self.conn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::batch::{BaseMassColumn, ColorBatch};
    use crate::domain::order::{OrderMetrics, ProductionOrder, TechnicalSnapshot};
    use crate::domain::recipe::MaterialLine;
    use crate::domain::types::{MaterialKind, ProductionStrategy};
    use chrono::NaiveDate;

    fn setup() -> UnitOfWork {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::configure_sqlite_connection(&conn).unwrap();
        crate::db::ensure_schema(&conn).unwrap();
        UnitOfWork::from_connection(Arc::new(Mutex::new(conn)))
    }

    fn order(order_no: &str) -> ProductionOrder {
        let start = NaiveDate::from_ymd_opt(2026, 2, 1)
            .unwrap()
            .and_hms_opt(6, 0, 0)
            .unwrap();
        ProductionOrder {
            order_no: order_no.to_string(),
            product_name: Some("BALDE 20L".to_string()),
            mold: None,
            machine_code: Some("INY-05".to_string()),
            created_at: start,
            strategy: ProductionStrategy::ByWeight,
            target_mass_kg: Some(500.0),
            target_dozens: None,
            snapshot: TechnicalSnapshot {
                unit_mass_g: 50.0,
                cavities: 2,
                shot_mass_g: 110.0,
                cycle_time_s: 30.0,
                shift_hours: 24.0,
                start_date: start,
            },
            product_color_family: None,
            legacy_color_family: Some("CLASICO".to_string()),
            active: true,
            metrics: OrderMetrics::default(),
        }
    }

    #[test]
    fn test_error_in_closure_rolls_back() {
        let uow = setup();
        let result: Result<(), RepositoryError> = uow.execute(|tx| {
            tx.orders().insert_order(&order("OP-100"))?;
            Err(RepositoryError::not_found("ColorBatch", "x"))
        });
        assert!(result.is_err());

        let found = uow
            .read(|tx| tx.orders().find_order("OP-100"))
            .unwrap();
        assert!(found.is_none());
    }

    #[test]
    fn test_batch_round_trip_with_lines() {
        let uow = setup();
        uow.execute(|tx| -> RepositoryResult<()> {
            tx.orders().insert_order(&order("OP-101"))?;
            let mut batch = ColorBatch::new("OP-101", 1, "ROJO", 2);
            batch.metrics.base_mass = Some(BaseMassColumn::ByWeight(250.0));
            batch.materials.push(MaterialLine::new(
                &batch.batch_id,
                1,
                "PP HOMOPOLIMERO",
                MaterialKind::Virgin,
                0.8,
            ));
            tx.orders().insert_batch(&batch)
        })
        .unwrap();

        let batches = uow.read(|tx| tx.orders().list_batches("OP-101")).unwrap();
        assert_eq!(batches.len(), 1);
        assert_eq!(
            batches[0].metrics.base_mass,
            Some(BaseMassColumn::ByWeight(250.0))
        );
        assert_eq!(batches[0].materials.len(), 1);
        assert_eq!(batches[0].materials[0].material_kind, MaterialKind::Virgin);
    }

    #[test]
    fn test_unknown_strategy_in_db_fails_load() {
        let uow = setup();
        uow.execute(|tx| tx.orders().insert_order(&order("OP-102")))
            .unwrap();
        {
            let conn = uow.get_conn().unwrap();
            conn.execute(
                "UPDATE production_order SET strategy = 'POR_PESO' WHERE order_no = 'OP-102'",
                [],
            )
            .unwrap();
        }

        let err = uow
            .read(|tx| tx.orders().find_order("OP-102"))
            .unwrap_err();
        assert!(matches!(err, RepositoryError::FieldValueError { .. }));
    }
}
