// ==========================================
// 注塑生产管理系统 - 生产订单数据仓储
// ==========================================
// 表: production_order / color_batch / material_line / pigment_line
// 红线: Repository 不含业务逻辑，只做数据映射
// 红线: 只在 UnitOfWork 事务内使用（借用事务连接）
// ==========================================

use crate::domain::batch::{BaseMassColumn, BatchMetrics, ColorBatch};
use crate::domain::order::{OrderMetrics, ProductionOrder, TechnicalSnapshot};
use crate::domain::recipe::{MaterialLine, PigmentLine};
use crate::repository::error::RepositoryResult;
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::str::FromStr;

const ORDER_COLUMNS: &str = r#"
    order_no, product_name, mold, machine_code, created_at,
    strategy, target_mass_kg, target_dozens,
    unit_mass_g, cavities, shot_mass_g, cycle_time_s, shift_hours, start_date,
    product_color_family, legacy_color_family, active,
    loss_pct, extra_pct, base_mass_kg, dozens, total_dozens, extra_mass_kg,
    delivered_mass_kg, mass_with_loss_kg, natural_loss_kg, hours, days, finish_date,
    active_batch_count, color_family
"#;

// ==========================================
// OrderRepository - 订单聚合仓储
// ==========================================
pub struct OrderRepository<'a> {
    conn: &'a Connection,
}

impl<'a> OrderRepository<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    // ==========================================
    // 订单
    // ==========================================

    /// 插入订单（含派生字段）
    pub fn insert_order(&self, order: &ProductionOrder) -> RepositoryResult<()> {
        let s = &order.snapshot;
        let m = &order.metrics;
        self.conn.execute(
            r#"
            INSERT INTO production_order (
                order_no, product_name, mold, machine_code, created_at,
                strategy, target_mass_kg, target_dozens,
                unit_mass_g, cavities, shot_mass_g, cycle_time_s, shift_hours, start_date,
                product_color_family, legacy_color_family, active,
                loss_pct, extra_pct, base_mass_kg, dozens, total_dozens, extra_mass_kg,
                delivered_mass_kg, mass_with_loss_kg, natural_loss_kg, hours, days, finish_date,
                active_batch_count, color_family
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17,
                ?18, ?19, ?20, ?21, ?22, ?23, ?24, ?25, ?26, ?27, ?28, ?29, ?30, ?31
            )
            "#,
            params![
                order.order_no,
                order.product_name,
                order.mold,
                order.machine_code,
                order.created_at,
                order.strategy.to_db_str(),
                order.target_mass_kg,
                order.target_dozens,
                s.unit_mass_g,
                s.cavities,
                s.shot_mass_g,
                s.cycle_time_s,
                s.shift_hours,
                s.start_date,
                order.product_color_family,
                order.legacy_color_family,
                order.active,
                m.loss_pct,
                m.extra_pct,
                m.base_mass_kg,
                m.dozens,
                m.total_dozens,
                m.extra_mass_kg,
                m.delivered_mass_kg,
                m.mass_with_loss_kg,
                m.natural_loss_kg,
                m.hours,
                m.days,
                m.finish_date,
                m.active_batch_count,
                m.color_family,
            ],
        )?;
        Ok(())
    }

    /// 按订单号查询
    ///
    /// # 返回
    /// - Ok(None): 未找到
    /// - Err(FieldValueError): 库内策略值无法识别
    pub fn find_order(&self, order_no: &str) -> RepositoryResult<Option<ProductionOrder>> {
        let sql = format!(
            "SELECT {} FROM production_order WHERE order_no = ?1",
            ORDER_COLUMNS
        );
        let order = self
            .conn
            .query_row(&sql, params![order_no], map_order_row)
            .optional()?;
        Ok(order)
    }

    /// 写回技术快照（仅"更新指标"路径调用）
    pub fn update_snapshot(&self, order_no: &str, s: &TechnicalSnapshot) -> RepositoryResult<usize> {
        let rows = self.conn.execute(
            r#"
            UPDATE production_order SET
                unit_mass_g = ?2, cavities = ?3, shot_mass_g = ?4,
                cycle_time_s = ?5, shift_hours = ?6, start_date = ?7,
                updated_at = datetime('now')
            WHERE order_no = ?1
            "#,
            params![
                order_no,
                s.unit_mass_g,
                s.cavities,
                s.shot_mass_g,
                s.cycle_time_s,
                s.shift_hours,
                s.start_date,
            ],
        )?;
        Ok(rows)
    }

    /// 写回订单派生字段
    pub fn update_metrics(&self, order_no: &str, m: &OrderMetrics) -> RepositoryResult<usize> {
        let rows = self.conn.execute(
            r#"
            UPDATE production_order SET
                loss_pct = ?2, extra_pct = ?3, base_mass_kg = ?4, dozens = ?5,
                total_dozens = ?6, extra_mass_kg = ?7, delivered_mass_kg = ?8,
                mass_with_loss_kg = ?9, natural_loss_kg = ?10, hours = ?11, days = ?12,
                finish_date = ?13, active_batch_count = ?14, color_family = ?15,
                updated_at = datetime('now')
            WHERE order_no = ?1
            "#,
            params![
                order_no,
                m.loss_pct,
                m.extra_pct,
                m.base_mass_kg,
                m.dozens,
                m.total_dozens,
                m.extra_mass_kg,
                m.delivered_mass_kg,
                m.mass_with_loss_kg,
                m.natural_loss_kg,
                m.hours,
                m.days,
                m.finish_date,
                m.active_batch_count,
                m.color_family,
            ],
        )?;
        Ok(rows)
    }

    /// 更新开放状态
    pub fn set_active(&self, order_no: &str, active: bool) -> RepositoryResult<usize> {
        let rows = self.conn.execute(
            "UPDATE production_order SET active = ?2, updated_at = datetime('now') WHERE order_no = ?1",
            params![order_no, active],
        )?;
        Ok(rows)
    }

    // ==========================================
    // 批次与配方
    // ==========================================

    /// 插入批次及其原料 / 色粉明细
    pub fn insert_batch(&self, batch: &ColorBatch) -> RepositoryResult<()> {
        let (by_quantity, by_weight, stock) = batch
            .metrics
            .base_mass
            .map(|b| b.to_columns())
            .unwrap_or((None, None, None));

        self.conn.execute(
            r#"
            INSERT INTO color_batch (
                batch_id, order_no, seq_no, color_name, stock_kg_manual, workers,
                base_by_quantity_kg, base_by_weight_kg, base_stock_kg,
                extra_mass_kg, shots, labor_hours
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
            params![
                batch.batch_id,
                batch.order_no,
                batch.seq_no,
                batch.color_name,
                batch.stock_kg_manual,
                batch.workers,
                by_quantity,
                by_weight,
                stock,
                batch.metrics.extra_mass_kg,
                batch.metrics.shots,
                batch.metrics.labor_hours,
            ],
        )?;

        for line in &batch.materials {
            self.conn.execute(
                r#"
                INSERT INTO material_line (
                    line_id, batch_id, seq_no, material_name, material_kind, fraction, required_mass_kg
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                "#,
                params![
                    line.line_id,
                    line.batch_id,
                    line.seq_no,
                    line.material_name,
                    line.material_kind.to_db_str(),
                    line.fraction,
                    line.required_mass_kg,
                ],
            )?;
        }

        for line in &batch.pigments {
            self.conn.execute(
                r#"
                INSERT INTO pigment_line (line_id, batch_id, seq_no, pigment_name, dose_g)
                VALUES (?1, ?2, ?3, ?4, ?5)
                "#,
                params![
                    line.line_id,
                    line.batch_id,
                    line.seq_no,
                    line.pigment_name,
                    line.dose_g,
                ],
            )?;
        }
        Ok(())
    }

    /// 查询订单下全部批次（按 seq_no 排序，含配方明细）
    pub fn list_batches(&self, order_no: &str) -> RepositoryResult<Vec<ColorBatch>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT batch_id, order_no, seq_no, color_name, stock_kg_manual, workers,
                   base_by_quantity_kg, base_by_weight_kg, base_stock_kg,
                   extra_mass_kg, shots, labor_hours
            FROM color_batch
            WHERE order_no = ?1
            ORDER BY seq_no
            "#,
        )?;
        let rows = stmt.query_map(params![order_no], map_batch_row)?;
        let mut batches = rows.collect::<Result<Vec<_>, _>>()?;

        for batch in batches.iter_mut() {
            batch.materials = self.list_material_lines(&batch.batch_id)?;
            batch.pigments = self.list_pigment_lines(&batch.batch_id)?;
        }
        Ok(batches)
    }

    /// 查询批次所属订单号
    pub fn find_batch_order_no(&self, batch_id: &str) -> RepositoryResult<Option<String>> {
        let order_no = self
            .conn
            .query_row(
                "SELECT order_no FROM color_batch WHERE batch_id = ?1",
                params![batch_id],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(order_no)
    }

    /// 更新批次手工库存输入
    pub fn set_batch_stock(&self, batch_id: &str, stock_kg: Option<f64>) -> RepositoryResult<usize> {
        let rows = self.conn.execute(
            "UPDATE color_batch SET stock_kg_manual = ?2 WHERE batch_id = ?1",
            params![batch_id, stock_kg],
        )?;
        Ok(rows)
    }

    /// 写回批次派生字段及原料需求重量
    pub fn update_batch_metrics(&self, batch: &ColorBatch) -> RepositoryResult<()> {
        let (by_quantity, by_weight, stock) = batch
            .metrics
            .base_mass
            .map(|b| b.to_columns())
            .unwrap_or((None, None, None));

        self.conn.execute(
            r#"
            UPDATE color_batch SET
                base_by_quantity_kg = ?2, base_by_weight_kg = ?3, base_stock_kg = ?4,
                extra_mass_kg = ?5, shots = ?6, labor_hours = ?7
            WHERE batch_id = ?1
            "#,
            params![
                batch.batch_id,
                by_quantity,
                by_weight,
                stock,
                batch.metrics.extra_mass_kg,
                batch.metrics.shots,
                batch.metrics.labor_hours,
            ],
        )?;

        for line in &batch.materials {
            self.conn.execute(
                "UPDATE material_line SET required_mass_kg = ?2 WHERE line_id = ?1",
                params![line.line_id, line.required_mass_kg],
            )?;
        }
        Ok(())
    }

    fn list_material_lines(&self, batch_id: &str) -> RepositoryResult<Vec<MaterialLine>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT line_id, batch_id, seq_no, material_name, material_kind, fraction, required_mass_kg
            FROM material_line
            WHERE batch_id = ?1
            ORDER BY seq_no
            "#,
        )?;
        let rows = stmt.query_map(params![batch_id], |row| {
            Ok(MaterialLine {
                line_id: row.get(0)?,
                batch_id: row.get(1)?,
                seq_no: row.get(2)?,
                material_name: row.get(3)?,
                material_kind: parse_text_column(row, 4)?,
                fraction: row.get(5)?,
                required_mass_kg: row.get(6)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    fn list_pigment_lines(&self, batch_id: &str) -> RepositoryResult<Vec<PigmentLine>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT line_id, batch_id, seq_no, pigment_name, dose_g
            FROM pigment_line
            WHERE batch_id = ?1
            ORDER BY seq_no
            "#,
        )?;
        let rows = stmt.query_map(params![batch_id], |row| {
            Ok(PigmentLine {
                line_id: row.get(0)?,
                batch_id: row.get(1)?,
                seq_no: row.get(2)?,
                pigment_name: row.get(3)?,
                dose_g: row.get(4)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }
}

// ==========================================
// 行映射
// ==========================================

fn map_order_row(row: &Row<'_>) -> rusqlite::Result<ProductionOrder> {
    Ok(ProductionOrder {
        order_no: row.get(0)?,
        product_name: row.get(1)?,
        mold: row.get(2)?,
        machine_code: row.get(3)?,
        created_at: row.get(4)?,
        strategy: parse_text_column(row, 5)?,
        target_mass_kg: row.get(6)?,
        target_dozens: row.get(7)?,
        snapshot: TechnicalSnapshot {
            unit_mass_g: row.get(8)?,
            cavities: row.get(9)?,
            shot_mass_g: row.get(10)?,
            cycle_time_s: row.get(11)?,
            shift_hours: row.get(12)?,
            start_date: row.get(13)?,
        },
        product_color_family: row.get(14)?,
        legacy_color_family: row.get(15)?,
        active: row.get(16)?,
        metrics: OrderMetrics {
            loss_pct: row.get(17)?,
            extra_pct: row.get(18)?,
            base_mass_kg: row.get(19)?,
            dozens: row.get(20)?,
            total_dozens: row.get(21)?,
            extra_mass_kg: row.get(22)?,
            delivered_mass_kg: row.get(23)?,
            mass_with_loss_kg: row.get(24)?,
            natural_loss_kg: row.get(25)?,
            hours: row.get(26)?,
            days: row.get(27)?,
            finish_date: row.get(28)?,
            active_batch_count: row.get(29)?,
            color_family: row.get(30)?,
        },
    })
}

fn map_batch_row(row: &Row<'_>) -> rusqlite::Result<ColorBatch> {
    let base_mass = BaseMassColumn::from_columns(row.get(6)?, row.get(7)?, row.get(8)?)
        .map_err(|msg| rusqlite::Error::FromSqlConversionFailure(6, Type::Real, msg.into()))?;

    Ok(ColorBatch {
        batch_id: row.get(0)?,
        order_no: row.get(1)?,
        seq_no: row.get(2)?,
        color_name: row.get(3)?,
        stock_kg_manual: row.get(4)?,
        workers: row.get(5)?,
        metrics: BatchMetrics {
            base_mass,
            extra_mass_kg: row.get(9)?,
            shots: row.get(10)?,
            labor_hours: row.get(11)?,
        },
        materials: Vec::new(),
        pigments: Vec::new(),
    })
}

/// 解析文本枚举列；无法识别的取值作为转换失败上抛（快速失败）
pub(crate) fn parse_text_column<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw: String = row.get(idx)?;
    raw.parse::<T>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}
