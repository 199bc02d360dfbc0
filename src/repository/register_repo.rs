// ==========================================
// 注塑生产管理系统 - 班次登记数据仓储
// ==========================================
// 表: daily_register / hourly_detail / weigh_in
// 红线: Repository 不含业务逻辑，只做数据映射
// ==========================================

use crate::domain::register::{DailyRegister, HourlyDetail, RegisterSnapshot, RegisterTotals, WeighIn};
use crate::repository::error::RepositoryResult;
use crate::repository::order_repo::parse_text_column;
use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension, Row};

const REGISTER_COLUMNS: &str = r#"
    register_id, order_no, machine_code, production_date, shift, start_time, operator,
    start_counter, end_counter, snap_cavities, snap_unit_mass_g, snap_runner_mass_g,
    total_shots, total_pieces, output_mass_kg, mass_source, created_at
"#;

// ==========================================
// RegisterRepository - 班次登记仓储
// ==========================================
pub struct RegisterRepository<'a> {
    conn: &'a Connection,
}

impl<'a> RegisterRepository<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    // ==========================================
    // 登记
    // ==========================================

    pub fn insert_register(&self, r: &DailyRegister) -> RepositoryResult<()> {
        self.conn.execute(
            r#"
            INSERT INTO daily_register (
                register_id, order_no, machine_code, production_date, shift, start_time, operator,
                start_counter, end_counter, snap_cavities, snap_unit_mass_g, snap_runner_mass_g,
                total_shots, total_pieces, output_mass_kg, mass_source, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)
            "#,
            params![
                r.register_id,
                r.order_no,
                r.machine_code,
                r.production_date,
                r.shift,
                r.start_time,
                r.operator,
                r.start_counter,
                r.end_counter,
                r.snapshot.cavities,
                r.snapshot.unit_mass_g,
                r.snapshot.runner_mass_g,
                r.totals.total_shots,
                r.totals.total_pieces,
                r.totals.output_mass_kg,
                r.totals.mass_source.to_db_str(),
                r.created_at,
            ],
        )?;
        Ok(())
    }

    pub fn find_register(&self, register_id: &str) -> RepositoryResult<Option<DailyRegister>> {
        let sql = format!(
            "SELECT {} FROM daily_register WHERE register_id = ?1",
            REGISTER_COLUMNS
        );
        let register = self
            .conn
            .query_row(&sql, params![register_id], map_register_row)
            .optional()?;
        Ok(register)
    }

    /// 按 (订单, 机台, 日期, 班次) 查找登记；多条时取最早创建的一条
    pub fn find_register_by_shift(
        &self,
        order_no: &str,
        machine_code: &str,
        production_date: NaiveDate,
        shift: &str,
    ) -> RepositoryResult<Option<DailyRegister>> {
        let sql = format!(
            r#"
            SELECT {} FROM daily_register
            WHERE order_no = ?1 AND machine_code = ?2 AND production_date = ?3 AND shift = ?4
            ORDER BY created_at, register_id
            LIMIT 1
            "#,
            REGISTER_COLUMNS
        );
        let register = self
            .conn
            .query_row(
                &sql,
                params![order_no, machine_code, production_date, shift],
                map_register_row,
            )
            .optional()?;
        Ok(register)
    }

    pub fn list_register_ids(&self) -> RepositoryResult<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT register_id FROM daily_register ORDER BY production_date, created_at")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    pub fn update_counters(
        &self,
        register_id: &str,
        start_counter: i64,
        end_counter: i64,
    ) -> RepositoryResult<usize> {
        let rows = self.conn.execute(
            "UPDATE daily_register SET start_counter = ?2, end_counter = ?3 WHERE register_id = ?1",
            params![register_id, start_counter, end_counter],
        )?;
        Ok(rows)
    }

    pub fn update_totals(&self, register_id: &str, t: &RegisterTotals) -> RepositoryResult<usize> {
        let rows = self.conn.execute(
            r#"
            UPDATE daily_register SET
                total_shots = ?2, total_pieces = ?3, output_mass_kg = ?4, mass_source = ?5
            WHERE register_id = ?1
            "#,
            params![
                register_id,
                t.total_shots,
                t.total_pieces,
                t.output_mass_kg,
                t.mass_source.to_db_str(),
            ],
        )?;
        Ok(rows)
    }

    // ==========================================
    // 小时明细
    // ==========================================

    pub fn insert_hourly_detail(&self, d: &HourlyDetail) -> RepositoryResult<()> {
        self.conn.execute(
            r#"
            INSERT INTO hourly_detail (
                detail_id, register_id, seq_no, hour_label, operator, color, shots, pieces, mass_kg
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
            params![
                d.detail_id,
                d.register_id,
                d.seq_no,
                d.hour_label,
                d.operator,
                d.color,
                d.shots,
                d.pieces,
                d.mass_kg,
            ],
        )?;
        Ok(())
    }

    pub fn list_hourly_details(&self, register_id: &str) -> RepositoryResult<Vec<HourlyDetail>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT detail_id, register_id, seq_no, hour_label, operator, color, shots, pieces, mass_kg
            FROM hourly_detail
            WHERE register_id = ?1
            ORDER BY seq_no
            "#,
        )?;
        let rows = stmt.query_map(params![register_id], |row| {
            Ok(HourlyDetail {
                detail_id: row.get(0)?,
                register_id: row.get(1)?,
                seq_no: row.get(2)?,
                hour_label: row.get(3)?,
                operator: row.get(4)?,
                color: row.get(5)?,
                shots: row.get(6)?,
                pieces: row.get(7)?,
                mass_kg: row.get(8)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// 下一个明细序号
    pub fn next_hourly_seq(&self, register_id: &str) -> RepositoryResult<i32> {
        let seq: i32 = self.conn.query_row(
            "SELECT COALESCE(MAX(seq_no), 0) + 1 FROM hourly_detail WHERE register_id = ?1",
            params![register_id],
            |row| row.get(0),
        )?;
        Ok(seq)
    }

    pub fn find_hourly_detail_register_id(&self, detail_id: &str) -> RepositoryResult<Option<String>> {
        let id = self
            .conn
            .query_row(
                "SELECT register_id FROM hourly_detail WHERE detail_id = ?1",
                params![detail_id],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(id)
    }

    pub fn delete_hourly_detail(&self, detail_id: &str) -> RepositoryResult<usize> {
        let rows = self.conn.execute(
            "DELETE FROM hourly_detail WHERE detail_id = ?1",
            params![detail_id],
        )?;
        Ok(rows)
    }

    // ==========================================
    // 实测称重
    // ==========================================

    pub fn insert_weigh_in(&self, w: &WeighIn) -> RepositoryResult<()> {
        self.conn.execute(
            r#"
            INSERT INTO weigh_in (weigh_in_id, register_id, mass_kg, color, weighed_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![w.weigh_in_id, w.register_id, w.mass_kg, w.color, w.weighed_at],
        )?;
        Ok(())
    }

    pub fn list_weigh_ins(&self, register_id: &str) -> RepositoryResult<Vec<WeighIn>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT weigh_in_id, register_id, mass_kg, color, weighed_at
            FROM weigh_in
            WHERE register_id = ?1
            ORDER BY weighed_at, weigh_in_id
            "#,
        )?;
        let rows = stmt.query_map(params![register_id], |row| {
            Ok(WeighIn {
                weigh_in_id: row.get(0)?,
                register_id: row.get(1)?,
                mass_kg: row.get(2)?,
                color: row.get(3)?,
                weighed_at: row.get(4)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    pub fn find_weigh_in_register_id(&self, weigh_in_id: &str) -> RepositoryResult<Option<String>> {
        let id = self
            .conn
            .query_row(
                "SELECT register_id FROM weigh_in WHERE weigh_in_id = ?1",
                params![weigh_in_id],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(id)
    }

    pub fn delete_weigh_in(&self, weigh_in_id: &str) -> RepositoryResult<usize> {
        let rows = self
            .conn
            .execute("DELETE FROM weigh_in WHERE weigh_in_id = ?1", params![weigh_in_id])?;
        Ok(rows)
    }
}

fn map_register_row(row: &Row<'_>) -> rusqlite::Result<DailyRegister> {
    Ok(DailyRegister {
        register_id: row.get(0)?,
        order_no: row.get(1)?,
        machine_code: row.get(2)?,
        production_date: row.get(3)?,
        shift: row.get(4)?,
        start_time: row.get(5)?,
        operator: row.get(6)?,
        start_counter: row.get(7)?,
        end_counter: row.get(8)?,
        snapshot: RegisterSnapshot {
            cavities: row.get(9)?,
            unit_mass_g: row.get(10)?,
            runner_mass_g: row.get(11)?,
        },
        totals: RegisterTotals {
            total_shots: row.get(12)?,
            total_pieces: row.get(13)?,
            output_mass_kg: row.get(14)?,
            mass_source: parse_text_column(row, 15)?,
        },
        created_at: row.get(16)?,
    })
}
