// ==========================================
// 注塑生产管理系统 - SQLite 连接初始化与建表
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为（外键 + busy_timeout）
// - 提供幂等的建表入口 ensure_schema（CREATE TABLE IF NOT EXISTS）
// 红线: 不做自动迁移，版本号仅用于提示
// ==========================================

use rusqlite::Connection;
use rusqlite::OptionalExtension;
use std::time::Duration;

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 当前代码所期望的 schema_version
pub const CURRENT_SCHEMA_VERSION: i64 = 1;

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明：
/// - foreign_keys 需要“每个连接”单独开启
/// - busy_timeout 需要“每个连接”单独配置
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// 读取 schema_version（若表不存在则返回 None）
pub fn read_schema_version(conn: &Connection) -> rusqlite::Result<Option<i64>> {
    let has_table: bool = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version' LIMIT 1",
            [],
            |_row| Ok(true),
        )
        .optional()?
        .unwrap_or(false);

    if !has_table {
        return Ok(None);
    }

    let v: Option<i64> =
        conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;
    Ok(v)
}

/// 建表（幂等）
///
/// 说明：
/// - 派生字段均为持久化列，读取时不重新计算
/// - 批次三个基准重量列同一时刻只有一个非空（由仓储层保证）
pub fn ensure_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)?;
    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
        [CURRENT_SCHEMA_VERSION],
    )?;

    match read_schema_version(conn)? {
        Some(v) if v > CURRENT_SCHEMA_VERSION => {
            tracing::warn!(
                db_version = v,
                expected = CURRENT_SCHEMA_VERSION,
                "数据库 schema_version 高于程序期望版本"
            );
        }
        _ => {}
    }
    Ok(())
}

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS config_scope (
    scope_id TEXT PRIMARY KEY,
    scope_type TEXT NOT NULL,
    scope_key TEXT NOT NULL,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    UNIQUE(scope_type, scope_key)
);

INSERT OR IGNORE INTO config_scope (scope_id, scope_type, scope_key)
VALUES ('global', 'GLOBAL', 'global');

CREATE TABLE IF NOT EXISTS config_kv (
    scope_id TEXT NOT NULL REFERENCES config_scope(scope_id) ON DELETE CASCADE,
    key TEXT NOT NULL,
    value TEXT NOT NULL,
    updated_at TEXT NOT NULL DEFAULT (datetime('now')),
    PRIMARY KEY (scope_id, key)
);

CREATE TABLE IF NOT EXISTS production_order (
    order_no TEXT PRIMARY KEY,
    product_name TEXT,
    mold TEXT,
    machine_code TEXT,
    created_at TEXT NOT NULL,
    strategy TEXT NOT NULL,
    target_mass_kg REAL,
    target_dozens REAL,
    unit_mass_g REAL NOT NULL DEFAULT 0,
    cavities INTEGER NOT NULL DEFAULT 1,
    shot_mass_g REAL NOT NULL DEFAULT 0,
    cycle_time_s REAL NOT NULL DEFAULT 0,
    shift_hours REAL NOT NULL DEFAULT 24,
    start_date TEXT NOT NULL,
    product_color_family TEXT,
    legacy_color_family TEXT,
    active INTEGER NOT NULL DEFAULT 1,
    loss_pct REAL NOT NULL DEFAULT 0,
    extra_pct REAL NOT NULL DEFAULT 0,
    base_mass_kg REAL NOT NULL DEFAULT 0,
    dozens REAL NOT NULL DEFAULT 0,
    total_dozens REAL NOT NULL DEFAULT 0,
    extra_mass_kg REAL NOT NULL DEFAULT 0,
    delivered_mass_kg REAL NOT NULL DEFAULT 0,
    mass_with_loss_kg REAL NOT NULL DEFAULT 0,
    natural_loss_kg REAL NOT NULL DEFAULT 0,
    hours REAL NOT NULL DEFAULT 0,
    days REAL NOT NULL DEFAULT 0,
    finish_date TEXT,
    active_batch_count INTEGER NOT NULL DEFAULT 1,
    color_family TEXT,
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS color_batch (
    batch_id TEXT PRIMARY KEY,
    order_no TEXT NOT NULL REFERENCES production_order(order_no) ON DELETE CASCADE,
    seq_no INTEGER NOT NULL,
    color_name TEXT NOT NULL,
    stock_kg_manual REAL,
    workers INTEGER NOT NULL DEFAULT 1,
    base_by_quantity_kg REAL,
    base_by_weight_kg REAL,
    base_stock_kg REAL,
    extra_mass_kg REAL NOT NULL DEFAULT 0,
    shots REAL NOT NULL DEFAULT 0,
    labor_hours REAL NOT NULL DEFAULT 0,
    UNIQUE(order_no, seq_no)
);

CREATE TABLE IF NOT EXISTS material_line (
    line_id TEXT PRIMARY KEY,
    batch_id TEXT NOT NULL REFERENCES color_batch(batch_id) ON DELETE CASCADE,
    seq_no INTEGER NOT NULL,
    material_name TEXT NOT NULL,
    material_kind TEXT NOT NULL,
    fraction REAL NOT NULL,
    required_mass_kg REAL NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS pigment_line (
    line_id TEXT PRIMARY KEY,
    batch_id TEXT NOT NULL REFERENCES color_batch(batch_id) ON DELETE CASCADE,
    seq_no INTEGER NOT NULL,
    pigment_name TEXT NOT NULL,
    dose_g REAL NOT NULL
);

CREATE TABLE IF NOT EXISTS daily_register (
    register_id TEXT PRIMARY KEY,
    order_no TEXT NOT NULL REFERENCES production_order(order_no) ON DELETE CASCADE,
    machine_code TEXT NOT NULL,
    production_date TEXT NOT NULL,
    shift TEXT NOT NULL,
    start_time TEXT,
    operator TEXT,
    start_counter INTEGER NOT NULL DEFAULT 0,
    end_counter INTEGER NOT NULL DEFAULT 0,
    snap_cavities INTEGER NOT NULL DEFAULT 0,
    snap_unit_mass_g REAL NOT NULL DEFAULT 0,
    snap_runner_mass_g REAL NOT NULL DEFAULT 0,
    total_shots INTEGER NOT NULL DEFAULT 0,
    total_pieces INTEGER NOT NULL DEFAULT 0,
    output_mass_kg REAL NOT NULL DEFAULT 0,
    mass_source TEXT NOT NULL DEFAULT 'UNAVAILABLE',
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_daily_register_shift
    ON daily_register(order_no, machine_code, production_date, shift);

CREATE TABLE IF NOT EXISTS hourly_detail (
    detail_id TEXT PRIMARY KEY,
    register_id TEXT NOT NULL REFERENCES daily_register(register_id) ON DELETE CASCADE,
    seq_no INTEGER NOT NULL,
    hour_label TEXT NOT NULL,
    operator TEXT,
    color TEXT,
    shots INTEGER NOT NULL DEFAULT 0,
    pieces INTEGER NOT NULL DEFAULT 0,
    mass_kg REAL NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS weigh_in (
    weigh_in_id TEXT PRIMARY KEY,
    register_id TEXT NOT NULL REFERENCES daily_register(register_id) ON DELETE CASCADE,
    mass_kg REAL NOT NULL,
    color TEXT,
    weighed_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS order_status_history (
    change_id TEXT PRIMARY KEY,
    order_no TEXT NOT NULL REFERENCES production_order(order_no) ON DELETE CASCADE,
    previous_active INTEGER,
    new_active INTEGER NOT NULL,
    changed_at TEXT NOT NULL,
    changed_by TEXT,
    reason TEXT
);
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensure_schema_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        configure_sqlite_connection(&conn).unwrap();
        ensure_schema(&conn).unwrap();
        ensure_schema(&conn).unwrap();
        assert_eq!(read_schema_version(&conn).unwrap(), Some(CURRENT_SCHEMA_VERSION));
    }

    #[test]
    fn test_schema_version_absent_on_empty_db() {
        let conn = Connection::open_in_memory().unwrap();
        assert_eq!(read_schema_version(&conn).unwrap(), None);
    }
}
