// ==========================================
// Repository 层集成测试
// ==========================================
// 测试目标: 验证持久化映射、外键级联、登记查找规则
// ==========================================


use chrono::{Duration, NaiveDate};
use injection_production::api::ApiResult;
use injection_production::domain::register::{DailyRegister, RegisterSnapshot, RegisterTotals, WeighIn};
use injection_production::domain::types::MassSource;
use injection_production::logging;
use injection_production::repository::{RepositoryError, UnitOfWork};
use std::sync::{Arc, Mutex};
use test_helpers::{by_weight_request, create_test_db, open_test_connection, setup_env, start_date};

fn register(order_no: &str, register_id: &str, created_offset_s: i64) -> DailyRegister {
    DailyRegister {
        register_id: register_id.to_string(),
        order_no: order_no.to_string(),
        machine_code: "INY-07".to_string(),
        production_date: NaiveDate::from_ymd_opt(2024, 5, 2).unwrap(),
        shift: "C".to_string(),
        start_time: None,
        operator: None,
        start_counter: 0,
        end_counter: 0,
        snapshot: RegisterSnapshot {
            cavities: 4,
            unit_mass_g: 12.5,
            runner_mass_g: 3.0,
        },
        totals: RegisterTotals::default(),
        created_at: start_date() + Duration::seconds(created_offset_s),
    }
}

#[test]
fn test_register_round_trip_and_shift_lookup() {
    logging::init_test();

    let env = setup_env();
    env.order_api
        .create_order(by_weight_request("OP-3001"))
        .unwrap();

    let conn = open_test_connection(&env.db_path).unwrap();
    let uow = UnitOfWork::from_connection(Arc::new(Mutex::new(conn)));

    uow.execute(|tx| -> ApiResult<()> {
        // 后创建的先插入，查找仍取最早创建的一条
        tx.registers().insert_register(&register("OP-3001", "R-LATE", 60))?;
        tx.registers().insert_register(&register("OP-3001", "R-EARLY", 0))?;
        Ok(())
    })
    .unwrap();

    let found = uow
        .read(|tx| -> ApiResult<Option<DailyRegister>> {
            Ok(tx.registers().find_register_by_shift(
                "OP-3001",
                "INY-07",
                NaiveDate::from_ymd_opt(2024, 5, 2).unwrap(),
                "C",
            )?)
        })
        .unwrap()
        .expect("register should exist");

    assert_eq!(found.register_id, "R-EARLY");
    assert_eq!(found.snapshot.cavities, 4);
    assert_eq!(found.snapshot.unit_mass_g, 12.5);
    assert_eq!(found.snapshot.runner_mass_g, 3.0);
    assert_eq!(found.totals.mass_source, MassSource::Unavailable);

    let other_shift = uow
        .read(|tx| -> ApiResult<Option<DailyRegister>> {
            Ok(tx.registers().find_register_by_shift(
                "OP-3001",
                "INY-07",
                NaiveDate::from_ymd_opt(2024, 5, 2).unwrap(),
                "A",
            )?)
        })
        .unwrap();
    assert!(other_shift.is_none());
}

#[test]
fn test_weigh_in_requires_existing_register() {
    let (_temp_file, db_path) = create_test_db().unwrap();
    let conn = open_test_connection(&db_path).unwrap();
    let uow = UnitOfWork::from_connection(Arc::new(Mutex::new(conn)));

    let result = uow.execute(|tx| -> Result<(), RepositoryError> {
        tx.registers().insert_weigh_in(&WeighIn {
            weigh_in_id: "W-1".to_string(),
            register_id: "R-MISSING".to_string(),
            mass_kg: 1.0,
            color: None,
            weighed_at: start_date(),
        })
    });
    assert!(matches!(result, Err(RepositoryError::ForeignKeyViolation(_))));
}

#[test]
fn test_deleting_order_cascades_to_children() {
    let env = setup_env();
    env.order_api
        .create_order(by_weight_request("OP-3002"))
        .unwrap();
    env.register_api
        .create_register(test_helpers::register_request("OP-3002", 0, 100))
        .unwrap();

    let conn = open_test_connection(&env.db_path).unwrap();
    conn.execute("DELETE FROM production_order WHERE order_no = 'OP-3002'", [])
        .unwrap();

    for table in ["color_batch", "daily_register", "order_status_history"] {
        let count: i64 = conn
            .query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0, "table {} not cleaned", table);
    }
    let lines: i64 = conn
        .query_row("SELECT COUNT(*) FROM material_line", [], |row| row.get(0))
        .unwrap();
    assert_eq!(lines, 0);
}
