// ==========================================
// OrderApi 集成测试
// ==========================================
// 测试目标: 建单、指标更新、库存输入、开关单、汇总查询
// ==========================================


use injection_production::api::ApiError;
use injection_production::config::EngineConfig;
use injection_production::domain::{BaseMassColumn, StatusAction, TechnicalSnapshotPatch};
use injection_production::domain::types::{MaterialKind, ShotRounding};
use injection_production::engine::MetricsWarning;
use rusqlite::types::Value;
use rusqlite::Connection;
use test_helpers::{
    approx, batch_input, by_weight_request, open_test_connection, setup_env,
    setup_env_with_config,
};

#[test]
fn test_create_order_persists_metrics_and_provisioning() {
    let env = setup_env();
    let summary = env
        .order_api
        .create_order(by_weight_request("OP-1001"))
        .expect("create_order failed");

    // 损耗 2/176，追加率在全额区间内等于损耗
    assert_eq!(summary.loss_pct, 0.0114);
    assert_eq!(summary.extra_pct, 0.0114);
    assert_eq!(summary.base_mass_kg, 1050.0);
    assert_eq!(summary.extra_mass_kg, 11.93);
    assert_eq!(summary.dozens, 1005.75);
    assert_eq!(summary.total_dozens, 1006.0);
    assert_eq!(summary.active_batch_count, 2);
    assert_eq!(summary.color_family.as_deref(), Some("CLAROS"));
    assert!(summary.active);
    // 班次时长缺省取配置
    assert_eq!(summary.snapshot.shift_hours, 24.0);

    // 汇总读取的是持久化字段
    let reloaded = env.order_api.get_summary("OP-1001").unwrap();
    assert_eq!(reloaded.batches.len(), 2);
    assert_eq!(reloaded.batches[0].color_name, "ROJO");
    assert_eq!(reloaded.batches[1].color_name, "AZUL");

    let loss = 2.0 / 176.0;
    let extra_share = 1050.0 * loss / 2.0;
    for b in &reloaded.batches {
        assert_eq!(b.base_mass, Some(BaseMassColumn::ByWeight(525.0)));
        assert!(approx(b.total_with_extra_kg, 525.0 + extra_share, 0.01));
        assert!(approx(b.shots, (525.0 + extra_share) * 1000.0 / 176.0, 0.01));

        let virgin = b
            .materials
            .iter()
            .find(|m| m.material_kind == MaterialKind::Virgin)
            .unwrap();
        let expected = (525.0 + extra_share) * (1.0 + loss) * 0.7;
        assert!(
            approx(virgin.required_mass_kg, expected, 0.01),
            "required={} expected={}",
            virgin.required_mass_kg,
            expected
        );

        // 色粉剂量不随批量缩放
        assert_eq!(b.pigments[0].dose_g, 250.0);
    }
}

#[test]
fn test_create_order_rejects_duplicate_order_no() {
    let env = setup_env();
    env.order_api.create_order(by_weight_request("OP-1002")).unwrap();

    let err = env
        .order_api
        .create_order(by_weight_request("OP-1002"))
        .unwrap_err();
    assert!(matches!(err, ApiError::BusinessRuleViolation(_)), "{:?}", err);
}

#[test]
fn test_create_order_rejects_unknown_strategy() {
    let env = setup_env();
    let mut req = by_weight_request("OP-1003");
    req.strategy = "POR_PESO".to_string();

    let err = env.order_api.create_order(req).unwrap_err();
    assert!(matches!(err, ApiError::UnknownStrategy(ref v) if v == "POR_PESO"), "{:?}", err);

    // 未写入任何数据
    assert!(matches!(
        env.order_api.get_summary("OP-1003").unwrap_err(),
        ApiError::NotFound(_)
    ));
}

#[test]
fn test_create_order_validates_input() {
    let env = setup_env();

    let mut bad_fraction = by_weight_request("OP-1004");
    bad_fraction.batches[0].materials[0].fraction = 1.5;
    assert!(matches!(
        env.order_api.create_order(bad_fraction).unwrap_err(),
        ApiError::InvalidInput(_)
    ));

    let mut no_cavities = by_weight_request("OP-1004");
    no_cavities.cavities = 0;
    assert!(matches!(
        env.order_api.create_order(no_cavities).unwrap_err(),
        ApiError::InvalidInput(_)
    ));

    let mut negative_workers = by_weight_request("OP-1004");
    negative_workers.batches[0].workers = Some(-2);
    assert!(matches!(
        env.order_api.create_order(negative_workers).unwrap_err(),
        ApiError::InvalidInput(_)
    ));

    let mut missing_target = by_weight_request("OP-1004");
    missing_target.target_mass_kg = None;
    assert!(matches!(
        env.order_api.create_order(missing_target).unwrap_err(),
        ApiError::InvalidInput(_)
    ));
}

#[test]
fn test_update_metrics_recomputes_cascade() {
    let env = setup_env();
    env.order_api.create_order(by_weight_request("OP-1005")).unwrap();

    // 模具损坏: 2 穴 → 1 穴，流道占比升至 89/176，追加率归零
    let patch = TechnicalSnapshotPatch {
        cavities: Some(1),
        ..Default::default()
    };
    env.order_api.update_metrics("OP-1005", patch).unwrap();

    let summary = env.order_api.get_summary("OP-1005").unwrap();
    assert_eq!(summary.snapshot.cavities, 1);
    assert_eq!(summary.loss_pct, round4(89.0 / 176.0));
    assert_eq!(summary.extra_pct, 0.0);
    assert_eq!(summary.extra_mass_kg, 0.0);
    for b in &summary.batches {
        assert_eq!(b.total_with_extra_kg, 525.0);
    }
}

#[test]
fn test_update_metrics_rejects_empty_patch() {
    let env = setup_env();
    env.order_api.create_order(by_weight_request("OP-1006")).unwrap();

    let err = env
        .order_api
        .update_metrics("OP-1006", TechnicalSnapshotPatch::default())
        .unwrap_err();
    assert!(matches!(err, ApiError::InvalidInput(_)));
}

#[test]
fn test_negative_loss_is_reported_and_preserved() {
    let env = setup_env();
    let mut req = by_weight_request("OP-1007");
    req.shot_mass_g = 170.0; // 小于 87 × 2

    env.order_api.create_order(req).unwrap();
    let report = env.order_api.recompute_order("OP-1007").unwrap();
    assert!(report
        .warnings
        .iter()
        .any(|w| matches!(w, MetricsWarning::NegativeLoss { .. })));

    let summary = env.order_api.get_summary("OP-1007").unwrap();
    assert!(summary.loss_pct < 0.0);
}

#[test]
fn test_negative_loss_rejected_when_configured() {
    let env = setup_env_with_config(EngineConfig {
        reject_negative_loss: true,
        ..EngineConfig::default()
    });
    env.order_api.create_order(by_weight_request("OP-1008")).unwrap();

    let patch = TechnicalSnapshotPatch {
        shot_mass_g: Some(170.0),
        ..Default::default()
    };
    let err = env.order_api.update_metrics("OP-1008", patch).unwrap_err();
    assert!(matches!(err, ApiError::MalformedSnapshot(_)), "{:?}", err);

    // 事务回滚，快照未被修改
    let summary = env.order_api.get_summary("OP-1008").unwrap();
    assert_eq!(summary.snapshot.shot_mass_g, 176.0);
}

#[test]
fn test_set_batch_stock_drives_by_stock_totals() {
    let env = setup_env();
    let mut req = by_weight_request("OP-1009");
    req.strategy = "BY_STOCK".to_string();
    req.target_mass_kg = None;
    req.shot_mass_g = 174.0; // 无流道，损耗为 0
    env.order_api.create_order(req).unwrap();

    let summary = env.order_api.get_summary("OP-1009").unwrap();
    assert_eq!(summary.base_mass_kg, 0.0);
    let first = summary.batches[0].batch_id.clone();
    let second = summary.batches[1].batch_id.clone();

    env.order_api.set_batch_stock(&first, Some(50.0)).unwrap();
    env.order_api.set_batch_stock(&second, Some(30.0)).unwrap();

    let summary = env.order_api.get_summary("OP-1009").unwrap();
    assert_eq!(summary.base_mass_kg, 80.0);
    assert_eq!(summary.batches[0].base_mass, Some(BaseMassColumn::Stock(50.0)));
    assert_eq!(summary.batches[1].base_mass, Some(BaseMassColumn::Stock(30.0)));

    // 清空库存输入后回到 0
    env.order_api.set_batch_stock(&second, None).unwrap();
    let summary = env.order_api.get_summary("OP-1009").unwrap();
    assert_eq!(summary.base_mass_kg, 50.0);
}

#[test]
fn test_set_batch_stock_unknown_batch() {
    let env = setup_env();
    let err = env.order_api.set_batch_stock("NO-SUCH-BATCH", Some(1.0)).unwrap_err();
    assert!(matches!(err, ApiError::NotFound(_)));
}

#[test]
fn test_order_status_history() {
    let env = setup_env();
    env.order_api.create_order(by_weight_request("OP-1010")).unwrap();

    let closed = env
        .order_api
        .set_order_status("OP-1010", false, Some("supervisor"), Some("fin de corrida"))
        .unwrap()
        .expect("state should change");
    assert_eq!(closed.action(), StatusAction::Closed);

    // 状态未变化不记录
    assert!(env
        .order_api
        .set_order_status("OP-1010", false, Some("supervisor"), None)
        .unwrap()
        .is_none());

    let reopened = env
        .order_api
        .set_order_status("OP-1010", true, None, None)
        .unwrap()
        .unwrap();
    assert_eq!(reopened.action(), StatusAction::Reopened);

    let history = env.order_api.list_status_history("OP-1010").unwrap();
    let actions: Vec<StatusAction> = history.iter().map(|c| c.action()).collect();
    assert_eq!(
        actions,
        vec![StatusAction::Created, StatusAction::Closed, StatusAction::Reopened]
    );
    assert_eq!(history[0].changed_by.as_deref(), Some("planner"));
    assert_eq!(history[1].reason.as_deref(), Some("fin de corrida"));
}

#[test]
fn test_ceil_rounding_from_config() {
    let env = setup_env_with_config(EngineConfig {
        batch_shot_rounding: ShotRounding::Ceil,
        ..EngineConfig::default()
    });
    let mut req = by_weight_request("OP-1011");
    req.batches = vec![batch_input("NEGRO")];
    env.order_api.create_order(req).unwrap();

    let summary = env.order_api.get_summary("OP-1011").unwrap();
    let shots = summary.batches[0].shots;
    assert_eq!(shots, shots.ceil());
}

#[test]
fn test_recompute_order_twice_persists_identical_values() {
    let env = setup_env();
    env.order_api.create_order(by_weight_request("OP-1012")).unwrap();

    env.order_api.recompute_order("OP-1012").unwrap();
    let first_summary = serde_json::to_value(env.order_api.get_summary("OP-1012").unwrap()).unwrap();
    let first_rows = persisted_rows(&env.db_path);

    let report = env.order_api.recompute_order("OP-1012").unwrap();
    assert_eq!(report.batch_count, 2);
    let second_summary = serde_json::to_value(env.order_api.get_summary("OP-1012").unwrap()).unwrap();
    let second_rows = persisted_rows(&env.db_path);

    assert_eq!(first_summary, second_summary);
    assert_eq!(first_rows.len(), second_rows.len());
    for (first, second) in first_rows.iter().zip(&second_rows) {
        assert_eq!(first, second);
    }
}

/// 订单、批次、原料行的全部列（updated_at 为秒级时间戳，不参与比较）
fn persisted_rows(db_path: &str) -> Vec<Vec<(String, Value)>> {
    let conn = open_test_connection(db_path).unwrap();
    let mut rows = table_rows(&conn, "SELECT * FROM production_order ORDER BY order_no");
    rows.extend(table_rows(&conn, "SELECT * FROM color_batch ORDER BY order_no, seq_no"));
    rows.extend(table_rows(&conn, "SELECT * FROM material_line ORDER BY batch_id, seq_no"));
    rows
}

fn table_rows(conn: &Connection, sql: &str) -> Vec<Vec<(String, Value)>> {
    let mut stmt = conn.prepare(sql).unwrap();
    let names: Vec<String> = stmt.column_names().iter().map(|n| n.to_string()).collect();
    let rows = stmt
        .query_map([], |row| {
            let mut cols = Vec::with_capacity(names.len());
            for (i, name) in names.iter().enumerate() {
                if name != "updated_at" {
                    cols.push((name.clone(), row.get::<_, Value>(i)?));
                }
            }
            Ok(cols)
        })
        .unwrap();
    rows.collect::<Result<Vec<_>, _>>().unwrap()
}

fn round4(v: f64) -> f64 {
    (v * 10_000.0).round() / 10_000.0
}
