// ==========================================
// 注塑生产管理系统 - 命令行入口
// ==========================================
// 用法:
//   injection-production recalc-order <order_no>
//   injection-production recalc-register <register_id>
//   injection-production validate-weight <register_id>
//   injection-production summary <order_no>
// 数据库路径: INJECTION_PRODUCTION_DB_PATH 或用户数据目录
// ==========================================

use injection_production::app::{get_default_db_path, AppState};
use injection_production::logging;

const USAGE: &str = "用法: injection-production <recalc-order|recalc-register|validate-weight|summary> <id>";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init();

    let mut args = std::env::args().skip(1);
    let command = args.next().ok_or(USAGE)?;
    let id = args
        .next()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or(USAGE)?;

    tracing::info!("==================================================");
    tracing::info!("{} v{}", injection_production::APP_NAME, injection_production::VERSION);
    tracing::info!("==================================================");

    let db_path = get_default_db_path();
    tracing::info!("使用数据库: {}", db_path);
    let state = AppState::new(db_path).await?;

    match command.as_str() {
        "recalc-order" => {
            let report = state.order_api.recompute_order(&id)?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        "recalc-register" => {
            let totals = state.register_api.recompute_register(&id)?;
            println!("{}", serde_json::to_string_pretty(&totals)?);
        }
        "validate-weight" => {
            let validation = state.register_api.validate_weight(&id)?;
            println!("{}", serde_json::to_string_pretty(&validation)?);
        }
        "summary" => {
            let summary = state.order_api.get_summary(&id)?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        other => {
            return Err(format!("未知命令: {}\n{}", other, USAGE).into());
        }
    }

    Ok(())
}
