// Maintenance utility: recompute the totals of every daily register.
//
// Usage:
//   cargo run --bin recalc_registers -- [db_path]
//
// Prints one line per register whose output mass moved by more than 0.001 kg.

use injection_production::app::{get_default_db_path, AppState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    injection_production::logging::init();

    let db_path = std::env::args()
        .nth(1)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(get_default_db_path);

    let state = AppState::new(db_path).await?;
    let changes = state.register_api.recalc_all_registers()?;

    for c in &changes {
        println!(
            "register_id={} shots={} mass_kg: {:.3} -> {:.3}",
            c.register_id, c.total_shots, c.old_mass_kg, c.new_mass_kg
        );
    }
    println!("changed={}", changes.len());
    Ok(())
}
