use tidemark_core::CoreError;
use tidemark_engine::migrations::parse_target_date;
use tidemark_engine::{EngineOptions, Environment, MigrationEngine};

use crate::context::into_core;

pub async fn run(
    env: &Environment,
    target: Option<i64>,
    date: Option<&str>,
    fake: bool,
) -> Result<i32, CoreError> {
    let engine = MigrationEngine::with_options(EngineOptions { fake, force: false });

    let report = match date {
        Some(date) => {
            let date = parse_target_date(date).map_err(into_core)?;
            engine.migrate_to_datetime(env, date).await
        }
        None => engine.migrate(env, target).await,
    }
    .map_err(into_core)?;

    if fake {
        println!("warning: performing fake migrations");
    }
    for version in &report.skipped {
        println!("{} skipped", version);
    }
    println!(
        "All Done. Took {:.4}s ({} applied)",
        report.execution_time_ms as f64 / 1000.0,
        report.applied.len()
    );
    Ok(0)
}
