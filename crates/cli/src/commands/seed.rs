use tidemark_core::CoreError;
use tidemark_engine::{Environment, SeedResolver};

use crate::context::into_core;

/// Run the named seeds, or all of them in dependency order
pub async fn run(env: &Environment, names: &[String]) -> Result<i32, CoreError> {
    let mut executed = 0;
    let mut skipped = 0;
    let mut elapsed_ms = 0;

    if names.is_empty() {
        let report = SeedResolver::run(env, None).await.map_err(into_core)?;
        executed += report.executed.len();
        skipped += report.skipped.len();
        elapsed_ms += report.execution_time_ms;
    } else {
        for name in names {
            let report = SeedResolver::run(env, Some(name)).await.map_err(into_core)?;
            executed += report.executed.len();
            skipped += report.skipped.len();
            elapsed_ms += report.execution_time_ms;
        }
    }

    println!(
        "All Done. Took {:.4}s ({} seeded, {} skipped)",
        elapsed_ms as f64 / 1000.0,
        executed,
        skipped
    );
    Ok(0)
}
