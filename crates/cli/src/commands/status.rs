use tidemark_core::CoreError;
use tidemark_engine::{Environment, StatusReporter};

use crate::context::into_core;
use crate::OutputFormat;

/// Print the status view; the exit code flags missing or pending migrations
pub async fn run(env: &Environment, format: OutputFormat) -> Result<i32, CoreError> {
    let report = StatusReporter::report(env).await.map_err(into_core)?;

    match format {
        OutputFormat::Json => println!("{}", report.to_json().map_err(into_core)?),
        OutputFormat::Text => {
            println!("using environment {}", env.name());
            println!("ordering by {}", env.order());
            print!("{}", report.render_table(env.order()));
        }
    }

    Ok(report.exit_code())
}
