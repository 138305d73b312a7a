use std::time::Instant;
use tidemark_core::CoreError;
use tidemark_engine::migrations::parse_target_date;
use tidemark_engine::{EngineOptions, Environment, MigrationEngine, RollbackOutcome, RollbackTarget};

use crate::context::into_core;

pub async fn run(
    env: &Environment,
    target: Option<&str>,
    date: Option<&str>,
    force: bool,
    fake: bool,
    only: bool,
) -> Result<i32, CoreError> {
    let started = Instant::now();
    let engine = MigrationEngine::with_options(EngineOptions { fake, force });

    let rollback_target = match date {
        Some(date) => RollbackTarget::Date(parse_target_date(date).map_err(into_core)?),
        None => RollbackTarget::parse(target),
    };

    let outcome = if only {
        let RollbackTarget::Version(version) = rollback_target else {
            return Err(CoreError::invalid_argument(
                "--only needs a numeric --target version",
            ));
        };
        engine.rollback_only_this_version(env, version).await
    } else {
        engine.rollback(env, &rollback_target).await
    }
    .map_err(into_core)?;

    if fake {
        println!("warning: performing fake rollbacks");
    }

    match outcome {
        RollbackOutcome::Reverted(versions) => {
            println!("Reverted {} migration(s)", versions.len());
        }
        RollbackOutcome::NoMigrationsToRollback => {
            println!("No migrations to rollback");
        }
        RollbackOutcome::BreakpointReached(versions) => {
            println!(
                "Breakpoint reached after reverting {} migration(s). Further rollbacks inhibited.",
                versions.len()
            );
        }
        RollbackOutcome::TargetVersionNotFound(target) => {
            return Err(CoreError::migration(format!(
                "Target version ({}) not found",
                target
            )));
        }
    }

    println!("All Done. Took {:.4}s", started.elapsed().as_secs_f64());
    Ok(0)
}
