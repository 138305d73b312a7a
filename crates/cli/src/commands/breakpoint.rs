use tidemark_core::CoreError;
use tidemark_engine::{BreakpointOutcome, Environment, MigrationEngine};

use crate::context::into_core;

pub async fn run(
    env: &Environment,
    target: Option<i64>,
    set: bool,
    unset: bool,
    remove_all: bool,
) -> Result<i32, CoreError> {
    let engine = MigrationEngine::new();

    if remove_all {
        let cleared = engine.remove_breakpoints(env).await.map_err(into_core)?;
        println!("{} breakpoints cleared.", cleared);
        return Ok(0);
    }

    let outcome = if set {
        engine.set_breakpoint(env, target).await
    } else if unset {
        engine.unset_breakpoint(env, target).await
    } else {
        engine.toggle_breakpoint(env, target).await
    }
    .map_err(into_core)?;

    match outcome {
        BreakpointOutcome::Applied {
            version,
            breakpoint,
        } => {
            let state = if breakpoint { "set" } else { "cleared" };
            println!("Breakpoint {} for {}", state, version);
            Ok(0)
        }
        BreakpointOutcome::InvalidVersion(Some(version)) => Err(CoreError::invalid_argument(
            format!("{} is not a valid version", version),
        )),
        BreakpointOutcome::InvalidVersion(None) => Err(CoreError::invalid_argument(
            "no migrations have been applied",
        )),
    }
}
