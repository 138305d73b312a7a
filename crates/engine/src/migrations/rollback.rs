//! Migration Rollback - Reverts applied migrations
//!
//! Walks applied versions newest to oldest. A breakpoint on a candidate stops
//! the pass there; what was reverted before it stays reverted.

use std::collections::HashMap;
use std::time::Instant;

use super::definitions::{RollbackOutcome, Version, VersionLogEntry};
use super::resolver::{self, RollbackResolution};
use super::runner::MigrationEngine;
use super::target::RollbackTarget;
use crate::environment::Environment;
use crate::error::MigrationResult;

impl MigrationEngine {
    /// Revert applied migrations down to `target`
    pub async fn rollback(
        &self,
        env: &Environment,
        target: &RollbackTarget,
    ) -> MigrationResult<RollbackOutcome> {
        let start_time = Instant::now();

        let descriptors = env.descriptors().await?;
        let ledger = env.ledger().list().await?;

        let (plan, breakpoint_hit) = match resolver::rollback_plan(
            &descriptors,
            &ledger,
            target,
            env.order(),
            self.options().force,
        ) {
            RollbackResolution::Outcome(outcome) => {
                log_outcome(&outcome);
                return Ok(outcome);
            }
            RollbackResolution::Plan {
                plan,
                breakpoint_hit,
            } => (plan, breakpoint_hit),
        };

        let entries: HashMap<Version, &VersionLogEntry> =
            ledger.iter().map(|entry| (entry.version, entry)).collect();

        let mut reverted = Vec::with_capacity(plan.len());
        for step in &plan.steps {
            let Some(entry) = entries.get(&step.descriptor.version) else {
                continue;
            };
            self.revert_step(env, &step.descriptor, entry).await?;
            reverted.push(step.descriptor.version);
        }

        let outcome = if breakpoint_hit {
            RollbackOutcome::BreakpointReached(reverted)
        } else {
            RollbackOutcome::Reverted(reverted)
        };
        log_outcome(&outcome);
        tracing::debug!(
            "rollback finished in {}ms",
            start_time.elapsed().as_millis()
        );
        Ok(outcome)
    }

    /// Revert exactly one applied version
    pub async fn rollback_only_this_version(
        &self,
        env: &Environment,
        version: Version,
    ) -> MigrationResult<RollbackOutcome> {
        let descriptors = env.descriptors().await?;
        let ledger = env.ledger().list().await?;

        let entry = ledger.iter().find(|entry| entry.version == version);
        let descriptor = descriptors.iter().find(|d| d.version == version);

        let outcome = match (entry, descriptor) {
            (Some(entry), Some(_)) if entry.breakpoint && !self.options().force => {
                RollbackOutcome::BreakpointReached(Vec::new())
            }
            (Some(entry), Some(descriptor)) => {
                self.revert_step(env, descriptor, entry).await?;
                RollbackOutcome::Reverted(vec![version])
            }
            _ => RollbackOutcome::TargetVersionNotFound(version.to_string()),
        };

        log_outcome(&outcome);
        Ok(outcome)
    }
}

fn log_outcome(outcome: &RollbackOutcome) {
    match outcome {
        RollbackOutcome::Reverted(versions) => {
            tracing::info!("Rolled back {} migrations", versions.len());
        }
        RollbackOutcome::NoMigrationsToRollback => {
            tracing::info!("No migrations to rollback");
        }
        RollbackOutcome::TargetVersionNotFound(target) => {
            tracing::warn!("Target version ({}) not found", target);
        }
        RollbackOutcome::BreakpointReached(versions) => {
            tracing::warn!(
                "Breakpoint reached after {} migrations. Further rollbacks inhibited.",
                versions.len()
            );
        }
    }
}
