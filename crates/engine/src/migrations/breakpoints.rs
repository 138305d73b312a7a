//! Breakpoint maintenance

use super::definitions::{compare_entries, BreakpointOutcome, Version};
use super::runner::MigrationEngine;
use crate::environment::Environment;
use crate::error::MigrationResult;

#[derive(Debug, Clone, Copy)]
enum Mark {
    Toggle,
    Set,
    Unset,
}

impl MigrationEngine {
    /// Flip the breakpoint of `version`, or of the most recently applied
    /// version when absent
    pub async fn toggle_breakpoint(
        &self,
        env: &Environment,
        version: Option<Version>,
    ) -> MigrationResult<BreakpointOutcome> {
        self.mark_breakpoint(env, version, Mark::Toggle).await
    }

    pub async fn set_breakpoint(
        &self,
        env: &Environment,
        version: Option<Version>,
    ) -> MigrationResult<BreakpointOutcome> {
        self.mark_breakpoint(env, version, Mark::Set).await
    }

    pub async fn unset_breakpoint(
        &self,
        env: &Environment,
        version: Option<Version>,
    ) -> MigrationResult<BreakpointOutcome> {
        self.mark_breakpoint(env, version, Mark::Unset).await
    }

    /// Clear every breakpoint, returning how many entries changed
    pub async fn remove_breakpoints(&self, env: &Environment) -> MigrationResult<u64> {
        let cleared = env.ledger().reset_breakpoints().await?;
        tracing::info!("{} breakpoints cleared", cleared);
        Ok(cleared)
    }

    async fn mark_breakpoint(
        &self,
        env: &Environment,
        version: Option<Version>,
        mark: Mark,
    ) -> MigrationResult<BreakpointOutcome> {
        let ledger = env.ledger().list().await?;

        let entry = match version {
            Some(version) => ledger.iter().find(|entry| entry.version == version),
            None => ledger
                .iter()
                .max_by(|a, b| compare_entries(env.order(), a, b)),
        };

        let Some(entry) = entry else {
            tracing::warn!(
                "{} is not a valid version",
                version.map_or_else(|| "(none)".to_string(), |v| v.to_string())
            );
            return Ok(BreakpointOutcome::InvalidVersion(version));
        };

        let breakpoint = match mark {
            Mark::Toggle => !entry.breakpoint,
            Mark::Set => true,
            Mark::Unset => false,
        };
        env.ledger()
            .update_breakpoint(entry.version, breakpoint)
            .await?;

        tracing::info!(
            "Breakpoint {} for {} {}",
            if breakpoint { "set" } else { "cleared" },
            entry.version,
            entry.migration_name
        );
        Ok(BreakpointOutcome::Applied {
            version: entry.version,
            breakpoint,
        })
    }
}
