//! Migration Engine - Applies migrations to an environment
//!
//! Every step is awaited to completion, ledger write included, before the
//! next one starts. A failing step aborts the rest of the plan and leaves the
//! steps before it recorded.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::time::Instant;

use super::definitions::{MigrateReport, MigrationDescriptor, Version, VersionLogEntry};
use super::resolver;
use super::target::version_from_datetime;
use crate::environment::Environment;
use crate::error::{Direction, MigrationError, MigrationResult};

/// Behaviour switches for a migration engine
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineOptions {
    /// Record ledger changes without running migration bodies
    pub fake: bool,
    /// Ignore breakpoints when rolling back
    pub force: bool,
}

/// Orchestrates resolution and execution against an environment
#[derive(Debug, Clone, Default)]
pub struct MigrationEngine {
    options: EngineOptions,
}

impl MigrationEngine {
    /// Create an engine with default options
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an engine with custom options
    pub fn with_options(options: EngineOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> EngineOptions {
        self.options
    }

    /// Apply every pending migration up to and including `target`
    pub async fn migrate(
        &self,
        env: &Environment,
        target: Option<Version>,
    ) -> MigrationResult<MigrateReport> {
        let start_time = Instant::now();

        let descriptors = env.descriptors().await?;
        let ledger = env.ledger().list().await?;
        let recorded: HashMap<Version, VersionLogEntry> =
            ledger.iter().map(|entry| (entry.version, entry.clone())).collect();

        let plan = resolver::migrate_plan(&descriptors, &ledger, target);
        if plan.is_empty() {
            tracing::info!("No migrations to apply in environment {}", env.name());
        }

        let mut report = MigrateReport::default();
        for step in &plan.steps {
            let descriptor = &step.descriptor;
            let existing = recorded.get(&descriptor.version);

            if !descriptor.should_execute() {
                tracing::warn!(
                    " == {} {}: skipped",
                    descriptor.version,
                    descriptor.qualified_name()
                );
                if existing.is_none() {
                    let now = Utc::now();
                    let entry = VersionLogEntry::new(descriptor.version, &descriptor.name, now, now)
                        .with_skipped(true);
                    env.ledger().insert(entry).await?;
                }
                report.skipped.push(descriptor.version);
                continue;
            }

            self.apply_step(env, descriptor, existing).await?;
            report.applied.push(descriptor.version);
        }

        report.execution_time_ms = start_time.elapsed().as_millis();
        Ok(report)
    }

    /// Migrate up to the newest version created at or before `date`; a date
    /// before every migration does nothing
    pub async fn migrate_to_datetime(
        &self,
        env: &Environment,
        date: DateTime<Utc>,
    ) -> MigrationResult<MigrateReport> {
        let descriptors = env.descriptors().await?;
        match resolver::newest_version_at_or_before(&descriptors, version_from_datetime(&date)) {
            Some(version) => {
                tracing::info!("Migrating to version {}", version);
                self.migrate(env, Some(version)).await
            }
            None => {
                tracing::info!(
                    "No migrations created at or before {}",
                    date.format("%Y-%m-%d %H:%M:%S")
                );
                Ok(MigrateReport::default())
            }
        }
    }

    /// Run one migration up and record it
    async fn apply_step(
        &self,
        env: &Environment,
        descriptor: &MigrationDescriptor,
        existing: Option<&VersionLogEntry>,
    ) -> MigrationResult<()> {
        tracing::info!(
            " == {} {}: migrating",
            descriptor.version,
            descriptor.qualified_name()
        );

        let timer = Instant::now();
        let start = Utc::now();
        if !self.options.fake {
            descriptor
                .apply(env.name())
                .await
                .map_err(|source| MigrationError::Execution {
                    version: descriptor.version,
                    name: descriptor.qualified_name(),
                    direction: Direction::Up,
                    source,
                })?;
        }
        let end = Utc::now();

        let entry = VersionLogEntry::new(descriptor.version, &descriptor.name, start, end);
        match existing {
            Some(previous) => {
                let entry = entry.with_breakpoint(previous.breakpoint);
                env.ledger().update(entry).await?;
            }
            None => env.ledger().insert(entry).await?,
        }

        tracing::info!(
            " == {} {}: migrated {}ms",
            descriptor.version,
            descriptor.qualified_name(),
            timer.elapsed().as_millis()
        );
        Ok(())
    }

    /// Run one migration down (unless it never ran) and drop its entry
    pub(crate) async fn revert_step(
        &self,
        env: &Environment,
        descriptor: &MigrationDescriptor,
        entry: &VersionLogEntry,
    ) -> MigrationResult<()> {
        let runs_body = !self.options.fake && !entry.skipped && descriptor.should_execute();

        tracing::info!(
            " == {} {}: reverting",
            descriptor.version,
            descriptor.qualified_name()
        );

        let timer = Instant::now();
        if runs_body {
            descriptor
                .revert(env.name())
                .await
                .map_err(|source| MigrationError::Execution {
                    version: descriptor.version,
                    name: descriptor.qualified_name(),
                    direction: Direction::Down,
                    source,
                })?;
        }
        env.ledger().delete(descriptor.version).await?;

        tracing::info!(
            " == {} {}: reverted {}ms",
            descriptor.version,
            descriptor.qualified_name(),
            timer.elapsed().as_millis()
        );
        Ok(())
    }
}
