//! Migration Definitions - Core types and structures for migrations
//!
//! Defines the descriptor handed out by migration sources, the ledger entry
//! persisted by version logs, and the plans and outcomes exchanged between
//! the resolver and the engine.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use crate::error::{BoxError, Direction};
use tidemark_core::ExecutionOrder;

/// Migration version: a sortable `YYYYMMDDHHMMSS` creation timestamp
pub type Version = i64;

/// Context handed to migration and seed bodies
#[derive(Debug, Clone, Copy)]
pub struct ExecutionContext<'a> {
    /// Name of the environment being migrated
    pub environment: &'a str,
    /// Direction of the current step
    pub direction: Direction,
}

/// Executable body of a migration
#[async_trait]
pub trait Migration: Send + Sync {
    /// Apply the schema change
    async fn up(&self, ctx: &ExecutionContext<'_>) -> Result<(), BoxError>;

    /// Reverse the schema change
    async fn down(&self, ctx: &ExecutionContext<'_>) -> Result<(), BoxError>;

    /// Whether the body should run at all in this environment
    fn should_execute(&self) -> bool {
        true
    }
}

/// A discovered migration, decoupled from how its body is implemented
#[derive(Clone)]
pub struct MigrationDescriptor {
    pub version: Version,
    pub name: String,
    pub namespace: Option<String>,
    body: Arc<dyn Migration>,
}

impl MigrationDescriptor {
    pub fn new(version: Version, name: impl Into<String>, body: impl Migration + 'static) -> Self {
        Self::from_arc(version, name, Arc::new(body))
    }

    pub fn from_arc(version: Version, name: impl Into<String>, body: Arc<dyn Migration>) -> Self {
        Self {
            version,
            name: name.into(),
            namespace: None,
            body,
        }
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Name prefixed with its namespace, if any
    pub fn qualified_name(&self) -> String {
        match &self.namespace {
            Some(namespace) => format!("{}::{}", namespace, self.name),
            None => self.name.clone(),
        }
    }

    pub async fn apply(&self, environment: &str) -> Result<(), BoxError> {
        let ctx = ExecutionContext {
            environment,
            direction: Direction::Up,
        };
        self.body.up(&ctx).await
    }

    pub async fn revert(&self, environment: &str) -> Result<(), BoxError> {
        let ctx = ExecutionContext {
            environment,
            direction: Direction::Down,
        };
        self.body.down(&ctx).await
    }

    pub fn should_execute(&self) -> bool {
        self.body.should_execute()
    }
}

impl fmt::Debug for MigrationDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MigrationDescriptor")
            .field("version", &self.version)
            .field("name", &self.name)
            .field("namespace", &self.namespace)
            .finish_non_exhaustive()
    }
}

/// One row of the persisted version log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionLogEntry {
    pub version: Version,
    pub migration_name: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub breakpoint: bool,
    /// Recorded as applied without running the body
    pub skipped: bool,
}

impl VersionLogEntry {
    pub fn new(
        version: Version,
        migration_name: impl Into<String>,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
    ) -> Self {
        Self {
            version,
            migration_name: migration_name.into(),
            start_time,
            end_time,
            breakpoint: false,
            skipped: false,
        }
    }

    pub fn with_breakpoint(mut self, breakpoint: bool) -> Self {
        self.breakpoint = breakpoint;
        self
    }

    pub fn with_skipped(mut self, skipped: bool) -> Self {
        self.skipped = skipped;
        self
    }
}

/// Compare two ledger entries by the given ordering policy, ascending.
///
/// Execution-time ties fall back to the version so the order is total.
pub fn compare_entries(order: ExecutionOrder, a: &VersionLogEntry, b: &VersionLogEntry) -> Ordering {
    match order {
        ExecutionOrder::ByCreationVersion => a.version.cmp(&b.version),
        ExecutionOrder::ByExecutionTime => a
            .start_time
            .cmp(&b.start_time)
            .then_with(|| a.version.cmp(&b.version)),
    }
}

/// A single planned action
#[derive(Debug, Clone)]
pub struct PlanStep {
    pub descriptor: MigrationDescriptor,
    pub direction: Direction,
}

/// Ordered actions computed by the resolver
#[derive(Debug, Clone, Default)]
pub struct ExecutionPlan {
    pub steps: Vec<PlanStep>,
}

impl ExecutionPlan {
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn versions(&self) -> Vec<Version> {
        self.steps.iter().map(|step| step.descriptor.version).collect()
    }
}

/// Result of running migrations forward
#[derive(Debug, Default)]
pub struct MigrateReport {
    /// Versions whose bodies ran
    pub applied: Vec<Version>,
    /// Versions recorded without running the body
    pub skipped: Vec<Version>,
    /// Total execution time in milliseconds
    pub execution_time_ms: u128,
}

impl MigrateReport {
    pub fn is_empty(&self) -> bool {
        self.applied.is_empty() && self.skipped.is_empty()
    }
}

/// Result of a rollback request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RollbackOutcome {
    /// Versions reverted, newest first
    Reverted(Vec<Version>),
    /// Nothing was eligible for reverting
    NoMigrationsToRollback,
    /// The explicit version or name target is not in the ledger
    TargetVersionNotFound(String),
    /// A breakpoint halted the pass; holds what was reverted before it
    BreakpointReached(Vec<Version>),
}

impl RollbackOutcome {
    /// Versions reverted during this pass
    pub fn reverted(&self) -> &[Version] {
        match self {
            RollbackOutcome::Reverted(versions) | RollbackOutcome::BreakpointReached(versions) => {
                versions
            }
            _ => &[],
        }
    }
}

/// Result of a breakpoint mutation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BreakpointOutcome {
    /// The entry now carries the given breakpoint state
    Applied { version: Version, breakpoint: bool },
    /// The requested version is not applied (or nothing is applied at all)
    InvalidVersion(Option<Version>),
}
