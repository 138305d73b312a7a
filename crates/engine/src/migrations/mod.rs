//! Migration System
//!
//! Descriptors come from a [`MigrationSource`], applied state lives in a
//! [`VersionLog`](crate::ledger::VersionLog). The resolver turns both into a
//! plan and the [`MigrationEngine`] executes it.

pub mod breakpoints;
pub mod definitions;
pub mod directory;
pub mod resolver;
pub mod rollback;
pub mod runner;
pub mod source;
pub mod status;
pub mod target;

pub use definitions::{
    compare_entries, BreakpointOutcome, ExecutionContext, ExecutionPlan, MigrateReport, Migration,
    MigrationDescriptor, PlanStep, RollbackOutcome, Version, VersionLogEntry,
};
pub use directory::{DirectoryMigrationSource, MigrationScript, SqlMigration};
pub use resolver::RollbackResolution;
pub use runner::{EngineOptions, MigrationEngine};
pub use source::{CodeMigrationSource, MigrationSource};
pub use status::{
    MigrationStatus, StatusReport, StatusReporter, StatusRow, StatusSummary, StatusSummaryEntry,
    EXIT_DOWN_MIGRATIONS, EXIT_MISSING_MIGRATIONS,
};
pub use target::{parse_target_date, version_from_datetime, RollbackTarget};
