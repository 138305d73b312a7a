//! Version Log - persisted record of applied migrations
//!
//! The ledger is the single source of truth for what has been applied.
//! Every engine step writes (or deletes) its entry before the next step
//! starts, so re-running a command after a failure recomputes the plan
//! from exactly what completed.

use async_trait::async_trait;

use crate::error::MigrationResult;
use crate::migrations::{Version, VersionLogEntry};

pub mod memory;
pub mod postgres;

pub use memory::MemoryVersionLog;
pub use postgres::PgVersionLog;

/// Storage for [`VersionLogEntry`] rows
#[async_trait]
pub trait VersionLog: Send + Sync {
    /// All entries, ascending by version
    async fn list(&self) -> MigrationResult<Vec<VersionLogEntry>>;

    /// Record a newly applied version
    async fn insert(&self, entry: VersionLogEntry) -> MigrationResult<()>;

    /// Overwrite an existing entry in place
    async fn update(&self, entry: VersionLogEntry) -> MigrationResult<()>;

    /// Remove a reverted version
    async fn delete(&self, version: Version) -> MigrationResult<()>;

    /// Set or clear the breakpoint bit of one entry
    async fn update_breakpoint(&self, version: Version, breakpoint: bool) -> MigrationResult<()>;

    /// Clear every breakpoint, returning how many entries changed
    async fn reset_breakpoints(&self) -> MigrationResult<u64>;
}
