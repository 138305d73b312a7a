//! # tidemark-engine
//!
//! Tracks which schema migrations an environment has applied and moves it
//! forward or backward through them, honouring breakpoints that protect
//! versions from rollback. Also orders and runs data seeds by their declared
//! dependencies.
//!
//! The engine only talks to narrow traits: [`MigrationSource`] and
//! [`SeedSource`] supply definitions, [`VersionLog`] stores applied state.
//! In-memory, code-registered, SQL directory and Postgres implementations
//! are provided.

pub mod environment;
pub mod error;
pub mod ledger;
pub mod migrations;
pub mod seeding;

pub use environment::Environment;
pub use error::{BoxError, Direction, MigrationError, MigrationResult};
pub use ledger::{MemoryVersionLog, PgVersionLog, VersionLog};
pub use migrations::{
    BreakpointOutcome, CodeMigrationSource, DirectoryMigrationSource, EngineOptions,
    ExecutionContext, MigrateReport, Migration, MigrationDescriptor, MigrationEngine,
    MigrationSource, MigrationStatus, RollbackOutcome, RollbackTarget, StatusReport,
    StatusReporter, Version, VersionLogEntry,
};
pub use seeding::{
    CodeSeedSource, DirectorySeedSource, SeedContext, SeedDescriptor, SeedReport, SeedResolver,
    SeedSource, Seeder,
};
