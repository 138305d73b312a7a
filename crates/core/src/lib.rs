//! # tidemark-core
//!
//! Configuration model and shared error types for the tidemark migration
//! tool: environments, migration and seed paths, ledger table naming and
//! the ordering policy used by the engine.

pub mod config;
pub mod errors;

pub use config::validation::ConfigError;
pub use config::{
    AppConfigTrait, ConfigSource, EnvironmentConfig, ExecutionOrder, PathConfig, TidemarkConfig,
};
pub use errors::CoreError;
