//! Error types for the migration engine
//!
//! Configuration problems (duplicate versions, malformed descriptors, seed
//! cycles) abort before anything is executed. Execution failures abort the
//! remaining plan; steps that already completed stay recorded in the ledger.

use std::fmt;
use thiserror::Error;
use tidemark_core::ConfigError;

use crate::migrations::Version;

/// Result type alias for engine operations
pub type MigrationResult<T> = Result<T, MigrationError>;

/// Boxed error returned by migration and seed bodies
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Direction a migration body runs in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Apply the migration (run UP statements)
    Up,
    /// Revert the migration (run DOWN statements)
    Down,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Up => write!(f, "migrating"),
            Direction::Down => write!(f, "reverting"),
        }
    }
}

/// Error types for migration and seed operations
#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("Duplicate migration - \"{second}\" has the same version as \"{first}\" ({version})")]
    DuplicateVersion {
        version: Version,
        first: String,
        second: String,
    },

    #[error("Duplicate name - \"{name}\" is defined more than once in namespace {namespace}")]
    DuplicateName { name: String, namespace: String },

    #[error("Invalid definition at {location}: {reason}")]
    InvalidDescriptor { location: String, reason: String },

    #[error("The seed \"{0}\" does not exist")]
    UnknownSeed(String),

    #[error("Seed \"{seed}\" depends on \"{dependency}\", which does not exist")]
    MissingSeedDependency { seed: String, dependency: String },

    #[error("Seed \"{seed}\" depends on \"{dependency}\", which is defined in more than one namespace")]
    AmbiguousSeedDependency { seed: String, dependency: String },

    #[error("Circular dependency detected in seeds: {cycle}")]
    SeedCycle { cycle: String },

    #[error("Migration {version} {name} failed while {direction}: {source}")]
    Execution {
        version: Version,
        name: String,
        direction: Direction,
        #[source]
        source: BoxError,
    },

    #[error("Seed {name} failed: {source}")]
    SeedExecution {
        name: String,
        #[source]
        source: BoxError,
    },

    #[error("Version log error: {message}")]
    Ledger { message: String },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl MigrationError {
    /// Create a malformed descriptor error
    pub fn invalid_descriptor(location: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidDescriptor {
            location: location.into(),
            reason: reason.into(),
        }
    }

    /// Create a version log error
    pub fn ledger(message: impl Into<String>) -> Self {
        Self::Ledger {
            message: message.into(),
        }
    }

    /// Check whether this error was raised while loading or validating
    /// definitions, before anything ran
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::DuplicateVersion { .. }
                | Self::DuplicateName { .. }
                | Self::InvalidDescriptor { .. }
                | Self::UnknownSeed(_)
                | Self::MissingSeedDependency { .. }
                | Self::SeedCycle { .. }
                | Self::Config(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_execution_error_message() {
        let err = MigrationError::Execution {
            version: 20240101120000,
            name: "CreateUsers".to_string(),
            direction: Direction::Up,
            source: "relation already exists".into(),
        };

        assert_eq!(
            err.to_string(),
            "Migration 20240101120000 CreateUsers failed while migrating: relation already exists"
        );
        assert!(!err.is_configuration());
    }

    #[test]
    fn test_configuration_classification() {
        assert!(MigrationError::UnknownSeed("UserSeeder".to_string()).is_configuration());
        assert!(MigrationError::SeedCycle {
            cycle: "A, B".to_string()
        }
        .is_configuration());
        assert!(!MigrationError::ledger("table missing").is_configuration());
    }
}
