//! Migration status reporting
//!
//! Builds the up/down/missing view of an environment and renders it either as
//! the machine-readable JSON summary or as a plain-text table.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Write as _};

use super::definitions::{MigrationDescriptor, Version, VersionLogEntry};
use super::resolver;
use crate::environment::Environment;
use crate::error::MigrationResult;
use tidemark_core::ExecutionOrder;

/// Exit code when applied versions have no definition
pub const EXIT_MISSING_MIGRATIONS: i32 = 2;
/// Exit code when definitions are waiting to be applied
pub const EXIT_DOWN_MIGRATIONS: i32 = 3;

/// Classification of one version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MigrationStatus {
    /// Applied and defined
    #[serde(rename = "up")]
    Up,
    /// Applied but no longer defined
    #[serde(rename = "up-missing")]
    UpMissing,
    /// Defined but not applied
    #[serde(rename = "down")]
    Down,
}

impl fmt::Display for MigrationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MigrationStatus::Up => write!(f, "up"),
            MigrationStatus::UpMissing => write!(f, "up"),
            MigrationStatus::Down => write!(f, "down"),
        }
    }
}

/// One line of the status view
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusRow {
    pub status: MigrationStatus,
    pub version: Version,
    pub name: String,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub breakpoint: bool,
}

impl StatusRow {
    pub(crate) fn applied(
        status: MigrationStatus,
        name: impl Into<String>,
        entry: &VersionLogEntry,
    ) -> Self {
        Self {
            status,
            version: entry.version,
            name: name.into(),
            start_time: Some(entry.start_time),
            end_time: Some(entry.end_time),
            breakpoint: entry.breakpoint,
        }
    }

    pub(crate) fn pending(descriptor: &MigrationDescriptor) -> Self {
        Self {
            status: MigrationStatus::Down,
            version: descriptor.version,
            name: descriptor.name.clone(),
            start_time: None,
            end_time: None,
            breakpoint: false,
        }
    }
}

/// Up/down/missing view of one environment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusReport {
    pub rows: Vec<StatusRow>,
    pub has_missing_migration: bool,
    pub has_down_migration: bool,
}

/// Entry of the JSON summary's `migrations` array
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusSummaryEntry {
    pub migration_status: String,
    pub migration_id: String,
    pub migration_name: String,
}

/// Machine-readable status summary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusSummary {
    pub pending_count: usize,
    pub missing_count: usize,
    pub total_count: usize,
    pub migrations: Vec<StatusSummaryEntry>,
}

impl StatusReport {
    pub fn pending_count(&self) -> usize {
        self.count(MigrationStatus::Down)
    }

    pub fn missing_count(&self) -> usize {
        self.count(MigrationStatus::UpMissing)
    }

    fn count(&self, status: MigrationStatus) -> usize {
        self.rows.iter().filter(|row| row.status == status).count()
    }

    /// Process exit code for the status command
    pub fn exit_code(&self) -> i32 {
        if self.has_missing_migration {
            EXIT_MISSING_MIGRATIONS
        } else if self.has_down_migration {
            EXIT_DOWN_MIGRATIONS
        } else {
            0
        }
    }

    /// Build the JSON summary; missing versions are counted but not listed
    pub fn summary(&self) -> StatusSummary {
        let migrations: Vec<_> = self
            .rows
            .iter()
            .filter(|row| row.status != MigrationStatus::UpMissing)
            .map(|row| StatusSummaryEntry {
                migration_status: row.status.to_string(),
                migration_id: format!("{:14}", row.version),
                migration_name: row.name.clone(),
            })
            .collect();

        StatusSummary {
            pending_count: self.pending_count(),
            missing_count: self.missing_count(),
            total_count: migrations.len() + self.missing_count(),
            migrations,
        }
    }

    pub fn to_json(&self) -> MigrationResult<String> {
        Ok(serde_json::to_string(&self.summary())?)
    }

    /// Render the plain-text table
    pub fn render_table(&self, order: ExecutionOrder) -> String {
        let mut out = String::new();

        if self.rows.is_empty() {
            out.push_str("There are no available migrations.\n");
            return out;
        }

        let id_header = match order {
            ExecutionOrder::ByCreationVersion => "[Migration ID]  Started            ",
            ExecutionOrder::ByExecutionTime => "Migration ID    [Started          ]",
        };
        let _ = writeln!(out, " Status  {}  Finished             Migration Name ", id_header);
        out.push_str(&"-".repeat(82));
        out.push('\n');

        for row in &self.rows {
            let started = row.start_time.map(format_time).unwrap_or_default();
            let finished = row.end_time.map(format_time).unwrap_or_default();

            let name = match row.status {
                MigrationStatus::UpMissing => format!("{}  ** MISSING MIGRATION FILE **", row.name),
                _ => row.name.clone(),
            };

            let _ = writeln!(
                out,
                "{:>7}  {:>14}  {:>19}  {:>19}  {}",
                row.status.to_string(),
                row.version,
                started,
                finished,
                name
            );

            if row.breakpoint {
                out.push_str("         BREAKPOINT SET\n");
            }
        }

        out
    }
}

fn format_time(time: DateTime<Utc>) -> String {
    time.format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Builds status reports for an environment
pub struct StatusReporter;

impl StatusReporter {
    /// Classify every defined and applied version of the environment
    pub async fn report(env: &Environment) -> MigrationResult<StatusReport> {
        let descriptors = env.descriptors().await?;
        let ledger = env.ledger().list().await?;
        Ok(resolver::status(&descriptors, &ledger, env.order()))
    }
}
