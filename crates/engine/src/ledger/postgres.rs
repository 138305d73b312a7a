//! Postgres-backed version log
//!
//! Keeps one row per applied version in a configurable table, created on
//! demand.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};

use super::VersionLog;
use crate::error::{MigrationError, MigrationResult};
use crate::migrations::{Version, VersionLogEntry};

/// Longest migration name stored in the log
const MAX_NAME_LENGTH: usize = 100;

/// Version log stored in a Postgres table
pub struct PgVersionLog {
    pool: PgPool,
    table: String,
}

impl PgVersionLog {
    /// Create a version log over `table`; call [`ensure_table`](Self::ensure_table)
    /// before first use
    pub fn new(pool: PgPool, table: impl Into<String>) -> Self {
        Self {
            pool,
            table: table.into(),
        }
    }

    /// Connect and make sure the ledger table exists
    pub async fn connect(database_url: &str, table: impl Into<String>) -> MigrationResult<Self> {
        let pool = PgPool::connect(database_url).await?;
        let log = Self::new(pool, table);
        log.ensure_table().await?;
        Ok(log)
    }

    /// Get the database pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Create the ledger table if it does not exist
    pub async fn ensure_table(&self) -> MigrationResult<()> {
        sqlx::query(&self.create_table_sql())
            .execute(&self.pool)
            .await?;
        tracing::debug!("version log table {} is ready", self.table);
        Ok(())
    }

    /// SQL to create the ledger table
    fn create_table_sql(&self) -> String {
        format!(
            "CREATE TABLE IF NOT EXISTS {} (\n    \
                version BIGINT PRIMARY KEY,\n    \
                migration_name VARCHAR({}),\n    \
                start_time TIMESTAMPTZ NOT NULL,\n    \
                end_time TIMESTAMPTZ NOT NULL,\n    \
                breakpoint BOOLEAN NOT NULL DEFAULT FALSE,\n    \
                skipped BOOLEAN NOT NULL DEFAULT FALSE\n\
            );",
            self.table, MAX_NAME_LENGTH
        )
    }

    /// SQL to read every entry
    fn list_sql(&self) -> String {
        format!(
            "SELECT version, migration_name, start_time, end_time, breakpoint, skipped \
             FROM {} ORDER BY version ASC",
            self.table
        )
    }

    /// SQL to record a version
    fn insert_sql(&self) -> String {
        format!(
            "INSERT INTO {} (version, migration_name, start_time, end_time, breakpoint, skipped) \
             VALUES ($1, $2, $3, $4, $5, $6)",
            self.table
        )
    }

    /// SQL to overwrite a version in place
    fn update_sql(&self) -> String {
        format!(
            "UPDATE {} SET migration_name = $2, start_time = $3, end_time = $4, \
             breakpoint = $5, skipped = $6 WHERE version = $1",
            self.table
        )
    }

    /// SQL to remove a version
    fn delete_sql(&self) -> String {
        format!("DELETE FROM {} WHERE version = $1", self.table)
    }

    /// SQL to set one breakpoint
    fn update_breakpoint_sql(&self) -> String {
        format!("UPDATE {} SET breakpoint = $2 WHERE version = $1", self.table)
    }

    /// SQL to clear every breakpoint
    fn reset_breakpoints_sql(&self) -> String {
        format!(
            "UPDATE {} SET breakpoint = FALSE WHERE breakpoint <> FALSE",
            self.table
        )
    }

    fn expect_one_row(&self, affected: u64, version: Version) -> MigrationResult<()> {
        if affected == 0 {
            return Err(MigrationError::ledger(format!(
                "version {} is not recorded in {}",
                version, self.table
            )));
        }
        Ok(())
    }
}

fn truncate_name(name: &str) -> String {
    name.chars().take(MAX_NAME_LENGTH).collect()
}

#[async_trait]
impl VersionLog for PgVersionLog {
    async fn list(&self) -> MigrationResult<Vec<VersionLogEntry>> {
        let rows = sqlx::query(&self.list_sql()).fetch_all(&self.pool).await?;

        let mut entries = Vec::with_capacity(rows.len());
        for row in rows {
            let migration_name: Option<String> = row.try_get("migration_name")?;
            let start_time: DateTime<Utc> = row.try_get("start_time")?;
            let end_time: DateTime<Utc> = row.try_get("end_time")?;

            entries.push(VersionLogEntry {
                version: row.try_get("version")?,
                migration_name: migration_name.unwrap_or_default(),
                start_time,
                end_time,
                breakpoint: row.try_get("breakpoint")?,
                skipped: row.try_get("skipped")?,
            });
        }

        Ok(entries)
    }

    async fn insert(&self, entry: VersionLogEntry) -> MigrationResult<()> {
        sqlx::query(&self.insert_sql())
            .bind(entry.version)
            .bind(truncate_name(&entry.migration_name))
            .bind(entry.start_time)
            .bind(entry.end_time)
            .bind(entry.breakpoint)
            .bind(entry.skipped)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn update(&self, entry: VersionLogEntry) -> MigrationResult<()> {
        let result = sqlx::query(&self.update_sql())
            .bind(entry.version)
            .bind(truncate_name(&entry.migration_name))
            .bind(entry.start_time)
            .bind(entry.end_time)
            .bind(entry.breakpoint)
            .bind(entry.skipped)
            .execute(&self.pool)
            .await?;
        self.expect_one_row(result.rows_affected(), entry.version)
    }

    async fn delete(&self, version: Version) -> MigrationResult<()> {
        let result = sqlx::query(&self.delete_sql())
            .bind(version)
            .execute(&self.pool)
            .await?;
        self.expect_one_row(result.rows_affected(), version)
    }

    async fn update_breakpoint(&self, version: Version, breakpoint: bool) -> MigrationResult<()> {
        let result = sqlx::query(&self.update_breakpoint_sql())
            .bind(version)
            .bind(breakpoint)
            .execute(&self.pool)
            .await?;
        self.expect_one_row(result.rows_affected(), version)
    }

    async fn reset_breakpoints(&self) -> MigrationResult<u64> {
        let result = sqlx::query(&self.reset_breakpoints_sql())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::postgres::PgPoolOptions;

    fn log() -> PgVersionLog {
        // connect_lazy never touches the network until a query runs
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://localhost/tidemark_test")
            .unwrap();
        PgVersionLog::new(pool, "test_log")
    }

    #[tokio::test]
    async fn test_ledger_sql_generation() {
        let log = log();

        let create = log.create_table_sql();
        assert!(create.contains("CREATE TABLE IF NOT EXISTS test_log"));
        assert!(create.contains("version BIGINT PRIMARY KEY"));
        assert!(create.contains("breakpoint BOOLEAN NOT NULL DEFAULT FALSE"));
        assert!(create.contains("skipped BOOLEAN"));

        assert!(log.list_sql().contains("FROM test_log ORDER BY version ASC"));
        assert!(log.insert_sql().starts_with("INSERT INTO test_log"));
        assert!(log.update_sql().contains("WHERE version = $1"));
        assert_eq!(log.delete_sql(), "DELETE FROM test_log WHERE version = $1");
        assert!(log.reset_breakpoints_sql().contains("WHERE breakpoint <> FALSE"));
    }

    #[test]
    fn test_truncate_name() {
        assert_eq!(truncate_name("CreateUsers"), "CreateUsers");
        assert_eq!(truncate_name(&"x".repeat(150)).len(), MAX_NAME_LENGTH);
    }
}
