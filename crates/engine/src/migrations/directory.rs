//! SQL file migrations
//!
//! Loads `<YYYYMMDDHHMMSS>_<snake_name>.sql` files from the configured
//! migration paths. Each file holds an `-- Up migration` section and an
//! optional `-- Down migration` section, executed as plain scripts.

use async_trait::async_trait;
use regex::Regex;
use sqlx::{Executor, PgPool};
use std::fs;
use std::path::{Path, PathBuf};

use super::definitions::{ExecutionContext, Migration, MigrationDescriptor, Version};
use super::source::MigrationSource;
use crate::error::{BoxError, MigrationError, MigrationResult};
use tidemark_core::PathConfig;

const FILE_PATTERN: &str = r"^(\d{14})_([a-z0-9_]+)\.sql$";

/// Run a script through the simple query protocol so it may hold several
/// statements
pub(crate) async fn execute_script(pool: &PgPool, sql: &str) -> Result<(), BoxError> {
    if sql.trim().is_empty() {
        return Ok(());
    }
    pool.execute(sql).await?;
    Ok(())
}

/// `create_users_table` -> `CreateUsersTable`
pub(crate) fn camel_case(snake: &str) -> String {
    snake
        .split('_')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect()
}

/// `.sql` files of a directory, sorted by file name; a missing directory is empty
pub(crate) fn sql_files(dir: &Path) -> MigrationResult<Vec<PathBuf>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && path.extension().map_or(false, |ext| ext == "sql") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Up and down sections of a migration file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationScript {
    pub up_sql: String,
    pub down_sql: String,
}

impl MigrationScript {
    /// Split file content at the section markers.
    ///
    /// Returns `None` when the file has no up section.
    pub fn parse(content: &str) -> Option<Self> {
        let mut up_sql = Vec::new();
        let mut down_sql = Vec::new();
        let mut section = None;
        let mut has_up = false;

        for line in content.lines() {
            if let Some(marker) = section_marker(line) {
                has_up |= marker == Section::Up;
                section = Some(marker);
                continue;
            }

            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with("--") {
                continue;
            }

            match section {
                Some(Section::Up) => up_sql.push(line),
                Some(Section::Down) => down_sql.push(line),
                None => {}
            }
        }

        has_up.then(|| Self {
            up_sql: up_sql.join("\n").trim().to_string(),
            down_sql: down_sql.join("\n").trim().to_string(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Up,
    Down,
}

/// `-- Up`, `-- Up migration`, `-- Down`, `-- Down migration`, any case
fn section_marker(line: &str) -> Option<Section> {
    let comment = line.trim().strip_prefix("--")?.trim().to_lowercase();
    let marker = comment.strip_suffix("migration").unwrap_or(&comment).trim_end();
    match marker {
        "up" => Some(Section::Up),
        "down" => Some(Section::Down),
        _ => None,
    }
}

/// Migration body backed by a SQL file
pub struct SqlMigration {
    pool: PgPool,
    location: String,
    script: MigrationScript,
}

impl SqlMigration {
    pub fn new(pool: PgPool, location: impl Into<String>, script: MigrationScript) -> Self {
        Self {
            pool,
            location: location.into(),
            script,
        }
    }
}

#[async_trait]
impl Migration for SqlMigration {
    async fn up(&self, _ctx: &ExecutionContext<'_>) -> Result<(), BoxError> {
        execute_script(&self.pool, &self.script.up_sql).await
    }

    async fn down(&self, _ctx: &ExecutionContext<'_>) -> Result<(), BoxError> {
        if self.script.down_sql.is_empty() {
            return Err(format!("{} has no down migration section", self.location).into());
        }
        execute_script(&self.pool, &self.script.down_sql).await
    }
}

/// Migrations loaded from SQL files in namespaced directories
pub struct DirectoryMigrationSource {
    pool: PgPool,
    paths: Vec<PathConfig>,
}

impl DirectoryMigrationSource {
    pub fn new(pool: PgPool, paths: Vec<PathConfig>) -> Self {
        Self { pool, paths }
    }

    fn load_file(
        &self,
        pattern: &Regex,
        path: &Path,
        namespace: Option<&str>,
    ) -> MigrationResult<Option<MigrationDescriptor>> {
        let Some(file_name) = path.file_name().and_then(|name| name.to_str()) else {
            return Ok(None);
        };
        let Some(captures) = pattern.captures(file_name) else {
            tracing::debug!("ignoring {} (not a migration file name)", path.display());
            return Ok(None);
        };

        let location = path.display().to_string();
        let version: Version = captures[1]
            .parse()
            .map_err(|_| MigrationError::invalid_descriptor(&location, "version is not a number"))?;
        let name = camel_case(&captures[2]);

        let content = fs::read_to_string(path)?;
        let script = MigrationScript::parse(&content).ok_or_else(|| {
            MigrationError::invalid_descriptor(&location, "missing \"-- Up migration\" section")
        })?;

        let body = SqlMigration::new(self.pool.clone(), location, script);
        let descriptor = MigrationDescriptor::new(version, name, body);
        Ok(Some(match namespace {
            Some(namespace) => descriptor.with_namespace(namespace),
            None => descriptor,
        }))
    }
}

#[async_trait]
impl MigrationSource for DirectoryMigrationSource {
    async fn discover(&self, namespace: Option<&str>) -> MigrationResult<Vec<MigrationDescriptor>> {
        let pattern = Regex::new(FILE_PATTERN)
            .map_err(|e| MigrationError::invalid_descriptor(FILE_PATTERN, e.to_string()))?;

        let mut descriptors = Vec::new();
        for path_config in &self.paths {
            let path_namespace = path_config.namespace.as_deref();
            if namespace.is_some() && namespace != path_namespace {
                continue;
            }

            for file in sql_files(&path_config.path)? {
                if let Some(descriptor) = self.load_file(&pattern, &file, path_namespace)? {
                    descriptors.push(descriptor);
                }
            }
        }

        tracing::debug!("discovered {} migration files", descriptors.len());
        Ok(descriptors)
    }
}
