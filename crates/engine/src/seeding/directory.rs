//! SQL file seeds
//!
//! Every `<name>.sql` file in a seed path is one seed. Leading
//! `-- depends: users, roles` lines declare dependencies.

use async_trait::async_trait;
use sqlx::PgPool;
use std::fs;
use std::path::Path;

use super::seeder::{SeedContext, SeedDescriptor, SeedSource, Seeder};
use crate::error::{BoxError, MigrationError, MigrationResult};
use crate::migrations::directory::{camel_case, execute_script, sql_files};
use tidemark_core::PathConfig;

/// Dependency names declared in `-- depends:` header lines
pub fn parse_dependencies(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .take_while(|line| line.is_empty() || line.starts_with("--"))
        .filter_map(|line| {
            let comment = line.strip_prefix("--")?.trim();
            let (key, value) = comment.split_once(':')?;
            key.trim().eq_ignore_ascii_case("depends").then_some(value)
        })
        .flat_map(|value| value.split(','))
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

/// Seed body backed by a SQL file
pub struct SqlSeed {
    pool: PgPool,
    sql: String,
}

impl SqlSeed {
    pub fn new(pool: PgPool, sql: impl Into<String>) -> Self {
        Self {
            pool,
            sql: sql.into(),
        }
    }
}

#[async_trait]
impl Seeder for SqlSeed {
    async fn run(&self, _ctx: &SeedContext<'_>) -> Result<(), BoxError> {
        execute_script(&self.pool, &self.sql).await
    }
}

/// Seeds loaded from SQL files in namespaced directories
pub struct DirectorySeedSource {
    pool: PgPool,
    paths: Vec<PathConfig>,
}

impl DirectorySeedSource {
    pub fn new(pool: PgPool, paths: Vec<PathConfig>) -> Self {
        Self { pool, paths }
    }

    fn load_file(&self, path: &Path, namespace: Option<&str>) -> MigrationResult<SeedDescriptor> {
        let stem = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .ok_or_else(|| {
                MigrationError::invalid_descriptor(path.display().to_string(), "file name is not valid UTF-8")
            })?;

        let content = fs::read_to_string(path)?;
        let dependencies: Vec<String> = parse_dependencies(&content)
            .iter()
            .map(|dependency| qualify(dependency))
            .collect();

        let seed = SeedDescriptor::new(camel_case(stem), SqlSeed::new(self.pool.clone(), content))
            .depends_on(dependencies);
        Ok(match namespace {
            Some(namespace) => seed.with_namespace(namespace),
            None => seed,
        })
    }
}

/// Normalise a declared dependency to seed naming, keeping any namespace prefix
fn qualify(dependency: &str) -> String {
    match dependency.rsplit_once("::") {
        Some((namespace, name)) => format!("{}::{}", namespace, camel_case(name)),
        None => camel_case(dependency),
    }
}

#[async_trait]
impl SeedSource for DirectorySeedSource {
    async fn discover(&self) -> MigrationResult<Vec<SeedDescriptor>> {
        let mut seeds = Vec::new();
        for path_config in &self.paths {
            for file in sql_files(&path_config.path)? {
                seeds.push(self.load_file(&file, path_config.namespace.as_deref())?);
            }
        }
        Ok(seeds)
    }
}
