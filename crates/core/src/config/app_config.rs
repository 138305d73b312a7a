use crate::config::{ConfigError, ConfigSource, ConfigValidator, TableNameValidator, UrlValidator};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::env;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Default name of the ledger table
pub const DEFAULT_MIGRATION_TABLE: &str = "tidemark_log";

/// Configuration trait for loading and checking configuration
pub trait AppConfigTrait: Sized {
    /// Load configuration from environment variables
    fn from_env() -> Result<Self, ConfigError>;

    /// Validate the configuration
    fn validate(&self) -> Result<(), ConfigError>;

    /// Get configuration source information for debugging
    fn config_sources(&self) -> HashMap<String, ConfigSource>;
}

/// Ordering policy used for status display, "most recent" lookups and
/// date-based rollback targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ExecutionOrder {
    /// Order by the migration version (its creation timestamp)
    #[default]
    #[serde(rename = "creation")]
    ByCreationVersion,
    /// Order by the recorded start time of the execution
    #[serde(rename = "execution")]
    ByExecutionTime,
}

impl FromStr for ExecutionOrder {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "creation" => Ok(ExecutionOrder::ByCreationVersion),
            "execution" => Ok(ExecutionOrder::ByExecutionTime),
            _ => Err(ConfigError::invalid_value(
                "version_order",
                s,
                "creation or execution",
            )),
        }
    }
}

impl fmt::Display for ExecutionOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let order = match self {
            ExecutionOrder::ByCreationVersion => "creation",
            ExecutionOrder::ByExecutionTime => "execution",
        };
        write!(f, "{}", order)
    }
}

/// A directory holding migrations or seeds, optionally tied to a namespace
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathConfig {
    pub path: PathBuf,
    #[serde(default)]
    pub namespace: Option<String>,
}

impl PathConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            namespace: None,
        }
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }
}

/// Per-environment connection settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentConfig {
    #[serde(default)]
    pub database_url: Option<String>,
    /// Overrides the global ledger table for this environment
    #[serde(default)]
    pub migration_table: Option<String>,
}

/// Project configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TidemarkConfig {
    pub default_environment: Option<String>,
    pub environments: BTreeMap<String, EnvironmentConfig>,
    pub migration_paths: Vec<PathConfig>,
    pub seed_paths: Vec<PathConfig>,
    pub version_order: ExecutionOrder,
    pub migration_table: String,
    pub log_level: String,
    #[serde(skip)]
    sources: HashMap<String, ConfigSource>,
}

impl TidemarkConfig {
    /// Create a configuration with a single `development` environment
    pub fn new() -> Self {
        let mut environments = BTreeMap::new();
        environments.insert("development".to_string(), EnvironmentConfig::default());

        let mut sources = HashMap::new();
        for (field, value) in [
            ("default_environment", "development"),
            ("migration_paths", "migrations"),
            ("seed_paths", "seeds"),
            ("version_order", "creation"),
            ("migration_table", DEFAULT_MIGRATION_TABLE),
            ("log_level", "info"),
        ] {
            sources.insert(field.to_string(), ConfigSource::Default(value.to_string()));
        }

        Self {
            default_environment: Some("development".to_string()),
            environments,
            migration_paths: vec![PathConfig::new("migrations")],
            seed_paths: vec![PathConfig::new("seeds")],
            version_order: ExecutionOrder::ByCreationVersion,
            migration_table: DEFAULT_MIGRATION_TABLE.to_string(),
            log_level: "info".to_string(),
            sources,
        }
    }

    /// Default manifest location
    pub fn manifest_path() -> PathBuf {
        PathBuf::from("tidemark.yaml")
    }

    /// Load the YAML manifest, then apply environment variable overrides
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = serde_yaml::from_str(&content)?;

        let origin = ConfigSource::File(path.display().to_string());
        for field in [
            "default_environment",
            "migration_paths",
            "seed_paths",
            "version_order",
            "migration_table",
            "log_level",
        ] {
            config.sources.insert(field.to_string(), origin.clone());
        }

        config.apply_env()?;
        Ok(config)
    }

    /// Override values from `TIDEMARK_*` and `DATABASE_URL` variables
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        if let Ok(name) = env::var("TIDEMARK_ENV") {
            self.default_environment = Some(name);
            self.record_env("default_environment", "TIDEMARK_ENV");
        }

        if let Ok(order) = env::var("TIDEMARK_VERSION_ORDER") {
            self.version_order = order.parse()?;
            self.record_env("version_order", "TIDEMARK_VERSION_ORDER");
        }

        if let Ok(table) = env::var("TIDEMARK_MIGRATION_TABLE") {
            self.migration_table = table;
            self.record_env("migration_table", "TIDEMARK_MIGRATION_TABLE");
        }

        if let Ok(level) = env::var("TIDEMARK_LOG") {
            self.log_level = level;
            self.record_env("log_level", "TIDEMARK_LOG");
        }

        // DATABASE_URL targets whichever environment is the default
        if let Ok(url) = env::var("DATABASE_URL") {
            let name = self
                .default_environment
                .clone()
                .unwrap_or_else(|| "development".to_string());
            self.environments.entry(name).or_default().database_url = Some(url);
            self.record_env("database_url", "DATABASE_URL");
        }

        Ok(())
    }

    fn record_env(&mut self, field: &str, var: &str) {
        self.sources
            .insert(field.to_string(), ConfigSource::EnvVar(var.to_string()));
    }

    /// Check whether an environment is configured
    pub fn has_environment(&self, name: &str) -> bool {
        self.environments.contains_key(name)
    }

    /// Get an environment's settings by name
    pub fn environment(&self, name: &str) -> Result<&EnvironmentConfig, ConfigError> {
        self.environments
            .get(name)
            .ok_or_else(|| ConfigError::unknown_environment(name))
    }

    /// Resolve the environment used when none is given explicitly
    pub fn default_environment(&self) -> Result<&str, ConfigError> {
        match &self.default_environment {
            Some(name) if self.has_environment(name) => Ok(name),
            Some(name) => Err(ConfigError::unknown_environment(name.clone())),
            None => Err(ConfigError::missing_required(
                "default_environment",
                "Could not find a default environment",
            )),
        }
    }

    /// Ledger table for an environment, falling back to the global one
    pub fn migration_table_for(&self, name: &str) -> Result<&str, ConfigError> {
        let environment = self.environment(name)?;
        Ok(environment
            .migration_table
            .as_deref()
            .unwrap_or(&self.migration_table))
    }
}

impl Default for TidemarkConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl AppConfigTrait for TidemarkConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::new();
        config.apply_env()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.environments.is_empty() {
            return Err(ConfigError::validation_failed(
                "at least one environment must be configured",
            ));
        }

        if let Some(name) = &self.default_environment {
            if !self.has_environment(name) {
                return Err(ConfigError::unknown_environment(name.clone()));
            }
        }

        let tables = TableNameValidator::default();
        tables.validate(self.migration_table.as_str())?;

        let urls = UrlValidator::default();
        for environment in self.environments.values() {
            if let Some(url) = &environment.database_url {
                urls.validate(url.as_str())?;
            }
            if let Some(table) = &environment.migration_table {
                tables.validate(table.as_str())?;
            }
        }

        Ok(())
    }

    fn config_sources(&self) -> HashMap<String, ConfigSource> {
        self.sources.clone()
    }
}
