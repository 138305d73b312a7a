//! Builds the engine environment from configuration

use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use tidemark_core::{AppConfigTrait, ConfigError, CoreError, TidemarkConfig};
use tidemark_engine::{
    DirectoryMigrationSource, DirectorySeedSource, Environment, MigrationError, PgVersionLog,
};

/// Load the manifest (explicit path, or `tidemark.yaml` when present) and
/// environment overrides
pub fn load_config(path: Option<&Path>) -> Result<TidemarkConfig, CoreError> {
    let config = match path {
        Some(path) => TidemarkConfig::load(path)?,
        None => {
            let default = TidemarkConfig::manifest_path();
            if default.exists() {
                TidemarkConfig::load(&default)?
            } else {
                TidemarkConfig::from_env()?
            }
        }
    };

    config.validate()?;
    Ok(config)
}

/// Send logs to stderr so stdout stays machine readable
pub fn init_tracing(default_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Connect to the environment's database and wire up its sources
pub async fn connect(config: &TidemarkConfig, name: Option<&str>) -> Result<Environment, CoreError> {
    let name = match name {
        Some(name) => name,
        None => config.default_environment()?,
    };

    let settings = config.environment(name)?;
    let database_url = settings.database_url.as_deref().ok_or_else(|| {
        ConfigError::missing_required(
            "database_url",
            format!("set DATABASE_URL or environments.{}.database_url", name),
        )
    })?;
    let table = config.migration_table_for(name)?;

    tracing::info!("using environment {}", name);
    let ledger = PgVersionLog::connect(database_url, table)
        .await
        .map_err(into_core)?;
    let pool = ledger.pool().clone();

    let migrations = DirectoryMigrationSource::new(pool.clone(), config.migration_paths.clone());
    let seeds = DirectorySeedSource::new(pool, config.seed_paths.clone());

    Ok(Environment::new(name, Arc::new(ledger), Arc::new(migrations))
        .with_seeds(Arc::new(seeds))
        .with_order(config.version_order))
}

/// Report engine failures through the front-end error type
pub fn into_core(err: MigrationError) -> CoreError {
    match err {
        MigrationError::Config(err) => CoreError::Config(err),
        MigrationError::Io(err) => CoreError::Io(err),
        MigrationError::Database(err) => CoreError::database(err.to_string()),
        other => CoreError::migration(other.to_string()),
    }
}
