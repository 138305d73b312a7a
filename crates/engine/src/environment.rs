//! Environment context handed to every engine call

use std::fmt;
use std::sync::Arc;

use crate::error::MigrationResult;
use crate::ledger::VersionLog;
use crate::migrations::{resolver, MigrationDescriptor, MigrationSource};
use crate::seeding::{CodeSeedSource, SeedSource};
use tidemark_core::ExecutionOrder;

/// One target database: its ledger, its definitions and its ordering policy
#[derive(Clone)]
pub struct Environment {
    name: String,
    ledger: Arc<dyn VersionLog>,
    migrations: Arc<dyn MigrationSource>,
    seeds: Arc<dyn SeedSource>,
    order: ExecutionOrder,
    namespace: Option<String>,
}

impl Environment {
    /// Create an environment with no seeds, ordered by creation version
    pub fn new(
        name: impl Into<String>,
        ledger: Arc<dyn VersionLog>,
        migrations: Arc<dyn MigrationSource>,
    ) -> Self {
        Self {
            name: name.into(),
            ledger,
            migrations,
            seeds: Arc::new(CodeSeedSource::new()),
            order: ExecutionOrder::default(),
            namespace: None,
        }
    }

    pub fn with_seeds(mut self, seeds: Arc<dyn SeedSource>) -> Self {
        self.seeds = seeds;
        self
    }

    pub fn with_order(mut self, order: ExecutionOrder) -> Self {
        self.order = order;
        self
    }

    /// Restrict migration discovery to one namespace
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ledger(&self) -> &dyn VersionLog {
        self.ledger.as_ref()
    }

    pub fn seeds(&self) -> &dyn SeedSource {
        self.seeds.as_ref()
    }

    pub fn order(&self) -> ExecutionOrder {
        self.order
    }

    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    /// Discover and validate migration descriptors, ascending by version
    pub async fn descriptors(&self) -> MigrationResult<Vec<MigrationDescriptor>> {
        let discovered = self.migrations.discover(self.namespace()).await?;
        tracing::debug!(
            "discovered {} migrations for environment {}",
            discovered.len(),
            self.name
        );
        resolver::validate_descriptors(discovered)
    }
}

impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Environment")
            .field("name", &self.name)
            .field("order", &self.order)
            .field("namespace", &self.namespace)
            .finish_non_exhaustive()
    }
}
