//! Migration discovery

use async_trait::async_trait;

use super::definitions::{Migration, MigrationDescriptor, Version};
use crate::error::MigrationResult;

/// Discovers migration descriptors from one or more namespaced locations
#[async_trait]
pub trait MigrationSource: Send + Sync {
    /// Every descriptor, or only those in `namespace` when given.
    ///
    /// Called on every resolution; implementations should rescan.
    async fn discover(&self, namespace: Option<&str>) -> MigrationResult<Vec<MigrationDescriptor>>;
}

/// Keep descriptors matching an optional namespace filter
pub(crate) fn in_namespace(descriptor: &MigrationDescriptor, namespace: Option<&str>) -> bool {
    match namespace {
        Some(namespace) => descriptor.namespace.as_deref() == Some(namespace),
        None => true,
    }
}

/// Migrations registered in code
#[derive(Debug, Default, Clone)]
pub struct CodeMigrationSource {
    descriptors: Vec<MigrationDescriptor>,
}

impl CodeMigrationSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a migration body under a version and name
    pub fn register(
        &mut self,
        version: Version,
        name: impl Into<String>,
        body: impl Migration + 'static,
    ) -> &mut Self {
        self.descriptors
            .push(MigrationDescriptor::new(version, name, body));
        self
    }

    /// Register a prepared descriptor
    pub fn with_descriptor(mut self, descriptor: MigrationDescriptor) -> Self {
        self.descriptors.push(descriptor);
        self
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

#[async_trait]
impl MigrationSource for CodeMigrationSource {
    async fn discover(&self, namespace: Option<&str>) -> MigrationResult<Vec<MigrationDescriptor>> {
        Ok(self
            .descriptors
            .iter()
            .filter(|descriptor| in_namespace(descriptor, namespace))
            .cloned()
            .collect())
    }
}
