//! Seeder definitions and discovery

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

use crate::error::{BoxError, MigrationResult};

/// Context handed to seed bodies
#[derive(Debug, Clone, Copy)]
pub struct SeedContext<'a> {
    /// Name of the environment being seeded
    pub environment: &'a str,
}

/// Executable body of a seed
#[async_trait]
pub trait Seeder: Send + Sync {
    /// Insert the seed data
    async fn run(&self, ctx: &SeedContext<'_>) -> Result<(), BoxError>;

    /// Whether the seed should run at all in this environment
    fn should_execute(&self) -> bool {
        true
    }
}

/// A discovered seed with its declared dependencies
#[derive(Clone)]
pub struct SeedDescriptor {
    pub name: String,
    pub namespace: Option<String>,
    /// Names of seeds that must run first
    pub dependencies: Vec<String>,
    body: Arc<dyn Seeder>,
}

impl SeedDescriptor {
    pub fn new(name: impl Into<String>, body: impl Seeder + 'static) -> Self {
        Self::from_arc(name, Arc::new(body))
    }

    pub fn from_arc(name: impl Into<String>, body: Arc<dyn Seeder>) -> Self {
        Self {
            name: name.into(),
            namespace: None,
            dependencies: Vec::new(),
            body,
        }
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn depends_on<I, S>(mut self, dependencies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependencies
            .extend(dependencies.into_iter().map(Into::into));
        self
    }

    /// Name prefixed with its namespace, if any
    pub fn qualified_name(&self) -> String {
        match &self.namespace {
            Some(namespace) => format!("{}::{}", namespace, self.name),
            None => self.name.clone(),
        }
    }

    pub async fn run(&self, environment: &str) -> Result<(), BoxError> {
        self.body.run(&SeedContext { environment }).await
    }

    pub fn should_execute(&self) -> bool {
        self.body.should_execute()
    }
}

impl fmt::Debug for SeedDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SeedDescriptor")
            .field("name", &self.name)
            .field("namespace", &self.namespace)
            .field("dependencies", &self.dependencies)
            .finish_non_exhaustive()
    }
}

/// Discovers seed descriptors
#[async_trait]
pub trait SeedSource: Send + Sync {
    /// Every seed, in discovery order
    async fn discover(&self) -> MigrationResult<Vec<SeedDescriptor>>;
}

/// Seeds registered in code
#[derive(Debug, Default, Clone)]
pub struct CodeSeedSource {
    seeds: Vec<SeedDescriptor>,
}

impl CodeSeedSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a seed to the source
    pub fn add(mut self, seed: SeedDescriptor) -> Self {
        self.seeds.push(seed);
        self
    }
}

#[async_trait]
impl SeedSource for CodeSeedSource {
    async fn discover(&self) -> MigrationResult<Vec<SeedDescriptor>> {
        Ok(self.seeds.clone())
    }
}
