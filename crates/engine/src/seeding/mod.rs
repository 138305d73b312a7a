//! Seeding - dependency-ordered data seeds
//!
//! Seeds carry no persisted state. They are discovered, sorted so every seed
//! runs after the seeds it depends on, and executed one at a time.

pub mod directory;
pub mod resolver;
pub mod seeder;

pub use directory::{DirectorySeedSource, SqlSeed};
pub use resolver::{order, SeedReport, SeedResolver};
pub use seeder::{CodeSeedSource, SeedContext, SeedDescriptor, SeedSource, Seeder};
