//! Seed ordering and execution
//!
//! Seeds run after everything they depend on. Among seeds that are ready at
//! the same time, the one discovered first runs first.

use std::collections::{BTreeSet, HashSet};
use std::time::Instant;

use super::seeder::SeedDescriptor;
use crate::environment::Environment;
use crate::error::{MigrationError, MigrationResult};

/// Result of a seed run
#[derive(Debug, Default)]
pub struct SeedReport {
    /// Seeds whose bodies ran, in execution order
    pub executed: Vec<String>,
    /// Seeds that declined to run
    pub skipped: Vec<String>,
    /// Total execution time in milliseconds
    pub execution_time_ms: u128,
}

impl SeedReport {
    pub fn is_empty(&self) -> bool {
        self.executed.is_empty() && self.skipped.is_empty()
    }
}

/// Find which seed a dependency name refers to.
///
/// Tries the qualified name, then the same namespace, then any namespace.
/// A bare name defined in several other namespaces is ambiguous.
fn lookup(
    seeds: &[SeedDescriptor],
    from: &SeedDescriptor,
    dependency: &str,
) -> MigrationResult<usize> {
    if let Some(index) = seeds
        .iter()
        .position(|seed| seed.qualified_name() == dependency)
        .or_else(|| {
            seeds
                .iter()
                .position(|seed| seed.namespace == from.namespace && seed.name == dependency)
        })
    {
        return Ok(index);
    }

    let matches: Vec<usize> = seeds
        .iter()
        .enumerate()
        .filter(|(_, seed)| seed.name == dependency)
        .map(|(index, _)| index)
        .collect();

    match matches.as_slice() {
        [index] => Ok(*index),
        [] => Err(MigrationError::MissingSeedDependency {
            seed: from.qualified_name(),
            dependency: dependency.to_string(),
        }),
        _ => Err(MigrationError::AmbiguousSeedDependency {
            seed: from.qualified_name(),
            dependency: dependency.to_string(),
        }),
    }
}

/// Topologically sort seeds so every seed follows its dependencies.
///
/// Fails on duplicate names, unknown dependencies and dependency cycles.
pub fn order(seeds: Vec<SeedDescriptor>) -> MigrationResult<Vec<SeedDescriptor>> {
    let mut names = HashSet::new();
    for seed in &seeds {
        if !names.insert((seed.namespace.clone(), seed.name.clone())) {
            return Err(MigrationError::DuplicateName {
                name: seed.name.clone(),
                namespace: seed.namespace.clone().unwrap_or_else(|| "(root)".to_string()),
            });
        }
    }

    let count = seeds.len();
    let mut dependencies: Vec<BTreeSet<usize>> = vec![BTreeSet::new(); count];
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); count];

    for (index, seed) in seeds.iter().enumerate() {
        for dependency in &seed.dependencies {
            let target = lookup(&seeds, seed, dependency)?;
            if dependencies[index].insert(target) {
                dependents[target].push(index);
            }
        }
    }

    // Kahn's algorithm; the ready set is keyed by discovery index
    let mut in_degree: Vec<usize> = dependencies.iter().map(BTreeSet::len).collect();
    let mut ready: BTreeSet<usize> = (0..count).filter(|&i| in_degree[i] == 0).collect();
    let mut sorted = Vec::with_capacity(count);

    while let Some(current) = ready.pop_first() {
        sorted.push(current);
        for &dependent in &dependents[current] {
            in_degree[dependent] -= 1;
            if in_degree[dependent] == 0 {
                ready.insert(dependent);
            }
        }
    }

    if sorted.len() != count {
        return Err(MigrationError::SeedCycle {
            cycle: describe_cycle(&seeds, &dependencies, &in_degree),
        });
    }

    let mut slots: Vec<Option<SeedDescriptor>> = seeds.into_iter().map(Some).collect();
    Ok(sorted
        .into_iter()
        .filter_map(|index| slots[index].take())
        .collect())
}

/// Walk unresolved dependencies until a seed repeats, then name the loop
fn describe_cycle(
    seeds: &[SeedDescriptor],
    dependencies: &[BTreeSet<usize>],
    in_degree: &[usize],
) -> String {
    let Some(start) = (0..seeds.len()).find(|&i| in_degree[i] > 0) else {
        return String::new();
    };

    let mut path = vec![start];
    let mut current = start;
    loop {
        let next = dependencies[current]
            .iter()
            .copied()
            .find(|&dep| in_degree[dep] > 0);
        let Some(next) = next else {
            break;
        };
        if let Some(position) = path.iter().position(|&seen| seen == next) {
            let mut cycle: Vec<String> = path[position..]
                .iter()
                .map(|&i| seeds[i].qualified_name())
                .collect();
            cycle.push(seeds[next].qualified_name());
            return cycle.join(" -> ");
        }
        path.push(next);
        current = next;
    }

    path.iter()
        .map(|&i| seeds[i].qualified_name())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Discovers, orders and runs the seeds of an environment
pub struct SeedResolver;

impl SeedResolver {
    /// Every seed of the environment in execution order
    pub async fn ordered(env: &Environment) -> MigrationResult<Vec<SeedDescriptor>> {
        let seeds = env.seeds().discover().await?;
        tracing::debug!("discovered {} seeds", seeds.len());
        order(seeds)
    }

    /// Run one named seed, or every seed in dependency order
    pub async fn run(env: &Environment, name: Option<&str>) -> MigrationResult<SeedReport> {
        let start_time = Instant::now();
        let ordered = Self::ordered(env).await?;

        let selected = match name {
            Some(name) => vec![select(ordered, name)?],
            None => ordered,
        };

        let mut report = SeedReport::default();
        for seed in selected {
            let qualified = seed.qualified_name();

            if !seed.should_execute() {
                tracing::warn!(" == {}: skipped", qualified);
                report.skipped.push(qualified);
                continue;
            }

            tracing::info!(" == {}: seeding", qualified);
            let seed_start = Instant::now();
            seed.run(env.name())
                .await
                .map_err(|source| MigrationError::SeedExecution {
                    name: qualified.clone(),
                    source,
                })?;
            tracing::info!(
                " == {}: seeded {}ms",
                qualified,
                seed_start.elapsed().as_millis()
            );
            report.executed.push(qualified);
        }

        report.execution_time_ms = start_time.elapsed().as_millis();
        Ok(report)
    }
}

/// Pick a seed by qualified name, or by bare name when that is unambiguous
fn select(mut seeds: Vec<SeedDescriptor>, name: &str) -> MigrationResult<SeedDescriptor> {
    if let Some(index) = seeds.iter().position(|seed| seed.qualified_name() == name) {
        return Ok(seeds.swap_remove(index));
    }

    let mut matching: Vec<SeedDescriptor> = seeds.into_iter().filter(|seed| seed.name == name).collect();
    if matching.len() == 1 {
        return Ok(matching.remove(0));
    }

    Err(MigrationError::UnknownSeed(name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BoxError;
    use crate::seeding::{SeedContext, Seeder};
    use async_trait::async_trait;

    struct Noop;

    #[async_trait]
    impl Seeder for Noop {
        async fn run(&self, _ctx: &SeedContext<'_>) -> Result<(), BoxError> {
            Ok(())
        }
    }

    fn seed(name: &str, deps: &[&str]) -> SeedDescriptor {
        SeedDescriptor::new(name, Noop).depends_on(deps.iter().copied())
    }

    fn names(seeds: &[SeedDescriptor]) -> Vec<String> {
        seeds.iter().map(SeedDescriptor::qualified_name).collect()
    }

    #[test]
    fn test_order_follows_dependencies_in_any_discovery_order() {
        let discoveries = vec![
            vec![seed("A", &[]), seed("B", &["A"]), seed("C", &["B"])],
            vec![seed("C", &["B"]), seed("B", &["A"]), seed("A", &[])],
            vec![seed("B", &["A"]), seed("C", &["B"]), seed("A", &[])],
        ];

        for seeds in discoveries {
            assert_eq!(names(&order(seeds).unwrap()), vec!["A", "B", "C"]);
        }
    }

    #[test]
    fn test_order_breaks_ties_by_discovery() {
        let seeds = vec![seed("Users", &[]), seed("Posts", &["Users"]), seed("Tags", &[])];
        assert_eq!(names(&order(seeds).unwrap()), vec!["Users", "Posts", "Tags"]);
    }

    #[test]
    fn test_order_detects_cycle() {
        let seeds = vec![seed("A", &["C"]), seed("B", &["A"]), seed("C", &["B"])];
        let err = order(seeds).unwrap_err();

        match err {
            MigrationError::SeedCycle { cycle } => {
                assert!(cycle.contains("A"));
                assert!(cycle.contains("->"));
            }
            other => panic!("expected cycle, got {:?}", other),
        }
    }

    #[test]
    fn test_order_rejects_self_dependency_and_unknown() {
        assert!(matches!(
            order(vec![seed("A", &["A"])]).unwrap_err(),
            MigrationError::SeedCycle { .. }
        ));
        assert!(matches!(
            order(vec![seed("A", &["Ghost"])]).unwrap_err(),
            MigrationError::MissingSeedDependency { ref dependency, .. } if dependency == "Ghost"
        ));
    }

    #[test]
    fn test_order_rejects_ambiguous_bare_dependency() {
        let seeds = vec![
            seed("Users", &[]).with_namespace("billing"),
            seed("Users", &[]).with_namespace("crm"),
            seed("Report", &["Users"]),
        ];
        assert!(matches!(
            order(seeds).unwrap_err(),
            MigrationError::AmbiguousSeedDependency { ref seed, ref dependency }
                if seed == "Report" && dependency == "Users"
        ));

        let seeds = vec![
            seed("Users", &[]).with_namespace("billing"),
            seed("Users", &[]).with_namespace("crm"),
            seed("Invoices", &["Users"]).with_namespace("billing"),
            seed("Report", &["crm::Users"]),
        ];
        assert_eq!(
            names(&order(seeds).unwrap()),
            vec!["billing::Users", "crm::Users", "billing::Invoices", "Report"]
        );
    }

    #[test]
    fn test_select_by_qualified_or_unique_name() {
        let seeds = vec![seed("Users", &[]), seed("Users", &[]).with_namespace("billing")];

        assert_eq!(select(seeds.clone(), "billing::Users").unwrap().qualified_name(), "billing::Users");
        assert_eq!(select(seeds.clone(), "Users").unwrap().qualified_name(), "Users");
        assert!(matches!(
            select(seeds, "Missing").unwrap_err(),
            MigrationError::UnknownSeed(_)
        ));
    }
}
