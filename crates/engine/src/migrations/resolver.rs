//! Version resolution
//!
//! Pure functions that turn discovered descriptors, the current ledger and a
//! request into a status view, an execution plan or a terminal outcome.
//! Nothing in here touches a backend.

use std::collections::{HashMap, HashSet};

use super::definitions::{
    compare_entries, ExecutionPlan, MigrationDescriptor, PlanStep, RollbackOutcome, Version,
    VersionLogEntry,
};
use super::status::{MigrationStatus, StatusReport, StatusRow};
use super::target::{version_from_datetime, RollbackTarget};
use crate::error::{Direction, MigrationError, MigrationResult};
use tidemark_core::ExecutionOrder;

/// Namespace label used in errors for descriptors without one
const ROOT_NAMESPACE: &str = "(root)";

/// Check descriptor uniqueness and sort them ascending by version
pub fn validate_descriptors(
    mut descriptors: Vec<MigrationDescriptor>,
) -> MigrationResult<Vec<MigrationDescriptor>> {
    descriptors.sort_by_key(|descriptor| descriptor.version);

    let mut names: HashSet<(Option<&str>, &str)> = HashSet::new();
    for (index, descriptor) in descriptors.iter().enumerate() {
        if index > 0 && descriptors[index - 1].version == descriptor.version {
            return Err(MigrationError::DuplicateVersion {
                version: descriptor.version,
                first: descriptors[index - 1].qualified_name(),
                second: descriptor.qualified_name(),
            });
        }

        if !names.insert((descriptor.namespace.as_deref(), descriptor.name.as_str())) {
            return Err(MigrationError::DuplicateName {
                name: descriptor.name.clone(),
                namespace: descriptor
                    .namespace
                    .clone()
                    .unwrap_or_else(|| ROOT_NAMESPACE.to_string()),
            });
        }
    }

    Ok(descriptors)
}

/// Classify every version in descriptors ∪ ledger as up, up-missing or down.
///
/// The flags never depend on `order`; only the row order does.
pub fn status(
    descriptors: &[MigrationDescriptor],
    ledger: &[VersionLogEntry],
    order: ExecutionOrder,
) -> StatusReport {
    let by_version: HashMap<Version, &MigrationDescriptor> =
        descriptors.iter().map(|d| (d.version, d)).collect();
    let applied: HashSet<Version> = ledger.iter().map(|entry| entry.version).collect();

    let mut applied_entries: Vec<&VersionLogEntry> = ledger.iter().collect();
    applied_entries.sort_by(|a, b| compare_entries(order, a, b));

    let applied_rows = applied_entries.into_iter().map(|entry| match by_version.get(&entry.version) {
        Some(descriptor) => StatusRow::applied(MigrationStatus::Up, descriptor.name.clone(), entry),
        None => StatusRow::applied(MigrationStatus::UpMissing, entry.migration_name.clone(), entry),
    });

    let mut pending: Vec<&MigrationDescriptor> = descriptors
        .iter()
        .filter(|descriptor| !applied.contains(&descriptor.version))
        .collect();
    pending.sort_by_key(|descriptor| descriptor.version);
    let pending_rows = pending.into_iter().map(StatusRow::pending);

    let mut rows: Vec<StatusRow> = applied_rows.chain(pending_rows).collect();
    if order == ExecutionOrder::ByCreationVersion {
        rows.sort_by_key(|row| row.version);
    }

    StatusReport {
        has_missing_migration: rows.iter().any(|row| row.status == MigrationStatus::UpMissing),
        has_down_migration: rows.iter().any(|row| row.status == MigrationStatus::Down),
        rows,
    }
}

/// Plan every pending descriptor up to and including `target`, ascending.
///
/// Versions recorded as skipped are planned again once their body is willing
/// to run.
pub fn migrate_plan(
    descriptors: &[MigrationDescriptor],
    ledger: &[VersionLogEntry],
    target: Option<Version>,
) -> ExecutionPlan {
    let recorded: HashMap<Version, &VersionLogEntry> =
        ledger.iter().map(|entry| (entry.version, entry)).collect();

    let mut steps: Vec<PlanStep> = descriptors
        .iter()
        .filter(|descriptor| target.map_or(true, |target| descriptor.version <= target))
        .filter(|descriptor| match recorded.get(&descriptor.version) {
            None => true,
            Some(entry) => entry.skipped && descriptor.should_execute(),
        })
        .map(|descriptor| PlanStep {
            descriptor: descriptor.clone(),
            direction: Direction::Up,
        })
        .collect();

    steps.sort_by_key(|step| step.descriptor.version);
    ExecutionPlan { steps }
}

/// Outcome of rollback resolution
#[derive(Debug)]
pub enum RollbackResolution {
    /// Revert these steps, newest first. `breakpoint_hit` means a breakpoint
    /// stopped the walk after the last step.
    Plan {
        plan: ExecutionPlan,
        breakpoint_hit: bool,
    },
    /// Nothing to execute
    Outcome(RollbackOutcome),
}

/// Resolve a rollback request into revert steps.
///
/// Applied entries are walked newest to oldest by `order`; the first one
/// carrying a breakpoint stops the walk unless `force` is set, including
/// entries whose definition is missing.
pub fn rollback_plan(
    descriptors: &[MigrationDescriptor],
    ledger: &[VersionLogEntry],
    target: &RollbackTarget,
    order: ExecutionOrder,
    force: bool,
) -> RollbackResolution {
    let by_version: HashMap<Version, &MigrationDescriptor> =
        descriptors.iter().map(|d| (d.version, d)).collect();

    let mut newest_first: Vec<&VersionLogEntry> = ledger.iter().collect();
    newest_first.sort_by(|a, b| compare_entries(order, b, a));

    let in_scope: Vec<&VersionLogEntry> = match target {
        RollbackTarget::Latest | RollbackTarget::All => newest_first.clone(),
        RollbackTarget::Date(date) => newest_first
            .iter()
            .copied()
            .filter(|entry| match order {
                ExecutionOrder::ByCreationVersion => entry.version > version_from_datetime(date),
                ExecutionOrder::ByExecutionTime => entry.start_time > *date,
            })
            .collect(),
        RollbackTarget::Version(_) | RollbackTarget::Name(_) => {
            let Some(anchor) = find_target_entry(descriptors, &newest_first, target) else {
                return RollbackResolution::Outcome(RollbackOutcome::TargetVersionNotFound(
                    target.to_string(),
                ));
            };
            newest_first
                .iter()
                .copied()
                .filter(|entry| compare_entries(order, entry, anchor).is_gt())
                .collect()
        }
    };

    if !in_scope
        .iter()
        .any(|entry| by_version.contains_key(&entry.version))
    {
        return RollbackResolution::Outcome(RollbackOutcome::NoMigrationsToRollback);
    }

    let limit = match target {
        RollbackTarget::Latest => 1,
        _ => usize::MAX,
    };

    // Entries without a definition are never reverted, but their
    // breakpoints still stop the walk.
    let mut steps = Vec::new();
    let mut breakpoint_hit = false;
    for entry in in_scope {
        if steps.len() == limit {
            break;
        }
        if entry.breakpoint && !force {
            breakpoint_hit = true;
            break;
        }
        if let Some(descriptor) = by_version.get(&entry.version) {
            steps.push(PlanStep {
                descriptor: (*descriptor).clone(),
                direction: Direction::Down,
            });
        }
    }

    RollbackResolution::Plan {
        plan: ExecutionPlan { steps },
        breakpoint_hit,
    }
}

/// Find the ledger entry a version or name target points at
fn find_target_entry<'a>(
    descriptors: &[MigrationDescriptor],
    entries: &[&'a VersionLogEntry],
    target: &RollbackTarget,
) -> Option<&'a VersionLogEntry> {
    match target {
        RollbackTarget::Version(version) => {
            entries.iter().copied().find(|entry| entry.version == *version)
        }
        RollbackTarget::Name(name) => {
            let defined = descriptors
                .iter()
                .filter(|d| d.name == *name || d.qualified_name() == *name)
                .map(|d| d.version)
                .collect::<HashSet<_>>();
            entries
                .iter()
                .copied()
                .find(|entry| defined.contains(&entry.version))
                .or_else(|| entries.iter().copied().find(|entry| entry.migration_name == *name))
        }
        _ => None,
    }
}

/// Newest defined version at or before `limit`
pub fn newest_version_at_or_before(
    descriptors: &[MigrationDescriptor],
    limit: Version,
) -> Option<Version> {
    descriptors
        .iter()
        .map(|descriptor| descriptor.version)
        .filter(|version| *version <= limit)
        .max()
}
