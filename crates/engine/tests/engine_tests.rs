//! Integration tests for the migration engine
//!
//! Runs migrate, rollback and breakpoint operations end to end against the
//! in-memory version log with code-registered migrations that record every
//! body invocation.

use async_trait::async_trait;
use chrono::{Duration, TimeZone, Utc};
use std::sync::{Arc, Mutex};

use tidemark_core::ExecutionOrder;
use tidemark_engine::{
    BoxError, BreakpointOutcome, CodeMigrationSource, EngineOptions, Environment,
    ExecutionContext, MemoryVersionLog, Migration, MigrationDescriptor, MigrationEngine,
    MigrationError, MigrationStatus, RollbackOutcome, RollbackTarget, StatusReporter, Version,
    VersionLog, VersionLogEntry,
};

const V1: Version = 20240101000000;
const V2: Version = 20240201000000;
const V3: Version = 20240301000000;

type Journal = Arc<Mutex<Vec<String>>>;

/// Migration body that records each call
struct Recorded {
    name: &'static str,
    journal: Journal,
    fail_up: bool,
    fail_down: bool,
    runnable: bool,
}

#[async_trait]
impl Migration for Recorded {
    async fn up(&self, ctx: &ExecutionContext<'_>) -> Result<(), BoxError> {
        if self.fail_up {
            return Err(format!("{} exploded", self.name).into());
        }
        self.journal
            .lock()
            .unwrap()
            .push(format!("up:{}:{}", self.name, ctx.environment));
        Ok(())
    }

    async fn down(&self, _ctx: &ExecutionContext<'_>) -> Result<(), BoxError> {
        if self.fail_down {
            return Err(format!("{} refused to revert", self.name).into());
        }
        self.journal.lock().unwrap().push(format!("down:{}", self.name));
        Ok(())
    }

    fn should_execute(&self) -> bool {
        self.runnable
    }
}

struct Fixture {
    ledger: Arc<MemoryVersionLog>,
    journal: Journal,
    env: Environment,
}

impl Fixture {
    fn journal(&self) -> Vec<String> {
        self.journal.lock().unwrap().clone()
    }

    async fn applied(&self) -> Vec<Version> {
        self.ledger.versions().await
    }
}

#[derive(Clone, Copy)]
struct Def {
    version: Version,
    name: &'static str,
    fail_up: bool,
    fail_down: bool,
    runnable: bool,
}

fn def(version: Version, name: &'static str) -> Def {
    Def {
        version,
        name,
        fail_up: false,
        fail_down: false,
        runnable: true,
    }
}

fn fixture_with(defs: &[Def], entries: Vec<VersionLogEntry>) -> Fixture {
    let journal: Journal = Arc::new(Mutex::new(Vec::new()));
    let mut source = CodeMigrationSource::new();
    for d in defs {
        source.register(
            d.version,
            d.name,
            Recorded {
                name: d.name,
                journal: journal.clone(),
                fail_up: d.fail_up,
                fail_down: d.fail_down,
                runnable: d.runnable,
            },
        );
    }

    let ledger = Arc::new(MemoryVersionLog::with_entries(entries));
    let env = Environment::new("testing", ledger.clone(), Arc::new(source));
    Fixture {
        ledger,
        journal,
        env,
    }
}

fn standard() -> Vec<Def> {
    vec![def(V1, "First"), def(V2, "Second"), def(V3, "Third")]
}

fn entry(version: Version) -> VersionLogEntry {
    let now = Utc::now();
    VersionLogEntry::new(version, format!("M{}", version), now, now)
}

#[tokio::test]
async fn test_migrate_applies_pending_in_version_order() {
    let fx = fixture_with(&standard(), vec![]);
    let report = MigrationEngine::new().migrate(&fx.env, None).await.unwrap();

    assert_eq!(report.applied, vec![V1, V2, V3]);
    assert_eq!(fx.applied().await, vec![V1, V2, V3]);
    assert_eq!(
        fx.journal(),
        vec!["up:First:testing", "up:Second:testing", "up:Third:testing"]
    );
}

#[tokio::test]
async fn test_migrate_twice_is_a_no_op() {
    let fx = fixture_with(&standard(), vec![]);
    let engine = MigrationEngine::new();

    engine.migrate(&fx.env, None).await.unwrap();
    let second = engine.migrate(&fx.env, None).await.unwrap();

    assert!(second.is_empty());
    assert_eq!(fx.journal().len(), 3);
}

#[tokio::test]
async fn test_migrate_to_target() {
    let fx = fixture_with(&standard(), vec![]);
    let report = MigrationEngine::new().migrate(&fx.env, Some(V2)).await.unwrap();

    assert_eq!(report.applied, vec![V1, V2]);
    assert_eq!(fx.applied().await, vec![V1, V2]);
}

#[tokio::test]
async fn test_failing_migration_keeps_earlier_steps() {
    let mut defs = standard();
    defs[1].fail_up = true;
    let fx = fixture_with(&defs, vec![]);

    let err = MigrationEngine::new().migrate(&fx.env, None).await.unwrap_err();

    assert!(matches!(err, MigrationError::Execution { version, .. } if version == V2));
    assert_eq!(fx.applied().await, vec![V1]);
    assert_eq!(fx.journal(), vec!["up:First:testing"]);
}

#[tokio::test]
async fn test_skipped_migration_is_recorded_and_not_rerun() {
    let mut defs = standard();
    defs[1].runnable = false;
    let fx = fixture_with(&defs, vec![]);
    let engine = MigrationEngine::new();

    let report = engine.migrate(&fx.env, None).await.unwrap();
    assert_eq!(report.applied, vec![V1, V3]);
    assert_eq!(report.skipped, vec![V2]);
    assert!(fx.ledger.get(V2).await.unwrap().skipped);
    assert!(!fx.journal().iter().any(|call| call.contains("Second")));

    assert!(engine.migrate(&fx.env, None).await.unwrap().is_empty());

    // Reverting a skipped version only drops its entry
    let outcome = engine
        .rollback(&fx.env, &RollbackTarget::Version(V1))
        .await
        .unwrap();
    assert_eq!(outcome, RollbackOutcome::Reverted(vec![V3, V2]));
    assert_eq!(fx.journal().last().unwrap(), "down:Third");
    assert!(!fx.journal().contains(&"down:Second".to_string()));
}

#[tokio::test]
async fn test_previously_skipped_version_is_applied_in_place() {
    let fx = fixture_with(&standard(), vec![entry(V1).with_skipped(true).with_breakpoint(true)]);

    let report = MigrationEngine::new().migrate(&fx.env, None).await.unwrap();

    assert_eq!(report.applied, vec![V1, V2, V3]);
    let first = fx.ledger.get(V1).await.unwrap();
    assert!(!first.skipped);
    assert!(first.breakpoint);
}

#[tokio::test]
async fn test_fake_mode_records_without_running() {
    let fx = fixture_with(&standard(), vec![]);
    let engine = MigrationEngine::with_options(EngineOptions {
        fake: true,
        force: false,
    });

    engine.migrate(&fx.env, None).await.unwrap();
    assert_eq!(fx.applied().await, vec![V1, V2, V3]);

    engine.rollback(&fx.env, &RollbackTarget::All).await.unwrap();
    assert!(fx.applied().await.is_empty());
    assert!(fx.journal().is_empty());
}

#[tokio::test]
async fn test_scenario_rollback_to_version() {
    let fx = fixture_with(&standard()[..2], vec![entry(V1), entry(V2)]);

    let outcome = MigrationEngine::new()
        .rollback(&fx.env, &RollbackTarget::Version(V1))
        .await
        .unwrap();

    assert_eq!(outcome, RollbackOutcome::Reverted(vec![V2]));
    assert_eq!(fx.applied().await, vec![V1]);
}

#[tokio::test]
async fn test_scenario_breakpoint_on_older_version_does_not_block_latest() {
    let fx = fixture_with(
        &standard()[..2],
        vec![entry(V1).with_breakpoint(true), entry(V2)],
    );

    let outcome = MigrationEngine::new()
        .rollback(&fx.env, &RollbackTarget::Latest)
        .await
        .unwrap();

    assert_eq!(outcome, RollbackOutcome::Reverted(vec![V2]));
}

#[tokio::test]
async fn test_scenario_breakpoint_on_candidate_blocks() {
    let fx = fixture_with(
        &standard()[..2],
        vec![entry(V1), entry(V2).with_breakpoint(true)],
    );

    let outcome = MigrationEngine::new()
        .rollback(&fx.env, &RollbackTarget::Version(V1))
        .await
        .unwrap();

    assert_eq!(outcome, RollbackOutcome::BreakpointReached(vec![]));
    assert_eq!(fx.applied().await, vec![V1, V2]);
    assert!(fx.journal().is_empty());
}

#[tokio::test]
async fn test_scenario_unknown_target_changes_nothing() {
    let fx = fixture_with(&standard()[..2], vec![entry(V1), entry(V2)]);

    let outcome = MigrationEngine::new()
        .rollback(&fx.env, &RollbackTarget::parse(Some("99999999999999")))
        .await
        .unwrap();

    assert_eq!(
        outcome,
        RollbackOutcome::TargetVersionNotFound("99999999999999".to_string())
    );
    assert_eq!(fx.applied().await, vec![V1, V2]);
}

#[tokio::test]
async fn test_breakpoint_on_newest_blocks_every_target() {
    let targets = vec![
        RollbackTarget::Latest,
        RollbackTarget::All,
        RollbackTarget::Version(V1),
        RollbackTarget::Date(Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap()),
    ];

    for target in targets {
        let fx = fixture_with(
            &standard(),
            vec![entry(V1), entry(V2), entry(V3).with_breakpoint(true)],
        );
        let outcome = MigrationEngine::new().rollback(&fx.env, &target).await.unwrap();

        assert_eq!(outcome, RollbackOutcome::BreakpointReached(vec![]), "target {}", target);
        assert_eq!(fx.applied().await, vec![V1, V2, V3]);
    }
}

#[tokio::test]
async fn test_rollback_never_reverts_target_or_older() {
    for target in [V1, V2, V3] {
        let fx = fixture_with(&standard(), vec![entry(V1), entry(V2), entry(V3)]);
        let outcome = MigrationEngine::new()
            .rollback(&fx.env, &RollbackTarget::Version(target))
            .await
            .unwrap();

        assert!(outcome.reverted().iter().all(|v| *v > target));
        assert!(fx.applied().await.iter().all(|v| *v <= target));
    }
}

#[tokio::test]
async fn test_force_ignores_breakpoints() {
    let fx = fixture_with(
        &standard(),
        vec![entry(V1), entry(V2).with_breakpoint(true), entry(V3)],
    );
    let engine = MigrationEngine::with_options(EngineOptions {
        fake: false,
        force: true,
    });

    let outcome = engine.rollback(&fx.env, &RollbackTarget::All).await.unwrap();

    assert_eq!(outcome, RollbackOutcome::Reverted(vec![V3, V2, V1]));
    assert_eq!(fx.journal(), vec!["down:Third", "down:Second", "down:First"]);
}

#[tokio::test]
async fn test_rollback_empty_ledger() {
    let fx = fixture_with(&standard(), vec![]);
    let outcome = MigrationEngine::new()
        .rollback(&fx.env, &RollbackTarget::Latest)
        .await
        .unwrap();

    assert_eq!(outcome, RollbackOutcome::NoMigrationsToRollback);
}

#[tokio::test]
async fn test_rollback_latest_by_execution_time() {
    let base = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
    let entries = vec![
        VersionLogEntry::new(V1, "First", base + Duration::hours(2), base + Duration::hours(2)),
        VersionLogEntry::new(V2, "Second", base, base),
    ];
    let mut fx = fixture_with(&standard()[..2], entries);
    fx.env = fx.env.clone().with_order(ExecutionOrder::ByExecutionTime);

    let outcome = MigrationEngine::new()
        .rollback(&fx.env, &RollbackTarget::Latest)
        .await
        .unwrap();

    assert_eq!(outcome, RollbackOutcome::Reverted(vec![V1]));
    assert_eq!(fx.applied().await, vec![V2]);
}

#[tokio::test]
async fn test_failing_revert_keeps_earlier_reverts() {
    let defs = vec![
        def(V1, "First"),
        Def {
            fail_down: true,
            ..def(V2, "Second")
        },
        def(V3, "Third"),
    ];
    let fx = fixture_with(&defs, vec![entry(V1), entry(V2), entry(V3)]);

    let err = MigrationEngine::new()
        .rollback(&fx.env, &RollbackTarget::All)
        .await
        .unwrap_err();

    assert!(matches!(err, MigrationError::Execution { version: V2, .. }));
    assert_eq!(fx.applied().await, vec![V1, V2]);
    assert_eq!(fx.journal(), vec!["down:Third"]);
}

#[tokio::test]
async fn test_rollback_to_date_by_execution_time() {
    let base = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
    let entries = vec![
        VersionLogEntry::new(V1, "First", base + Duration::hours(2), base + Duration::hours(2)),
        VersionLogEntry::new(V2, "Second", base + Duration::hours(3), base + Duration::hours(3)),
        VersionLogEntry::new(V3, "Third", base, base),
    ];
    let mut fx = fixture_with(&standard(), entries);
    fx.env = fx.env.clone().with_order(ExecutionOrder::ByExecutionTime);

    let outcome = MigrationEngine::new()
        .rollback(&fx.env, &RollbackTarget::Date(base + Duration::hours(1)))
        .await
        .unwrap();

    assert_eq!(outcome, RollbackOutcome::Reverted(vec![V2, V1]));
    assert_eq!(fx.applied().await, vec![V3]);
}

#[tokio::test]
async fn test_breakpoint_on_newest_missing_definition_blocks_rollback() {
    let fx = fixture_with(
        &standard()[..2],
        vec![entry(V1), entry(V2), entry(V3).with_breakpoint(true)],
    );

    let outcome = MigrationEngine::new()
        .rollback(&fx.env, &RollbackTarget::Latest)
        .await
        .unwrap();

    assert_eq!(outcome, RollbackOutcome::BreakpointReached(vec![]));
    assert_eq!(fx.applied().await, vec![V1, V2, V3]);
    assert!(fx.journal().is_empty());
}

#[tokio::test]
async fn test_migrate_to_datetime() {
    let fx = fixture_with(&standard(), vec![]);
    let engine = MigrationEngine::new();

    let early = Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap();
    assert!(engine.migrate_to_datetime(&fx.env, early).await.unwrap().is_empty());

    let mid_february = Utc.with_ymd_and_hms(2024, 2, 15, 0, 0, 0).unwrap();
    let report = engine.migrate_to_datetime(&fx.env, mid_february).await.unwrap();
    assert_eq!(report.applied, vec![V1, V2]);
}

#[tokio::test]
async fn test_duplicate_versions_abort_before_running() {
    let defs = vec![def(V1, "First"), def(V1, "Again")];
    let fx = fixture_with(&defs, vec![]);

    let err = MigrationEngine::new().migrate(&fx.env, None).await.unwrap_err();

    assert!(err.is_configuration());
    assert!(fx.applied().await.is_empty());
    assert!(fx.journal().is_empty());
}

#[tokio::test]
async fn test_toggle_breakpoint_on_latest() {
    let fx = fixture_with(&standard(), vec![entry(V1), entry(V2)]);
    let engine = MigrationEngine::new();

    assert_eq!(
        engine.toggle_breakpoint(&fx.env, None).await.unwrap(),
        BreakpointOutcome::Applied {
            version: V2,
            breakpoint: true
        }
    );
    assert_eq!(
        engine.toggle_breakpoint(&fx.env, None).await.unwrap(),
        BreakpointOutcome::Applied {
            version: V2,
            breakpoint: false
        }
    );
}

#[tokio::test]
async fn test_set_unset_and_remove_breakpoints() {
    let fx = fixture_with(&standard(), vec![entry(V1), entry(V2), entry(V3)]);
    let engine = MigrationEngine::new();

    engine.set_breakpoint(&fx.env, Some(V1)).await.unwrap();
    engine.set_breakpoint(&fx.env, Some(V1)).await.unwrap();
    engine.set_breakpoint(&fx.env, Some(V2)).await.unwrap();
    assert!(fx.ledger.get(V1).await.unwrap().breakpoint);

    engine.unset_breakpoint(&fx.env, Some(V2)).await.unwrap();
    assert!(!fx.ledger.get(V2).await.unwrap().breakpoint);

    engine.set_breakpoint(&fx.env, Some(V3)).await.unwrap();
    assert_eq!(engine.remove_breakpoints(&fx.env).await.unwrap(), 2);
    assert_eq!(engine.remove_breakpoints(&fx.env).await.unwrap(), 0);
}

#[tokio::test]
async fn test_breakpoint_on_unknown_version() {
    let fx = fixture_with(&standard(), vec![entry(V1)]);
    let engine = MigrationEngine::new();

    assert_eq!(
        engine.set_breakpoint(&fx.env, Some(V2)).await.unwrap(),
        BreakpointOutcome::InvalidVersion(Some(V2))
    );
    assert!(!fx.ledger.get(V1).await.unwrap().breakpoint);

    let empty = fixture_with(&standard(), vec![]);
    assert_eq!(
        engine.toggle_breakpoint(&empty.env, None).await.unwrap(),
        BreakpointOutcome::InvalidVersion(None)
    );
}

#[tokio::test]
async fn test_status_report() {
    let fx = fixture_with(&standard()[..2], vec![entry(V1), entry(V3)]);
    let report = StatusReporter::report(&fx.env).await.unwrap();

    let rows: Vec<_> = report.rows.iter().map(|row| (row.version, row.status)).collect();
    assert_eq!(
        rows,
        vec![
            (V1, MigrationStatus::Up),
            (V2, MigrationStatus::Down),
            (V3, MigrationStatus::UpMissing),
        ]
    );
    assert_eq!(report.exit_code(), 2);

    let summary = report.summary();
    assert_eq!(summary.pending_count, 1);
    assert_eq!(summary.missing_count, 1);
    assert_eq!(summary.total_count, 3);
}

#[tokio::test]
async fn test_namespaced_descriptors() {
    let journal: Journal = Arc::new(Mutex::new(Vec::new()));
    let body = |name| Recorded {
        name,
        journal: journal.clone(),
        fail_up: false,
        fail_down: false,
        runnable: true,
    };
    let source = CodeMigrationSource::new()
        .with_descriptor(MigrationDescriptor::new(V1, "Create", body("Create")))
        .with_descriptor(MigrationDescriptor::new(V2, "Create", body("Create")).with_namespace("billing"));

    let ledger = Arc::new(MemoryVersionLog::new());
    let env = Environment::new("testing", ledger.clone(), Arc::new(source)).with_namespace("billing");

    let report = MigrationEngine::new().migrate(&env, None).await.unwrap();
    assert_eq!(report.applied, vec![V2]);
    assert_eq!(ledger.list().await.unwrap().len(), 1);
}
