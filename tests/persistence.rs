// tests/persistence.rs

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use squadron::engine::{EngineOptions, Orchestrator};
use squadron::errors::SquadronError;
use squadron::events::EventHub;
use squadron::fs::mock::MockFileSystem;
use squadron::model::CreateTaskParams;
use squadron::repository::{Repository, Snapshot, SnapshotRepository, SNAPSHOT_SCHEMA_VERSION};
use squadron::types::{AgentRole, LogLevel, SquadStatus, TaskStatus};
use squadron_test_utils::builders::{blueprint, task, vars, TemplateBuilder};
use squadron_test_utils::flaky_repo::FlakyRepository;
use squadron_test_utils::{init_tracing, TestResult};

const STATE: &str = "/state/squadron.json";

fn open(fs: &MockFileSystem) -> squadron::errors::Result<Orchestrator> {
    let repo = SnapshotRepository::open(Arc::new(fs.clone()), STATE)?;
    Orchestrator::load(Arc::new(repo), EventHub::new(), EngineOptions::default())
}

#[test]
fn test_state_survives_reload() -> TestResult {
    init_tracing();
    let fs = MockFileSystem::new();

    let (squad_id, running_id, done_id) = {
        let mut engine = open(&fs)?;
        let template = TemplateBuilder::new("persisted")
            .parallel(vec![
                blueprint(AgentRole::Backend, "A"),
                blueprint(AgentRole::Backend, "B"),
            ])
            .build();
        let squad = engine.create_squad(&template, &vars(&[]))?;
        engine.start_squad(&squad.id)?;
        engine.complete_task(&squad.tasks[1], Some("done".into()))?;
        (squad.id, squad.tasks[0].clone(), squad.tasks[1].clone())
    };
    assert!(fs.contents(STATE).is_some());

    let engine = open(&fs)?;
    assert_eq!(engine.list_tasks().len(), 2);
    assert_eq!(engine.get_task(&running_id).unwrap().status, TaskStatus::Running);
    assert_eq!(engine.get_task(&done_id).unwrap().output.as_deref(), Some("done"));
    assert!(engine.running_ids().contains(&running_id));

    let squad = engine.get_squad(&squad_id).unwrap();
    assert_eq!(squad.status, SquadStatus::Running);
    assert_eq!(squad.progress, 50);

    let logs = engine.task_logs(&done_id)?;
    assert_eq!(logs.last().unwrap().level, LogLevel::Success);
    Ok(())
}

#[test]
fn test_failed_write_propagates_and_leaves_cache_untouched() -> TestResult {
    let fs = MockFileSystem::new();
    let mut engine = open(&fs)?;

    let a = engine.create_task(CreateTaskParams::new("A", AgentRole::Backend))?;
    engine.start_task(&a.id)?;
    let writes = fs.write_count();

    fs.set_fail_writes(true);
    match engine.complete_task(&a.id, None) {
        Err(SquadronError::Repository(msg)) => assert!(msg.contains("simulated write failure")),
        other => panic!("expected Repository error, got {other:?}"),
    }
    assert!(engine.create_task(CreateTaskParams::new("B", AgentRole::Backend)).is_err());

    assert_eq!(engine.get_task(&a.id).unwrap().status, TaskStatus::Running);
    assert_eq!(engine.list_tasks().len(), 1);
    assert_eq!(fs.write_count(), writes);

    fs.set_fail_writes(false);
    let done = engine.complete_task(&a.id, None)?.unwrap();
    assert_eq!(done.status, TaskStatus::Completed);

    // Nothing from the failed attempts reached storage.
    let reloaded = open(&fs)?;
    assert_eq!(reloaded.list_tasks().len(), 1);
    Ok(())
}

#[test]
fn test_flaky_repository_errors_reach_the_caller() -> TestResult {
    let repo = Arc::new(FlakyRepository::new());
    let mut engine = Orchestrator::new(repo.clone(), EventHub::new(), EngineOptions::default())
        .with_templates(BTreeMap::new());

    let a = engine.create_task(CreateTaskParams::new("A", AgentRole::Backend))?;
    let b = engine.create_task(CreateTaskParams::new("B", AgentRole::Backend).blocked_by([a.id.clone()]))?;

    repo.set_fail_writes(true);
    assert!(engine.start_task(&a.id).is_err());
    assert!(engine.delete_task(&b.id).is_err());
    assert_eq!(repo.failed_writes(), 2);

    assert_eq!(engine.get_task(&a.id).unwrap().status, TaskStatus::Pending);
    assert!(engine.get_task(&b.id).is_some());
    assert_eq!(repo.inner().get_task(&a.id)?.unwrap().status, TaskStatus::Pending);
    Ok(())
}

#[test]
fn test_cyclic_snapshot_is_rejected_on_load() -> TestResult {
    let fs = MockFileSystem::new();
    let snapshot = Snapshot {
        schema_version: SNAPSHOT_SCHEMA_VERSION,
        tasks: vec![task("a", &["b"]), task("b", &["a"])],
        squads: Vec::new(),
        logs: Vec::new(),
    };
    fs.add_file(STATE, serde_json::to_vec(&snapshot)?);

    assert!(matches!(open(&fs), Err(SquadronError::CyclicDependency(_))));
    Ok(())
}

#[test]
fn test_unknown_schema_version_is_rejected() {
    let fs = MockFileSystem::new();
    fs.add_file(STATE, r#"{"schema_version": 99}"#);

    assert!(matches!(
        SnapshotRepository::open(Arc::new(fs), STATE),
        Err(SquadronError::Repository(_))
    ));
}

#[test]
fn test_real_snapshot_file_in_tempdir() -> TestResult {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("nested").join("state.json");

    {
        let repo = SnapshotRepository::open_path(&path)?;
        let mut engine = Orchestrator::load(Arc::new(repo), EventHub::new(), EngineOptions::default())?;
        engine.create_task(CreateTaskParams::new("A", AgentRole::Backend))?;
    }
    assert!(Path::new(&path).exists());

    let repo = SnapshotRepository::open_path(&path)?;
    assert_eq!(repo.list_tasks()?.len(), 1);

    let stored: Snapshot = serde_json::from_slice(&std::fs::read(&path)?)?;
    assert_eq!(stored.schema_version, SNAPSHOT_SCHEMA_VERSION);
    assert_eq!(stored.tasks.len(), 1);
    Ok(())
}
