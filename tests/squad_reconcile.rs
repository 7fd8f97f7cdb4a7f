// tests/squad_reconcile.rs

use std::collections::BTreeMap;

use squadron::engine::{reconcile_state, Orchestrator};
use squadron::model::{Squad, Task, TaskPatch};
use squadron::types::{AgentRole, SquadStatus, TaskStatus};
use squadron_test_utils::builders::{blueprint, orchestrator, vars, TaskBuilder, TemplateBuilder};
use squadron_test_utils::{drain_kinds, init_tracing, TestResult};

/// Level 0 = {A, B} in parallel, level 1 = {C}.
fn two_level_squad(engine: &mut Orchestrator) -> anyhow::Result<(Squad, Vec<Task>)> {
    let template = TemplateBuilder::new("squad")
        .parallel(vec![
            blueprint(AgentRole::Frontend, "A"),
            blueprint(AgentRole::Backend, "B"),
        ])
        .parallel(vec![blueprint(AgentRole::Tester, "C")])
        .build();
    let squad = engine.create_squad(&template, &vars(&[]))?;
    let members = engine.squad_tasks(&squad.id).unwrap();
    Ok((squad, members))
}

fn status_of(engine: &Orchestrator, id: &str) -> TaskStatus {
    engine.get_task(id).unwrap().status
}

#[test]
fn test_start_auto_starts_first_level_and_completion_ripples() -> TestResult {
    init_tracing();
    let mut engine = orchestrator(BTreeMap::new());
    let (squad, m) = two_level_squad(&mut engine)?;

    let started = engine.start_squad(&squad.id)?.unwrap();
    assert_eq!(started.status, SquadStatus::Running);
    assert_eq!(status_of(&engine, &m[0].id), TaskStatus::Running);
    assert_eq!(status_of(&engine, &m[1].id), TaskStatus::Running);
    assert_eq!(status_of(&engine, &m[2].id), TaskStatus::Blocked);

    engine.complete_task(&m[0].id, None)?;
    assert_eq!(status_of(&engine, &m[2].id), TaskStatus::Blocked);

    engine.complete_task(&m[1].id, None)?;
    assert_eq!(status_of(&engine, &m[2].id), TaskStatus::Running);

    let squad = engine.get_squad(&squad.id).unwrap();
    assert_eq!(squad.progress, 67);
    assert_eq!(squad.current_level, 1);
    assert_eq!(squad.status, SquadStatus::Running);
    Ok(())
}

#[test]
fn test_reconcile_is_idempotent() -> TestResult {
    let mut engine = orchestrator(BTreeMap::new());
    let (squad, m) = two_level_squad(&mut engine)?;
    engine.start_squad(&squad.id)?;
    engine.complete_task(&m[0].id, None)?;

    let first = engine.reconcile(&squad.id)?.unwrap();
    let second = engine.reconcile(&squad.id)?.unwrap();
    assert_eq!(first, second);
    assert_eq!(engine.get_squad(&squad.id), Some(&second));
    Ok(())
}

#[test]
fn test_failure_is_sticky() -> TestResult {
    let mut engine = orchestrator(BTreeMap::new());
    let (squad, m) = two_level_squad(&mut engine)?;
    engine.start_squad(&squad.id)?;

    engine.fail_task(&m[0].id, "broken")?;
    assert_eq!(engine.get_squad(&squad.id).unwrap().status, SquadStatus::Failed);

    // Everything eventually completes, the squad stays failed.
    engine.complete_task(&m[1].id, None)?;
    engine.start_task(&m[0].id)?;
    engine.complete_task(&m[0].id, None)?;
    engine.complete_task(&m[2].id, None)?;

    let squad = engine.get_squad(&squad.id).unwrap();
    assert_eq!(squad.status, SquadStatus::Failed);
    assert_eq!(squad.progress, 100);
    Ok(())
}

#[test]
fn test_failed_squad_does_not_auto_start() -> TestResult {
    let mut engine = orchestrator(BTreeMap::new());
    let (squad, m) = two_level_squad(&mut engine)?;
    engine.start_squad(&squad.id)?;

    engine.fail_task(&m[0].id, "broken")?;
    engine.complete_task(&m[1].id, None)?;
    engine.update_task(&m[0].id, TaskPatch::status(TaskStatus::Completed))?;

    // C became eligible, but the squad is no longer running.
    assert_eq!(status_of(&engine, &m[2].id), TaskStatus::Pending);
    Ok(())
}

#[test]
fn test_squad_completed_emitted_once() -> TestResult {
    let mut engine = orchestrator(BTreeMap::new());
    let template = TemplateBuilder::new("solo")
        .parallel(vec![blueprint(AgentRole::Backend, "only")])
        .build();
    let squad = engine.create_squad(&template, &vars(&[]))?;
    let task_id = squad.tasks[0].clone();

    let mut sub = engine.subscribe();
    engine.start_squad(&squad.id)?;
    engine.complete_task(&task_id, None)?;
    engine.reconcile(&squad.id)?;
    engine.reconcile(&squad.id)?;

    let kinds = drain_kinds(&mut sub);
    assert_eq!(kinds.iter().filter(|k| **k == "squad_completed").count(), 1);
    assert_eq!(kinds.iter().filter(|k| **k == "squad_started").count(), 1);
    assert!(kinds.iter().filter(|k| **k == "squad_updated").count() >= 3);

    let squad = engine.get_squad(&squad.id).unwrap();
    assert_eq!(squad.status, SquadStatus::Completed);
    assert_eq!(squad.progress, 100);
    assert_eq!(squad.current_level, 0);
    Ok(())
}

#[test]
fn test_pause_stops_auto_start_until_resumed() -> TestResult {
    let mut engine = orchestrator(BTreeMap::new());
    let (squad, m) = two_level_squad(&mut engine)?;
    engine.start_squad(&squad.id)?;

    let paused = engine.pause_squad(&squad.id)?.unwrap();
    assert_eq!(paused.status, SquadStatus::Paused);
    assert!(engine.pause_squad(&squad.id)?.is_none());

    engine.complete_task(&m[0].id, None)?;
    engine.complete_task(&m[1].id, None)?;
    assert_eq!(status_of(&engine, &m[2].id), TaskStatus::Pending);

    let resumed = engine.start_squad(&squad.id)?.unwrap();
    assert_eq!(resumed.status, SquadStatus::Running);
    assert_eq!(status_of(&engine, &m[2].id), TaskStatus::Running);
    Ok(())
}

#[test]
fn test_start_and_pause_guards() -> TestResult {
    let mut engine = orchestrator(BTreeMap::new());
    let (squad, _) = two_level_squad(&mut engine)?;

    assert!(engine.pause_squad(&squad.id)?.is_none(), "idle squad cannot pause");
    assert!(engine.start_squad("nope")?.is_none());
    assert!(engine.reconcile("nope")?.is_none());

    engine.start_squad(&squad.id)?;
    assert!(engine.start_squad(&squad.id)?.is_none(), "already running");
    Ok(())
}

#[test]
fn test_idle_squad_reconcile_does_not_start_tasks() -> TestResult {
    let mut engine = orchestrator(BTreeMap::new());
    let (squad, m) = two_level_squad(&mut engine)?;

    let reconciled = engine.reconcile(&squad.id)?.unwrap();
    assert_eq!(reconciled.status, SquadStatus::Idle);
    assert_eq!(status_of(&engine, &m[0].id), TaskStatus::Pending);
    Ok(())
}

#[test]
fn test_delete_squad_keeps_tasks_and_deleted_member_is_skipped() -> TestResult {
    let mut engine = orchestrator(BTreeMap::new());
    let (squad, m) = two_level_squad(&mut engine)?;

    engine.delete_task(&m[1].id)?;
    let members = engine.squad_tasks(&squad.id).unwrap();
    assert_eq!(members.len(), 2);

    let deleted = engine.delete_squad(&squad.id)?.unwrap();
    assert_eq!(deleted.id, squad.id);
    assert!(engine.get_squad(&squad.id).is_none());
    assert!(engine.squad_tasks(&squad.id).is_none());
    assert_eq!(engine.list_tasks().len(), 2);
    Ok(())
}

#[test]
fn test_sync_reaches_every_squad_listing_the_task() -> TestResult {
    let mut engine = orchestrator(BTreeMap::new());
    let (first, m) = two_level_squad(&mut engine)?;
    let (second, _) = two_level_squad(&mut engine)?;

    let synced = engine.sync_squads_for_task(&m[0].id)?;
    assert_eq!(synced.len(), 1);
    assert_eq!(synced[0].id, first.id);
    assert_ne!(synced[0].id, second.id);
    assert!(engine.sync_squads_for_task("nope")?.is_empty());
    Ok(())
}

fn squad_stub(status: SquadStatus) -> Squad {
    squad_stub_with_levels(status, 3)
}

fn squad_stub_with_levels(status: SquadStatus, total_levels: u32) -> Squad {
    let now = chrono::Utc::now();
    Squad {
        id: "s".to_string(),
        name: "stub".to_string(),
        description: String::new(),
        squad_type: Default::default(),
        tasks: Vec::new(),
        status,
        current_level: 0,
        total_levels,
        progress: 0,
        created_at: now,
        updated_at: now,
    }
}

#[test]
fn test_reconcile_state_of_empty_squad() {
    let state = reconcile_state(&squad_stub(SquadStatus::Running), &[]);
    assert_eq!(state.progress, 0);
    assert_eq!(state.current_level, 0);
    assert_eq!(state.status, SquadStatus::Running);
}

#[test]
fn test_reconcile_state_progress_and_current_level() {
    let tasks = vec![
        TaskBuilder::new("a").status(TaskStatus::Completed).build(),
        TaskBuilder::new("b").level(1).status(TaskStatus::Completed).build(),
        TaskBuilder::new("c").level(1).status(TaskStatus::Running).build(),
        TaskBuilder::new("d").level(2).status(TaskStatus::Blocked).build(),
    ];
    let members: Vec<&Task> = tasks.iter().collect();

    let state = reconcile_state(&squad_stub(SquadStatus::Running), &members);
    assert_eq!(state.progress, 50);
    assert_eq!(state.current_level, 1);
    assert_eq!(state.status, SquadStatus::Running);
}

#[test]
fn test_reconcile_state_all_completed_points_at_last_level() {
    let tasks = vec![
        TaskBuilder::new("a").status(TaskStatus::Completed).build(),
        TaskBuilder::new("b").level(1).status(TaskStatus::Completed).build(),
    ];
    let members: Vec<&Task> = tasks.iter().collect();

    let state = reconcile_state(&squad_stub(SquadStatus::Running), &members);
    assert_eq!(state.status, SquadStatus::Completed);
    assert_eq!(state.progress, 100);
    assert_eq!(state.current_level, 1);
}

#[test]
fn test_reconcile_state_failed_member_fails_idle_squad_too() {
    let tasks = vec![TaskBuilder::new("a").status(TaskStatus::Failed).build()];
    let members: Vec<&Task> = tasks.iter().collect();

    let state = reconcile_state(&squad_stub(SquadStatus::Idle), &members);
    assert_eq!(state.status, SquadStatus::Failed);
}

#[test]
fn test_reconcile_state_current_level_stays_within_template_levels() {
    // One sequential template level whose chain spans three graph levels.
    let tasks = vec![
        TaskBuilder::new("a").status(TaskStatus::Completed).build(),
        TaskBuilder::new("b").level(1).status(TaskStatus::Completed).build(),
        TaskBuilder::new("c").level(2).status(TaskStatus::Running).build(),
    ];
    let members: Vec<&Task> = tasks.iter().collect();

    let state = reconcile_state(&squad_stub_with_levels(SquadStatus::Running, 1), &members);
    assert_eq!(state.current_level, 0);
    assert_eq!(state.progress, 67);
}

#[test]
fn test_sequential_squad_current_level_never_exceeds_total_levels() -> TestResult {
    let mut engine = orchestrator(BTreeMap::new());
    let template = TemplateBuilder::new("chain")
        .sequential(vec![
            blueprint(AgentRole::Backend, "X"),
            blueprint(AgentRole::Backend, "Y"),
            blueprint(AgentRole::Tester, "Z"),
        ])
        .build();
    let squad = engine.create_squad(&template, &vars(&[]))?;
    let members = engine.squad_tasks(&squad.id).unwrap();

    engine.start_squad(&squad.id)?;
    engine.complete_task(&members[0].id, None)?;
    engine.complete_task(&members[1].id, None)?;

    let squad = engine.get_squad(&squad.id).unwrap();
    assert_eq!(squad.total_levels, 1);
    assert_eq!(squad.status, SquadStatus::Running);
    assert!(squad.current_level <= squad.total_levels);
    assert_eq!(squad.current_level, 0);
    Ok(())
}
