// src/lib.rs

pub mod cache;
pub mod cli;
pub mod config;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod events;
pub mod fs;
pub mod logging;
pub mod model;
pub mod repository;
pub mod template;
pub mod types;

use std::sync::Arc;

use anyhow::{bail, Result};
use serde::Serialize;
use tracing::debug;

use crate::cli::{CliArgs, Command, SquadCommand, TaskCommand, TemplateArgs};
use crate::config::{default_config_path, load_or_default};
use crate::config::ConfigFile;
use crate::engine::{EngineOptions, Orchestrator};
use crate::events::{format_event_frame, EventHub, Subscription};
use crate::model::CreateTaskParams;
use crate::repository::SnapshotRepository;
use crate::template::parse_vars;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading (defaults when the file is absent)
/// - the orchestrator over the configured storage
/// - one observer on the hub, drained by a background task while the
///   command runs; its frames are printed after the command
pub async fn run(args: CliArgs) -> Result<()> {
    let config_path = args.config.unwrap_or_else(default_config_path);
    let cfg = load_or_default(&config_path)?;

    match args.command {
        Command::Plan(template) => print_plan(&cfg, &template),
        Command::Squad(cmd) => with_engine(&cfg, |o| run_squad(o, cmd)).await,
        Command::Task(cmd) => with_engine(&cfg, |o| run_task(o, cmd)).await,
        Command::Dag => with_engine(&cfg, |o| print_json(&o.dag_structure()?)).await,
    }
}

/// Run one command against the configured engine, then print the event
/// frames it caused, including those emitted before a failure.
async fn with_engine(
    cfg: &ConfigFile,
    command: impl FnOnce(&mut Orchestrator) -> Result<()>,
) -> Result<()> {
    let mut orchestrator = Orchestrator::from_config(cfg)?;
    let collector = tokio::spawn(collect_frames(orchestrator.subscribe()));

    let outcome = command(&mut orchestrator);
    // Dropping the engine drops the hub, which ends the collector.
    drop(orchestrator);

    for frame in collector.await?? {
        print!("{frame}");
    }
    outcome
}

fn run_squad(orchestrator: &mut Orchestrator, cmd: SquadCommand) -> Result<()> {
    match cmd {
        SquadCommand::Create { template, start } => {
            let vars = parse_vars(&template.vars)?;
            let squad = orchestrator.create_squad_from(&template.template, &vars)?;
            let squad = if start {
                orchestrator.start_squad(&squad.id)?.unwrap_or(squad)
            } else {
                squad
            };
            print_json(&squad)
        }
        SquadCommand::Start { id } => match orchestrator.start_squad(&id)? {
            Some(squad) => print_json(&squad),
            None => bail!("squad '{id}' not found or not startable"),
        },
        SquadCommand::Pause { id } => match orchestrator.pause_squad(&id)? {
            Some(squad) => print_json(&squad),
            None => bail!("squad '{id}' not found or not running"),
        },
        SquadCommand::Show { id } => {
            let Some(squad) = orchestrator.get_squad(&id) else {
                bail!("squad '{id}' not found");
            };
            print_json(squad)?;
            if let Some(tasks) = orchestrator.squad_tasks(&id) {
                print_json(&tasks)?;
            }
            Ok(())
        }
        SquadCommand::List => print_json(orchestrator.list_squads()),
    }
}

fn run_task(orchestrator: &mut Orchestrator, cmd: TaskCommand) -> Result<()> {
    match cmd {
        TaskCommand::Create {
            subject,
            role,
            description,
            active_form,
            protocol,
            blocked_by,
        } => {
            let mut params = CreateTaskParams::new(subject, role)
                .description(description)
                .blocked_by(blocked_by);
            if let Some(active_form) = active_form {
                params = params.active_form(active_form);
            }
            if let Some(protocol) = protocol {
                params = params.protocol(protocol);
            }
            print_json(&orchestrator.create_task(params)?)
        }
        TaskCommand::Start { id } => match orchestrator.start_task(&id)? {
            Some(task) => print_json(&task),
            None => bail!("task '{id}' not found, blocked, or already running/completed"),
        },
        TaskCommand::Complete { id, output } => match orchestrator.complete_task(&id, output)? {
            Some(task) => print_json(&task),
            None => bail!("task '{id}' not found"),
        },
        TaskCommand::Fail { id, error } => match orchestrator.fail_task(&id, error)? {
            Some(task) => print_json(&task),
            None => bail!("task '{id}' not found"),
        },
        TaskCommand::Progress { id, percent } => {
            match orchestrator.report_progress(&id, percent)? {
                Some(task) => print_json(&task),
                None => bail!("task '{id}' not found"),
            }
        }
        TaskCommand::Delete { id } => match orchestrator.delete_task(&id)? {
            Some(task) => print_json(&task),
            None => bail!("task '{id}' not found"),
        },
        TaskCommand::List => print_json(orchestrator.list_tasks()),
        TaskCommand::Ready => print_json(&orchestrator.ready_tasks()),
        TaskCommand::Logs { id, limit } => match id {
            Some(id) => print_json(&orchestrator.task_logs(&id)?),
            None => print_json(&orchestrator.recent_logs(limit)?),
        },
    }
}

/// Expand a template into a throwaway in-memory engine.
fn print_plan(cfg: &ConfigFile, args: &TemplateArgs) -> Result<()> {
    let vars = parse_vars(&args.vars)?;
    let mut orchestrator = Orchestrator::new(
        Arc::new(SnapshotRepository::in_memory()),
        EventHub::new(),
        EngineOptions::from(&cfg.engine),
    )
    .with_templates(cfg.template.clone());

    let squad = orchestrator.create_squad_from(&args.template, &vars)?;
    println!("squadron plan: {}", squad.name);
    println!("  type = {}", squad.squad_type);
    println!("  total_levels = {}", squad.total_levels);
    println!();

    let dag = orchestrator.dag_structure()?;
    for (level, ids) in dag.levels.iter().enumerate() {
        println!("level {level}:");
        for id in ids {
            let Some(task) = orchestrator.get_task(id) else {
                continue;
            };
            println!("  - [{}] {}", task.role, task.subject);
            if !task.blocked_by.is_empty() {
                let deps: Vec<&str> = task
                    .blocked_by
                    .iter()
                    .filter_map(|d| orchestrator.get_task(d))
                    .map(|d| d.subject.as_str())
                    .collect();
                println!("      after: {deps:?}");
            }
        }
    }

    debug!("plan complete (nothing stored)");
    Ok(())
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn collect_frames(mut observer: Subscription) -> Result<Vec<String>> {
    let mut frames = Vec::new();
    while let Some(event) = observer.recv().await {
        frames.push(format_event_frame(&event)?);
    }
    debug!(frames = frames.len(), "event stream drained");
    Ok(frames)
}
