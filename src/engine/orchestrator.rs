// src/engine/orchestrator.rs

//! Explicitly constructed engine service.
//!
//! [`Orchestrator`] owns one task manager, one squad manager, the event hub
//! they publish to and the known squad templates. Every task transition
//! that can move a squad (completion, failure, status update, deletion) is
//! followed by a sync of the squads listing that task.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::debug;

use crate::config::ConfigFile;
use crate::dag::DagStructure;
use crate::engine::squads::SquadManager;
use crate::engine::tasks::TaskManager;
use crate::engine::EngineOptions;
use crate::errors::{Result, SquadronError};
use crate::events::stream::{spawn_push_stream, DEFAULT_KEEPALIVE};
use crate::events::{EventHub, PushStream, Subscription};
use crate::model::{CreateTaskParams, Squad, Task, TaskId, TaskLog, TaskPatch};
use crate::repository::{Repository, SnapshotRepository};
use crate::template::{SquadTemplate, TemplateVars};
use crate::types::{LogLevel, StorageMode};

#[derive(Debug)]
pub struct Orchestrator {
    hub: EventHub,
    tasks: TaskManager,
    squads: SquadManager,
    templates: BTreeMap<String, SquadTemplate>,
    keepalive: Duration,
}

impl Orchestrator {
    /// Fresh engine over `repo`, ignoring anything already stored.
    pub fn new(repo: Arc<dyn Repository>, hub: EventHub, options: EngineOptions) -> Self {
        Self {
            tasks: TaskManager::new(repo.clone(), hub.clone(), options),
            squads: SquadManager::new(repo, hub.clone()),
            hub,
            templates: BTreeMap::new(),
            keepalive: DEFAULT_KEEPALIVE,
        }
    }

    /// Engine whose caches are rebuilt from `repo`.
    pub fn load(repo: Arc<dyn Repository>, hub: EventHub, options: EngineOptions) -> Result<Self> {
        let tasks = TaskManager::load(repo.clone(), hub.clone(), options)?;
        let squads = SquadManager::load(repo, hub.clone())?;
        debug!(
            tasks = tasks.len(),
            squads = squads.squads().len(),
            running = tasks.running_ids().len(),
            "orchestrator loaded"
        );
        Ok(Self {
            hub,
            tasks,
            squads,
            templates: BTreeMap::new(),
            keepalive: DEFAULT_KEEPALIVE,
        })
    }

    /// Wire storage, hub, options and templates from a validated config.
    pub fn from_config(cfg: &ConfigFile) -> Result<Self> {
        let repo: Arc<dyn Repository> = match cfg.storage.mode {
            StorageMode::File => Arc::new(SnapshotRepository::open_path(&cfg.storage.path)?),
            StorageMode::Memory => Arc::new(SnapshotRepository::in_memory()),
        };
        let orchestrator = Self::load(repo, EventHub::new(), EngineOptions::from(&cfg.engine))?
            .with_keepalive(Duration::from_secs(cfg.events.keepalive_secs))
            .with_templates(cfg.template.clone());
        Ok(orchestrator)
    }

    pub fn with_templates(mut self, templates: BTreeMap<String, SquadTemplate>) -> Self {
        self.templates = templates;
        self
    }

    pub fn with_keepalive(mut self, keepalive: Duration) -> Self {
        self.keepalive = keepalive;
        self
    }

    pub fn subscribe(&self) -> Subscription {
        self.hub.subscribe()
    }

    /// Forward every event as a text frame into `sink` until it closes.
    pub fn spawn_push_stream(&self, sink: mpsc::Sender<String>) -> PushStream {
        spawn_push_stream(&self.hub, sink, self.keepalive)
    }

    pub fn templates(&self) -> &BTreeMap<String, SquadTemplate> {
        &self.templates
    }

    pub fn template(&self, name: &str) -> Option<&SquadTemplate> {
        self.templates.get(name)
    }

    // ---- tasks ----

    pub fn create_task(&mut self, params: CreateTaskParams) -> Result<Task> {
        self.tasks.create(params)
    }

    pub fn get_task(&self, id: &str) -> Option<&Task> {
        self.tasks.get(id)
    }

    pub fn list_tasks(&self) -> &[Task] {
        self.tasks.tasks()
    }

    pub fn update_task(&mut self, id: &str, patch: TaskPatch) -> Result<Option<Task>> {
        let moves_squads = patch.status.is_some();
        let updated = self.tasks.update(id, patch)?;
        if moves_squads && updated.is_some() {
            self.squads.sync_squads_for_task(&mut self.tasks, id)?;
        }
        Ok(updated)
    }

    pub fn start_task(&mut self, id: &str) -> Result<Option<Task>> {
        self.tasks.start(id)
    }

    pub fn complete_task(&mut self, id: &str, output: Option<String>) -> Result<Option<Task>> {
        let completed = self.tasks.complete(id, output)?;
        if completed.is_some() {
            self.squads.sync_squads_for_task(&mut self.tasks, id)?;
        }
        Ok(completed)
    }

    pub fn fail_task(&mut self, id: &str, error: impl Into<String>) -> Result<Option<Task>> {
        let failed = self.tasks.fail(id, error)?;
        if failed.is_some() {
            self.squads.sync_squads_for_task(&mut self.tasks, id)?;
        }
        Ok(failed)
    }

    pub fn report_progress(&mut self, id: &str, percent: u8) -> Result<Option<Task>> {
        self.tasks.report_progress(id, percent)
    }

    pub fn delete_task(&mut self, id: &str) -> Result<Option<Task>> {
        let deleted = self.tasks.delete(id)?;
        if deleted.is_some() {
            self.squads.sync_squads_for_task(&mut self.tasks, id)?;
        }
        Ok(deleted)
    }

    pub fn ready_tasks(&self) -> Vec<Task> {
        self.tasks.get_ready()
    }

    pub fn tasks_at_level(&self, level: u32) -> Vec<Task> {
        self.tasks.get_by_level(level)
    }

    pub fn dag_structure(&self) -> Result<DagStructure> {
        self.tasks.get_dag_structure()
    }

    pub fn running_ids(&self) -> HashSet<TaskId> {
        self.tasks.running_ids()
    }

    // ---- logs ----

    pub fn append_log(
        &mut self,
        task_id: &str,
        level: LogLevel,
        message: impl Into<String>,
    ) -> Result<Option<TaskLog>> {
        self.tasks.append_log(task_id, level, message)
    }

    pub fn task_logs(&self, task_id: &str) -> Result<Vec<TaskLog>> {
        self.tasks.logs(task_id)
    }

    pub fn recent_logs(&self, limit: Option<usize>) -> Result<Vec<TaskLog>> {
        self.tasks.recent_logs(limit)
    }

    // ---- squads ----

    pub fn create_squad(&mut self, template: &SquadTemplate, vars: &TemplateVars) -> Result<Squad> {
        self.squads.create(&mut self.tasks, template, vars)
    }

    /// Create a squad from a registered template.
    pub fn create_squad_from(&mut self, name: &str, vars: &TemplateVars) -> Result<Squad> {
        let template = self
            .templates
            .get(name)
            .cloned()
            .ok_or_else(|| SquadronError::TemplateNotFound(name.to_string()))?;
        self.create_squad(&template, vars)
    }

    pub fn start_squad(&mut self, id: &str) -> Result<Option<Squad>> {
        self.squads.start(&mut self.tasks, id)
    }

    pub fn pause_squad(&mut self, id: &str) -> Result<Option<Squad>> {
        self.squads.pause(id)
    }

    pub fn reconcile(&mut self, squad_id: &str) -> Result<Option<Squad>> {
        self.squads.reconcile(&mut self.tasks, squad_id)
    }

    pub fn sync_squads_for_task(&mut self, task_id: &str) -> Result<Vec<Squad>> {
        self.squads.sync_squads_for_task(&mut self.tasks, task_id)
    }

    pub fn get_squad(&self, id: &str) -> Option<&Squad> {
        self.squads.get(id)
    }

    pub fn list_squads(&self) -> &[Squad] {
        self.squads.squads()
    }

    pub fn squad_tasks(&self, id: &str) -> Option<Vec<Task>> {
        self.squads.member_tasks(&self.tasks, id)
    }

    pub fn delete_squad(&mut self, id: &str) -> Result<Option<Squad>> {
        self.squads.delete(id)
    }
}
