// src/engine/tasks.rs

//! Task lifecycle management.
//!
//! [`TaskManager`] owns the authoritative in-memory view of all tasks and
//! applies every transition. Each write goes to the repository first and
//! only reaches the cache once the repository accepted it, so a storage
//! error can leave the cache behind durable state but never ahead of it.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::cache::RecordCache;
use crate::dag::{group_by_level, validate_acyclic, DagStructure, LevelCalculator, Readiness};
use crate::engine::EngineOptions;
use crate::errors::{Result, SquadronError};
use crate::events::{EngineEvent, EventHub, EventPayload};
use crate::model::{new_id, CreateTaskParams, Task, TaskId, TaskLog, TaskPatch};
use crate::repository::Repository;
use crate::types::{DanglingPolicy, LogLevel, TaskStatus};

pub struct TaskManager {
    repo: Arc<dyn Repository>,
    hub: EventHub,
    options: EngineOptions,
    tasks: RecordCache<Task>,
    /// Ids of tasks currently in `Running`.
    running: HashSet<TaskId>,
}

impl fmt::Debug for TaskManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskManager")
            .field("tasks", &self.tasks.len())
            .field("running", &self.running.len())
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl TaskManager {
    /// Start with an empty cache.
    pub fn new(repo: Arc<dyn Repository>, hub: EventHub, options: EngineOptions) -> Self {
        Self {
            repo,
            hub,
            options,
            tasks: RecordCache::new(),
            running: HashSet::new(),
        }
    }

    /// Rebuild the cache from the repository.
    ///
    /// Fails with `CyclicDependency` if the stored graph has a cycle.
    pub fn load(repo: Arc<dyn Repository>, hub: EventHub, options: EngineOptions) -> Result<Self> {
        let stored = repo.list_tasks()?;
        validate_acyclic(&stored)?;

        let running = stored
            .iter()
            .filter(|t| t.status == TaskStatus::Running)
            .map(|t| t.id.clone())
            .collect();

        debug!(tasks = stored.len(), "task cache loaded from repository");

        Ok(Self {
            repo,
            hub,
            options,
            tasks: stored.into_iter().collect(),
            running,
        })
    }

    pub fn get(&self, id: &str) -> Option<&Task> {
        self.tasks.get(id)
    }

    /// All cached tasks in creation order.
    pub fn tasks(&self) -> &[Task] {
        self.tasks.as_slice()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Copy of the running-id set.
    pub fn running_ids(&self) -> HashSet<TaskId> {
        self.running.clone()
    }

    /// Create a task.
    ///
    /// Status starts as `Blocked` when `blocked_by` is non-empty, else
    /// `Pending`. Every known dependency gets the new id in its `blocks`.
    /// Unknown dependency ids follow [`DanglingPolicy`].
    pub fn create(&mut self, params: CreateTaskParams) -> Result<Task> {
        let id = new_id();
        let mut blocked_by: Vec<TaskId> = Vec::with_capacity(params.blocked_by.len());
        for dep in params.blocked_by {
            if !blocked_by.contains(&dep) {
                blocked_by.push(dep);
            }
        }

        for dep in blocked_by.iter() {
            if self.tasks.contains(dep) {
                continue;
            }
            match self.options.dangling {
                DanglingPolicy::Reject => {
                    return Err(SquadronError::UnknownDependency {
                        task: params.subject.clone(),
                        dependency: dep.clone(),
                    });
                }
                DanglingPolicy::Ignore => {
                    warn!(task = %id, dep = %dep, "dependency not found; keeping dangling reference");
                }
            }
        }

        let now = Utc::now();
        let status = if blocked_by.is_empty() {
            TaskStatus::Pending
        } else {
            TaskStatus::Blocked
        };
        let active_form = params
            .active_form
            .unwrap_or_else(|| params.subject.clone());

        let mut task = Task {
            id: id.clone(),
            subject: params.subject,
            description: params.description,
            active_form,
            role: params.role,
            protocol: params.protocol,
            blocked_by,
            blocks: Vec::new(),
            level: 0,
            status,
            progress: 0,
            output: None,
            error: None,
            created_at: now,
            updated_at: now,
            started_at: None,
            completed_at: None,
        };
        // Cached dependencies already carry their final levels.
        task.level = task
            .blocked_by
            .iter()
            .filter_map(|dep| self.tasks.get(dep))
            .map(|dep| dep.level + 1)
            .max()
            .unwrap_or(0);

        self.repo.create_task(&task)?;
        self.tasks.insert(task.clone());

        for dep in task.blocked_by.iter() {
            let Some(dep_task) = self.tasks.get(dep) else {
                continue;
            };
            if dep_task.blocks.contains(&id) {
                continue;
            }
            let mut blocks = dep_task.blocks.clone();
            blocks.push(id.clone());
            self.persist_patch(
                dep,
                TaskPatch {
                    blocks: Some(blocks),
                    updated_at: Some(now),
                    ..TaskPatch::default()
                },
            )?;
        }

        debug!(
            task = %task.id,
            subject = %task.subject,
            level = task.level,
            status = %task.status,
            deps = task.blocked_by.len(),
            "task created"
        );
        self.emit(EventPayload::TaskCreated(task.clone()));

        Ok(task)
    }

    /// Merge `patch` into the task; `None` if the id is unknown.
    ///
    /// Setting the status to `Completed` runs the unblock sweep.
    pub fn update(&mut self, id: &str, mut patch: TaskPatch) -> Result<Option<Task>> {
        if !self.tasks.contains(id) {
            debug!(task = %id, "update for unknown task; ignoring");
            return Ok(None);
        }

        patch.updated_at = Some(Utc::now());
        let Some(task) = self.persist_patch(id, patch.clone())? else {
            return Ok(None);
        };

        self.emit(EventPayload::TaskUpdated(task.clone()));

        if patch.completes() {
            self.unblock_sweep()?;
        }

        Ok(Some(task))
    }

    /// Move a task to `Running`.
    ///
    /// Returns `None` (and changes nothing) if the task is unknown, already
    /// running or completed, or still has an unfinished dependency.
    pub fn start(&mut self, id: &str) -> Result<Option<Task>> {
        let Some(task) = self.tasks.get(id) else {
            debug!(task = %id, "start for unknown task; ignoring");
            return Ok(None);
        };

        if matches!(task.status, TaskStatus::Running | TaskStatus::Completed) {
            debug!(task = %id, status = %task.status, "start ignored; task already running or completed");
            return Ok(None);
        }

        if Readiness::new(self.tasks.as_slice()).is_blocked(task) {
            debug!(task = %id, "start ignored; dependencies not completed");
            return Ok(None);
        }

        let now = Utc::now();
        let patch = TaskPatch {
            status: Some(TaskStatus::Running),
            started_at: Some(now),
            updated_at: Some(now),
            ..TaskPatch::default()
        };
        let Some(task) = self.persist_patch(id, patch)? else {
            return Ok(None);
        };

        info!(task = %task.id, subject = %task.subject, role = %task.role, "task started");
        self.emit(EventPayload::TaskStarted(task.clone()));
        self.append_log(id, LogLevel::Info, format!("Started: {}", task.active_form))?;

        Ok(Some(task))
    }

    /// Mark a task completed with progress 100 and unblock its dependents.
    ///
    /// Outcomes reported for a task that is not `Running` are still
    /// recorded, with a warning.
    pub fn complete(&mut self, id: &str, output: Option<String>) -> Result<Option<Task>> {
        let Some(current) = self.tasks.get(id) else {
            debug!(task = %id, "complete for unknown task; ignoring");
            return Ok(None);
        };
        warn_unless_running(current, TaskStatus::Completed);

        let now = Utc::now();
        let patch = TaskPatch {
            status: Some(TaskStatus::Completed),
            progress: Some(100),
            output,
            completed_at: Some(now),
            updated_at: Some(now),
            ..TaskPatch::default()
        };
        let Some(task) = self.persist_patch(id, patch)? else {
            return Ok(None);
        };

        info!(task = %task.id, subject = %task.subject, "task completed");
        self.emit(EventPayload::TaskCompleted(task.clone()));
        self.append_log(id, LogLevel::Success, format!("Completed: {}", task.subject))?;

        let unblocked = self.unblock_sweep()?;
        if !unblocked.is_empty() {
            debug!(task = %task.id, unblocked = unblocked.len(), "dependents unblocked");
        }

        Ok(Some(task))
    }

    /// Mark a task failed with `error`. Same status rule as [`Self::complete`].
    pub fn fail(&mut self, id: &str, error: impl Into<String>) -> Result<Option<Task>> {
        let Some(current) = self.tasks.get(id) else {
            debug!(task = %id, "fail for unknown task; ignoring");
            return Ok(None);
        };
        warn_unless_running(current, TaskStatus::Failed);

        let error = error.into();
        let patch = TaskPatch {
            status: Some(TaskStatus::Failed),
            error: Some(error.clone()),
            updated_at: Some(Utc::now()),
            ..TaskPatch::default()
        };
        let Some(task) = self.persist_patch(id, patch)? else {
            return Ok(None);
        };

        warn!(task = %task.id, subject = %task.subject, error = %error, "task failed");
        self.emit(EventPayload::TaskFailed(task.clone()));
        self.append_log(id, LogLevel::Error, format!("Failed: {error}"))?;

        Ok(Some(task))
    }

    /// Record work progress (clamped to 100).
    pub fn report_progress(&mut self, id: &str, percent: u8) -> Result<Option<Task>> {
        self.update(
            id,
            TaskPatch {
                progress: Some(percent.min(100)),
                ..TaskPatch::default()
            },
        )
    }

    /// Remove a task, its inverse edges and its logs.
    ///
    /// Dependents keep the id in their `blocked_by`, so they stay blocked.
    pub fn delete(&mut self, id: &str) -> Result<Option<Task>> {
        let Some(task) = self.tasks.get(id).cloned() else {
            debug!(task = %id, "delete for unknown task; ignoring");
            return Ok(None);
        };

        let now = Utc::now();
        for dep in task.blocked_by.iter() {
            let Some(dep_task) = self.tasks.get(dep) else {
                continue;
            };
            let blocks: Vec<TaskId> = dep_task
                .blocks
                .iter()
                .filter(|b| b.as_str() != id)
                .cloned()
                .collect();
            self.persist_patch(
                dep,
                TaskPatch {
                    blocks: Some(blocks),
                    updated_at: Some(now),
                    ..TaskPatch::default()
                },
            )?;
        }

        let purged = self.repo.delete_logs_for_task(id)?;
        self.repo.delete_task(id)?;
        self.tasks.remove(id);
        self.running.remove(id);

        debug!(task = %id, logs_purged = purged, "task deleted");
        Ok(Some(task))
    }

    /// Append a log entry to a task; `None` if the task is unknown.
    pub fn append_log(
        &mut self,
        id: &str,
        level: LogLevel,
        message: impl Into<String>,
    ) -> Result<Option<TaskLog>> {
        if !self.tasks.contains(id) {
            return Ok(None);
        }

        let log = TaskLog::new(id, level, message);
        self.repo.append_log(&log)?;
        self.emit(EventPayload::TaskLogAppended(log.clone()));
        Ok(Some(log))
    }

    pub fn logs(&self, id: &str) -> Result<Vec<TaskLog>> {
        self.repo.logs_for_task(id)
    }

    /// Newest logs first; `limit` defaults to the configured page size.
    pub fn recent_logs(&self, limit: Option<usize>) -> Result<Vec<TaskLog>> {
        self.repo
            .recent_logs(limit.unwrap_or(self.options.recent_log_limit))
    }

    /// `Pending` tasks whose dependencies are all completed.
    pub fn get_ready(&self) -> Vec<Task> {
        Readiness::new(self.tasks.as_slice())
            .ready()
            .into_iter()
            .cloned()
            .collect()
    }

    pub fn get_by_level(&self, level: u32) -> Vec<Task> {
        group_by_level(self.tasks.iter())
            .into_iter()
            .nth(level as usize)
            .map(|bucket| bucket.into_iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn get_dag_structure(&self) -> Result<DagStructure> {
        DagStructure::build(self.tasks.as_slice())
    }

    /// Recompute a task's level against the current cache and store it if it
    /// changed.
    pub fn refresh_level(&mut self, id: &str) -> Result<Option<Task>> {
        let Some(task) = self.tasks.get(id) else {
            return Ok(None);
        };

        let level = LevelCalculator::new(self.tasks.as_slice()).level_of(task)?;
        if level == task.level {
            return Ok(Some(task.clone()));
        }

        self.update(
            id,
            TaskPatch {
                level: Some(level),
                ..TaskPatch::default()
            },
        )
    }

    /// Flip every `Blocked` task whose dependencies are now all completed
    /// to `Pending`. Returns the flipped tasks.
    fn unblock_sweep(&mut self) -> Result<Vec<Task>> {
        // Decide first, then mutate.
        let candidates: Vec<TaskId> = {
            let readiness = Readiness::new(self.tasks.as_slice());
            self.tasks
                .iter()
                .filter(|t| t.status == TaskStatus::Blocked && !readiness.is_blocked(t))
                .map(|t| t.id.clone())
                .collect()
        };

        let mut unblocked = Vec::with_capacity(candidates.len());
        for id in candidates {
            let patch = TaskPatch {
                status: Some(TaskStatus::Pending),
                updated_at: Some(Utc::now()),
                ..TaskPatch::default()
            };
            if let Some(task) = self.persist_patch(&id, patch)? {
                debug!(task = %task.id, "dependencies completed; Blocked -> Pending");
                self.emit(EventPayload::TaskUpdated(task.clone()));
                unblocked.push(task);
            }
        }

        Ok(unblocked)
    }

    /// Repository first, then cache. Keeps the running set in step.
    fn persist_patch(&mut self, id: &str, patch: TaskPatch) -> Result<Option<Task>> {
        let Some(stored) = self.repo.update_task(id, &patch)? else {
            warn!(task = %id, "task cached but missing from repository");
            return Ok(None);
        };

        if let Some(status) = patch.status {
            if status == TaskStatus::Running {
                self.running.insert(id.to_string());
            } else {
                self.running.remove(id);
            }
        }

        self.tasks.insert(stored.clone());
        Ok(Some(stored))
    }

    fn emit(&self, payload: EventPayload) {
        self.hub.publish(EngineEvent::new(payload));
    }
}

fn warn_unless_running(task: &Task, next: TaskStatus) {
    if task.status != TaskStatus::Running {
        warn!(
            task = %task.id,
            from = %task.status,
            to = %next,
            "outcome reported for a task that is not running"
        );
    }
}
