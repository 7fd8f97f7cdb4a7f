// src/model/task.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{Keyed, TaskId};
use crate::types::{AgentRole, TaskStatus};

/// A unit of trackable work.
///
/// `blocked_by` and `blocks` are kept as mutual inverses by the task
/// manager: for every `d` in `t.blocked_by`, `t.id` is in `d.blocks`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub subject: String,
    #[serde(default)]
    pub description: String,
    /// Present-tense label shown while the task runs ("Writing tests").
    #[serde(default)]
    pub active_form: String,
    pub role: AgentRole,
    /// Optional reference to the working protocol the actor should follow.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,

    /// Tasks this one depends on.
    #[serde(default)]
    pub blocked_by: Vec<TaskId>,
    /// Tasks that depend on this one.
    #[serde(default)]
    pub blocks: Vec<TaskId>,

    /// Dependency depth: 0 without dependencies, else 1 + max level of deps.
    #[serde(default)]
    pub level: u32,
    pub status: TaskStatus,

    /// Percentage, 0..=100.
    #[serde(default)]
    pub progress: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Keyed for Task {
    fn key(&self) -> &str {
        &self.id
    }
}

/// Input to `TaskManager::create`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateTaskParams {
    pub subject: String,
    pub description: String,
    /// Falls back to the subject when absent.
    pub active_form: Option<String>,
    pub role: AgentRole,
    pub protocol: Option<String>,
    pub blocked_by: Vec<TaskId>,
}

impl CreateTaskParams {
    pub fn new(subject: impl Into<String>, role: AgentRole) -> Self {
        Self {
            subject: subject.into(),
            description: String::new(),
            active_form: None,
            role,
            protocol: None,
            blocked_by: Vec::new(),
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn active_form(mut self, active_form: impl Into<String>) -> Self {
        self.active_form = Some(active_form.into());
        self
    }

    pub fn protocol(mut self, protocol: impl Into<String>) -> Self {
        self.protocol = Some(protocol.into());
        self
    }

    pub fn blocked_by<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<TaskId>,
    {
        self.blocked_by.extend(ids.into_iter().map(Into::into));
        self
    }
}

/// Field-level partial update of a [`Task`].
///
/// `None` leaves the field untouched. The dependency list itself is not
/// patchable; only its inverse (`blocks`) is, and only the task manager
/// writes it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_form: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<AgentRole>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blocks: Option<Vec<TaskId>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl TaskPatch {
    pub fn status(status: TaskStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    /// Merge the set fields into `task`.
    pub fn apply_to(&self, task: &mut Task) {
        if let Some(ref subject) = self.subject {
            task.subject = subject.clone();
        }
        if let Some(ref description) = self.description {
            task.description = description.clone();
        }
        if let Some(ref active_form) = self.active_form {
            task.active_form = active_form.clone();
        }
        if let Some(role) = self.role {
            task.role = role;
        }
        if let Some(status) = self.status {
            task.status = status;
        }
        if let Some(level) = self.level {
            task.level = level;
        }
        if let Some(progress) = self.progress {
            task.progress = progress.min(100);
        }
        if let Some(ref output) = self.output {
            task.output = Some(output.clone());
        }
        if let Some(ref error) = self.error {
            task.error = Some(error.clone());
        }
        if let Some(ref blocks) = self.blocks {
            task.blocks = blocks.clone();
        }
        if let Some(started_at) = self.started_at {
            task.started_at = Some(started_at);
        }
        if let Some(completed_at) = self.completed_at {
            task.completed_at = Some(completed_at);
        }
        if let Some(updated_at) = self.updated_at {
            task.updated_at = updated_at;
        }
    }

    /// Whether applying this patch marks the task completed.
    pub fn completes(&self) -> bool {
        self.status == Some(TaskStatus::Completed)
    }
}
