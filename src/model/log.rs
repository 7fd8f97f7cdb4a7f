// src/model/log.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{new_id, Keyed, LogId, TaskId};
use crate::types::LogLevel;

/// Append-only, timestamped text entry attached to exactly one task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskLog {
    pub id: LogId,
    pub task_id: TaskId,
    pub level: LogLevel,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

impl TaskLog {
    pub fn new(task_id: impl Into<TaskId>, level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            task_id: task_id.into(),
            level,
            message: message.into(),
            created_at: Utc::now(),
        }
    }
}

impl Keyed for TaskLog {
    fn key(&self) -> &str {
        &self.id
    }
}
