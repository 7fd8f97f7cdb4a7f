// src/dag/readiness.rs

//! Readiness: which tasks may start now.
//!
//! A dependency counts as satisfied only if it resolves to a task in the
//! snapshot whose status is `Completed`. A missing dependency never does.

use std::collections::HashMap;

use crate::model::Task;
use crate::types::TaskStatus;

/// Read-only lookup over one snapshot.
#[derive(Debug)]
pub struct Readiness<'a> {
    tasks: &'a [Task],
    index: HashMap<&'a str, &'a Task>,
}

impl<'a> Readiness<'a> {
    pub fn new(tasks: &'a [Task]) -> Self {
        Self {
            tasks,
            index: tasks.iter().map(|t| (t.id.as_str(), t)).collect(),
        }
    }

    /// Whether any dependency of `task` is unresolved or not completed.
    pub fn is_blocked(&self, task: &Task) -> bool {
        task.blocked_by.iter().any(|dep| {
            !matches!(
                self.index.get(dep.as_str()),
                Some(d) if d.status == TaskStatus::Completed
            )
        })
    }

    /// `Pending` tasks whose dependencies are all completed, in snapshot order.
    pub fn ready(&self) -> Vec<&'a Task> {
        self.tasks
            .iter()
            .filter(|t| t.status == TaskStatus::Pending && !self.is_blocked(t))
            .collect()
    }
}

pub fn ready_tasks(tasks: &[Task]) -> Vec<&Task> {
    Readiness::new(tasks).ready()
}

pub fn is_blocked(task: &Task, tasks: &[Task]) -> bool {
    Readiness::new(tasks).is_blocked(task)
}
