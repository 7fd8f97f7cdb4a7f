// src/repository/mod.rs

//! Persistence boundary.
//!
//! The engine treats the repository as authoritative for durable state and
//! keeps its own cache for reads between writes. Repository errors are
//! passed through to the engine's callers unmodified.
//!
//! - [`snapshot`] provides [`SnapshotRepository`], usable purely in memory
//!   or backed by a JSON snapshot file.

pub mod snapshot;

use std::fmt::Debug;

use crate::errors::Result;
use crate::model::{Squad, SquadPatch, Task, TaskLog, TaskPatch};

pub use snapshot::{Snapshot, SnapshotRepository, SNAPSHOT_SCHEMA_VERSION};

/// Synchronous key-addressed store for tasks, squads and task logs.
pub trait Repository: Send + Sync + Debug {
    fn create_task(&self, task: &Task) -> Result<()>;
    fn get_task(&self, id: &str) -> Result<Option<Task>>;
    /// All tasks in creation order.
    fn list_tasks(&self) -> Result<Vec<Task>>;
    /// Merge `patch` into the stored task; `None` if unknown.
    fn update_task(&self, id: &str, patch: &TaskPatch) -> Result<Option<Task>>;
    /// Returns `false` if the task did not exist.
    fn delete_task(&self, id: &str) -> Result<bool>;

    fn create_squad(&self, squad: &Squad) -> Result<()>;
    fn get_squad(&self, id: &str) -> Result<Option<Squad>>;
    /// All squads in creation order.
    fn list_squads(&self) -> Result<Vec<Squad>>;
    fn update_squad(&self, id: &str, patch: &SquadPatch) -> Result<Option<Squad>>;
    fn delete_squad(&self, id: &str) -> Result<bool>;

    fn append_log(&self, log: &TaskLog) -> Result<()>;
    /// Logs of one task, oldest first.
    fn logs_for_task(&self, task_id: &str) -> Result<Vec<TaskLog>>;
    /// Up to `limit` logs across all tasks, newest first.
    fn recent_logs(&self, limit: usize) -> Result<Vec<TaskLog>>;
    /// Returns how many entries were purged.
    fn delete_logs_for_task(&self, task_id: &str) -> Result<usize>;
}
