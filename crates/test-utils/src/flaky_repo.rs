//! Repository wrapper whose writes can be made to fail on demand.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use squadron::errors::{Result, SquadronError};
use squadron::model::{Squad, SquadPatch, Task, TaskLog, TaskPatch};
use squadron::repository::{Repository, SnapshotRepository};

/// In-memory repository; while `fail_writes` is on, every mutating call
/// returns `SquadronError::Repository` without touching stored state.
#[derive(Debug, Default)]
pub struct FlakyRepository {
    inner: SnapshotRepository,
    fail_writes: AtomicBool,
    failed: AtomicUsize,
}

impl FlakyRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// How many writes were refused so far.
    pub fn failed_writes(&self) -> usize {
        self.failed.load(Ordering::SeqCst)
    }

    pub fn inner(&self) -> &SnapshotRepository {
        &self.inner
    }

    fn guard(&self, op: &str) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            self.failed.fetch_add(1, Ordering::SeqCst);
            return Err(SquadronError::repository(format!("simulated failure in {op}")));
        }
        Ok(())
    }
}

impl Repository for FlakyRepository {
    fn create_task(&self, task: &Task) -> Result<()> {
        self.guard("create_task")?;
        self.inner.create_task(task)
    }

    fn get_task(&self, id: &str) -> Result<Option<Task>> {
        self.inner.get_task(id)
    }

    fn list_tasks(&self) -> Result<Vec<Task>> {
        self.inner.list_tasks()
    }

    fn update_task(&self, id: &str, patch: &TaskPatch) -> Result<Option<Task>> {
        self.guard("update_task")?;
        self.inner.update_task(id, patch)
    }

    fn delete_task(&self, id: &str) -> Result<bool> {
        self.guard("delete_task")?;
        self.inner.delete_task(id)
    }

    fn create_squad(&self, squad: &Squad) -> Result<()> {
        self.guard("create_squad")?;
        self.inner.create_squad(squad)
    }

    fn get_squad(&self, id: &str) -> Result<Option<Squad>> {
        self.inner.get_squad(id)
    }

    fn list_squads(&self) -> Result<Vec<Squad>> {
        self.inner.list_squads()
    }

    fn update_squad(&self, id: &str, patch: &SquadPatch) -> Result<Option<Squad>> {
        self.guard("update_squad")?;
        self.inner.update_squad(id, patch)
    }

    fn delete_squad(&self, id: &str) -> Result<bool> {
        self.guard("delete_squad")?;
        self.inner.delete_squad(id)
    }

    fn append_log(&self, log: &TaskLog) -> Result<()> {
        self.guard("append_log")?;
        self.inner.append_log(log)
    }

    fn logs_for_task(&self, task_id: &str) -> Result<Vec<TaskLog>> {
        self.inner.logs_for_task(task_id)
    }

    fn recent_logs(&self, limit: usize) -> Result<Vec<TaskLog>> {
        self.inner.recent_logs(limit)
    }

    fn delete_logs_for_task(&self, task_id: &str) -> Result<usize> {
        self.guard("delete_logs_for_task")?;
        self.inner.delete_logs_for_task(task_id)
    }
}
