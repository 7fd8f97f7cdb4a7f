// src/repository/snapshot.rs

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cache::RecordCache;
use crate::errors::{Result, SquadronError};
use crate::fs::{FileSystem, RealFileSystem};
use crate::model::{Squad, SquadPatch, Task, TaskLog, TaskPatch};
use crate::repository::Repository;

pub const SNAPSHOT_SCHEMA_VERSION: u32 = 1;

/// On-disk layout of the snapshot file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snapshot {
    pub schema_version: u32,
    #[serde(default)]
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub squads: Vec<Squad>,
    #[serde(default)]
    pub logs: Vec<TaskLog>,
}

#[derive(Debug, Clone, Default)]
struct RepoState {
    tasks: RecordCache<Task>,
    squads: RecordCache<Squad>,
    logs: Vec<TaskLog>,
}

impl RepoState {
    fn from_snapshot(snapshot: Snapshot) -> Self {
        Self {
            tasks: snapshot.tasks.into_iter().collect(),
            squads: snapshot.squads.into_iter().collect(),
            logs: snapshot.logs,
        }
    }

    fn to_snapshot(&self) -> Snapshot {
        Snapshot {
            schema_version: SNAPSHOT_SCHEMA_VERSION,
            tasks: self.tasks.as_slice().to_vec(),
            squads: self.squads.as_slice().to_vec(),
            logs: self.logs.clone(),
        }
    }
}

#[derive(Debug)]
struct SnapshotFile {
    fs: Arc<dyn FileSystem>,
    path: PathBuf,
}

impl SnapshotFile {
    fn load(&self) -> Result<Snapshot> {
        if !self.fs.exists(&self.path) {
            return Ok(Snapshot {
                schema_version: SNAPSHOT_SCHEMA_VERSION,
                ..Snapshot::default()
            });
        }

        let content = self.fs.read_to_string(&self.path)?;
        let snapshot: Snapshot = serde_json::from_str(&content)?;

        if !(1..=SNAPSHOT_SCHEMA_VERSION).contains(&snapshot.schema_version) {
            return Err(SquadronError::repository(format!(
                "unsupported snapshot schema_version {} in {:?}",
                snapshot.schema_version, self.path
            )));
        }

        Ok(snapshot)
    }

    fn store(&self, state: &RepoState) -> Result<()> {
        let content = serde_json::to_vec_pretty(&state.to_snapshot())?;
        self.fs
            .write(&self.path, &content)
            .map_err(|e| SquadronError::repository(format!("{e:#}")))?;
        debug!(path = ?self.path, bytes = content.len(), "snapshot written");
        Ok(())
    }
}

/// Repository holding all records in memory, optionally mirrored to a
/// JSON snapshot file.
///
/// Every write is applied to a copy of the state, flushed, and only then
/// committed, so a failed flush leaves the repository unchanged.
#[derive(Debug, Default)]
pub struct SnapshotRepository {
    state: Mutex<RepoState>,
    file: Option<SnapshotFile>,
}

impl SnapshotRepository {
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Open (or start) a snapshot file at `path` on the real filesystem.
    pub fn open_path(path: impl AsRef<Path>) -> Result<Self> {
        Self::open(Arc::new(RealFileSystem), path)
    }

    /// Open (or start) a snapshot file at `path` on `fs`.
    pub fn open(fs: Arc<dyn FileSystem>, path: impl AsRef<Path>) -> Result<Self> {
        let file = SnapshotFile {
            fs,
            path: path.as_ref().to_path_buf(),
        };
        let snapshot = file.load()?;
        debug!(
            path = ?file.path,
            tasks = snapshot.tasks.len(),
            squads = snapshot.squads.len(),
            "snapshot loaded"
        );

        Ok(Self {
            state: Mutex::new(RepoState::from_snapshot(snapshot)),
            file: Some(file),
        })
    }

    fn lock(&self) -> MutexGuard<'_, RepoState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn read<R>(&self, f: impl FnOnce(&RepoState) -> R) -> R {
        f(&*self.lock())
    }

    fn mutate<R>(&self, f: impl FnOnce(&mut RepoState) -> R) -> Result<R> {
        let mut state = self.lock();

        let Some(file) = &self.file else {
            return Ok(f(&mut *state));
        };

        let mut next = state.clone();
        let out = f(&mut next);
        file.store(&next)?;
        *state = next;
        Ok(out)
    }
}

impl Repository for SnapshotRepository {
    fn create_task(&self, task: &Task) -> Result<()> {
        self.mutate(|s| {
            s.tasks.insert(task.clone());
        })
    }

    fn get_task(&self, id: &str) -> Result<Option<Task>> {
        Ok(self.read(|s| s.tasks.get(id).cloned()))
    }

    fn list_tasks(&self) -> Result<Vec<Task>> {
        Ok(self.read(|s| s.tasks.as_slice().to_vec()))
    }

    fn update_task(&self, id: &str, patch: &TaskPatch) -> Result<Option<Task>> {
        if !self.read(|s| s.tasks.contains(id)) {
            return Ok(None);
        }
        self.mutate(|s| {
            s.tasks.get_mut(id).map(|task| {
                patch.apply_to(task);
                task.clone()
            })
        })
    }

    fn delete_task(&self, id: &str) -> Result<bool> {
        if !self.read(|s| s.tasks.contains(id)) {
            return Ok(false);
        }
        self.mutate(|s| s.tasks.remove(id).is_some())
    }

    fn create_squad(&self, squad: &Squad) -> Result<()> {
        self.mutate(|s| {
            s.squads.insert(squad.clone());
        })
    }

    fn get_squad(&self, id: &str) -> Result<Option<Squad>> {
        Ok(self.read(|s| s.squads.get(id).cloned()))
    }

    fn list_squads(&self) -> Result<Vec<Squad>> {
        Ok(self.read(|s| s.squads.as_slice().to_vec()))
    }

    fn update_squad(&self, id: &str, patch: &SquadPatch) -> Result<Option<Squad>> {
        if !self.read(|s| s.squads.contains(id)) {
            return Ok(None);
        }
        self.mutate(|s| {
            s.squads.get_mut(id).map(|squad| {
                patch.apply_to(squad);
                squad.clone()
            })
        })
    }

    fn delete_squad(&self, id: &str) -> Result<bool> {
        if !self.read(|s| s.squads.contains(id)) {
            return Ok(false);
        }
        self.mutate(|s| s.squads.remove(id).is_some())
    }

    fn append_log(&self, log: &TaskLog) -> Result<()> {
        self.mutate(|s| s.logs.push(log.clone()))
    }

    fn logs_for_task(&self, task_id: &str) -> Result<Vec<TaskLog>> {
        Ok(self.read(|s| {
            s.logs
                .iter()
                .filter(|l| l.task_id == task_id)
                .cloned()
                .collect()
        }))
    }

    fn recent_logs(&self, limit: usize) -> Result<Vec<TaskLog>> {
        Ok(self.read(|s| s.logs.iter().rev().take(limit).cloned().collect()))
    }

    fn delete_logs_for_task(&self, task_id: &str) -> Result<usize> {
        if !self.read(|s| s.logs.iter().any(|l| l.task_id == task_id)) {
            return Ok(0);
        }
        self.mutate(|s| {
            let before = s.logs.len();
            s.logs.retain(|l| l.task_id != task_id);
            before - s.logs.len()
        })
    }
}
