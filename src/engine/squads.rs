// src/engine/squads.rs

//! Squad bookkeeping and reconciliation.
//!
//! A squad's `status`, `progress` and `current_level` are never set by a
//! caller. They are derived from member tasks by [`reconcile_state`], a
//! pure function, and [`SquadManager::reconcile`] applies the result,
//! starting newly eligible members first when the squad is running.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::cache::RecordCache;
use crate::dag::{group_by_level, Readiness};
use crate::engine::plan::SquadPlanBuilder;
use crate::engine::tasks::TaskManager;
use crate::errors::Result;
use crate::events::{EngineEvent, EventHub, EventPayload};
use crate::model::{Squad, SquadPatch, Task, TaskId};
use crate::repository::Repository;
use crate::template::{SquadTemplate, TemplateVars};
use crate::types::{SquadStatus, TaskStatus};

/// Aggregate state derived from a squad's members.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SquadState {
    pub status: SquadStatus,
    pub progress: u8,
    pub current_level: u32,
}

/// Derive the aggregate state of `squad` from `members`.
///
/// - progress: completed members over all members, rounded to a percent;
///   an empty squad stays at 0.
/// - current level: index of the first level bucket with an unfinished
///   member, or the last index once everything is completed. Capped at
///   the squad's last template level, since a sequential template level
///   spans several graph levels.
/// - status: `Failed` is sticky; otherwise `Completed` when every member
///   completed, `Failed` when any member failed, else unchanged.
pub fn reconcile_state(squad: &Squad, members: &[&Task]) -> SquadState {
    let total = members.len();
    let completed = members
        .iter()
        .filter(|t| t.status == TaskStatus::Completed)
        .count();

    let progress = if total == 0 {
        0
    } else {
        ((completed as f64 / total as f64) * 100.0).round() as u8
    };

    let buckets = group_by_level(members.iter().copied());
    let current_level = buckets
        .iter()
        .position(|bucket| bucket.iter().any(|t| t.status != TaskStatus::Completed))
        .unwrap_or_else(|| buckets.len().saturating_sub(1)) as u32;
    let current_level = current_level.min(squad.total_levels.saturating_sub(1));

    let all_completed = total > 0 && completed == total;
    let any_failed = members.iter().any(|t| t.status == TaskStatus::Failed);

    let status = if squad.status == SquadStatus::Failed {
        SquadStatus::Failed
    } else if all_completed {
        SquadStatus::Completed
    } else if any_failed {
        SquadStatus::Failed
    } else {
        squad.status
    };

    SquadState {
        status,
        progress,
        current_level,
    }
}

#[derive(Debug)]
pub struct SquadManager {
    repo: Arc<dyn Repository>,
    hub: EventHub,
    squads: RecordCache<Squad>,
}

impl SquadManager {
    pub fn new(repo: Arc<dyn Repository>, hub: EventHub) -> Self {
        Self {
            repo,
            hub,
            squads: RecordCache::new(),
        }
    }

    /// Rebuild the cache from the repository.
    pub fn load(repo: Arc<dyn Repository>, hub: EventHub) -> Result<Self> {
        let stored = repo.list_squads()?;
        debug!(squads = stored.len(), "squad cache loaded from repository");
        Ok(Self {
            repo,
            hub,
            squads: stored.into_iter().collect(),
        })
    }

    pub fn get(&self, id: &str) -> Option<&Squad> {
        self.squads.get(id)
    }

    /// All cached squads in creation order.
    pub fn squads(&self) -> &[Squad] {
        self.squads.as_slice()
    }

    /// Expand `template` into tasks and register the resulting squad.
    pub fn create(
        &mut self,
        tasks: &mut TaskManager,
        template: &SquadTemplate,
        vars: &TemplateVars,
    ) -> Result<Squad> {
        let squad = SquadPlanBuilder::new(tasks).build(template, vars)?;

        self.repo.create_squad(&squad)?;
        self.squads.insert(squad.clone());

        info!(squad = %squad.id, name = %squad.name, "squad created");
        self.emit(EventPayload::SquadCreated(squad.clone()));
        Ok(squad)
    }

    /// `Idle`/`Paused` -> `Running`, then reconcile so ready members start.
    pub fn start(&mut self, tasks: &mut TaskManager, id: &str) -> Result<Option<Squad>> {
        let Some(squad) = self.squads.get(id) else {
            debug!(squad = %id, "start for unknown squad; ignoring");
            return Ok(None);
        };

        if !matches!(squad.status, SquadStatus::Idle | SquadStatus::Paused) {
            debug!(squad = %id, status = %squad.status, "start ignored; squad not idle or paused");
            return Ok(None);
        }

        let patch = SquadPatch {
            status: Some(SquadStatus::Running),
            updated_at: Some(Utc::now()),
            ..SquadPatch::default()
        };
        let Some(squad) = self.persist_patch(id, patch)? else {
            return Ok(None);
        };

        info!(squad = %squad.id, name = %squad.name, "squad started");
        self.emit(EventPayload::SquadStarted(squad));

        self.reconcile(tasks, id)
    }

    /// `Running` -> `Paused`. Reconcile stops auto-starting members.
    pub fn pause(&mut self, id: &str) -> Result<Option<Squad>> {
        let Some(squad) = self.squads.get(id) else {
            debug!(squad = %id, "pause for unknown squad; ignoring");
            return Ok(None);
        };

        if squad.status != SquadStatus::Running {
            debug!(squad = %id, status = %squad.status, "pause ignored; squad not running");
            return Ok(None);
        }

        let patch = SquadPatch {
            status: Some(SquadStatus::Paused),
            updated_at: Some(Utc::now()),
            ..SquadPatch::default()
        };
        let Some(squad) = self.persist_patch(id, patch)? else {
            return Ok(None);
        };

        info!(squad = %squad.id, "squad paused");
        self.emit(EventPayload::SquadUpdated(squad.clone()));
        Ok(Some(squad))
    }

    /// Start ready members (running squads only) and refresh the aggregate
    /// state. Calling it again without task changes stores nothing new.
    pub fn reconcile(&mut self, tasks: &mut TaskManager, id: &str) -> Result<Option<Squad>> {
        let Some(squad) = self.squads.get(id).cloned() else {
            debug!(squad = %id, "reconcile for unknown squad; ignoring");
            return Ok(None);
        };

        if squad.status == SquadStatus::Running {
            let ready: Vec<TaskId> = {
                let members = member_snapshot(&squad, tasks);
                Readiness::new(tasks.tasks())
                    .ready()
                    .into_iter()
                    .filter(|t| members.iter().any(|m| m.id == t.id))
                    .map(|t| t.id.clone())
                    .collect()
            };

            for task_id in ready {
                if tasks.start(&task_id)?.is_some() {
                    debug!(squad = %squad.id, task = %task_id, "member auto-started");
                }
            }
        }

        let state = {
            let members = member_snapshot(&squad, tasks);
            reconcile_state(&squad, &members)
        };

        let changed = state.status != squad.status
            || state.progress != squad.progress
            || state.current_level != squad.current_level;

        let updated = if changed {
            let patch = SquadPatch {
                status: Some(state.status),
                progress: Some(state.progress),
                current_level: Some(state.current_level),
                updated_at: Some(Utc::now()),
                ..SquadPatch::default()
            };
            match self.persist_patch(id, patch)? {
                Some(updated) => updated,
                None => return Ok(None),
            }
        } else {
            squad.clone()
        };

        debug!(
            squad = %updated.id,
            status = %updated.status,
            progress = updated.progress,
            current_level = updated.current_level,
            changed,
            "squad reconciled"
        );
        self.emit(EventPayload::SquadUpdated(updated.clone()));

        if squad.status != SquadStatus::Completed && updated.status == SquadStatus::Completed {
            info!(squad = %updated.id, name = %updated.name, "squad completed");
            self.emit(EventPayload::SquadCompleted(updated.clone()));
        } else if squad.status != SquadStatus::Failed && updated.status == SquadStatus::Failed {
            warn!(squad = %updated.id, name = %updated.name, "squad failed");
        }

        Ok(Some(updated))
    }

    /// Reconcile every squad that lists `task_id` as a member.
    pub fn sync_squads_for_task(
        &mut self,
        tasks: &mut TaskManager,
        task_id: &str,
    ) -> Result<Vec<Squad>> {
        let ids: Vec<String> = self
            .squads
            .iter()
            .filter(|s| s.tasks.iter().any(|t| t == task_id))
            .map(|s| s.id.clone())
            .collect();

        let mut reconciled = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(squad) = self.reconcile(tasks, &id)? {
                reconciled.push(squad);
            }
        }
        Ok(reconciled)
    }

    /// Remove the squad record. Member tasks are left in place.
    pub fn delete(&mut self, id: &str) -> Result<Option<Squad>> {
        let Some(squad) = self.squads.get(id).cloned() else {
            return Ok(None);
        };

        self.repo.delete_squad(id)?;
        self.squads.remove(id);

        debug!(squad = %id, "squad deleted");
        Ok(Some(squad))
    }

    /// Member tasks still known to `tasks`, in squad order; `None` if the
    /// squad is unknown.
    pub fn member_tasks(&self, tasks: &TaskManager, id: &str) -> Option<Vec<Task>> {
        let squad = self.squads.get(id)?;
        Some(
            member_snapshot(squad, tasks)
                .into_iter()
                .cloned()
                .collect(),
        )
    }

    /// Repository first, then cache.
    fn persist_patch(&mut self, id: &str, patch: SquadPatch) -> Result<Option<Squad>> {
        let Some(stored) = self.repo.update_squad(id, &patch)? else {
            warn!(squad = %id, "squad cached but missing from repository");
            return Ok(None);
        };
        self.squads.insert(stored.clone());
        Ok(Some(stored))
    }

    fn emit(&self, payload: EventPayload) {
        self.hub.publish(EngineEvent::new(payload));
    }
}

fn member_snapshot<'t>(squad: &Squad, tasks: &'t TaskManager) -> Vec<&'t Task> {
    squad.tasks.iter().filter_map(|id| tasks.get(id)).collect()
}
