// src/engine/plan.rs

//! Expands a [`SquadTemplate`] into a concrete task graph.
//!
//! Wiring rule:
//! - every task of level `k` depends on all tasks created for level `k-1`;
//! - in a sequential level, each task also depends on the task created
//!   just before it in the same level, forming a chain.
//!
//! Once everything exists, each task's level is recomputed against the
//! final graph.

use chrono::Utc;
use tracing::{debug, info};

use crate::engine::tasks::TaskManager;
use crate::errors::Result;
use crate::model::{new_id, Squad, TaskId};
use crate::template::{substitute, SquadTemplate, TemplateVars};
use crate::types::SquadStatus;

/// Builds the tasks of one squad plan through a [`TaskManager`].
#[derive(Debug)]
pub struct SquadPlanBuilder<'a> {
    tasks: &'a mut TaskManager,
}

impl<'a> SquadPlanBuilder<'a> {
    pub fn new(tasks: &'a mut TaskManager) -> Self {
        Self { tasks }
    }

    /// Create all tasks for `template` and return the (not yet registered)
    /// squad referencing them, in status `Idle`.
    pub fn build(self, template: &SquadTemplate, vars: &TemplateVars) -> Result<Squad> {
        template.validate()?;

        let mut levels: Vec<Vec<TaskId>> = Vec::with_capacity(template.levels.len());
        let mut previous_level_ids: Vec<TaskId> = Vec::new();

        for (idx, level) in template.levels.iter().enumerate() {
            let mut level_ids: Vec<TaskId> = Vec::with_capacity(level.tasks.len());

            for blueprint in level.tasks.iter() {
                let mut deps = previous_level_ids.clone();
                if !level.parallel {
                    if let Some(prev) = level_ids.last() {
                        deps.push(prev.clone());
                    }
                }

                let task = self.tasks.create(blueprint.render(vars).blocked_by(deps))?;
                level_ids.push(task.id);
            }

            debug!(
                level = %level.label(idx),
                parallel = level.parallel,
                tasks = level_ids.len(),
                "template level expanded"
            );
            previous_level_ids = level_ids.clone();
            levels.push(level_ids);
        }

        for id in levels.iter().flatten() {
            self.tasks.refresh_level(id)?;
        }

        let now = Utc::now();
        let squad = Squad {
            id: new_id(),
            name: substitute(&template.name, vars),
            description: substitute(&template.description, vars),
            squad_type: template.squad_type,
            tasks: levels.into_iter().flatten().collect(),
            status: SquadStatus::Idle,
            current_level: 0,
            total_levels: template.levels.len() as u32,
            progress: 0,
            created_at: now,
            updated_at: now,
        };

        info!(
            squad = %squad.id,
            name = %squad.name,
            tasks = squad.tasks.len(),
            levels = squad.total_levels,
            "squad plan built"
        );

        Ok(squad)
    }
}
