// src/model/squad.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{Keyed, SquadId, TaskId};
use crate::types::{SquadStatus, SquadType};

/// A named execution plan grouping an ordered list of tasks.
///
/// A squad is never told to complete: `status`, `progress` and
/// `current_level` are derived from its member tasks by the reconciler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Squad {
    pub id: SquadId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "type")]
    pub squad_type: SquadType,
    /// Member task ids, in creation order.
    pub tasks: Vec<TaskId>,
    pub status: SquadStatus,
    #[serde(default)]
    pub current_level: u32,
    #[serde(default)]
    pub total_levels: u32,
    /// Percentage of member tasks completed, 0..=100.
    #[serde(default)]
    pub progress: u8,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Keyed for Squad {
    fn key(&self) -> &str {
        &self.id
    }
}

/// Field-level partial update of a [`Squad`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SquadPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<SquadStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_level: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_levels: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl SquadPatch {
    pub fn apply_to(&self, squad: &mut Squad) {
        if let Some(ref name) = self.name {
            squad.name = name.clone();
        }
        if let Some(ref description) = self.description {
            squad.description = description.clone();
        }
        if let Some(status) = self.status {
            squad.status = status;
        }
        if let Some(current_level) = self.current_level {
            squad.current_level = current_level;
        }
        if let Some(total_levels) = self.total_levels {
            squad.total_levels = total_levels;
        }
        if let Some(progress) = self.progress {
            squad.progress = progress.min(100);
        }
        if let Some(updated_at) = self.updated_at {
            squad.updated_at = updated_at;
        }
    }
}
