// src/events/mod.rs

//! Lifecycle events and their distribution.
//!
//! - [`EngineEvent`] is what observers receive: a timestamp plus the full
//!   updated record, tagged by kind.
//! - [`hub`] fans events out to any number of observers, each through its
//!   own bounded channel.
//! - [`stream`] turns a subscription into text frames for a remote
//!   listener, with keep-alive frames while idle.

pub mod hub;
pub mod stream;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{Squad, Task, TaskLog};

pub use hub::{EventHub, SubscriberId, Subscription};
pub use stream::{format_event_frame, spawn_push_stream, PushStream, KEEPALIVE_FRAME};

/// Kind-tagged event body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum EventPayload {
    TaskCreated(Task),
    TaskUpdated(Task),
    TaskStarted(Task),
    TaskCompleted(Task),
    TaskFailed(Task),
    TaskLogAppended(TaskLog),
    SquadCreated(Squad),
    SquadStarted(Squad),
    SquadUpdated(Squad),
    SquadCompleted(Squad),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineEvent {
    pub timestamp: DateTime<Utc>,
    pub event: EventPayload,
}

impl EngineEvent {
    pub fn new(event: EventPayload) -> Self {
        Self {
            timestamp: Utc::now(),
            event,
        }
    }

    /// Stable snake_case name of the event kind (also the frame's `event:`).
    pub fn kind(&self) -> &'static str {
        match self.event {
            EventPayload::TaskCreated(_) => "task_created",
            EventPayload::TaskUpdated(_) => "task_updated",
            EventPayload::TaskStarted(_) => "task_started",
            EventPayload::TaskCompleted(_) => "task_completed",
            EventPayload::TaskFailed(_) => "task_failed",
            EventPayload::TaskLogAppended(_) => "task_log_appended",
            EventPayload::SquadCreated(_) => "squad_created",
            EventPayload::SquadStarted(_) => "squad_started",
            EventPayload::SquadUpdated(_) => "squad_updated",
            EventPayload::SquadCompleted(_) => "squad_completed",
        }
    }

    /// The task this event is about, if any.
    pub fn task(&self) -> Option<&Task> {
        match &self.event {
            EventPayload::TaskCreated(t)
            | EventPayload::TaskUpdated(t)
            | EventPayload::TaskStarted(t)
            | EventPayload::TaskCompleted(t)
            | EventPayload::TaskFailed(t) => Some(t),
            _ => None,
        }
    }

    /// The squad this event is about, if any.
    pub fn squad(&self) -> Option<&Squad> {
        match &self.event {
            EventPayload::SquadCreated(s)
            | EventPayload::SquadStarted(s)
            | EventPayload::SquadUpdated(s)
            | EventPayload::SquadCompleted(s) => Some(s),
            _ => None,
        }
    }
}
