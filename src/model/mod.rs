// src/model/mod.rs

//! Records the engine tracks and the repository persists.
//!
//! - [`task`] holds [`Task`], its creation parameters and partial updates.
//! - [`squad`] holds [`Squad`] and its partial updates.
//! - [`log`] holds the append-only [`TaskLog`] entry.

pub mod log;
pub mod squad;
pub mod task;

pub use log::TaskLog;
pub use squad::{Squad, SquadPatch};
pub use task::{CreateTaskParams, Task, TaskPatch};

/// Opaque task identifier (UUID text).
pub type TaskId = String;
/// Opaque squad identifier (UUID text).
pub type SquadId = String;
/// Opaque log entry identifier (UUID text).
pub type LogId = String;

/// A record addressable by a string key.
pub trait Keyed {
    fn key(&self) -> &str;
}

/// Generate a fresh opaque id.
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
