// src/dag/mod.rs

//! Pure dependency-graph computations over a task snapshot.
//!
//! - [`levels`] computes each task's dependency depth and groups by level.
//! - [`readiness`] decides which tasks may start now.
//! - [`structure`] projects the snapshot into nodes/edges/levels for
//!   diagnostics and validates acyclicity.
//!
//! Nothing in here mutates tasks; the engine owns all state.

pub mod levels;
pub mod readiness;
pub mod structure;

pub use levels::{calculate_level, calculate_levels, group_by_level, LevelCalculator};
pub use readiness::{is_blocked, ready_tasks, Readiness};
pub use structure::{validate_acyclic, DagEdge, DagNode, DagStructure};
