// src/engine/mod.rs

//! Orchestration engine for squadron.
//!
//! This module ties together:
//! - the task lifecycle manager ([`tasks`])
//! - template expansion into task graphs ([`plan`])
//! - squad bookkeeping and reconciliation ([`squads`])
//! - the façade wiring all of them to one repository and event hub
//!   ([`orchestrator`])

use crate::config::EngineConfig;
use crate::types::DanglingPolicy;

/// Page size of `recent_logs` when the caller gives none.
pub const DEFAULT_RECENT_LOG_LIMIT: usize = 50;

/// Behavioural knobs shared by the managers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineOptions {
    /// What `create` does with dependency ids that match no task.
    pub dangling: DanglingPolicy,
    pub recent_log_limit: usize,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            dangling: DanglingPolicy::default(),
            recent_log_limit: DEFAULT_RECENT_LOG_LIMIT,
        }
    }
}

impl From<&EngineConfig> for EngineOptions {
    fn from(cfg: &EngineConfig) -> Self {
        Self {
            dangling: cfg.dangling_dependencies,
            recent_log_limit: cfg.recent_log_limit,
        }
    }
}

pub mod orchestrator;
pub mod plan;
pub mod squads;
pub mod tasks;

pub use orchestrator::Orchestrator;
pub use plan::SquadPlanBuilder;
pub use squads::{reconcile_state, SquadManager, SquadState};
pub use tasks::TaskManager;
