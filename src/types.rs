// src/types.rs

//! Closed enumerations shared by the model, the engine and the config layer.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Lifecycle status of a single task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// No unfinished dependencies; waiting to be started.
    Pending,
    /// Marked ready by an external actor. The engine itself never assigns it.
    Ready,
    Running,
    /// Waiting on at least one dependency that is not completed.
    Blocked,
    Completed,
    Failed,
}

impl TaskStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Ready => "ready",
            TaskStatus::Running => "running",
            TaskStatus::Blocked => "blocked",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Ok(TaskStatus::Pending),
            "ready" => Ok(TaskStatus::Ready),
            "running" => Ok(TaskStatus::Running),
            "blocked" => Ok(TaskStatus::Blocked),
            "completed" => Ok(TaskStatus::Completed),
            "failed" => Ok(TaskStatus::Failed),
            other => Err(format!("invalid task status: {other}")),
        }
    }
}

/// Aggregate status of a squad.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SquadStatus {
    Idle,
    Running,
    Paused,
    Completed,
    Failed,
}

impl SquadStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            SquadStatus::Idle => "idle",
            SquadStatus::Running => "running",
            SquadStatus::Paused => "paused",
            SquadStatus::Completed => "completed",
            SquadStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for SquadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of work a squad plan delivers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SquadType {
    Feature,
    Bug,
    Performance,
    Security,
    Design,
}

impl Default for SquadType {
    fn default() -> Self {
        SquadType::Feature
    }
}

impl fmt::Display for SquadType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SquadType::Feature => "feature",
            SquadType::Bug => "bug",
            SquadType::Performance => "performance",
            SquadType::Security => "security",
            SquadType::Design => "design",
        };
        f.write_str(s)
    }
}

impl FromStr for SquadType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "feature" => Ok(SquadType::Feature),
            "bug" => Ok(SquadType::Bug),
            "performance" => Ok(SquadType::Performance),
            "security" => Ok(SquadType::Security),
            "design" => Ok(SquadType::Design),
            other => Err(format!(
                "invalid squad type: {other} (expected feature, bug, performance, security or design)"
            )),
        }
    }
}

/// Actor role a task is assigned to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentRole {
    Architect,
    Frontend,
    Backend,
    Database,
    Designer,
    Tester,
    Reviewer,
    Security,
    Devops,
}

impl AgentRole {
    pub fn as_str(self) -> &'static str {
        match self {
            AgentRole::Architect => "architect",
            AgentRole::Frontend => "frontend",
            AgentRole::Backend => "backend",
            AgentRole::Database => "database",
            AgentRole::Designer => "designer",
            AgentRole::Tester => "tester",
            AgentRole::Reviewer => "reviewer",
            AgentRole::Security => "security",
            AgentRole::Devops => "devops",
        }
    }
}

impl fmt::Display for AgentRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AgentRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "architect" => Ok(AgentRole::Architect),
            "frontend" => Ok(AgentRole::Frontend),
            "backend" => Ok(AgentRole::Backend),
            "database" => Ok(AgentRole::Database),
            "designer" => Ok(AgentRole::Designer),
            "tester" => Ok(AgentRole::Tester),
            "reviewer" => Ok(AgentRole::Reviewer),
            "security" => Ok(AgentRole::Security),
            "devops" => Ok(AgentRole::Devops),
            other => Err(format!("invalid agent role: {other}")),
        }
    }
}

/// Severity of a task log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    Info,
    Success,
    Warning,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LogLevel::Info => "info",
            LogLevel::Success => "success",
            LogLevel::Warning => "warning",
            LogLevel::Error => "error",
        };
        f.write_str(s)
    }
}

/// What `create` does with a `blocked_by` id that names no known task.
///
/// - `Reject`: fail the creation with `UnknownDependency` (default).
/// - `Ignore`: keep the id in `blocked_by` but skip inverse-edge upkeep.
///   Useful when a graph is assembled in stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DanglingPolicy {
    Reject,
    Ignore,
}

impl Default for DanglingPolicy {
    fn default() -> Self {
        DanglingPolicy::Reject
    }
}

/// Backing store used by the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageMode {
    /// JSON snapshot file on disk.
    File,
    /// In-memory only (lost on exit).
    Memory,
}

impl Default for StorageMode {
    fn default() -> Self {
        StorageMode::File
    }
}
