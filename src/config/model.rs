// src/config/model.rs

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Deserialize;

use crate::engine::DEFAULT_RECENT_LOG_LIMIT;
use crate::template::SquadTemplate;
use crate::types::{DanglingPolicy, StorageMode};

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [engine]
/// dangling_dependencies = "reject"
/// recent_log_limit = 50
///
/// [events]
/// keepalive_secs = 30
///
/// [storage]
/// mode = "file"
/// path = ".squadron/state.json"
///
/// [template.bugfix]
/// name = "Fix {issue}"
/// ```
///
/// All sections are optional and have reasonable defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawConfigFile {
    #[serde(default)]
    pub engine: EngineConfig,

    #[serde(default)]
    pub events: EventsConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    /// Squad templates from `[template.<name>]`, keyed by template name.
    #[serde(default)]
    pub template: BTreeMap<String, SquadTemplate>,
}

/// Validated configuration. Built only through `TryFrom<RawConfigFile>`.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub engine: EngineConfig,
    pub events: EventsConfig,
    pub storage: StorageConfig,
    pub template: BTreeMap<String, SquadTemplate>,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(
        engine: EngineConfig,
        events: EventsConfig,
        storage: StorageConfig,
        template: BTreeMap<String, SquadTemplate>,
    ) -> Self {
        Self {
            engine,
            events,
            storage,
            template,
        }
    }
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self::new_unchecked(
            EngineConfig::default(),
            EventsConfig::default(),
            StorageConfig::default(),
            BTreeMap::new(),
        )
    }
}

/// `[engine]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// `"reject"` (default) or `"ignore"`.
    ///
    /// - `"reject"`: creating a task whose `blocked_by` names an unknown id
    ///   fails.
    /// - `"ignore"`: the unknown id is kept and the task stays blocked on it.
    #[serde(default)]
    pub dangling_dependencies: DanglingPolicy,

    /// Page size of recent-log queries without an explicit limit.
    #[serde(default = "default_recent_log_limit")]
    pub recent_log_limit: usize,
}

fn default_recent_log_limit() -> usize {
    DEFAULT_RECENT_LOG_LIMIT
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            dangling_dependencies: DanglingPolicy::default(),
            recent_log_limit: default_recent_log_limit(),
        }
    }
}

/// `[events]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct EventsConfig {
    /// Idle interval before a push stream sends a keep-alive frame.
    #[serde(default = "default_keepalive_secs")]
    pub keepalive_secs: u64,
}

fn default_keepalive_secs() -> u64 {
    30
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            keepalive_secs: default_keepalive_secs(),
        }
    }
}

/// `[storage]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub mode: StorageMode,

    /// Snapshot file used in `file` mode.
    #[serde(default = "default_storage_path")]
    pub path: PathBuf,
}

fn default_storage_path() -> PathBuf {
    PathBuf::from(".squadron/state.json")
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            mode: StorageMode::default(),
            path: default_storage_path(),
        }
    }
}
