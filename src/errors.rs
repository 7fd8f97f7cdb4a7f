// src/errors.rs

//! Crate-wide error aliases and helpers.
//!
//! Not-found lookups and refused transitions are *not* errors in squadron:
//! the engine reports them as `Ok(None)`. Everything here is a genuine
//! failure the caller has to handle (bad config, broken graph, storage).

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SquadronError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Cyclic dependency detected: {0}")]
    CyclicDependency(String),

    #[error("Task '{task}' depends on unknown task '{dependency}'")]
    UnknownDependency { task: String, dependency: String },

    #[error("Squad template not found: {0}")]
    TemplateNotFound(String),

    #[error("Invalid squad template: {0}")]
    InvalidTemplate(String),

    #[error("Repository error: {0}")]
    Repository(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl SquadronError {
    pub fn repository(message: impl Into<String>) -> Self {
        SquadronError::Repository(message.into())
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, SquadronError>;
