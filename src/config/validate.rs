// src/config/validate.rs

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{Result, SquadronError};
use crate::types::StorageMode;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = crate::errors::SquadronError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(
            raw.engine,
            raw.events,
            raw.storage,
            raw.template,
        ))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    validate_events(cfg)?;
    validate_storage(cfg)?;
    validate_templates(cfg)?;
    Ok(())
}

fn validate_events(cfg: &RawConfigFile) -> Result<()> {
    if cfg.events.keepalive_secs == 0 {
        return Err(SquadronError::ConfigError(
            "[events].keepalive_secs must be >= 1 (got 0)".to_string(),
        ));
    }

    Ok(())
}

fn validate_storage(cfg: &RawConfigFile) -> Result<()> {
    if cfg.storage.mode == StorageMode::File && cfg.storage.path.as_os_str().is_empty() {
        return Err(SquadronError::ConfigError(
            "[storage].path must not be empty when mode = \"file\"".to_string(),
        ));
    }
    Ok(())
}

fn validate_templates(cfg: &RawConfigFile) -> Result<()> {
    for (key, template) in cfg.template.iter() {
        template.validate().map_err(|e| {
            SquadronError::ConfigError(format!("[template.{key}] is invalid: {e}"))
        })?;
    }
    Ok(())
}
