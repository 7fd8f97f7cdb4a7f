// src/template.rs

//! Declarative squad templates.
//!
//! A template is an ordered list of levels. Each level is parallel or
//! sequential and holds task blueprints whose text may contain
//! `{placeholder}` tokens filled from caller-supplied variables.
//!
//! In TOML (see `config`):
//!
//! ```toml
//! [template.bugfix]
//! name = "Fix {issue}"
//! type = "bug"
//!
//! [[template.bugfix.level]]
//! parallel = false
//! [[template.bugfix.level.task]]
//! role = "backend"
//! subject = "Reproduce {issue}"
//! ```

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};

use crate::errors::{Result, SquadronError};
use crate::model::CreateTaskParams;
use crate::types::{AgentRole, SquadType};

/// Placeholder values, keyed by name without braces.
pub type TemplateVars = BTreeMap<String, String>;

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("placeholder pattern is valid")
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SquadTemplate {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "type", default)]
    pub squad_type: SquadType,
    #[serde(rename = "level", default)]
    pub levels: Vec<LevelTemplate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelTemplate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Sequential levels chain their tasks one after another.
    #[serde(default = "default_parallel")]
    pub parallel: bool,
    #[serde(rename = "task", default)]
    pub tasks: Vec<TaskBlueprint>,
}

fn default_parallel() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskBlueprint {
    pub role: AgentRole,
    pub subject: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_form: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,
}

impl SquadTemplate {
    /// Structural checks: at least one level, no empty level, no blank subject.
    pub fn validate(&self) -> Result<()> {
        if self.levels.is_empty() {
            return Err(SquadronError::InvalidTemplate(format!(
                "template '{}' has no levels",
                self.name
            )));
        }

        for (idx, level) in self.levels.iter().enumerate() {
            if level.tasks.is_empty() {
                return Err(SquadronError::InvalidTemplate(format!(
                    "template '{}' level {} has no tasks",
                    self.name,
                    level.label(idx)
                )));
            }
            if level.tasks.iter().any(|t| t.subject.trim().is_empty()) {
                return Err(SquadronError::InvalidTemplate(format!(
                    "template '{}' level {} has a task with an empty subject",
                    self.name,
                    level.label(idx)
                )));
            }
        }

        Ok(())
    }

    pub fn task_count(&self) -> usize {
        self.levels.iter().map(|l| l.tasks.len()).sum()
    }
}

impl LevelTemplate {
    /// The level's `name` when set, else its position in the template.
    pub fn label(&self, idx: usize) -> String {
        match self.name {
            Some(ref name) => format!("'{name}'"),
            None => idx.to_string(),
        }
    }
}

impl TaskBlueprint {
    /// Creation parameters with placeholders filled; dependencies are left
    /// to the plan builder.
    pub fn render(&self, vars: &TemplateVars) -> CreateTaskParams {
        let mut params = CreateTaskParams::new(substitute(&self.subject, vars), self.role)
            .description(substitute(&self.description, vars));
        if let Some(ref active_form) = self.active_form {
            params = params.active_form(substitute(active_form, vars));
        }
        if let Some(ref protocol) = self.protocol {
            params = params.protocol(protocol.clone());
        }
        params
    }
}

/// Replace every `{name}` whose name is in `vars`; unknown tokens stay.
pub fn substitute(text: &str, vars: &TemplateVars) -> String {
    PLACEHOLDER
        .replace_all(text, |caps: &Captures| match vars.get(&caps[1]) {
            Some(value) => value.clone(),
            None => caps[0].to_string(),
        })
        .into_owned()
}

/// Parse `key=value` pairs (CLI `--var` flags).
pub fn parse_vars<I, S>(pairs: I) -> Result<TemplateVars>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut vars = TemplateVars::new();
    for pair in pairs {
        let pair = pair.as_ref();
        let (key, value) = pair.split_once('=').ok_or_else(|| {
            SquadronError::InvalidTemplate(format!("template variable '{pair}' is not key=value"))
        })?;
        vars.insert(key.trim().to_string(), value.to_string());
    }
    Ok(vars)
}
