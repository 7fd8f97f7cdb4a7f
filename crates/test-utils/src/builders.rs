#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::Arc;

use squadron::config::{ConfigFile, RawConfigFile};
use squadron::engine::{EngineOptions, Orchestrator, TaskManager};
use squadron::events::EventHub;
use squadron::model::Task;
use squadron::repository::{Repository, SnapshotRepository};
use squadron::template::{LevelTemplate, SquadTemplate, TaskBlueprint, TemplateVars};
use squadron::types::{AgentRole, DanglingPolicy, SquadType, TaskStatus};

/// Builder for `SquadTemplate` to simplify test setup.
pub struct TemplateBuilder {
    template: SquadTemplate,
}

impl TemplateBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            template: SquadTemplate {
                name: name.to_string(),
                description: String::new(),
                squad_type: SquadType::default(),
                levels: Vec::new(),
            },
        }
    }

    pub fn description(mut self, description: &str) -> Self {
        self.template.description = description.to_string();
        self
    }

    pub fn squad_type(mut self, squad_type: SquadType) -> Self {
        self.template.squad_type = squad_type;
        self
    }

    /// Append a level whose tasks may run side by side.
    pub fn parallel(mut self, tasks: Vec<TaskBlueprint>) -> Self {
        self.template.levels.push(LevelTemplate {
            name: None,
            parallel: true,
            tasks,
        });
        self
    }

    /// Append a level whose tasks are chained in order.
    pub fn sequential(mut self, tasks: Vec<TaskBlueprint>) -> Self {
        self.template.levels.push(LevelTemplate {
            name: None,
            parallel: false,
            tasks,
        });
        self
    }

    pub fn build(self) -> SquadTemplate {
        self.template
    }
}

/// Blueprint with only a role and a subject.
pub fn blueprint(role: AgentRole, subject: &str) -> TaskBlueprint {
    TaskBlueprint {
        role,
        subject: subject.to_string(),
        description: String::new(),
        active_form: None,
        protocol: None,
    }
}

/// Placeholder map from `(key, value)` pairs.
pub fn vars(pairs: &[(&str, &str)]) -> TemplateVars {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// Builder for bare `Task` records, for the pure graph functions.
pub struct TaskBuilder {
    task: Task,
}

impl TaskBuilder {
    pub fn new(id: &str) -> Self {
        let now = chrono::Utc::now();
        Self {
            task: Task {
                id: id.to_string(),
                subject: format!("task {id}"),
                description: String::new(),
                active_form: format!("working on {id}"),
                role: AgentRole::Backend,
                protocol: None,
                blocked_by: Vec::new(),
                blocks: Vec::new(),
                level: 0,
                status: TaskStatus::Pending,
                progress: 0,
                output: None,
                error: None,
                created_at: now,
                updated_at: now,
                started_at: None,
                completed_at: None,
            },
        }
    }

    pub fn after(mut self, dep: &str) -> Self {
        self.task.blocked_by.push(dep.to_string());
        self
    }

    pub fn status(mut self, status: TaskStatus) -> Self {
        self.task.status = status;
        self
    }

    pub fn level(mut self, level: u32) -> Self {
        self.task.level = level;
        self
    }

    pub fn build(self) -> Task {
        self.task
    }
}

/// Shorthand for `TaskBuilder::new(id).after(..)...build()`.
pub fn task(id: &str, deps: &[&str]) -> Task {
    deps.iter()
        .fold(TaskBuilder::new(id), |b, dep| b.after(dep))
        .build()
}

/// Builder for validated `ConfigFile`s.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile::default(),
        }
    }

    pub fn with_template(mut self, key: &str, template: SquadTemplate) -> Self {
        self.config.template.insert(key.to_string(), template);
        self
    }

    pub fn dangling(mut self, policy: DanglingPolicy) -> Self {
        self.config.engine.dangling_dependencies = policy;
        self
    }

    pub fn in_memory(mut self) -> Self {
        self.config.storage.mode = squadron::types::StorageMode::Memory;
        self
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Fresh in-memory repository behind the trait object the engine takes.
pub fn memory_repo() -> Arc<dyn Repository> {
    Arc::new(SnapshotRepository::in_memory())
}

/// Task manager over a fresh in-memory repository.
pub fn task_manager(hub: &EventHub) -> TaskManager {
    TaskManager::new(memory_repo(), hub.clone(), EngineOptions::default())
}

/// Task manager that keeps unknown dependency ids instead of rejecting them.
pub fn lenient_task_manager(hub: &EventHub) -> TaskManager {
    let options = EngineOptions {
        dangling: DanglingPolicy::Ignore,
        ..EngineOptions::default()
    };
    TaskManager::new(memory_repo(), hub.clone(), options)
}

/// Orchestrator over a fresh in-memory repository, with the given templates.
pub fn orchestrator(templates: BTreeMap<String, SquadTemplate>) -> Orchestrator {
    Orchestrator::new(memory_repo(), EventHub::new(), EngineOptions::default())
        .with_templates(templates)
}
