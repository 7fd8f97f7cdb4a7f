// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::types::AgentRole;

/// Command-line arguments for `squadron`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "squadron",
    version,
    about = "Track dependency-ordered tasks and the squads that group them.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// Default: `Squadron.toml` in the current working directory. A missing
    /// file means built-in defaults.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `SQUADRON_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL", global = true)]
    pub log_level: Option<LogLevel>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Expand a template without storing anything and print the task graph.
    Plan(TemplateArgs),

    #[command(subcommand)]
    Squad(SquadCommand),

    #[command(subcommand)]
    Task(TaskCommand),

    /// Print the full task graph as JSON.
    Dag,
}

#[derive(Debug, Clone, Args)]
pub struct TemplateArgs {
    /// Name of a `[template.<name>]` section.
    pub template: String,

    /// Placeholder value, `key=value`. Repeatable.
    #[arg(long = "var", value_name = "KEY=VALUE")]
    pub vars: Vec<String>,
}

#[derive(Debug, Clone, Subcommand)]
pub enum SquadCommand {
    /// Create a squad from a template.
    Create {
        #[command(flatten)]
        template: TemplateArgs,

        /// Start the squad right away.
        #[arg(long)]
        start: bool,
    },
    Start {
        id: String,
    },
    Pause {
        id: String,
    },
    Show {
        id: String,
    },
    List,
}

#[derive(Debug, Clone, Subcommand)]
pub enum TaskCommand {
    Create {
        subject: String,

        #[arg(long)]
        role: AgentRole,

        #[arg(long, default_value = "")]
        description: String,

        #[arg(long)]
        active_form: Option<String>,

        #[arg(long)]
        protocol: Option<String>,

        /// Dependency task id. Repeatable.
        #[arg(long = "blocked-by", value_name = "ID")]
        blocked_by: Vec<String>,
    },
    Start {
        id: String,
    },
    Complete {
        id: String,

        #[arg(long)]
        output: Option<String>,
    },
    Fail {
        id: String,

        #[arg(long)]
        error: String,
    },
    Progress {
        id: String,

        #[arg(value_parser = clap::value_parser!(u8).range(0..=100))]
        percent: u8,
    },
    Delete {
        id: String,
    },
    List,
    /// Pending tasks whose dependencies are all completed.
    Ready,
    /// Logs of one task, or the most recent logs across all tasks.
    Logs {
        id: Option<String>,

        #[arg(long)]
        limit: Option<usize>,
    },
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
