//! CLI command definitions

use crate::build::DEFAULT_TASK;
use clap::Args;

/// Run a task
#[derive(Debug, Args, Clone)]
pub struct RunCommand {
    /// Task to run
    #[arg(default_value = DEFAULT_TASK)]
    pub task: String,

    /// Print the planned task order without running anything
    #[arg(long)]
    pub dry_run: bool,
}

/// List the canonical tasks
#[derive(Debug, Args, Clone)]
pub struct TasksCommand {
    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Show the resolved configuration
#[derive(Debug, Args, Clone)]
pub struct ConfigCommand {
    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}
