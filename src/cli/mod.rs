//! Command-line interface

pub mod commands;
pub mod output;

use crate::build::{ProjectLayout, SessionOptions};
use clap::{Parser, Subcommand};
use commands::{ConfigCommand, RunCommand, TasksCommand};
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Build and deploy orchestrator for browser plugins
#[derive(Debug, Parser, Clone)]
#[command(name = "pstasks")]
#[command(version)]
#[command(about = "Builds, packages and deploys browser plugins", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Deployment environment; defaults to default_deploy_target from config.json
    #[arg(long, global = true)]
    pub env: Option<String>,

    /// Directory containing config.json; takes precedence over every other source
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Plugin project directory
    #[arg(long, global = true, default_value = ".")]
    pub project_dir: PathBuf,

    /// Build output directory, relative to the project directory
    #[arg(long, global = true, default_value = "dist")]
    pub output: PathBuf,
}

/// Available commands
#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run a task and everything it depends on
    Run(RunCommand),

    /// List the available tasks
    Tasks(TasksCommand),

    /// Show the resolved configuration and active environment
    Config(ConfigCommand),
}

impl Cli {
    /// Parse CLI arguments from environment
    pub fn from_args() -> Self {
        Self::parse()
    }

    /// Parse CLI arguments from a slice
    pub fn try_parse_from<I, T>(itr: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        <Self as Parser>::try_parse_from(itr)
    }

    /// Project directory resolved against `cwd`
    pub fn project_root(&self, cwd: &Path) -> PathBuf {
        cwd.join(&self.project_dir)
    }

    /// Session inputs, with relative paths resolved against `cwd`
    pub fn session_options(&self, cwd: &Path) -> SessionOptions {
        SessionOptions {
            env: self.env.clone(),
            config_dir: self.config.as_ref().map(|dir| cwd.join(dir)),
            layout: ProjectLayout::new(self.project_root(cwd), &self.output),
        }
    }
}
