//! Core domain models
//!
//! Configuration, environment selection, the task graph and run state, and
//! the environment-gated pipeline model.

pub mod config;
pub mod environment;
pub mod error;
pub mod graph;
pub mod pipeline;
pub mod state;
pub mod task;

pub use config::{Config, ConfigResolver, DeployCredentials, EnvironmentSettings, ResolvedConfig};
pub use environment::{EnvironmentContext, EnvironmentResolver};
pub use error::PackError;
pub use graph::TaskGraph;
pub use pipeline::{FileSet, Pipeline, SourceTree, Stage, StageOutcome, SubstitutionContext};
pub use state::{RunState, RunStatus, TaskState};
pub use task::{Task, TaskAction, TaskKind};
