//! pstasks - build, package and deploy browser plugins

pub mod build;
pub mod cli;
pub mod collaborators;
pub mod core;
pub mod execution;

// Re-export commonly used types
pub use build::{BuildSession, PipelineBuilder, ProjectLayout, SessionOptions};
pub use collaborators::{CollaboratorError, Collaborators};
pub use core::{ConfigResolver, EnvironmentResolver, PackError, TaskGraph};
pub use execution::{ExecutionEngine, ExecutionEvent, RunReport};
