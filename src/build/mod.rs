//! The plugin build: project layout, pipelines and the canonical task graph

pub mod builder;
pub mod layout;
pub mod session;
pub mod tasks;

pub use builder::PipelineBuilder;
pub use layout::ProjectLayout;
pub use session::{BuildSession, SessionOptions};
pub use tasks::{canonical_graph, BuildContext, Composition, TaskDeclaration, CANONICAL_TASKS, DEFAULT_TASK};
