//! A resolved build: config, environment and the bound task graph

use crate::build::builder::PipelineBuilder;
use crate::build::layout::ProjectLayout;
use crate::build::tasks::{canonical_graph, BuildContext};
use crate::collaborators::Collaborators;
use crate::core::config::{ConfigResolver, ResolvedConfig};
use crate::core::environment::{EnvironmentContext, EnvironmentResolver};
use crate::core::error::PackError;
use crate::core::graph::TaskGraph;
use crate::core::pipeline::SubstitutionContext;
use crate::execution::{ExecutionEngine, ExecutionScheduler, RunReport};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

/// Inputs a session is prepared from
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// `--env`
    pub env: Option<String>,

    /// `--config`
    pub config_dir: Option<PathBuf>,

    pub layout: ProjectLayout,
}

/// Everything needed to run canonical tasks against one environment
pub struct BuildSession {
    config: ResolvedConfig,
    env: EnvironmentContext,
    layout: ProjectLayout,
    graph: Arc<TaskGraph>,
}

impl BuildSession {
    /// Resolve config and environment, then bind the task graph
    ///
    /// Nothing is written to disk here, so resolution errors such as
    /// [`PackError::MissingDeployTarget`] leave the project untouched.
    pub fn prepare(
        resolver: &ConfigResolver,
        options: SessionOptions,
        collaborators: Collaborators,
    ) -> Result<Self, PackError> {
        let config = resolver.resolve(options.config_dir.as_deref())?;
        let env = EnvironmentResolver::context(options.env.as_deref(), &config.config)?;
        if env.is_resolved() {
            info!("Active environment: {}", env.name);
        } else {
            warn!(
                "Environment '{}' is not in {}; deploy and preprocess stages will be skipped",
                env.name, config.source
            );
        }

        let context = BuildContext::new(options.layout.clone(), env.clone(), collaborators);
        let graph = canonical_graph(Arc::new(context))?;

        Ok(Self {
            config,
            env,
            layout: options.layout,
            graph: Arc::new(graph),
        })
    }

    pub fn config(&self) -> &ResolvedConfig {
        &self.config
    }

    pub fn environment(&self) -> &EnvironmentContext {
        &self.env
    }

    pub fn layout(&self) -> &ProjectLayout {
        &self.layout
    }

    pub fn graph(&self) -> &TaskGraph {
        &self.graph
    }

    /// What preprocessing substitutes, `None` when the environment is unresolved
    pub fn substitution_context(&self) -> Option<SubstitutionContext> {
        PipelineBuilder::substitution_context(&self.env)
    }

    /// Tasks `target` would run, in order, without running them
    pub fn plan(&self, target: &str) -> Result<Vec<String>, PackError> {
        ExecutionScheduler::new(&self.graph).plan(target)
    }

    /// A fresh engine over this session's graph
    pub fn engine(&self) -> ExecutionEngine {
        ExecutionEngine::new(self.graph.clone())
    }

    /// Run `target` with no event handlers
    pub async fn run(&self, target: &str) -> RunReport {
        self.engine().execute(target).await
    }
}
