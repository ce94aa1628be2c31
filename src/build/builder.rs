//! Environment-gated pipeline construction

use crate::collaborators::{CollaboratorError, SecureTransfer, SourceTransformer};
use crate::core::environment::EnvironmentContext;
use crate::core::pipeline::{FileSet, Pipeline, SourceTree, Stage, StageOutcome, SubstitutionContext};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, warn};

/// Builds the deploy and preprocess pipelines
///
/// Both builders are pure functions of the [`EnvironmentContext`] they are
/// given. Whether a stage acts is decided each time the pipeline runs.
#[derive(Clone)]
pub struct PipelineBuilder {
    transfer: Arc<dyn SecureTransfer>,
    transformer: Arc<dyn SourceTransformer>,
}

impl PipelineBuilder {
    pub fn new(transfer: Arc<dyn SecureTransfer>, transformer: Arc<dyn SourceTransformer>) -> Self {
        Self {
            transfer,
            transformer,
        }
    }

    /// Upload a source tree with the environment's credentials
    pub fn build_deploy_pipeline(&self, env: EnvironmentContext) -> Pipeline<SourceTree> {
        Pipeline::new(env).pipe(Arc::new(DeployStage {
            transfer: self.transfer.clone(),
        }))
    }

    /// Substitute the environment's URLs into text files
    pub fn build_preprocess_pipeline(&self, env: EnvironmentContext) -> Pipeline<FileSet> {
        Pipeline::new(env).pipe(Arc::new(PreprocessStage {
            transformer: self.transformer.clone(),
        }))
    }

    /// The substitution context preprocessing uses, `None` for an unresolved environment
    pub fn substitution_context(env: &EnvironmentContext) -> Option<SubstitutionContext> {
        env.settings.as_ref().map(SubstitutionContext::from_settings)
    }
}

fn unresolved(env: &EnvironmentContext, stage: &str) -> StageOutcome {
    warn!(
        "Environment '{}' is not configured, skipping {} stage",
        env.name, stage
    );
    StageOutcome::Skipped {
        reason: format!("environment '{}' is not configured", env.name),
    }
}

struct DeployStage {
    transfer: Arc<dyn SecureTransfer>,
}

#[async_trait]
impl Stage<SourceTree> for DeployStage {
    fn name(&self) -> &str {
        "deploy"
    }

    async fn apply(
        &self,
        env: &EnvironmentContext,
        input: &mut SourceTree,
    ) -> Result<StageOutcome, CollaboratorError> {
        let Some(settings) = &env.settings else {
            return Ok(unresolved(env, self.name()));
        };
        let credentials = settings
            .deploy_credentials
            .as_ref()
            .ok_or_else(|| CollaboratorError::MissingCredentials(env.name.clone()))?;

        info!("Deploying {} to '{}'", input.root.display(), env.name);
        self.transfer.upload(credentials, &input.root).await?;
        Ok(StageOutcome::Applied)
    }
}

struct PreprocessStage {
    transformer: Arc<dyn SourceTransformer>,
}

#[async_trait]
impl Stage<FileSet> for PreprocessStage {
    fn name(&self) -> &str {
        "preprocess"
    }

    async fn apply(
        &self,
        env: &EnvironmentContext,
        input: &mut FileSet,
    ) -> Result<StageOutcome, CollaboratorError> {
        let Some(context) = PipelineBuilder::substitution_context(env) else {
            return Ok(unresolved(env, self.name()));
        };
        self.transformer.preprocess(input, &context).await?;
        Ok(StageOutcome::Applied)
    }
}
