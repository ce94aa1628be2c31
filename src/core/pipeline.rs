//! Pipeline model: ordered stages evaluated against an environment at run time

use crate::collaborators::CollaboratorError;
use crate::core::config::EnvironmentSettings;
use crate::core::environment::EnvironmentContext;
use async_trait::async_trait;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Result of applying a stage
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageOutcome {
    /// The stage produced its effect
    Applied,
    /// The stage's condition did not hold; input passed through untouched
    Skipped { reason: String },
}

/// A single pipeline stage
///
/// The environment is passed in on every run; stages must not cache decisions
/// made against it.
#[async_trait]
pub trait Stage<I: Send + Sync>: Send + Sync {
    fn name(&self) -> &str;

    async fn apply(
        &self,
        env: &EnvironmentContext,
        input: &mut I,
    ) -> Result<StageOutcome, CollaboratorError>;
}

/// An ordered list of stages bound to an environment
pub struct Pipeline<I: Send + Sync> {
    env: EnvironmentContext,
    stages: Vec<Arc<dyn Stage<I>>>,
}

impl<I: Send + Sync> Clone for Pipeline<I> {
    fn clone(&self) -> Self {
        Self {
            env: self.env.clone(),
            stages: self.stages.clone(),
        }
    }
}

impl<I: Send + Sync> Pipeline<I> {
    pub fn new(env: EnvironmentContext) -> Self {
        Self {
            env,
            stages: Vec::new(),
        }
    }

    /// Append a stage
    pub fn pipe(mut self, stage: Arc<dyn Stage<I>>) -> Self {
        self.stages.push(stage);
        self
    }

    pub fn environment(&self) -> &EnvironmentContext {
        &self.env
    }

    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// Run every stage in order, stopping at the first failure
    pub async fn run(&self, input: &mut I) -> Result<Vec<StageOutcome>, CollaboratorError> {
        let mut outcomes = Vec::with_capacity(self.stages.len());
        for stage in &self.stages {
            outcomes.push(stage.apply(&self.env, input).await?);
        }
        Ok(outcomes)
    }
}

/// A source file held in memory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Path relative to the file set's base
    pub relative: PathBuf,
    pub contents: Vec<u8>,
}

impl SourceFile {
    pub fn new(relative: impl Into<PathBuf>, contents: impl Into<Vec<u8>>) -> Self {
        Self {
            relative: relative.into(),
            contents: contents.into(),
        }
    }
}

/// Files collected from one base directory
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileSet {
    pub base: PathBuf,
    pub files: Vec<SourceFile>,
}

impl FileSet {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self {
            base: base.into(),
            files: Vec::new(),
        }
    }

    pub fn with_file(mut self, file: SourceFile) -> Self {
        self.files.push(file);
        self
    }

    pub fn get(&self, relative: impl AsRef<Path>) -> Option<&SourceFile> {
        let relative = relative.as_ref();
        self.files.iter().find(|f| f.relative == relative)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// A directory tree handed to the deploy pipeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceTree {
    pub root: PathBuf,
}

impl SourceTree {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

/// Keys exposed to text preprocessing, paired with the settings field each reads
pub const SUBSTITUTION_KEYS: [&str; 4] = ["IMAGE_SERVER_URL", "SAMS_URL", "API_URL", "PS_URL"];

/// Values substituted into preprocessed text, keyed by directive name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct SubstitutionContext(pub BTreeMap<String, String>);

impl SubstitutionContext {
    /// Context holding exactly the URL fields present and non-empty in `settings`
    pub fn from_settings(settings: &EnvironmentSettings) -> Self {
        let fields = [
            &settings.image_server_url,
            &settings.sams_url,
            &settings.api_url,
            &settings.ps_url,
        ];
        let values = SUBSTITUTION_KEYS
            .iter()
            .zip(fields)
            .filter_map(|(key, value)| {
                value
                    .as_deref()
                    .filter(|v| !v.is_empty())
                    .map(|v| (key.to_string(), v.to_string()))
            })
            .collect();
        Self(values)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn keys(&self) -> Vec<&str> {
        self.0.keys().map(String::as_str).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
