//! External collaborators: file system, archiver, secure transfer and source transformation
//!
//! The orchestration core only decides whether and with what parameters these
//! are invoked. Default implementations shell out to system tools or use the
//! local file system; tests substitute recording mocks.

pub mod local_fs;
pub mod process;
pub mod transformer;

use crate::core::config::DeployCredentials;
use crate::core::pipeline::{FileSet, SubstitutionContext};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

pub use local_fs::{FileFilter, LocalFileSystem};
pub use process::{CommandRunner, CommandSpec, ScpTransfer, ZipArchiver};
pub use transformer::ToolchainTransformer;

/// Error types for collaborator calls
#[derive(Debug, Clone, Error)]
pub enum CollaboratorError {
    #[error("I/O error at {}: {message}", path.display())]
    Io { path: PathBuf, message: String },

    #[error("Failed to launch {program}: {message}")]
    Spawn { program: String, message: String },

    #[error("{program} exited with code {code}: {stderr}")]
    Process {
        program: String,
        code: i32,
        stderr: String,
    },

    #[error("Environment '{0}' has no deploy_credentials")]
    MissingCredentials(String),

    #[error("Invalid deploy credentials: {0}")]
    InvalidCredentials(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CollaboratorError {
    pub fn io(path: impl Into<PathBuf>, err: impl std::fmt::Display) -> Self {
        CollaboratorError::Io {
            path: path.into(),
            message: err.to_string(),
        }
    }
}

/// File-system globbing and copying
#[async_trait]
pub trait FileSystem: Send + Sync {
    /// Copy every file under `source` accepted by `filter` into `destination`
    async fn copy_tree(
        &self,
        source: &Path,
        destination: &Path,
        filter: &FileFilter,
    ) -> Result<usize, CollaboratorError>;

    /// Copy a single file, creating parent directories
    async fn copy_file(&self, source: &Path, destination: &Path) -> Result<(), CollaboratorError>;

    /// Read every file under `base` accepted by `filter`
    async fn collect(&self, base: &Path, filter: &FileFilter) -> Result<FileSet, CollaboratorError>;

    /// Write a file set beneath `destination`
    async fn write(&self, files: &FileSet, destination: &Path) -> Result<usize, CollaboratorError>;

    /// Remove every entry of `root` except files with one of `keep_extensions`
    async fn clean(&self, root: &Path, keep_extensions: &[&str]) -> Result<usize, CollaboratorError>;
}

/// Archive creation
#[async_trait]
pub trait Archiver: Send + Sync {
    /// Archive the contents of `source_root` into `archive_path`
    async fn archive(&self, source_root: &Path, archive_path: &Path) -> Result<(), CollaboratorError>;
}

/// Authenticated remote upload
#[async_trait]
pub trait SecureTransfer: Send + Sync {
    /// Upload the tree at `local_root` using `credentials`
    async fn upload(
        &self,
        credentials: &DeployCredentials,
        local_root: &Path,
    ) -> Result<(), CollaboratorError>;
}

/// Source-to-source transformation
#[async_trait]
pub trait SourceTransformer: Send + Sync {
    /// Substitute environment values into text files
    async fn preprocess(
        &self,
        files: &mut FileSet,
        context: &SubstitutionContext,
    ) -> Result<(), CollaboratorError>;

    /// Compile style sources under `source_root` into `output_root`
    async fn compile_styles(&self, source_root: &Path, output_root: &Path)
        -> Result<(), CollaboratorError>;

    /// Transpile and bundle scripts under `source_root` into `output_root`
    async fn bundle_scripts(&self, source_root: &Path, output_root: &Path)
        -> Result<(), CollaboratorError>;
}

/// The full set of collaborators a build needs
#[derive(Clone)]
pub struct Collaborators {
    pub fs: Arc<dyn FileSystem>,
    pub archiver: Arc<dyn Archiver>,
    pub transfer: Arc<dyn SecureTransfer>,
    pub transformer: Arc<dyn SourceTransformer>,
}

impl Collaborators {
    /// Local file system plus system `zip`, `scp` and JS toolchain
    pub fn system(project_root: &Path) -> Self {
        let runner = CommandRunner::default();
        Self {
            fs: Arc::new(LocalFileSystem),
            archiver: Arc::new(ZipArchiver::new(runner.clone())),
            transfer: Arc::new(ScpTransfer::new(runner.clone())),
            transformer: Arc::new(ToolchainTransformer::new(project_root, runner)),
        }
    }
}
