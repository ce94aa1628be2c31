//! Test utilities: recording collaborators and temporary projects

use async_trait::async_trait;
use pstasks::build::{BuildSession, ProjectLayout, SessionOptions};
use pstasks::collaborators::{
    Archiver, CollaboratorError, Collaborators, FileFilter, FileSystem, LocalFileSystem,
    SecureTransfer, SourceTransformer,
};
use pstasks::core::config::{ConfigResolver, DeployCredentials};
use pstasks::core::pipeline::{FileSet, SourceFile, SubstitutionContext};
use pstasks::core::PackError;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// Ordered record of every collaborator call, shared by all mocks
#[derive(Debug, Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<String>>>);

impl CallLog {
    pub fn record(&self, call: impl Into<String>) {
        self.0.lock().unwrap().push(call.into());
    }

    pub fn calls(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub fn count(&self, call: &str) -> usize {
        self.calls().iter().filter(|c| *c == call).count()
    }

    pub fn position(&self, call: &str) -> Option<usize> {
        self.calls().iter().position(|c| c == call)
    }
}

/// Last path component, used to keep call records readable
fn leaf(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// File system that records calls and touches nothing
pub struct MockFileSystem {
    log: CallLog,
    fail_source: Option<String>,
}

#[async_trait]
impl FileSystem for MockFileSystem {
    async fn copy_tree(
        &self,
        source: &Path,
        _destination: &Path,
        _filter: &FileFilter,
    ) -> Result<usize, CollaboratorError> {
        let name = leaf(source);
        self.log.record(format!("copy_tree:{}", name));
        if self.fail_source.as_deref() == Some(name.as_str()) {
            return Err(CollaboratorError::io(source, "mock copy failure"));
        }
        Ok(1)
    }

    async fn copy_file(&self, source: &Path, _destination: &Path) -> Result<(), CollaboratorError> {
        self.log.record(format!("copy_file:{}", leaf(source)));
        Ok(())
    }

    async fn collect(&self, base: &Path, _filter: &FileFilter) -> Result<FileSet, CollaboratorError> {
        self.log.record(format!("collect:{}", leaf(base)));
        Ok(FileSet::new(base).with_file(SourceFile::new("index.html", "<!-- @echo API_URL -->")))
    }

    async fn write(&self, files: &FileSet, destination: &Path) -> Result<usize, CollaboratorError> {
        self.log.record(format!("write:{}", leaf(destination)));
        Ok(files.len())
    }

    async fn clean(&self, root: &Path, _keep: &[&str]) -> Result<usize, CollaboratorError> {
        self.log.record(format!("clean:{}", leaf(root)));
        Ok(0)
    }
}

pub struct MockArchiver {
    log: CallLog,
}

#[async_trait]
impl Archiver for MockArchiver {
    async fn archive(&self, source_root: &Path, archive_path: &Path) -> Result<(), CollaboratorError> {
        self.log
            .record(format!("archive:{}->{}", leaf(source_root), leaf(archive_path)));
        Ok(())
    }
}

pub struct MockTransfer {
    log: CallLog,
    pub uploads: Mutex<Vec<(DeployCredentials, PathBuf)>>,
}

#[async_trait]
impl SecureTransfer for MockTransfer {
    async fn upload(
        &self,
        credentials: &DeployCredentials,
        local_root: &Path,
    ) -> Result<(), CollaboratorError> {
        self.log.record(format!("upload:{}", leaf(local_root)));
        self.uploads
            .lock()
            .unwrap()
            .push((credentials.clone(), local_root.to_path_buf()));
        Ok(())
    }
}

pub struct MockTransformer {
    log: CallLog,
    fail_styles: bool,
    fail_scripts: bool,
    pub contexts: Mutex<Vec<SubstitutionContext>>,
}

#[async_trait]
impl SourceTransformer for MockTransformer {
    async fn preprocess(
        &self,
        _files: &mut FileSet,
        context: &SubstitutionContext,
    ) -> Result<(), CollaboratorError> {
        self.log.record("preprocess");
        self.contexts.lock().unwrap().push(context.clone());
        Ok(())
    }

    async fn compile_styles(&self, _: &Path, _: &Path) -> Result<(), CollaboratorError> {
        self.log.record("compile_styles");
        if self.fail_styles {
            return Err(CollaboratorError::Internal("sass failed".to_string()));
        }
        Ok(())
    }

    async fn bundle_scripts(&self, _: &Path, _: &Path) -> Result<(), CollaboratorError> {
        self.log.record("bundle_scripts");
        if self.fail_scripts {
            return Err(CollaboratorError::Internal("webpack failed".to_string()));
        }
        Ok(())
    }
}

/// A set of recording collaborators sharing one call log
pub struct Mocks {
    pub log: CallLog,
    pub fs: Arc<MockFileSystem>,
    pub archiver: Arc<MockArchiver>,
    pub transfer: Arc<MockTransfer>,
    pub transformer: Arc<MockTransformer>,
}

impl Mocks {
    pub fn new() -> Self {
        MocksBuilder::default().build()
    }

    pub fn builder() -> MocksBuilder {
        MocksBuilder::default()
    }

    pub fn collaborators(&self) -> Collaborators {
        Collaborators {
            fs: self.fs.clone(),
            archiver: self.archiver.clone(),
            transfer: self.transfer.clone(),
            transformer: self.transformer.clone(),
        }
    }

    /// Real file system with recording archiver, transfer and transformer
    pub fn with_local_fs(&self) -> Collaborators {
        Collaborators {
            fs: Arc::new(LocalFileSystem),
            ..self.collaborators()
        }
    }

    pub fn upload_count(&self) -> usize {
        self.transfer.uploads.lock().unwrap().len()
    }

    pub fn contexts(&self) -> Vec<SubstitutionContext> {
        self.transformer.contexts.lock().unwrap().clone()
    }
}

#[derive(Default)]
pub struct MocksBuilder {
    fail_source: Option<String>,
    fail_styles: bool,
    fail_scripts: bool,
}

impl MocksBuilder {
    /// Make `copy_tree` fail for a source directory with this name
    pub fn fail_copy_of(mut self, dir: &str) -> Self {
        self.fail_source = Some(dir.to_string());
        self
    }

    pub fn fail_styles(mut self) -> Self {
        self.fail_styles = true;
        self
    }

    pub fn fail_scripts(mut self) -> Self {
        self.fail_scripts = true;
        self
    }

    pub fn build(self) -> Mocks {
        let log = CallLog::default();
        Mocks {
            fs: Arc::new(MockFileSystem {
                log: log.clone(),
                fail_source: self.fail_source,
            }),
            archiver: Arc::new(MockArchiver { log: log.clone() }),
            transfer: Arc::new(MockTransfer {
                log: log.clone(),
                uploads: Mutex::default(),
            }),
            transformer: Arc::new(MockTransformer {
                log: log.clone(),
                fail_styles: self.fail_styles,
                fail_scripts: self.fail_scripts,
                contexts: Mutex::default(),
            }),
            log,
        }
    }
}

/// Config with a `prod` environment carrying every URL and credentials
pub const FULL_CONFIG: &str = r#"{
    "default_deploy_target": "prod",
    "prod": {
        "deploy_credentials": { "host": "images.example.com", "user": "deploy" },
        "image_server_url": "https://img.example.com",
        "sams_url": "https://sams.example.com",
        "api_url": "https://api.example.com",
        "ps_url": "https://ps.example.com"
    }
}"#;

/// A temporary plugin project
pub struct TestProject {
    pub dir: TempDir,
}

impl TestProject {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
        }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn with_config(self, json: &str) -> Self {
        self.write("config.json", json)
    }

    pub fn write(self, relative: &str, contents: &str) -> Self {
        let path = self.root().join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, contents).unwrap();
        self
    }

    pub fn layout(&self) -> ProjectLayout {
        ProjectLayout::new(self.root(), "dist")
    }

    pub fn output(&self) -> PathBuf {
        self.layout().output().to_path_buf()
    }

    pub fn resolver(&self) -> ConfigResolver {
        ConfigResolver::new(self.root(), None)
    }

    pub fn options(&self, env: Option<&str>) -> SessionOptions {
        SessionOptions {
            env: env.map(String::from),
            config_dir: None,
            layout: self.layout(),
        }
    }

    /// Prepare a session against this project's own config.json
    pub fn session(
        &self,
        env: Option<&str>,
        collaborators: Collaborators,
    ) -> Result<BuildSession, PackError> {
        BuildSession::prepare(&self.resolver(), self.options(env), collaborators)
    }
}
