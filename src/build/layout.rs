//! Project and output directory layout

use std::path::{Path, PathBuf};

pub const PLUGIN_DIR: &str = "plugin";
pub const MANIFEST_FILE: &str = "plugin.xml";
pub const SRC_DIR: &str = "src";
pub const QUERIES_DIR: &str = "queries_root";
pub const WEB_ROOT_DIR: &str = "web_root";
pub const ARCHIVE_FILE: &str = "plugin.zip";

/// Where sources are read from and artifacts are written to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectLayout {
    root: PathBuf,
    output: PathBuf,
}

impl ProjectLayout {
    /// `output` is resolved against `root` when relative
    pub fn new(root: impl Into<PathBuf>, output: impl AsRef<Path>) -> Self {
        let root = root.into();
        let output = root.join(output);
        Self { root, output }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn output(&self) -> &Path {
        &self.output
    }

    pub fn plugin_dir(&self) -> PathBuf {
        self.root.join(PLUGIN_DIR)
    }

    pub fn manifest(&self) -> PathBuf {
        self.root.join(MANIFEST_FILE)
    }

    pub fn src_dir(&self) -> PathBuf {
        self.root.join(SRC_DIR)
    }

    /// Optional query definitions, preprocessed alongside the plugin
    pub fn queries_dir(&self) -> PathBuf {
        self.root.join(QUERIES_DIR)
    }

    /// `<output>/plugin`
    pub fn output_plugin(&self) -> PathBuf {
        self.output.join(PLUGIN_DIR)
    }

    /// `<output>/web_root`
    pub fn output_web_root(&self) -> PathBuf {
        self.output.join(WEB_ROOT_DIR)
    }

    /// `<output>/queries_root`
    pub fn output_queries_root(&self) -> PathBuf {
        self.output.join(QUERIES_DIR)
    }

    /// `<output>/plugin.zip`
    pub fn archive_path(&self) -> PathBuf {
        self.output.join(ARCHIVE_FILE)
    }
}
