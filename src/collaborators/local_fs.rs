//! Local file-system collaborator

use crate::collaborators::{CollaboratorError, FileSystem};
use crate::core::pipeline::{FileSet, SourceFile};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::task::spawn_blocking;
use tracing::debug;
use walkdir::WalkDir;

/// Include/exclude rules applied to paths relative to a walk root
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileFilter {
    /// Extensions (without the dot, case-insensitive) that are skipped
    pub excluded_extensions: Vec<String>,

    /// Directory names whose whole subtree is skipped
    pub excluded_dirs: Vec<String>,
}

impl FileFilter {
    /// Accept everything
    pub fn all() -> Self {
        Self::default()
    }

    pub fn exclude_extensions(mut self, extensions: &[&str]) -> Self {
        self.excluded_extensions
            .extend(extensions.iter().map(|e| e.to_ascii_lowercase()));
        self
    }

    pub fn exclude_dirs(mut self, dirs: &[&str]) -> Self {
        self.excluded_dirs.extend(dirs.iter().map(|d| d.to_string()));
        self
    }

    /// Check a file path relative to the walk root
    pub fn allows(&self, relative: &Path) -> bool {
        let mut components: Vec<_> = relative.components().collect();
        components.pop();
        let in_excluded_dir = components.iter().any(|c| {
            let name = c.as_os_str().to_string_lossy();
            self.excluded_dirs.iter().any(|d| d == name.as_ref())
        });
        if in_excluded_dir {
            return false;
        }

        match relative.extension() {
            Some(ext) => {
                let ext = ext.to_string_lossy().to_ascii_lowercase();
                !self.excluded_extensions.contains(&ext)
            }
            None => true,
        }
    }
}

/// Collaborator backed by `std::fs` and `walkdir` on tokio's blocking pool
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFileSystem;

impl LocalFileSystem {
    /// Files under `base` accepted by `filter`, as relative paths in walk order
    fn walk(base: &Path, filter: &FileFilter) -> Result<Vec<PathBuf>, CollaboratorError> {
        if !base.is_dir() {
            return Err(CollaboratorError::io(base, "source directory does not exist"));
        }

        let mut files = Vec::new();
        for entry in WalkDir::new(base).sort_by_file_name() {
            let entry = entry.map_err(|e| CollaboratorError::io(base, e))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let relative = entry
                .path()
                .strip_prefix(base)
                .map_err(|e| CollaboratorError::Internal(e.to_string()))?
                .to_path_buf();
            if filter.allows(&relative) {
                files.push(relative);
            }
        }
        Ok(files)
    }

    fn copy_one(source: &Path, destination: &Path) -> Result<(), CollaboratorError> {
        if let Some(parent) = destination.parent() {
            std::fs::create_dir_all(parent).map_err(|e| CollaboratorError::io(parent, e))?;
        }
        std::fs::copy(source, destination).map_err(|e| CollaboratorError::io(source, e))?;
        Ok(())
    }

    fn copy_tree_sync(
        source: &Path,
        destination: &Path,
        filter: &FileFilter,
    ) -> Result<usize, CollaboratorError> {
        let files = Self::walk(source, filter)?;
        for relative in &files {
            Self::copy_one(&source.join(relative), &destination.join(relative))?;
        }
        debug!(
            "Copied {} files from {} to {}",
            files.len(),
            source.display(),
            destination.display()
        );
        Ok(files.len())
    }

    fn collect_sync(base: &Path, filter: &FileFilter) -> Result<FileSet, CollaboratorError> {
        let mut set = FileSet::new(base);
        for relative in Self::walk(base, filter)? {
            let path = base.join(&relative);
            let contents = std::fs::read(&path).map_err(|e| CollaboratorError::io(&path, e))?;
            set.files.push(SourceFile { relative, contents });
        }
        Ok(set)
    }

    fn write_sync(files: &FileSet, destination: &Path) -> Result<usize, CollaboratorError> {
        for file in &files.files {
            let path = destination.join(&file.relative);
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).map_err(|e| CollaboratorError::io(parent, e))?;
            }
            std::fs::write(&path, &file.contents).map_err(|e| CollaboratorError::io(&path, e))?;
        }
        Ok(files.len())
    }

    fn clean_sync(root: &Path, keep_extensions: &[String]) -> Result<usize, CollaboratorError> {
        let entries = match std::fs::read_dir(root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(CollaboratorError::io(root, e)),
        };

        let mut removed = 0;
        for entry in entries {
            let entry = entry.map_err(|e| CollaboratorError::io(root, e))?;
            let path = entry.path();
            let file_type = entry.file_type().map_err(|e| CollaboratorError::io(&path, e))?;

            if file_type.is_dir() {
                std::fs::remove_dir_all(&path).map_err(|e| CollaboratorError::io(&path, e))?;
            } else {
                let keep = path
                    .extension()
                    .map(|ext| {
                        let ext = ext.to_string_lossy();
                        keep_extensions.iter().any(|k| k.eq_ignore_ascii_case(&ext))
                    })
                    .unwrap_or(false);
                if keep {
                    continue;
                }
                std::fs::remove_file(&path).map_err(|e| CollaboratorError::io(&path, e))?;
            }
            removed += 1;
        }
        Ok(removed)
    }
}

/// Run file-system work on the blocking pool so concurrent tasks keep progressing
async fn blocking<T, F>(work: F) -> Result<T, CollaboratorError>
where
    F: FnOnce() -> Result<T, CollaboratorError> + Send + 'static,
    T: Send + 'static,
{
    spawn_blocking(work)
        .await
        .map_err(|e| CollaboratorError::Internal(format!("file-system task cancelled: {}", e)))?
}

#[async_trait]
impl FileSystem for LocalFileSystem {
    async fn copy_tree(
        &self,
        source: &Path,
        destination: &Path,
        filter: &FileFilter,
    ) -> Result<usize, CollaboratorError> {
        let (source, destination, filter) =
            (source.to_path_buf(), destination.to_path_buf(), filter.clone());
        blocking(move || Self::copy_tree_sync(&source, &destination, &filter)).await
    }

    async fn copy_file(&self, source: &Path, destination: &Path) -> Result<(), CollaboratorError> {
        let (source, destination) = (source.to_path_buf(), destination.to_path_buf());
        blocking(move || Self::copy_one(&source, &destination)).await
    }

    async fn collect(&self, base: &Path, filter: &FileFilter) -> Result<FileSet, CollaboratorError> {
        let (base, filter) = (base.to_path_buf(), filter.clone());
        blocking(move || Self::collect_sync(&base, &filter)).await
    }

    async fn write(&self, files: &FileSet, destination: &Path) -> Result<usize, CollaboratorError> {
        let (files, destination) = (files.clone(), destination.to_path_buf());
        blocking(move || Self::write_sync(&files, &destination)).await
    }

    async fn clean(&self, root: &Path, keep_extensions: &[&str]) -> Result<usize, CollaboratorError> {
        let root = root.to_path_buf();
        let keep: Vec<String> = keep_extensions.iter().map(|k| k.to_string()).collect();
        blocking(move || Self::clean_sync(&root, &keep)).await
    }
}
