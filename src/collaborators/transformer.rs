//! Default source transformer: in-process text substitution plus external style/script toolchain

use crate::collaborators::{CollaboratorError, CommandRunner, CommandSpec, SourceTransformer};
use crate::core::pipeline::{FileSet, SubstitutionContext};
use async_trait::async_trait;
use regex::{Captures, Regex};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::{debug, info};
use walkdir::WalkDir;

/// Style sources the style compiler understands
const STYLE_EXTENSIONS: [&str; 2] = ["scss", "sass"];

/// Bundler configs looked up in the project root, first match wins
const BUNDLER_CONFIGS: [&str; 2] = ["webpack.config.babel.js", "webpack.config.js"];

/// Matches `/* @echo KEY */`, `<!-- @echo KEY -->` and `// @echo KEY`
fn echo_directive() -> &'static Regex {
    static DIRECTIVE: OnceLock<Regex> = OnceLock::new();
    DIRECTIVE.get_or_init(|| {
        Regex::new(r"/\*\s*@echo\s+(\w+)\s*\*/|<!--\s*@echo\s+(\w+)\s*-->|//[ \t]*@echo[ \t]+(\w+)")
            .expect("echo directive pattern is valid")
    })
}

/// Replace every echo directive whose key is in `context`
///
/// Directives naming keys absent from the context are left untouched.
pub fn substitute(text: &str, context: &SubstitutionContext) -> String {
    echo_directive()
        .replace_all(text, |caps: &Captures| {
            let key = caps
                .get(1)
                .or_else(|| caps.get(2))
                .or_else(|| caps.get(3))
                .map(|m| m.as_str())
                .unwrap_or_default();
            match context.get(key) {
                Some(value) => value.to_string(),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

/// Transformer backed by regex substitution, `sass` and `webpack`
#[derive(Debug, Clone)]
pub struct ToolchainTransformer {
    project_root: PathBuf,
    runner: CommandRunner,
    style_command: CommandSpec,
    script_command: CommandSpec,
}

impl ToolchainTransformer {
    pub fn new(project_root: impl Into<PathBuf>, runner: CommandRunner) -> Self {
        Self {
            project_root: project_root.into(),
            runner,
            style_command: CommandSpec::new(
                "npx",
                &["sass", "--no-source-map", "{source}:{output}"],
            ),
            script_command: CommandSpec::new(
                "npx",
                &["webpack", "--config", "{config}", "--output-path", "{output}"],
            ),
        }
    }

    pub fn with_style_command(mut self, command: CommandSpec) -> Self {
        self.style_command = command;
        self
    }

    pub fn with_script_command(mut self, command: CommandSpec) -> Self {
        self.script_command = command;
        self
    }

    fn bundler_config(&self) -> Option<PathBuf> {
        BUNDLER_CONFIGS
            .iter()
            .map(|name| self.project_root.join(name))
            .find(|path| path.is_file())
    }
}

fn has_style_sources(root: &Path) -> bool {
    WalkDir::new(root)
        .into_iter()
        .filter_map(Result::ok)
        .any(|entry| {
            entry.file_type().is_file()
                && entry
                    .path()
                    .extension()
                    .map(|ext| STYLE_EXTENSIONS.iter().any(|s| ext.eq_ignore_ascii_case(s)))
                    .unwrap_or(false)
        })
}

#[async_trait]
impl SourceTransformer for ToolchainTransformer {
    async fn preprocess(
        &self,
        files: &mut FileSet,
        context: &SubstitutionContext,
    ) -> Result<(), CollaboratorError> {
        let mut changed = 0;
        for file in &mut files.files {
            // Binary assets pass through untouched
            let Ok(text) = std::str::from_utf8(&file.contents) else {
                continue;
            };
            let rendered = substitute(text, context);
            if rendered != text {
                file.contents = rendered.into_bytes();
                changed += 1;
            }
        }
        debug!("Preprocessed {} of {} files", changed, files.len());
        Ok(())
    }

    async fn compile_styles(
        &self,
        source_root: &Path,
        output_root: &Path,
    ) -> Result<(), CollaboratorError> {
        let root = source_root.to_path_buf();
        let has_styles = tokio::task::spawn_blocking(move || has_style_sources(&root))
            .await
            .map_err(|e| CollaboratorError::Internal(format!("style scan cancelled: {}", e)))?;
        if !has_styles {
            info!("No style sources under {}", source_root.display());
            return Ok(());
        }
        let args = self.style_command.render(source_root, output_root);
        self.runner
            .run(&self.style_command.program, &args, &self.project_root)
            .await?;
        Ok(())
    }

    async fn bundle_scripts(
        &self,
        source_root: &Path,
        output_root: &Path,
    ) -> Result<(), CollaboratorError> {
        let Some(config) = self.bundler_config() else {
            info!("No bundler config in {}", self.project_root.display());
            return Ok(());
        };
        let config = config.to_string_lossy();
        let args: Vec<String> = self
            .script_command
            .render(source_root, output_root)
            .into_iter()
            .map(|a| a.replace("{config}", &config))
            .collect();
        self.runner
            .run(&self.script_command.program, &args, &self.project_root)
            .await?;
        Ok(())
    }
}
