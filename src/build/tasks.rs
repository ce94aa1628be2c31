//! The canonical plugin build graph

use crate::build::builder::PipelineBuilder;
use crate::build::layout::{ProjectLayout, MANIFEST_FILE};
use crate::collaborators::{CollaboratorError, Collaborators, FileFilter};
use crate::core::environment::EnvironmentContext;
use crate::core::error::PackError;
use crate::core::graph::TaskGraph;
use crate::core::pipeline::{FileSet, Pipeline, SourceFile, SourceTree};
use crate::core::task::{Task, TaskAction, TaskKind};
use futures::future::FutureExt;
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Task run when none is named
pub const DEFAULT_TASK: &str = "build-no-img";

/// Binary and script assets that never go through text preprocessing
const UNPROCESSED_EXTENSIONS: [&str; 11] = [
    "less", "scss", "sass", "js", "png", "gif", "jpg", "jpeg", "bmp", "swf", "ico",
];

/// Directories holding vendored or style sources
const UNPROCESSED_DIRS: [&str; 3] = ["ext", "less", "sass"];

/// How a declared task composes its work
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "members", rename_all = "snake_case")]
pub enum Composition {
    Leaf,
    Sequence(&'static [&'static str]),
    Parallel(&'static [&'static str]),
}

/// Static description of a task, independent of any environment
#[derive(Debug, Clone, Copy, Serialize)]
pub struct TaskDeclaration {
    pub id: &'static str,
    pub dependencies: &'static [&'static str],
    pub composition: Composition,
    pub description: &'static str,
}

/// Every task of the plugin build, in declaration order
pub const CANONICAL_TASKS: &[TaskDeclaration] = &[
    TaskDeclaration {
        id: "build-plugin",
        dependencies: &[],
        composition: Composition::Leaf,
        description: "Copy plugin/ and the plugin.xml manifest into the output",
    },
    TaskDeclaration {
        id: "build-src",
        dependencies: &["build-plugin"],
        composition: Composition::Leaf,
        description: "Copy src/ into the output web root",
    },
    TaskDeclaration {
        id: "zip",
        dependencies: &["build-src"],
        composition: Composition::Leaf,
        description: "Archive the output plugin directory into plugin.zip",
    },
    TaskDeclaration {
        id: "clean",
        dependencies: &["zip"],
        composition: Composition::Leaf,
        description: "Remove everything in the output except archives",
    },
    TaskDeclaration {
        id: "build-no-img",
        dependencies: &["build-plugin", "build-src", "zip", "clean"],
        composition: Composition::Sequence(&[]),
        description: "Package the plugin without deploying images",
    },
    TaskDeclaration {
        id: "style-stage",
        dependencies: &["build-src"],
        composition: Composition::Leaf,
        description: "Compile style sources into the output web root",
    },
    TaskDeclaration {
        id: "static-asset-stage",
        dependencies: &["build-src"],
        composition: Composition::Leaf,
        description: "Substitute environment URLs into text assets and query definitions",
    },
    TaskDeclaration {
        id: "script-transform-stage",
        dependencies: &["build-src"],
        composition: Composition::Leaf,
        description: "Transpile and bundle scripts into the output web root",
    },
    TaskDeclaration {
        id: "build",
        dependencies: &[],
        composition: Composition::Parallel(&[
            "style-stage",
            "static-asset-stage",
            "script-transform-stage",
        ]),
        description: "Produce all transformed assets",
    },
    TaskDeclaration {
        id: "deploy",
        dependencies: &["build"],
        composition: Composition::Leaf,
        description: "Upload the output web root to the active environment",
    },
    TaskDeclaration {
        id: "build-with-img",
        dependencies: &[],
        composition: Composition::Sequence(&["build", "deploy", "build-no-img"]),
        description: "Build, deploy assets, then package",
    },
];

impl TaskDeclaration {
    /// Dependencies followed by composition members
    pub fn prerequisites(&self) -> Vec<&'static str> {
        let mut ids = self.dependencies.to_vec();
        if let Composition::Sequence(members) | Composition::Parallel(members) = self.composition {
            ids.extend(members.iter().filter(|m| !self.dependencies.contains(*m)));
        }
        ids
    }
}

/// Everything a leaf body needs, shared by all leaves of one graph
pub struct BuildContext {
    layout: ProjectLayout,
    collaborators: Collaborators,
    preprocess: Pipeline<FileSet>,
    deploy: Pipeline<SourceTree>,
}

impl BuildContext {
    /// Build the environment's pipelines once for every task that uses them
    pub fn new(layout: ProjectLayout, env: EnvironmentContext, collaborators: Collaborators) -> Self {
        let builder = PipelineBuilder::new(
            collaborators.transfer.clone(),
            collaborators.transformer.clone(),
        );
        Self {
            preprocess: builder.build_preprocess_pipeline(env.clone()),
            deploy: builder.build_deploy_pipeline(env),
            layout,
            collaborators,
        }
    }

    pub fn layout(&self) -> &ProjectLayout {
        &self.layout
    }

    async fn build_plugin(&self) -> Result<(), CollaboratorError> {
        let out = self.layout.output_plugin();
        let copied = self
            .collaborators
            .fs
            .copy_tree(&self.layout.plugin_dir(), &out, &FileFilter::all())
            .await?;

        let manifest = self.layout.manifest();
        if manifest.is_file() {
            self.collaborators
                .fs
                .copy_file(&manifest, &out.join(MANIFEST_FILE))
                .await?;
        } else {
            warn!("No {} found at {}", MANIFEST_FILE, manifest.display());
        }
        info!("Copied {} plugin files to {}", copied, out.display());
        Ok(())
    }

    async fn build_src(&self) -> Result<(), CollaboratorError> {
        let out = self.layout.output_web_root();
        let copied = self
            .collaborators
            .fs
            .copy_tree(&self.layout.src_dir(), &out, &FileFilter::all())
            .await?;
        info!("Copied {} source files to {}", copied, out.display());
        Ok(())
    }

    async fn zip(&self) -> Result<(), CollaboratorError> {
        self.collaborators
            .archiver
            .archive(&self.layout.output_plugin(), &self.layout.archive_path())
            .await
    }

    async fn clean(&self) -> Result<(), CollaboratorError> {
        let removed = self
            .collaborators
            .fs
            .clean(self.layout.output(), &["zip"])
            .await?;
        info!("Removed {} entries from {}", removed, self.layout.output().display());
        Ok(())
    }

    async fn style_stage(&self) -> Result<(), CollaboratorError> {
        self.collaborators
            .transformer
            .compile_styles(&self.layout.src_dir(), &self.layout.output_web_root())
            .await
    }

    async fn static_asset_stage(&self) -> Result<(), CollaboratorError> {
        let filter = FileFilter::all()
            .exclude_extensions(&UNPROCESSED_EXTENSIONS)
            .exclude_dirs(&UNPROCESSED_DIRS);

        let mut trees = vec![
            (self.layout.plugin_dir(), self.layout.output_plugin()),
            (self.layout.src_dir(), self.layout.output_web_root()),
        ];
        let queries = self.layout.queries_dir();
        if queries.is_dir() {
            trees.push((queries, self.layout.output_queries_root()));
        } else {
            debug!("No query definitions at {}", queries.display());
        }
        for (source, destination) in trees {
            let mut files = self.collaborators.fs.collect(&source, &filter).await?;
            self.preprocess.run(&mut files).await?;
            self.collaborators.fs.write(&files, &destination).await?;
        }

        let manifest = self.layout.manifest();
        if manifest.is_file() {
            let contents = tokio::fs::read(&manifest)
                .await
                .map_err(|e| CollaboratorError::io(&manifest, e))?;
            let mut files =
                FileSet::new(self.layout.root()).with_file(SourceFile::new(MANIFEST_FILE, contents));
            self.preprocess.run(&mut files).await?;
            self.collaborators
                .fs
                .write(&files, &self.layout.output_plugin())
                .await?;
        }
        Ok(())
    }

    async fn script_transform_stage(&self) -> Result<(), CollaboratorError> {
        self.collaborators
            .transformer
            .bundle_scripts(&self.layout.src_dir(), &self.layout.output_web_root())
            .await
    }

    async fn deploy(&self) -> Result<(), CollaboratorError> {
        let mut tree = SourceTree::new(self.layout.output_web_root());
        self.deploy.run(&mut tree).await?;
        Ok(())
    }
}

/// Wrap a context method as a task action
fn bind<F, Fut>(context: &Arc<BuildContext>, body: F) -> TaskAction
where
    F: Fn(Arc<BuildContext>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), CollaboratorError>> + Send + 'static,
{
    let context = context.clone();
    Arc::new(move || body(context.clone()).boxed())
}

fn leaf_action(id: &str, context: &Arc<BuildContext>) -> Option<TaskAction> {
    let action = match id {
        "build-plugin" => bind(context, |c| async move { c.build_plugin().await }),
        "build-src" => bind(context, |c| async move { c.build_src().await }),
        "zip" => bind(context, |c| async move { c.zip().await }),
        "clean" => bind(context, |c| async move { c.clean().await }),
        "style-stage" => bind(context, |c| async move { c.style_stage().await }),
        "static-asset-stage" => bind(context, |c| async move { c.static_asset_stage().await }),
        "script-transform-stage" => {
            bind(context, |c| async move { c.script_transform_stage().await })
        }
        "deploy" => bind(context, |c| async move { c.deploy().await }),
        _ => return None,
    };
    Some(action)
}

/// Bind [`CANONICAL_TASKS`] to `context` and validate the result
pub fn canonical_graph(context: Arc<BuildContext>) -> Result<TaskGraph, PackError> {
    let mut tasks = Vec::with_capacity(CANONICAL_TASKS.len());
    for decl in CANONICAL_TASKS {
        let kind = match decl.composition {
            Composition::Leaf => TaskKind::Leaf(
                leaf_action(decl.id, &context)
                    .ok_or_else(|| PackError::UnknownTask(decl.id.to_string()))?,
            ),
            Composition::Sequence(members) => {
                TaskKind::Sequence(members.iter().map(|m| m.to_string()).collect())
            }
            Composition::Parallel(members) => {
                TaskKind::ParallelGroup(members.iter().map(|m| m.to_string()).collect())
            }
        };
        tasks.push(Task {
            id: decl.id.to_string(),
            dependencies: decl.dependencies.iter().map(|d| d.to_string()).collect(),
            kind,
        });
    }
    TaskGraph::new(tasks)
}
