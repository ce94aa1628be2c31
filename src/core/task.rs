//! Task domain model

use crate::collaborators::CollaboratorError;
use futures::future::{BoxFuture, FutureExt};
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// Body of a leaf task
pub type TaskAction =
    Arc<dyn Fn() -> BoxFuture<'static, Result<(), CollaboratorError>> + Send + Sync>;

/// How a task does its work once its dependencies have completed
#[derive(Clone)]
pub enum TaskKind {
    /// Runs an action
    Leaf(TaskAction),
    /// Runs member tasks one after another, stopping at the first failure
    Sequence(Vec<String>),
    /// Runs member tasks concurrently and joins them
    ParallelGroup(Vec<String>),
}

impl fmt::Debug for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskKind::Leaf(_) => f.write_str("Leaf"),
            TaskKind::Sequence(members) => f.debug_tuple("Sequence").field(members).finish(),
            TaskKind::ParallelGroup(members) => {
                f.debug_tuple("ParallelGroup").field(members).finish()
            }
        }
    }
}

impl TaskKind {
    pub fn label(&self) -> &'static str {
        match self {
            TaskKind::Leaf(_) => "leaf",
            TaskKind::Sequence(_) => "sequence",
            TaskKind::ParallelGroup(_) => "parallel",
        }
    }

    /// Composition members (empty for leaves)
    pub fn members(&self) -> &[String] {
        match self {
            TaskKind::Leaf(_) => &[],
            TaskKind::Sequence(members) | TaskKind::ParallelGroup(members) => members,
        }
    }
}

/// A named unit of work in the task graph
#[derive(Debug, Clone)]
pub struct Task {
    /// Unique task identifier
    pub id: String,

    /// Tasks that must complete successfully before this one starts
    pub dependencies: Vec<String>,

    pub kind: TaskKind,
}

impl Task {
    /// A task that runs `action`
    pub fn leaf<F, Fut>(id: impl Into<String>, dependencies: &[&str], action: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), CollaboratorError>> + Send + 'static,
    {
        Self {
            id: id.into(),
            dependencies: to_ids(dependencies),
            kind: TaskKind::Leaf(Arc::new(move || action().boxed())),
        }
    }

    /// A task that runs `members` in order
    pub fn sequence(id: impl Into<String>, dependencies: &[&str], members: &[&str]) -> Self {
        Self {
            id: id.into(),
            dependencies: to_ids(dependencies),
            kind: TaskKind::Sequence(to_ids(members)),
        }
    }

    /// A task that runs `members` concurrently
    pub fn parallel(id: impl Into<String>, dependencies: &[&str], members: &[&str]) -> Self {
        Self {
            id: id.into(),
            dependencies: to_ids(dependencies),
            kind: TaskKind::ParallelGroup(to_ids(members)),
        }
    }

    /// A pure aggregation task with no body of its own
    pub fn umbrella(id: impl Into<String>, dependencies: &[&str]) -> Self {
        Self::sequence(id, dependencies, &[])
    }

    /// Dependencies followed by composition members, without duplicates
    pub fn prerequisites(&self) -> Vec<String> {
        let mut ids = self.dependencies.clone();
        for member in self.kind.members() {
            if !ids.contains(member) {
                ids.push(member.clone());
            }
        }
        ids
    }
}

fn to_ids(ids: &[&str]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(ids.len());
    for id in ids {
        if !out.iter().any(|existing| existing == id) {
            out.push(id.to_string());
        }
    }
    out
}
