//! Error taxonomy for config resolution and task execution

use crate::collaborators::CollaboratorError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by the orchestration core
///
/// Values are `Clone` so a memoized task outcome can be handed to every
/// task that references it.
#[derive(Debug, Clone, Error)]
pub enum PackError {
    #[error("Unable to locate config: {0}")]
    ConfigNotFound(String),

    #[error("Failed to parse config at {}: {message}", path.display())]
    ConfigParse { path: PathBuf, message: String },

    #[error("No deploy target provided in cli options or the default_deploy_target config option")]
    MissingDeployTarget,

    #[error("Task '{task_id}' failed: {source}")]
    TaskExecution {
        task_id: String,
        #[source]
        source: CollaboratorError,
    },

    #[error("Parallel group '{group}' failed in: {}", failed_members(.failures))]
    GroupFailed {
        group: String,
        failures: Vec<(String, PackError)>,
    },

    #[error("Unknown task: {0}")]
    UnknownTask(String),

    #[error("Duplicate task ID: {0}")]
    DuplicateTask(String),

    #[error("Task '{task_id}' depends on non-existent task '{dependency}'")]
    UnknownDependency { task_id: String, dependency: String },

    #[error("Cycle detected in task graph involving '{0}'")]
    DependencyCycle(String),
}

impl PackError {
    /// True for errors that abort before any task runs
    pub fn is_resolution_error(&self) -> bool {
        matches!(
            self,
            PackError::ConfigNotFound(_)
                | PackError::ConfigParse { .. }
                | PackError::MissingDeployTarget
        )
    }

    /// IDs of every leaf task whose collaborator call failed, first occurrence order
    ///
    /// A shared prerequisite reached through several group members is listed once.
    pub fn failing_tasks(&self) -> Vec<String> {
        let mut ids = Vec::new();
        self.collect_failing_tasks(&mut ids);
        ids
    }

    fn collect_failing_tasks(&self, ids: &mut Vec<String>) {
        match self {
            PackError::TaskExecution { task_id, .. } => {
                if !ids.contains(task_id) {
                    ids.push(task_id.clone());
                }
            }
            PackError::GroupFailed { failures, .. } => {
                for (_, err) in failures {
                    err.collect_failing_tasks(ids);
                }
            }
            _ => {}
        }
    }
}

fn failed_members(failures: &[(String, PackError)]) -> String {
    failures
        .iter()
        .map(|(id, _)| id.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}
