//! Task executor - runs a single leaf action

use crate::core::error::PackError;
use crate::core::task::TaskAction;
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

/// Runs leaf actions and attributes failures to their task
#[derive(Debug, Clone, Copy, Default)]
pub struct TaskExecutor;

impl TaskExecutor {
    pub fn new() -> Self {
        Self
    }

    /// Run `action` on behalf of `task_id`, returning how long it took
    pub async fn execute(&self, task_id: &str, action: &TaskAction) -> Result<Duration, PackError> {
        info!("Executing task: {}", task_id);
        let started = Instant::now();

        match action().await {
            Ok(()) => {
                let elapsed = started.elapsed();
                debug!("Task {} finished in {:?}", task_id, elapsed);
                Ok(elapsed)
            }
            Err(e) => {
                error!("Task {} failed: {}", task_id, e);
                Err(PackError::TaskExecution {
                    task_id: task_id.to_string(),
                    source: e,
                })
            }
        }
    }
}
