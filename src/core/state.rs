//! Execution state models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Overall run status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunStatus {
    /// Run has not started
    Pending,
    /// Run is in progress
    Running,
    /// Target task completed successfully
    Completed,
    /// Target task failed
    Failed,
}

/// State of a single task within a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TaskState {
    /// Task has not been reached
    Pending,
    /// Task is running
    Running { started_at: DateTime<Utc> },
    /// Task completed successfully
    Completed {
        started_at: DateTime<Utc>,
        completed_at: DateTime<Utc>,
    },
    /// Task failed
    Failed {
        error: String,
        started_at: DateTime<Utc>,
        failed_at: DateTime<Utc>,
    },
}

impl TaskState {
    /// Check if task is in a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskState::Completed { .. } | TaskState::Failed { .. })
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        match self {
            TaskState::Pending => None,
            TaskState::Running { started_at }
            | TaskState::Completed { started_at, .. }
            | TaskState::Failed { started_at, .. } => Some(*started_at),
        }
    }
}

/// Bookkeeping for one run of the task graph
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunState {
    /// Unique execution ID
    pub execution_id: Uuid,

    /// Task the run was asked to execute
    pub target: String,

    pub status: RunStatus,

    pub started_at: Option<DateTime<Utc>>,

    pub completed_at: Option<DateTime<Utc>>,

    /// Per-task state
    pub tasks: HashMap<String, TaskState>,

    /// Task IDs in the order they finished successfully
    pub completion_order: Vec<String>,
}

impl RunState {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            execution_id: Uuid::new_v4(),
            target: target.into(),
            status: RunStatus::Pending,
            started_at: None,
            completed_at: None,
            tasks: HashMap::new(),
            completion_order: Vec::new(),
        }
    }

    /// Mark run as started
    pub fn start(&mut self) {
        self.status = RunStatus::Running;
        self.started_at = Some(Utc::now());
    }

    /// Mark run as completed
    pub fn complete(&mut self) {
        self.status = RunStatus::Completed;
        self.completed_at = Some(Utc::now());
    }

    /// Mark run as failed
    pub fn fail(&mut self) {
        self.status = RunStatus::Failed;
        self.completed_at = Some(Utc::now());
    }

    pub fn task_started(&mut self, task_id: &str) {
        self.tasks.insert(
            task_id.to_string(),
            TaskState::Running {
                started_at: Utc::now(),
            },
        );
    }

    pub fn task_completed(&mut self, task_id: &str) {
        let started_at = self.started_at_of(task_id);
        self.tasks.insert(
            task_id.to_string(),
            TaskState::Completed {
                started_at,
                completed_at: Utc::now(),
            },
        );
        self.completion_order.push(task_id.to_string());
    }

    pub fn task_failed(&mut self, task_id: &str, error: String) {
        let started_at = self.started_at_of(task_id);
        self.tasks.insert(
            task_id.to_string(),
            TaskState::Failed {
                error,
                started_at,
                failed_at: Utc::now(),
            },
        );
    }

    /// State of a task, `Pending` if it was never reached
    pub fn task_state(&self, task_id: &str) -> TaskState {
        self.tasks.get(task_id).cloned().unwrap_or(TaskState::Pending)
    }

    pub fn completed_count(&self) -> usize {
        self.completion_order.len()
    }

    pub fn failed_count(&self) -> usize {
        self.tasks
            .values()
            .filter(|s| matches!(s, TaskState::Failed { .. }))
            .count()
    }

    fn started_at_of(&self, task_id: &str) -> DateTime<Utc> {
        self.tasks
            .get(task_id)
            .and_then(TaskState::started_at)
            .unwrap_or_else(Utc::now)
    }
}
