//! Main execution engine - runs a target task and everything it needs

use crate::core::error::PackError;
use crate::core::graph::TaskGraph;
use crate::core::state::{RunState, RunStatus, TaskState};
use crate::core::task::TaskKind;
use crate::execution::{ExecutionScheduler, TaskExecutor};
use futures::future::{join_all, BoxFuture, FutureExt};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, OnceCell};
use tracing::{error, info, warn};
use uuid::Uuid;

/// Events that can occur during a run
#[derive(Debug, Clone)]
pub enum ExecutionEvent {
    RunStarted {
        execution_id: Uuid,
        target: String,
        planned: usize,
    },
    TaskStarted {
        task_id: String,
        kind: &'static str,
    },
    TaskCompleted {
        task_id: String,
        duration: Duration,
    },
    TaskFailed {
        task_id: String,
        error: String,
    },
    RunCompleted {
        execution_id: Uuid,
        status: RunStatus,
    },
}

/// Type for event handlers
pub type EventHandler = Arc<dyn Fn(ExecutionEvent) + Send + Sync>;

/// Outcome of a run
#[derive(Debug, Clone)]
pub struct RunReport {
    pub state: RunState,

    /// The target's error, `None` on success
    pub error: Option<PackError>,
}

impl RunReport {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }

    pub fn execution_id(&self) -> Uuid {
        self.state.execution_id
    }

    /// Tasks in the order they completed successfully
    pub fn completion_order(&self) -> &[String] {
        &self.state.completion_order
    }

    pub fn task_state(&self, task_id: &str) -> TaskState {
        self.state.task_state(task_id)
    }

    pub fn into_result(self) -> Result<RunState, PackError> {
        match self.error {
            None => Ok(self.state),
            Some(e) => Err(e),
        }
    }
}

/// Per-run bookkeeping shared by every task future of the run
struct RunContext {
    /// One memo cell per task; a task body runs at most once per run
    outcomes: HashMap<String, OnceCell<Result<(), PackError>>>,
    state: Mutex<RunState>,
}

/// Task graph execution engine
///
/// A task's dependencies run first, one at a time in declaration order. Then
/// its body runs: a leaf action, sequence members in order, or parallel-group
/// members concurrently. Each task's outcome is memoized for the run, so
/// shared prerequisites execute once and later references see the same result.
pub struct ExecutionEngine {
    graph: Arc<TaskGraph>,
    executor: TaskExecutor,
    event_handlers: Vec<EventHandler>,
}

impl ExecutionEngine {
    pub fn new(graph: Arc<TaskGraph>) -> Self {
        Self {
            graph,
            executor: TaskExecutor::new(),
            event_handlers: Vec::new(),
        }
    }

    /// Add an event handler
    pub fn with_event_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(ExecutionEvent) + Send + Sync + 'static,
    {
        self.event_handlers.push(Arc::new(handler));
        self
    }

    pub fn graph(&self) -> &TaskGraph {
        &self.graph
    }

    /// Emit an event to all handlers
    fn emit_event(&self, event: ExecutionEvent) {
        for handler in &self.event_handlers {
            handler(event.clone());
        }
    }

    /// Run `target` and everything it transitively requires
    pub async fn execute(&self, target: &str) -> RunReport {
        let mut state = RunState::new(target);
        let execution_id = state.execution_id;

        let planned = match ExecutionScheduler::new(&self.graph).plan(target) {
            Ok(plan) => plan.len(),
            Err(e) => {
                error!("Cannot run {}: {}", target, e);
                state.fail();
                return RunReport {
                    state,
                    error: Some(e),
                };
            }
        };

        info!("Starting run: {} ({})", target, execution_id);
        state.start();
        self.emit_event(ExecutionEvent::RunStarted {
            execution_id,
            target: target.to_string(),
            planned,
        });

        let run = RunContext {
            outcomes: self
                .graph
                .tasks()
                .iter()
                .map(|t| (t.id.clone(), OnceCell::new()))
                .collect(),
            state: Mutex::new(state),
        };

        let result = self.run_task(&run, target).await;

        let mut state = run.state.into_inner();
        match &result {
            Ok(()) => state.complete(),
            Err(_) => state.fail(),
        }
        info!("Run finished: {} - {:?}", target, state.status);
        self.emit_event(ExecutionEvent::RunCompleted {
            execution_id,
            status: state.status,
        });

        RunReport {
            state,
            error: result.err(),
        }
    }

    /// Memoized entry point for a task
    fn run_task<'a>(&'a self, run: &'a RunContext, id: &'a str) -> BoxFuture<'a, Result<(), PackError>> {
        async move {
            let cell = run
                .outcomes
                .get(id)
                .ok_or_else(|| PackError::UnknownTask(id.to_string()))?;
            cell.get_or_init(|| self.execute_task(run, id)).await.clone()
        }
        .boxed()
    }

    /// Run a task's dependencies and then its body
    fn execute_task<'a>(
        &'a self,
        run: &'a RunContext,
        id: &'a str,
    ) -> BoxFuture<'a, Result<(), PackError>> {
        async move {
            let task = self
                .graph
                .task(id)
                .ok_or_else(|| PackError::UnknownTask(id.to_string()))?;

            for dep in self.graph.ordered_dependencies(id) {
                if let Err(e) = self.run_task(run, &dep).await {
                    warn!("Task {} not started: dependency {} failed", id, dep);
                    return Err(e);
                }
            }

            run.state.lock().await.task_started(id);
            self.emit_event(ExecutionEvent::TaskStarted {
                task_id: id.to_string(),
                kind: task.kind.label(),
            });
            let started = Instant::now();

            let result = match &task.kind {
                TaskKind::Leaf(action) => self.executor.execute(id, action).await.map(|_| ()),
                TaskKind::Sequence(members) => self.run_sequence(run, members).await,
                TaskKind::ParallelGroup(members) => self.run_parallel(run, id, members).await,
            };

            match &result {
                Ok(()) => {
                    run.state.lock().await.task_completed(id);
                    self.emit_event(ExecutionEvent::TaskCompleted {
                        task_id: id.to_string(),
                        duration: started.elapsed(),
                    });
                }
                Err(e) => {
                    run.state.lock().await.task_failed(id, e.to_string());
                    self.emit_event(ExecutionEvent::TaskFailed {
                        task_id: id.to_string(),
                        error: e.to_string(),
                    });
                }
            }
            result
        }
        .boxed()
    }

    async fn run_sequence(&self, run: &RunContext, members: &[String]) -> Result<(), PackError> {
        for member in members {
            self.run_task(run, member).await?;
        }
        Ok(())
    }

    /// Start every member, wait for all of them, and combine their failures
    async fn run_parallel(
        &self,
        run: &RunContext,
        group: &str,
        members: &[String],
    ) -> Result<(), PackError> {
        let results = join_all(members.iter().map(|m| self.run_task(run, m))).await;

        let failures: Vec<(String, PackError)> = members
            .iter()
            .zip(results)
            .filter_map(|(member, result)| result.err().map(|e| (member.clone(), e)))
            .collect();

        if failures.is_empty() {
            Ok(())
        } else {
            Err(PackError::GroupFailed {
                group: group.to_string(),
                failures,
            })
        }
    }
}
