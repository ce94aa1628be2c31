//! Execution scheduler - the deterministic order a target's tasks run in

use crate::core::error::PackError;
use crate::core::graph::TaskGraph;
use std::collections::HashSet;

/// Computes plans without running anything
pub struct ExecutionScheduler<'g> {
    graph: &'g TaskGraph,
}

impl<'g> ExecutionScheduler<'g> {
    pub fn new(graph: &'g TaskGraph) -> Self {
        Self { graph }
    }

    /// Order in which the tasks of `target` complete when run one at a time
    ///
    /// Dependencies come first in declaration order, then composition members
    /// in their listed order, then the task itself. Each task appears once.
    pub fn plan(&self, target: &str) -> Result<Vec<String>, PackError> {
        if !self.graph.contains(target) {
            return Err(PackError::UnknownTask(target.to_string()));
        }
        let mut visited = HashSet::new();
        let mut order = Vec::new();
        self.visit(target, &mut visited, &mut order);
        Ok(order)
    }

    fn visit(&self, id: &str, visited: &mut HashSet<String>, order: &mut Vec<String>) {
        if !visited.insert(id.to_string()) {
            return;
        }
        for dep in self.graph.ordered_dependencies(id) {
            self.visit(&dep, visited, order);
        }
        if let Some(task) = self.graph.task(id) {
            for member in task.kind.members() {
                self.visit(member, visited, order);
            }
        }
        order.push(id.to_string());
    }

    /// Leaf tasks that `target` would run, in plan order
    pub fn leaves(&self, target: &str) -> Result<Vec<String>, PackError> {
        Ok(self
            .plan(target)?
            .into_iter()
            .filter(|id| {
                self.graph
                    .task(id)
                    .map(|t| t.kind.label() == "leaf")
                    .unwrap_or(false)
            })
            .collect())
    }
}
