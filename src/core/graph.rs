//! Validated task graph

use crate::core::error::PackError;
use crate::core::task::Task;
use std::collections::{HashMap, HashSet};

/// Directed acyclic graph of tasks keyed by ID
///
/// Edges are a task's dependencies plus its composition members. The graph is
/// checked for duplicate IDs, dangling references and cycles on construction.
#[derive(Debug, Clone)]
pub struct TaskGraph {
    /// Tasks in declaration order
    tasks: Vec<Task>,

    /// Task ID -> declaration index
    index: HashMap<String, usize>,
}

impl TaskGraph {
    pub fn new(tasks: Vec<Task>) -> Result<Self, PackError> {
        let mut index = HashMap::with_capacity(tasks.len());
        for (i, task) in tasks.iter().enumerate() {
            if index.insert(task.id.clone(), i).is_some() {
                return Err(PackError::DuplicateTask(task.id.clone()));
            }
        }

        for task in &tasks {
            for dep in task.prerequisites() {
                if !index.contains_key(&dep) {
                    return Err(PackError::UnknownDependency {
                        task_id: task.id.clone(),
                        dependency: dep,
                    });
                }
            }
        }

        let graph = Self { tasks, index };
        graph.check_cycles()?;
        Ok(graph)
    }

    /// Get a task by ID
    pub fn task(&self, id: &str) -> Option<&Task> {
        self.index.get(id).map(|&i| &self.tasks[i])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// All tasks in declaration order
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Position of a task in the declaration
    pub fn declaration_index(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    /// Dependencies of a task sorted by declaration order
    pub fn ordered_dependencies(&self, id: &str) -> Vec<String> {
        let mut deps = self
            .task(id)
            .map(|t| t.dependencies.clone())
            .unwrap_or_default();
        deps.sort_by_key(|d| self.index.get(d).copied().unwrap_or(usize::MAX));
        deps
    }

    /// Every task reachable from `id`, including `id` itself
    pub fn closure(&self, id: &str) -> HashSet<String> {
        let mut seen = HashSet::new();
        let mut stack = vec![id.to_string()];
        while let Some(current) = stack.pop() {
            if !seen.insert(current.clone()) {
                continue;
            }
            if let Some(task) = self.task(&current) {
                stack.extend(task.prerequisites());
            }
        }
        seen
    }

    fn check_cycles(&self) -> Result<(), PackError> {
        let mut visited = HashSet::new();
        let mut recursion_stack = HashSet::new();

        for task in &self.tasks {
            if !visited.contains(&task.id) {
                self.dfs_check(&task.id, &mut visited, &mut recursion_stack)?;
            }
        }

        Ok(())
    }

    fn dfs_check(
        &self,
        task_id: &str,
        visited: &mut HashSet<String>,
        recursion_stack: &mut HashSet<String>,
    ) -> Result<(), PackError> {
        visited.insert(task_id.to_string());
        recursion_stack.insert(task_id.to_string());

        if let Some(task) = self.task(task_id) {
            for dep in task.prerequisites() {
                if recursion_stack.contains(&dep) {
                    return Err(PackError::DependencyCycle(dep));
                }
                if !visited.contains(&dep) {
                    self.dfs_check(&dep, visited, recursion_stack)?;
                }
            }
        }

        recursion_stack.remove(task_id);
        Ok(())
    }
}
