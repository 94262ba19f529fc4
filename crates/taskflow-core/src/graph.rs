use std::collections::{HashMap, HashSet};

use crate::error::EngineError;
use crate::task::{Task, TaskId};

/// Immutable task dependency graph for one batch.
///
/// Cycles and dangling dependencies are not rejected here. The execution loop
/// finds them when a ready set comes back empty; see [`TaskGraph::diagnose_stall`].
#[derive(Debug, Clone)]
pub struct TaskGraph {
    /// Tasks in plan order (stable iteration for reproducible logs)
    tasks: Vec<Task>,

    /// task_id -> position in `tasks`
    index: HashMap<TaskId, usize>,
}

impl TaskGraph {
    /// Construct the graph from the plan's task list.
    pub fn from_tasks(tasks: Vec<Task>) -> Result<Self, EngineError> {
        if tasks.is_empty() {
            return Err(EngineError::EmptyPlan);
        }

        let mut index = HashMap::with_capacity(tasks.len());
        for (pos, task) in tasks.iter().enumerate() {
            if index.insert(task.id.clone(), pos).is_some() {
                return Err(EngineError::DuplicateTaskId(task.id.to_string()));
            }
        }

        Ok(Self { tasks, index })
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn get(&self, id: &TaskId) -> Option<&Task> {
        self.index.get(id).map(|&pos| &self.tasks[pos])
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Tasks not yet in `known` whose dependencies are all in `known`.
    ///
    /// `known` holds every task that has reached a terminal status, whatever
    /// that status is. Order follows the plan.
    pub fn ready_set(&self, known: &HashSet<TaskId>) -> Vec<&Task> {
        self.tasks
            .iter()
            .filter(|t| !known.contains(&t.id))
            .filter(|t| t.dependencies.iter().all(|d| known.contains(d)))
            .collect()
    }

    /// Explain why no task is ready while some remain unresolved.
    pub fn diagnose_stall(&self, known: &HashSet<TaskId>) -> EngineError {
        let unresolved: Vec<&Task> = self
            .tasks
            .iter()
            .filter(|t| !known.contains(&t.id))
            .collect();

        for task in &unresolved {
            if let Some(missing) = task
                .dependencies
                .iter()
                .find(|d| !self.index.contains_key(*d))
            {
                return EngineError::DanglingDependency {
                    task_id: task.id.to_string(),
                    missing: missing.to_string(),
                };
            }
        }

        EngineError::Cycle {
            unresolved: unresolved.iter().map(|t| t.id.to_string()).collect(),
        }
    }

    /// Static lint used by the `validate` command. The engine itself does not
    /// call this; it detects the same problems while running.
    pub fn lint(&self) -> Vec<LintIssue> {
        let mut issues = Vec::new();

        for task in &self.tasks {
            for dep in &task.dependencies {
                if dep == &task.id {
                    issues.push(LintIssue::SelfDependency(task.id.clone()));
                } else if !self.index.contains_key(dep) {
                    issues.push(LintIssue::DanglingDependency {
                        task_id: task.id.clone(),
                        missing: dep.clone(),
                    });
                }
            }
        }

        if let Some(path) = self.find_cycle() {
            issues.push(LintIssue::Cycle(path));
        }

        issues
    }

    /// DFS over dependency edges; returns the first cycle found as a path.
    fn find_cycle(&self) -> Option<Vec<TaskId>> {
        let mut visited = HashSet::new();
        let mut stack = Vec::new();

        for task in &self.tasks {
            if !visited.contains(&task.id) && self.dfs_cycle(&task.id, &mut visited, &mut stack) {
                return Some(stack);
            }
        }

        None
    }

    fn dfs_cycle(
        &self,
        node: &TaskId,
        visited: &mut HashSet<TaskId>,
        stack: &mut Vec<TaskId>,
    ) -> bool {
        visited.insert(node.clone());
        stack.push(node.clone());

        if let Some(task) = self.get(node) {
            for dep in &task.dependencies {
                // Self edges are reported separately
                if dep == node || !self.index.contains_key(dep) {
                    continue;
                }

                if let Some(pos) = stack.iter().position(|x| x == dep) {
                    stack.push(dep.clone());
                    *stack = stack[pos..].to_vec();
                    return true;
                }

                if !visited.contains(dep) && self.dfs_cycle(dep, visited, stack) {
                    return true;
                }
            }
        }

        stack.pop();
        false
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LintIssue {
    SelfDependency(TaskId),
    DanglingDependency { task_id: TaskId, missing: TaskId },
    Cycle(Vec<TaskId>),
    UnknownExecutor { task_id: TaskId, executor: String },
}

impl std::fmt::Display for LintIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LintIssue::SelfDependency(id) => write!(f, "task '{}' depends on itself", id),
            LintIssue::DanglingDependency { task_id, missing } => {
                write!(f, "task '{}' depends on unknown task '{}'", task_id, missing)
            }
            LintIssue::Cycle(path) => {
                let path: Vec<&str> = path.iter().map(|id| id.as_str()).collect();
                write!(f, "circular dependency: {}", path.join(" -> "))
            }
            LintIssue::UnknownExecutor { task_id, executor } => {
                write!(f, "task '{}' uses unknown executor '{}'", task_id, executor)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(tasks: &[&Task]) -> Vec<String> {
        tasks.iter().map(|t| t.id.to_string()).collect()
    }

    #[test]
    fn test_tasks_without_dependencies_are_ready_first() {
        let graph = TaskGraph::from_tasks(vec![
            Task::new("a", "x", "first"),
            Task::new("b", "x", "second"),
            Task::new("c", "x", "join").depends_on(&["a", "b"]),
        ])
        .unwrap();

        let known = HashSet::new();
        assert_eq!(ids(&graph.ready_set(&known)), vec!["a", "b"]);
    }

    #[test]
    fn test_dependent_ready_once_all_dependencies_known() {
        let graph = TaskGraph::from_tasks(vec![
            Task::new("a", "x", "first"),
            Task::new("b", "x", "second"),
            Task::new("c", "x", "join").depends_on(&["a", "b"]),
        ])
        .unwrap();

        let mut known = HashSet::from([TaskId::new("a")]);
        assert_eq!(ids(&graph.ready_set(&known)), vec!["b"]);

        known.insert(TaskId::new("b"));
        assert_eq!(ids(&graph.ready_set(&known)), vec!["c"]);

        known.insert(TaskId::new("c"));
        assert!(graph.ready_set(&known).is_empty());
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let err = TaskGraph::from_tasks(vec![
            Task::new("a", "x", "one"),
            Task::new("a", "x", "two"),
        ])
        .unwrap_err();
        assert_eq!(err, EngineError::DuplicateTaskId("a".into()));
    }

    #[test]
    fn test_empty_plan_rejected() {
        assert_eq!(TaskGraph::from_tasks(vec![]).unwrap_err(), EngineError::EmptyPlan);
    }

    #[test]
    fn test_stall_with_missing_dependency_is_dangling() {
        let graph = TaskGraph::from_tasks(vec![
            Task::new("a", "x", "first"),
            Task::new("b", "x", "second").depends_on(&["ghost"]),
        ])
        .unwrap();

        let known = HashSet::from([TaskId::new("a")]);
        assert!(graph.ready_set(&known).is_empty());
        assert_eq!(
            graph.diagnose_stall(&known),
            EngineError::DanglingDependency {
                task_id: "b".into(),
                missing: "ghost".into(),
            }
        );
    }

    #[test]
    fn test_stall_with_cycle_lists_unresolved() {
        let graph = TaskGraph::from_tasks(vec![
            Task::new("a", "x", "first").depends_on(&["b"]),
            Task::new("b", "x", "second").depends_on(&["a"]),
            Task::new("c", "x", "free"),
        ])
        .unwrap();

        let known = HashSet::from([TaskId::new("c")]);
        assert_eq!(
            graph.diagnose_stall(&known),
            EngineError::Cycle {
                unresolved: vec!["a".into(), "b".into()],
            }
        );
    }

    #[test]
    fn test_lint_reports_cycle_path_and_self_reference() {
        let graph = TaskGraph::from_tasks(vec![
            Task::new("a", "x", "first").depends_on(&["c"]),
            Task::new("b", "x", "second").depends_on(&["a"]),
            Task::new("c", "x", "third").depends_on(&["b"]),
            Task::new("d", "x", "loner").depends_on(&["d", "nowhere"]),
        ])
        .unwrap();

        let issues = graph.lint();
        assert!(issues.contains(&LintIssue::SelfDependency("d".into())));
        assert!(issues.contains(&LintIssue::DanglingDependency {
            task_id: "d".into(),
            missing: "nowhere".into(),
        }));

        let cycle = issues
            .iter()
            .find_map(|i| match i {
                LintIssue::Cycle(path) => Some(path.clone()),
                _ => None,
            })
            .expect("cycle reported");
        assert_eq!(cycle.first(), cycle.last());
        assert_eq!(cycle.len(), 4);
    }

    #[test]
    fn test_lint_clean_graph() {
        let graph = TaskGraph::from_tasks(vec![
            Task::new("a", "x", "first"),
            Task::new("b", "x", "second").depends_on(&["a"]),
        ])
        .unwrap();
        assert!(graph.lint().is_empty());
    }
}
