use serde::{Deserialize, Serialize};

use crate::context::TaskRecord;
use crate::task::{TaskId, TaskStatus};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BatchVerdict {
    Success,
    Failure,
}

impl std::fmt::Display for BatchVerdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BatchVerdict::Success => write!(f, "success"),
            BatchVerdict::Failure => write!(f, "failure"),
        }
    }
}

/// Final per-task statuses in finishing order plus the overall verdict.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BatchOutcome {
    pub tasks: Vec<TaskRecord>,
    pub verdict: BatchVerdict,
}

impl BatchOutcome {
    /// Fold over terminal statuses: `Failure` iff any task is not `Completed`.
    pub fn aggregate(tasks: Vec<TaskRecord>) -> Self {
        let verdict = if tasks.iter().all(|t| t.status.is_success()) {
            BatchVerdict::Success
        } else {
            BatchVerdict::Failure
        };
        Self { tasks, verdict }
    }

    pub fn is_success(&self) -> bool {
        self.verdict == BatchVerdict::Success
    }

    pub fn failed_tasks(&self) -> Vec<&TaskRecord> {
        self.tasks.iter().filter(|t| !t.status.is_success()).collect()
    }

    pub fn status_of(&self, id: &TaskId) -> Option<TaskStatus> {
        self.tasks.iter().find(|t| &t.task_id == id).map(|t| t.status)
    }

    pub fn count(&self, status: TaskStatus) -> usize {
        self.tasks.iter().filter(|t| t.status == status).count()
    }

    pub fn finishing_order(&self) -> Vec<&TaskId> {
        self.tasks.iter().map(|t| &t.task_id).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn record(id: &str, status: TaskStatus) -> TaskRecord {
        let now = Utc::now();
        TaskRecord {
            task_id: TaskId::new(id),
            executor_name: "x".into(),
            status,
            result: String::new(),
            started_at: now,
            finished_at: now,
            duration_ms: 1,
        }
    }

    #[test]
    fn test_all_completed_is_success() {
        let outcome = BatchOutcome::aggregate(vec![
            record("a", TaskStatus::Completed),
            record("b", TaskStatus::Completed),
        ]);
        assert!(outcome.is_success());
        assert!(outcome.failed_tasks().is_empty());
    }

    #[test]
    fn test_timeout_counts_as_failure() {
        let outcome = BatchOutcome::aggregate(vec![
            record("a", TaskStatus::Completed),
            record("b", TaskStatus::Timeout),
            record("c", TaskStatus::Failed),
        ]);
        assert_eq!(outcome.verdict, BatchVerdict::Failure);
        let failed: Vec<String> = outcome.failed_tasks().iter().map(|t| t.task_id.to_string()).collect();
        assert_eq!(failed, vec!["b", "c"]);
        assert_eq!(outcome.count(TaskStatus::Timeout), 1);
    }

    #[test]
    fn test_aggregation_is_idempotent() {
        let records = vec![
            record("a", TaskStatus::Failed),
            record("b", TaskStatus::Completed),
        ];
        let first = BatchOutcome::aggregate(records.clone());
        let second = BatchOutcome::aggregate(first.tasks.clone());
        assert_eq!(first, second);
        assert_eq!(first, BatchOutcome::aggregate(records));
    }
}
