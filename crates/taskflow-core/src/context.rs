use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::graph::TaskGraph;
use crate::task::{Task, TaskId, TaskRequest, TaskStatus};

const OUTER_RULE: usize = 80;
const INNER_RULE: usize = 60;

/// Terminal record of one task within one attempt.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskRecord {
    pub task_id: TaskId,
    pub executor_name: String,
    pub status: TaskStatus,
    /// Executor output, or `Error: <detail>` when the task did not complete.
    pub result: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub duration_ms: u64,
}

/// Results of one attempt, keyed by task id, remembering finishing order.
///
/// Created fresh for every attempt and dropped when the attempt ends.
#[derive(Debug, Default)]
pub struct ExecutionContext {
    records: HashMap<TaskId, TaskRecord>,
    order: Vec<TaskId>,
}

impl ExecutionContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a finished task. A task is published at most once per attempt.
    pub fn publish(&mut self, record: TaskRecord) {
        let id = record.task_id.clone();
        if self.records.insert(id.clone(), record).is_none() {
            self.order.push(id);
        }
    }

    pub fn get(&self, id: &TaskId) -> Option<&TaskRecord> {
        self.records.get(id)
    }

    pub fn result(&self, id: &TaskId) -> Option<&str> {
        self.records.get(id).map(|r| r.result.as_str())
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Records in the order tasks finished.
    pub fn records(&self) -> impl Iterator<Item = &TaskRecord> {
        self.order.iter().filter_map(|id| self.records.get(id))
    }

    pub fn into_records(mut self) -> Vec<TaskRecord> {
        self.order
            .iter()
            .filter_map(|id| self.records.remove(id))
            .collect()
    }
}

/// Build what an executor receives for `task`.
///
/// Dependencies are rendered in declared order with their executor,
/// description and result text. Failed dependencies contribute their error
/// text like any other result. With no dependencies the prompt is the bare
/// description.
pub fn build_request(
    task: &Task,
    graph: &TaskGraph,
    ctx: &ExecutionContext,
    original_request: Option<&str>,
) -> TaskRequest {
    let sections: Vec<String> = task
        .dependencies
        .iter()
        .filter_map(|dep_id| {
            let result = ctx.result(dep_id)?;
            Some(match graph.get(dep_id) {
                Some(dep) => format!(
                    "=== RESULTS FROM: {} ({}) ===\nTask Description: {}\nResults:\n{}\n{}",
                    dep_id.as_str().to_uppercase(),
                    dep.executor_name,
                    dep.description,
                    result,
                    "=".repeat(INNER_RULE),
                ),
                None => format!("Results from {}:\n{}", dep_id, result),
            })
        })
        .collect();

    let context = sections.join("\n\n");

    let mut prompt = if context.is_empty() {
        task.description.clone()
    } else {
        format!(
            "CONTEXT FROM PREVIOUS TASKS:\n{rule}\n{context}\n\n{rule}\nYOUR CURRENT TASK:\n{desc}\n\n\
             IMPORTANT: Use the context above to inform your work. \
             Reference specific findings and build upon previous results.",
            rule = "=".repeat(OUTER_RULE),
            context = context,
            desc = task.description,
        )
    };

    if let Some(request) = original_request {
        prompt = format!("ORIGINAL USER REQUEST: {}\n\n{}", request, prompt);
    }

    TaskRequest {
        task_id: task.id.clone(),
        description: task.description.clone(),
        context,
        prompt,
    }
}

/// Summary handed to the quality evaluator: one block per task in finishing order.
pub fn results_summary(records: &[TaskRecord]) -> String {
    records
        .iter()
        .map(|r| format!("Task: {} ({})\nResult: {}", r.task_id, r.executor_name, r.result))
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, executor: &str, status: TaskStatus, result: &str) -> TaskRecord {
        let now = Utc::now();
        TaskRecord {
            task_id: TaskId::new(id),
            executor_name: executor.to_string(),
            status,
            result: result.to_string(),
            started_at: now,
            finished_at: now,
            duration_ms: 0,
        }
    }

    fn graph() -> TaskGraph {
        TaskGraph::from_tasks(vec![
            Task::new("market_research", "researcher", "Survey the market"),
            Task::new("history", "researcher", "Collect history"),
            Task::new("report", "writer", "Write it up").depends_on(&["history", "market_research"]),
        ])
        .unwrap()
    }

    #[test]
    fn test_no_dependencies_uses_description_verbatim() {
        let graph = graph();
        let ctx = ExecutionContext::new();
        let task = graph.get(&"market_research".into()).unwrap();

        let req = build_request(task, &graph, &ctx, None);
        assert_eq!(req.prompt, "Survey the market");
        assert!(req.context.is_empty());
    }

    #[test]
    fn test_dependencies_rendered_in_declared_order() {
        let graph = graph();
        let mut ctx = ExecutionContext::new();
        ctx.publish(record("market_research", "researcher", TaskStatus::Completed, "big market"));
        ctx.publish(record("history", "researcher", TaskStatus::Completed, "long history"));

        let task = graph.get(&"report".into()).unwrap();
        let req = build_request(task, &graph, &ctx, None);

        let history = req.context.find("=== RESULTS FROM: HISTORY (researcher) ===").unwrap();
        let market = req
            .context
            .find("=== RESULTS FROM: MARKET_RESEARCH (researcher) ===")
            .unwrap();
        assert!(history < market);
        assert!(req.context.contains("Task Description: Collect history\nResults:\nlong history"));
        assert!(req.prompt.starts_with("CONTEXT FROM PREVIOUS TASKS:\n"));
        assert!(req.prompt.contains("YOUR CURRENT TASK:\nWrite it up"));
    }

    #[test]
    fn test_failed_dependency_passes_error_text() {
        let graph = graph();
        let mut ctx = ExecutionContext::new();
        ctx.publish(record("market_research", "researcher", TaskStatus::Failed, "Error: boom"));
        ctx.publish(record("history", "researcher", TaskStatus::Completed, "ok"));

        let task = graph.get(&"report".into()).unwrap();
        let req = build_request(task, &graph, &ctx, None);
        assert!(req.context.contains("Results:\nError: boom"));
    }

    #[test]
    fn test_original_request_prefix() {
        let graph = graph();
        let ctx = ExecutionContext::new();
        let task = graph.get(&"history".into()).unwrap();

        let req = build_request(task, &graph, &ctx, Some("Analyse EVs"));
        assert_eq!(req.prompt, "ORIGINAL USER REQUEST: Analyse EVs\n\nCollect history");
        assert_eq!(req.description, "Collect history");
    }

    #[test]
    fn test_publish_keeps_finishing_order() {
        let mut ctx = ExecutionContext::new();
        ctx.publish(record("b", "x", TaskStatus::Completed, "1"));
        ctx.publish(record("a", "x", TaskStatus::Failed, "2"));
        ctx.publish(record("b", "x", TaskStatus::Completed, "3"));

        let order: Vec<String> = ctx.records().map(|r| r.task_id.to_string()).collect();
        assert_eq!(order, vec!["b", "a"]);
        assert_eq!(ctx.result(&"b".into()), Some("3"));
    }

    #[test]
    fn test_results_summary_format() {
        let summary = results_summary(&[
            record("a", "researcher", TaskStatus::Completed, "alpha"),
            record("b", "writer", TaskStatus::Failed, "Error: nope"),
        ]);
        assert_eq!(
            summary,
            "Task: a (researcher)\nResult: alpha\n\nTask: b (writer)\nResult: Error: nope"
        );
    }
}
