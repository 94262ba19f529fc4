use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::outcome::{BatchOutcome, BatchVerdict};
use crate::reflection::Verdict;
use crate::task::TaskStatus;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ReflectionSummary {
    /// Verdict of the last review, `None` when reflection never ran.
    pub last_verdict: Option<Verdict>,
    /// Reasons results were accepted without approval.
    pub warnings: Vec<String>,
}

/// Everything the caller gets back from one batch. Stored as
/// `<batch_id>.json` when saved.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BatchReport {
    pub batch_id: String,
    pub request: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub attempts: u32,
    pub reflection: ReflectionSummary,
    pub outcome: BatchOutcome,
}

impl BatchReport {
    pub fn new(
        request: &str,
        started_at: DateTime<Utc>,
        attempts: u32,
        reflection: ReflectionSummary,
        outcome: BatchOutcome,
    ) -> Self {
        Self {
            batch_id: uuid::Uuid::new_v4().to_string(),
            request: request.to_string(),
            started_at,
            finished_at: Utc::now(),
            attempts,
            reflection,
            outcome,
        }
    }

    pub fn verdict(&self) -> BatchVerdict {
        self.outcome.verdict
    }

    /// Write the report to `<dir>/<batch_id>.json`.
    pub fn write_to_dir(&self, dir: &Path) -> Result<PathBuf, std::io::Error> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(format!("{}.json", self.batch_id));
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
        std::fs::write(&path, json)?;
        Ok(path)
    }

    pub fn read_from_file(path: &Path) -> Result<Self, std::io::Error> {
        let data = std::fs::read_to_string(path)?;
        serde_json::from_str(&data)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }

    /// Compact JSON for listings; omits task result text.
    pub fn to_summary_json(&self) -> serde_json::Value {
        serde_json::json!({
            "batch_id": self.batch_id,
            "request": self.request,
            "verdict": self.outcome.verdict,
            "attempts": self.attempts,
            "reflection": self.reflection.last_verdict,
            "tasks": self.outcome.tasks.len(),
            "completed": self.outcome.count(TaskStatus::Completed),
            "failed": self.outcome.count(TaskStatus::Failed),
            "timeout": self.outcome.count(TaskStatus::Timeout),
            "started_at": self.started_at.to_rfc3339(),
            "finished_at": self.finished_at.to_rfc3339(),
        })
    }

    pub fn to_jsonl_line(&self) -> String {
        serde_json::to_string(&self.to_summary_json()).unwrap_or_default()
    }
}

/// Default directory for saved reports.
pub fn reports_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join("taskflow")
        .join("runs")
}

/// Load every readable report in `dir`, newest first. Unreadable files are skipped.
pub fn list_reports(dir: &Path) -> Result<Vec<BatchReport>, std::io::Error> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let mut results = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().is_some_and(|ext| ext == "json") {
            if let Ok(report) = BatchReport::read_from_file(&path) {
                results.push(report);
            }
        }
    }
    results.sort_by(|a, b| b.started_at.cmp(&a.started_at));
    Ok(results)
}

/// Find a saved report by id or unique id prefix.
pub fn find_report(dir: &Path, id: &str) -> Result<Option<BatchReport>, std::io::Error> {
    let exact = dir.join(format!("{}.json", id));
    if exact.exists() {
        return BatchReport::read_from_file(&exact).map(Some);
    }
    let mut matches: Vec<BatchReport> = list_reports(dir)?
        .into_iter()
        .filter(|r| r.batch_id.starts_with(id))
        .collect();
    if matches.len() == 1 {
        Ok(matches.pop())
    } else {
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::TaskRecord;
    use crate::task::TaskId;

    fn report(request: &str, status: TaskStatus) -> BatchReport {
        let now = Utc::now();
        let outcome = BatchOutcome::aggregate(vec![TaskRecord {
            task_id: TaskId::new("a"),
            executor_name: "echo".into(),
            status,
            result: "out".into(),
            started_at: now,
            finished_at: now,
            duration_ms: 3,
        }]);
        BatchReport::new(request, now, 1, ReflectionSummary::default(), outcome)
    }

    #[test]
    fn test_write_and_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let original = report("do things", TaskStatus::Completed);

        let path = original.write_to_dir(dir.path()).unwrap();
        assert!(path.ends_with(format!("{}.json", original.batch_id)));

        let loaded = BatchReport::read_from_file(&path).unwrap();
        assert_eq!(loaded, original);
    }

    #[test]
    fn test_list_and_find_by_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let ok = report("first", TaskStatus::Completed);
        let bad = report("second", TaskStatus::Failed);
        ok.write_to_dir(dir.path()).unwrap();
        bad.write_to_dir(dir.path()).unwrap();
        std::fs::write(dir.path().join("junk.json"), "not json").unwrap();

        let all = list_reports(dir.path()).unwrap();
        assert_eq!(all.len(), 2);

        let found = find_report(dir.path(), &bad.batch_id[..8]).unwrap().unwrap();
        assert_eq!(found.verdict(), BatchVerdict::Failure);
        assert!(find_report(dir.path(), "zzzz").unwrap().is_none());
    }

    #[test]
    fn test_summary_json_counts() {
        let summary = report("x", TaskStatus::Timeout).to_summary_json();
        assert_eq!(summary["verdict"], "failure");
        assert_eq!(summary["timeout"], 1);
        assert_eq!(summary["completed"], 0);
    }

    #[test]
    fn test_missing_dir_lists_nothing() {
        let dir = tempfile::tempdir().unwrap();
        assert!(list_reports(&dir.path().join("absent")).unwrap().is_empty());
    }
}
