use thiserror::Error;

/// Failure of a single executor or evaluator call. Never fatal to a batch:
/// the dispatcher records it as that task's result.
#[derive(Error, Debug)]
pub enum ExecutorError {
    #[error("Process error: {0}")]
    Process(String),

    #[error("Command exited with status {code}: {stderr}")]
    NonZeroExit { code: i32, stderr: String },

    #[error("Task timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("Executor panicked: {0}")]
    Panicked(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Structural failure of a batch. Aborts the batch without consuming a retry.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("Plan contains no tasks")]
    EmptyPlan,

    #[error("Duplicate task id: {0}")]
    DuplicateTaskId(String),

    #[error("Task '{task_id}' references unknown executor '{executor}'")]
    UnknownExecutor { task_id: String, executor: String },

    #[error("Task '{task_id}' depends on '{missing}', which is not part of the plan")]
    DanglingDependency { task_id: String, missing: String },

    #[error("Circular dependency: no runnable task among {}", unresolved.join(", "))]
    Cycle { unresolved: Vec<String> },

    #[error("Dispatch error: {0}")]
    Dispatch(String),
}

impl EngineError {
    /// Structural errors abort the whole batch; retries cannot change a graph's shape.
    pub fn is_structural(&self) -> bool {
        !matches!(self, EngineError::Dispatch(_))
    }
}

#[derive(Error, Debug)]
pub enum PlanError {
    #[error("No JSON object found in planner output")]
    NoJsonObject,

    #[error("Invalid plan JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
