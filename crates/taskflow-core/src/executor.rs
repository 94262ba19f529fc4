use crate::error::ExecutorError;
use crate::task::TaskRequest;
use std::time::Duration;

/// A named capability that performs one kind of task.
/// Implementations must return failures as `Err`, never panic on bad input.
#[async_trait::async_trait]
pub trait Executor: Send + Sync {
    /// Name tasks use to address this executor (from config).
    fn name(&self) -> &str;

    /// Executor type string ("command", "echo", ...).
    fn executor_type(&self) -> &str;

    /// Whether tasks on this executor count toward the reflection predicate.
    fn quality_bearing(&self) -> bool {
        false
    }

    /// Whether the original request should be prepended to the prompt.
    fn include_request(&self) -> bool {
        false
    }

    /// Per-executor deadline. Overrides the engine default when set.
    fn timeout(&self) -> Option<Duration> {
        None
    }

    async fn execute(&self, request: &TaskRequest) -> Result<String, ExecutorError>;
}

/// Quality evaluator consulted after a full attempt. Returns free text that
/// is scanned for `PROCEED` / `RETRY`.
#[async_trait::async_trait]
pub trait Evaluator: Send + Sync {
    async fn evaluate(
        &self,
        original_request: &str,
        results_summary: &str,
    ) -> Result<String, ExecutorError>;
}
