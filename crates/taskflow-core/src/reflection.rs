use futures::FutureExt;
use serde::{Deserialize, Serialize};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::context::{results_summary, TaskRecord};
use crate::dispatch::panic_message;
use crate::error::ExecutorError;
use crate::executor::Evaluator;
use crate::graph::TaskGraph;
use crate::registry::ExecutorRegistry;

pub const PROCEED_MARKER: &str = "PROCEED";
pub const RETRY_MARKER: &str = "RETRY";

/// Evaluator's judgement of one attempt.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Approve,
    Retry,
    Inconclusive,
}

impl Verdict {
    /// Case-insensitive marker scan. `PROCEED` wins when both markers appear.
    pub fn classify(text: &str) -> Self {
        let upper = text.to_uppercase();
        if upper.contains(PROCEED_MARKER) {
            Verdict::Approve
        } else if upper.contains(RETRY_MARKER) {
            Verdict::Retry
        } else {
            Verdict::Inconclusive
        }
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Verdict::Approve => write!(f, "approve"),
            Verdict::Retry => write!(f, "retry"),
            Verdict::Inconclusive => write!(f, "inconclusive"),
        }
    }
}

/// What the retry loop should do after an attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    /// Reflection does not apply to this batch; accept unconditionally.
    Skipped,
    /// Evaluator approved the results.
    Accept,
    /// Evaluator asked for another attempt and attempts remain.
    Restart,
    /// Accept current results despite an inconclusive, failed or exhausted review.
    AcceptWithWarning { verdict: Verdict, reason: String },
}

impl GateDecision {
    pub fn verdict(&self) -> Option<Verdict> {
        match self {
            GateDecision::Skipped => None,
            GateDecision::Accept => Some(Verdict::Approve),
            GateDecision::Restart => Some(Verdict::Retry),
            GateDecision::AcceptWithWarning { verdict, .. } => Some(*verdict),
        }
    }
}

/// Quality gate run once per attempt.
#[derive(Clone)]
pub struct ReflectionGate {
    evaluator: Option<Arc<dyn Evaluator>>,
    min_quality_tasks: usize,
}

impl ReflectionGate {
    pub fn new(evaluator: Option<Arc<dyn Evaluator>>, min_quality_tasks: usize) -> Self {
        Self {
            evaluator,
            min_quality_tasks,
        }
    }

    /// Reflection runs only for batches with enough quality-bearing tasks.
    pub fn applies(&self, graph: &TaskGraph, registry: &ExecutorRegistry) -> bool {
        if self.evaluator.is_none() {
            return false;
        }

        let quality_tasks = graph
            .tasks()
            .iter()
            .filter(|t| {
                registry
                    .get(&t.executor_name)
                    .is_some_and(|e| e.quality_bearing())
            })
            .count();

        quality_tasks >= self.min_quality_tasks
    }

    /// Review one finished attempt. `attempts_remain` is false on the last attempt.
    pub async fn review(
        &self,
        graph: &TaskGraph,
        registry: &ExecutorRegistry,
        original_request: &str,
        records: &[TaskRecord],
        attempts_remain: bool,
    ) -> GateDecision {
        if !self.applies(graph, registry) {
            return GateDecision::Skipped;
        }
        let Some(evaluator) = &self.evaluator else {
            return GateDecision::Skipped;
        };

        info!("Running quality reflection over {} task result(s)", records.len());
        let summary = results_summary(records);

        let review = AssertUnwindSafe(evaluator.evaluate(original_request, &summary))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| Err(ExecutorError::Panicked(panic_message(panic))));

        let text = match review {
            Ok(text) => text,
            Err(e) => {
                warn!("Reflection failed, keeping current results: {}", e);
                return GateDecision::AcceptWithWarning {
                    verdict: Verdict::Inconclusive,
                    reason: format!("reflection failed: {}", e),
                };
            }
        };
        debug!("Reflection output: {}", text);

        match Verdict::classify(&text) {
            Verdict::Approve => {
                info!("Reflection approved results");
                GateDecision::Accept
            }
            Verdict::Retry if attempts_remain => {
                info!("Reflection requested a retry");
                GateDecision::Restart
            }
            Verdict::Retry => {
                warn!("Max retries reached, proceeding with current results");
                GateDecision::AcceptWithWarning {
                    verdict: Verdict::Retry,
                    reason: "max retries reached".to_string(),
                }
            }
            Verdict::Inconclusive => {
                warn!("Reflection result unclear, proceeding with current results");
                GateDecision::AcceptWithWarning {
                    verdict: Verdict::Inconclusive,
                    reason: "reflection result unclear".to_string(),
                }
            }
        }
    }
}
