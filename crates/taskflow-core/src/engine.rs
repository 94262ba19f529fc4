use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use tracing::{info, warn};

use crate::config::Defaults;
use crate::context::{ExecutionContext, TaskRecord};
use crate::dispatch::Dispatcher;
use crate::error::EngineError;
use crate::executor::Evaluator;
use crate::graph::TaskGraph;
use crate::outcome::BatchOutcome;
use crate::reflection::{GateDecision, ReflectionGate};
use crate::registry::ExecutorRegistry;
use crate::report::{BatchReport, ReflectionSummary};
use crate::task::{Task, TaskId};

pub const DEFAULT_MAX_CONCURRENCY: usize = 3;
pub const DEFAULT_MAX_RETRIES: u32 = 2;
pub const DEFAULT_MIN_QUALITY_TASKS: usize = 2;

#[derive(Debug, Clone)]
pub struct EngineOptions {
    /// Executor calls allowed in flight within one ready set
    pub max_concurrency: usize,

    /// Extra full-batch attempts reflection may request (total = max_retries + 1)
    pub max_retries: u32,

    /// Deadline for executors that do not set their own
    pub task_timeout: Option<Duration>,

    /// Quality-bearing tasks needed before reflection runs
    pub min_quality_tasks: usize,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            max_retries: DEFAULT_MAX_RETRIES,
            task_timeout: None,
            min_quality_tasks: DEFAULT_MIN_QUALITY_TASKS,
        }
    }
}

impl From<&Defaults> for EngineOptions {
    fn from(defaults: &Defaults) -> Self {
        Self {
            max_concurrency: defaults.max_concurrency,
            max_retries: defaults.max_retries,
            task_timeout: defaults.task_timeout_secs.map(Duration::from_secs),
            min_quality_tasks: DEFAULT_MIN_QUALITY_TASKS,
        }
    }
}

/// Runs a batch of tasks: ready-set loop per attempt, reflection after each
/// attempt, whole-batch restarts while reflection asks for them.
pub struct Engine {
    registry: ExecutorRegistry,
    dispatcher: Dispatcher,
    gate: ReflectionGate,
    max_retries: u32,
    min_quality_tasks: usize,
}

impl Engine {
    pub fn new(registry: ExecutorRegistry, options: EngineOptions) -> Self {
        Self {
            registry,
            dispatcher: Dispatcher::new(options.max_concurrency, options.task_timeout),
            gate: ReflectionGate::new(None, options.min_quality_tasks),
            max_retries: options.max_retries,
            min_quality_tasks: options.min_quality_tasks,
        }
    }

    /// Enable reflection. Without an evaluator every attempt is accepted as is.
    pub fn with_evaluator(mut self, evaluator: Arc<dyn Evaluator>) -> Self {
        self.gate = ReflectionGate::new(Some(evaluator), self.min_quality_tasks);
        self
    }

    /// Run the plan to completion.
    ///
    /// Per-task failures are reported inside the returned report. Only
    /// structural problems (duplicate ids, unknown executors, cycles,
    /// dangling dependencies) come back as `Err`, and they are never retried.
    pub async fn run(&self, tasks: Vec<Task>, original_request: &str) -> Result<BatchReport, EngineError> {
        let started_at = Utc::now();
        let graph = Arc::new(TaskGraph::from_tasks(tasks)?);
        self.check_executors(&graph)?;

        let request: Arc<str> = Arc::from(original_request);
        let mut reflection = ReflectionSummary::default();
        let mut attempts = 0;
        let mut records = Vec::new();

        for attempt in 0..=self.max_retries {
            attempts = attempt + 1;
            if attempt == 0 {
                info!("Starting batch of {} task(s)", graph.len());
            } else {
                info!("Retry attempt {}/{}", attempts, self.max_retries + 1);
            }

            // Fresh context and status set every attempt; nothing carries over.
            records = self.run_attempt(&graph, &request).await?;

            let decision = self
                .gate
                .review(
                    &graph,
                    &self.registry,
                    original_request,
                    &records,
                    attempt < self.max_retries,
                )
                .await;
            reflection.last_verdict = decision.verdict().or(reflection.last_verdict);

            match decision {
                GateDecision::Restart => {
                    info!("Restarting batch from the beginning");
                    continue;
                }
                GateDecision::AcceptWithWarning { reason, .. } => {
                    reflection.warnings.push(reason);
                    break;
                }
                GateDecision::Skipped | GateDecision::Accept => break,
            }
        }

        let outcome = BatchOutcome::aggregate(records);
        if outcome.is_success() {
            info!("Batch finished: all {} task(s) completed", outcome.tasks.len());
        } else {
            warn!(
                "Batch finished with {} unsuccessful task(s)",
                outcome.failed_tasks().len()
            );
        }

        Ok(BatchReport::new(
            original_request,
            started_at,
            attempts,
            reflection,
            outcome,
        ))
    }

    /// Every task must name a registered executor before anything runs.
    fn check_executors(&self, graph: &TaskGraph) -> Result<(), EngineError> {
        match graph
            .tasks()
            .iter()
            .find(|t| !self.registry.contains(&t.executor_name))
        {
            Some(task) => Err(EngineError::UnknownExecutor {
                task_id: task.id.to_string(),
                executor: task.executor_name.clone(),
            }),
            None => Ok(()),
        }
    }

    /// One pass over the whole graph.
    ///
    /// Any terminal status unblocks dependents, so a failed task feeds its
    /// error text forward rather than halting the graph. Each ready set is
    /// fully joined before the next is computed.
    async fn run_attempt(
        &self,
        graph: &Arc<TaskGraph>,
        original_request: &Arc<str>,
    ) -> Result<Vec<TaskRecord>, EngineError> {
        let context = Arc::new(Mutex::new(ExecutionContext::new()));
        let mut known: HashSet<TaskId> = HashSet::with_capacity(graph.len());

        while known.len() < graph.len() {
            let ready = graph.ready_set(&known);
            if ready.is_empty() {
                let err = graph.diagnose_stall(&known);
                warn!("Batch stalled: {}", err);
                return Err(err);
            }

            if ready.len() > 1 {
                info!(
                    "Executing {} tasks in parallel (limit {})",
                    ready.len(),
                    self.dispatcher.max_concurrency()
                );
            }

            self.dispatcher
                .dispatch(&ready, graph, &self.registry, &context, original_request)
                .await?;

            known.extend(ready.iter().map(|t| t.id.clone()));
        }

        let mut guard = context
            .lock()
            .map_err(|_| EngineError::Dispatch("execution context lock poisoned".into()))?;
        Ok(std::mem::take(&mut *guard).into_records())
    }
}
