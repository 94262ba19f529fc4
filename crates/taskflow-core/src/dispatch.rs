use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use chrono::Utc;
use futures::FutureExt;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::context::{build_request, ExecutionContext, TaskRecord};
use crate::error::{EngineError, ExecutorError};
use crate::executor::Executor;
use crate::graph::TaskGraph;
use crate::registry::ExecutorRegistry;
use crate::task::{Task, TaskStatus};

/// Runs one ready set with at most `max_concurrency` executor calls in flight.
pub struct Dispatcher {
    max_concurrency: usize,
    default_timeout: Option<Duration>,
}

/// Everything a worker needs, shared across the ready set.
struct Shared {
    graph: Arc<TaskGraph>,
    context: Arc<Mutex<ExecutionContext>>,
    original_request: Arc<str>,
}

impl Dispatcher {
    pub fn new(max_concurrency: usize, default_timeout: Option<Duration>) -> Self {
        Self {
            max_concurrency: max_concurrency.max(1),
            default_timeout,
        }
    }

    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    /// Execute every task in `ready` and wait for all of them.
    ///
    /// Each task's record is published into `context` as soon as it finishes.
    /// Executor failures, timeouts and panics become that task's record and
    /// never abort siblings. Only an internal join failure is returned as `Err`.
    pub async fn dispatch(
        &self,
        ready: &[&Task],
        graph: &Arc<TaskGraph>,
        registry: &ExecutorRegistry,
        context: &Arc<Mutex<ExecutionContext>>,
        original_request: &Arc<str>,
    ) -> Result<(), EngineError> {
        let sem = Arc::new(Semaphore::new(self.max_concurrency));
        let mut workers = JoinSet::new();

        for task in ready {
            let executor = registry.get(&task.executor_name).cloned().ok_or_else(|| {
                EngineError::UnknownExecutor {
                    task_id: task.id.to_string(),
                    executor: task.executor_name.clone(),
                }
            })?;

            let task = (*task).clone();
            let sem = sem.clone();
            let timeout = executor.timeout().or(self.default_timeout);
            let shared = Shared {
                graph: graph.clone(),
                context: context.clone(),
                original_request: original_request.clone(),
            };

            workers.spawn(async move {
                let _permit = sem
                    .acquire_owned()
                    .await
                    .map_err(|_| EngineError::Dispatch("semaphore closed unexpectedly".into()))?;

                let record = run_task(&task, executor, timeout, &shared).await;
                publish(&shared.context, record)
            });
        }

        while let Some(joined) = workers.join_next().await {
            joined.map_err(|e| EngineError::Dispatch(e.to_string()))??;
        }

        Ok(())
    }
}

fn publish(context: &Mutex<ExecutionContext>, record: TaskRecord) -> Result<(), EngineError> {
    let mut ctx = context
        .lock()
        .map_err(|_| EngineError::Dispatch("execution context lock poisoned".into()))?;
    ctx.publish(record);
    Ok(())
}

async fn run_task(
    task: &Task,
    executor: Arc<dyn Executor>,
    timeout: Option<Duration>,
    shared: &Shared,
) -> TaskRecord {
    let request = {
        let original = executor
            .include_request()
            .then(|| shared.original_request.as_ref());
        match shared.context.lock() {
            Ok(ctx) => build_request(task, &shared.graph, &ctx, original),
            Err(poisoned) => build_request(task, &shared.graph, &poisoned.into_inner(), original),
        }
    };

    info!("Executing task {} ({})", task.id, task.executor_name);
    debug!("Prompt for {}: {}", task.id, request.prompt);

    let started_at = Utc::now();
    let clock = Instant::now();

    let call = AssertUnwindSafe(executor.execute(&request)).catch_unwind();
    let outcome = match timeout {
        Some(limit) => match tokio::time::timeout(limit, call).await {
            Ok(res) => res,
            Err(_) => Ok(Err(ExecutorError::Timeout(limit))),
        },
        None => call.await,
    };

    let outcome = outcome.unwrap_or_else(|panic| Err(ExecutorError::Panicked(panic_message(panic))));

    let (status, result) = match outcome {
        Ok(output) => {
            info!("Task {} completed", task.id);
            (TaskStatus::Completed, output)
        }
        Err(ExecutorError::Timeout(limit)) => {
            warn!("Task {} timed out after {:?}", task.id, limit);
            (
                TaskStatus::Timeout,
                format!("Error: task timed out after {:?}", limit),
            )
        }
        Err(e) => {
            warn!("Task {} failed: {}", task.id, e);
            (TaskStatus::Failed, format!("Error: {}", e))
        }
    };

    TaskRecord {
        task_id: task.id.clone(),
        executor_name: task.executor_name.clone(),
        status,
        result,
        started_at,
        finished_at: Utc::now(),
        duration_ms: clock.elapsed().as_millis() as u64,
    }
}

pub(crate) fn panic_message(panic: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
