pub mod config;
pub mod context;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod executor;
pub mod graph;
pub mod outcome;
pub mod plan;
pub mod reflection;
pub mod registry;
pub mod report;
pub mod task;

pub use config::Config;
pub use engine::{Engine, EngineOptions};
pub use error::{EngineError, ExecutorError, PlanError};
pub use executor::{Evaluator, Executor};
pub use outcome::{BatchOutcome, BatchVerdict};
pub use plan::Plan;
pub use registry::ExecutorRegistry;
pub use report::BatchReport;
pub use task::{Task, TaskId, TaskRequest, TaskStatus};
