use std::sync::Arc;

use taskflow_core::config::{Config, ExecutorConfig, ExecutorType};
use taskflow_core::error::ExecutorError;
use taskflow_core::{Evaluator, Executor, ExecutorRegistry};
use taskflow_local::{CommandEvaluator, CommandExecutor, EchoExecutor};

/// Create an executor from an ExecutorConfig.
pub fn create_executor_from_config(
    exec_config: ExecutorConfig,
) -> Result<Arc<dyn Executor>, ExecutorError> {
    match exec_config.executor_type {
        ExecutorType::Command => Ok(Arc::new(CommandExecutor::new(exec_config)?)),
        ExecutorType::Echo => Ok(Arc::new(EchoExecutor::new(exec_config))),
    }
}

/// Build the name -> executor table for every configured executor.
pub fn build_registry(config: &Config) -> Result<ExecutorRegistry, ExecutorError> {
    let mut registry = ExecutorRegistry::new();
    for exec_config in &config.executors {
        registry.register(create_executor_from_config(exec_config.clone())?);
    }
    Ok(registry)
}

/// Reflection evaluator from config, if one is configured.
pub fn create_evaluator(config: &Config) -> Option<Arc<dyn Evaluator>> {
    config
        .reflection
        .as_ref()
        .map(|r| Arc::new(CommandEvaluator::new(r)) as Arc<dyn Evaluator>)
}
