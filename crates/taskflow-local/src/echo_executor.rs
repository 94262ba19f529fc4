use std::time::Duration;

use taskflow_core::config::ExecutorConfig;
use taskflow_core::error::ExecutorError;
use taskflow_core::task::TaskRequest;
use taskflow_core::Executor;

/// Returns the prompt it was given. Used for dry runs of a plan.
pub struct EchoExecutor {
    config: ExecutorConfig,
}

impl EchoExecutor {
    pub fn new(config: ExecutorConfig) -> Self {
        Self { config }
    }
}

#[async_trait::async_trait]
impl Executor for EchoExecutor {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn executor_type(&self) -> &str {
        "echo"
    }

    fn quality_bearing(&self) -> bool {
        self.config.quality
    }

    fn include_request(&self) -> bool {
        self.config.include_request
    }

    fn timeout(&self) -> Option<Duration> {
        self.config.timeout()
    }

    async fn execute(&self, request: &TaskRequest) -> Result<String, ExecutorError> {
        Ok(request.prompt.clone())
    }
}
