use std::collections::HashMap;

use taskflow_core::config::ReflectionConfig;
use taskflow_core::error::ExecutorError;
use taskflow_core::Evaluator;
use tracing::debug;

use crate::command_executor::run_shell;

/// Reflection evaluator backed by a shell command. The review prompt goes to
/// stdin; the command's stdout is scanned for PROCEED / RETRY by the engine.
pub struct CommandEvaluator {
    command: String,
    env: HashMap<String, String>,
}

impl CommandEvaluator {
    pub fn new(config: &ReflectionConfig) -> Self {
        Self {
            command: config.command.clone(),
            env: config.env.clone(),
        }
    }
}

pub fn review_prompt(original_request: &str, results_summary: &str) -> String {
    format!(
        "Original Request: {}\n\nTask Results:\n{}\n\nPlease evaluate the quality and completeness of these results.",
        original_request, results_summary
    )
}

#[async_trait::async_trait]
impl Evaluator for CommandEvaluator {
    async fn evaluate(
        &self,
        original_request: &str,
        results_summary: &str,
    ) -> Result<String, ExecutorError> {
        let prompt = review_prompt(original_request, results_summary);
        debug!("Reflection command: {}", self.command);
        run_shell(&self.command, &self.env, &prompt).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_review_prompt_layout() {
        let prompt = review_prompt("study EVs", "Task: a (r)\nResult: ok");
        assert!(prompt.starts_with("Original Request: study EVs\n\nTask Results:\nTask: a (r)"));
        assert!(prompt.ends_with("Please evaluate the quality and completeness of these results."));
    }

    #[tokio::test]
    async fn test_command_sees_prompt() {
        let evaluator = CommandEvaluator::new(&ReflectionConfig {
            command: "grep -q 'Result: ok' && echo PROCEED || echo RETRY".into(),
            env: HashMap::new(),
            min_quality_tasks: 2,
        });
        let text = evaluator.evaluate("req", "Task: a (r)\nResult: ok").await.unwrap();
        assert_eq!(text, "PROCEED");

        let text = evaluator.evaluate("req", "Task: a (r)\nResult: bad").await.unwrap();
        assert_eq!(text, "RETRY");
    }
}
