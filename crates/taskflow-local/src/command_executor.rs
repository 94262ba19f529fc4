use std::collections::HashMap;
use std::process::Stdio;
use std::time::Duration;

use taskflow_core::config::ExecutorConfig;
use taskflow_core::error::ExecutorError;
use taskflow_core::task::TaskRequest;
use taskflow_core::Executor;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info};

/// Command executor: runs a shell command on the host for each task.
/// The prompt goes to stdin, the result is whatever the command prints.
pub struct CommandExecutor {
    config: ExecutorConfig,
    command: String,
}

impl CommandExecutor {
    pub fn new(config: ExecutorConfig) -> Result<Self, ExecutorError> {
        let command = config.command.clone().ok_or_else(|| {
            ExecutorError::Config(format!("executor '{}' has no command", config.name))
        })?;
        Ok(Self { config, command })
    }

    fn task_env(&self, request: &TaskRequest) -> HashMap<String, String> {
        let mut env = self.config.env.clone();
        env.insert("TASKFLOW_TASK_ID".into(), request.task_id.to_string());
        env.insert("TASKFLOW_EXECUTOR".into(), self.config.name.clone());
        env.insert("TASKFLOW_DESCRIPTION".into(), request.description.clone());
        env
    }
}

#[async_trait::async_trait]
impl Executor for CommandExecutor {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn executor_type(&self) -> &str {
        "command"
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
        debug!("Command exec for {}: {}", request.task_id, self.command);
        let output = run_shell(&self.command, &self.task_env(request), &request.prompt).await?;
        info!(
            "Task {} finished on {} ({} bytes)",
            request.task_id,
            self.config.name,
            output.len()
        );
        Ok(output)
    }
}

/// Run `sh -c <command>` with `input` on stdin and return trimmed stdout.
/// The child is killed if the returned future is dropped (timeouts).
pub(crate) async fn run_shell(
    command: &str,
    env: &HashMap<String, String>,
    input: &str,
) -> Result<String, ExecutorError> {
    let mut child = Command::new("sh")
        .arg("-c")
        .arg(command)
        .envs(env)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| ExecutorError::Process(format!("Failed to spawn: {}", e)))?;

    // Stdin is fed concurrently with output collection; a streaming filter
    // otherwise blocks on a full stdout pipe.
    let writer = child.stdin.take().map(|mut stdin| {
        let input = input.as_bytes().to_vec();
        tokio::spawn(async move {
            let res = stdin.write_all(&input).await;
            drop(stdin);
            res
        })
    });

    let output = child
        .wait_with_output()
        .await
        .map_err(|e| ExecutorError::Process(format!("Failed to wait: {}", e)))?;

    if let Some(writer) = writer {
        match writer.await {
            // A command that ignores stdin may close it early; that is not a failure.
            Ok(Err(e)) if e.kind() != std::io::ErrorKind::BrokenPipe => return Err(e.into()),
            Ok(_) => {}
            Err(e) => {
                return Err(ExecutorError::Process(format!("stdin writer failed: {}", e)));
            }
        }
    }

    if !output.status.success() {
        return Err(ExecutorError::NonZeroExit {
            code: output.status.code().unwrap_or(-1),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}
