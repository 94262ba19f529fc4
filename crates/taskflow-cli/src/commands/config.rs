use std::path::{Path, PathBuf};

use taskflow_core::Config;

const SAMPLE_CONFIG: &str = r#"# taskflow configuration
#
# Each executor receives the task prompt on stdin and returns its result
# on stdout. TASKFLOW_TASK_ID, TASKFLOW_EXECUTOR and TASKFLOW_DESCRIPTION
# are set in its environment.

executors:
  - name: researcher_agent
    type: command
    command: llm -m gpt-4o-mini
    quality: true
    timeout_secs: 300
    labels:
      - research

  - name: code_agent
    type: command
    command: llm -m gpt-4o
    quality: true
    include_request: true
    timeout_secs: 600
    labels:
      - code

  - name: report_agent
    type: command
    command: llm -m gpt-4o-mini
    quality: true
    labels:
      - writing

  - name: echo
    type: echo

# Reviews the combined results; reply must contain PROCEED or RETRY.
reflection:
  command: llm -m gpt-4o-mini
  min_quality_tasks: 2

defaults:
  max_concurrency: 3
  max_retries: 2
  task_timeout_secs: 900
  log_level: info
"#;

pub async fn run(override_path: Option<&Path>, path: bool, init: bool) -> anyhow::Result<()> {
    let config_path: PathBuf = override_path
        .map(Path::to_path_buf)
        .unwrap_or_else(Config::default_path);

    if path {
        println!("{}", config_path.display());
        return Ok(());
    }

    if init {
        if config_path.exists() {
            println!("Config already exists at: {}", config_path.display());
            println!("Remove it first if you want to reinitialize.");
            return Ok(());
        }

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&config_path, SAMPLE_CONFIG)?;
        println!("Sample config written to: {}", config_path.display());
        return Ok(());
    }

    println!("Config path: {}", config_path.display());
    if config_path.exists() {
        let config = Config::load_from(&config_path)?;
        println!("Executors:   {}", config.executors.len());
        for e in &config.executors {
            println!("  - {} ({})", e.name, e.executor_type);
        }
        match config.reflection {
            Some(ref r) => println!("Reflection:  {}", r.command),
            None => println!("Reflection:  off"),
        }
    } else {
        println!("Status:      not found");
        println!("Run `taskflow config --init` to create one.");
    }

    Ok(())
}
