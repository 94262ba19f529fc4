use std::path::Path;

use taskflow_core::graph::{LintIssue, TaskGraph};
use taskflow_core::{Config, Plan};

/// Print every structural problem in the plan. Returns `true` when clean.
pub fn run(config: &Config, plan_path: &Path) -> anyhow::Result<bool> {
    let plan = Plan::load_from(plan_path)?;
    let task_count = plan.tasks.len();

    let issues = match collect_issues(config, plan) {
        Ok(issues) => issues,
        Err(e) => {
            println!("❌ {}", e);
            return Ok(false);
        }
    };

    if issues.is_empty() {
        println!("✅ Plan is valid ({} tasks)", task_count);
        return Ok(true);
    }

    println!("Found {} problem(s):", issues.len());
    for issue in &issues {
        println!("  - {}", issue);
    }
    Ok(false)
}

/// Graph lint plus executors the config does not define.
fn collect_issues(config: &Config, plan: Plan) -> Result<Vec<LintIssue>, taskflow_core::EngineError> {
    let graph = TaskGraph::from_tasks(plan.tasks)?;
    let mut issues = graph.lint();
    for task in graph.tasks() {
        if config.find_executor(&task.executor_name).is_none() {
            issues.push(LintIssue::UnknownExecutor {
                task_id: task.id.clone(),
                executor: task.executor_name.clone(),
            });
        }
    }
    Ok(issues)
}
