use std::path::Path;

use taskflow_core::report::reports_dir;
use taskflow_core::{Config, Engine, EngineOptions, Plan};
use tracing::info;

use super::show::print_report;
use crate::dispatch;

pub struct RunOpts {
    pub max_concurrency: Option<usize>,
    pub max_retries: Option<u32>,
    pub no_reflection: bool,
    pub json: bool,
    pub save: bool,
}

/// Returns whether every task completed.
pub async fn run(
    config: &Config,
    plan_path: &Path,
    request: &str,
    opts: RunOpts,
) -> anyhow::Result<bool> {
    let plan = Plan::load_from(plan_path)?;
    let engine = build_engine(config, &opts)?;

    let report = engine.run(plan.tasks, request).await?;

    if opts.save {
        let path = report.write_to_dir(&reports_dir())?;
        info!("Report saved to {}", path.display());
    }

    if opts.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    Ok(report.outcome.is_success())
}

fn engine_options(config: &Config, opts: &RunOpts) -> EngineOptions {
    let mut options = EngineOptions::from(&config.defaults);
    if let Some(n) = opts.max_concurrency {
        options.max_concurrency = n;
    }
    if let Some(n) = opts.max_retries {
        options.max_retries = n;
    }
    if let Some(ref reflection) = config.reflection {
        options.min_quality_tasks = reflection.min_quality_tasks;
    }
    options
}

fn build_engine(config: &Config, opts: &RunOpts) -> anyhow::Result<Engine> {
    let registry = dispatch::build_registry(config)?;
    let engine = Engine::new(registry, engine_options(config, opts));

    match dispatch::create_evaluator(config) {
        Some(evaluator) if !opts.no_reflection => Ok(engine.with_evaluator(evaluator)),
        _ => Ok(engine),
    }
}
