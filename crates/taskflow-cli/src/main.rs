use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use taskflow_core::Config;
use tracing_subscriber::EnvFilter;

mod commands;
mod dispatch;

#[derive(Parser)]
#[command(name = "taskflow")]
#[command(about = "Run dependency-ordered task plans against named executors", long_about = None)]
struct Cli {
    /// Config file (defaults to ~/.config/taskflow/config.yaml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log level when RUST_LOG is not set
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a plan
    Run {
        /// Plan file (planner JSON output)
        plan: PathBuf,

        /// Original request the plan was made for
        #[arg(short, long)]
        request: String,

        /// Maximum tasks running at once
        #[arg(long)]
        max_concurrency: Option<usize>,

        /// Maximum full-batch retries requested by reflection
        #[arg(long)]
        max_retries: Option<u32>,

        /// Skip quality reflection even if configured
        #[arg(long)]
        no_reflection: bool,

        /// Output the report as JSON
        #[arg(short, long)]
        json: bool,

        /// Save the report under the runs directory
        #[arg(short, long)]
        save: bool,
    },

    /// Check a plan for structural problems without running it
    Validate {
        /// Plan file
        plan: PathBuf,
    },

    /// List configured executors
    Executors {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,

        /// Only executors carrying this label (repeatable, all must match)
        #[arg(short, long = "label")]
        labels: Vec<String>,
    },

    /// Show or initialize the config file
    Config {
        /// Print the config path only
        #[arg(long)]
        path: bool,

        /// Write a sample config
        #[arg(long)]
        init: bool,
    },

    /// List saved batch reports
    Runs {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,

        /// Output as JSONL
        #[arg(long)]
        jsonl: bool,

        /// Only reports with this verdict (success, failure)
        #[arg(long)]
        verdict: Option<String>,
    },

    /// Show a saved batch report
    Show {
        /// Batch ID or unique prefix
        batch_id: String,

        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },
}

fn load_config(path: Option<&PathBuf>, log_level: Option<&str>) -> Result<Config> {
    let config = match path {
        Some(path) => Config::load_from(path)?,
        None => Config::load_default()?,
    };
    init_logging(log_level.unwrap_or(&config.defaults.log_level));
    Ok(config)
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config_path = cli.config.as_ref();
    let log_level = cli.log_level.as_deref();

    match cli.command {
        Commands::Run {
            plan,
            request,
            max_concurrency,
            max_retries,
            no_reflection,
            json,
            save,
        } => {
            let config = load_config(config_path, log_level)?;
            let opts = commands::run::RunOpts {
                max_concurrency,
                max_retries,
                no_reflection,
                json,
                save,
            };
            let success = commands::run::run(&config, &plan, &request, opts).await?;
            if !success {
                std::process::exit(2);
            }
        }
        Commands::Validate { plan } => {
            let config = load_config(config_path, log_level)?;
            if !commands::validate::run(&config, &plan)? {
                std::process::exit(1);
            }
        }
        Commands::Executors { json, labels } => {
            let config = load_config(config_path, log_level)?;
            commands::executors::run(&config, json, &labels).await?;
        }
        Commands::Config { path, init } => {
            commands::config::run(cli.config.as_deref(), path, init).await?;
        }
        Commands::Runs {
            json,
            jsonl,
            verdict,
        } => {
            commands::runs::run(json, jsonl, verdict).await?;
        }
        Commands::Show { batch_id, json } => {
            commands::show::run(&batch_id, json).await?;
        }
    }

    Ok(())
}
