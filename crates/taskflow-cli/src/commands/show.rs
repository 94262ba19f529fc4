use taskflow_core::report::{find_report, reports_dir};
use taskflow_core::{BatchReport, TaskStatus};

pub async fn run(batch_id: &str, json: bool) -> anyhow::Result<()> {
    let report = match find_report(&reports_dir(), batch_id)? {
        Some(report) => report,
        None => anyhow::bail!("No saved report matches '{}'", batch_id),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    Ok(())
}

fn status_icon(status: TaskStatus) -> &'static str {
    match status {
        TaskStatus::Completed => "✅",
        TaskStatus::Failed => "❌",
        TaskStatus::Timeout => "⏱️",
        TaskStatus::Pending => "⏳",
    }
}

pub fn print_report(report: &BatchReport) {
    println!("Batch:    {}", report.batch_id);
    println!("Request:  {}", report.request);
    println!("Verdict:  {}", report.verdict());
    println!("Attempts: {}", report.attempts);
    if let Some(verdict) = report.reflection.last_verdict {
        println!("Review:   {}", verdict);
    }
    for warning in &report.reflection.warnings {
        println!("Warning:  {}", warning);
    }
    println!("Started:  {}", report.started_at);
    println!("Finished: {}", report.finished_at);
    println!();

    for record in &report.outcome.tasks {
        println!(
            "{}  {} ({}) {} in {}ms",
            status_icon(record.status),
            record.task_id,
            record.executor_name,
            record.status,
            record.duration_ms
        );
        for line in record.result.lines() {
            println!("     {}", line);
        }
        println!();
    }
}
