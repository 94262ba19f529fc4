use taskflow_core::report::{list_reports, reports_dir};
use taskflow_core::BatchVerdict;

pub async fn run(json: bool, jsonl: bool, verdict_filter: Option<String>) -> anyhow::Result<()> {
    let mut reports = list_reports(&reports_dir())?;

    if let Some(ref verdict_str) = verdict_filter {
        let target = parse_verdict(verdict_str)?;
        reports.retain(|r| r.verdict() == target);
    }

    if jsonl {
        for report in &reports {
            println!("{}", report.to_jsonl_line());
        }
    } else if json {
        let entries: Vec<_> = reports.iter().map(|r| r.to_summary_json()).collect();
        println!("{}", serde_json::to_string_pretty(&entries)?);
    } else {
        if reports.is_empty() {
            println!("No saved runs.");
            return Ok(());
        }
        println!(
            "{:<38} {:<8} {:<9} {:<6} {:<20} {}",
            "BATCH ID", "VERDICT", "ATTEMPTS", "TASKS", "STARTED", "REQUEST"
        );
        println!("{}", "-".repeat(100));
        for report in &reports {
            println!(
                "{:<38} {:<8} {:<9} {:<6} {:<20} {}",
                report.batch_id,
                report.verdict(),
                report.attempts,
                report.outcome.tasks.len(),
                report.started_at.format("%Y-%m-%d %H:%M:%S"),
                truncate(&report.request, 40),
            );
        }
    }

    Ok(())
}

fn parse_verdict(s: &str) -> anyhow::Result<BatchVerdict> {
    match s.to_lowercase().as_str() {
        "success" => Ok(BatchVerdict::Success),
        "failure" => Ok(BatchVerdict::Failure),
        other => anyhow::bail!("Unknown verdict '{}' (expected success or failure)", other),
    }
}

fn truncate(s: &str, max: usize) -> String {
    let first_line = s.lines().next().unwrap_or("");
    if first_line.chars().count() > max {
        let cut: String = first_line.chars().take(max - 3).collect();
        format!("{}...", cut)
    } else {
        first_line.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_verdict() {
        assert_eq!(parse_verdict("Success").unwrap(), BatchVerdict::Success);
        assert_eq!(parse_verdict("failure").unwrap(), BatchVerdict::Failure);
        assert!(parse_verdict("maybe").is_err());
    }

    #[test]
    fn test_truncate_keeps_first_line() {
        assert_eq!(truncate("short\nsecond", 40), "short");
        assert_eq!(truncate("abcdefghij", 8), "abcde...");
    }
}
