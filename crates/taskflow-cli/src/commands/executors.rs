use taskflow_core::config::{Config, ExecutorConfig};

pub async fn run(config: &Config, json: bool, labels: &[String]) -> anyhow::Result<()> {
    if config.executors.is_empty() {
        println!("No executors configured.");
        println!("Run `taskflow config --init` to create a sample config.");
        return Ok(());
    }

    let executors = config.find_by_labels(labels);
    if executors.is_empty() {
        println!("No executors carry label(s): {}", labels.join(", "));
        return Ok(());
    }

    if json {
        let entries: Vec<serde_json::Value> = executors.iter().map(|e| to_json(e)).collect();
        println!("{}", serde_json::to_string_pretty(&entries)?);
    } else {
        println!(
            "{:<20} {:<10} {:<8} {:<8} {}",
            "NAME", "TYPE", "QUALITY", "TIMEOUT", "LABELS"
        );
        println!("{}", "-".repeat(64));
        for e in &executors {
            println!(
                "{:<20} {:<10} {:<8} {:<8} {}",
                e.name,
                e.executor_type,
                if e.quality { "yes" } else { "no" },
                e.timeout_secs
                    .map(|s| format!("{}s", s))
                    .unwrap_or_else(|| "-".into()),
                e.labels.join(", "),
            );
        }
    }

    if let Some(ref reflection) = config.reflection {
        if !json {
            println!();
            println!(
                "Reflection: `{}` (needs {} quality tasks)",
                reflection.command, reflection.min_quality_tasks
            );
        }
    }

    Ok(())
}

fn to_json(e: &ExecutorConfig) -> serde_json::Value {
    serde_json::json!({
        "name": e.name,
        "type": e.executor_type.to_string(),
        "quality": e.quality,
        "timeout_secs": e.timeout_secs,
        "labels": e.labels,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: &str = r#"
executors:
  - name: researcher
    type: echo
    labels: [research, web]
  - name: coder
    type: echo
    labels: [code]
  - name: scraper
    type: echo
    labels: [web]
"#;

    fn names(executors: Vec<&ExecutorConfig>) -> Vec<&str> {
        executors.iter().map(|e| e.name.as_str()).collect()
    }

    #[test]
    fn test_label_filter_requires_every_label() {
        let config = Config::from_yaml(CONFIG).unwrap();
        assert_eq!(names(config.find_by_labels(&[])).len(), 3);
        assert_eq!(
            names(config.find_by_labels(&["web".to_string()])),
            vec!["researcher", "scraper"]
        );
        assert_eq!(
            names(config.find_by_labels(&["web".to_string(), "research".to_string()])),
            vec!["researcher"]
        );
        assert!(config.find_by_labels(&["gpu".to_string()]).is_empty());
    }

    #[test]
    fn test_json_entry_shape() {
        let config = Config::from_yaml(CONFIG).unwrap();
        let entry = to_json(&config.executors[1]);
        assert_eq!(entry["name"], "coder");
        assert_eq!(entry["type"], "echo");
        assert_eq!(entry["labels"][0], "code");
        assert!(entry["timeout_secs"].is_null());
    }
}
