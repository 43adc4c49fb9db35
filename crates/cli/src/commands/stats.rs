//! Alert statistics and sweep status commands

use anyhow::Result;
use colored::Colorize;

use crate::client::{ApiClient, Statistics, SweepStatus};
use crate::output::{print_warning, OutputFormat};

/// Show alert statistics over the last N days
pub async fn show_stats(client: &ApiClient, days: i64, format: OutputFormat) -> Result<()> {
    let end = chrono::Utc::now();
    let start = end - chrono::Duration::days(days);
    let path = format!(
        "api/v1/alerts/statistics?start={}&end={}",
        start.to_rfc3339(),
        end.to_rfc3339()
    );

    let stats: Statistics = client.get(&path).await?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        OutputFormat::Table => {
            println!("{}", format!("Alert statistics (last {}d)", days).bold());
            println!("  Total:      {}", stats.total);
            println!("  Resolved:   {}", stats.resolved);
            println!("  Unresolved: {}", stats.unresolved);
            match stats.avg_resolution_minutes {
                Some(avg) => println!("  Avg resolution: {:.1} min", avg),
                None => println!("  Avg resolution: n/a"),
            }

            print_counts("By severity", &stats.by_severity);
            print_counts("By type", &stats.by_type);
            print_counts("By metric", &stats.by_metric);
        }
    }

    Ok(())
}

fn print_counts(title: &str, counts: &std::collections::HashMap<String, usize>) {
    if counts.is_empty() {
        return;
    }
    println!("\n{}", title.bold());
    let mut entries: Vec<_> = counts.iter().collect();
    entries.sort_by(|a, b| b.1.cmp(a.1).then(a.0.cmp(b.0)));
    for (key, count) in entries {
        println!("  {:<20} {}", key, count);
    }
}

/// Show the last sweep summary
pub async fn show_status(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let status: SweepStatus = client.get("api/v1/status").await?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&status)?);
        }
        OutputFormat::Table => match status.last_sweep {
            Some(sweep) => {
                println!("{}", "Last detection sweep".bold());
                println!("  Started:   {}", sweep.started_at);
                println!("  Duration:  {} ms", sweep.duration_ms);
                println!("  Processed: {}", sweep.metrics_processed);
                println!("  Skipped:   {}", sweep.metrics_skipped);
                println!("  Failed:    {}", sweep.metrics_failed);
                println!("  Anomalies: {}", sweep.anomalies_found);
            }
            None => print_warning("No sweep has completed yet"),
        },
    }

    Ok(())
}
