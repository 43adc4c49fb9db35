//! Alert investigation command

use anyhow::Result;
use colored::Colorize;
use tabled::Tabled;

use crate::client::{ApiClient, Investigation};
use crate::output::{
    color_severity, format_timestamp, truncate_id, OutputFormat,
};

/// Row for the similar-alerts table
#[derive(Tabled)]
struct SimilarRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Severity")]
    severity: String,
    #[tabled(rename = "Deviation")]
    deviation: String,
    #[tabled(rename = "Alerted")]
    alerted_at: String,
}

/// Show the investigation context for one alert
pub async fn show_investigation(client: &ApiClient, id: &str, format: OutputFormat) -> Result<()> {
    let path = format!("api/v1/alerts/{}/investigation", id);
    let investigation: Investigation = client.get(&path).await?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&investigation)?);
        }
        OutputFormat::Table => {
            let anomaly = &investigation.alert.anomaly;
            println!("{}", format!("Alert {}", investigation.alert.id).bold());
            println!(
                "  {} {} on {} ({:+.1}%)",
                color_severity(&anomaly.severity),
                anomaly.anomaly_type,
                anomaly.metric,
                anomaly.deviation_percent
            );
            println!("  {}", anomaly.description);

            println!("\n{}", "Timeline".bold());
            for entry in &investigation.timeline {
                println!(
                    "  {:<13} {}  {}",
                    entry.label,
                    format_timestamp(&entry.at),
                    entry.detail
                );
            }

            println!("\n{}", "Similar alerts (same metric and type, last 7d)".bold());
            if investigation.similar_alerts.is_empty() {
                println!("  none");
            } else {
                let rows: Vec<SimilarRow> = investigation
                    .similar_alerts
                    .iter()
                    .map(|alert| SimilarRow {
                        id: truncate_id(&alert.id),
                        severity: color_severity(&alert.anomaly.severity),
                        deviation: format!("{:+.1}%", alert.anomaly.deviation_percent),
                        alerted_at: format_timestamp(&alert.alerted_at),
                    })
                    .collect();
                let table = tabled::Table::new(rows)
                    .with(tabled::settings::Style::rounded())
                    .to_string();
                println!("{}", table);
            }

            println!(
                "\n{} {} points ending {}",
                "History:".bold(),
                investigation.history.len(),
                investigation
                    .history
                    .last()
                    .map(|p| p.date.clone())
                    .unwrap_or_else(|| "n/a".to_string())
            );
        }
    }

    Ok(())
}
