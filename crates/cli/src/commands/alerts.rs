//! Alert listing commands

use anyhow::Result;
use tabled::Tabled;

use crate::client::{Alert, ApiClient, DetectionConfig};
use crate::output::{
    color_severity, color_status, format_deviation, format_timestamp, print_warning,
    truncate_id, OutputFormat,
};

/// Row for the alerts table
#[derive(Tabled)]
struct AlertRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Metric")]
    metric: String,
    #[tabled(rename = "Type")]
    anomaly_type: String,
    #[tabled(rename = "Severity")]
    severity: String,
    #[tabled(rename = "Deviation")]
    deviation: String,
    #[tabled(rename = "Alerted")]
    alerted_at: String,
    #[tabled(rename = "Status")]
    status: String,
}

/// Row for the configs table
#[derive(Tabled)]
struct ConfigRow {
    #[tabled(rename = "Metric")]
    metric: String,
    #[tabled(rename = "Enabled")]
    enabled: String,
    #[tabled(rename = "Sensitivity")]
    sensitivity: String,
    #[tabled(rename = "Algorithms")]
    algorithms: String,
    #[tabled(rename = "Channels")]
    channels: String,
}

fn alert_row(alert: &Alert) -> AlertRow {
    AlertRow {
        id: truncate_id(&alert.id),
        metric: alert.anomaly.metric.clone(),
        anomaly_type: alert.anomaly.anomaly_type.clone(),
        severity: color_severity(&alert.anomaly.severity),
        deviation: format_deviation(alert.anomaly.deviation_percent),
        alerted_at: format_timestamp(&alert.alerted_at),
        status: color_status(alert.status()),
    }
}

fn print_alerts(alerts: &[Alert], format: OutputFormat, empty_message: &str) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(alerts)?);
        }
        OutputFormat::Table => {
            if alerts.is_empty() {
                print_warning(empty_message);
                return Ok(());
            }

            let rows: Vec<AlertRow> = alerts.iter().map(alert_row).collect();
            let table = tabled::Table::new(rows)
                .with(tabled::settings::Style::rounded())
                .to_string();
            println!("{}", table);
            println!("\nTotal: {} alerts", alerts.len());
        }
    }

    Ok(())
}

fn filter_query(
    metric: Option<String>,
    severity: Option<String>,
    anomaly_type: Option<String>,
) -> String {
    let mut pairs = Vec::new();
    if let Some(metric) = metric {
        pairs.push(format!("metric={}", metric));
    }
    if let Some(severity) = severity {
        pairs.push(format!("severity={}", severity));
    }
    if let Some(anomaly_type) = anomaly_type {
        pairs.push(format!("type={}", anomaly_type));
    }
    if pairs.is_empty() {
        String::new()
    } else {
        format!("?{}", pairs.join("&"))
    }
}

/// List active (unresolved) alerts
pub async fn list_active(
    client: &ApiClient,
    metric: Option<String>,
    severity: Option<String>,
    anomaly_type: Option<String>,
    format: OutputFormat,
) -> Result<()> {
    let path = format!(
        "api/v1/alerts{}",
        filter_query(metric, severity, anomaly_type)
    );
    let alerts: Vec<Alert> = client.get(&path).await?;
    print_alerts(&alerts, format, "No active alerts")
}

/// List alert history over the last N days
pub async fn list_history(
    client: &ApiClient,
    days: i64,
    metric: Option<String>,
    severity: Option<String>,
    anomaly_type: Option<String>,
    format: OutputFormat,
) -> Result<()> {
    let end = chrono::Utc::now();
    let start = end - chrono::Duration::days(days);
    let mut path = format!(
        "api/v1/alerts/history?start={}&end={}",
        start.to_rfc3339(),
        end.to_rfc3339()
    );
    if let Some(metric) = metric {
        path.push_str(&format!("&metric={}", metric));
    }
    if let Some(severity) = severity {
        path.push_str(&format!("&severity={}", severity));
    }
    if let Some(anomaly_type) = anomaly_type {
        path.push_str(&format!("&type={}", anomaly_type));
    }

    let alerts: Vec<Alert> = client.get(&path).await?;
    print_alerts(&alerts, format, "No alerts in range")
}

/// List detection configs
pub async fn list_configs(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let configs: Vec<DetectionConfig> = client.get("api/v1/configs").await?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&configs)?);
        }
        OutputFormat::Table => {
            if configs.is_empty() {
                print_warning("No detection configs");
                return Ok(());
            }

            let rows: Vec<ConfigRow> = configs
                .iter()
                .map(|c| ConfigRow {
                    metric: c.metric.clone(),
                    enabled: if c.enabled { "✓".to_string() } else { String::new() },
                    sensitivity: c.sensitivity.to_string(),
                    algorithms: c.algorithms.join(", "),
                    channels: c.channels.join(", "),
                })
                .collect();

            let table = tabled::Table::new(rows)
                .with(tabled::settings::Style::rounded())
                .to_string();
            println!("{}", table);
        }
    }

    Ok(())
}
