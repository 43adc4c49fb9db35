//! Pulsewatch CLI
//!
//! A command-line tool for querying alerts, driving the alert lifecycle,
//! and inspecting the anomaly monitor.

mod client;
mod commands;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{alerts, investigate, lifecycle, stats};

/// Pulsewatch anomaly monitor CLI
#[derive(Parser)]
#[command(name = "pulse")]
#[command(author, version, about = "CLI for the pulsewatch anomaly monitor", long_about = None)]
pub struct Cli {
    /// Monitor API URL (can also be set via PULSE_API_URL env var)
    #[arg(long, env = "PULSE_API_URL", default_value = "http://localhost:8080")]
    pub api_url: String,

    /// Output format
    #[arg(long, short, default_value = "table")]
    pub format: output::OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List active (unresolved) alerts
    Alerts {
        /// Filter by metric name
        #[arg(long, short)]
        metric: Option<String>,

        /// Filter by severity (low, medium, high, critical)
        #[arg(long, short)]
        severity: Option<String>,

        /// Filter by anomaly type (spike, drop, outlier, ...)
        #[arg(long, short = 't', value_name = "TYPE")]
        anomaly_type: Option<String>,
    },

    /// List alert history
    History {
        /// Days of history to include
        #[arg(long, short, default_value = "1")]
        days: i64,

        /// Filter by metric name
        #[arg(long, short)]
        metric: Option<String>,

        /// Filter by severity
        #[arg(long, short)]
        severity: Option<String>,

        /// Filter by anomaly type
        #[arg(long, short = 't', value_name = "TYPE")]
        anomaly_type: Option<String>,
    },

    /// Acknowledge an alert
    Ack {
        /// Alert ID
        id: String,

        /// Operator name
        #[arg(long, default_value = "cli-user")]
        by: String,
    },

    /// Resolve an alert
    Resolve {
        /// Alert ID
        id: String,

        /// Resolution notes
        #[arg(long)]
        notes: Option<String>,
    },

    /// Show alert statistics
    Stats {
        /// Days to aggregate over
        #[arg(long, short, default_value = "1")]
        days: i64,
    },

    /// Show investigation context for an alert
    Investigate {
        /// Alert ID
        id: String,
    },

    /// List detection configs
    Configs,

    /// Show the last sweep summary
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize client
    let client = client::ApiClient::new(&cli.api_url)?;

    // Execute command
    match cli.command {
        Commands::Alerts {
            metric,
            severity,
            anomaly_type,
        } => {
            alerts::list_active(&client, metric, severity, anomaly_type, cli.format).await?;
        }
        Commands::History {
            days,
            metric,
            severity,
            anomaly_type,
        } => {
            alerts::list_history(&client, days, metric, severity, anomaly_type, cli.format)
                .await?;
        }
        Commands::Ack { id, by } => {
            lifecycle::acknowledge(&client, &id, &by, cli.format).await?;
        }
        Commands::Resolve { id, notes } => {
            lifecycle::resolve(&client, &id, notes, cli.format).await?;
        }
        Commands::Stats { days } => {
            stats::show_stats(&client, days, cli.format).await?;
        }
        Commands::Investigate { id } => {
            investigate::show_investigation(&client, &id, cli.format).await?;
        }
        Commands::Configs => {
            alerts::list_configs(&client, cli.format).await?;
        }
        Commands::Status => {
            stats::show_status(&client, cli.format).await?;
        }
    }

    Ok(())
}
