//! Alert lifecycle commands

use anyhow::Result;

use crate::client::{AcknowledgeRequest, Alert, ApiClient, ResolveRequest};
use crate::output::{print_success, OutputFormat};

/// Acknowledge an alert
pub async fn acknowledge(
    client: &ApiClient,
    id: &str,
    by: &str,
    format: OutputFormat,
) -> Result<()> {
    let path = format!("api/v1/alerts/{}/acknowledge", id);
    let request = AcknowledgeRequest { by: by.to_string() };

    let alert: Alert = client.post(&path, &request).await?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&alert)?);
        }
        OutputFormat::Table => {
            print_success(&format!("Alert {} acknowledged by {}", id, by));
        }
    }

    Ok(())
}

/// Resolve an alert with optional notes
pub async fn resolve(
    client: &ApiClient,
    id: &str,
    notes: Option<String>,
    format: OutputFormat,
) -> Result<()> {
    let path = format!("api/v1/alerts/{}/resolve", id);
    let request = ResolveRequest { notes };

    let alert: Alert = client.post(&path, &request).await?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&alert)?);
        }
        OutputFormat::Table => {
            print_success(&format!("Alert {} resolved", id));
            if let Some(notes) = &alert.resolution_notes {
                println!("Notes: {}", notes);
            }
        }
    }

    Ok(())
}
