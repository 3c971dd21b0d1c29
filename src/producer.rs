//! NATS producer for alert reports

use crate::types::alert::{AlertReport, Severity};
use anyhow::{Context, Result};
use async_nats::Client;
use tracing::debug;

/// Publishes recomputed alert reports
#[derive(Clone)]
pub struct AlertProducer {
    client: Client,
    subject: String,
}

impl AlertProducer {
    pub fn new(client: Client, subject: &str) -> Self {
        Self {
            client,
            subject: subject.to_string(),
        }
    }

    /// Publish a report as JSON
    pub async fn publish(&self, report: &AlertReport) -> Result<()> {
        let payload = serde_json::to_vec(report).context("Failed to encode alert report")?;

        self.client
            .publish(self.subject.clone(), payload.into())
            .await
            .with_context(|| format!("Failed to publish to {}", self.subject))?;

        debug!(
            report_id = %report.report_id,
            alerts = report.alerts.len(),
            critical = report.count(Severity::Critical),
            score = report.score.score,
            "Published alert report"
        );

        Ok(())
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }
}
