//! Operator alerts.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::Serialize;
use tracing::{error, warn};

use crate::error::{GatewayError, GatewayResult};

/// Destination for fatal-condition notifications.
#[async_trait]
pub trait AlertSink: Send + Sync {
    async fn send(&self, subject: &str, body: &str) -> GatewayResult<()>;
}

/// Send an alert without waiting for it; failures are only logged.
pub fn notify(sink: &Arc<dyn AlertSink>, subject: impl Into<String>, body: impl Into<String>) {
    let sink = Arc::clone(sink);
    let subject = subject.into();
    let body = body.into();
    tokio::spawn(async move {
        if let Err(e) = sink.send(&subject, &body).await {
            warn!(error = %e, subject = %subject, "Alert delivery failed");
        }
    });
}

/// Writes alerts to the log at error level.
#[derive(Debug, Default, Clone)]
pub struct LogAlertSink;

#[async_trait]
impl AlertSink for LogAlertSink {
    async fn send(&self, subject: &str, body: &str) -> GatewayResult<()> {
        error!(subject, body, "ALERT");
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct WebhookPayload<'a> {
    subject: &'a str,
    body: &'a str,
    sent_at: String,
}

/// POSTs alerts as JSON to a webhook URL.
pub struct WebhookAlertSink {
    client: Client,
    url: String,
}

impl WebhookAlertSink {
    pub fn new(url: impl Into<String>, timeout: Duration) -> GatewayResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GatewayError::HttpClient(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl AlertSink for WebhookAlertSink {
    async fn send(&self, subject: &str, body: &str) -> GatewayResult<()> {
        // Mirrored to the log.
        error!(subject, body, "ALERT");

        let payload = WebhookPayload {
            subject,
            body,
            sent_at: Utc::now().to_rfc3339(),
        };
        let response = self
            .client
            .post(&self.url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| GatewayError::HttpClient(format!("Webhook request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}
