use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};

use crate::models::AlertPayload;

use super::error::{DeliveryError, DeliveryResult};

const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

#[async_trait]
pub trait AlertSender: Send + Sync {
    async fn send(&self, alert: &AlertPayload) -> DeliveryResult<()>;
}

/// Posts the alert JSON to the care backend. Only `200 OK` counts as sent.
pub struct HttpAlertSender {
    http: Client,
    url: String,
}

impl HttpAlertSender {
    pub fn new(url: impl Into<String>, timeout: Duration) -> DeliveryResult<Self> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            url: url.into(),
        })
    }
}

#[async_trait]
impl AlertSender for HttpAlertSender {
    async fn send(&self, alert: &AlertPayload) -> DeliveryResult<()> {
        let response = self
            .http
            .post(&self.url)
            .json(alert)
            .send()
            .await
            .map_err(|e| DeliveryError::AlertDelivery(e.to_string()))?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            log_warn!("alert endpoint answered {status}: {body}");
            return Err(DeliveryError::AlertDelivery(format!(
                "backend returned {status}"
            )));
        }

        log_info!("alert sent for event {}", alert.trigger_time);
        Ok(())
    }
}

/// Logs the alert instead of sending it (dry runs).
pub struct LoggingAlertSender;

#[async_trait]
impl AlertSender for LoggingAlertSender {
    async fn send(&self, alert: &AlertPayload) -> DeliveryResult<()> {
        let body = serde_json::to_string(alert)
            .map_err(|e| DeliveryError::AlertDelivery(e.to_string()))?;
        log::info!("[dry-run] alert {body}");
        Ok(())
    }
}
