use async_trait::async_trait;

use crate::models::MovementSummary;

use super::error::{DeliveryError, DeliveryResult};

#[async_trait]
pub trait MovementReporter: Send + Sync {
    async fn report(&self, summary: &MovementSummary) -> DeliveryResult<()>;
}

/// No transport exists for movement summaries yet; they are logged.
pub struct LoggingMovementReporter;

#[async_trait]
impl MovementReporter for LoggingMovementReporter {
    async fn report(&self, summary: &MovementSummary) -> DeliveryResult<()> {
        let body =
            serde_json::to_string(summary).map_err(|e| DeliveryError::Config(e.to_string()))?;
        log::info!("movement summary {body}");
        Ok(())
    }
}
