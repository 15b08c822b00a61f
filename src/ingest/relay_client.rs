use anyhow::{Context, Result};
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::debug;

use crate::core::config::ScraperConfig;
use crate::core::error::DeliveryError;
use crate::core::types::TokenRecord;

/// Acknowledgment body returned by the relay on a stored record.
#[derive(Debug, Deserialize)]
pub struct Ack {
    pub success: bool,
}

/// Write path into the relay process: one authenticated POST per admitted
/// record. No retry lives here; the pipeline decides what a failure means.
pub struct RelayClient {
    client: reqwest::Client,
    endpoint: String,
    bearer_token: String,
}

impl RelayClient {
    pub fn new(config: &ScraperConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.delivery_timeout)
            .build()
            .context("failed to build relay client")?;
        Ok(Self {
            client,
            endpoint: format!("{}/api/token", config.backend_url.trim_end_matches('/')),
            bearer_token: config.scraper_token.clone(),
        })
    }

    pub async fn deliver(&self, record: &TokenRecord) -> Result<Ack, DeliveryError> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.bearer_token)
            .json(record)
            .send()
            .await?;

        match response.status() {
            status if status.is_success() => {
                let ack = response.json().await.unwrap_or(Ack { success: true });
                debug!(contract = %record.contract, "record delivered");
                Ok(ack)
            }
            StatusCode::UNAUTHORIZED => Err(DeliveryError::Unauthorized),
            status => Err(DeliveryError::Rejected(status.as_u16())),
        }
    }
}
