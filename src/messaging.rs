use std::sync::Arc;

use reqwest::StatusCode;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::config::BridgeConfig;
use crate::donation::DonationNotification;
use crate::error::BridgeError;

/// Outer envelope of a MessagingService publish. The notification itself is
/// carried as a JSON string, not a nested object.
#[derive(Debug, Serialize)]
struct PublishRequest {
    message: String,
}

/// Client for the Roblox MessagingService publish endpoint.
#[derive(Clone)]
pub struct MessagingClient {
    client: reqwest::Client,
    config: Arc<BridgeConfig>,
}

impl MessagingClient {
    pub fn new(config: Arc<BridgeConfig>) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    /// Publishes one notification to the donation topic. A single attempt is made.
    pub async fn publish(
        &self,
        notification: &DonationNotification,
    ) -> Result<StatusCode, BridgeError> {
        let (Some(api_key), Some(url)) = (self.config.api_key.as_deref(), self.config.publish_url())
        else {
            return Err(BridgeError::NotConfigured);
        };

        let request = PublishRequest {
            message: notification.to_topic_message()?,
        };

        debug!("Sending to: {}", url);

        let response = self
            .client
            .post(&url)
            .header("x-api-key", api_key)
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = match response.text().await {
                Ok(text) => text,
                Err(e) => {
                    debug!("Failed to read Roblox error body: {}", e);
                    String::new()
                }
            };
            let body = serde_json::from_str(&text).unwrap_or(Value::String(text));
            return Err(BridgeError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        Ok(status)
    }
}
