//! Failures that can occur while relaying a donation.

use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BridgeError {
    /// Credential or universe id was not provided at startup.
    #[error("Missing ROBLOX_API_KEY or UNIVERSE_ID in environment variables")]
    NotConfigured,

    #[error("Failed to encode notification: {0}")]
    Encode(#[from] serde_json::Error),

    /// The request never produced an HTTP response.
    #[error("{0}")]
    Network(#[from] reqwest::Error),

    /// The messaging API answered with a non-2xx status.
    #[error("Request failed with status code {status}")]
    Upstream { status: u16, body: Value },
}

impl BridgeError {
    /// Response body returned by the messaging API, if it got that far.
    pub fn details(&self) -> Option<&Value> {
        match self {
            BridgeError::Upstream { body, .. } => Some(body),
            _ => None,
        }
    }
}
