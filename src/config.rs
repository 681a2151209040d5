use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

/// Topic every donation is published to.
pub const TOPIC_NAME: &str = "SaweriaDonation";

pub const DEFAULT_PORT: u16 = 3000;

const DEFAULT_API_BASE_URL: &str = "https://apis.roblox.com";

/// Optional `bridge.toml`-style file. Every key may also come from the environment.
#[derive(Debug, Deserialize, Default)]
struct FileConfig {
    #[serde(default)]
    roblox_api_key: Option<String>,
    #[serde(default)]
    universe_id: Option<String>,
    #[serde(default)]
    port: Option<u16>,
    #[serde(default = "default_api_base_url")]
    api_base_url: String,
}

fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

/// Process-wide bridge settings. Built once at startup and shared read-only.
#[derive(Clone)]
pub struct BridgeConfig {
    pub api_key: Option<String>,
    pub universe_id: Option<String>,
    pub port: u16,
    pub api_base_url: String,
}

impl std::fmt::Debug for BridgeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BridgeConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("universe_id", &self.universe_id)
            .field("port", &self.port)
            .field("api_base_url", &self.api_base_url)
            .finish()
    }
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            universe_id: None,
            port: DEFAULT_PORT,
            api_base_url: default_api_base_url(),
        }
    }
}

impl BridgeConfig {
    /// Reads the optional config file, then lets `ROBLOX_API_KEY`, `UNIVERSE_ID`
    /// and `PORT` from the process environment override it.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(path) => {
                let content = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read config file: {}", path.display()))?;
                toml::from_str(&content)
                    .with_context(|| format!("Failed to parse config file: {}", path.display()))?
            }
            None => FileConfig {
                api_base_url: default_api_base_url(),
                ..Default::default()
            },
        };

        Self::from_parts(file, |key| std::env::var(key).ok())
    }

    fn from_parts(file: FileConfig, env: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let env = |key: &str| env(key).filter(|v| !v.is_empty());

        let port = match env("PORT") {
            Some(raw) => raw
                .trim()
                .parse::<u16>()
                .with_context(|| format!("Invalid PORT value: {raw}"))?,
            None => file.port.unwrap_or(DEFAULT_PORT),
        };

        Ok(Self {
            api_key: env("ROBLOX_API_KEY").or(non_empty(file.roblox_api_key)),
            universe_id: env("UNIVERSE_ID").or(non_empty(file.universe_id)),
            port,
            api_base_url: file.api_base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn api_key_configured(&self) -> bool {
        self.api_key.is_some()
    }

    /// Both the credential and the destination universe are known.
    pub fn is_ready(&self) -> bool {
        self.api_key.is_some() && self.universe_id.is_some()
    }

    /// Messaging service endpoint for the configured universe, if any.
    pub fn publish_url(&self) -> Option<String> {
        self.universe_id.as_deref().map(|universe_id| {
            format!(
                "{}/messaging-service/v1/universes/{}/topics/{}",
                self.api_base_url, universe_id, TOPIC_NAME
            )
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}
