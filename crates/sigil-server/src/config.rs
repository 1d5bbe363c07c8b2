//! Configuration file support

use serde::{Deserialize, Serialize};
use sigil_relay::builder::DEFAULT_MODEL_ID;
use std::fs;
use std::path::Path;

/// Configuration for the relay server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Address to bind
    pub host: String,
    /// Port to bind
    pub port: u16,
    /// Backend model identifier
    pub model: String,
    /// API key (alternative to the ANTHROPIC_API_KEY environment variable)
    pub api_key: Option<String>,
    /// Override the backend base URL (e.g. a regional endpoint)
    pub base_url: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8787,
            model: DEFAULT_MODEL_ID.to_string(),
            api_key: None,
            base_url: None,
        }
    }
}

impl Config {
    /// Load from a TOML file, or defaults when no path is given
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(path) => {
                let contents = fs::read_to_string(path)?;
                Ok(toml::from_str(&contents)?)
            }
            None => Ok(Self::default()),
        }
    }
}
