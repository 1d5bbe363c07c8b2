//! Inbound request model
//!
//! The caller sends a flat conversation payload; everything here is the
//! typed boundary that free-form JSON has to pass before any translation
//! work starts.

use crate::error::{Error, Result};
use serde::Deserialize;
use sigil_ai::Role;

fn default_use_cache() -> bool {
    true
}

fn default_max_tokens() -> u32 {
    crate::builder::DEFAULT_MAX_TOKENS
}

/// One turn of the caller's conversation
#[derive(Debug, Clone, Deserialize)]
pub struct ChatTurn {
    pub role: Role,
    pub content: String,
}

impl ChatTurn {
    /// Whether this turn has any visible text
    pub fn has_content(&self) -> bool {
        !self.content.trim().is_empty()
    }
}

/// Image reference attached to the last turn. Either inline base64 data
/// with its media type, or a URL (data-URL or remote).
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ImageRef {
    Inline { data: String, media_type: String },
    Url { url: String },
}

/// The full inbound chat payload
#[derive(Debug, Clone, Deserialize)]
pub struct ChatRequest {
    pub messages: Vec<ChatTurn>,
    #[serde(default)]
    pub image: Option<ImageRef>,
    #[serde(default)]
    pub system_prompt: Option<String>,
    #[serde(default = "default_use_cache")]
    pub use_cache: bool,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Selects live SSE delivery instead of one buffered document
    #[serde(default)]
    pub stream: bool,
}

impl ChatRequest {
    /// Parse the free-form JSON body into the typed request. Shape
    /// mismatches (missing role/content, unknown roles) fail before any
    /// downstream processing.
    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        serde_json::from_value(value).map_err(|e| Error::MalformedTurn(e.to_string()))
    }
}
