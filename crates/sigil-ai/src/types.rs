//! Wire types for the Anthropic Messages protocol
//!
//! These are the structures a generation request is serialized from. They
//! are built once per inbound request by the relay core and never mutated
//! after construction.

use serde::{Deserialize, Serialize};

/// Conversation roles accepted by the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

/// Ephemeral prompt-cache directive attached to a content block
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheControl {
    #[serde(rename = "type")]
    pub control_type: String,
}

impl CacheControl {
    /// The only cache type the backend currently supports
    pub fn ephemeral() -> Self {
        Self {
            control_type: "ephemeral".to_string(),
        }
    }
}

/// Image payload source. The backend only accepts inline base64.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ImageSource {
    Base64 { media_type: String, data: String },
}

/// Content block of a provider message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text {
        text: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        cache_control: Option<CacheControl>,
    },
    Image {
        source: ImageSource,
    },
}

impl ContentBlock {
    /// Create a plain text block
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text {
            text: text.into(),
            cache_control: None,
        }
    }

    /// Create an inline base64 image block
    pub fn image(media_type: impl Into<String>, data: impl Into<String>) -> Self {
        Self::Image {
            source: ImageSource::Base64 {
                media_type: media_type.into(),
                data: data.into(),
            },
        }
    }

    /// Attach the ephemeral cache marker. Blocks with empty text are left
    /// unmarked: an empty cached block signals an unstable cache key to the
    /// backend. Image blocks are never cacheable.
    pub fn mark_cached(&mut self) {
        if let Self::Text {
            text,
            cache_control,
        } = self
        {
            if !text.trim().is_empty() {
                *cache_control = Some(CacheControl::ephemeral());
            }
        }
    }

    /// Check whether this block carries the cache marker
    pub fn is_cached(&self) -> bool {
        matches!(
            self,
            Self::Text {
                cache_control: Some(_),
                ..
            }
        )
    }
}

/// A single message in the structured request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderMessage {
    pub role: Role,
    pub content: Vec<ContentBlock>,
}

impl ProviderMessage {
    pub fn new(role: Role, content: Vec<ContentBlock>) -> Self {
        Self { role, content }
    }
}

/// System prompt block (top-level `system` parameter)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemBlock {
    #[serde(rename = "type")]
    pub block_type: String,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_control: Option<CacheControl>,
}

impl SystemBlock {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            block_type: "text".to_string(),
            text: text.into(),
            cache_control: None,
        }
    }
}

/// Extended-thinking configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThinkingConfig {
    #[serde(rename = "type")]
    pub thinking_type: String,
    pub budget_tokens: u32,
}

impl ThinkingConfig {
    pub fn enabled(budget_tokens: u32) -> Self {
        Self {
            thinking_type: "enabled".to_string(),
            budget_tokens,
        }
    }
}

/// A complete generation request. Immutable once handed to the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub model: String,
    pub max_tokens: u32,
    pub stream: bool,
    pub messages: Vec<ProviderMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<Vec<SystemBlock>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thinking: Option<ThinkingConfig>,
}

impl GenerationRequest {
    /// Count cache-annotated blocks across messages and the system block
    pub fn cache_block_count(&self) -> usize {
        let message_blocks: usize = self
            .messages
            .iter()
            .flat_map(|m| m.content.iter())
            .filter(|b| b.is_cached())
            .count();
        let system_blocks = self
            .system
            .iter()
            .flatten()
            .filter(|b| b.cache_control.is_some())
            .count();
        message_blocks + system_blocks
    }
}

/// Token usage reported by the backend for one generation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
    /// Tokens written to the prompt cache, when the backend reports them
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_creation_tokens: Option<u32>,
    /// Tokens served from the prompt cache, when the backend reports them
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_read_tokens: Option<u32>,
}

impl Usage {
    /// Whether this generation was served (partly) from the prompt cache
    pub fn was_cached(&self) -> bool {
        self.cache_read_tokens.is_some()
    }
}
