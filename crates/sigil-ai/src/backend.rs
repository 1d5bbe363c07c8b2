//! Anthropic Messages streaming client
//!
//! Drives one `/v1/messages` call and translates the raw SSE frames into
//! the closed [`StreamEvent`] union. Transport and protocol failures are
//! folded into a terminal `StreamEvent::Error` so consumers see a single,
//! ordered event sequence either way.

use crate::{
    error::{Error, Result},
    stream::{BlockKind, StreamEvent, StreamEventStream},
    types::{GenerationRequest, Usage},
};
use async_stream::stream;
use async_trait::async_trait;
use futures::StreamExt;
use reqwest_eventsource::{Event, EventSource};
use serde::Deserialize;

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// A backend that can run one streaming generation per call
#[async_trait]
pub trait InferenceBackend: Send + Sync {
    /// Start a generation and return its ordered event stream
    async fn generate(&self, request: GenerationRequest) -> Result<StreamEventStream>;
}

/// Anthropic API client
pub struct AnthropicBackend {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl AnthropicBackend {
    /// Create a new backend client with an API key
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Create from the `ANTHROPIC_API_KEY` environment variable
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("ANTHROPIC_API_KEY").map_err(|_| Error::InvalidApiKey)?;
        Ok(Self::new(api_key))
    }

    /// Override the API base URL (e.g. for a regional endpoint)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl InferenceBackend for AnthropicBackend {
    async fn generate(&self, mut request: GenerationRequest) -> Result<StreamEventStream> {
        request.stream = true;

        let url = format!("{}/v1/messages", self.base_url);
        tracing::debug!(model = %request.model, "starting generation: {}", url);

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            "x-api-key",
            self.api_key.parse().map_err(|_| Error::InvalidApiKey)?,
        );
        headers.insert("anthropic-version", ANTHROPIC_VERSION.parse().unwrap());
        headers.insert("accept", "application/json".parse().unwrap());
        headers.insert("content-type", "application/json".parse().unwrap());

        let request_builder = self.client.post(&url).headers(headers).json(&request);

        let event_source = EventSource::new(request_builder)
            .map_err(|e| Error::Sse(format!("Failed to create event source: {}", e)))?;

        Ok(Box::pin(create_stream(event_source)))
    }
}

/// Translate raw SSE frames into the typed event stream
fn create_stream(mut event_source: EventSource) -> impl futures::Stream<Item = StreamEvent> {
    stream! {
        let mut usage = Usage::default();
        let mut error_message: Option<String> = None;

        while let Some(event_result) = event_source.next().await {
            match event_result {
                Ok(Event::Open) => {}
                Ok(Event::Message(message)) => {
                    if message.event == "message_start" {
                        if let Ok(data) = serde_json::from_str::<MessageStartEvent>(&message.data) {
                            merge_usage(&mut usage, &data.message.usage);
                        }
                    } else if message.event == "content_block_start" {
                        if let Ok(data) = serde_json::from_str::<ContentBlockStartEvent>(&message.data) {
                            let kind = if data.content_block.block_type == "thinking" {
                                BlockKind::Thinking
                            } else {
                                BlockKind::Text
                            };
                            yield StreamEvent::BlockStart { kind };
                        }
                    } else if message.event == "content_block_delta" {
                        if let Ok(data) = serde_json::from_str::<ContentBlockDeltaEvent>(&message.data) {
                            // Both answer text and thinking traces arrive as
                            // text fragments; the consumer's state machine
                            // decides which channel they belong to.
                            let fragment = match data.delta.delta_type.as_str() {
                                "text_delta" => data.delta.text,
                                "thinking_delta" => data.delta.thinking,
                                _ => None,
                            };
                            if let Some(text) = fragment {
                                yield StreamEvent::Delta { text };
                            }
                        }
                    } else if message.event == "content_block_stop" {
                        yield StreamEvent::BlockStop;
                    } else if message.event == "message_delta" {
                        if let Ok(data) = serde_json::from_str::<MessageDeltaEvent>(&message.data) {
                            merge_usage(&mut usage, &data.usage);
                        }
                    } else if message.event == "message_stop" {
                        break;
                    } else if message.event == "error" {
                        if let Ok(data) = serde_json::from_str::<ErrorEvent>(&message.data) {
                            error_message = Some(data.error.message);
                        } else {
                            error_message = Some("backend reported an unparseable error".to_string());
                        }
                        break;
                    }
                }
                Err(e) => {
                    error_message = Some(e.to_string());
                    break;
                }
            }
        }

        event_source.close();

        if let Some(message) = error_message {
            yield StreamEvent::Error { message };
        } else {
            yield StreamEvent::End { usage };
        }
    }
}

fn merge_usage(usage: &mut Usage, info: &UsageInfo) {
    if let Some(input) = info.input_tokens {
        usage.input_tokens = input;
    }
    if let Some(output) = info.output_tokens {
        usage.output_tokens = output;
    }
    if info.cache_creation_input_tokens.is_some() {
        usage.cache_creation_tokens = info.cache_creation_input_tokens;
    }
    if info.cache_read_input_tokens.is_some() {
        usage.cache_read_tokens = info.cache_read_input_tokens;
    }
}

// ============================================================================
// Response frame payloads
// ============================================================================

#[derive(Debug, Deserialize)]
struct MessageStartEvent {
    message: MessageInfo,
}

#[derive(Debug, Deserialize)]
struct MessageInfo {
    #[serde(default)]
    usage: UsageInfo,
}

#[derive(Debug, Default, Deserialize)]
struct UsageInfo {
    input_tokens: Option<u32>,
    output_tokens: Option<u32>,
    cache_read_input_tokens: Option<u32>,
    cache_creation_input_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ContentBlockStartEvent {
    content_block: ContentBlockInfo,
}

#[derive(Debug, Deserialize)]
struct ContentBlockInfo {
    #[serde(rename = "type")]
    block_type: String,
}

#[derive(Debug, Deserialize)]
struct ContentBlockDeltaEvent {
    delta: DeltaInfo,
}

#[derive(Debug, Deserialize)]
struct DeltaInfo {
    #[serde(rename = "type")]
    delta_type: String,
    text: Option<String>,
    thinking: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MessageDeltaEvent {
    #[serde(default)]
    usage: UsageInfo,
}

#[derive(Debug, Deserialize)]
struct ErrorEvent {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}
