//! Response emission
//!
//! The demultiplexer produces one transport-independent event sequence;
//! this module is the only mode-aware layer. Buffered mode drains the
//! sequence into a single document, live mode frames each event onto an
//! SSE stream as it is produced.

use axum::response::sse::Event;
use futures::StreamExt;
use serde::Serialize;
use sigil_ai::Usage;
use sigil_relay::{OutputEvent, OutputEventStream};
use std::convert::Infallible;
use tokio_stream::Stream;

/// The single-document result of buffered mode
#[derive(Debug, Clone, Serialize)]
pub struct ChatResponse {
    pub content: String,
    pub thinking: Option<String>,
    pub usage: Usage,
    pub cached: bool,
}

/// Drain the output stream into one document. A terminal error event
/// becomes `Err` with the backend's message; no partial content survives.
pub async fn collect_buffered(mut output: OutputEventStream) -> Result<ChatResponse, String> {
    while let Some(event) = output.next().await {
        match event {
            OutputEvent::Chunk { .. } => {}
            OutputEvent::Done {
                content,
                thinking,
                usage,
                cached,
            } => {
                return Ok(ChatResponse {
                    content,
                    thinking,
                    usage,
                    cached,
                });
            }
            OutputEvent::Error { error } => return Err(error),
        }
    }
    Err("backend stream ended before completion".to_string())
}

/// Re-frame each output event as one SSE `data:` frame, unbuffered
pub fn sse_frames(output: OutputEventStream) -> impl Stream<Item = Result<Event, Infallible>> {
    output.map(|event| Ok(Event::default().data(frame_json(&event))))
}

fn frame_json(event: &OutputEvent) -> String {
    serde_json::to_string(event).unwrap_or_else(|e| error_frame(&e.to_string()))
}

fn error_frame(message: &str) -> String {
    serde_json::json!({ "type": "error", "error": message }).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    fn output(events: Vec<OutputEvent>) -> OutputEventStream {
        Box::pin(stream::iter(events))
    }

    #[tokio::test]
    async fn test_collect_buffered_returns_aggregates() {
        let response = collect_buffered(output(vec![
            OutputEvent::Chunk {
                text: "hel".to_string(),
            },
            OutputEvent::Chunk {
                text: "lo".to_string(),
            },
            OutputEvent::Done {
                content: "hello".to_string(),
                thinking: None,
                usage: Usage::default(),
                cached: false,
            },
        ]))
        .await
        .unwrap();
        assert_eq!(response.content, "hello");
        assert!(!response.cached);
    }

    #[tokio::test]
    async fn test_collect_buffered_error_discards_partials() {
        let err = collect_buffered(output(vec![
            OutputEvent::Chunk {
                text: "partial".to_string(),
            },
            OutputEvent::Error {
                error: "overloaded".to_string(),
            },
        ]))
        .await
        .unwrap_err();
        assert_eq!(err, "overloaded");
    }

    #[test]
    fn test_frame_json_shapes() {
        let chunk = frame_json(&OutputEvent::Chunk {
            text: "hi".to_string(),
        });
        assert_eq!(chunk, r#"{"type":"chunk","text":"hi"}"#);

        let error = frame_json(&OutputEvent::Error {
            error: "boom".to_string(),
        });
        assert_eq!(error, r#"{"type":"error","error":"boom"}"#);
    }

    #[test]
    fn test_error_frame_escapes_message() {
        let frame = error_frame(r#"bad "quoted" message at line 1\"#);
        let parsed: serde_json::Value = serde_json::from_str(&frame).unwrap();
        assert_eq!(parsed["type"], "error");
        assert_eq!(parsed["error"], r#"bad "quoted" message at line 1\"#);
    }

    #[test]
    fn test_thinking_serializes_as_null_when_absent() {
        let response = ChatResponse {
            content: "hi".to_string(),
            thinking: None,
            usage: Usage::default(),
            cached: false,
        };
        let value = serde_json::to_value(&response).unwrap();
        assert!(value.get("thinking").unwrap().is_null());
    }
}
