//! Stream demultiplexing
//!
//! Consumes the backend's typed event stream and splits it into the
//! thinking channel (accumulated only) and the visible-answer channel
//! (accumulated and forwarded fragment by fragment). The output is itself
//! a stream of transport-independent events; the server decides whether to
//! collect it into one document or frame each event onto the wire.

use async_stream::stream;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use sigil_ai::{BlockKind, StreamEvent, StreamEventStream, Usage};
use std::pin::Pin;
use tokio_stream::Stream;

/// Events produced by the demultiplexer, consumed by both emitter modes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutputEvent {
    /// One visible-answer fragment, in backend emission order
    Chunk { text: String },
    /// Successful completion with the full aggregates
    Done {
        content: String,
        thinking: Option<String>,
        usage: Usage,
        cached: bool,
    },
    /// Terminal failure; nothing follows, and no Done is ever sent
    Error { error: String },
}

/// An ordered stream of output events
pub type OutputEventStream = Pin<Box<dyn Stream<Item = OutputEvent> + Send>>;

/// Which content channel the stream is currently inside
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Idle,
    Thinking,
    Answer,
}

/// Run the demultiplexer over a backend event stream.
///
/// Thinking fragments never reach the forwarded stream; answer fragments
/// are forwarded exactly once each, in arrival order. Deltas arriving
/// while no block is open are treated as answer text: the backend is not
/// guaranteed to announce an answer-block start, only thinking blocks are
/// keyed on explicitly.
pub fn demultiplex(events: StreamEventStream) -> OutputEventStream {
    Box::pin(stream! {
        let mut events = events;
        let mut answer = String::new();
        let mut thinking = String::new();
        let mut section = Section::Idle;
        let mut done: Option<Usage> = None;
        let mut failure: Option<String> = None;

        while let Some(event) = events.next().await {
            match event {
                StreamEvent::BlockStart { kind } => {
                    section = match kind {
                        BlockKind::Thinking => Section::Thinking,
                        BlockKind::Text => Section::Answer,
                    };
                }
                StreamEvent::Delta { text } => {
                    if section == Section::Thinking {
                        thinking.push_str(&text);
                    } else {
                        answer.push_str(&text);
                        yield OutputEvent::Chunk { text };
                    }
                }
                StreamEvent::BlockStop => {
                    if section == Section::Thinking {
                        section = Section::Idle;
                    }
                }
                StreamEvent::End { usage } => {
                    done = Some(usage);
                    break;
                }
                StreamEvent::Error { message } => {
                    failure = Some(message);
                    break;
                }
            }
        }

        if let Some(message) = failure {
            tracing::warn!("generation failed mid-stream: {}", message);
            yield OutputEvent::Error { error: message };
        } else if let Some(usage) = done {
            let cached = usage.was_cached();
            yield OutputEvent::Done {
                content: answer,
                thinking: if thinking.is_empty() { None } else { Some(thinking) },
                usage,
                cached,
            };
        } else {
            yield OutputEvent::Error {
                error: "backend stream ended before completion".to_string(),
            };
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    fn scripted(events: Vec<StreamEvent>) -> StreamEventStream {
        Box::pin(stream::iter(events))
    }

    fn delta(text: &str) -> StreamEvent {
        StreamEvent::Delta {
            text: text.to_string(),
        }
    }

    async fn collect(events: Vec<StreamEvent>) -> Vec<OutputEvent> {
        demultiplex(scripted(events)).collect().await
    }

    #[tokio::test]
    async fn test_thinking_never_forwarded() {
        let output = collect(vec![
            StreamEvent::BlockStart { kind: BlockKind::Thinking },
            delta("pondering"),
            StreamEvent::BlockStop,
            StreamEvent::BlockStart { kind: BlockKind::Text },
            delta("hello"),
            StreamEvent::BlockStop,
            StreamEvent::End { usage: Usage::default() },
        ])
        .await;

        assert_eq!(output.len(), 2);
        assert_eq!(output[0], OutputEvent::Chunk { text: "hello".to_string() });
        match &output[1] {
            OutputEvent::Done { content, thinking, .. } => {
                assert_eq!(content, "hello");
                assert_eq!(thinking.as_deref(), Some("pondering"));
            }
            other => panic!("expected Done, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_chunks_preserve_order_and_concat_to_content() {
        let output = collect(vec![
            StreamEvent::BlockStart { kind: BlockKind::Text },
            delta("a"),
            delta("b"),
            delta("c"),
            StreamEvent::BlockStop,
            StreamEvent::End { usage: Usage::default() },
        ])
        .await;

        let forwarded: String = output
            .iter()
            .filter_map(|e| match e {
                OutputEvent::Chunk { text } => Some(text.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(forwarded, "abc");
        match output.last() {
            Some(OutputEvent::Done { content, .. }) => assert_eq!(content, &forwarded),
            other => panic!("expected Done, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_delta_without_block_start_is_answer_text() {
        let output = collect(vec![
            delta("implicit"),
            StreamEvent::End { usage: Usage::default() },
        ])
        .await;
        assert_eq!(output[0], OutputEvent::Chunk { text: "implicit".to_string() });
    }

    #[tokio::test]
    async fn test_thinking_section_closes_on_block_stop() {
        let output = collect(vec![
            StreamEvent::BlockStart { kind: BlockKind::Thinking },
            delta("trace"),
            StreamEvent::BlockStop,
            // no explicit answer-block start: still the answer channel
            delta("answer"),
            StreamEvent::End { usage: Usage::default() },
        ])
        .await;
        assert_eq!(output[0], OutputEvent::Chunk { text: "answer".to_string() });
    }

    #[tokio::test]
    async fn test_error_suppresses_done() {
        let output = collect(vec![
            StreamEvent::BlockStart { kind: BlockKind::Text },
            delta("partial"),
            StreamEvent::Error { message: "overloaded".to_string() },
        ])
        .await;

        assert_eq!(output.len(), 2);
        assert_eq!(
            output[1],
            OutputEvent::Error { error: "overloaded".to_string() }
        );
        assert!(!output.iter().any(|e| matches!(e, OutputEvent::Done { .. })));
    }

    #[tokio::test]
    async fn test_truncated_stream_is_an_error() {
        let output = collect(vec![
            StreamEvent::BlockStart { kind: BlockKind::Text },
            delta("cut off"),
        ])
        .await;
        assert!(matches!(output.last(), Some(OutputEvent::Error { .. })));
    }

    #[tokio::test]
    async fn test_cached_flag_follows_cache_read_tokens() {
        let usage = Usage {
            input_tokens: 10,
            output_tokens: 5,
            cache_creation_tokens: None,
            cache_read_tokens: Some(128),
        };
        let output = collect(vec![StreamEvent::End { usage }]).await;
        match &output[0] {
            OutputEvent::Done { cached, content, thinking, .. } => {
                assert!(*cached);
                assert_eq!(content, "");
                assert!(thinking.is_none());
            }
            other => panic!("expected Done, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_not_cached_without_cache_read_tokens() {
        let output = collect(vec![StreamEvent::End { usage: Usage::default() }]).await;
        assert!(matches!(
            output[0],
            OutputEvent::Done { cached: false, .. }
        ));
    }
}
