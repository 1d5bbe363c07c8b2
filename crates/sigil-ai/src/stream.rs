//! Typed event stream produced by a generation call

use crate::types::Usage;
use serde::{Deserialize, Serialize};
use std::pin::Pin;
use tokio_stream::Stream;

/// Kind of content block announced by a `BlockStart` event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockKind {
    /// Reasoning-trace block, never part of the visible answer
    Thinking,
    /// Visible answer text (the backend tags these `text`)
    Text,
}

/// Events emitted while a generation streams.
///
/// This is a closed union: every backend frame is mapped onto one of these
/// tags, and consumers can be driven by scripted sequences in tests without
/// a live backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// A new content block opened
    BlockStart { kind: BlockKind },
    /// A text fragment for the currently open block
    Delta { text: String },
    /// The current content block closed
    BlockStop,
    /// Generation finished; final usage snapshot attached
    End { usage: Usage },
    /// Generation failed; no further events follow
    Error { message: String },
}

/// An ordered stream of generation events
pub type StreamEventStream = Pin<Box<dyn Stream<Item = StreamEvent> + Send>>;
