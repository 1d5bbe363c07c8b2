//! sigil-ai: Anthropic Messages wire protocol and streaming backend client
//!
//! This crate owns the provider-side data model (messages, content blocks,
//! cache annotations, thinking config) and the typed event stream a
//! generation call produces. The concrete SSE client lives behind the
//! [`InferenceBackend`] trait so callers can substitute scripted event
//! sequences in tests.

pub mod backend;
pub mod error;
pub mod stream;
pub mod types;

pub use backend::{AnthropicBackend, InferenceBackend};
pub use error::{Error, Result};
pub use stream::{BlockKind, StreamEvent, StreamEventStream};
pub use types::*;
