//! sigil-relay: conversation translation and stream demultiplexing
//!
//! The core pipeline behind the relay: normalize the caller's flat
//! conversation into provider messages, allocate prompt-cache blocks,
//! assemble the generation request, drive the backend call, and split the
//! resulting event stream into thinking and visible-answer channels.

pub mod builder;
pub mod demux;
pub mod error;
pub mod image;
pub mod normalize;
pub mod request;

pub use demux::{OutputEvent, OutputEventStream};
pub use error::{Error, Result};
pub use image::{HttpImageResolver, ImageResolver, ResolvedImage};
pub use request::{ChatRequest, ChatTurn, ImageRef};

use normalize::CACHE_SUFFIX_CAP;
use sigil_ai::InferenceBackend;

/// Run one chat request end to end: translate, call the backend, and
/// return the demultiplexed output stream.
///
/// Translation and resolution failures surface here, before any backend
/// work; failures during streaming arrive as a terminal
/// [`OutputEvent::Error`] on the returned stream.
pub async fn run_chat(
    backend: &dyn InferenceBackend,
    resolver: &dyn ImageResolver,
    model: &str,
    request: ChatRequest,
) -> Result<OutputEventStream> {
    let image = match &request.image {
        Some(image_ref) => Some(resolver.resolve(image_ref).await?),
        None => None,
    };

    let cache_selection = normalize::cache_eligible_indices(&request.messages, CACHE_SUFFIX_CAP);
    let normalized = normalize::normalize_turns(&request.messages, image.as_ref());

    let generation = builder::build_request(
        model,
        normalized,
        &cache_selection,
        request.system_prompt.as_deref(),
        request.use_cache,
        request.max_tokens,
    )?;

    tracing::debug!(
        messages = generation.messages.len(),
        cache_blocks = generation.cache_block_count(),
        "translated request"
    );

    let events = backend.generate(generation).await?;
    Ok(demux::demultiplex(events))
}
