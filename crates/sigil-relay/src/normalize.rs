//! Message normalization and cache block allocation
//!
//! The normalizer converts the caller's flat turn list into content-block
//! messages; the allocator picks which assistant turns may carry the
//! ephemeral cache marker. Both operate on the original turn indices so
//! the suffix selection survives empty-turn dropping.

use crate::image::ResolvedImage;
use crate::request::ChatTurn;
use sigil_ai::{ContentBlock, Role};

/// How many assistant turns may be cache-annotated per request. The
/// provider allows 4 ephemeral blocks total; capping assistant turns at 2
/// leaves headroom for the system block regardless of whether one is set.
pub const CACHE_SUFFIX_CAP: usize = 2;

/// Hard provider limit on simultaneous ephemeral cache blocks
pub const MAX_CACHE_BLOCKS: usize = 4;

/// A turn converted to content blocks, tagged with its position in the
/// original conversation
#[derive(Debug, Clone)]
pub struct NormalizedTurn {
    pub index: usize,
    pub role: Role,
    pub blocks: Vec<ContentBlock>,
}

/// Convert the conversation into content-block form.
///
/// Turns with empty or whitespace-only content are dropped, except the
/// last turn when an image is attached: image-only messages are valid.
/// The image always goes on the last turn, block order `[Image, Text?]`.
/// Text is copied verbatim; only the emptiness check trims.
pub fn normalize_turns(turns: &[ChatTurn], image: Option<&ResolvedImage>) -> Vec<NormalizedTurn> {
    let last = turns.len().saturating_sub(1);
    let mut normalized = Vec::with_capacity(turns.len());

    for (index, turn) in turns.iter().enumerate() {
        let is_last = index == last;

        if let Some(resolved) = image.filter(|_| is_last) {
            let mut blocks = vec![ContentBlock::image(
                resolved.media_type.clone(),
                resolved.data.clone(),
            )];
            if turn.has_content() {
                blocks.push(ContentBlock::text(turn.content.clone()));
            }
            normalized.push(NormalizedTurn {
                index,
                role: turn.role,
                blocks,
            });
        } else if turn.has_content() {
            normalized.push(NormalizedTurn {
                index,
                role: turn.role,
                blocks: vec![ContentBlock::text(turn.content.clone())],
            });
        }
        // empty turn, not last-with-image: dropped
    }

    normalized
}

/// Select the turn indices eligible for cache annotation: the most recent
/// `cap` assistant turns with non-empty content, order preserved.
pub fn cache_eligible_indices(turns: &[ChatTurn], cap: usize) -> Vec<usize> {
    let qualifying: Vec<usize> = turns
        .iter()
        .enumerate()
        .filter(|(_, t)| t.role == Role::Assistant && t.has_content())
        .map(|(i, _)| i)
        .collect();

    let skip = qualifying.len().saturating_sub(cap);
    qualifying[skip..].to_vec()
}
