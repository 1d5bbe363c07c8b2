//! Generation request assembly
//!
//! Applies the cache selection to the normalized messages, attaches the
//! system block, and fixes the thinking budget. Thinking is always
//! enabled with a constant budget; callers cannot change it.

use crate::error::{Error, Result};
use crate::normalize::NormalizedTurn;
use sigil_ai::{GenerationRequest, ProviderMessage, Role, SystemBlock, ThinkingConfig};

/// Fixed extended-thinking token budget
pub const THINKING_BUDGET_TOKENS: u32 = 6553;

/// Default output token cap when the caller does not supply one
pub const DEFAULT_MAX_TOKENS: u32 = 8192;

/// Default backend model
pub const DEFAULT_MODEL_ID: &str = "claude-opus-4@20250514";

/// Assemble the final generation request.
///
/// Cache markers land on exactly the text blocks whose owning message is
/// an assistant turn in `cache_selection`, plus the system block, and only
/// when caching is enabled and the text is non-empty.
pub fn build_request(
    model: &str,
    turns: Vec<NormalizedTurn>,
    cache_selection: &[usize],
    system_prompt: Option<&str>,
    use_cache: bool,
    max_tokens: u32,
) -> Result<GenerationRequest> {
    let mut messages = Vec::with_capacity(turns.len());

    for turn in turns {
        let mut blocks = turn.blocks;
        if use_cache && turn.role == Role::Assistant && cache_selection.contains(&turn.index) {
            for block in &mut blocks {
                block.mark_cached();
            }
        }
        messages.push(ProviderMessage::new(turn.role, blocks));
    }

    if messages.is_empty() {
        return Err(Error::InvalidRequest(
            "conversation produced no messages".to_string(),
        ));
    }

    let system = system_prompt
        .filter(|p| !p.trim().is_empty())
        .map(|prompt| {
            let mut block = SystemBlock::new(prompt);
            if use_cache {
                block.cache_control = Some(sigil_ai::CacheControl::ephemeral());
            }
            vec![block]
        });

    Ok(GenerationRequest {
        model: model.to_string(),
        max_tokens,
        stream: true,
        messages,
        system,
        thinking: Some(ThinkingConfig::enabled(THINKING_BUDGET_TOKENS)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::{cache_eligible_indices, normalize_turns, CACHE_SUFFIX_CAP, MAX_CACHE_BLOCKS};
    use crate::request::ChatTurn;
    use sigil_ai::ContentBlock;

    fn turn(role: Role, content: &str) -> ChatTurn {
        ChatTurn {
            role,
            content: content.to_string(),
        }
    }

    fn build(turns: &[ChatTurn], system: Option<&str>, use_cache: bool) -> GenerationRequest {
        let selection = cache_eligible_indices(turns, CACHE_SUFFIX_CAP);
        let normalized = normalize_turns(turns, None);
        build_request(
            DEFAULT_MODEL_ID,
            normalized,
            &selection,
            system,
            use_cache,
            DEFAULT_MAX_TOKENS,
        )
        .unwrap()
    }

    #[test]
    fn test_single_user_turn_no_cache_markers() {
        // one user message, no system prompt, no image
        let request = build(&[turn(Role::User, "hi")], None, true);
        assert_eq!(request.messages.len(), 1);
        assert_eq!(request.messages[0].content, vec![ContentBlock::text("hi")]);
        assert_eq!(request.cache_block_count(), 0);
        assert_eq!(request.max_tokens, 8192);
        assert_eq!(
            request.thinking,
            Some(ThinkingConfig::enabled(6553))
        );
        assert!(request.system.is_none());
    }

    #[test]
    fn test_single_assistant_turn_gets_cached() {
        let turns = vec![
            turn(Role::User, "q1"),
            turn(Role::Assistant, "a1"),
            turn(Role::User, "q2"),
        ];
        let request = build(&turns, None, true);
        assert_eq!(request.cache_block_count(), 1);
        assert!(request.messages[1].content[0].is_cached());
        assert!(!request.messages[0].content[0].is_cached());
        assert!(!request.messages[2].content[0].is_cached());
    }

    #[test]
    fn test_cache_disabled_marks_nothing() {
        let turns = vec![
            turn(Role::User, "q1"),
            turn(Role::Assistant, "a1"),
            turn(Role::User, "q2"),
        ];
        let request = build(&turns, Some("be brief"), false);
        assert_eq!(request.cache_block_count(), 0);
    }

    #[test]
    fn test_total_cache_blocks_within_provider_limit() {
        // many assistant turns plus a system prompt: 2 suffix + 1 system
        let turns: Vec<ChatTurn> = (0..9)
            .map(|i| {
                if i % 2 == 0 {
                    turn(Role::User, &format!("q{}", i))
                } else {
                    turn(Role::Assistant, &format!("a{}", i))
                }
            })
            .collect();
        let request = build(&turns, Some("system"), true);
        assert_eq!(request.cache_block_count(), 3);
        assert!(request.cache_block_count() <= MAX_CACHE_BLOCKS);
    }

    #[test]
    fn test_system_block_cached_when_enabled() {
        let request = build(&[turn(Role::User, "hi")], Some("be brief"), true);
        let system = request.system.unwrap();
        assert_eq!(system.len(), 1);
        assert!(system[0].cache_control.is_some());
        assert_eq!(system[0].text, "be brief");
    }

    #[test]
    fn test_blank_system_prompt_is_omitted() {
        let request = build(&[turn(Role::User, "hi")], Some("   "), true);
        assert!(request.system.is_none());
    }

    #[test]
    fn test_empty_conversation_is_invalid() {
        let err = build_request(DEFAULT_MODEL_ID, vec![], &[], None, true, DEFAULT_MAX_TOKENS)
            .unwrap_err();
        assert!(matches!(err, Error::InvalidRequest(_)));
    }

    #[test]
    fn test_selection_survives_dropped_turns() {
        // empty user turn at index 1 is dropped; assistant at index 2
        // must still be identified by its original index
        let turns = vec![
            turn(Role::User, "q1"),
            turn(Role::User, ""),
            turn(Role::Assistant, "a1"),
            turn(Role::User, "q2"),
        ];
        let request = build(&turns, None, true);
        assert_eq!(request.messages.len(), 3);
        assert!(request.messages[1].content[0].is_cached());
    }
}
