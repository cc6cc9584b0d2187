use crate::protocol::anthropic::{AnthropicMessage, AnthropicRequest, DEFAULT_MAX_TOKENS};
use crate::protocol::canonical::{CanonicalRequest, CanonicalRole};
use crate::protocol::mapping::canonical_role_to_anthropic;
use crate::protocol::provider::bare_model_id;

/// Encode a canonical request into the Anthropic Messages API wire format.
///
/// The first system message becomes the top-level `system` field; Anthropic
/// accepts only one, so any later system messages are dropped.
#[must_use]
pub fn encode_anthropic_request(canonical: &CanonicalRequest) -> AnthropicRequest {
    // --- system ---
    let system = canonical.system_message().map(|m| m.content.clone());
    let extra_system = canonical
        .messages
        .iter()
        .filter(|m| m.role == CanonicalRole::System)
        .count()
        .saturating_sub(1);
    if extra_system > 0 {
        tracing::debug!(
            dropped = extra_system,
            "anthropic accepts one system prompt; dropping the rest"
        );
    }

    // --- messages ---
    let messages = canonical
        .messages
        .iter()
        .filter_map(|msg| {
            canonical_role_to_anthropic(msg.role).map(|role| AnthropicMessage {
                role: role.to_string(),
                content: msg.content.clone(),
            })
        })
        .collect();

    AnthropicRequest {
        model: bare_model_id(&canonical.model).to_string(),
        // Anthropic rejects a zero limit.
        max_tokens: canonical
            .max_tokens
            .filter(|n| *n > 0)
            .unwrap_or(DEFAULT_MAX_TOKENS),
        system,
        messages,
        temperature: canonical.temperature,
        top_p: canonical.top_p,
        stream: canonical.stream,
    }
}
