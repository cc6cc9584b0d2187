use crate::protocol::anthropic::{AnthropicContentBlock, AnthropicResponse};
use crate::protocol::canonical::{CanonicalResponse, CanonicalUsage, FinishReason};
use crate::protocol::mapping::anthropic_stop_to_canonical;
use crate::util::unix_now_secs;

/// Decode an Anthropic Messages API response into canonical form.
///
/// `model` is the identifier the caller asked for, echoed back unchanged.
#[must_use]
pub fn decode_anthropic_response(response: AnthropicResponse, model: &str) -> CanonicalResponse {
    let AnthropicResponse {
        id,
        content: blocks,
        stop_reason,
        usage,
    } = response;

    // --- content ---
    let content = blocks
        .into_iter()
        .find_map(|block| match block {
            AnthropicContentBlock::Text { text } => Some(text),
            AnthropicContentBlock::Other => None,
        })
        .unwrap_or_default();

    // --- stop reason ---
    let finish_reason = stop_reason
        .as_deref()
        .map_or(FinishReason::Stop, anthropic_stop_to_canonical);

    CanonicalResponse {
        id,
        created: unix_now_secs(),
        model: model.to_string(),
        content,
        finish_reason,
        usage: CanonicalUsage::new(usage.input_tokens, usage.output_tokens),
    }
}
