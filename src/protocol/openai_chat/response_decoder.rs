use crate::protocol::canonical::{CanonicalResponse, CanonicalUsage, FinishReason};
use crate::protocol::openai_chat::OpenAiChatResponse;
use crate::util::{next_completion_id, unix_now_secs};

/// Decode an `OpenAI` Chat Completions response into canonical form.
///
/// The upstream shape is already canonical, so identity fields are kept
/// as-is and only filled in when the upstream left them out. The total is
/// always recomputed from its parts.
#[must_use]
pub fn decode_openai_chat_response(
    response: OpenAiChatResponse,
    requested_model: &str,
) -> CanonicalResponse {
    let OpenAiChatResponse {
        id,
        created,
        model,
        choices,
        usage,
    } = response;

    let (content, finish_reason) = match choices.into_iter().next() {
        Some(choice) => (
            choice.message.content.unwrap_or_default(),
            choice
                .finish_reason
                .as_deref()
                .map_or(FinishReason::Stop, FinishReason::from_openai),
        ),
        None => (String::new(), FinishReason::Stop),
    };
    let usage = usage.unwrap_or_default();

    CanonicalResponse {
        id: if id.is_empty() { next_completion_id() } else { id },
        created: if created == 0 { unix_now_secs() } else { created },
        model: if model.is_empty() {
            requested_model.to_string()
        } else {
            model
        },
        content,
        finish_reason,
        usage: CanonicalUsage::new(usage.prompt_tokens, usage.completion_tokens),
    }
}
