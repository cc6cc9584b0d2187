use crate::protocol::canonical::CanonicalRequest;
use crate::protocol::openai_chat::{OpenAiChatRequest, OpenAiMessage};
use crate::protocol::provider::bare_model_id;

/// Encode a canonical request into the `OpenAI` Chat Completions wire format.
///
/// Messages keep their order and roles, system messages included.
#[must_use]
pub fn encode_openai_chat_request(canonical: &CanonicalRequest) -> OpenAiChatRequest {
    let messages = canonical
        .messages
        .iter()
        .map(|msg| OpenAiMessage {
            role: msg.role.as_str().to_string(),
            content: msg.content.clone(),
        })
        .collect();

    OpenAiChatRequest {
        model: bare_model_id(&canonical.model).to_string(),
        messages,
        temperature: canonical.temperature,
        max_tokens: canonical.max_tokens,
        top_p: canonical.top_p,
        frequency_penalty: canonical.frequency_penalty,
        presence_penalty: canonical.presence_penalty,
        stream: canonical.stream,
    }
}
