use crate::protocol::canonical::{CanonicalResponse, CanonicalUsage, FinishReason};
use crate::protocol::gemini::GeminiResponse;
use crate::util::{next_completion_id, unix_now_secs};

/// Decode a Gemini `generateContent` response into canonical form.
///
/// Gemini responses carry no id, so one is generated. The finish reason is
/// always `stop`.
#[must_use]
pub fn decode_gemini_response(response: &GeminiResponse, model: &str) -> CanonicalResponse {
    let usage = response.usage_metadata.unwrap_or_default();
    CanonicalResponse {
        id: next_completion_id(),
        created: unix_now_secs(),
        model: model.to_string(),
        content: response.first_text().unwrap_or_default().to_string(),
        finish_reason: FinishReason::Stop,
        usage: CanonicalUsage::new(usage.prompt_token_count, usage.candidates_token_count),
    }
}
