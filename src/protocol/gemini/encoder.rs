use crate::protocol::canonical::{CanonicalRequest, CanonicalRole};
use crate::protocol::gemini::{
    GeminiContent, GeminiGenerationConfig, GeminiPart, GeminiRequest, GeminiSystemInstruction,
};
use crate::protocol::mapping::canonical_role_to_gemini;

/// Encode a canonical request into the Gemini `generateContent` wire format.
///
/// The first system message becomes `systemInstruction`. Gemini has no
/// system role inside `contents`, so any later system message is sent as a
/// `user` turn in its original position.
#[must_use]
pub fn encode_gemini_request(canonical: &CanonicalRequest) -> GeminiRequest {
    let system_index = canonical
        .messages
        .iter()
        .position(|m| m.role == CanonicalRole::System);

    let system_instruction = system_index.map(|idx| GeminiSystemInstruction {
        parts: vec![GeminiPart {
            text: canonical.messages[idx].content.clone(),
        }],
    });

    let contents = canonical
        .messages
        .iter()
        .enumerate()
        .filter(|(idx, _)| Some(*idx) != system_index)
        .map(|(_, msg)| GeminiContent {
            role: canonical_role_to_gemini(msg.role).to_string(),
            parts: vec![GeminiPart {
                text: msg.content.clone(),
            }],
        })
        .collect();

    GeminiRequest {
        contents,
        system_instruction,
        generation_config: GeminiGenerationConfig {
            temperature: canonical.temperature,
            max_output_tokens: canonical.max_tokens,
            top_p: canonical.top_p,
        },
    }
}
