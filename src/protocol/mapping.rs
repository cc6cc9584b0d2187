use super::canonical::{CanonicalRole, FinishReason};

// ---------------------------------------------------------------------------
// Role mappings
// ---------------------------------------------------------------------------

/// Anthropic has no system role in `messages`; callers lift it out first.
#[must_use]
pub fn canonical_role_to_anthropic(role: CanonicalRole) -> Option<&'static str> {
    match role {
        CanonicalRole::System => None,
        CanonicalRole::User => Some("user"),
        CanonicalRole::Assistant => Some("assistant"),
    }
}

#[must_use]
pub fn canonical_role_to_gemini(role: CanonicalRole) -> &'static str {
    match role {
        CanonicalRole::System | CanonicalRole::User => "user",
        CanonicalRole::Assistant => "model",
    }
}

// ---------------------------------------------------------------------------
// Stop reason mappings
// ---------------------------------------------------------------------------

#[must_use]
pub fn anthropic_stop_to_canonical(s: &str) -> FinishReason {
    match s {
        "end_turn" | "stop_sequence" => FinishReason::Stop,
        "max_tokens" => FinishReason::Length,
        "tool_use" => FinishReason::ToolCalls,
        "refusal" => FinishReason::ContentFilter,
        other => FinishReason::Other(other.to_string()),
    }
}
