use std::fmt;

/// The upstream vendor a request is routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderTag {
    Anthropic,
    OpenAi,
    Google,
}

impl ProviderTag {
    pub const ALL: [ProviderTag; 3] = [
        ProviderTag::Anthropic,
        ProviderTag::OpenAi,
        ProviderTag::Google,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ProviderTag::Anthropic => "anthropic",
            ProviderTag::OpenAi => "openai",
            ProviderTag::Google => "google",
        }
    }

    /// Human-facing vendor name used in error messages.
    #[must_use]
    pub fn display_name(self) -> &'static str {
        match self {
            ProviderTag::Anthropic => "Anthropic",
            ProviderTag::OpenAi => "OpenAI",
            ProviderTag::Google => "Google",
        }
    }
}

impl fmt::Display for ProviderTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolve the provider for a namespaced model identifier.
///
/// Only the segment before the first `/` is considered, case-insensitively.
/// Bare model ids and unknown prefixes fall back to OpenAI.
#[must_use]
pub fn resolve_provider(model: &str) -> ProviderTag {
    let Some((prefix, _)) = model.split_once('/') else {
        return ProviderTag::OpenAi;
    };
    match prefix.to_ascii_lowercase().as_str() {
        "anthropic" | "claude" => ProviderTag::Anthropic,
        "google" | "gemini" => ProviderTag::Google,
        _ => ProviderTag::OpenAi,
    }
}

/// Strip the provider namespace from a model identifier.
#[must_use]
pub fn bare_model_id(model: &str) -> &str {
    model.split_once('/').map_or(model, |(_, rest)| rest)
}
