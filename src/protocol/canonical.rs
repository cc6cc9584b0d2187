use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Canonical message role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CanonicalRole {
    System,
    User,
    Assistant,
}

impl CanonicalRole {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            CanonicalRole::System => "system",
            CanonicalRole::User => "user",
            CanonicalRole::Assistant => "assistant",
        }
    }
}

/// A single message in the canonical conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: CanonicalRole,
    pub content: String,
}

impl ChatMessage {
    #[must_use]
    pub fn new(role: CanonicalRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// The inbound, provider-agnostic chat-completion request.
///
/// `model` and `messages` default to empty so that a body missing either one
/// still deserializes and is rejected by the gateway's validation step with
/// a precise message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CanonicalRequest {
    #[serde(default)]
    pub model: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub messages: Vec<ChatMessage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency_penalty: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub presence_penalty: Option<f64>,
    #[serde(default)]
    pub stream: bool,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<ChatMessage>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<ChatMessage>>::deserialize(deserializer)?.unwrap_or_default())
}

impl CanonicalRequest {
    /// First `system` message, if any.
    #[must_use]
    pub fn system_message(&self) -> Option<&ChatMessage> {
        self.messages
            .iter()
            .find(|m| m.role == CanonicalRole::System)
    }
}

/// Reason the model stopped generating.
///
/// Values outside the known set are kept verbatim so nothing an upstream
/// reports is lost on the way to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FinishReason {
    Stop,
    Length,
    ToolCalls,
    ContentFilter,
    Other(String),
}

impl FinishReason {
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            FinishReason::Stop => "stop",
            FinishReason::Length => "length",
            FinishReason::ToolCalls => "tool_calls",
            FinishReason::ContentFilter => "content_filter",
            FinishReason::Other(other) => other,
        }
    }

    /// Parse an OpenAI-style finish reason string.
    #[must_use]
    pub fn from_openai(s: &str) -> Self {
        match s {
            "stop" => FinishReason::Stop,
            "length" => FinishReason::Length,
            "tool_calls" | "function_call" => FinishReason::ToolCalls,
            "content_filter" => FinishReason::ContentFilter,
            other => FinishReason::Other(other.to_string()),
        }
    }
}

impl fmt::Display for FinishReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for FinishReason {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for FinishReason {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(FinishReason::from_openai(&s))
    }
}

/// Token usage information.
///
/// Only constructible through [`CanonicalUsage::new`], which derives the
/// total, so `total_tokens == prompt_tokens + completion_tokens` always holds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CanonicalUsage {
    prompt_tokens: u64,
    completion_tokens: u64,
}

impl CanonicalUsage {
    #[must_use]
    pub fn new(prompt_tokens: u64, completion_tokens: u64) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
        }
    }

    #[must_use]
    pub fn prompt_tokens(&self) -> u64 {
        self.prompt_tokens
    }

    #[must_use]
    pub fn completion_tokens(&self) -> u64 {
        self.completion_tokens
    }

    #[must_use]
    pub fn total_tokens(&self) -> u64 {
        self.prompt_tokens.saturating_add(self.completion_tokens)
    }
}

#[derive(Serialize, Deserialize)]
struct UsageWire {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
    #[serde(default)]
    total_tokens: u64,
}

impl Serialize for CanonicalUsage {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        UsageWire {
            prompt_tokens: self.prompt_tokens,
            completion_tokens: self.completion_tokens,
            total_tokens: self.total_tokens(),
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for CanonicalUsage {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let wire = UsageWire::deserialize(deserializer)?;
        Ok(CanonicalUsage::new(wire.prompt_tokens, wire.completion_tokens))
    }
}

/// The fully-normalized, provider-agnostic non-streaming response.
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalResponse {
    pub id: String,
    pub created: u64,
    pub model: String,
    pub content: String,
    pub finish_reason: FinishReason,
    pub usage: CanonicalUsage,
}

/// One incremental unit of a streamed completion.
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalChunk {
    pub id: String,
    pub created: u64,
    pub model: String,
    pub delta: String,
    pub finish_reason: Option<FinishReason>,
    pub usage: Option<CanonicalUsage>,
}

/// Item of a decoded canonical stream.
///
/// `Done` is the explicit end-of-stream marker; nothing follows it.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamItem {
    Chunk(CanonicalChunk),
    Done,
}

impl StreamItem {
    #[must_use]
    pub fn as_chunk(&self) -> Option<&CanonicalChunk> {
        match self {
            StreamItem::Chunk(chunk) => Some(chunk),
            StreamItem::Done => None,
        }
    }

    #[must_use]
    pub fn is_done(&self) -> bool {
        matches!(self, StreamItem::Done)
    }
}

/// Identity fields shared by every chunk of one stream or by one response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseMeta {
    pub id: String,
    pub created: u64,
    pub model: String,
}

impl ResponseMeta {
    #[must_use]
    pub fn chunk(
        &self,
        delta: impl Into<String>,
        finish_reason: Option<FinishReason>,
    ) -> CanonicalChunk {
        CanonicalChunk {
            id: self.id.clone(),
            created: self.created,
            model: self.model.clone(),
            delta: delta.into(),
            finish_reason,
            usage: None,
        }
    }

    #[must_use]
    pub fn terminal_chunk(&self, usage: Option<CanonicalUsage>) -> CanonicalChunk {
        let mut chunk = self.chunk(String::new(), Some(FinishReason::Stop));
        chunk.usage = usage;
        chunk
    }
}

// ---------------------------------------------------------------------------
// Client-facing wire shape (OpenAI chat.completion / chat.completion.chunk)
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct CompletionWire<'a> {
    id: &'a str,
    object: &'static str,
    created: u64,
    model: &'a str,
    choices: [CompletionChoiceWire<'a>; 1],
    usage: CanonicalUsage,
}

#[derive(Serialize)]
struct CompletionChoiceWire<'a> {
    index: u32,
    message: CompletionMessageWire<'a>,
    finish_reason: &'a FinishReason,
}

#[derive(Serialize)]
struct CompletionMessageWire<'a> {
    role: &'static str,
    content: &'a str,
}

impl Serialize for CanonicalResponse {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        CompletionWire {
            id: &self.id,
            object: "chat.completion",
            created: self.created,
            model: &self.model,
            choices: [CompletionChoiceWire {
                index: 0,
                message: CompletionMessageWire {
                    role: CanonicalRole::Assistant.as_str(),
                    content: &self.content,
                },
                finish_reason: &self.finish_reason,
            }],
            usage: self.usage,
        }
        .serialize(serializer)
    }
}

#[derive(Serialize)]
struct ChunkWire<'a> {
    id: &'a str,
    object: &'static str,
    created: u64,
    model: &'a str,
    choices: [ChunkChoiceWire<'a>; 1],
    #[serde(skip_serializing_if = "Option::is_none")]
    usage: Option<CanonicalUsage>,
}

#[derive(Serialize)]
struct ChunkChoiceWire<'a> {
    index: u32,
    delta: ChunkDeltaWire<'a>,
    finish_reason: Option<&'a FinishReason>,
}

#[derive(Serialize)]
struct ChunkDeltaWire<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<&'a str>,
}

impl Serialize for CanonicalChunk {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        // A terminal chunk carries an empty delta object.
        let content = if self.delta.is_empty() && self.finish_reason.is_some() {
            None
        } else {
            Some(self.delta.as_str())
        };
        ChunkWire {
            id: &self.id,
            object: "chat.completion.chunk",
            created: self.created,
            model: &self.model,
            choices: [ChunkChoiceWire {
                index: 0,
                delta: ChunkDeltaWire { content },
                finish_reason: self.finish_reason.as_ref(),
            }],
            usage: self.usage,
        }
        .serialize(serializer)
    }
}
