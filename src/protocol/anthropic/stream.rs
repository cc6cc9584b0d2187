use std::collections::VecDeque;

use crate::error::GatewayError;
use crate::protocol::anthropic::{AnthropicDelta, AnthropicStreamEvent};
use crate::protocol::canonical::{CanonicalUsage, ResponseMeta, StreamItem};
use crate::protocol::provider::ProviderTag;
use crate::stream::sse::data_payload;
use crate::stream::{log_skipped_line, LineDecoder};
use crate::util::{next_completion_id, unix_now_secs};

/// Line decoder for the Anthropic Messages SSE stream.
///
/// Only `data:` lines matter; the `event:` line repeats the `type` field of
/// the JSON that follows. Text deltas become delta chunks and `message_stop`
/// becomes the terminal chunk plus `Done`.
pub struct AnthropicLineDecoder {
    meta: ResponseMeta,
    emitted_chunk: bool,
    input_tokens: Option<u64>,
    output_tokens: Option<u64>,
}

impl AnthropicLineDecoder {
    #[must_use]
    pub fn new(model: &str) -> Self {
        Self {
            meta: ResponseMeta {
                id: next_completion_id(),
                created: unix_now_secs(),
                model: model.to_string(),
            },
            emitted_chunk: false,
            input_tokens: None,
            output_tokens: None,
        }
    }

    fn usage(&self) -> Option<CanonicalUsage> {
        if self.input_tokens.is_none() && self.output_tokens.is_none() {
            return None;
        }
        Some(CanonicalUsage::new(
            self.input_tokens.unwrap_or(0),
            self.output_tokens.unwrap_or(0),
        ))
    }

    fn apply(
        &mut self,
        event: AnthropicStreamEvent,
        data: &str,
        out: &mut VecDeque<StreamItem>,
    ) -> Result<(), GatewayError> {
        match event {
            AnthropicStreamEvent::MessageStart { message } => {
                // Ids are fixed once the first chunk is out.
                if let Some(id) = message.id.filter(|id| !id.is_empty()) {
                    if !self.emitted_chunk {
                        self.meta.id = id;
                    }
                }
                if let Some(usage) = message.usage {
                    self.input_tokens = Some(usage.input_tokens);
                }
            }
            AnthropicStreamEvent::ContentBlockDelta {
                delta: AnthropicDelta::TextDelta { text },
            } => {
                self.emitted_chunk = true;
                out.push_back(StreamItem::Chunk(self.meta.chunk(text, None)));
            }
            AnthropicStreamEvent::MessageDelta { usage: Some(usage) } => {
                self.output_tokens = Some(usage.output_tokens);
            }
            AnthropicStreamEvent::MessageStop => {
                self.emitted_chunk = true;
                out.push_back(StreamItem::Chunk(self.meta.terminal_chunk(self.usage())));
                out.push_back(StreamItem::Done);
            }
            AnthropicStreamEvent::Error { error } => {
                tracing::warn!(
                    provider = "anthropic",
                    error_type = %error.type_,
                    message = %error.message,
                    "upstream reported an in-stream error"
                );
                return Err(GatewayError::Upstream {
                    provider: ProviderTag::Anthropic,
                    status: 200,
                    payload: data.to_string(),
                });
            }
            AnthropicStreamEvent::ContentBlockDelta { .. }
            | AnthropicStreamEvent::MessageDelta { usage: None }
            | AnthropicStreamEvent::Other => {}
        }
        Ok(())
    }
}

impl LineDecoder for AnthropicLineDecoder {
    fn provider(&self) -> ProviderTag {
        ProviderTag::Anthropic
    }

    fn decode_line(
        &mut self,
        line: &str,
        out: &mut VecDeque<StreamItem>,
    ) -> Result<(), GatewayError> {
        let Some(data) = data_payload(line) else {
            return Ok(());
        };
        let data = data.trim();
        if data.is_empty() || data == "[DONE]" {
            return Ok(());
        }
        match serde_json::from_str::<AnthropicStreamEvent>(data) {
            Ok(event) => self.apply(event, data, out),
            Err(err) => {
                log_skipped_line(ProviderTag::Anthropic, line, &err);
                Ok(())
            }
        }
    }

    fn finish(&mut self, _out: &mut VecDeque<StreamItem>) -> Result<(), GatewayError> {
        Ok(())
    }
}
