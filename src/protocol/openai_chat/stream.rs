use std::collections::VecDeque;

use crate::error::GatewayError;
use crate::protocol::canonical::{CanonicalChunk, CanonicalUsage, FinishReason, StreamItem};
use crate::protocol::openai_chat::OpenAiStreamChunk;
use crate::protocol::provider::ProviderTag;
use crate::stream::sse::data_payload;
use crate::stream::{log_skipped_line, LineDecoder};
use crate::util::unix_now_secs;

/// Line decoder for `OpenAI` chat-completion SSE streams.
///
/// Chunks are already in the canonical shape; each one is re-emitted with
/// its upstream id, timestamp and model. `data: [DONE]` ends the stream.
pub struct OpenAiLineDecoder {
    requested_model: String,
}

impl OpenAiLineDecoder {
    #[must_use]
    pub fn new(model: &str) -> Self {
        Self {
            requested_model: model.to_string(),
        }
    }

    fn to_canonical(&self, chunk: OpenAiStreamChunk) -> Option<CanonicalChunk> {
        let OpenAiStreamChunk {
            id,
            created,
            model,
            choices,
            usage,
        } = chunk;
        let usage = usage.map(|u| CanonicalUsage::new(u.prompt_tokens, u.completion_tokens));

        let (delta, finish_reason) = match choices.into_iter().next() {
            Some(choice) => (
                choice.delta.content.unwrap_or_default(),
                choice.finish_reason.as_deref().map(FinishReason::from_openai),
            ),
            // Trailing usage-only chunk.
            None if usage.is_some() => (String::new(), None),
            None => return None,
        };

        Some(CanonicalChunk {
            id,
            created: if created == 0 { unix_now_secs() } else { created },
            model: if model.is_empty() {
                self.requested_model.clone()
            } else {
                model
            },
            delta,
            finish_reason,
            usage,
        })
    }
}

impl LineDecoder for OpenAiLineDecoder {
    fn provider(&self) -> ProviderTag {
        ProviderTag::OpenAi
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
        if data.is_empty() {
            return Ok(());
        }
        if data == "[DONE]" {
            out.push_back(StreamItem::Done);
            return Ok(());
        }
        match serde_json::from_str::<OpenAiStreamChunk>(data) {
            Ok(chunk) => {
                if let Some(chunk) = self.to_canonical(chunk) {
                    out.push_back(StreamItem::Chunk(chunk));
                }
            }
            Err(err) => log_skipped_line(ProviderTag::OpenAi, line, &err),
        }
        Ok(())
    }

    fn finish(&mut self, _out: &mut VecDeque<StreamItem>) -> Result<(), GatewayError> {
        Ok(())
    }
}
