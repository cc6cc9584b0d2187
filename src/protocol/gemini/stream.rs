use std::collections::VecDeque;

use crate::error::GatewayError;
use crate::protocol::canonical::{CanonicalUsage, ResponseMeta, StreamItem};
use crate::protocol::gemini::GeminiResponse;
use crate::protocol::provider::ProviderTag;
use crate::stream::{log_skipped_line, LineDecoder};
use crate::util::{next_completion_id, unix_now_secs};

/// Line decoder for Gemini `streamGenerateContent` output.
///
/// Accepts one JSON object per line, whether delivered as SSE (`data: {..}`)
/// or as the elements of a JSON array written one per line. Gemini sends no
/// end event, so the terminal chunk and `Done` are produced at end of input.
pub struct GeminiLineDecoder {
    meta: ResponseMeta,
    usage: Option<CanonicalUsage>,
}

impl GeminiLineDecoder {
    #[must_use]
    pub fn new(model: &str) -> Self {
        Self {
            meta: ResponseMeta {
                id: next_completion_id(),
                created: unix_now_secs(),
                model: model.to_string(),
            },
            usage: None,
        }
    }
}

/// Strip SSE and JSON-array framing around a single object.
fn object_payload(line: &str) -> &str {
    let mut payload = line.trim();
    if let Some(rest) = payload.strip_prefix("data:") {
        payload = rest.trim_start();
    }
    payload = payload.trim_start_matches(['[', ',']).trim_start();
    payload = payload.trim_end_matches([']', ',']).trim_end();
    payload
}

impl LineDecoder for GeminiLineDecoder {
    fn provider(&self) -> ProviderTag {
        ProviderTag::Google
    }

    fn decode_line(
        &mut self,
        line: &str,
        out: &mut VecDeque<StreamItem>,
    ) -> Result<(), GatewayError> {
        let payload = object_payload(line);
        if payload.is_empty() {
            return Ok(());
        }
        let response = match serde_json::from_str::<GeminiResponse>(payload) {
            Ok(response) => response,
            Err(err) => {
                log_skipped_line(ProviderTag::Google, line, &err);
                return Ok(());
            }
        };

        if let Some(usage) = response.usage_metadata {
            self.usage = Some(CanonicalUsage::new(
                usage.prompt_token_count,
                usage.candidates_token_count,
            ));
        }
        if let Some(text) = response.first_text().filter(|text| !text.is_empty()) {
            out.push_back(StreamItem::Chunk(self.meta.chunk(text, None)));
        }
        Ok(())
    }

    fn finish(&mut self, out: &mut VecDeque<StreamItem>) -> Result<(), GatewayError> {
        out.push_back(StreamItem::Chunk(self.meta.terminal_chunk(self.usage)));
        out.push_back(StreamItem::Done);
        Ok(())
    }
}
