use bytes::Bytes;

use crate::error::GatewayError;
use crate::protocol::canonical::CanonicalChunk;

const DONE_FRAME: &str = "data: [DONE]\n\n";

/// Format one client-facing SSE frame around a JSON payload.
#[must_use]
pub fn openai_sse_frame(json: &str) -> String {
    let mut out = String::with_capacity(8 + json.len());
    out.push_str("data: ");
    out.push_str(json);
    out.push_str("\n\n");
    out
}

/// Serialize a canonical chunk as a `data: <json>\n\n` frame.
///
/// # Errors
///
/// Returns [`GatewayError::Internal`] if the chunk cannot be serialized.
pub fn chunk_frame(chunk: &CanonicalChunk) -> Result<Bytes, GatewayError> {
    let json = serde_json::to_string(chunk)
        .map_err(|err| GatewayError::Internal(format!("Failed to encode chunk: {err}")))?;
    Ok(Bytes::from(openai_sse_frame(&json)))
}

/// The `data: [DONE]\n\n` frame closing every successful stream.
#[must_use]
pub fn done_frame() -> Bytes {
    Bytes::from_static(DONE_FRAME.as_bytes())
}

/// Strip the `data:` field name (and one optional space) from an SSE line.
#[must_use]
pub fn data_payload(line: &str) -> Option<&str> {
    let value = line.strip_prefix("data:")?;
    Some(value.strip_prefix(' ').unwrap_or(value))
}
