use crate::error::{ErrorKind, GatewayError};
use crate::protocol::provider::ProviderTag;

const MAX_PAYLOAD_LEN: usize = 2000;

#[must_use]
pub(crate) fn error_payload(kind: ErrorKind, message: &str) -> serde_json::Value {
    serde_json::json!({
        "error": {
            "message": message,
            "type": kind.wire_type(),
        }
    })
}

/// Map a non-success upstream response into a gateway error.
///
/// JSON payloads are re-serialized compactly; anything else is carried as
/// trimmed text. All three providers nest a human-readable message under
/// `error.message`, which is logged separately.
#[must_use]
pub fn map_upstream_error(provider: ProviderTag, status: u16, body: &str) -> GatewayError {
    let parsed = serde_json::from_str::<serde_json::Value>(body).ok();
    let upstream_message = parsed
        .as_ref()
        .and_then(|json| json.get("error"))
        .and_then(|e| e.get("message"))
        .and_then(serde_json::Value::as_str);

    tracing::warn!(
        provider = provider.as_str(),
        status,
        upstream_message = upstream_message.unwrap_or(""),
        "upstream returned an error status"
    );

    let payload = match parsed {
        Some(json) => json.to_string(),
        None => body.trim().to_string(),
    };

    GatewayError::Upstream {
        provider,
        status,
        payload: truncate_on_char_boundary(payload, MAX_PAYLOAD_LEN),
    }
}

fn truncate_on_char_boundary(mut text: String, max_len: usize) -> String {
    if text.len() <= max_len {
        return text;
    }
    let mut cut = max_len;
    while !text.is_char_boundary(cut) {
        cut -= 1;
    }
    text.truncate(cut);
    text.push_str("...");
    text
}
