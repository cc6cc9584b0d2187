use crate::protocol::error_shapes::error_payload;
use crate::protocol::provider::ProviderTag;

/// Error type used across the gateway pipeline.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("{0}")]
    InvalidRequest(String),
    #[error("{0}")]
    Authentication(String),
    #[error("{} API error: {payload}", .provider.display_name())]
    Upstream {
        provider: ProviderTag,
        status: u16,
        payload: String,
    },
    #[error("Transport error: {0}")]
    Transport(String),
    #[error("Failed to decode {} response: {message}", .provider.display_name())]
    Decode {
        provider: ProviderTag,
        message: String,
    },
    #[error("Internal error: {0}")]
    Internal(String),
}

/// The three-way taxonomy exposed to gateway callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidRequest,
    Authentication,
    ApiError,
}

impl ErrorKind {
    /// Value of the `error.type` field on the wire.
    #[must_use]
    pub fn wire_type(self) -> &'static str {
        match self {
            ErrorKind::InvalidRequest => "invalid_request_error",
            ErrorKind::Authentication => "authentication_error",
            ErrorKind::ApiError => "api_error",
        }
    }

    #[must_use]
    pub fn http_status(self) -> http::StatusCode {
        match self {
            ErrorKind::InvalidRequest => http::StatusCode::BAD_REQUEST,
            ErrorKind::Authentication => http::StatusCode::UNAUTHORIZED,
            ErrorKind::ApiError => http::StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl GatewayError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            GatewayError::InvalidRequest(_) => ErrorKind::InvalidRequest,
            GatewayError::Authentication(_) => ErrorKind::Authentication,
            GatewayError::Upstream { .. }
            | GatewayError::Transport(_)
            | GatewayError::Decode { .. }
            | GatewayError::Internal(_) => ErrorKind::ApiError,
        }
    }

    pub(crate) fn decode(provider: ProviderTag, err: impl std::fmt::Display) -> Self {
        GatewayError::Decode {
            provider,
            message: err.to_string(),
        }
    }
}

/// Format an error for the client, returning (`status_code`, JSON body).
#[must_use]
pub fn format_error(err: &GatewayError) -> (http::StatusCode, serde_json::Value) {
    let kind = err.kind();
    (kind.http_status(), error_payload(kind, &err.to_string()))
}

impl axum::response::IntoResponse for GatewayError {
    fn into_response(self) -> axum::response::Response {
        let (status, body) = format_error(&self);
        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_kind_mapping() {
        assert_eq!(
            GatewayError::InvalidRequest("x".into()).kind(),
            ErrorKind::InvalidRequest
        );
        assert_eq!(
            GatewayError::Authentication("x".into()).kind(),
            ErrorKind::Authentication
        );
        assert_eq!(
            GatewayError::Transport("reset".into()).kind(),
            ErrorKind::ApiError
        );
        assert_eq!(
            GatewayError::decode(ProviderTag::Google, "eof").kind(),
            ErrorKind::ApiError
        );
    }

    #[test]
    fn test_format_upstream_error() {
        let err = GatewayError::Upstream {
            provider: ProviderTag::Anthropic,
            status: 429,
            payload: r#"{"type":"error"}"#.to_string(),
        };
        let (status, body) = format_error(&err);
        assert_eq!(status, http::StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body,
            json!({
                "error": {
                    "message": "Anthropic API error: {\"type\":\"error\"}",
                    "type": "api_error"
                }
            })
        );
    }

    #[test]
    fn test_format_validation_errors() {
        let (status, body) = format_error(&GatewayError::InvalidRequest(
            "Model is required".to_string(),
        ));
        assert_eq!(status, http::StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["type"], "invalid_request_error");
        assert_eq!(body["error"]["message"], "Model is required");

        let (status, body) = format_error(&GatewayError::Authentication(
            "OpenAI API key not configured".to_string(),
        ));
        assert_eq!(status, http::StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"]["type"], "authentication_error");
    }
}
