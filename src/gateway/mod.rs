pub mod adapter;

use crate::config::ProvidersConfig;
use crate::error::GatewayError;
use crate::protocol::canonical::{CanonicalRequest, CanonicalResponse};
use crate::protocol::error_shapes::map_upstream_error;
use crate::protocol::provider::{resolve_provider, ProviderTag};
use crate::stream::{decode_buffered, decode_byte_stream, ChunkStream};
use crate::transport::{Transport, UpstreamBody};

pub use adapter::{
    AnthropicAdapter, GoogleAdapter, OpenAiAdapter, ProviderAdapter, ProviderRegistry,
};

/// Result of a successful dispatch.
pub enum GatewayOutput {
    Response(CanonicalResponse),
    /// Lazily decoded chunks. Nothing is read upstream until polled.
    Stream(ChunkStream),
}

impl std::fmt::Debug for GatewayOutput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GatewayOutput::Response(response) => {
                f.debug_tuple("Response").field(response).finish()
            }
            GatewayOutput::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

/// Single entry point: validate, pick the provider, translate, send and
/// normalize. Providers and credentials are fixed at construction.
pub struct Gateway<T> {
    registry: ProviderRegistry,
    transport: T,
}

impl<T: Transport> Gateway<T> {
    #[must_use]
    pub fn new(providers: &ProvidersConfig, transport: T) -> Self {
        Self {
            registry: ProviderRegistry::from_config(providers),
            transport,
        }
    }

    /// Whether a credential is configured for `provider`.
    #[must_use]
    pub fn has_credential(&self, provider: ProviderTag) -> bool {
        self.registry.api_key(provider).is_some()
    }

    /// Run one chat completion.
    ///
    /// Validation and credential failures return before any network call.
    /// Non-2xx upstream statuses become [`GatewayError::Upstream`]. With
    /// `stream` set, the returned stream carries mid-stream failures as
    /// its final `Err` item.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError`] for invalid input, a missing credential,
    /// transport failures, upstream error statuses and undecodable bodies.
    pub async fn complete(
        &self,
        request: CanonicalRequest,
    ) -> Result<GatewayOutput, GatewayError> {
        validate_request(&request)?;

        let provider = resolve_provider(&request.model);
        let Some(api_key) = self.registry.api_key(provider) else {
            return Err(GatewayError::Authentication(format!(
                "{} API key not configured",
                provider.display_name()
            )));
        };
        let adapter = self.registry.adapter(provider);
        let wire = adapter.translate(&request, api_key)?;

        tracing::debug!(
            provider = provider.as_str(),
            model = %request.model,
            stream = request.stream,
            messages = request.messages.len(),
            url = %wire.url,
            "dispatching upstream request"
        );

        let response = self.transport.send(wire).await?;
        if !response.status.is_success() {
            let status = response.status.as_u16();
            let text = match response.body.into_text().await {
                Ok(text) => text,
                Err(err) => err.to_string(),
            };
            return Err(map_upstream_error(provider, status, &text));
        }

        if request.stream {
            let decoder = adapter.stream_decoder(&request);
            let stream = match response.body {
                UpstreamBody::Streaming(body) => decode_byte_stream(body, decoder),
                UpstreamBody::Buffered(text) => decode_buffered(&text, decoder),
            };
            return Ok(GatewayOutput::Stream(stream));
        }

        let text = response.body.into_text().await?;
        adapter
            .normalize(&text, &request)
            .map(GatewayOutput::Response)
    }
}

/// Input checks shared by every provider.
///
/// # Errors
///
/// Returns [`GatewayError::InvalidRequest`] for an empty model or message list.
pub fn validate_request(request: &CanonicalRequest) -> Result<(), GatewayError> {
    if request.model.is_empty() {
        return Err(GatewayError::InvalidRequest(
            "Model is required".to_string(),
        ));
    }
    if request.messages.is_empty() {
        return Err(GatewayError::InvalidRequest(
            "Messages array is required and must not be empty".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use bytes::Bytes;
    use futures_util::StreamExt;

    use super::*;
    use crate::protocol::canonical::{CanonicalRole, ChatMessage, FinishReason, StreamItem};
    use crate::transport::{UpstreamResponse, WireRequest};

    /// Replays one canned response and records what was sent.
    struct CannedTransport {
        status: http::StatusCode,
        body: &'static str,
        buffered: bool,
        sent: Mutex<Vec<WireRequest>>,
    }

    impl CannedTransport {
        fn new(status: u16, body: &'static str) -> Self {
            Self {
                status: http::StatusCode::from_u16(status).unwrap(),
                body,
                buffered: false,
                sent: Mutex::new(Vec::new()),
            }
        }

        fn sent(&self) -> Vec<WireRequest> {
            self.sent.lock().unwrap().clone()
        }
    }

    impl Transport for CannedTransport {
        async fn send(&self, request: WireRequest) -> Result<UpstreamResponse, GatewayError> {
            self.sent.lock().unwrap().push(request);
            let body = if self.buffered {
                UpstreamBody::Buffered(self.body.to_string())
            } else {
                let fragments: Vec<Result<Bytes, GatewayError>> = self
                    .body
                    .as_bytes()
                    .chunks(7)
                    .map(|part| Ok(Bytes::copy_from_slice(part)))
                    .collect();
                UpstreamBody::Streaming(Box::pin(futures_util::stream::iter(fragments)))
            };
            Ok(UpstreamResponse {
                status: self.status,
                body,
            })
        }
    }

    fn providers() -> ProvidersConfig {
        let mut providers = ProvidersConfig::default();
        providers.anthropic.api_key = Some("sk-ant".to_string());
        providers.openai.api_key = Some("sk-oai".to_string());
        providers
    }

    fn request(model: &str, stream: bool) -> CanonicalRequest {
        CanonicalRequest {
            model: model.to_string(),
            messages: vec![ChatMessage::new(CanonicalRole::User, "Hi")],
            stream,
            ..CanonicalRequest::default()
        }
    }

    #[tokio::test]
    async fn test_validation_precedes_credentials() {
        let gateway = Gateway::new(&ProvidersConfig::default(), CannedTransport::new(200, "{}"));
        let err = gateway.complete(request("", false)).await.unwrap_err();
        assert_eq!(err.to_string(), "Model is required");

        let mut empty = request("gpt-4", false);
        empty.messages.clear();
        let err = gateway.complete(empty).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "Messages array is required and must not be empty"
        );
        assert!(gateway.transport.sent().is_empty());
    }

    #[test]
    fn test_only_an_empty_model_is_rejected() {
        assert!(validate_request(&request("", false)).is_err());
        assert!(validate_request(&request("  ", false)).is_ok());
    }

    #[tokio::test]
    async fn test_missing_credential_skips_network() {
        let gateway = Gateway::new(&providers(), CannedTransport::new(200, "{}"));
        let err = gateway
            .complete(request("google/gemini-pro", false))
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::Authentication(_)));
        assert_eq!(err.to_string(), "Google API key not configured");
        assert!(gateway.transport.sent().is_empty());
        assert!(!gateway.has_credential(ProviderTag::Google));
    }

    #[tokio::test]
    async fn test_anthropic_non_stream() {
        let body = r#"{"id":"msg_9","content":[{"type":"text","text":"Hello"}],"stop_reason":"end_turn","usage":{"input_tokens":3,"output_tokens":2}}"#;
        let gateway = Gateway::new(&providers(), CannedTransport::new(200, body));
        let output = gateway
            .complete(request("anthropic/claude-3-haiku", false))
            .await
            .unwrap();
        let GatewayOutput::Response(response) = output else {
            panic!("expected a response");
        };
        assert_eq!(response.content, "Hello");
        assert_eq!(response.model, "anthropic/claude-3-haiku");
        assert_eq!(response.usage.total_tokens(), 5);

        let sent = gateway.transport.sent();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].url.ends_with("/messages"));
        assert_eq!(sent[0].provider, ProviderTag::Anthropic);
    }

    #[tokio::test]
    async fn test_error_status_maps_to_upstream_error() {
        let gateway = Gateway::new(
            &providers(),
            CannedTransport::new(429, r#"{"error":{"message":"slow down"}}"#),
        );
        let err = gateway.complete(request("gpt-4o", true)).await.unwrap_err();
        match err {
            GatewayError::Upstream {
                provider, status, ..
            } => {
                assert_eq!(provider, ProviderTag::OpenAi);
                assert_eq!(status, 429);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_openai_stream_ends_with_done() {
        let body = concat!(
            "data: {\"id\":\"c1\",\"created\":5,\"model\":\"gpt-4o\",\"choices\":[{\"index\":0,\"delta\":{\"content\":\"Hi\"},\"finish_reason\":null}]}\n\n",
            "data: {\"id\":\"c1\",\"created\":5,\"model\":\"gpt-4o\",\"choices\":[{\"index\":0,\"delta\":{},\"finish_reason\":\"stop\"}]}\n\n",
            "data: [DONE]\n\n",
        );
        let gateway = Gateway::new(&providers(), CannedTransport::new(200, body));
        let GatewayOutput::Stream(stream) =
            gateway.complete(request("gpt-4o", true)).await.unwrap()
        else {
            panic!("expected a stream");
        };
        let items: Vec<StreamItem> = stream.map(Result::unwrap).collect().await;
        assert_eq!(items.len(), 3);
        assert_eq!(items[0].as_chunk().unwrap().delta, "Hi");
        assert_eq!(
            items[1].as_chunk().unwrap().finish_reason,
            Some(FinishReason::Stop)
        );
        assert!(items[2].is_done());
    }

    #[tokio::test]
    async fn test_non_json_success_body_is_decode_error() {
        let mut transport = CannedTransport::new(200, "<html>oops</html>");
        transport.buffered = true;
        let gateway = Gateway::new(&providers(), transport);
        let err = gateway.complete(request("gpt-4", false)).await.unwrap_err();
        assert!(matches!(
            err,
            GatewayError::Decode {
                provider: ProviderTag::OpenAi,
                ..
            }
        ));
    }
}
