use bytes::Bytes;
use http::header::{AUTHORIZATION, CONTENT_TYPE};
use http::{HeaderMap, HeaderName, HeaderValue};
use serde::Serialize;

use crate::config::{ProvidersConfig, DEFAULT_ANTHROPIC_VERSION};
use crate::error::GatewayError;
use crate::protocol::anthropic::encoder::encode_anthropic_request;
use crate::protocol::anthropic::response_decoder::decode_anthropic_response;
use crate::protocol::anthropic::stream::AnthropicLineDecoder;
use crate::protocol::anthropic::AnthropicResponse;
use crate::protocol::canonical::{CanonicalRequest, CanonicalResponse};
use crate::protocol::gemini::encoder::encode_gemini_request;
use crate::protocol::gemini::response_decoder::decode_gemini_response;
use crate::protocol::gemini::stream::GeminiLineDecoder;
use crate::protocol::gemini::GeminiResponse;
use crate::protocol::openai_chat::encoder::encode_openai_chat_request;
use crate::protocol::openai_chat::response_decoder::decode_openai_chat_response;
use crate::protocol::openai_chat::stream::OpenAiLineDecoder;
use crate::protocol::openai_chat::OpenAiChatResponse;
use crate::protocol::provider::{bare_model_id, ProviderTag};
use crate::stream::LineDecoder;
use crate::transport::WireRequest;

static X_API_KEY: HeaderName = HeaderName::from_static("x-api-key");
static ANTHROPIC_VERSION: HeaderName = HeaderName::from_static("anthropic-version");
static X_GOOG_API_KEY: HeaderName = HeaderName::from_static("x-goog-api-key");

/// Everything the dispatcher needs from one provider.
pub trait ProviderAdapter: Send + Sync {
    fn provider(&self) -> ProviderTag;

    /// Build the wire request for `request`, authenticated with `api_key`.
    ///
    /// # Errors
    ///
    /// Fails when the key cannot be carried in a header or the body cannot
    /// be serialized.
    fn translate(
        &self,
        request: &CanonicalRequest,
        api_key: &str,
    ) -> Result<WireRequest, GatewayError>;

    /// Normalize a complete, successful response body.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Decode`] when the body is not the expected JSON.
    fn normalize(
        &self,
        body: &str,
        request: &CanonicalRequest,
    ) -> Result<CanonicalResponse, GatewayError>;

    /// Fresh line decoder for one streamed response.
    fn stream_decoder(&self, request: &CanonicalRequest) -> Box<dyn LineDecoder>;
}

fn json_body<T: Serialize>(wire: &T) -> Result<Bytes, GatewayError> {
    serde_json::to_vec(wire)
        .map(Bytes::from)
        .map_err(|err| GatewayError::Internal(format!("Failed to encode request body: {err}")))
}

fn credential_header(provider: ProviderTag, value: &str) -> Result<HeaderValue, GatewayError> {
    let mut header = HeaderValue::from_str(value).map_err(|_| {
        GatewayError::Authentication(format!(
            "{} API key is not a valid header value",
            provider.display_name()
        ))
    })?;
    header.set_sensitive(true);
    Ok(header)
}

fn json_headers() -> HeaderMap {
    let mut headers = HeaderMap::with_capacity(3);
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers
}

fn parse_body<'a, T: serde::Deserialize<'a>>(
    provider: ProviderTag,
    body: &'a str,
) -> Result<T, GatewayError> {
    serde_json::from_str(body).map_err(|err| GatewayError::decode(provider, err))
}

// ---------------------------------------------------------------------------
// Anthropic
// ---------------------------------------------------------------------------

pub struct AnthropicAdapter {
    messages_url: String,
    api_version: HeaderValue,
}

impl AnthropicAdapter {
    #[must_use]
    pub fn new(base_url: &str, api_version: Option<&str>) -> Self {
        let api_version = api_version
            .and_then(|v| HeaderValue::from_str(v.trim()).ok())
            .unwrap_or_else(|| HeaderValue::from_static(DEFAULT_ANTHROPIC_VERSION));
        Self {
            messages_url: format!("{base_url}/messages"),
            api_version,
        }
    }
}

impl ProviderAdapter for AnthropicAdapter {
    fn provider(&self) -> ProviderTag {
        ProviderTag::Anthropic
    }

    fn translate(
        &self,
        request: &CanonicalRequest,
        api_key: &str,
    ) -> Result<WireRequest, GatewayError> {
        let mut headers = json_headers();
        headers.insert(
            X_API_KEY.clone(),
            credential_header(ProviderTag::Anthropic, api_key)?,
        );
        headers.insert(ANTHROPIC_VERSION.clone(), self.api_version.clone());
        Ok(WireRequest {
            provider: ProviderTag::Anthropic,
            url: self.messages_url.clone(),
            headers,
            body: json_body(&encode_anthropic_request(request))?,
            stream: request.stream,
        })
    }

    fn normalize(
        &self,
        body: &str,
        request: &CanonicalRequest,
    ) -> Result<CanonicalResponse, GatewayError> {
        let wire: AnthropicResponse = parse_body(ProviderTag::Anthropic, body)?;
        Ok(decode_anthropic_response(wire, &request.model))
    }

    fn stream_decoder(&self, request: &CanonicalRequest) -> Box<dyn LineDecoder> {
        Box::new(AnthropicLineDecoder::new(&request.model))
    }
}

// ---------------------------------------------------------------------------
// OpenAI
// ---------------------------------------------------------------------------

pub struct OpenAiAdapter {
    completions_url: String,
}

impl OpenAiAdapter {
    #[must_use]
    pub fn new(base_url: &str) -> Self {
        Self {
            completions_url: format!("{base_url}/chat/completions"),
        }
    }
}

impl ProviderAdapter for OpenAiAdapter {
    fn provider(&self) -> ProviderTag {
        ProviderTag::OpenAi
    }

    fn translate(
        &self,
        request: &CanonicalRequest,
        api_key: &str,
    ) -> Result<WireRequest, GatewayError> {
        let mut headers = json_headers();
        headers.insert(
            AUTHORIZATION,
            credential_header(ProviderTag::OpenAi, &format!("Bearer {api_key}"))?,
        );
        Ok(WireRequest {
            provider: ProviderTag::OpenAi,
            url: self.completions_url.clone(),
            headers,
            body: json_body(&encode_openai_chat_request(request))?,
            stream: request.stream,
        })
    }

    fn normalize(
        &self,
        body: &str,
        request: &CanonicalRequest,
    ) -> Result<CanonicalResponse, GatewayError> {
        let wire: OpenAiChatResponse = parse_body(ProviderTag::OpenAi, body)?;
        Ok(decode_openai_chat_response(wire, &request.model))
    }

    fn stream_decoder(&self, request: &CanonicalRequest) -> Box<dyn LineDecoder> {
        Box::new(OpenAiLineDecoder::new(&request.model))
    }
}

// ---------------------------------------------------------------------------
// Google
// ---------------------------------------------------------------------------

pub struct GoogleAdapter {
    base_url: String,
}

impl GoogleAdapter {
    #[must_use]
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.to_string(),
        }
    }

    /// `models/<id>:generateContent`, or `:streamGenerateContent?alt=sse`
    /// so each streamed object arrives on its own line.
    fn endpoint(&self, model: &str, stream: bool) -> String {
        let model_id = bare_model_id(model);
        if stream {
            format!(
                "{}/models/{model_id}:streamGenerateContent?alt=sse",
                self.base_url
            )
        } else {
            format!("{}/models/{model_id}:generateContent", self.base_url)
        }
    }
}

impl ProviderAdapter for GoogleAdapter {
    fn provider(&self) -> ProviderTag {
        ProviderTag::Google
    }

    fn translate(
        &self,
        request: &CanonicalRequest,
        api_key: &str,
    ) -> Result<WireRequest, GatewayError> {
        let mut headers = json_headers();
        headers.insert(
            X_GOOG_API_KEY.clone(),
            credential_header(ProviderTag::Google, api_key)?,
        );
        Ok(WireRequest {
            provider: ProviderTag::Google,
            url: self.endpoint(&request.model, request.stream),
            headers,
            body: json_body(&encode_gemini_request(request))?,
            stream: request.stream,
        })
    }

    fn normalize(
        &self,
        body: &str,
        request: &CanonicalRequest,
    ) -> Result<CanonicalResponse, GatewayError> {
        let wire: GeminiResponse = parse_body(ProviderTag::Google, body)?;
        Ok(decode_gemini_response(&wire, &request.model))
    }

    fn stream_decoder(&self, request: &CanonicalRequest) -> Box<dyn LineDecoder> {
        Box::new(GeminiLineDecoder::new(&request.model))
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

struct ProviderEntry {
    adapter: Box<dyn ProviderAdapter>,
    api_key: Option<String>,
}

impl ProviderEntry {
    fn new(adapter: Box<dyn ProviderAdapter>, providers: &ProvidersConfig) -> Self {
        let api_key = providers
            .get(adapter.provider())
            .api_key()
            .map(str::to_string);
        Self { adapter, api_key }
    }
}

/// One adapter and credential per provider, fixed at construction.
pub struct ProviderRegistry {
    anthropic: ProviderEntry,
    openai: ProviderEntry,
    google: ProviderEntry,
}

impl ProviderRegistry {
    #[must_use]
    pub fn from_config(providers: &ProvidersConfig) -> Self {
        let anthropic = &providers.anthropic;
        Self {
            anthropic: ProviderEntry::new(
                Box::new(AnthropicAdapter::new(
                    anthropic.base_url_for(ProviderTag::Anthropic),
                    anthropic.api_version.as_deref(),
                )),
                providers,
            ),
            openai: ProviderEntry::new(
                Box::new(OpenAiAdapter::new(
                    providers.openai.base_url_for(ProviderTag::OpenAi),
                )),
                providers,
            ),
            google: ProviderEntry::new(
                Box::new(GoogleAdapter::new(
                    providers.google.base_url_for(ProviderTag::Google),
                )),
                providers,
            ),
        }
    }

    fn entry(&self, provider: ProviderTag) -> &ProviderEntry {
        match provider {
            ProviderTag::Anthropic => &self.anthropic,
            ProviderTag::OpenAi => &self.openai,
            ProviderTag::Google => &self.google,
        }
    }

    #[must_use]
    pub fn adapter(&self, provider: ProviderTag) -> &dyn ProviderAdapter {
        self.entry(provider).adapter.as_ref()
    }

    #[must_use]
    pub fn api_key(&self, provider: ProviderTag) -> Option<&str> {
        self.entry(provider).api_key.as_deref()
    }
}
