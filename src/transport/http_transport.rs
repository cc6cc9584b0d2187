use std::time::Duration;

use futures_util::StreamExt;

use crate::config::ServerConfig;
use crate::error::GatewayError;

use super::{Transport, UpstreamBody, UpstreamResponse, WireRequest};

fn build_reqwest_client(config: &ServerConfig) -> Result<reqwest::Client, GatewayError> {
    let pool_idle_timeout = if config.http_pool_idle_timeout_secs == 0 {
        None
    } else {
        Some(Duration::from_secs(config.http_pool_idle_timeout_secs))
    };

    let mut builder = reqwest::Client::builder()
        .pool_max_idle_per_host(config.http_pool_max_idle_per_host.max(1))
        .pool_idle_timeout(pool_idle_timeout)
        .tcp_nodelay(true)
        .connect_timeout(Duration::from_secs(config.connect_timeout))
        .redirect(reqwest::redirect::Policy::none())
        .timeout(Duration::from_secs(config.timeout));

    if let Some(proxy_url) = config.proxy.as_deref() {
        let proxy = reqwest::Proxy::all(proxy_url)
            .map_err(|err| GatewayError::Transport(format!("Invalid proxy URL: {err}")))?;
        builder = builder.no_proxy().proxy(proxy);
    } else if !config.http_use_env_proxy {
        builder = builder.no_proxy();
    }

    builder
        .build()
        .map_err(|err| GatewayError::Transport(format!("Failed to build HTTP client: {err}")))
}

/// Plain network transport backed by a pooled reqwest client.
///
/// Bodies are always handed back as [`UpstreamBody::Streaming`]; the
/// non-streaming path simply drains them.
#[derive(Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Build a transport with pooling, timeouts and proxy settings from config.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Transport`] when the proxy URL is invalid or
    /// the TLS backend fails to initialize.
    pub fn new(config: &ServerConfig) -> Result<Self, GatewayError> {
        Ok(Self {
            client: build_reqwest_client(config)?,
        })
    }
}

impl Transport for HttpTransport {
    async fn send(&self, request: WireRequest) -> Result<UpstreamResponse, GatewayError> {
        let provider = request.provider;
        let response = self
            .client
            .post(&request.url)
            .headers(request.headers)
            .body(request.body)
            .send()
            .await
            .map_err(|err| {
                let reason = if err.is_timeout() {
                    "timed out"
                } else if err.is_connect() {
                    "connection failed"
                } else {
                    "request failed"
                };
                tracing::warn!(
                    provider = provider.as_str(),
                    error = %err,
                    "upstream {reason}"
                );
                GatewayError::Transport(format!(
                    "{} request {reason}: {err}",
                    provider.display_name()
                ))
            })?;

        let status = response.status();
        tracing::debug!(
            provider = provider.as_str(),
            status = status.as_u16(),
            stream = request.stream,
            "upstream responded"
        );

        let body = response.bytes_stream().map(move |fragment| {
            fragment.map_err(|err| {
                GatewayError::Transport(format!(
                    "Failed to read {} response body: {err}",
                    provider.display_name()
                ))
            })
        });

        Ok(UpstreamResponse {
            status,
            body: UpstreamBody::Streaming(Box::pin(body)),
        })
    }
}
