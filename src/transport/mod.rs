mod http_transport;

use std::future::Future;
use std::pin::Pin;

use bytes::{Bytes, BytesMut};
use futures_util::{Stream, StreamExt};

use crate::error::GatewayError;
use crate::protocol::provider::ProviderTag;
use crate::stream::unchunk::clean_chunk_artifacts;

pub use http_transport::HttpTransport;

/// Incremental upstream body. Dropping it tears down the connection.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, GatewayError>> + Send>>;

/// A fully translated provider request, ready to be sent.
#[derive(Clone)]
pub struct WireRequest {
    pub provider: ProviderTag,
    pub url: String,
    pub headers: http::HeaderMap,
    pub body: Bytes,
    pub stream: bool,
}

/// Body of an upstream response.
pub enum UpstreamBody {
    /// Live network body, delivered in arbitrarily sized fragments.
    Streaming(ByteStream),
    /// Whole body delivered at once by a proof-attesting fetch. May still
    /// carry chunked-transfer framing and extraction artifacts.
    Buffered(String),
}

impl UpstreamBody {
    /// Read the whole body as text.
    ///
    /// Buffered bodies are cleaned of chunk-framing artifacts so that the
    /// result is ready for JSON parsing.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Transport`] when the live body fails mid-read.
    pub async fn into_text(self) -> Result<String, GatewayError> {
        match self {
            UpstreamBody::Buffered(text) => Ok(clean_chunk_artifacts(&text).into_owned()),
            UpstreamBody::Streaming(mut stream) => {
                let mut buf = BytesMut::new();
                while let Some(fragment) = stream.next().await {
                    buf.extend_from_slice(&fragment?);
                }
                Ok(String::from_utf8_lossy(&buf).into_owned())
            }
        }
    }
}

/// Upstream response: status plus body.
pub struct UpstreamResponse {
    pub status: http::StatusCode,
    pub body: UpstreamBody,
}

/// Sends one translated request to its provider.
///
/// Implementations own timeouts; a timeout surfaces as
/// [`GatewayError::Transport`]. No implementation retries.
pub trait Transport: Send + Sync + 'static {
    fn send(
        &self,
        request: WireRequest,
    ) -> impl Future<Output = Result<UpstreamResponse, GatewayError>> + Send;
}

impl<T: Transport> Transport for std::sync::Arc<T> {
    fn send(
        &self,
        request: WireRequest,
    ) -> impl Future<Output = Result<UpstreamResponse, GatewayError>> + Send {
        T::send(self, request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_into_text_collects_fragments() {
        let fragments = futures_util::stream::iter(vec![
            Ok(Bytes::from_static(b"{\"a\":")),
            Ok(Bytes::from_static(b"1}")),
        ]);
        let body = UpstreamBody::Streaming(Box::pin(fragments));
        assert_eq!(body.into_text().await.unwrap(), "{\"a\":1}");
    }

    #[tokio::test]
    async fn test_into_text_cleans_buffered_body() {
        let body = UpstreamBody::Buffered("7\r\n{\"a\":1}\r\n0\r\n\r\n".to_string());
        assert_eq!(body.into_text().await.unwrap(), "{\"a\":1}");
    }

    #[tokio::test]
    async fn test_into_text_surfaces_read_failure() {
        let fragments = futures_util::stream::iter(vec![
            Ok(Bytes::from_static(b"{")),
            Err(GatewayError::Transport("connection reset".into())),
        ]);
        let body = UpstreamBody::Streaming(Box::pin(fragments));
        assert!(matches!(
            body.into_text().await,
            Err(GatewayError::Transport(_))
        ));
    }
}
