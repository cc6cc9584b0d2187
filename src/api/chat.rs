use std::sync::Arc;
use std::time::Instant;

use axum::body::Body;
use axum::extract::State;
use axum::response::{IntoResponse, Json, Response};
use bytes::Bytes;
use futures_util::StreamExt;

use crate::error::{ErrorKind, GatewayError};
use crate::gateway::GatewayOutput;
use crate::observability::log_request_complete;
use crate::protocol::canonical::{CanonicalRequest, CanonicalUsage, StreamItem};
use crate::protocol::provider::{resolve_provider, ProviderTag};
use crate::state::AppState;
use crate::stream::{chunk_frame, done_frame, ChunkStream};
use crate::transport::Transport;

/// `POST /v1/chat/completions`.
pub async fn handler<T: Transport>(State(state): State<Arc<AppState<T>>>, body: Bytes) -> Response {
    let seq = state.next_request_seq();
    let request_id = state.request_uuid(seq);
    let start_time = Instant::now();

    let request = match parse_request(&body) {
        Ok(request) => request,
        Err(err) => return error_response(err, request_id),
    };
    let provider = resolve_provider(&request.model);
    let model = request.model.clone();
    let stream = request.stream;

    tracing::debug!(
        %request_id,
        provider = provider.as_str(),
        model = %model,
        stream,
        "received chat completion request"
    );

    match state.gateway.complete(request).await {
        Ok(GatewayOutput::Response(response)) => {
            log_request_complete(provider, &model, false, Some(&response.usage), start_time);
            Json(response).into_response()
        }
        Ok(GatewayOutput::Stream(chunks)) => sse_response(sse_body(
            chunks,
            StreamLog {
                provider,
                model,
                start_time,
                usage: None,
            },
        )),
        Err(err) => error_response(err, request_id),
    }
}

fn parse_request(body: &[u8]) -> Result<CanonicalRequest, GatewayError> {
    serde_json::from_slice(body)
        .map_err(|err| GatewayError::InvalidRequest(format!("Invalid request body: {err}")))
}

fn error_response(err: GatewayError, request_id: uuid::Uuid) -> Response {
    match err.kind() {
        ErrorKind::ApiError => {
            tracing::warn!(%request_id, error = %err, "chat completion failed");
        }
        ErrorKind::InvalidRequest | ErrorKind::Authentication => {
            tracing::info!(%request_id, error = %err, "chat completion rejected");
        }
    }
    err.into_response()
}

/// Completion bookkeeping carried alongside a client stream.
struct StreamLog {
    provider: ProviderTag,
    model: String,
    start_time: Instant,
    usage: Option<CanonicalUsage>,
}

impl StreamLog {
    fn complete(&self) {
        log_request_complete(
            self.provider,
            &self.model,
            true,
            self.usage.as_ref(),
            self.start_time,
        );
    }
}

/// Frame canonical items as OpenAI SSE.
///
/// `Done` becomes `data: [DONE]` and closes the body. An `Err` item aborts
/// the body so the client sees a truncated stream without the end marker.
fn sse_body(chunks: ChunkStream, log: StreamLog) -> Body {
    let frames = futures_util::stream::unfold(
        (Some(chunks), log),
        |(chunks, mut log)| async move {
            let mut chunks = chunks?;
            match chunks.next().await {
                Some(Ok(StreamItem::Chunk(chunk))) => {
                    if chunk.usage.is_some() {
                        log.usage = chunk.usage;
                    }
                    let frame = chunk_frame(&chunk);
                    let next = if frame.is_ok() { Some(chunks) } else { None };
                    Some((frame, (next, log)))
                }
                Some(Ok(StreamItem::Done)) => {
                    log.complete();
                    Some((Ok(done_frame()), (None, log)))
                }
                Some(Err(err)) => {
                    tracing::warn!(
                        provider = log.provider.as_str(),
                        model = %log.model,
                        error = %err,
                        "stream aborted"
                    );
                    Some((Err(err), (None, log)))
                }
                None => {
                    log.complete();
                    None
                }
            }
        },
    );
    Body::from_stream(frames)
}

fn sse_response(body: Body) -> Response {
    let mut response = Response::new(body);
    let headers = response.headers_mut();
    headers.insert(
        http::header::CONTENT_TYPE,
        http::HeaderValue::from_static("text/event-stream"),
    );
    headers.insert(
        http::header::CACHE_CONTROL,
        http::HeaderValue::from_static("no-cache"),
    );
    headers.insert(
        http::header::CONNECTION,
        http::HeaderValue::from_static("keep-alive"),
    );
    response
}
