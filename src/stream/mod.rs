pub mod lines;
pub mod sse;
pub mod unchunk;

use std::collections::VecDeque;
use std::pin::Pin;

use bytes::Bytes;
use futures_util::{Stream, StreamExt};

use crate::error::GatewayError;
use crate::protocol::canonical::StreamItem;
use crate::protocol::provider::ProviderTag;
use crate::transport::ByteStream;

pub use lines::LineBuffer;
pub use sse::{chunk_frame, done_frame};
pub use unchunk::clean_chunk_artifacts;

/// Lazily produced canonical stream. Dropping it cancels the upstream read.
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<StreamItem, GatewayError>> + Send>>;

const MAX_LOGGED_LINE_LEN: usize = 200;

/// Per-provider decoder fed one complete line at a time.
///
/// Implementations push zero or more items per line. An `Err` is a terminal
/// stream error; malformed lines should be logged and skipped instead.
pub trait LineDecoder: Send {
    fn provider(&self) -> ProviderTag;

    fn decode_line(
        &mut self,
        line: &str,
        out: &mut VecDeque<StreamItem>,
    ) -> Result<(), GatewayError>;

    /// Called once at natural end of input, after the trailing partial line.
    fn finish(&mut self, out: &mut VecDeque<StreamItem>) -> Result<(), GatewayError>;
}

/// Log a dropped line with a bounded copy of its content.
pub(crate) fn log_skipped_line(provider: ProviderTag, line: &str, reason: &dyn std::fmt::Display) {
    let mut end = line.len().min(MAX_LOGGED_LINE_LEN);
    while !line.is_char_boundary(end) {
        end -= 1;
    }
    tracing::warn!(
        provider = provider.as_str(),
        line = &line[..end],
        error = %reason,
        "skipping malformed stream line"
    );
}

struct DecodeState {
    upstream: Option<ByteStream>,
    lines: LineBuffer,
    decoder: Box<dyn LineDecoder>,
    pending: VecDeque<StreamItem>,
    failure: Option<GatewayError>,
    finished: bool,
}

impl DecodeState {
    fn feed(&mut self, fragment: &[u8]) {
        let Self {
            lines,
            decoder,
            pending,
            failure,
            ..
        } = self;
        lines.feed(fragment, |line| {
            if failure.is_none() {
                if let Err(err) = decoder.decode_line(line, pending) {
                    *failure = Some(err);
                }
            }
        });
    }

    fn end_of_input(&mut self) {
        self.upstream = None;
        {
            let Self {
                lines,
                decoder,
                pending,
                failure,
                ..
            } = self;
            lines.finish(|line| {
                if failure.is_none() {
                    if let Err(err) = decoder.decode_line(line, pending) {
                        *failure = Some(err);
                    }
                }
            });
        }
        if self.failure.is_none() {
            if let Err(err) = self.decoder.finish(&mut self.pending) {
                self.failure = Some(err);
            }
        }
        if self.failure.is_none() && !self.pending.iter().any(StreamItem::is_done) {
            tracing::warn!(
                provider = self.decoder.provider().as_str(),
                "upstream stream ended without an end marker"
            );
        }
    }

    fn terminate(&mut self) {
        self.finished = true;
        self.upstream = None;
        self.pending.clear();
    }
}

impl Drop for DecodeState {
    fn drop(&mut self) {
        if !self.finished {
            tracing::debug!(
                provider = self.decoder.provider().as_str(),
                "stream consumer went away; closing upstream"
            );
        }
    }
}

/// Decode a live upstream byte stream into canonical stream items.
///
/// Pull-based: a fragment is only read when the consumer asks for an item
/// and nothing decoded is pending. After `Done` the upstream is dropped and
/// any further input ignored. A read failure is yielded as a single `Err`,
/// after which the stream ends without `Done`.
pub fn decode_byte_stream(upstream: ByteStream, decoder: Box<dyn LineDecoder>) -> ChunkStream {
    let state = DecodeState {
        upstream: Some(upstream),
        lines: LineBuffer::new(),
        decoder,
        pending: VecDeque::with_capacity(8),
        failure: None,
        finished: false,
    };

    Box::pin(futures_util::stream::unfold(state, |mut state| async move {
        loop {
            if state.finished {
                return None;
            }
            if let Some(item) = state.pending.pop_front() {
                if item.is_done() {
                    state.terminate();
                }
                return Some((Ok(item), state));
            }
            if let Some(err) = state.failure.take() {
                state.terminate();
                return Some((Err(err), state));
            }

            let Some(upstream) = state.upstream.as_mut() else {
                state.terminate();
                return None;
            };
            let next = upstream.next().await;
            match next {
                Some(Ok(fragment)) => state.feed(&fragment),
                Some(Err(err)) => {
                    tracing::warn!(
                        provider = state.decoder.provider().as_str(),
                        error = %err,
                        "upstream stream read failed"
                    );
                    state.upstream = None;
                    state.pending.clear();
                    state.failure = Some(err);
                }
                None => state.end_of_input(),
            }
        }
    }))
}

/// Decode a body that arrived in one piece instead of as a byte stream.
///
/// The text is cleaned of chunk-framing artifacts first, then runs through
/// the same line machinery as a live stream.
pub fn decode_buffered(text: &str, decoder: Box<dyn LineDecoder>) -> ChunkStream {
    let cleaned = Bytes::from(clean_chunk_artifacts(text).into_owned());
    let upstream: ByteStream = Box::pin(futures_util::stream::once(async move { Ok(cleaned) }));
    decode_byte_stream(upstream, decoder)
}
