pub mod sse;
pub mod utf8;

pub use sse::SseLineParser;
pub use utf8::Utf8StreamDecoder;

use std::pin::Pin;
use std::task::{ready, Context, Poll};

use futures_util::Stream;
use pin_project_lite::pin_project;

use self::sse::PendingFrames;

/// One complete `data:` line from the response, minus its prefix.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Frame {
    pub payload: String,
}

pin_project! {
    /// Lazily turns a chunked response body into complete [`Frame`]s.
    ///
    /// Created by [`frame_stream`].
    pub struct FrameStream<S> {
        #[pin]
        inner: S,
        decoder: Utf8StreamDecoder,
        parser: SseLineParser,
        text: String,
        parsed: Vec<Frame>,
        pending: PendingFrames,
        finished: bool,
    }
}

/// Split a byte stream into frames.
///
/// Bytes are decoded with a stateful UTF-8 decoder, so characters split
/// across chunks survive intact. A chunk error is yielded once and ends the
/// stream. When the body ends, a buffered partial line is discarded rather
/// than flushed as a frame.
pub fn frame_stream<S, E>(byte_stream: S) -> FrameStream<S>
where
    S: Stream<Item = Result<bytes::Bytes, E>>,
{
    FrameStream {
        inner: byte_stream,
        decoder: Utf8StreamDecoder::new(),
        parser: SseLineParser::new(),
        text: String::new(),
        parsed: Vec::with_capacity(8),
        pending: PendingFrames::with_capacity(8),
        finished: false,
    }
}

impl<S, E> Stream for FrameStream<S>
where
    S: Stream<Item = Result<bytes::Bytes, E>>,
{
    type Item = Result<Frame, E>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();
        loop {
            if let Some(frame) = this.pending.pop_front() {
                return Poll::Ready(Some(Ok(frame)));
            }
            if *this.finished {
                return Poll::Ready(None);
            }

            match ready!(this.inner.as_mut().poll_next(cx)) {
                Some(Ok(bytes)) => {
                    this.text.clear();
                    this.decoder.decode_into(&bytes, this.text);
                    this.parser.feed_into(this.text.as_str(), this.parsed);
                    this.pending.extend_from_vec(this.parsed);
                }
                Some(Err(err)) => {
                    *this.finished = true;
                    return Poll::Ready(Some(Err(err)));
                }
                None => {
                    *this.finished = true;
                    let _ = this.decoder.finish();
                    let dropped = this.parser.finish();
                    if dropped > 0 {
                        tracing::debug!(
                            dropped_bytes = dropped,
                            "response ended mid-line; discarding partial frame"
                        );
                    }
                }
            }
        }
    }
}
