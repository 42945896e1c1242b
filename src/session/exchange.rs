use std::fmt::Display;

use futures_util::{Stream, StreamExt};

use super::translator::{ExchangeTranslator, Step};
use crate::error::BridgeError;
use crate::protocol::anthropic::stream::decode_provider_event;
use crate::protocol::events::NormalizedEvent;
use crate::stream::frame_stream;

const LOGGED_PAYLOAD_MAX_CHARS: usize = 200;

/// Receives normalized events in emission order.
///
/// Any `FnMut(NormalizedEvent) + Send` closure is a sink.
pub trait EventSink: Send {
    fn emit(&mut self, event: NormalizedEvent);
}

impl<F> EventSink for F
where
    F: FnMut(NormalizedEvent) + Send,
{
    fn emit(&mut self, event: NormalizedEvent) {
        self(event);
    }
}

/// Pump a response body through framing, decoding and translation until the
/// provider signals completion.
///
/// Frames that fail to decode are logged and skipped. On success the
/// translator is left in the settling phase, ready for
/// [`ExchangeTranslator::settle`].
///
/// # Errors
///
/// Returns [`BridgeError::Transport`] when the body fails mid-stream and
/// [`BridgeError::IncompleteStream`] when it ends before completion.
pub async fn translate_stream<S, E, K>(
    byte_stream: S,
    translator: &mut ExchangeTranslator,
    sink: &mut K,
) -> Result<(), BridgeError>
where
    S: Stream<Item = Result<bytes::Bytes, E>>,
    E: Display,
    K: EventSink + ?Sized,
{
    let frames = frame_stream(byte_stream);
    futures_util::pin_mut!(frames);

    while let Some(frame) = frames.next().await {
        let frame =
            frame.map_err(|err| BridgeError::Transport(format!("response stream failed: {err}")))?;

        let event = match decode_provider_event(&frame.payload) {
            Ok(event) => event,
            Err(err) => {
                tracing::warn!(
                    error = %err,
                    payload = %truncate_for_log(&frame.payload),
                    "failed to parse stream frame, skipping"
                );
                continue;
            }
        };

        match translator.apply(event) {
            Step::Continue(Some(event)) => sink.emit(event),
            Step::Continue(None) => {}
            Step::Complete => return Ok(()),
        }
    }

    Err(BridgeError::IncompleteStream)
}

fn truncate_for_log(payload: &str) -> &str {
    match payload.char_indices().nth(LOGGED_PAYLOAD_MAX_CHARS) {
        Some((idx, _)) => &payload[..idx],
        None => payload,
    }
}
