//! Conversation sessions and the exchange pipeline that drives them.

pub mod conversation;
pub mod exchange;
pub mod id;
pub mod translator;

pub use conversation::{Conversation, Role, Turn};
pub use exchange::{translate_stream, EventSink};
pub use id::{SequentialSessionIds, SessionIdGenerator, TimestampSessionIds};
pub use translator::{Accumulator, ExchangePhase, ExchangeTranslator, Settlement, Step};

use std::sync::Arc;

use futures_util::future::{AbortRegistration, Abortable};
use parking_lot::Mutex;
use tracing::Instrument;

use self::id::ExchangeIdGenerator;
use crate::config::ConfigSource;
use crate::error::BridgeError;
use crate::observability::log_exchange_complete;
use crate::protocol::anthropic::encoder::{encode_messages_request, encode_request_body};
use crate::transport::{build_request_headers, HttpTransport};

struct SessionState {
    conversation: Conversation,
    phase: ExchangePhase,
}

/// Puts the session back to idle however the exchange ends, including when
/// the future is dropped mid-stream.
struct ExchangeGuard<'a> {
    state: &'a Mutex<SessionState>,
}

impl<'a> ExchangeGuard<'a> {
    fn acquire(state: &'a Mutex<SessionState>) -> Result<Self, BridgeError> {
        let mut locked = state.lock();
        if locked.phase != ExchangePhase::Idle {
            return Err(BridgeError::Busy);
        }
        locked.phase = ExchangePhase::Active;
        Ok(Self { state })
    }

    fn set_phase(&self, phase: ExchangePhase) {
        self.state.lock().phase = phase;
    }
}

impl Drop for ExchangeGuard<'_> {
    fn drop(&mut self) {
        self.state.lock().phase = ExchangePhase::Idle;
    }
}

/// A single conversation with the remote chat API.
///
/// Sends are serialized: while one exchange is in flight, a second send
/// fails with [`BridgeError::Busy`], as do [`ChatSession::new_session`] and
/// [`ChatSession::load_session`]. Configuration is re-read from the
/// [`ConfigSource`] at the start of every send.
pub struct ChatSession {
    config: Arc<dyn ConfigSource>,
    transport: HttpTransport,
    state: Mutex<SessionState>,
    exchange_ids: ExchangeIdGenerator,
}

impl ChatSession {
    #[must_use]
    pub fn new(config: Arc<dyn ConfigSource>, transport: HttpTransport) -> Self {
        Self::with_id_generator(config, transport, Arc::new(TimestampSessionIds))
    }

    #[must_use]
    pub fn with_id_generator(
        config: Arc<dyn ConfigSource>,
        transport: HttpTransport,
        ids: Arc<dyn SessionIdGenerator>,
    ) -> Self {
        Self {
            config,
            transport,
            state: Mutex::new(SessionState {
                conversation: Conversation::new(ids),
                phase: ExchangePhase::Idle,
            }),
            exchange_ids: ExchangeIdGenerator::new(),
        }
    }

    /// Send one user message and stream the reply to `sink`.
    ///
    /// Emits `session-init` once the API accepts the request, then one
    /// `assistant-delta` per text fragment, then `result` after the assistant
    /// turn has been appended.
    ///
    /// # Errors
    ///
    /// - [`BridgeError::Busy`] if another exchange is in flight
    /// - [`BridgeError::Config`] if the configuration cannot be read or has no
    ///   API key; nothing is appended in that case
    /// - [`BridgeError::Upstream`] for a non-2xx status, with the body text
    /// - [`BridgeError::Transport`] or [`BridgeError::IncompleteStream`] when
    ///   the response fails or ends early
    ///
    /// On every error past the config check the user turn stays in the log and
    /// no assistant turn is added.
    pub async fn send_message<K>(&self, text: &str, sink: &mut K) -> Result<(), BridgeError>
    where
        K: EventSink + ?Sized,
    {
        self.send_message_with_model(text, None, sink).await
    }

    /// [`ChatSession::send_message`] with a per-call model override.
    ///
    /// # Errors
    ///
    /// Same as [`ChatSession::send_message`].
    pub async fn send_message_with_model<K>(
        &self,
        text: &str,
        model: Option<&str>,
        sink: &mut K,
    ) -> Result<(), BridgeError>
    where
        K: EventSink + ?Sized,
    {
        let span = tracing::info_span!(
            "exchange",
            session_id = %self.get_session_id(),
            exchange_id = %self.exchange_ids.next_exchange_id(),
        );
        let result = self
            .run_exchange(text, model, sink)
            .instrument(span.clone())
            .await;
        if let Err(err) = &result {
            span.in_scope(|| {
                tracing::warn!(
                    category = ?err.category(),
                    status = err.status(),
                    error = %err,
                    "exchange failed"
                );
            });
        }
        result
    }

    /// [`ChatSession::send_message`] that can be cancelled through the
    /// matching [`futures_util::future::AbortHandle`].
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Cancelled`] when aborted, otherwise the same
    /// errors as [`ChatSession::send_message`].
    pub async fn send_message_abortable<K>(
        &self,
        text: &str,
        sink: &mut K,
        registration: AbortRegistration,
    ) -> Result<(), BridgeError>
    where
        K: EventSink + ?Sized,
    {
        match Abortable::new(self.send_message(text, sink), registration).await {
            Ok(result) => result,
            Err(_aborted) => {
                tracing::debug!("exchange aborted by caller");
                Err(BridgeError::Cancelled)
            }
        }
    }

    async fn run_exchange<K>(
        &self,
        text: &str,
        model_override: Option<&str>,
        sink: &mut K,
    ) -> Result<(), BridgeError>
    where
        K: EventSink + ?Sized,
    {
        let guard = ExchangeGuard::acquire(&self.state)?;

        let config = self.config.snapshot()?;
        let headers = build_request_headers(&config.api)?;
        let model = model_override.unwrap_or(&config.api.model).to_string();

        let (session_id, request) = {
            let mut state = self.state.lock();
            state.conversation.append(Turn::user(text));
            let request =
                encode_messages_request(&config.api, &model, state.conversation.turns());
            (state.conversation.session_id().to_string(), request)
        };
        let body = encode_request_body(&request)?;

        let mut translator = ExchangeTranslator::begin(session_id, config.pricing);
        tracing::debug!(
            model = %model,
            turns = request.messages.len(),
            "sending messages request"
        );
        let response = self
            .transport
            .send_stream(&config.api.endpoint, &headers, body)
            .await?;

        sink.emit(translator.session_init());
        translate_stream(response.bytes_stream(), &mut translator, sink).await?;

        guard.set_phase(ExchangePhase::Settling);
        let settlement = {
            let mut state = self.state.lock();
            translator.settle(&mut state.conversation)?
        };
        log_exchange_complete(
            &model,
            settlement.usage,
            settlement.cost_usd,
            settlement.duration,
        );
        sink.emit(settlement.event);
        Ok(())
    }

    /// Clear the log and start over under a fresh session id.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Busy`] while an exchange is in flight.
    pub fn new_session(&self) -> Result<(), BridgeError> {
        let mut state = self.state.lock();
        if state.phase != ExchangePhase::Idle {
            return Err(BridgeError::Busy);
        }
        state.conversation.reset();
        tracing::debug!(session_id = %state.conversation.session_id(), "started new session");
        Ok(())
    }

    /// Copy of the current turns.
    #[must_use]
    pub fn get_messages(&self) -> Vec<Turn> {
        self.state.lock().conversation.snapshot()
    }

    /// Replace the log with previously saved turns. The session id is kept.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Busy`] while an exchange is in flight.
    pub fn load_session(&self, turns: Vec<Turn>) -> Result<(), BridgeError> {
        let mut state = self.state.lock();
        if state.phase != ExchangePhase::Idle {
            return Err(BridgeError::Busy);
        }
        state.conversation.load(turns);
        Ok(())
    }

    #[must_use]
    pub fn get_session_id(&self) -> String {
        self.state.lock().conversation.session_id().to_string()
    }

    #[must_use]
    pub fn phase(&self) -> ExchangePhase {
        self.state.lock().phase
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AppConfig, StaticConfigSource, TransportConfig};
    use crate::protocol::events::NormalizedEvent;

    fn session_with_key(key: &str) -> ChatSession {
        let mut config = AppConfig::default();
        config.api.key = key.to_string();
        config.api.endpoint = "http://127.0.0.1:9/v1/messages".to_string();
        ChatSession::with_id_generator(
            Arc::new(StaticConfigSource::new(config)),
            HttpTransport::new(&TransportConfig::default()),
            Arc::new(SequentialSessionIds::new("unit")),
        )
    }

    #[tokio::test]
    async fn test_missing_key_appends_nothing() {
        let session = session_with_key("  ");
        let mut events = Vec::new();
        let mut sink = |event: NormalizedEvent| events.push(event);
        let err = session.send_message("hello", &mut sink).await.unwrap_err();
        assert!(matches!(err, BridgeError::Config(ref msg) if msg.contains("API key not configured")));
        assert!(events.is_empty());
        assert!(session.get_messages().is_empty());
        assert_eq!(session.phase(), ExchangePhase::Idle);
    }

    #[test]
    fn test_new_session_and_load() {
        let session = session_with_key("sk-test");
        assert_eq!(session.get_session_id(), "unit_1");
        session
            .load_session(vec![Turn::user("a"), Turn::assistant("b")])
            .unwrap();
        assert_eq!(session.get_messages().len(), 2);
        assert_eq!(session.get_session_id(), "unit_1");

        session.new_session().unwrap();
        assert!(session.get_messages().is_empty());
        assert_eq!(session.get_session_id(), "unit_2");
    }

    #[test]
    fn test_reset_refused_while_busy() {
        let session = session_with_key("sk-test");
        let guard = ExchangeGuard::acquire(&session.state).unwrap();
        assert!(matches!(session.new_session(), Err(BridgeError::Busy)));
        assert!(matches!(session.load_session(Vec::new()), Err(BridgeError::Busy)));
        assert!(matches!(
            ExchangeGuard::acquire(&session.state),
            Err(BridgeError::Busy)
        ));
        drop(guard);
        assert_eq!(session.phase(), ExchangePhase::Idle);
        session.new_session().unwrap();
    }
}
