use std::time::{Duration, Instant};

use super::conversation::{Conversation, Turn};
use crate::error::BridgeError;
use crate::pricing::Pricing;
use crate::protocol::events::{NormalizedEvent, ProviderEvent, UsageSnapshot};

/// Where a session is in its exchange lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExchangePhase {
    #[default]
    Idle,
    Active,
    Settling,
}

/// Transient per-exchange state.
#[derive(Debug, Default, Clone)]
pub struct Accumulator {
    text: String,
    input_tokens: Option<u64>,
    output_tokens: u64,
}

impl Accumulator {
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn usage(&self) -> UsageSnapshot {
        UsageSnapshot {
            input_tokens: self.input_tokens.unwrap_or(0),
            output_tokens: self.output_tokens,
        }
    }
}

/// Outcome of feeding one provider event to the translator.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// Keep reading; forward the event if there is one.
    Continue(Option<NormalizedEvent>),
    /// The provider marked the message done; settle now.
    Complete,
}

/// Result of settling an exchange.
#[derive(Debug, Clone, PartialEq)]
pub struct Settlement {
    pub event: NormalizedEvent,
    pub usage: UsageSnapshot,
    pub cost_usd: f64,
    pub duration: Duration,
}

/// Re-frames provider events into normalized session events for one exchange.
#[derive(Debug)]
pub struct ExchangeTranslator {
    session_id: String,
    pricing: Pricing,
    started_at: Instant,
    accumulator: Accumulator,
    phase: ExchangePhase,
}

impl ExchangeTranslator {
    /// Start an exchange with an empty accumulator and the clock running.
    #[must_use]
    pub fn begin(session_id: impl Into<String>, pricing: Pricing) -> Self {
        Self {
            session_id: session_id.into(),
            pricing,
            started_at: Instant::now(),
            accumulator: Accumulator::default(),
            phase: ExchangePhase::Active,
        }
    }

    /// The `session-init` event announcing this exchange.
    #[must_use]
    pub fn session_init(&self) -> NormalizedEvent {
        NormalizedEvent::SessionInit {
            session_id: self.session_id.clone(),
        }
    }

    #[must_use]
    pub fn phase(&self) -> ExchangePhase {
        self.phase
    }

    #[must_use]
    pub fn accumulator(&self) -> &Accumulator {
        &self.accumulator
    }

    pub fn apply(&mut self, event: ProviderEvent) -> Step {
        if self.phase != ExchangePhase::Active {
            return Step::Continue(None);
        }

        match event {
            ProviderEvent::ExchangeStarted { input_tokens } => {
                self.accumulator.input_tokens.get_or_insert(input_tokens);
                Step::Continue(None)
            }
            ProviderEvent::TextDelta(text) => {
                self.accumulator.text.push_str(&text);
                Step::Continue(Some(NormalizedEvent::AssistantDelta {
                    text,
                    usage: self.accumulator.usage(),
                }))
            }
            ProviderEvent::UsageUpdate { output_tokens } => {
                self.accumulator.output_tokens = output_tokens;
                Step::Continue(None)
            }
            ProviderEvent::ExchangeComplete => {
                self.phase = ExchangePhase::Settling;
                Step::Complete
            }
            ProviderEvent::Unrecognized => {
                tracing::trace!("ignoring unrecognized provider event");
                Step::Continue(None)
            }
        }
    }

    /// Append the assistant turn and build the `result` event.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::IncompleteStream`] if the provider never
    /// signalled completion; the conversation is left untouched.
    pub fn settle(self, conversation: &mut Conversation) -> Result<Settlement, BridgeError> {
        if self.phase != ExchangePhase::Settling {
            return Err(BridgeError::IncompleteStream);
        }

        let usage = self.accumulator.usage();
        let duration = self.started_at.elapsed();
        let cost_usd = self
            .pricing
            .estimate_cost(usage.input_tokens, usage.output_tokens);

        conversation.append(Turn::assistant(self.accumulator.text));
        let event = NormalizedEvent::Result {
            session_id: self.session_id,
            cost_usd,
            duration_ms: u64::try_from(duration.as_millis()).unwrap_or(u64::MAX),
            turn_count: conversation.exchange_count(),
        };

        Ok(Settlement {
            event,
            usage,
            cost_usd,
            duration,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::id::SequentialSessionIds;
    use std::sync::Arc;

    fn conversation() -> Conversation {
        Conversation::new(Arc::new(SequentialSessionIds::new("t")))
    }

    #[test]
    fn test_deltas_carry_fragment_and_usage_snapshot() {
        let mut translator = ExchangeTranslator::begin("s", Pricing::default());
        assert_eq!(
            translator.apply(ProviderEvent::ExchangeStarted { input_tokens: 5 }),
            Step::Continue(None)
        );
        let step = translator.apply(ProviderEvent::TextDelta("Hi".into()));
        assert_eq!(
            step,
            Step::Continue(Some(NormalizedEvent::AssistantDelta {
                text: "Hi".into(),
                usage: UsageSnapshot {
                    input_tokens: 5,
                    output_tokens: 0
                },
            }))
        );
        translator.apply(ProviderEvent::UsageUpdate { output_tokens: 3 });
        let step = translator.apply(ProviderEvent::TextDelta(" there".into()));
        assert_eq!(
            step,
            Step::Continue(Some(NormalizedEvent::AssistantDelta {
                text: " there".into(),
                usage: UsageSnapshot {
                    input_tokens: 5,
                    output_tokens: 3
                },
            }))
        );
        assert_eq!(translator.accumulator().text(), "Hi there");
    }

    #[test]
    fn test_input_tokens_set_once() {
        let mut translator = ExchangeTranslator::begin("s", Pricing::default());
        translator.apply(ProviderEvent::ExchangeStarted { input_tokens: 7 });
        translator.apply(ProviderEvent::ExchangeStarted { input_tokens: 99 });
        assert_eq!(translator.accumulator().usage().input_tokens, 7);
    }

    #[test]
    fn test_output_tokens_overwritten() {
        let mut translator = ExchangeTranslator::begin("s", Pricing::default());
        translator.apply(ProviderEvent::UsageUpdate { output_tokens: 4 });
        translator.apply(ProviderEvent::UsageUpdate { output_tokens: 9 });
        assert_eq!(translator.accumulator().usage().output_tokens, 9);
    }

    #[test]
    fn test_unrecognized_has_no_effect() {
        let mut translator = ExchangeTranslator::begin("s", Pricing::default());
        assert_eq!(
            translator.apply(ProviderEvent::Unrecognized),
            Step::Continue(None)
        );
        assert_eq!(translator.accumulator().text(), "");
        assert_eq!(translator.phase(), ExchangePhase::Active);
    }

    #[test]
    fn test_settle_appends_turn_and_builds_result() {
        let mut log = conversation();
        log.append(Turn::user("hello"));
        let session_id = log.session_id().to_string();

        let mut translator = ExchangeTranslator::begin(session_id.clone(), Pricing::default());
        translator.apply(ProviderEvent::ExchangeStarted { input_tokens: 5 });
        translator.apply(ProviderEvent::TextDelta("Hi".into()));
        translator.apply(ProviderEvent::TextDelta(" there".into()));
        translator.apply(ProviderEvent::UsageUpdate { output_tokens: 2 });
        assert_eq!(translator.apply(ProviderEvent::ExchangeComplete), Step::Complete);
        assert_eq!(translator.phase(), ExchangePhase::Settling);

        let settlement = translator.settle(&mut log).unwrap();
        assert_eq!(log.turns().last(), Some(&Turn::assistant("Hi there")));
        assert_eq!(
            settlement.usage,
            UsageSnapshot {
                input_tokens: 5,
                output_tokens: 2
            }
        );
        match settlement.event {
            NormalizedEvent::Result {
                session_id: id,
                cost_usd,
                turn_count,
                ..
            } => {
                assert_eq!(id, session_id);
                assert_eq!(turn_count, 1);
                let expected = (5.0 / 1e6) * 3.00 + (2.0 / 1e6) * 15.00;
                assert!((cost_usd - expected).abs() < 1e-15);
            }
            other => panic!("expected result event, got {other:?}"),
        }
    }

    #[test]
    fn test_events_after_complete_are_ignored() {
        let mut translator = ExchangeTranslator::begin("s", Pricing::default());
        translator.apply(ProviderEvent::TextDelta("done".into()));
        translator.apply(ProviderEvent::ExchangeComplete);
        assert_eq!(
            translator.apply(ProviderEvent::TextDelta("late".into())),
            Step::Continue(None)
        );
        assert_eq!(translator.accumulator().text(), "done");
    }

    #[test]
    fn test_settle_before_complete_leaves_log_untouched() {
        let mut log = conversation();
        log.append(Turn::user("hello"));
        let mut translator = ExchangeTranslator::begin("s", Pricing::default());
        translator.apply(ProviderEvent::TextDelta("partial".into()));
        let err = translator.settle(&mut log).unwrap_err();
        assert!(matches!(err, BridgeError::IncompleteStream));
        assert_eq!(log.len(), 1);
    }
}
