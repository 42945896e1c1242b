//! Provider-side and caller-side event types.
//!
//! [`ProviderEvent`] is what the decoder produces from one frame;
//! [`NormalizedEvent`] is the only shape the downstream consumer ever sees.

use serde::{Deserialize, Serialize};
use serde_json::json;

/// One decoded provider stream event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderEvent {
    /// The exchange started; carries the prompt token count.
    ExchangeStarted { input_tokens: u64 },
    /// An incremental fragment of assistant text.
    TextDelta(String),
    /// Output token count reported so far.
    UsageUpdate { output_tokens: u64 },
    /// The provider finished the message.
    ExchangeComplete,
    /// Anything else. Dropped without effect.
    Unrecognized,
}

/// Token counters at a point in the exchange.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageSnapshot {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

/// Session-level event emitted to the caller.
#[derive(Debug, Clone, PartialEq)]
pub enum NormalizedEvent {
    SessionInit {
        session_id: String,
    },
    AssistantDelta {
        text: String,
        usage: UsageSnapshot,
    },
    Result {
        session_id: String,
        cost_usd: f64,
        duration_ms: u64,
        turn_count: usize,
    },
}

impl NormalizedEvent {
    /// Short discriminator, handy for logs and assertions.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            NormalizedEvent::SessionInit { .. } => "session-init",
            NormalizedEvent::AssistantDelta { .. } => "assistant-delta",
            NormalizedEvent::Result { .. } => "result",
        }
    }

    /// Render the event in the downstream UI wire shape.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            NormalizedEvent::SessionInit { session_id } => json!({
                "type": "system",
                "subtype": "init",
                "session_id": session_id,
            }),
            NormalizedEvent::AssistantDelta { text, usage } => json!({
                "type": "assistant",
                "message": {
                    "content": [{ "type": "text", "text": text }],
                    "usage": {
                        "input_tokens": usage.input_tokens,
                        "output_tokens": usage.output_tokens,
                    },
                },
            }),
            NormalizedEvent::Result {
                session_id,
                cost_usd,
                duration_ms,
                turn_count,
            } => json!({
                "type": "result",
                "subtype": "success",
                "session_id": session_id,
                "total_cost_usd": cost_usd,
                "duration_ms": duration_ms,
                "num_turns": turn_count,
            }),
        }
    }
}
