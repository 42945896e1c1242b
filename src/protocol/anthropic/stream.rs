use super::{AnthropicStreamEvent, AnthropicUsage};
use crate::protocol::events::ProviderEvent;

/// Decode one frame payload into a provider event.
///
/// Dispatch is on the payload's own `type` field; the SSE `event:` line is
/// not consulted. Tags outside the handled set, and handled tags that carry
/// nothing this adapter uses, become [`ProviderEvent::Unrecognized`].
///
/// # Errors
///
/// Returns the JSON error when the payload is not a well-formed event object.
pub fn decode_provider_event(payload: &str) -> Result<ProviderEvent, serde_json::Error> {
    let wire: AnthropicStreamEvent = serde_json::from_str(payload)?;
    Ok(provider_event_from_wire(wire))
}

/// Map a wire event onto the closed provider event set.
#[must_use]
pub fn provider_event_from_wire(event: AnthropicStreamEvent) -> ProviderEvent {
    match event {
        AnthropicStreamEvent::MessageStart { message, usage } => {
            let input_tokens = message
                .and_then(|message| message.usage)
                .or(usage)
                .and_then(|usage| usage.input_tokens)
                .unwrap_or(0);
            ProviderEvent::ExchangeStarted { input_tokens }
        }
        AnthropicStreamEvent::ContentBlockDelta { delta } => {
            match delta.and_then(|delta| delta.text) {
                Some(text) if !text.is_empty() => ProviderEvent::TextDelta(text),
                _ => ProviderEvent::Unrecognized,
            }
        }
        AnthropicStreamEvent::MessageDelta { usage } => match usage {
            Some(AnthropicUsage { output_tokens, .. }) => ProviderEvent::UsageUpdate {
                output_tokens: output_tokens.unwrap_or(0),
            },
            None => ProviderEvent::Unrecognized,
        },
        AnthropicStreamEvent::MessageStop {} => ProviderEvent::ExchangeComplete,
        AnthropicStreamEvent::Other => ProviderEvent::Unrecognized,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_start_reads_nested_usage() {
        let event = decode_provider_event(
            r#"{"type":"message_start","message":{"id":"msg_1","type":"message","role":"assistant","model":"claude","usage":{"input_tokens":25,"output_tokens":1}}}"#,
        )
        .unwrap();
        assert_eq!(event, ProviderEvent::ExchangeStarted { input_tokens: 25 });
    }

    #[test]
    fn test_message_start_accepts_top_level_usage() {
        let event =
            decode_provider_event(r#"{"type":"message_start","usage":{"input_tokens":5}}"#).unwrap();
        assert_eq!(event, ProviderEvent::ExchangeStarted { input_tokens: 5 });
    }

    #[test]
    fn test_message_start_without_usage_defaults_to_zero() {
        let event = decode_provider_event(r#"{"type":"message_start","message":{}}"#).unwrap();
        assert_eq!(event, ProviderEvent::ExchangeStarted { input_tokens: 0 });
    }

    #[test]
    fn test_text_delta() {
        let event = decode_provider_event(
            r#"{"type":"content_block_delta","index":0,"delta":{"type":"text_delta","text":"Hi"}}"#,
        )
        .unwrap();
        assert_eq!(event, ProviderEvent::TextDelta("Hi".to_string()));
    }

    #[test]
    fn test_delta_without_text_is_unrecognized() {
        let event = decode_provider_event(
            r#"{"type":"content_block_delta","index":1,"delta":{"type":"input_json_delta","partial_json":"{\"a\""}}"#,
        )
        .unwrap();
        assert_eq!(event, ProviderEvent::Unrecognized);

        let event = decode_provider_event(
            r#"{"type":"content_block_delta","index":0,"delta":{"type":"text_delta","text":""}}"#,
        )
        .unwrap();
        assert_eq!(event, ProviderEvent::Unrecognized);
    }

    #[test]
    fn test_message_delta_usage() {
        let event = decode_provider_event(
            r#"{"type":"message_delta","delta":{"stop_reason":"end_turn"},"usage":{"output_tokens":12}}"#,
        )
        .unwrap();
        assert_eq!(event, ProviderEvent::UsageUpdate { output_tokens: 12 });

        let event = decode_provider_event(r#"{"type":"message_delta","delta":{}}"#).unwrap();
        assert_eq!(event, ProviderEvent::Unrecognized);
    }

    #[test]
    fn test_message_stop() {
        let event = decode_provider_event(r#"{"type":"message_stop"}"#).unwrap();
        assert_eq!(event, ProviderEvent::ExchangeComplete);
    }

    #[test]
    fn test_unknown_tags_are_unrecognized() {
        for payload in [
            r#"{"type":"ping"}"#,
            r#"{"type":"content_block_start","index":0,"content_block":{"type":"text","text":""}}"#,
            r#"{"type":"content_block_stop","index":0}"#,
            r#"{"type":"error","error":{"type":"overloaded_error","message":"Overloaded"}}"#,
            r#"{"type":"brand_new_event","payload":[1,2,3]}"#,
        ] {
            assert_eq!(
                decode_provider_event(payload).unwrap(),
                ProviderEvent::Unrecognized,
                "payload: {payload}"
            );
        }
    }

    #[test]
    fn test_malformed_payloads_are_errors() {
        assert!(decode_provider_event("{not json").is_err());
        assert!(decode_provider_event(r#"{"no_type":true}"#).is_err());
        assert!(decode_provider_event("[1,2,3]").is_err());
        assert!(decode_provider_event("").is_err());
    }
}
