use super::{AnthropicMessage, AnthropicRequest};
use crate::config::ApiConfig;
use crate::error::BridgeError;
use crate::session::conversation::Turn;

/// Build a streaming Messages API request from the conversation so far.
#[must_use]
pub fn encode_messages_request(api: &ApiConfig, model: &str, turns: &[Turn]) -> AnthropicRequest {
    let messages = turns
        .iter()
        .map(|turn| AnthropicMessage {
            role: turn.role.as_str().to_string(),
            content: turn.content.clone(),
        })
        .collect();

    let system = api.system_prompt.trim();
    AnthropicRequest {
        model: model.to_string(),
        max_tokens: api.max_tokens,
        messages,
        stream: true,
        temperature: api.temperature,
        system: (!system.is_empty()).then(|| api.system_prompt.clone()),
    }
}

/// Serialize a request into the HTTP body.
///
/// # Errors
///
/// Returns [`BridgeError::Internal`] if serialization fails.
pub fn encode_request_body(request: &AnthropicRequest) -> Result<bytes::Bytes, BridgeError> {
    serde_json::to_vec(request)
        .map(bytes::Bytes::from)
        .map_err(|err| BridgeError::Internal(format!("failed to serialize request: {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::conversation::Turn;

    #[test]
    fn test_request_body_shape() {
        let api = ApiConfig::default();
        let turns = vec![
            Turn::user("hello"),
            Turn::assistant("Hi there"),
            Turn::user("how are you?"),
        ];
        let request = encode_messages_request(&api, "claude-3-5-sonnet-20241022", &turns);
        let body = encode_request_body(&request).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();

        assert_eq!(value["model"], "claude-3-5-sonnet-20241022");
        assert_eq!(value["max_tokens"], 4096);
        assert_eq!(value["stream"], true);
        assert_eq!(value["temperature"], 0.0);
        assert!(value["system"].as_str().unwrap().starts_with("You are Claude"));
        let messages = value["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0]["role"], "user");
        assert_eq!(messages[0]["content"], "hello");
        assert_eq!(messages[1]["role"], "assistant");
        assert_eq!(messages[2]["content"], "how are you?");
    }

    #[test]
    fn test_blank_system_prompt_is_omitted() {
        let api = ApiConfig {
            system_prompt: "  ".to_string(),
            ..ApiConfig::default()
        };
        let request = encode_messages_request(&api, "m", &[Turn::user("x")]);
        let value = serde_json::to_value(&request).unwrap();
        assert!(value.get("system").is_none());
    }
}
