use crate::config::ApiConfig;
use crate::error::BridgeError;

/// Headers for a messages request: JSON content type, the API key and the
/// protocol version.
///
/// # Errors
///
/// Returns [`BridgeError::Config`] when the key or version is missing or
/// cannot be carried in a header value.
pub fn build_request_headers(api: &ApiConfig) -> Result<http::HeaderMap, BridgeError> {
    let key = api.credential().ok_or_else(|| {
        BridgeError::Config(
            "API key not configured. Please set api.key in the configuration file.".to_string(),
        )
    })?;

    let mut headers = http::HeaderMap::new();
    headers.insert(
        http::header::CONTENT_TYPE,
        http::HeaderValue::from_static("application/json"),
    );

    let mut key_value = http::HeaderValue::from_str(key)
        .map_err(|_| BridgeError::Config("api.key contains invalid header characters".into()))?;
    key_value.set_sensitive(true);
    headers.insert("x-api-key", key_value);

    let version = http::HeaderValue::from_str(&api.version)
        .map_err(|_| BridgeError::Config("api.version is not a valid header value".into()))?;
    headers.insert("anthropic-version", version);

    Ok(headers)
}
