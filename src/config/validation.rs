use super::{AppConfig, ConfigError};

/// Validate the full application config, returning an error if any rule is violated.
///
/// A missing API key is not a validation failure here; it is reported when an
/// exchange is attempted, so the rest of the application can still start.
///
/// # Errors
///
/// Returns [`ConfigError::Validation`] when any configuration invariant is violated.
pub fn validate_config(config: &AppConfig) -> Result<(), ConfigError> {
    validate_api_config(config)?;
    validate_pricing(config)?;
    validate_transport(config)?;
    validate_log_level(config)?;
    validate_log_format(config)?;
    Ok(())
}

fn validation_err(msg: impl Into<String>) -> ConfigError {
    ConfigError::Validation(msg.into())
}

fn validate_api_config(config: &AppConfig) -> Result<(), ConfigError> {
    let api = &config.api;
    let endpoint = url::Url::parse(&api.endpoint)
        .map_err(|err| validation_err(format!("api.endpoint is not a valid URL: {err}")))?;
    if !matches!(endpoint.scheme(), "http" | "https") {
        return Err(validation_err(format!(
            "api.endpoint must use http or https, got '{}'",
            endpoint.scheme()
        )));
    }
    if api.model.trim().is_empty() {
        return Err(validation_err("api.model cannot be empty"));
    }
    if api.max_tokens == 0 {
        return Err(validation_err("api.max_tokens must be greater than 0"));
    }
    if !(0.0..=1.0).contains(&api.temperature) {
        return Err(validation_err("api.temperature must be within 0.0..=1.0"));
    }
    if api.version.trim().is_empty() {
        return Err(validation_err("api.version cannot be empty"));
    }
    Ok(())
}

fn validate_pricing(config: &AppConfig) -> Result<(), ConfigError> {
    let pricing = &config.pricing;
    let rates = [
        ("pricing.input_per_million", pricing.input_per_million),
        ("pricing.output_per_million", pricing.output_per_million),
    ];
    for (name, rate) in rates {
        if !rate.is_finite() || rate < 0.0 {
            return Err(validation_err(format!(
                "{name} must be a non-negative number"
            )));
        }
    }
    Ok(())
}

fn validate_transport(config: &AppConfig) -> Result<(), ConfigError> {
    let transport = &config.transport;
    if transport.timeout == 0 {
        return Err(validation_err("transport.timeout must be greater than 0"));
    }
    if transport.connect_timeout == 0 {
        return Err(validation_err(
            "transport.connect_timeout must be greater than 0",
        ));
    }
    if let Some(proxy) = transport.proxy.as_deref() {
        if url::Url::parse(proxy.trim()).is_err() {
            return Err(validation_err(format!(
                "transport.proxy is not a valid URL: {proxy}"
            )));
        }
    }
    Ok(())
}

const VALID_LOG_LEVELS: &[&str] = &[
    "DEBUG", "INFO", "WARNING", "WARN", "ERROR", "CRITICAL", "DISABLED", "TRACE",
];

fn validate_log_level(config: &AppConfig) -> Result<(), ConfigError> {
    let level = config.features.log_level.to_uppercase();
    if !VALID_LOG_LEVELS.contains(&level.as_str()) {
        return Err(validation_err(format!(
            "features.log_level '{}' is not one of {}",
            config.features.log_level,
            VALID_LOG_LEVELS.join(", ")
        )));
    }
    Ok(())
}

fn validate_log_format(config: &AppConfig) -> Result<(), ConfigError> {
    let format = config.features.log_format.to_lowercase();
    if !matches!(format.as_str(), "text" | "json") {
        return Err(validation_err(format!(
            "features.log_format '{}' must be 'text' or 'json'",
            config.features.log_format
        )));
    }
    Ok(())
}
