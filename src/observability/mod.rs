use std::time::Duration;

use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::protocol::events::UsageSnapshot;

/// Map a configured log level name onto a tracing filter directive.
///
/// - "DISABLED" -> `None`, no subscriber is installed
/// - "WARNING" -> WARN
/// - "CRITICAL" -> ERROR
/// - Others map directly (TRACE, DEBUG, INFO, WARN, ERROR)
#[must_use]
pub fn filter_directive(log_level: &str) -> Option<String> {
    let level = log_level.trim().to_uppercase();
    match level.as_str() {
        "DISABLED" => None,
        "WARNING" => Some("WARN".to_string()),
        "CRITICAL" => Some("ERROR".to_string()),
        _ => Some(level),
    }
}

/// Initialize the tracing subscriber with the configured log level and format.
///
/// Logs go to stderr so stdout stays free for the event stream. A `json`
/// format emits one JSON object per record.
pub fn init_tracing(log_level: &str, log_format: &str) {
    let Some(directive) = filter_directive(log_level) else {
        return;
    };

    let filter = EnvFilter::try_new(&directive).unwrap_or_else(|_| EnvFilter::new("INFO"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    if log_format.eq_ignore_ascii_case("json") {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Log token usage and cost for a settled exchange at INFO level.
pub fn log_exchange_complete(model: &str, usage: UsageSnapshot, cost_usd: f64, duration: Duration) {
    info!(
        model = model,
        input_tokens = usage.input_tokens,
        output_tokens = usage.output_tokens,
        total_tokens = usage.input_tokens + usage.output_tokens,
        cost_usd = cost_usd,
        duration_seconds = duration.as_secs_f64(),
        "exchange completed"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_directive_aliases() {
        assert_eq!(filter_directive("warning").as_deref(), Some("WARN"));
        assert_eq!(filter_directive("CRITICAL").as_deref(), Some("ERROR"));
        assert_eq!(filter_directive("debug").as_deref(), Some("DEBUG"));
        assert_eq!(filter_directive("Disabled"), None);
    }

    #[test]
    fn test_log_exchange_complete_without_subscriber() {
        log_exchange_complete(
            "claude-3-5-sonnet-20241022",
            UsageSnapshot {
                input_tokens: 5,
                output_tokens: 2,
            },
            0.000_045,
            Duration::from_millis(12),
        );
    }
}
