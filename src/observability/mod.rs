use std::time::Instant;

use tracing_subscriber::EnvFilter;

use crate::protocol::canonical::CanonicalUsage;
use crate::protocol::provider::ProviderTag;

/// Map a config log level onto a tracing filter directive.
///
/// Returns `None` for `DISABLED`.
#[must_use]
pub fn tracing_directive(log_level: &str) -> Option<String> {
    let level = log_level.to_uppercase();
    match level.as_str() {
        "DISABLED" => None,
        "WARNING" => Some("WARN".to_string()),
        "CRITICAL" => Some("ERROR".to_string()),
        _ => Some(level),
    }
}

/// Initialize the tracing subscriber with the configured log level.
///
/// `log_format` selects human-readable (`text`) or structured (`json`) lines.
/// `RUST_LOG`, when set, overrides the configured level.
pub fn init_tracing(log_level: &str, log_format: &str) {
    let Some(directive) = tracing_directive(log_level) else {
        return;
    };

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&directive))
        .unwrap_or_else(|_| EnvFilter::new("INFO"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
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

/// Log the outcome of a gateway request.
///
/// Streams report usage only when the provider sent it before the end marker.
pub fn log_request_complete(
    provider: ProviderTag,
    model: &str,
    stream: bool,
    usage: Option<&CanonicalUsage>,
    start_time: Instant,
) {
    let elapsed_ms = u64::try_from(start_time.elapsed().as_millis()).unwrap_or(u64::MAX);
    match usage {
        Some(usage) => tracing::info!(
            provider = provider.as_str(),
            model,
            stream,
            prompt_tokens = usage.prompt_tokens(),
            completion_tokens = usage.completion_tokens(),
            total_tokens = usage.total_tokens(),
            elapsed_ms,
            "request completed"
        ),
        None => tracing::info!(
            provider = provider.as_str(),
            model,
            stream,
            elapsed_ms,
            "request completed"
        ),
    }
}
