//! Structured logging configuration.
//!
//! This module provides structured logging with request correlation,
//! bracket operation auditing and security event tracking. Records emitted
//! by the engine through the `log` facade are picked up by the same
//! subscriber.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize structured logging
///
/// Log levels are configurable via the `RUST_LOG` env var.
///
/// # Example
///
/// ```no_run
/// use bracket_server::logging;
///
/// #[tokio::main]
/// async fn main() {
///     logging::init();
///     tracing::info!("Server starting");
/// }
/// ```
pub fn init() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn,hyper=warn"));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    tracing::info!("Structured logging initialized");
}

/// Log a security event with structured data
///
/// # Arguments
///
/// * `event_type` - Type of security event
/// * `user_id` - Optional user ID
/// * `tournament_id` - Optional tournament the event concerns
/// * `message` - Event message
///
/// # Example
///
/// ```
/// use bracket_server::logging::log_security_event;
///
/// log_security_event(
///     "not_organizer",
///     Some(123),
///     Some(7),
///     "Caller may not manage this tournament"
/// );
/// ```
pub fn log_security_event(
    event_type: &str,
    user_id: Option<i64>,
    tournament_id: Option<i64>,
    message: &str,
) {
    tracing::warn!(
        event_type = event_type,
        user_id = user_id,
        tournament_id = tournament_id,
        "SECURITY: {}",
        message
    );
}

/// Log the result of a bracket operation
///
/// Successful operations are logged at info, rejected ones at warn.
pub fn log_bracket_operation(
    request_id: &str,
    operation: &str,
    tournament_id: i64,
    user_id: i64,
    duration_ms: u64,
    error: Option<&str>,
) {
    match error {
        None => tracing::info!(
            request_id = request_id,
            operation = operation,
            tournament_id = tournament_id,
            user_id = user_id,
            duration_ms = duration_ms,
            "Bracket operation succeeded"
        ),
        Some(error) => tracing::warn!(
            request_id = request_id,
            operation = operation,
            tournament_id = tournament_id,
            user_id = user_id,
            duration_ms = duration_ms,
            error = error,
            "Bracket operation rejected"
        ),
    }

    if duration_ms > 1000 {
        tracing::warn!(
            operation = operation,
            duration_ms = duration_ms,
            "PERFORMANCE: Slow bracket operation"
        );
    }
}

/// Log API request/response
///
/// # Arguments
///
/// * `method` - HTTP method
/// * `path` - Matched route
/// * `status_code` - Response status code
/// * `duration_ms` - Request duration in milliseconds
/// * `request_id` - Correlation ID of the request
pub fn log_api_request(
    method: &str,
    path: &str,
    status_code: u16,
    duration_ms: u64,
    request_id: &str,
) {
    tracing::info!(
        http_method = method,
        http_path = path,
        http_status = status_code,
        duration_ms = duration_ms,
        request_id = request_id,
        "API request completed"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_security_event() {
        // Just ensure it doesn't panic
        log_security_event("test_event", Some(1), Some(2), "Test message");
        log_security_event("invalid_token", None, None, "Test message");
    }

    #[test]
    fn test_log_bracket_operation() {
        log_bracket_operation("abc", "build_bracket", 1, 42, 12, None);
        log_bracket_operation(
            "def",
            "set_match_winner",
            1,
            42,
            1500,
            Some("Match 3 is not scheduled"),
        );
    }

    #[test]
    fn test_log_api_request() {
        log_api_request("GET", "/api/v1/tournaments/{tournament_id}/bracket", 200, 45, "abc");
        log_api_request("POST", "/api/v1/matches/{match_id}/winner", 409, 120, "def");
    }
}
