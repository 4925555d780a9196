//! Prometheus metrics for monitoring bracket service health and activity.
//!
//! Metrics are exposed in Prometheus text format on a dedicated listener.
//! Without an installed exporter every recording call is a no-op.
//!
//! # Metrics Categories
//!
//! - **HTTP Metrics**: Request counts, duration, status codes
//! - **Bracket Metrics**: Brackets built, winners set, resets, finalizations
//! - **Error Metrics**: Rejected operations by kind, conflicts
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use bracket_server::metrics;
//! use std::net::SocketAddr;
//!
//! let addr: SocketAddr = "127.0.0.1:9090".parse().unwrap();
//! metrics::init_metrics(addr).unwrap();
//!
//! metrics::http_requests_total("POST", "/api/v1/matches/{match_id}/winner", 200);
//! ```

use bracket_engine::{BracketError, CommandOutcome, ErrorKind};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

/// Initialize Prometheus metrics exporter.
///
/// Metrics will be available at `http://<addr>/metrics`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), String> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| format!("Failed to install Prometheus exporter: {}", e))
}

// ============================================================================
// HTTP Metrics
// ============================================================================

/// Record HTTP request.
pub fn http_requests_total(method: &str, path: &str, status: u16) {
    metrics::counter!("http_requests_total",
        "method" => method.to_string(),
        "path" => path.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// Record HTTP request duration in milliseconds.
pub fn http_request_duration_ms(method: &str, path: &str, duration_ms: f64) {
    metrics::histogram!("http_request_duration_ms",
        "method" => method.to_string(),
        "path" => path.to_string()
    )
    .record(duration_ms);
}

// ============================================================================
// Bracket Metrics
// ============================================================================

/// Record a successful bracket operation.
pub fn record_outcome(outcome: &CommandOutcome) {
    match outcome {
        CommandOutcome::Built(summary) => {
            metrics::counter!("brackets_built_total").increment(1);
            metrics::histogram!("bracket_entrants").record(summary.entrants as f64);
        }
        CommandOutcome::WinnerSet(_) => {
            metrics::counter!("match_winners_set_total").increment(1);
        }
        CommandOutcome::Reset(summary) => {
            metrics::counter!("match_resets_total").increment(1);
            metrics::histogram!("reset_changes").record(summary.changes as f64);
        }
        CommandOutcome::Finalized(_) => {
            metrics::counter!("tournaments_finalized_total").increment(1);
        }
    }
}

/// Record a rejected bracket operation.
pub fn record_failure(operation: &'static str, error: &BracketError) {
    let kind = error.kind();
    metrics::counter!("bracket_errors_total",
        "operation" => operation,
        "kind" => kind_label(kind)
    )
    .increment(1);

    if kind == ErrorKind::Conflict {
        metrics::counter!("bracket_conflicts_total", "operation" => operation).increment(1);
    }
}

// ============================================================================
// Auth Metrics
// ============================================================================

/// Increment rejected authorization counter.
pub fn authorization_denied_total(reason: &'static str) {
    metrics::counter!("authorization_denied_total", "reason" => reason).increment(1);
}

fn kind_label(kind: ErrorKind) -> &'static str {
    match kind {
        ErrorKind::Validation => "validation",
        ErrorKind::NotFound => "not_found",
        ErrorKind::Conflict => "conflict",
        ErrorKind::Forbidden => "forbidden",
        ErrorKind::Internal => "internal",
    }
}
