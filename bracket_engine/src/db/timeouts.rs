//! Database operation timeout helpers
//!
//! Bound every repository operation so a stuck connection surfaces as an
//! error instead of hanging the request.

use crate::bracket::errors::{BracketError, BracketResult};
use std::time::Duration;
use tokio::time::timeout;

/// Default timeout for one repository operation (10 seconds)
pub const DEFAULT_OPERATION_TIMEOUT: Duration = Duration::from_secs(10);

/// Timeout for health checks (2 seconds)
pub const HEALTH_CHECK_TIMEOUT: Duration = Duration::from_secs(2);

/// Execute an operation with timeout
///
/// # Arguments
///
/// * `duration` - Timeout duration
/// * `future` - Async operation to execute
///
/// # Returns
///
/// * `BracketResult<T>` - Result, or `BracketError::Timeout`
pub async fn with_timeout<F, T>(duration: Duration, future: F) -> BracketResult<T>
where
    F: std::future::Future<Output = BracketResult<T>>,
{
    match timeout(duration, future).await {
        Ok(result) => result,
        Err(_) => Err(BracketError::Timeout(duration)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_timeout_constants() {
        assert_eq!(DEFAULT_OPERATION_TIMEOUT.as_secs(), 10);
        assert_eq!(HEALTH_CHECK_TIMEOUT.as_secs(), 2);
    }

    #[tokio::test]
    async fn test_slow_operation_times_out() {
        let result: BracketResult<()> = with_timeout(Duration::from_millis(10), async {
            tokio::time::sleep(Duration::from_secs(1)).await;
            Ok(())
        })
        .await;
        let err = result.unwrap_err();
        assert!(matches!(err, BracketError::Timeout(_)));
        assert!(err.to_string().contains("timed out"));
    }

    #[tokio::test]
    async fn test_fast_operation_passes_through() {
        let result = with_timeout(DEFAULT_OPERATION_TIMEOUT, async { Ok(5) }).await;
        assert_eq!(result.unwrap(), 5);
    }
}
