//! Timeout wrapper for audit attempts

use std::future::Future;
use std::time::Duration;

use crate::errors::PageError;

/// Run one attempt under a time budget
///
/// On expiry the attempt future is dropped, which cancels navigation and any
/// analyzer still running, and a retryable timeout error is returned.
///
/// # Arguments
/// * `operation` - The attempt to run
/// * `timeout_secs` - Budget in seconds
/// * `operation_name` - Human-readable name for the error message
pub async fn with_attempt_timeout<F, T>(
    operation: F,
    timeout_secs: u64,
    operation_name: &str,
) -> Result<T, PageError>
where
    F: Future<Output = Result<T, PageError>>,
{
    match tokio::time::timeout(Duration::from_secs(timeout_secs), operation).await {
        Ok(result) => result,
        Err(_) => Err(PageError::timeout(timeout_secs, operation_name)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::FailureKind;

    #[tokio::test(start_paused = true)]
    async fn expired_budget_is_a_timeout_error() {
        let result: Result<(), PageError> = with_attempt_timeout(
            async {
                tokio::time::sleep(Duration::from_secs(10)).await;
                Ok(())
            },
            1,
            "audit attempt",
        )
        .await;

        let err = result.expect_err("should time out");
        assert_eq!(err.kind, FailureKind::Timeout);
        assert!(err.kind.is_retryable());
    }
}
