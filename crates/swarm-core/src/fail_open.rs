//! Fail-open utilities for graceful degradation
//!
//! Use these for infrastructure operations (lifecycle log records, report
//! persistence) that should never abort a refactoring run.
//!
//! DO NOT use fail-open for:
//! - Model calls (they must escalate)
//! - Sandbox writes (they are recorded as per-file errors instead)

use std::future::Future;
use tracing::warn;

use crate::Result;

/// Execute an operation that should fail open
///
/// Logs the error via `tracing::warn!` on failure and returns `None`.
///
/// ```no_run
/// use swarm_core::fail_open::fail_open;
/// use swarm_core::Result;
///
/// async fn record_startup() -> Result<()> {
///     Ok(())
/// }
///
/// async fn example() {
///     let recorded = fail_open("interaction_log::startup", || record_startup()).await;
///     assert!(recorded.is_some());
/// }
/// ```
pub async fn fail_open<F, Fut, T>(operation_name: &str, f: F) -> Option<T>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    match f().await {
        Ok(val) => Some(val),
        Err(e) => {
            warn!("{} failed (fail-open): {}", operation_name, e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SwarmError;

    #[tokio::test]
    async fn test_fail_open_success() {
        let result = fail_open("test_op", || async { Ok::<_, SwarmError>(42) }).await;
        assert_eq!(result, Some(42));
    }

    #[tokio::test]
    async fn test_fail_open_failure() {
        let result = fail_open("test_op", || async {
            Err::<i32, _>(SwarmError::Other("disk full".to_string()))
        })
        .await;
        assert_eq!(result, None);
    }
}
