// crates/vmp-http/src/deadline.rs
// ============================================================================
// Module: Request Deadlines
// Description: Wraps a future with a configured timeout, converting elapse
//              into `CoreError::Unavailable` (spec.md §5 "Timeouts").
// Dependencies: tokio, vmp-core
// ============================================================================

//! ## Overview
//! Every store, object-store, and notification call a handler makes passes
//! through [`with_deadline`] so a slow backend degrades into a 503 instead
//! of hanging the request indefinitely.

use std::future::Future;
use std::time::Duration;

use vmp_core::CoreError;

/// Runs `future` under `deadline`, converting a timeout into
/// [`CoreError::Unavailable`].
pub async fn with_deadline<T, F>(deadline: Duration, future: F) -> Result<T, CoreError>
where
    F: Future<Output = Result<T, CoreError>>,
{
    match tokio::time::timeout(deadline, future).await {
        Ok(result) => result,
        Err(_) => Err(CoreError::Unavailable(format!("operation exceeded {deadline:?} deadline"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn completes_before_deadline() {
        let result = with_deadline(Duration::from_secs(1), async { Ok::<_, CoreError>(42) }).await;
        assert_eq!(result.expect("under deadline"), 42);
    }

    #[tokio::test]
    async fn elapsing_the_deadline_is_unavailable() {
        let result = with_deadline(Duration::from_millis(5), async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            Ok::<_, CoreError>(())
        })
        .await;
        assert_eq!(result.unwrap_err().reason(), "unavailable");
    }
}
