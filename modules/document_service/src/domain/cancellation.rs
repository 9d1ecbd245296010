//! Cancellation of units of work

use crate::contract::DocumentsError;
use std::future::Future;
use tokio_util::sync::CancellationToken;

/// Run `work` unless `cancel` fires first.
///
/// On cancellation the work future is dropped; an open transaction inside it
/// is rolled back on drop, so nothing is persisted.
pub async fn run_cancellable<T, F>(cancel: &CancellationToken, work: F) -> Result<T, DocumentsError>
where
    F: Future<Output = Result<T, DocumentsError>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(DocumentsError::Cancelled),
        result = work => result,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_completes_without_cancellation() {
        let token = CancellationToken::new();
        let result = run_cancellable(&token, async { Ok::<_, DocumentsError>(7) }).await;
        assert_eq!(result, Ok(7));
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let token = CancellationToken::new();
        token.cancel();
        let result = run_cancellable(&token, async { Ok::<_, DocumentsError>(7) }).await;
        assert_eq!(result, Err(DocumentsError::Cancelled));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_while_running() {
        let token = CancellationToken::new();
        let canceller = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            canceller.cancel();
        });

        let result = run_cancellable(&token, async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok::<_, DocumentsError>(7)
        })
        .await;
        assert_eq!(result, Err(DocumentsError::Cancelled));
    }
}
