use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum GuardError {
    DeadlineExceeded,
    Cancelled,
}

/// Outer wall-clock bound on an invocation, independent of any timeout the
/// backend applies itself.
pub(crate) struct TimeoutGuard {
    deadline: Duration,
    cancel: CancellationToken,
}

impl TimeoutGuard {
    pub(crate) fn new(deadline: Duration, cancel: CancellationToken) -> Self {
        Self { deadline, cancel }
    }

    /// Drive `fut` until it completes, the deadline passes, or the token is
    /// cancelled. The future is dropped in the latter two cases.
    pub(crate) async fn run<F: Future>(&self, fut: F) -> Result<F::Output, GuardError> {
        tokio::select! {
            biased;
            () = self.cancel.cancelled() => Err(GuardError::Cancelled),
            out = fut => Ok(out),
            () = tokio::time::sleep(self.deadline) => Err(GuardError::DeadlineExceeded),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn completes_within_deadline() {
        let guard = TimeoutGuard::new(Duration::from_secs(1), CancellationToken::new());
        let out = guard
            .run(async {
                tokio::time::sleep(Duration::from_millis(100)).await;
                7
            })
            .await;
        assert_eq!(out, Ok(7));
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_drops_the_future() {
        let guard = TimeoutGuard::new(Duration::from_secs(1), CancellationToken::new());
        let out = guard.run(std::future::pending::<()>()).await;
        assert_eq!(out, Err(GuardError::DeadlineExceeded));
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_wins() {
        let token = CancellationToken::new();
        let guard = TimeoutGuard::new(Duration::from_secs(60), token.child_token());
        let canceller = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            canceller.cancel();
        });
        let out = guard.run(std::future::pending::<()>()).await;
        assert_eq!(out, Err(GuardError::Cancelled));
    }

    #[tokio::test]
    async fn already_cancelled_token_short_circuits() {
        let token = CancellationToken::new();
        token.cancel();
        let guard = TimeoutGuard::new(Duration::from_secs(60), token);
        assert_eq!(guard.run(async { 1 }).await, Err(GuardError::Cancelled));
    }
}
