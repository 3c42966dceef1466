//! Per-invocation wall-clock budget.
//!
//! Every model pass and tool call of one invocation runs through
//! [`Deadline::run`], so a single cancellation signal aborts whichever call
//! is in flight once the budget is spent.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::OrchestrationError;

pub struct Deadline {
    token: CancellationToken,
    expires_at: Instant,
    budget: Duration,
}

impl Deadline {
    /// Arms a deadline `budget` from now.
    pub fn arm(budget: Duration) -> Self {
        Self {
            token: CancellationToken::new(),
            expires_at: Instant::now() + budget,
            budget,
        }
    }

    #[cfg(test)]
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn budget(&self) -> Duration {
        self.budget
    }

    pub fn is_expired(&self) -> bool {
        self.token.is_cancelled() || Instant::now() >= self.expires_at
    }

    /// Drives `fut` until it completes or the deadline fires.
    ///
    /// When the deadline fires, `fut` is dropped and the token is cancelled.
    pub async fn run<F, T>(&self, fut: F) -> Result<T, OrchestrationError>
    where
        F: Future<Output = T>,
    {
        tokio::select! {
            biased;
            _ = self.token.cancelled() => Err(OrchestrationError::Timeout(self.budget)),
            _ = tokio::time::sleep_until(self.expires_at) => {
                self.token.cancel();
                Err(OrchestrationError::Timeout(self.budget))
            }
            out = fut => Ok(out),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_completes_within_budget() {
        let deadline = Deadline::arm(Duration::from_secs(5));
        let out = deadline.run(async { 42 }).await.unwrap();
        assert_eq!(out, 42);
        assert!(!deadline.is_expired());
    }

    #[tokio::test(start_paused = true)]
    async fn test_times_out_and_cancels_token() {
        let deadline = Deadline::arm(Duration::from_secs(30));
        let err = deadline
            .run(tokio::time::sleep(Duration::from_secs(60)))
            .await
            .unwrap_err();
        assert!(matches!(err, OrchestrationError::Timeout(d) if d == Duration::from_secs(30)));
        assert!(deadline.token().is_cancelled());
        assert!(deadline.is_expired());
    }

    #[tokio::test]
    async fn test_external_cancel_stops_work() {
        let deadline = Deadline::arm(Duration::from_secs(30));
        deadline.token().cancel();
        let err = deadline.run(std::future::pending::<()>()).await.unwrap_err();
        assert!(matches!(err, OrchestrationError::Timeout(_)));
    }
}
