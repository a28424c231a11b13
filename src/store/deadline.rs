//! Per-operation deadline
//!
//! Every store call receives a `Deadline`. Backends run their work through
//! [`Deadline::run`], which drops the in-flight future once the deadline
//! passes and reports [`StoreError::Timeout`].

use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;

use super::error::{StoreError, StoreResult};

#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    at: Instant,
    budget: Duration,
}

impl Deadline {
    /// Deadline `budget` from now; a budget past the clock's range never expires
    pub fn after(budget: Duration) -> Self {
        let now = Instant::now();
        Self {
            at: now.checked_add(budget).unwrap_or_else(|| far_future(now)),
            budget,
        }
    }

    /// Time left before expiry, zero once passed
    pub fn remaining(&self) -> Duration {
        self.at.saturating_duration_since(Instant::now())
    }

    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.at
    }

    /// Run `fut` bound by this deadline
    pub async fn run<F, T>(self, fut: F) -> StoreResult<T>
    where
        F: Future<Output = StoreResult<T>>,
    {
        if self.is_expired() {
            return Err(StoreError::Timeout(self.budget));
        }
        tokio::time::timeout_at(self.at, fut)
            .await
            .unwrap_or(Err(StoreError::Timeout(self.budget)))
    }
}

/// Roughly thirty years out, the same horizon tokio uses for "never"
pub fn far_future(now: Instant) -> Instant {
    now + Duration::from_secs(86_400 * 365 * 30)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_huge_budget_does_not_overflow() {
        let deadline = Deadline::after(Duration::from_secs(u64::MAX));
        assert!(!deadline.is_expired());
        assert!(deadline.remaining() > Duration::from_secs(86_400));
        let value = deadline.run(async { Ok(7) }).await.unwrap();
        assert_eq!(value, 7);
    }

    #[tokio::test]
    async fn test_run_completes_within_deadline() {
        let deadline = Deadline::after(Duration::from_secs(5));
        let value = deadline.run(async { Ok(42) }).await.unwrap();
        assert_eq!(value, 42);
    }

    #[tokio::test]
    async fn test_run_times_out() {
        let deadline = Deadline::after(Duration::from_millis(20));
        let result: StoreResult<()> = deadline
            .run(async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(())
            })
            .await;
        assert!(matches!(result, Err(StoreError::Timeout(_))));
    }

    #[tokio::test]
    async fn test_expired_deadline_never_polls() {
        let polled = std::sync::atomic::AtomicBool::new(false);
        let deadline = Deadline::after(Duration::ZERO);
        let result: StoreResult<()> = deadline
            .run(async {
                polled.store(true, std::sync::atomic::Ordering::SeqCst);
                Ok(())
            })
            .await;
        assert!(matches!(result, Err(StoreError::Timeout(_))));
        assert!(!polled.load(std::sync::atomic::Ordering::SeqCst));
        assert_eq!(deadline.remaining(), Duration::ZERO);
    }

    #[tokio::test]
    async fn test_inner_error_passes_through() {
        let deadline = Deadline::after(Duration::from_secs(5));
        let result: StoreResult<()> = deadline
            .run(async { Err(StoreError::Backend("boom".into())) })
            .await;
        assert!(matches!(result, Err(StoreError::Backend(msg)) if msg == "boom"));
    }
}
