// Connection draining module
// Waits for in-flight connections to finish once the listener is closed

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::logger;
use crate::store::far_future;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Wait until no connection is active or the grace period has elapsed.
///
/// The listener must already be dropped so the counter can only go down.
/// Returns the number of connections still open when the wait ended.
pub async fn drain_connections(conn_counter: &AtomicUsize, grace: Duration) -> usize {
    let now = tokio::time::Instant::now();
    let deadline = now.checked_add(grace).unwrap_or_else(|| far_future(now));

    loop {
        let active = conn_counter.load(Ordering::SeqCst);
        if active == 0 {
            break;
        }

        tokio::select! {
            () = tokio::time::sleep(POLL_INTERVAL) => {}
            () = tokio::time::sleep_until(deadline) => break,
        }
    }

    let remaining = conn_counter.load(Ordering::SeqCst);
    logger::log_shutdown_complete(remaining);
    remaining
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_drain_returns_immediately_when_idle() {
        let counter = AtomicUsize::new(0);
        assert_eq!(drain_connections(&counter, Duration::from_secs(5)).await, 0);
    }

    #[tokio::test]
    async fn test_drain_waits_for_connections() {
        let counter = Arc::new(AtomicUsize::new(2));
        let closer = Arc::clone(&counter);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(30)).await;
            closer.fetch_sub(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(30)).await;
            closer.fetch_sub(1, Ordering::SeqCst);
        });

        assert_eq!(drain_connections(&counter, Duration::from_secs(5)).await, 0);
    }

    #[tokio::test]
    async fn test_drain_with_unbounded_grace() {
        let counter = AtomicUsize::new(0);
        assert_eq!(drain_connections(&counter, Duration::from_secs(u64::MAX)).await, 0);
    }

    #[tokio::test]
    async fn test_drain_gives_up_after_grace_period() {
        let counter = AtomicUsize::new(1);
        let remaining = drain_connections(&counter, Duration::from_millis(60)).await;
        assert_eq!(remaining, 1);
    }
}
