//! Test helper utilities

use std::time::Duration;
use tokio::time::sleep;

/// Test environment setup utilities
pub struct TestEnv;

impl TestEnv {
    /// Wait for a condition to be true with timeout
    ///
    /// Useful when the outcome is produced by a spawned task, e.g. a process
    /// exit watcher or a background sweep loop.
    pub async fn wait_for<F, Fut>(mut condition: F, timeout: Duration) -> bool
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = bool>,
    {
        let start = std::time::Instant::now();

        while start.elapsed() < timeout {
            if condition().await {
                return true;
            }
            sleep(Duration::from_millis(20)).await;
        }

        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_wait_for_condition() {
        let counter = Arc::new(AtomicUsize::new(0));
        let c = counter.clone();
        let ok = TestEnv::wait_for(
            move || {
                let c = c.clone();
                async move { c.fetch_add(1, Ordering::SeqCst) >= 3 }
            },
            Duration::from_secs(2),
        )
        .await;
        assert!(ok);
        assert!(counter.load(Ordering::SeqCst) >= 4);
    }

    #[tokio::test]
    async fn test_wait_for_timeout() {
        let ok = TestEnv::wait_for(|| async { false }, Duration::from_millis(60)).await;
        assert!(!ok);
    }
}
