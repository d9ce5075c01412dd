//! Explicit fire-and-forget execution.
//!
//! Secondary steps of multi-step flows (audit logs, view tracking) go through
//! [`BestEffort`]: their errors are logged and counted, never returned.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use mtchat_core::Result;
use tokio::task::JoinHandle;

/// Runner for work whose failure must not affect the caller.
#[derive(Debug, Clone, Default)]
pub struct BestEffort {
    failures: Arc<AtomicU64>,
}

impl BestEffort {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawns `task` in the background.
    ///
    /// The returned handle may be dropped; it is only useful to tests that
    /// want to wait for completion.
    pub fn spawn<F, T>(&self, label: &'static str, task: F) -> JoinHandle<()>
    where
        F: Future<Output = Result<T>> + Send + 'static,
        T: Send + 'static,
    {
        let failures = Arc::clone(&self.failures);
        tokio::spawn(async move {
            if let Err(e) = task.await {
                failures.fetch_add(1, Ordering::Relaxed);
                tracing::warn!("[BestEffort] {} failed: {}", label, e);
            }
        })
    }

    /// Awaits `task` inline, swallowing its error. Returns the value on success.
    pub async fn run<F, T>(&self, label: &'static str, task: F) -> Option<T>
    where
        F: Future<Output = Result<T>>,
    {
        match task.await {
            Ok(value) => Some(value),
            Err(e) => {
                self.failures.fetch_add(1, Ordering::Relaxed);
                tracing::warn!("[BestEffort] {} failed: {}", label, e);
                None
            }
        }
    }

    /// Failures recorded so far, across clones of this runner.
    pub fn failure_count(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mtchat_core::MtchatError;

    #[tokio::test]
    async fn test_spawn_records_failure() {
        let runner = BestEffort::new();
        runner
            .spawn("log", async { Err::<(), _>(MtchatError::network("down")) })
            .await
            .unwrap();
        runner.spawn("ok", async { Ok(1) }).await.unwrap();
        assert_eq!(runner.failure_count(), 1);
    }

    #[tokio::test]
    async fn test_run_swallows_error() {
        let runner = BestEffort::new();
        assert_eq!(runner.run("me", async { Ok(5) }).await, Some(5));
        assert_eq!(
            runner
                .run("me", async { Err::<u8, _>(MtchatError::SessionExpired) })
                .await,
            None
        );
        assert_eq!(runner.clone().failure_count(), 1);
    }
}
