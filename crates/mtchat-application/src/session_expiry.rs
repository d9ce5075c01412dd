//! Session-expiry recovery: tell the user, then reload.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use mtchat_core::notice::{Notifier, SessionExpiryHandler, Toast};

/// Delay between the "session expired" toast and the reload.
pub const RELOAD_DELAY: Duration = Duration::from_millis(1000);

type ReloadFn = Arc<dyn Fn() + Send + Sync>;

/// Shows the session-expired toast and schedules a reload.
///
/// Several requests may fail with 401 at once; only one reload is scheduled
/// until it has run.
pub struct ReloadOnExpiry {
    notifier: Arc<dyn Notifier>,
    reload: ReloadFn,
    delay: Duration,
    pending: Arc<AtomicBool>,
}

impl ReloadOnExpiry {
    pub fn new(notifier: Arc<dyn Notifier>, reload: impl Fn() + Send + Sync + 'static) -> Self {
        Self {
            notifier,
            reload: Arc::new(reload),
            delay: RELOAD_DELAY,
            pending: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

impl SessionExpiryHandler for ReloadOnExpiry {
    fn on_session_expired(&self) {
        if self.pending.swap(true, Ordering::SeqCst) {
            tracing::debug!("[SessionExpiry] Reload already scheduled");
            return;
        }
        tracing::warn!("[SessionExpiry] Session expired, reloading");
        self.notifier.notify(Toast::session_expired());

        let reload = Arc::clone(&self.reload);
        let pending = Arc::clone(&self.pending);
        let delay = self.delay;
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    tokio::time::sleep(delay).await;
                    pending.store(false, Ordering::SeqCst);
                    reload();
                });
            }
            Err(_) => {
                pending.store(false, Ordering::SeqCst);
                reload();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::AtomicUsize;

    #[derive(Default)]
    struct RecordingNotifier {
        toasts: Mutex<Vec<Toast>>,
    }

    impl Notifier for RecordingNotifier {
        fn notify(&self, toast: Toast) {
            self.toasts.lock().unwrap().push(toast);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_toast_then_single_reload() {
        let notifier = Arc::new(RecordingNotifier::default());
        let reloads = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&reloads);
        let handler = ReloadOnExpiry::new(notifier.clone(), move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        handler.on_session_expired();
        handler.on_session_expired();
        assert_eq!(notifier.toasts.lock().unwrap().len(), 1);
        assert_eq!(
            notifier.toasts.lock().unwrap()[0].title,
            "Session Expired"
        );

        tokio::time::sleep(Duration::from_millis(999)).await;
        assert_eq!(reloads.load(Ordering::SeqCst), 0);
        tokio::time::sleep(Duration::from_millis(2)).await;
        assert_eq!(reloads.load(Ordering::SeqCst), 1);
    }
}
