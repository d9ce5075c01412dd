//! Cancellable auto-dismiss timers.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio_util::sync::CancellationToken;

/// How long the marketing banner stays up before closing itself.
pub const BANNER_AUTO_CLOSE: Duration = Duration::from_secs(25);
/// Fade-out before the banner's close handler runs.
pub const BANNER_FADE: Duration = Duration::from_millis(500);

type CloseHandler = Box<dyn FnOnce() + Send>;

/// Runs a close handler once: after `delay + fade`, or on [`DismissTimer::dismiss`],
/// whichever comes first. Dismissing cancels the pending timer.
pub struct DismissTimer {
    cancel: CancellationToken,
    handler: Arc<Mutex<Option<CloseHandler>>>,
}

fn fire(handler: &Mutex<Option<CloseHandler>>) -> bool {
    let taken = handler
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .take();
    match taken {
        Some(f) => {
            f();
            true
        }
        None => false,
    }
}

impl DismissTimer {
    /// Starts the timer on the current tokio runtime.
    pub fn start<F>(delay: Duration, fade: Duration, on_close: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        let cancel = CancellationToken::new();
        let handler: Arc<Mutex<Option<CloseHandler>>> =
            Arc::new(Mutex::new(Some(Box::new(on_close))));

        let token = cancel.clone();
        let pending = Arc::clone(&handler);
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = tokio::time::sleep(delay + fade) => {
                    fire(&pending);
                }
            }
        });

        Self { cancel, handler }
    }

    /// Banner timer with the standard delays.
    pub fn banner<F>(on_close: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self::start(BANNER_AUTO_CLOSE, BANNER_FADE, on_close)
    }

    /// Closes now. Returns false if the handler already ran.
    pub fn dismiss(&self) -> bool {
        self.cancel.cancel();
        fire(&self.handler)
    }

    pub fn is_closed(&self) -> bool {
        self.handler
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .is_none()
    }
}

impl Drop for DismissTimer {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
