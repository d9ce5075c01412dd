//! User-facing notices and the session-expiry hook.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Visual weight of a toast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToastVariant {
    #[default]
    Default,
    Destructive,
}

/// A transient notice shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Toast {
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub variant: ToastVariant,
}

impl Toast {
    pub fn info(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            variant: ToastVariant::Default,
        }
    }

    pub fn error(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            variant: ToastVariant::Destructive,
        }
    }

    /// The notice shown when the API rejects the session.
    pub fn session_expired() -> Self {
        Self::error(
            "Session Expired",
            "Your session has expired. Please log in again.",
        )
    }
}

impl fmt::Display for Toast {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.title, self.description)
    }
}

/// Sink for toasts.
pub trait Notifier: Send + Sync {
    fn notify(&self, toast: Toast);
}

/// Called by the gateway after it cleared the session on a 401.
///
/// The gateway does not wait for the handler; the failing request still
/// returns `SessionExpired` to its caller immediately.
pub trait SessionExpiryHandler: Send + Sync {
    fn on_session_expired(&self);
}

/// Handler that does nothing; used where no UI is attached.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopExpiryHandler;

impl SessionExpiryHandler for NoopExpiryHandler {
    fn on_session_expired(&self) {}
}
