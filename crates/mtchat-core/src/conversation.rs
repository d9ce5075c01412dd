//! Per-session helpers for the conversational front-end.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Monotonic message ids scoped to one conversation.
///
/// Ids look like `msg-<session>-<n>`; two generators never share a counter.
#[derive(Debug)]
pub struct MessageIdGenerator {
    session: Uuid,
    next: AtomicU64,
}

impl Default for MessageIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageIdGenerator {
    pub fn new() -> Self {
        Self::with_session(Uuid::new_v4())
    }

    pub fn with_session(session: Uuid) -> Self {
        Self {
            session,
            next: AtomicU64::new(0),
        }
    }

    pub fn session(&self) -> Uuid {
        self.session
    }

    pub fn next_id(&self) -> String {
        let n = self.next.fetch_add(1, Ordering::Relaxed) + 1;
        format!("msg-{}-{n}", self.session.simple())
    }
}

/// A timestamped status line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusEntry {
    pub at: DateTime<Utc>,
    pub text: String,
}

/// Rolling status log; the UI shows the last [`StatusLog::VISIBLE`] lines.
#[derive(Debug, Clone, Default)]
pub struct StatusLog {
    entries: VecDeque<StatusEntry>,
}

impl StatusLog {
    pub const VISIBLE: usize = 5;
    const CAPACITY: usize = 100;

    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, text: impl Into<String>) {
        self.push_at(Utc::now(), text);
    }

    pub fn push_at(&mut self, at: DateTime<Utc>, text: impl Into<String>) {
        if self.entries.len() == Self::CAPACITY {
            self.entries.pop_front();
        }
        self.entries.push_back(StatusEntry {
            at,
            text: text.into(),
        });
    }

    /// The newest entries, oldest first.
    pub fn visible(&self) -> impl Iterator<Item = &StatusEntry> {
        let skip = self.entries.len().saturating_sub(Self::VISIBLE);
        self.entries.iter().skip(skip)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
