//! Session token stores.
//!
//! [`CookieSessionStore`] backs one BFF request: it reads the token from the
//! request's `Cookie` header and records `Set-Cookie` directives for the
//! response. [`MemoryTokenStore`] backs the terminal client for the lifetime
//! of the process.

use std::sync::{Mutex, MutexGuard, RwLock};

use mtchat_core::session::{AUTH_COOKIE_MAX_AGE_SECS, AUTH_COOKIE_NAME, TokenStore};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Extracts `name` from a `Cookie` request header value.
pub fn cookie_value(header: &str, name: &str) -> Option<String> {
    header
        .split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.trim_matches('"').to_string())
        .filter(|value| !value.is_empty())
}

/// Cookie attributes shared by set and clear directives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CookiePolicy {
    /// Adds `Secure`; on in production.
    pub secure: bool,
}

impl CookiePolicy {
    fn directive(&self, value: &str, max_age: u64) -> String {
        let mut cookie = format!(
            "{AUTH_COOKIE_NAME}={value}; Path=/; Max-Age={max_age}; HttpOnly; SameSite=Lax"
        );
        if self.secure {
            cookie.push_str("; Secure");
        }
        cookie
    }

    /// `Set-Cookie` value that stores `token` for seven days.
    pub fn set_directive(&self, token: &str) -> String {
        self.directive(token, AUTH_COOKIE_MAX_AGE_SECS)
    }

    /// `Set-Cookie` value that expires the session cookie.
    pub fn clear_directive(&self) -> String {
        self.directive("", 0)
    }
}

/// Request-scoped cookie-backed token store.
#[derive(Debug, Default)]
pub struct CookieSessionStore {
    policy: CookiePolicy,
    token: Mutex<Option<String>>,
    pending: Mutex<Vec<String>>,
}

impl CookieSessionStore {
    /// Creates a store seeded from the raw `Cookie` header, if any.
    pub fn from_cookie_header(header: Option<&str>, policy: CookiePolicy) -> Self {
        Self {
            policy,
            token: Mutex::new(header.and_then(|h| cookie_value(h, AUTH_COOKIE_NAME))),
            pending: Mutex::new(Vec::new()),
        }
    }

    /// Drains the `Set-Cookie` values produced by writes to this store.
    ///
    /// Only the last directive matters to a browser, but all are kept in
    /// order so a set followed by a clear still ends cleared.
    pub fn take_set_cookies(&self) -> Vec<String> {
        std::mem::take(&mut *lock(&self.pending))
    }
}

impl TokenStore for CookieSessionStore {
    fn token(&self) -> Option<String> {
        lock(&self.token).clone()
    }

    fn set_token(&self, token: &str) {
        *lock(&self.token) = Some(token.to_string());
        lock(&self.pending).push(self.policy.set_directive(token));
    }

    fn clear_token(&self) {
        *lock(&self.token) = None;
        lock(&self.pending).push(self.policy.clear_directive());
    }
}

/// Process-lifetime token store for the terminal client.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    token: RwLock<Option<String>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: RwLock::new(Some(token.into())),
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn token(&self) -> Option<String> {
        self.token
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn set_token(&self, token: &str) {
        *self
            .token
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(token.to_string());
    }

    fn clear_token(&self) {
        *self
            .token
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = None;
    }
}
