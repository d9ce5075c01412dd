//! Session token ownership.

/// Name of the cookie that carries the session token.
pub const AUTH_COOKIE_NAME: &str = "auth_token";
/// Lifetime of the session cookie: seven days.
pub const AUTH_COOKIE_MAX_AGE_SECS: u64 = 60 * 60 * 24 * 7;

/// Holds at most one authentication token.
///
/// Implementations use interior mutability so a store can be shared behind
/// an `Arc` between the gateway (which clears it on 401) and the flows that
/// set it after OTP verification.
///
/// # Invariants
///
/// - `clear_token()` followed by `token()` yields `None`.
/// - `set_token()` overwrites any previous token.
pub trait TokenStore: Send + Sync {
    /// Returns the current token, if any. No side effects.
    fn token(&self) -> Option<String>;

    /// Stores `token`, replacing any previous one.
    fn set_token(&self, token: &str);

    /// Removes the token. Idempotent.
    fn clear_token(&self);

    /// Whether a token is present. Presence only *claims* a session; it must
    /// still be revalidated against the API.
    fn has_token(&self) -> bool {
        self.token().is_some()
    }
}
