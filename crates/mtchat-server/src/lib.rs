//! Backend-for-frontend over the remote entity API.
//!
//! The browser never sees the bearer token: it lives in an HttpOnly
//! `auth_token` cookie that the BFF turns into an `Authorization` header on
//! every upstream call. A 401 from upstream expires the cookie.

pub mod error;
pub mod handlers;
pub mod pages;
pub mod router;
pub mod session;
pub mod state;

pub use error::ApiError;
pub use router::build_router;
pub use state::AppState;
