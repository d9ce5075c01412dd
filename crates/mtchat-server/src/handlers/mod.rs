//! BFF route handlers, grouped by concern.

pub mod auth;
pub mod chat;
pub mod entities;
pub mod loader;
pub mod logs;
