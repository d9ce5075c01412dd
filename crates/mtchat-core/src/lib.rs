//! Domain model and pure logic of the mtchat entity client.
//!
//! Everything here is transport-agnostic: the sign-in state machine, entity
//! records and form schemas, statistics derivation, related-entity ranking
//! and chat hand-off links. Side effects live behind the [`api::EntityApi`],
//! [`session::TokenStore`] and [`notice`] traits, implemented by the
//! infrastructure crate.

pub mod api;
pub mod auth;
pub mod chat;
pub mod config;
pub mod conversation;
pub mod entity;
pub mod error;
pub mod notice;
pub mod related;
pub mod session;
pub mod stats;

pub use error::{MtchatError, Result};
