//! Use cases of the mtchat client.
//!
//! Each service takes an `Arc<dyn EntityApi>` and owns the orchestration
//! the domain crate leaves out: sign-in side effects, tab lazy-loading,
//! fallbacks and best-effort logging.

pub mod auth_flow;
pub mod best_effort;
pub mod catalog;
pub mod chat_handoff;
pub mod detail;
pub mod related;
pub mod session_expiry;
pub mod stats_service;
pub mod timers;

#[cfg(test)]
pub(crate) mod testing;

pub use auth_flow::AuthFlow;
pub use best_effort::BestEffort;
pub use catalog::EntityCatalog;
pub use chat_handoff::{AttributeRequest, ChatHandoff, ContactOwner, Handoff};
pub use detail::{
    Activation, EntityDetail, PrimaryState, RETRY_ATTEMPTS, RETRY_DELAY, TabData, TabKey, TabState,
};
pub use related::RelatedEntitiesFinder;
pub use session_expiry::ReloadOnExpiry;
pub use stats_service::{StatsCache, StatsService};
pub use timers::DismissTimer;
