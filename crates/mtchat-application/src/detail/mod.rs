//! Entity detail view orchestration.

mod orchestrator;
mod tab;

pub use orchestrator::{Activation, EntityDetail, PrimaryState, RETRY_ATTEMPTS, RETRY_DELAY};
pub use tab::{TabData, TabKey, TabState};
