use mtchat_core::entity::Entity;
use mtchat_core::stats::{EntityStats, InteractionLogEntry};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};

/// Lazily loaded tabs of the entity detail view.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum TabKey {
    OtherEntities,
    RelatedEntities,
    Statistics,
    Announcements,
}

impl TabKey {
    /// Tabs whose data is only visible to a signed-in viewer.
    pub fn requires_auth(self) -> bool {
        matches!(self, TabKey::Statistics | TabKey::Announcements)
    }

    /// Tabs derived from the primary entity's fields.
    pub fn needs_primary(self) -> bool {
        matches!(self, TabKey::OtherEntities | TabKey::RelatedEntities)
    }

    pub fn all() -> impl Iterator<Item = TabKey> {
        TabKey::iter()
    }
}

/// Payload of a loaded tab.
#[derive(Debug, Clone, PartialEq)]
pub enum TabData {
    Entities(Vec<Entity>),
    Stats(EntityStats),
    Announcements(Vec<InteractionLogEntry>),
}

impl TabData {
    pub fn is_empty(&self) -> bool {
        match self {
            TabData::Entities(entities) => entities.is_empty(),
            TabData::Stats(_) => false,
            TabData::Announcements(entries) => entries.is_empty(),
        }
    }
}

/// Per-tab loading state.
///
/// `fetched_once` is set when a fetch completes, whatever its outcome;
/// `loading` is true only while one is in flight.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TabState {
    pub data: Option<TabData>,
    pub loading: bool,
    pub fetched_once: bool,
}
