use serde::{Deserialize, Serialize};
use url::Url;

use super::id::ChatId;
use crate::error::Result;

/// Default external chat service.
pub const DEFAULT_CHAT_BASE_URL: &str = "https://x.stafa.me";

/// Builds URLs on the external chat service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatLinks {
    base_url: String,
}

impl Default for ChatLinks {
    fn default() -> Self {
        Self::new(DEFAULT_CHAT_BASE_URL)
    }
}

impl ChatLinks {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request_url(&self, chat_id: &ChatId, name: &str, entity_id: &str) -> Result<Url> {
        let mut url = Url::parse(&format!("{}/request", self.base_url.trim_end_matches('/')))?;
        url.query_pairs_mut()
            .append_pair("chatId", chat_id.as_str())
            .append_pair("name", name)
            .append_pair("entity", entity_id);
        Ok(url)
    }

    /// Link for the person contacting the owner.
    pub fn participant_url(&self, chat_id: &ChatId, name: &str, entity_id: &str) -> Result<String> {
        Ok(self.request_url(chat_id, name, entity_id)?.to_string())
    }

    /// Link sent to the entity owner; same room, `role=owner`.
    pub fn owner_url(&self, chat_id: &ChatId, name: &str, entity_id: &str) -> Result<String> {
        let mut url = self.request_url(chat_id, name, entity_id)?;
        url.query_pairs_mut().append_pair("role", "owner");
        Ok(url.to_string())
    }
}

/// A chat room for one entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatSession {
    pub chat_id: ChatId,
    pub url: String,
}

impl ChatSession {
    /// Opens the participant side of the room for `entity_id`.
    pub fn open(links: &ChatLinks, entity_id: &str, name: &str) -> Result<Self> {
        let chat_id = ChatId::for_entity(entity_id);
        let url = links.participant_url(&chat_id, name, entity_id)?;
        Ok(Self { chat_id, url })
    }
}
