//! The chat loader page: query contract and close-redirect target.
//!
//! The loader receives `url`, `chatId`, `entityId` and optionally
//! `auto=true`. Closing it returns to the entity page and carries every
//! other query segment over byte for byte.

use std::time::Duration;

use url::{Url, form_urlencoded};

/// Path of the loader page.
pub const LOADER_PATH: &str = "/notification-loader";
/// Delay before the full-screen chat opens when `auto=true`.
pub const AUTO_OPEN_DELAY: Duration = Duration::from_secs(2);

/// Builder for a loader link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoaderLink {
    pub url: String,
    pub chat_id: String,
    pub entity_id: String,
    pub auto: bool,
}

impl LoaderLink {
    pub fn new(url: impl Into<String>, chat_id: impl Into<String>, entity_id: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            chat_id: chat_id.into(),
            entity_id: entity_id.into(),
            auto: false,
        }
    }

    pub fn auto_open(mut self) -> Self {
        self.auto = true;
        self
    }

    /// Relative path + query, e.g. `/notification-loader?url=...`.
    pub fn to_path(&self) -> String {
        let mut query = form_urlencoded::Serializer::new(String::new());
        query
            .append_pair("url", &self.url)
            .append_pair("chatId", &self.chat_id)
            .append_pair("entityId", &self.entity_id);
        if self.auto {
            query.append_pair("auto", "true");
        }
        format!("{LOADER_PATH}?{}", query.finish())
    }
}

/// Parsed loader query.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LoaderParams {
    /// Decoded chat URL; `None` renders the "no chat URL" state.
    pub url: Option<String>,
    pub chat_id: Option<String>,
    pub entity_id: Option<String>,
    pub auto: bool,
    /// Raw `key=value` segments passed through to the close target.
    pub passthrough: Vec<String>,
}

impl LoaderParams {
    /// Parses a raw query string (with or without the leading `?`).
    pub fn parse(query: &str) -> Self {
        let query = query.strip_prefix('?').unwrap_or(query);
        let mut params = LoaderParams::default();
        for segment in query.split('&').filter(|s| !s.is_empty()) {
            let Some((key, value)) = form_urlencoded::parse(segment.as_bytes()).next() else {
                continue;
            };
            let value = value.into_owned();
            match &*key {
                "url" => params.url = Some(value).filter(|v| is_web_url(v)),
                "entityId" => params.entity_id = Some(value).filter(|v| !v.is_empty()),
                "auto" => params.auto = value == "true",
                "chatId" => {
                    params.chat_id = Some(value);
                    params.passthrough.push(segment.to_string());
                }
                _ => params.passthrough.push(segment.to_string()),
            }
        }
        params
    }

    /// Drops a chat URL that does not share `base`'s origin.
    pub fn restrict_to(mut self, base: &str) -> Self {
        let allowed = Url::parse(base).ok().map(|b| b.origin());
        let origin = self
            .url
            .as_deref()
            .and_then(|u| Url::parse(u).ok())
            .map(|u| u.origin());
        if origin.is_none() || origin != allowed {
            self.url = None;
        }
        self
    }

    /// Where "close" navigates: the entity page with passthrough query, or
    /// `/` when no entity id was given.
    pub fn close_target(&self) -> String {
        match &self.entity_id {
            Some(id) => {
                let path = format!("/entities/{}", encode_segment(id));
                if self.passthrough.is_empty() {
                    path
                } else {
                    format!("{path}?{}", self.passthrough.join("&"))
                }
            }
            None => "/".to_string(),
        }
    }
}

/// Only absolute `http`/`https` URLs may be framed or opened.
fn is_web_url(raw: &str) -> bool {
    Url::parse(raw).is_ok_and(|u| matches!(u.scheme(), "http" | "https"))
}

fn encode_segment(segment: &str) -> String {
    form_urlencoded::byte_serialize(segment.as_bytes()).collect()
}
