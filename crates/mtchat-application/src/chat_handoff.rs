//! Contacting an entity's owner: chat hand-off and attribute requests.

use std::sync::Arc;

use mtchat_core::api::{ChatRequestNotice, CurrentUser, EmailMessage, EntityApi, EventLog};
use mtchat_core::chat::{ChatId, ChatLinks, ChatSession, LoaderLink};
use mtchat_core::stats::event_type;
use mtchat_core::{MtchatError, Result};
use serde::{Deserialize, Serialize};

use crate::best_effort::BestEffort;

/// Display name used in the participant link when the requester is anonymous.
pub const GUEST_NAME: &str = "guest";

/// Body of a "contact owner" request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactOwner {
    pub entity_id: String,
    #[serde(default)]
    pub owner_id: String,
    #[serde(default)]
    pub entity_name: String,
}

/// Result of a successful hand-off.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Handoff {
    pub chat_id: ChatId,
    /// Participant side of the room, opened by the requester.
    pub chat_url: String,
    /// Owner side of the room, sent in the notification.
    pub owner_url: String,
    /// `/notification-loader?...` path the requester is sent to.
    pub loader_path: String,
}

/// Body of a "request info" call for a missing attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeRequest {
    pub entity_id: String,
    pub attribute_name: String,
    pub owner_email: String,
    #[serde(default)]
    pub entity_name: String,
}

#[derive(Clone)]
pub struct ChatHandoff {
    api: Arc<dyn EntityApi>,
    links: ChatLinks,
    public_url: String,
    best_effort: BestEffort,
}

impl ChatHandoff {
    pub fn new(api: Arc<dyn EntityApi>, links: ChatLinks, public_url: impl Into<String>) -> Self {
        Self {
            api,
            links,
            public_url: public_url.into(),
            best_effort: BestEffort::new(),
        }
    }

    pub fn with_best_effort(mut self, best_effort: BestEffort) -> Self {
        self.best_effort = best_effort;
        self
    }

    pub fn best_effort(&self) -> &BestEffort {
        &self.best_effort
    }

    async fn audit_user(&self) -> CurrentUser {
        match self.api.current_user().await {
            Ok(user) => user,
            Err(e) => {
                tracing::warn!("[ChatHandoff] Could not resolve requester: {}", e);
                CurrentUser::default()
            }
        }
    }

    /// Notifies the owner and returns the links for the requester.
    ///
    /// Only the owner notification can fail the hand-off. The requester
    /// lookup and the audit log are secondary.
    pub async fn contact_owner(&self, request: &ContactOwner, requester_name: Option<&str>) -> Result<Handoff> {
        let entity_id = request.entity_id.trim();
        if entity_id.is_empty() {
            return Err(MtchatError::validation("entityId is required"));
        }

        let chat_id = ChatId::for_entity(entity_id);
        let owner_url = self.links.owner_url(&chat_id, &request.owner_id, entity_id)?;
        let session = ChatSession::open(
            &self.links,
            entity_id,
            requester_name.filter(|n| !n.is_empty()).unwrap_or(GUEST_NAME),
        )?;

        self.api
            .notify_chat_request(&ChatRequestNotice {
                entity_id: entity_id.to_string(),
                chat_url: owner_url.clone(),
                url: owner_url.clone(),
            })
            .await?;
        tracing::info!("[ChatHandoff] Owner notified for {}", entity_id);

        let user = self.audit_user().await;
        let event = EventLog::new(
            event_type::CHAT_REQUEST,
            format!("Chat request sent for entity: {}", request.entity_name),
        )
        .user(user.audit_id())
        .link(owner_url.clone())
        .payload("entityId", entity_id)
        .payload("chat_url", owner_url.as_str())
        .payload("chat_id", chat_id.as_str())
        .payload("owner_id", request.owner_id.as_str())
        .payload("entity_name", request.entity_name.as_str());
        let api = Arc::clone(&self.api);
        self.best_effort.spawn("chat_request log", async move {
            api.send_notification(&event).await
        });

        let loader_path = LoaderLink::new(session.url.clone(), chat_id.as_str(), entity_id).to_path();
        Ok(Handoff {
            chat_id: session.chat_id,
            chat_url: session.url,
            owner_url,
            loader_path,
        })
    }

    /// Emails the owner that a missing attribute was requested.
    ///
    /// The requester must be signed in; a failed `auth/me` is reported as an
    /// expired session.
    pub async fn request_attribute(&self, request: &AttributeRequest) -> Result<()> {
        let user = self.api.current_user().await.map_err(|e| {
            tracing::warn!("[ChatHandoff] Requester lookup failed: {}", e);
            MtchatError::SessionExpired
        })?;
        let requester = user.email.clone().unwrap_or_default();

        self.api
            .send_email(&EmailMessage {
                email: request.owner_email.clone(),
                subject: format!(
                    "Request for information on your entity: {}",
                    request.entity_name
                ),
                message: format!(
                    "User {} requested info for \"{}\" on entity \"{}\"",
                    requester, request.attribute_name, request.entity_name
                ),
            })
            .await?;

        let event = EventLog::new(
            event_type::REQUEST_ATTRIBUTE,
            format!(
                "Requested attribute \"{}\" for entity \"{}\"",
                request.attribute_name, request.entity_name
            ),
        )
        .user(user.audit_id())
        .link(format!("{}/#{}", self.public_url.trim_end_matches('/'), request.entity_id))
        .payload("entityId", request.entity_id.as_str())
        .payload("requested_attribute", request.attribute_name.as_str())
        .payload("owner_email", request.owner_email.as_str())
        .payload("requester_email", requester)
        .payload("entity_name", request.entity_name.as_str());
        let api = Arc::clone(&self.api);
        self.best_effort.spawn("request_attribute log", async move {
            api.send_notification(&event).await
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockApi;
    use mtchat_core::chat::{LoaderParams, generate_chat_id};
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    fn handoff(api: Arc<MockApi>) -> ChatHandoff {
        ChatHandoff::new(api, ChatLinks::new("https://chat.test"), "https://app.test")
    }

    fn contact() -> ContactOwner {
        ContactOwner {
            entity_id: "e1".into(),
            owner_id: "owner-7".into(),
            entity_name: "Flat".into(),
        }
    }

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    #[tokio::test]
    async fn test_contact_owner_notifies_and_builds_loader() {
        let api = MockApi::new();
        let handoff = handoff(api.clone());
        let result = handoff.contact_owner(&contact(), None).await.unwrap();

        assert_eq!(result.chat_id.as_str(), generate_chat_id("e1"));
        assert!(result.chat_url.contains("name=guest"));
        assert!(result.owner_url.contains("role=owner"));
        assert!(result.owner_url.contains("name=owner-7"));

        let notices = api.notices();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].chat_url, result.owner_url);
        assert_eq!(notices[0].url, result.owner_url);

        let params = LoaderParams::parse(result.loader_path.split_once('?').unwrap().1);
        assert_eq!(params.url.as_deref(), Some(result.chat_url.as_str()));
        assert_eq!(params.entity_id.as_deref(), Some("e1"));

        settle().await;
        let events = api.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, "chat_request");
        assert_eq!(events[0].user_id, "u1");
    }

    #[tokio::test]
    async fn test_log_failure_does_not_fail_handoff() {
        let api = MockApi::new();
        api.fail_event_log.store(true, Ordering::SeqCst);
        *api.user.lock().unwrap() = Err(MtchatError::network("down"));
        let handoff = handoff(api.clone());

        assert!(handoff.contact_owner(&contact(), Some("Ana")).await.is_ok());
        settle().await;
        assert_eq!(handoff.best_effort().failure_count(), 1);
    }

    #[tokio::test]
    async fn test_owner_notification_failure_propagates() {
        let api = MockApi::new();
        api.fail_notify.store(true, Ordering::SeqCst);
        let err = handoff(api.clone())
            .contact_owner(&contact(), None)
            .await
            .unwrap_err();
        assert!(err.is_network());
        assert_eq!(api.calls("send_notification"), 0);
    }

    #[tokio::test]
    async fn test_request_attribute_emails_owner() {
        let api = MockApi::new();
        let request = AttributeRequest {
            entity_id: "e1".into(),
            attribute_name: "price".into(),
            owner_email: "owner@example.com".into(),
            entity_name: "Flat".into(),
        };
        handoff(api.clone()).request_attribute(&request).await.unwrap();

        let emails = api.emails();
        assert_eq!(emails[0].email, "owner@example.com");
        assert_eq!(
            emails[0].message,
            "User viewer@example.com requested info for \"price\" on entity \"Flat\""
        );
        settle().await;
        assert_eq!(api.events()[0].link, "https://app.test/#e1");

        *api.user.lock().unwrap() = Err(MtchatError::network("down"));
        let err = handoff(api.clone()).request_attribute(&request).await.unwrap_err();
        assert!(err.is_session_expired());
    }
}
