//! Contract of the remote entity API.
//!
//! [`EntityApi`] is the seam between the use cases and the HTTP gateway;
//! the use cases never see URLs or status codes, only typed results and
//! [`MtchatError`] values.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::auth::OtpCode;
use crate::entity::{CategoryList, CreateEntityRequest, Entity, EntityImage, EntityList, SearchParams};
use crate::error::{MtchatError, Result};
use crate::stats::InteractionLogEntry;

// ============================================================================
// Request / response bodies
// ============================================================================

/// Body of `POST /api/auth/send-otp`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendOtpRequest {
    pub email: String,
    pub tenant_id: String,
}

/// Body of `POST /api/auth/verify-otp`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyOtpRequest {
    pub email: String,
    pub otp: String,
    pub tenant_id: String,
}

/// Response of `POST /api/auth/verify-otp`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct VerifyOtpResponse {
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl VerifyOtpResponse {
    /// The issued token, or a validation error carrying the API's message.
    pub fn into_token(self) -> Result<String> {
        match self.token.filter(|t| !t.is_empty()) {
            Some(token) => Ok(token),
            None => Err(MtchatError::validation(
                self.message
                    .unwrap_or_else(|| "Invalid verification code".to_string()),
            )),
        }
    }
}

/// The signed-in user as reported by `GET /api/auth/me`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct CurrentUser {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

impl CurrentUser {
    /// Parses `{ "user": {...} }` or a bare user object.
    pub fn from_response(value: Value) -> Result<Self> {
        let inner = match value {
            Value::Object(mut map) if map.contains_key("user") => {
                map.remove("user").unwrap_or(Value::Null)
            }
            other => other,
        };
        Ok(serde_json::from_value(inner)?)
    }

    /// User id for audit records; `unknown` when the API returned none.
    pub fn audit_id(&self) -> &str {
        if self.id.is_empty() { "unknown" } else { &self.id }
    }
}

/// An event sent to `POST /api/notifications/send` or the interaction log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventLog {
    #[serde(default)]
    pub user_id: String,
    pub event_type: String,
    pub message: String,
    #[serde(default)]
    pub link: String,
    #[serde(default = "default_tenant_context")]
    pub tenant_context: String,
    #[serde(default)]
    pub event_payload: Map<String, Value>,
}

fn default_tenant_context() -> String {
    "default".to_string()
}

impl EventLog {
    pub fn new(event_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            user_id: String::new(),
            event_type: event_type.into(),
            message: message.into(),
            link: String::new(),
            tenant_context: default_tenant_context(),
            event_payload: Map::new(),
        }
    }

    pub fn user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = user_id.into();
        self
    }

    pub fn link(mut self, link: impl Into<String>) -> Self {
        self.link = link.into();
        self
    }

    pub fn tenant_context(mut self, context: impl Into<String>) -> Self {
        self.tenant_context = context.into();
        self
    }

    pub fn payload(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.event_payload.insert(key.into(), value.into());
        self
    }

    /// Rejects events missing the fields the notification service requires.
    pub fn validate(&self) -> Result<()> {
        if self.user_id.is_empty() || self.event_type.is_empty() || self.message.is_empty() {
            return Err(MtchatError::validation(
                "Missing required fields: userId, eventType, message",
            ));
        }
        Ok(())
    }
}

/// Body of `POST /api/notifications/chat-request`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequestNotice {
    pub entity_id: String,
    pub chat_url: String,
    pub url: String,
}

/// Query of `GET /api/notifications/history`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryQuery {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_history_limit")]
    pub limit: u32,
    #[serde(default)]
    pub entity_id: Option<String>,
    #[serde(default)]
    pub notification_type: Option<String>,
}

fn default_page() -> u32 {
    1
}

fn default_history_limit() -> u32 {
    20
}

impl Default for HistoryQuery {
    fn default() -> Self {
        Self {
            page: default_page(),
            limit: default_history_limit(),
            entity_id: None,
            notification_type: None,
        }
    }
}

impl HistoryQuery {
    pub fn for_entity(entity_id: impl Into<String>) -> Self {
        Self {
            entity_id: Some(entity_id.into()),
            ..Self::default()
        }
    }

    pub fn to_query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = vec![
            ("page".to_string(), self.page.to_string()),
            ("limit".to_string(), self.limit.to_string()),
        ];
        if let Some(id) = &self.entity_id {
            pairs.push(("entity_id".into(), id.clone()));
        }
        if let Some(kind) = &self.notification_type {
            pairs.push(("notification_type".into(), kind.clone()));
        }
        pairs
    }
}

/// Body of `POST /api/test/send-email`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailMessage {
    pub email: String,
    pub subject: String,
    pub message: String,
}

/// Default page size of the interaction-log feed.
pub const INTERACTION_LOG_LIMIT: u32 = 100;

// ============================================================================
// The API seam
// ============================================================================

/// Typed operations of the remote entity API.
///
/// Implementations attach the session token themselves. A 401 from any call
/// surfaces as [`MtchatError::SessionExpired`].
#[async_trait]
pub trait EntityApi: Send + Sync {
    /// Requests an OTP email.
    async fn send_otp(&self, email: &str) -> Result<Value>;

    /// Exchanges email + OTP for a session token.
    async fn verify_otp(&self, email: &str, otp: &OtpCode) -> Result<VerifyOtpResponse>;

    /// `GET /api/auth/me`.
    async fn current_user(&self) -> Result<CurrentUser>;

    /// Entities owned by the signed-in user.
    async fn my_entities(&self) -> Result<EntityList>;

    /// All entities visible to the caller.
    async fn list_entities(&self) -> Result<EntityList>;

    async fn get_entity(&self, id: &str) -> Result<Entity>;

    async fn entity_images(&self, id: &str) -> Result<Vec<EntityImage>>;

    async fn search(&self, params: &SearchParams) -> Result<EntityList>;

    async fn create_entity(&self, request: &CreateEntityRequest) -> Result<Entity>;

    async fn categories(&self) -> Result<CategoryList>;

    /// Interaction-log feed, optionally filtered to one entity.
    async fn interaction_logs(
        &self,
        entity_id: Option<&str>,
        limit: u32,
    ) -> Result<Vec<InteractionLogEntry>>;

    async fn log_interaction(&self, event: &EventLog) -> Result<Value>;

    async fn notify_chat_request(&self, notice: &ChatRequestNotice) -> Result<Value>;

    async fn send_notification(&self, event: &EventLog) -> Result<Value>;

    /// Raw notification history page.
    async fn notification_history(&self, query: &HistoryQuery) -> Result<Value>;

    /// Public lookup by share token; needs no session.
    async fn shared_entity(&self, token: &str) -> Result<Entity>;

    async fn send_email(&self, email: &EmailMessage) -> Result<Value>;
}
