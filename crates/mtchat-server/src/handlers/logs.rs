//! Interaction-log and notification handlers.

use axum::Json;
use axum::extract::Query;
use axum::http::StatusCode;
use chrono::Utc;
use mtchat_core::api::{EventLog, HistoryQuery, INTERACTION_LOG_LIMIT};
use mtchat_core::stats::parse_log_feed;
use serde::Deserialize;
use serde_json::{Map, Value, json};

use crate::error::ApiError;
use crate::session::Session;

#[derive(Debug, Deserialize)]
pub struct LogQuery {
    #[serde(default, alias = "entityId")]
    pub entity_id: Option<String>,
    #[serde(default = "default_log_limit")]
    pub limit: u32,
}

fn default_log_limit() -> u32 {
    INTERACTION_LOG_LIMIT
}

/// Interaction-log feed as `{ "logs": [...] }`.
///
/// When the log service is unavailable the notification history is used
/// instead; if that fails too the feed is empty.
pub async fn interaction_logs(
    session: Session,
    Query(query): Query<LogQuery>,
) -> Result<Json<Value>, ApiError> {
    if !session.has_token() {
        return Err(ApiError::authentication_required());
    }
    let entity_id = query.entity_id.as_deref();
    match session.api.interaction_logs(entity_id, query.limit).await {
        Ok(logs) => return Ok(Json(json!({ "logs": logs }))),
        Err(e) if e.is_session_expired() => return Err(e.into()),
        Err(e) => tracing::warn!("[Logs] Interaction log unavailable, using history: {}", e),
    }

    let history = HistoryQuery {
        limit: query.limit,
        entity_id: query.entity_id.clone(),
        ..HistoryQuery::default()
    };
    match session.api.notification_history(&history).await {
        Ok(value) => Ok(Json(json!({ "logs": parse_log_feed(value) }))),
        Err(e) if e.is_session_expired() => Err(e.into()),
        Err(e) => {
            tracing::warn!("[Logs] History fallback failed: {}", e);
            Ok(Json(json!({ "logs": [] })))
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InteractionBody {
    #[serde(default)]
    pub event_type: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub tenant_context: Option<String>,
    #[serde(default)]
    pub entity_id: Option<String>,
    #[serde(default)]
    pub interaction_type: Option<String>,
    #[serde(default)]
    pub event_payload: Map<String, Value>,
}

impl InteractionBody {
    fn into_event(self, authenticated: bool) -> EventLog {
        let user = if authenticated { "authenticated_user" } else { "anonymous" };
        let mut event = EventLog::new(
            self.event_type.unwrap_or_else(|| "interaction".into()),
            self.message.unwrap_or_default(),
        )
        .user(user)
        .link(self.link.unwrap_or_default())
        .tenant_context(
            self.tenant_context
                .unwrap_or_else(|| "entity_interaction".into()),
        )
        .payload("entityId", self.entity_id)
        .payload("interactionType", self.interaction_type)
        .payload("timestamp", Utc::now().to_rfc3339())
        .payload("authenticated", authenticated);
        event.event_payload.extend(self.event_payload);
        event
    }
}

/// Records an interaction. Logging never fails the caller: every path
/// answers 201.
pub async fn log_interaction(
    session: Session,
    Json(body): Json<InteractionBody>,
) -> (StatusCode, Json<Value>) {
    let authenticated = session.has_token();
    let event = body.into_event(authenticated);

    if authenticated {
        match session.api.log_interaction(&event).await {
            Ok(data) => return (StatusCode::CREATED, Json(data)),
            Err(e) => tracing::warn!("[Logs] Interaction log rejected, using notifications: {}", e),
        }
        match session.api.send_notification(&event).await {
            Ok(data) => return (StatusCode::CREATED, Json(data)),
            Err(e) => tracing::warn!("[Logs] Notification fallback failed: {}", e),
        }
    }
    (
        StatusCode::CREATED,
        Json(json!({ "message": "Interaction logged successfully" })),
    )
}

/// Forwards a validated event to the notification service.
pub async fn log_notification(
    session: Session,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    session.require_token()?;
    let event: EventLog = serde_json::from_value(body).map_err(|_| {
        ApiError::BadRequest("Missing required fields: userId, eventType, message".into())
    })?;
    event.validate()?;
    let data = session.api.send_notification(&event).await?;
    Ok((StatusCode::CREATED, Json(data)))
}

pub async fn notification_history(
    session: Session,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Value>, ApiError> {
    session.require_token()?;
    Ok(Json(session.api.notification_history(&query).await?))
}
