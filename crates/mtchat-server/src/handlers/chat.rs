//! Owner contact handlers.

use axum::Json;
use axum::extract::State;
use mtchat_application::{AttributeRequest, ChatHandoff, ContactOwner};
use serde_json::{Value, json};

use crate::error::ApiError;
use crate::session::Session;
use crate::state::AppState;

fn handoff(state: &AppState, session: &Session) -> ChatHandoff {
    ChatHandoff::new(
        session.api.clone(),
        state.links().clone(),
        state.config().public_link(""),
    )
}

/// Notifies the owner and returns the chat links for the requester.
pub async fn notify_owner(
    State(state): State<AppState>,
    session: Session,
    Json(request): Json<ContactOwner>,
) -> Result<Json<Value>, ApiError> {
    session.require_token()?;
    let result = handoff(&state, &session)
        .contact_owner(&request, None)
        .await
        .map_err(|e| match ApiError::from(e) {
            ApiError::Upstream { status, .. } => ApiError::Upstream {
                status,
                message: "Failed to notify owner".into(),
            },
            other => other,
        })?;

    let mut body = serde_json::to_value(&result)
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    if let Some(fields) = body.as_object_mut() {
        fields.insert("success".into(), Value::Bool(true));
    }
    Ok(Json(body))
}

pub async fn request_attribute(
    State(state): State<AppState>,
    session: Session,
    Json(request): Json<AttributeRequest>,
) -> Result<Json<Value>, ApiError> {
    session.require_token()?;
    handoff(&state, &session).request_attribute(&request).await?;
    Ok(Json(json!({
        "success": true,
        "message": format!("Request for {} sent to the owner", request.attribute_name),
    })))
}
