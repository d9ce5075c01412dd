//! Sign-in handlers.
//!
//! POST /api/auth/send-otp     request an OTP email
//! POST /api/auth/verify-otp   exchange the OTP for a session cookie
//! POST /api/auth/logout       expire the session cookie
//! GET  /api/auth/status       revalidate the cookie against auth/me
//! GET  /api/test-auth         diagnostic view of the cookie session

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use mtchat_application::AuthFlow;
use mtchat_core::auth::{AuthState, OtpCode, validate_email};
use mtchat_core::session::TokenStore;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::error::ApiError;
use crate::session::Session;
use crate::state::{AppState, LogNotifier};

#[derive(Debug, Deserialize)]
pub struct SendOtpBody {
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct VerifyOtpBody {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub otp: String,
}

pub async fn send_otp(
    session: Session,
    Json(body): Json<SendOtpBody>,
) -> Result<Json<Value>, ApiError> {
    let email = validate_email(&body.email)?;
    let data = session.api.send_otp(&email).await?;
    tracing::info!("[Auth] OTP requested");
    Ok(Json(data))
}

pub async fn verify_otp(
    session: Session,
    Json(body): Json<VerifyOtpBody>,
) -> Result<Json<Value>, ApiError> {
    let email = validate_email(&body.email)?;
    let otp = OtpCode::parse(&body.otp)?;
    let token = session.api.verify_otp(&email, &otp).await?.into_token()?;
    session.tokens.set_token(&token);
    tracing::info!("[Auth] Session established");
    Ok(Json(json!({ "success": true })))
}

pub async fn logout(session: Session) -> Json<Value> {
    session.tokens.clear_token();
    Json(json!({ "success": true }))
}

pub async fn status(session: Session) -> Json<Value> {
    let mut flow = AuthFlow::new(
        session.api.clone(),
        session.tokens.clone(),
        Arc::new(LogNotifier),
    );
    let state = flow.restore().await;
    Json(json!({
        "authenticated": state == AuthState::Authenticated,
        "state": state,
        "user": flow.user(),
    }))
}

pub async fn test_auth(State(state): State<AppState>, session: Session) -> Json<Value> {
    if !session.has_token() {
        return Json(json!({
            "authenticated": false,
            "error": "No auth token found in cookies",
        }));
    }
    match session.api.current_user().await {
        Ok(user) => Json(json!({
            "authenticated": true,
            "user": user,
            "api_base_url": state.api_base_url(),
        })),
        Err(e) => Json(json!({
            "authenticated": false,
            "token_exists": true,
            "api_error": e.to_string(),
            "api_status": e.status(),
            "api_base_url": state.api_base_url(),
        })),
    }
}
