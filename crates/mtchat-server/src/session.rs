//! Per-request cookie session.
//!
//! [`session_cookies`] seeds a [`CookieSessionStore`] from the `Cookie`
//! header and, once the handler has run, turns every write to that store
//! into a `Set-Cookie` header. Handlers reach the store through the
//! [`Session`] extractor.

use std::sync::Arc;

use axum::async_trait;
use axum::extract::{FromRequestParts, Request, State};
use axum::http::header::{COOKIE, SET_COOKIE};
use axum::http::request::Parts;
use axum::http::HeaderValue;
use axum::middleware::Next;
use axum::response::Response;
use mtchat_core::api::EntityApi;
use mtchat_core::session::TokenStore;
use mtchat_infrastructure::storage::CookieSessionStore;

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Clone)]
struct SessionCookies(Arc<CookieSessionStore>);

pub async fn session_cookies(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let header = request
        .headers()
        .get(COOKIE)
        .and_then(|value| value.to_str().ok());
    let store = Arc::new(CookieSessionStore::from_cookie_header(
        header,
        state.cookie_policy(),
    ));
    request
        .extensions_mut()
        .insert(SessionCookies(Arc::clone(&store)));

    let mut response = next.run(request).await;
    for cookie in store.take_set_cookies() {
        match HeaderValue::from_str(&cookie) {
            Ok(value) => {
                response.headers_mut().append(SET_COOKIE, value);
            }
            Err(e) => tracing::error!("[Session] Dropping invalid Set-Cookie: {}", e),
        }
    }
    response
}

/// The caller's session and a remote API bound to it.
pub struct Session {
    pub tokens: Arc<CookieSessionStore>,
    pub api: Arc<dyn EntityApi>,
}

impl Session {
    pub fn has_token(&self) -> bool {
        self.tokens.has_token()
    }

    /// Rejects the request with 401 `Unauthorized` when no cookie is present.
    pub fn require_token(&self) -> Result<(), ApiError> {
        if self.has_token() {
            Ok(())
        } else {
            Err(ApiError::unauthorized())
        }
    }
}

#[async_trait]
impl FromRequestParts<AppState> for Session {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let SessionCookies(tokens) = parts
            .extensions
            .get::<SessionCookies>()
            .cloned()
            .ok_or_else(|| ApiError::Internal("session layer not installed".into()))?;
        let api = state.api_for(tokens.clone());
        Ok(Self { tokens, api })
    }
}
