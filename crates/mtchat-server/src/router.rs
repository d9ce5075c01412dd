//! Router construction for the BFF.

use axum::routing::{get, post};
use axum::{Router, middleware as axum_mw};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::session::session_cookies;
use crate::state::AppState;

/// Build the full axum router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let auth = Router::new()
        .route("/api/auth/send-otp", post(handlers::auth::send_otp))
        .route("/api/auth/verify-otp", post(handlers::auth::verify_otp))
        .route("/api/auth/logout", post(handlers::auth::logout))
        .route("/api/auth/status", get(handlers::auth::status))
        .route("/api/test-auth", get(handlers::auth::test_auth));

    let entities = Router::new()
        .route(
            "/api/entities",
            get(handlers::entities::list_entities).post(handlers::entities::create_entity),
        )
        .route("/api/entities/search", get(handlers::entities::search_entities))
        .route("/api/entities/:id", get(handlers::entities::get_entity))
        .route(
            "/api/entities/:id/owner-entities",
            get(handlers::entities::owner_entities),
        )
        .route(
            "/api/entities/:id/related",
            get(handlers::entities::related_entities),
        )
        .route("/api/entities/:id/stats", get(handlers::entities::entity_stats))
        .route("/api/my/entities", get(handlers::entities::my_entities))
        .route(
            "/api/my/entities/with-images",
            get(handlers::entities::my_entities_with_images),
        )
        .route("/api/categories", get(handlers::entities::categories))
        .route("/api/shared/:token", get(handlers::entities::shared_entity));

    let logs = Router::new()
        .route(
            "/api/interaction_logs",
            get(handlers::logs::interaction_logs).post(handlers::logs::log_interaction),
        )
        .route("/api/notifications/log", post(handlers::logs::log_notification))
        .route(
            "/api/notifications/history",
            get(handlers::logs::notification_history),
        )
        .route("/api/notify-owner", post(handlers::chat::notify_owner))
        .route("/api/request-attribute", post(handlers::chat::request_attribute));

    let pages = Router::new()
        .route("/notification-loader", get(handlers::loader::loader))
        .route("/notification-loader/close", get(handlers::loader::close));

    Router::new()
        .merge(auth)
        .merge(entities)
        .merge(logs)
        .merge(pages)
        .layer(axum_mw::from_fn_with_state(state.clone(), session_cookies))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
