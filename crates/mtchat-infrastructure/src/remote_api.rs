//! `EntityApi` over the Remote API Gateway.

use async_trait::async_trait;
use mtchat_core::Result;
use mtchat_core::api::{
    ChatRequestNotice, CurrentUser, EmailMessage, EntityApi, EventLog, HistoryQuery,
    SendOtpRequest, VerifyOtpRequest, VerifyOtpResponse,
};
use mtchat_core::auth::OtpCode;
use mtchat_core::entity::{
    CategoryList, CreateEntityRequest, Entity, EntityImage, EntityList, SearchParams,
    images_from_value,
};
use mtchat_core::stats::{InteractionLogEntry, parse_log_feed};
use serde_json::Value;
use url::form_urlencoded;

use crate::gateway::ApiGateway;

/// Percent-encodes one path segment.
fn segment(value: &str) -> String {
    form_urlencoded::byte_serialize(value.as_bytes()).collect()
}

/// The remote entity API, reached through an [`ApiGateway`].
#[derive(Clone)]
pub struct RemoteEntityApi {
    gateway: ApiGateway,
    tenant_id: String,
}

impl RemoteEntityApi {
    pub fn new(gateway: ApiGateway, tenant_id: impl Into<String>) -> Self {
        Self {
            gateway,
            tenant_id: tenant_id.into(),
        }
    }

    pub fn gateway(&self) -> &ApiGateway {
        &self.gateway
    }
}

#[async_trait]
impl EntityApi for RemoteEntityApi {
    async fn send_otp(&self, email: &str) -> Result<Value> {
        let body = SendOtpRequest {
            email: email.to_string(),
            tenant_id: self.tenant_id.clone(),
        };
        self.gateway.post("/api/auth/send-otp", &body).await
    }

    async fn verify_otp(&self, email: &str, otp: &OtpCode) -> Result<VerifyOtpResponse> {
        let body = VerifyOtpRequest {
            email: email.to_string(),
            otp: otp.as_str().to_string(),
            tenant_id: self.tenant_id.clone(),
        };
        let value = self.gateway.post("/api/auth/verify-otp", &body).await?;
        Ok(serde_json::from_value(value)?)
    }

    async fn current_user(&self) -> Result<CurrentUser> {
        let value = self.gateway.get("/api/auth/me", vec![]).await?;
        CurrentUser::from_response(value)
    }

    async fn my_entities(&self) -> Result<EntityList> {
        let value = self.gateway.get("/api/my/entities", vec![]).await?;
        Ok(EntityList::from_value(value))
    }

    async fn list_entities(&self) -> Result<EntityList> {
        let value = self.gateway.get("/api/entities", vec![]).await?;
        Ok(EntityList::from_value(value))
    }

    async fn get_entity(&self, id: &str) -> Result<Entity> {
        let value = self
            .gateway
            .get(&format!("/api/entities/{}", segment(id)), vec![])
            .await?;
        Entity::from_response(value)
    }

    async fn entity_images(&self, id: &str) -> Result<Vec<EntityImage>> {
        let value = self
            .gateway
            .get(&format!("/api/entities/{}/images", segment(id)), vec![])
            .await?;
        Ok(images_from_value(value))
    }

    async fn search(&self, params: &SearchParams) -> Result<EntityList> {
        let value = self
            .gateway
            .get("/api/entities/search", params.to_query_pairs())
            .await?;
        Ok(EntityList::from_value(value))
    }

    async fn create_entity(&self, request: &CreateEntityRequest) -> Result<Entity> {
        let mut request = request.clone();
        if request.tenant_id.is_none() {
            request.tenant_id = Some(self.tenant_id.clone());
        }
        let value = self.gateway.post("/api/entities", &request).await?;
        Entity::from_response(value)
    }

    async fn categories(&self) -> Result<CategoryList> {
        let value = self.gateway.get("/api/categories", vec![]).await?;
        Ok(serde_json::from_value(value)?)
    }

    async fn interaction_logs(
        &self,
        entity_id: Option<&str>,
        limit: u32,
    ) -> Result<Vec<InteractionLogEntry>> {
        let mut query = vec![("limit".to_string(), limit.to_string())];
        if let Some(id) = entity_id {
            query.push(("entity_id".to_string(), id.to_string()));
        }
        let value = self.gateway.get("/api/interaction_logs", query).await?;
        Ok(parse_log_feed(value))
    }

    async fn log_interaction(&self, event: &EventLog) -> Result<Value> {
        self.gateway.post("/api/interaction_logs", event).await
    }

    async fn notify_chat_request(&self, notice: &ChatRequestNotice) -> Result<Value> {
        self.gateway
            .post("/api/notifications/chat-request", notice)
            .await
    }

    async fn send_notification(&self, event: &EventLog) -> Result<Value> {
        self.gateway.post("/api/notifications/send", event).await
    }

    async fn notification_history(&self, query: &HistoryQuery) -> Result<Value> {
        self.gateway
            .get("/api/notifications/history", query.to_query_pairs())
            .await
    }

    async fn shared_entity(&self, token: &str) -> Result<Entity> {
        let value = self
            .gateway
            .get(&format!("/api/shared/{}", segment(token)), vec![])
            .await?;
        Entity::from_response(value)
    }

    async fn send_email(&self, email: &EmailMessage) -> Result<Value> {
        self.gateway.post("/api/test/send-email", email).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::test_support::{gateway, serve};
    use axum::Json;
    use axum::extract::{Path, Query};
    use axum::routing::{get, post};
    use mtchat_core::session::TokenStore;
    use serde_json::json;
    use std::collections::HashMap;

    fn upstream() -> axum::Router {
        axum::Router::new()
            .route(
                "/api/auth/verify-otp",
                post(|Json(body): Json<Value>| async move {
                    assert_eq!(body["tenantId"], "default");
                    Json(json!({"success": true, "token": format!("tok-{}", body["otp"].as_str().unwrap_or(""))}))
                }),
            )
            .route(
                "/api/entities/:id",
                get(|Path(id): Path<String>| async move {
                    Json(json!({"entity": {"id": id, "name": "Bike", "attributes": {"color": null}}}))
                }),
            )
            .route(
                "/api/entities/search",
                get(|Query(q): Query<HashMap<String, String>>| async move {
                    Json(json!({"entities": [{"id": format!("by-{}", q.get("owner_id").cloned().unwrap_or_default())}]}))
                }),
            )
            .route(
                "/api/interaction_logs",
                get(|Query(q): Query<HashMap<String, String>>| async move {
                    assert_eq!(q.get("limit").map(String::as_str), Some("100"));
                    Json(json!({"logs": [{"eventType": "entity_view", "timestamp": "2024-01-01T00:00:00Z"}]}))
                }),
            )
            .route(
                "/api/auth/me",
                get(|| async { Json(json!({"user": {"id": "u1", "email": "me@x.io"}})) }),
            )
    }

    #[tokio::test]
    async fn test_verify_otp_sends_tenant() {
        let base = serve(upstream()).await;
        let (gw, _, _) = gateway(&base, None);
        let api = RemoteEntityApi::new(gw, "default");
        let resp = api
            .verify_otp("a@b.io", &OtpCode::parse("123456").unwrap())
            .await
            .unwrap();
        assert_eq!(resp.into_token().unwrap(), "tok-123456");
    }

    #[tokio::test]
    async fn test_get_entity_unwraps() {
        let base = serve(upstream()).await;
        let (gw, _, _) = gateway(&base, Some("t"));
        let api = RemoteEntityApi::new(gw, "default");
        let entity = api.get_entity("e1").await.unwrap();
        assert_eq!(entity.id, "e1");
        assert_eq!(entity.requestable_attributes(), vec!["color"]);
    }

    #[tokio::test]
    async fn test_search_passes_query() {
        let base = serve(upstream()).await;
        let (gw, _, _) = gateway(&base, Some("t"));
        let api = RemoteEntityApi::new(gw, "default");
        let list = api
            .search(&SearchParams::new().owner_id("o9").limit(10))
            .await
            .unwrap();
        assert_eq!(list.entities[0].id, "by-o9");
    }

    #[tokio::test]
    async fn test_interaction_logs_and_me() {
        let base = serve(upstream()).await;
        let (gw, tokens, _) = gateway(&base, Some("t"));
        let api = RemoteEntityApi::new(gw, "default");
        let logs = api.interaction_logs(Some("e1"), 100).await.unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(api.current_user().await.unwrap().id, "u1");
        assert!(tokens.has_token());
    }
}
