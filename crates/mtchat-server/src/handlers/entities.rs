//! Entity handlers.
//!
//! List responses are always normalized to `{ "entities": [...] }`.

use std::collections::BTreeMap;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use mtchat_application::{EntityCatalog, RelatedEntitiesFinder, StatsService};
use mtchat_core::entity::{CreateEntityRequest, Entity, SearchParams};
use mtchat_core::stats::EntityStats;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::error::ApiError;
use crate::session::Session;
use crate::state::AppState;

/// Page size of owner and "my entities" lists.
const OWNER_LIST_LIMIT: u32 = 10;

fn entities(list: Vec<Entity>) -> Json<Value> {
    Json(json!({ "entities": list }))
}

fn catalog(state: &AppState, session: &Session) -> EntityCatalog {
    EntityCatalog::new(session.api.clone(), state.config().tenant_id.clone())
}

// ============================================================================
// Listing and creation
// ============================================================================

pub async fn list_entities(session: Session) -> Result<Json<Value>, ApiError> {
    session.require_token()?;
    let list = session.api.list_entities().await?;
    Ok(entities(list.entities))
}

/// `POST /api/entities` body: the entity plus optional category-driven fields.
#[derive(Debug, Deserialize)]
pub struct CreateEntityBody {
    #[serde(flatten)]
    pub request: CreateEntityRequest,
    #[serde(default, alias = "categoryId")]
    pub category_id: Option<String>,
    #[serde(default)]
    pub fields: BTreeMap<String, String>,
}

pub async fn create_entity(
    State(state): State<AppState>,
    session: Session,
    Json(body): Json<CreateEntityBody>,
) -> Result<(StatusCode, Json<Entity>), ApiError> {
    session.require_token()?;
    let catalog = catalog(&state, &session);
    let entity = match body.category_id.as_deref() {
        Some(category_id) => {
            let category = catalog
                .categories()
                .await?
                .into_iter()
                .find(|c| c.id == category_id)
                .ok_or_else(|| ApiError::BadRequest(format!("Unknown category: {category_id}")))?;
            catalog
                .create_in_category(body.request, &category, &body.fields)
                .await?
        }
        None => catalog.create(body.request, &[], &body.fields).await?,
    };
    Ok((StatusCode::CREATED, Json(entity)))
}

pub async fn search_entities(
    State(state): State<AppState>,
    session: Session,
    Query(params): Query<SearchParams>,
) -> Result<Json<Value>, ApiError> {
    let found = catalog(&state, &session).search(&params).await?;
    Ok(entities(found))
}

pub async fn categories(
    State(state): State<AppState>,
    session: Session,
) -> Result<Json<Value>, ApiError> {
    let list = catalog(&state, &session).categories().await?;
    Ok(Json(json!({ "categories": list })))
}

// ============================================================================
// One entity
// ============================================================================

pub async fn get_entity(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<String>,
) -> Result<Json<Entity>, ApiError> {
    session.require_token()?;
    let entity = catalog(&state, &session)
        .get_with_images(&id)
        .await
        .map_err(|e| ApiError::from(e).not_found_as("Entity not found"))?;
    Ok(Json(entity))
}

/// Other entities of the same owner. Lookup failures after the primary
/// fetch degrade to an empty list.
pub async fn owner_entities(
    session: Session,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let entity = session.api.get_entity(&id).await?;
    let Some(owner_id) = entity.owner_id.filter(|o| !o.is_empty()) else {
        return Ok(entities(Vec::new()));
    };

    let params = SearchParams {
        owner_id: Some(owner_id),
        exclude_id: Some(id.clone()),
        limit: Some(OWNER_LIST_LIMIT),
        ..SearchParams::default()
    };
    match session.api.search(&params).await {
        Ok(list) => Ok(entities(list.without(Some(&id)).entities)),
        Err(e) => {
            tracing::warn!("[Entities] Owner lookup for {} failed: {}", id, e);
            Ok(entities(Vec::new()))
        }
    }
}

pub async fn related_entities(
    session: Session,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let entity = session.api.get_entity(&id).await?;
    let related = RelatedEntitiesFinder::new(session.api.clone())
        .find(&entity)
        .await;
    Ok(entities(related))
}

pub async fn entity_stats(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<String>,
) -> Result<Json<EntityStats>, ApiError> {
    if !session.has_token() {
        return Err(ApiError::authentication_required());
    }
    let stats = StatsService::with_cache(session.api.clone(), state.stats_cache().clone());
    Ok(Json(stats.load(&id).await))
}

pub async fn shared_entity(
    State(state): State<AppState>,
    session: Session,
    Path(token): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let entity = catalog(&state, &session)
        .shared(&token)
        .await
        .map_err(|e| ApiError::from(e).not_found_as("Shared entity not found"))?;
    Ok(Json(json!({ "entity": entity })))
}

// ============================================================================
// The caller's own entities
// ============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct MyEntitiesQuery {
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default, alias = "excludeId")]
    pub exclude_id: Option<String>,
}

pub async fn my_entities(
    session: Session,
    Query(query): Query<MyEntitiesQuery>,
) -> Result<Json<Value>, ApiError> {
    if !session.has_token() {
        return Err(ApiError::authentication_required());
    }
    let limit = query.limit.unwrap_or(OWNER_LIST_LIMIT as usize);
    let mut list = session
        .api
        .my_entities()
        .await?
        .without(query.exclude_id.as_deref());
    list.entities.truncate(limit);
    Ok(entities(list.entities))
}

pub async fn my_entities_with_images(
    State(state): State<AppState>,
    session: Session,
) -> Result<Json<Value>, ApiError> {
    if !session.has_token() {
        return Err(ApiError::authentication_required());
    }
    let list = catalog(&state, &session).list_with_images().await?;
    Ok(entities(list))
}
