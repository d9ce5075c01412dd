//! Entity listing, lookup and creation.

use std::collections::BTreeMap;
use std::sync::Arc;

use futures::future::join_all;
use mtchat_core::Result;
use mtchat_core::api::EntityApi;
use mtchat_core::entity::{
    Category, CreateEntityRequest, DynamicField, Entity, EntityImage, SearchParams,
    process_attributes,
};

/// Use cases over the caller's entities.
#[derive(Clone)]
pub struct EntityCatalog {
    api: Arc<dyn EntityApi>,
    tenant_id: String,
}

impl EntityCatalog {
    pub fn new(api: Arc<dyn EntityApi>, tenant_id: impl Into<String>) -> Self {
        Self {
            api,
            tenant_id: tenant_id.into(),
        }
    }

    async fn images_or_empty(&self, id: &str) -> Vec<EntityImage> {
        match self.api.entity_images(id).await {
            Ok(images) => images,
            Err(e) => {
                tracing::debug!("[Catalog] No images for {}: {}", id, e);
                Vec::new()
            }
        }
    }

    async fn attach_images(&self, mut entity: Entity) -> Entity {
        entity.images = self.images_or_empty(&entity.id).await;
        entity
    }

    /// The caller's entities with images resolved.
    ///
    /// Image lookups run concurrently; one failing lookup leaves that
    /// entity with no images.
    pub async fn list_with_images(&self) -> Result<Vec<Entity>> {
        let list = self.api.my_entities().await?;
        tracing::debug!("[Catalog] Resolving images for {} entities", list.entities.len());
        Ok(join_all(list.entities.into_iter().map(|e| self.attach_images(e))).await)
    }

    pub async fn get_with_images(&self, id: &str) -> Result<Entity> {
        let entity = self.api.get_entity(id).await?;
        Ok(self.attach_images(entity).await)
    }

    /// Validates and creates an entity.
    ///
    /// Dynamic `fields` are checked and converted from `inputs`; converted
    /// values are merged over `request.attributes`.
    pub async fn create(
        &self,
        request: CreateEntityRequest,
        fields: &[DynamicField],
        inputs: &BTreeMap<String, String>,
    ) -> Result<Entity> {
        let mut request = request.validate()?;
        request.attributes.extend(process_attributes(fields, inputs)?);
        if request.tenant_id.is_none() {
            request.tenant_id = Some(self.tenant_id.clone());
        }
        let entity = self.api.create_entity(&request).await?;
        tracing::info!("[Catalog] Created entity {}", entity.id);
        Ok(entity)
    }

    /// [`EntityCatalog::create`] with the fields of `category`.
    pub async fn create_in_category(
        &self,
        mut request: CreateEntityRequest,
        category: &Category,
        inputs: &BTreeMap<String, String>,
    ) -> Result<Entity> {
        if request.entity_type.trim().is_empty() {
            request.entity_type = category.name.clone();
        }
        let fields = DynamicField::for_category(category);
        self.create(request, &fields, inputs).await
    }

    pub async fn search(&self, params: &SearchParams) -> Result<Vec<Entity>> {
        Ok(self.api.search(params).await?.entities)
    }

    /// Active categories.
    pub async fn categories(&self) -> Result<Vec<Category>> {
        let list = self.api.categories().await?;
        Ok(list.categories.into_iter().filter(|c| c.active).collect())
    }

    /// Public lookup by share token, with images. Works without a session.
    pub async fn shared(&self, token: &str) -> Result<Entity> {
        let entity = self.api.shared_entity(token).await?;
        Ok(self.attach_images(entity).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockApi, entity};
    use serde_json::json;

    fn catalog(api: Arc<MockApi>) -> EntityCatalog {
        EntityCatalog::new(api, "default")
    }

    #[tokio::test]
    async fn test_image_failure_yields_empty_images() {
        let api = MockApi::new()
            .with_entity(entity(json!({"id": "a", "name": "A"})))
            .with_entity(entity(json!({"id": "b", "name": "B"})));
        api.images.lock().unwrap().insert(
            "a".into(),
            vec![EntityImage {
                id: Some("i1".into()),
                url: Some("https://img/1.png".into()),
                ..Default::default()
            }],
        );

        let entities = catalog(api.clone()).list_with_images().await.unwrap();
        assert_eq!(entities.len(), 2);
        assert_eq!(entities[0].images.len(), 1);
        assert!(entities[1].images.is_empty());
        assert_eq!(api.calls("entity_images"), 2);
    }

    #[tokio::test]
    async fn test_create_validates_before_network() {
        let api = MockApi::new();
        let request = CreateEntityRequest {
            name: "  ".into(),
            entity_type: "housing".into(),
            description: "nice".into(),
            ..Default::default()
        };
        let err = catalog(api.clone())
            .create(request, &[], &BTreeMap::new())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Validation error: Please fill in all required fields.");
        assert_eq!(api.calls("create_entity"), 0);
    }

    #[tokio::test]
    async fn test_create_in_category_converts_fields() {
        let api = MockApi::new();
        let mut category = Category {
            id: "c1".into(),
            name: "housing".into(),
            ..Default::default()
        };
        category
            .base_schema
            .insert("price".into(), json!({"type": "number", "required": true}));
        category.base_schema.insert("notes".into(), json!(""));

        let request = CreateEntityRequest {
            name: "Flat".into(),
            description: "Two rooms".into(),
            ..Default::default()
        };
        let missing = catalog(api.clone())
            .create_in_category(request.clone(), &category, &BTreeMap::new())
            .await
            .unwrap_err();
        assert!(missing.is_validation());

        let inputs = BTreeMap::from([("price".to_string(), "1200".to_string())]);
        catalog(api.clone())
            .create_in_category(request, &category, &inputs)
            .await
            .unwrap();

        let created = api.created();
        assert_eq!(created.len(), 1);
        assert_eq!(created[0].entity_type, "housing");
        assert_eq!(created[0].tenant_id.as_deref(), Some("default"));
        assert_eq!(created[0].attributes.get("price"), Some(&json!(1200.0)));
        assert!(!created[0].attributes.contains_key("notes"));
    }

    #[tokio::test]
    async fn test_shared_lookup_resolves_images() {
        let api = MockApi::new().with_entity(entity(json!({
            "id": "s1",
            "share_token": "tok",
        })));
        let shared = catalog(api.clone()).shared("tok").await.unwrap();
        assert_eq!(shared.id, "s1");
        assert!(catalog(api).shared("nope").await.unwrap_err().is_not_found());
    }
}
