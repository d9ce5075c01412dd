//! Three-tier related-entities search.

use std::sync::Arc;

use mtchat_core::api::EntityApi;
use mtchat_core::entity::{Entity, SearchParams};
use mtchat_core::related::{
    MAX_RELATED, SIMILARITY_POOL_LIMIT, SIMILARITY_TIER_THRESHOLD, TIER_LIMIT,
    TYPE_TIER_THRESHOLD, merge_unique, rank_by_similarity,
};

/// Finds entities related to a source entity.
///
/// Tiers run in order and stop once enough results were found:
/// same category, then same entity type, then attribute similarity over a
/// wider pool. A failed tier contributes nothing; later tiers still run.
#[derive(Clone)]
pub struct RelatedEntitiesFinder {
    api: Arc<dyn EntityApi>,
}

impl RelatedEntitiesFinder {
    pub fn new(api: Arc<dyn EntityApi>) -> Self {
        Self { api }
    }

    async fn tier(&self, name: &str, params: SearchParams) -> Vec<Entity> {
        match self.api.search(&params).await {
            Ok(list) => list.entities,
            Err(e) => {
                tracing::warn!("[RelatedEntities] {} tier failed: {}", name, e);
                Vec::new()
            }
        }
    }

    pub async fn find(&self, source: &Entity) -> Vec<Entity> {
        let mut related = Vec::new();

        if let Some(category_id) = source.category_id() {
            let found = self
                .tier(
                    "category",
                    SearchParams::new()
                        .category_id(category_id)
                        .exclude_id(&source.id)
                        .limit(TIER_LIMIT),
                )
                .await;
            related = merge_unique(related, found, MAX_RELATED);
        }

        if related.len() < TYPE_TIER_THRESHOLD {
            if let Some(entity_type) = source.entity_type.as_deref().filter(|t| !t.is_empty()) {
                let found = self
                    .tier(
                        "entity type",
                        SearchParams::new()
                            .entity_type(entity_type)
                            .exclude_id(&source.id)
                            .limit(TIER_LIMIT),
                    )
                    .await;
                related = merge_unique(related, found, MAX_RELATED);
            }
        }

        if related.len() < SIMILARITY_TIER_THRESHOLD && !source.attributes.is_empty() {
            let pool = self
                .tier(
                    "similarity",
                    SearchParams::new()
                        .exclude_id(&source.id)
                        .limit(SIMILARITY_POOL_LIMIT),
                )
                .await;
            related = merge_unique(related, rank_by_similarity(source, pool), MAX_RELATED);
        }

        tracing::debug!("[RelatedEntities] {} related to {}", related.len(), source.id);
        related
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockApi, entity, list};
    use mtchat_core::MtchatError;
    use serde_json::json;

    fn batch(prefix: &str, n: usize) -> Vec<Entity> {
        (0..n)
            .map(|i| entity(json!({"id": format!("{prefix}{i}")})))
            .collect()
    }

    #[tokio::test]
    async fn test_full_category_tier_makes_one_call() {
        let api = MockApi::new();
        api.on_search(|_| Ok(list(batch("c", 10))));
        let source = entity(json!({
            "id": "x",
            "mtcli_entity_categories": {"id": "cat"},
            "entity_type": "housing",
            "attributes": {"city": "Oslo"},
        }));

        let related = RelatedEntitiesFinder::new(api.clone()).find(&source).await;
        assert_eq!(related.len(), 10);
        assert_eq!(api.calls("search"), 1);
        let params = &api.searches()[0];
        assert_eq!(params.category_id.as_deref(), Some("cat"));
        assert_eq!(params.exclude_id.as_deref(), Some("x"));
        assert_eq!(params.limit, Some(10));
    }

    #[tokio::test]
    async fn test_falls_through_to_similarity() {
        let api = MockApi::new();
        api.on_search(|params| {
            if params.category_id.is_some() {
                Err(MtchatError::network("down"))
            } else if params.entity_type.is_some() {
                Ok(list(vec![entity(json!({"id": "t1"}))]))
            } else {
                Ok(list(vec![
                    entity(json!({"id": "x", "attributes": {"city": "oslo"}})),
                    entity(json!({"id": "t1", "attributes": {"city": "OSLO"}})),
                    entity(json!({"id": "p1", "attributes": {"city": "Bergen"}})),
                    entity(json!({"id": "p2", "attributes": {"city": "oslo", "rooms": 2}})),
                    entity(json!({"id": "p3", "attributes": {"city": "Oslo"}})),
                ]))
            }
        });
        let source = entity(json!({
            "id": "x",
            "mtcli_entity_categories": {"id": "cat"},
            "entity_type": "housing",
            "attributes": {"city": "Oslo", "rooms": 2},
        }));

        let related = RelatedEntitiesFinder::new(api.clone()).find(&source).await;
        let ids: Vec<&str> = related.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, ["t1", "p2", "p3"]);
        assert_eq!(api.calls("search"), 3);
        assert_eq!(related[1].similarity_score, Some(2));
    }

    #[tokio::test]
    async fn test_no_attributes_skips_similarity_tier() {
        let api = MockApi::new();
        let source = entity(json!({"id": "x", "entity_type": "housing"}));
        assert!(RelatedEntitiesFinder::new(api.clone()).find(&source).await.is_empty());
        assert_eq!(api.calls("search"), 1);
    }
}
