//! Entity records as returned by the remote API.
//!
//! The API is loose about shapes: search results omit `name` and carry it in
//! `attributes`, some endpoints wrap single records as `{ "entity": ... }` and
//! lists arrive as `{ "entities": [...] }`, `{ "data": [...] }` or a bare
//! array. Everything here is lenient on input and normalized on output.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::{MtchatError, Result};

/// Treats an explicit `null` like a missing key.
fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Category reference embedded in search results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct CategoryRef {
    pub id: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// An image attached to an entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct EntityImage {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
    /// Variant URLs (thumbnail, small, ...) when the API supplies them.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub urls: Option<Value>,
}

/// A remote entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Entity {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub disabled: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub public_shareable: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub attributes: BTreeMap<String, Value>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub images: Vec<EntityImage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub share_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mtcli_entity_categories: Option<CategoryRef>,
    /// Set only on results of the attribute-similarity tier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub similarity_score: Option<u32>,
}

impl Entity {
    /// Human-readable title: display name, name, `attributes.name`, then id.
    pub fn title(&self) -> String {
        self.display_name
            .as_deref()
            .or(self.name.as_deref())
            .or_else(|| self.attributes.get("name").and_then(Value::as_str))
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(&self.id)
            .to_string()
    }

    /// Id of the category this entity belongs to, if the API embedded one.
    pub fn category_id(&self) -> Option<&str> {
        self.mtcli_entity_categories
            .as_ref()
            .map(|c| c.id.as_str())
            .filter(|id| !id.is_empty())
    }

    /// Attribute keys whose value is explicitly `null`.
    ///
    /// Only these get a "request info" affordance; attributes that carry a
    /// value never do.
    pub fn requestable_attributes(&self) -> Vec<&str> {
        self.attributes
            .iter()
            .filter(|(_, v)| v.is_null())
            .map(|(k, _)| k.as_str())
            .collect()
    }

    /// Parses a single-entity response: `{ "entity": {...} }` or a bare object.
    pub fn from_response(value: Value) -> Result<Self> {
        let inner = match value {
            Value::Object(mut map) if map.contains_key("entity") => {
                map.remove("entity").unwrap_or(Value::Null)
            }
            other => other,
        };
        if !inner.is_object() {
            return Err(MtchatError::not_found("entity", "<response>"));
        }
        Ok(serde_json::from_value(inner)?)
    }
}

/// Normalized `{ "entities": [...] }` list shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct EntityList {
    pub entities: Vec<Entity>,
}

impl EntityList {
    /// Accepts `{entities}`, `{data}`, `{results}` or a bare array.
    ///
    /// Entries that do not deserialize are skipped rather than failing the
    /// whole list.
    pub fn from_value(value: Value) -> Self {
        let items = match value {
            Value::Array(items) => items,
            Value::Object(mut map) => ["entities", "data", "results"]
                .iter()
                .find_map(|key| match map.remove(*key) {
                    Some(Value::Array(items)) => Some(items),
                    _ => None,
                })
                .unwrap_or_default(),
            _ => Vec::new(),
        };
        let entities = items
            .into_iter()
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect();
        Self { entities }
    }

    /// Drops the entity with `id`, if present.
    pub fn without(mut self, id: Option<&str>) -> Self {
        if let Some(id) = id {
            self.entities.retain(|e| e.id != id);
        }
        self
    }
}

/// Parses an images response: `{ "images": [...] }` or a bare array.
pub fn images_from_value(value: Value) -> Vec<EntityImage> {
    let items = match value {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("images") {
            Some(Value::Array(items)) => items,
            _ => Vec::new(),
        },
        _ => Vec::new(),
    };
    items
        .into_iter()
        .filter_map(|item| serde_json::from_value(item).ok())
        .collect()
}

/// Entity category, driving the creation form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Category {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// Attribute keys this category expects. Values are either placeholders
    /// or `{ "type": "...", "required": bool }` descriptors.
    #[serde(default, deserialize_with = "null_as_default")]
    pub base_schema: BTreeMap<String, Value>,
    /// Explicit key -> field type mapping; overrides `base_schema` descriptors.
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "BTreeMap::is_empty"
    )]
    pub field_types: BTreeMap<String, String>,
    #[serde(default = "default_true")]
    pub active: bool,
}

fn default_true() -> bool {
    true
}

/// `{ "categories": [...] }` response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct CategoryList {
    #[serde(default)]
    pub categories: Vec<Category>,
    #[serde(default)]
    pub total: Option<u64>,
}

/// Payload for `POST /api/entities`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub struct CreateEntityRequest {
    pub name: String,
    pub entity_type: String,
    pub description: String,
    #[serde(default)]
    pub attributes: BTreeMap<String, Value>,
    #[serde(default)]
    pub public_shareable: bool,
    #[serde(rename = "tenantId", default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,
}

impl CreateEntityRequest {
    /// Trims the text fields and rejects empty name, category or description.
    pub fn validate(mut self) -> Result<Self> {
        self.name = self.name.trim().to_string();
        self.entity_type = self.entity_type.trim().to_string();
        self.description = self.description.trim().to_string();
        if self.name.is_empty() || self.entity_type.is_empty() || self.description.is_empty() {
            return Err(MtchatError::validation(
                "Please fill in all required fields.",
            ));
        }
        Ok(self)
    }
}

/// A search filter value: exact match or numeric range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SearchFilter {
    Range {
        #[serde(default)]
        min: Option<f64>,
        #[serde(default)]
        max: Option<f64>,
    },
    Exact(Value),
}

/// Query for `GET /api/entities/search`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub category_id: Option<String>,
    #[serde(default)]
    pub entity_type: Option<String>,
    #[serde(default)]
    pub owner_id: Option<String>,
    #[serde(default)]
    pub exclude_id: Option<String>,
    #[serde(default)]
    pub q: Option<String>,
    #[serde(default)]
    pub sort_by: Option<String>,
    #[serde(default)]
    pub sort_order: Option<String>,
    #[serde(default)]
    pub include_images: bool,
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub limit: Option<u32>,
    #[serde(default)]
    pub filters: BTreeMap<String, SearchFilter>,
}

impl SearchParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn category_id(mut self, id: impl Into<String>) -> Self {
        self.category_id = Some(id.into());
        self
    }

    pub fn entity_type(mut self, entity_type: impl Into<String>) -> Self {
        self.entity_type = Some(entity_type.into());
        self
    }

    pub fn owner_id(mut self, owner: impl Into<String>) -> Self {
        self.owner_id = Some(owner.into());
        self
    }

    pub fn exclude_id(mut self, id: impl Into<String>) -> Self {
        self.exclude_id = Some(id.into());
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Flattens the query into `(key, value)` pairs.
    ///
    /// Range filters become `key[min]` / `key[max]`.
    pub fn to_query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::new();
        let mut push = |key: &str, value: &Option<String>| {
            if let Some(v) = value.as_deref().filter(|v| !v.is_empty()) {
                pairs.push((key.to_string(), v.to_string()));
            }
        };
        push("category", &self.category);
        push("category_id", &self.category_id);
        push("entity_type", &self.entity_type);
        push("owner_id", &self.owner_id);
        push("exclude_id", &self.exclude_id);
        push("q", &self.q);
        push("sort_by", &self.sort_by);
        push("sort_order", &self.sort_order);
        if self.include_images {
            pairs.push(("include_images".into(), "true".into()));
        }
        if let Some(page) = self.page {
            pairs.push(("page".into(), page.to_string()));
        }
        if let Some(limit) = self.limit {
            pairs.push(("limit".into(), limit.to_string()));
        }
        for (key, filter) in &self.filters {
            match filter {
                SearchFilter::Range { min, max } => {
                    if let Some(min) = min {
                        pairs.push((format!("{key}[min]"), min.to_string()));
                    }
                    if let Some(max) = max {
                        pairs.push((format!("{key}[max]"), max.to_string()));
                    }
                }
                SearchFilter::Exact(value) => {
                    let text = match value {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    };
                    pairs.push((key.clone(), text));
                }
            }
        }
        pairs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_requestable_attributes_only_null() {
        let entity: Entity = serde_json::from_value(json!({
            "id": "e1",
            "attributes": {"color": null, "size": "M"}
        }))
        .unwrap();
        assert_eq!(entity.requestable_attributes(), vec!["color"]);
    }

    #[test]
    fn test_title_fallbacks() {
        let entity: Entity =
            serde_json::from_value(json!({"id": "e1", "attributes": {"name": "Bike"}})).unwrap();
        assert_eq!(entity.title(), "Bike");
        let bare = Entity {
            id: "e2".into(),
            ..Default::default()
        };
        assert_eq!(bare.title(), "e2");
    }

    #[test]
    fn test_from_response_wrapped_and_bare() {
        let wrapped = Entity::from_response(json!({"entity": {"id": "a", "name": "A"}})).unwrap();
        assert_eq!(wrapped.id, "a");
        let bare = Entity::from_response(json!({"id": "b"})).unwrap();
        assert_eq!(bare.id, "b");
        assert!(Entity::from_response(json!(null)).is_err());
    }

    #[test]
    fn test_entity_list_shapes() {
        assert_eq!(
            EntityList::from_value(json!({"entities": [{"id": "1"}]})).entities.len(),
            1
        );
        assert_eq!(EntityList::from_value(json!([{"id": "1"}, {"id": "2"}])).entities.len(), 2);
        assert_eq!(EntityList::from_value(json!({"data": [{"id": "1"}]})).entities.len(), 1);
        assert!(EntityList::from_value(json!({"message": "nope"})).entities.is_empty());
    }

    #[test]
    fn test_null_collections_and_flags_use_defaults() {
        let entity = Entity::from_response(json!({
            "id": "x",
            "disabled": null,
            "public_shareable": null,
            "images": null
        }))
        .unwrap();
        assert!(!entity.disabled);
        assert!(entity.images.is_empty());

        let wrapped =
            Entity::from_response(json!({"entity": {"id": "y", "attributes": null}})).unwrap();
        assert!(wrapped.attributes.is_empty());

        let list = EntityList::from_value(json!([
            {"id": "a"},
            {"id": "b", "attributes": null},
            {"id": "c", "disabled": null}
        ]));
        let ids: Vec<&str> = list.entities.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_entity_list_without() {
        let list = EntityList::from_value(json!([{"id": "1"}, {"id": "2"}])).without(Some("1"));
        assert_eq!(list.entities.len(), 1);
        assert_eq!(list.entities[0].id, "2");
    }

    #[test]
    fn test_create_request_validation() {
        let req = CreateEntityRequest {
            name: "  Bike ".into(),
            entity_type: "vehicle".into(),
            description: " red ".into(),
            ..Default::default()
        };
        let req = req.validate().unwrap();
        assert_eq!(req.name, "Bike");
        assert_eq!(req.description, "red");

        let missing = CreateEntityRequest {
            name: "Bike".into(),
            entity_type: " ".into(),
            description: "x".into(),
            ..Default::default()
        };
        assert!(missing.validate().unwrap_err().is_validation());
    }

    #[test]
    fn test_search_query_pairs() {
        let mut params = SearchParams::new().category_id("c1").exclude_id("e1").limit(10);
        params.filters.insert(
            "price".into(),
            SearchFilter::Range {
                min: Some(100.0),
                max: None,
            },
        );
        params
            .filters
            .insert("color".into(), SearchFilter::Exact(json!("red")));
        let pairs = params.to_query_pairs();
        assert!(pairs.contains(&("category_id".into(), "c1".into())));
        assert!(pairs.contains(&("exclude_id".into(), "e1".into())));
        assert!(pairs.contains(&("limit".into(), "10".into())));
        assert!(pairs.contains(&("price[min]".into(), "100".into())));
        assert!(pairs.contains(&("color".into(), "red".into())));
        assert!(!pairs.iter().any(|(k, _)| k == "price[max]"));
    }

    #[test]
    fn test_images_from_value() {
        let images = images_from_value(json!({"images": [{"id": "i1", "url": "http://x/1.png"}]}));
        assert_eq!(images.len(), 1);
        assert!(images_from_value(json!({"error": "x"})).is_empty());
    }
}
