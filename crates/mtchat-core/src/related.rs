//! Pure pieces of the related-entities search: similarity scoring and merging.

use std::collections::HashSet;

use serde_json::Value;

use crate::entity::Entity;

/// Results requested from each search tier.
pub const TIER_LIMIT: u32 = 10;
/// Pool size fetched for attribute similarity.
pub const SIMILARITY_POOL_LIMIT: u32 = 20;
/// Below this many results the entity-type tier runs.
pub const TYPE_TIER_THRESHOLD: usize = 5;
/// Below this many results the attribute tier runs.
pub const SIMILARITY_TIER_THRESHOLD: usize = 3;
/// Best-scoring candidates kept from the attribute tier.
pub const SIMILARITY_TOP_N: usize = 5;
/// Upper bound on the merged result.
pub const MAX_RELATED: usize = 10;

/// Attribute value as comparable text, or `None` when it does not count.
///
/// Null, empty strings, `false` and zero are ignored, as is any nested value.
fn comparable(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.to_lowercase()),
        Value::Number(n) if n.as_f64() != Some(0.0) => Some(n.to_string()),
        Value::Bool(true) => Some("true".to_string()),
        _ => None,
    }
}

/// Counts source attributes whose value equals the candidate's value for the
/// same key, case-insensitively.
pub fn attribute_similarity(source: &Entity, candidate: &Entity) -> u32 {
    source
        .attributes
        .iter()
        .filter(|(key, value)| {
            let Some(wanted) = comparable(value) else {
                return false;
            };
            candidate
                .attributes
                .get(*key)
                .and_then(comparable)
                .is_some_and(|have| have == wanted)
        })
        .count() as u32
}

/// Scores `pool` against `source`, keeping the [`SIMILARITY_TOP_N`] best
/// candidates with a positive score.
///
/// Sorting is stable, so ties keep their pool order. The source entity is
/// never returned.
pub fn rank_by_similarity(source: &Entity, pool: Vec<Entity>) -> Vec<Entity> {
    let mut scored: Vec<Entity> = pool
        .into_iter()
        .filter(|candidate| candidate.id != source.id)
        .filter_map(|mut candidate| {
            let score = attribute_similarity(source, &candidate);
            (score > 0).then(|| {
                candidate.similarity_score = Some(score);
                candidate
            })
        })
        .collect();
    scored.sort_by(|a, b| b.similarity_score.cmp(&a.similarity_score));
    scored.truncate(SIMILARITY_TOP_N);
    scored
}

/// Appends entries of `incoming` whose ids are not yet in `current`, then
/// caps the result at `cap`.
pub fn merge_unique(mut current: Vec<Entity>, incoming: Vec<Entity>, cap: usize) -> Vec<Entity> {
    let mut seen: HashSet<String> = current.iter().map(|e| e.id.clone()).collect();
    for entity in incoming {
        if seen.insert(entity.id.clone()) {
            current.push(entity);
        }
    }
    current.truncate(cap);
    current
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entity(id: &str, attrs: Value) -> Entity {
        serde_json::from_value(json!({"id": id, "attributes": attrs})).unwrap()
    }

    #[test]
    fn test_similarity_is_case_insensitive_and_skips_nulls() {
        let source = entity("s", json!({"color": "Red", "size": null, "brand": ""}));
        let candidate = entity("c", json!({"color": "red", "size": null, "brand": ""}));
        assert_eq!(attribute_similarity(&source, &candidate), 1);
    }

    #[test]
    fn test_similarity_numbers() {
        let source = entity("s", json!({"year": 2020, "doors": 0}));
        let candidate = entity("c", json!({"year": 2020, "doors": 0}));
        assert_eq!(attribute_similarity(&source, &candidate), 1);
    }

    #[test]
    fn test_rank_keeps_top_five_stable() {
        let source = entity("s", json!({"a": "x", "b": "y"}));
        let mut pool = vec![entity("s", json!({"a": "x", "b": "y"}))];
        for i in 0..6 {
            pool.push(entity(&format!("one-{i}"), json!({"a": "x"})));
        }
        pool.push(entity("two", json!({"a": "X", "b": "Y"})));
        pool.push(entity("zero", json!({"a": "q"})));

        let ranked = rank_by_similarity(&source, pool);
        let ids: Vec<_> = ranked.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["two", "one-0", "one-1", "one-2", "one-3"]);
        assert_eq!(ranked[0].similarity_score, Some(2));
    }

    #[test]
    fn test_merge_unique_caps() {
        let current = vec![entity("a", json!({})), entity("b", json!({}))];
        let incoming = (0..12).map(|i| entity(&format!("n{i}"), json!({}))).chain([entity("a", json!({}))]).collect();
        let merged = merge_unique(current, incoming, MAX_RELATED);
        assert_eq!(merged.len(), 10);
        assert_eq!(merged.iter().filter(|e| e.id == "a").count(), 1);
    }
}
