//! Entity statistics with a cached / placeholder fallback.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use mtchat_core::api::{EntityApi, INTERACTION_LOG_LIMIT};
use mtchat_core::stats::{EntityStats, StatsSource};
use tokio::sync::RwLock;

/// Last live statistics per entity id.
///
/// Cloning shares the map, so one cache can outlive the per-request
/// services built around it.
#[derive(Clone, Default)]
pub struct StatsCache(Arc<RwLock<HashMap<String, EntityStats>>>);

impl StatsCache {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Loads statistics for an entity.
///
/// Live values are cached per entity. When the log feed fails, the cached
/// value is served tagged `cached`; without one, randomized placeholders
/// tagged `fallback` are returned.
#[derive(Clone)]
pub struct StatsService {
    api: Arc<dyn EntityApi>,
    cache: StatsCache,
}

impl StatsService {
    pub fn new(api: Arc<dyn EntityApi>) -> Self {
        Self::with_cache(api, StatsCache::new())
    }

    pub fn with_cache(api: Arc<dyn EntityApi>, cache: StatsCache) -> Self {
        Self { api, cache }
    }

    pub async fn load(&self, entity_id: &str) -> EntityStats {
        match self
            .api
            .interaction_logs(Some(entity_id), INTERACTION_LOG_LIMIT)
            .await
        {
            Ok(logs) => {
                let stats = EntityStats::from_logs(&logs, Utc::now());
                self.cache
                    .0
                    .write()
                    .await
                    .insert(entity_id.to_string(), stats.clone());
                stats
            }
            Err(e) => {
                tracing::warn!("[Stats] Log feed failed for {}: {}", entity_id, e);
                if let Some(cached) = self.cache.0.read().await.get(entity_id) {
                    return cached.clone().with_source(StatsSource::Cached);
                }
                EntityStats::placeholder(&mut rand::thread_rng(), Utc::now())
            }
        }
    }

    /// Forgets every cached value, e.g. when the viewer signs out.
    pub async fn clear(&self) {
        self.cache.0.write().await.clear();
    }
}
