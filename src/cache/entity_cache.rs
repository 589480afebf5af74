//! Entity cache with lazy resolution against the backend API
//!
//! The cache holds the last-known full snapshot of every entity seen on the
//! push channel. Resolution turns raw payloads into typed entities, fetching
//! from the backend only for reference stubs that are not already cached.

use crate::api::EntityFetcher;
use crate::error::{CollabStreamError, Result};
use crate::model::{Entity, EntityKind, raw_entity_id};
use dashmap::DashMap;
use futures::future::join_all;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Cache statistics for monitoring
#[derive(Debug, Default, Clone)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub stores: u64,
    pub fetches: u64,
    pub fetch_errors: u64,
}

pub struct EntityCache {
    /// Backend lookup for reference stubs
    fetcher: Arc<dyn EntityFetcher>,

    /// Last-known snapshot per (kind, id); writes are last-write-wins
    entries: DashMap<(EntityKind, String), Entity>,

    /// Cache statistics
    stats: Arc<RwLock<CacheStats>>,
}

impl EntityCache {
    pub fn new(fetcher: Arc<dyn EntityFetcher>) -> Self {
        Self {
            fetcher,
            entries: DashMap::new(),
            stats: Arc::new(RwLock::new(CacheStats::default())),
        }
    }

    /// Resolve a sequence of raw payloads into fully-populated entities.
    ///
    /// Sibling payloads resolve concurrently; output order matches input
    /// order. A payload that fails (malformed, not found, transport error) is
    /// logged and omitted without disturbing its siblings.
    pub async fn resolve(&self, kind: EntityKind, payloads: Vec<Value>) -> Vec<Entity> {
        let results = join_all(
            payloads
                .iter()
                .map(|payload| self.resolve_one(kind, payload)),
        )
        .await;

        results
            .into_iter()
            .filter_map(|result| match result {
                Ok(entity) => Some(entity),
                Err(e) => {
                    tracing::warn!(
                        kind = %kind,
                        error = %e,
                        "Entity resolution failed, omitting from result"
                    );
                    None
                }
            })
            .collect()
    }

    /// Resolve a single raw payload.
    ///
    /// A payload carrying every required field is stored directly. A
    /// reference stub is answered from the cache, or fetched on miss.
    async fn resolve_one(&self, kind: EntityKind, payload: &Value) -> Result<Entity> {
        if let Ok(entity) = Entity::deserialize_raw(kind, payload) {
            self.stats.write().await.stores += 1;
            self.store(entity.clone());
            return Ok(entity);
        }

        let id = raw_entity_id(payload)
            .ok_or_else(|| CollabStreamError::MalformedPayload {
                kind,
                reason: "payload carries no identifier".to_string(),
            })?
            .to_string();

        if let Some(entry) = self.entries.get(&(kind, id.clone())) {
            self.stats.write().await.hits += 1;
            tracing::trace!(kind = %kind, id = %id, "Entity cache hit");
            return Ok(entry.clone());
        }

        self.stats.write().await.misses += 1;
        tracing::debug!(kind = %kind, id = %id, "Entity cache miss, fetching from backend");
        self.fetch_one(kind, &id).await
    }

    async fn fetch_one(&self, kind: EntityKind, id: &str) -> Result<Entity> {
        self.stats.write().await.fetches += 1;

        let ids = [id.to_string()];
        let fetched = match self.fetcher.fetch_by_ids(kind, &ids).await {
            Ok(entities) => entities,
            Err(e) => {
                self.stats.write().await.fetch_errors += 1;
                return Err(e);
            }
        };

        match fetched.into_iter().find(|entity| entity.id() == id) {
            Some(entity) => {
                tracing::debug!(kind = %kind, id = %id, "Fetched and cached entity");
                self.store(entity.clone());
                Ok(entity)
            }
            None => {
                self.stats.write().await.fetch_errors += 1;
                Err(CollabStreamError::NotFound {
                    kind,
                    id: id.to_string(),
                })
            }
        }
    }

    /// Insert the latest snapshot, replacing any prior copy.
    fn store(&self, entity: Entity) {
        let key = (entity.kind(), entity.id().to_string());
        self.entries.insert(key, entity);
    }

    /// Last-known snapshot for (kind, id), if any.
    pub fn get(&self, kind: EntityKind, id: &str) -> Option<Entity> {
        self.entries
            .get(&(kind, id.to_string()))
            .map(|entry| entry.clone())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Get cache statistics
    pub async fn stats(&self) -> CacheStats {
        self.stats.read().await.clone()
    }

    /// Log cache statistics (for periodic monitoring)
    pub async fn log_stats(&self) {
        let stats = self.stats().await;

        let hit_rate = if stats.hits + stats.misses > 0 {
            (stats.hits as f32 / (stats.hits + stats.misses) as f32 * 100.0) as u32
        } else {
            0
        };

        tracing::info!(
            entities_cached = self.len(),
            hit_rate = hit_rate,
            stores = stats.stores,
            fetches = stats.fetches,
            fetch_errors = stats.fetch_errors,
            "Entity cache statistics"
        );
    }
}
