use crate::error::Result;
use crate::model::{Entity, EntityKind};
use async_trait::async_trait;

/// Backend lookup capability used to resolve reference stubs.
///
/// Implementations fetch the current snapshot of each entity. Retry and
/// backoff belong to the implementation, never to callers.
#[async_trait]
pub trait EntityFetcher: Send + Sync {
    /// Fetch full entities for the given ids.
    ///
    /// Ids missing from the backend are simply absent from the result; the
    /// caller decides whether that is an error.
    async fn fetch_by_ids(&self, kind: EntityKind, ids: &[String]) -> Result<Vec<Entity>>;
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::error::CollabStreamError;
    use std::collections::{HashMap, HashSet};
    use std::sync::Mutex;

    /// In-memory fetcher for cache and dispatcher tests.
    #[derive(Default)]
    pub struct MockFetcher {
        entities: Mutex<HashMap<(EntityKind, String), Entity>>,
        failing_ids: Mutex<HashSet<String>>,
        calls: Mutex<Vec<(EntityKind, Vec<String>)>>,
    }

    impl MockFetcher {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn insert(&self, entity: Entity) {
            let key = (entity.kind(), entity.id().to_string());
            self.entities.lock().unwrap().insert(key, entity);
        }

        /// Make every fetch touching this id fail with a transport error.
        pub fn fail_id(&self, id: impl Into<String>) {
            self.failing_ids.lock().unwrap().insert(id.into());
        }

        pub fn calls(&self) -> Vec<(EntityKind, Vec<String>)> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl EntityFetcher for MockFetcher {
        async fn fetch_by_ids(&self, kind: EntityKind, ids: &[String]) -> Result<Vec<Entity>> {
            self.calls.lock().unwrap().push((kind, ids.to_vec()));

            let failing = self.failing_ids.lock().unwrap();
            if let Some(id) = ids.iter().find(|id| failing.contains(*id)) {
                return Err(CollabStreamError::Transport(format!(
                    "simulated failure fetching {id}"
                )));
            }

            let entities = self.entities.lock().unwrap();
            Ok(ids
                .iter()
                .filter_map(|id| entities.get(&(kind, id.clone())).cloned())
                .collect())
        }
    }
}
