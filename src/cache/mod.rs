//! Entity cache: last-known snapshots keyed by (kind, id), lazily populated
//! from the backend API.

mod entity_cache;

pub use entity_cache::{CacheStats, EntityCache};
