use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::client::LimsClient;
use crate::error::Result;
use crate::types::{strip_state, Entity};

// ─── EntityCache ──────────────────────────────────────────────────────────

/// Read-through memo of fetched entities, keyed by state-stripped uri.
///
/// Entities are immutable snapshots, so caching them is always safe; the
/// cache exists so that concurrent backward walks over a shared history
/// fetch each process and artifact at most once per call. Scope a cache to
/// one logical operation — it never invalidates.
///
/// A poisoned lock degrades to a refetch rather than failing the call.
#[derive(Default)]
pub struct EntityCache {
    entries: Mutex<HashMap<String, Arc<Entity>>>,
}

impl EntityCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached entity at `uri`, fetching through `client` on a
    /// miss. Two concurrent misses for the same uri may both fetch; the
    /// first stored snapshot wins and both calls observe equal data.
    pub async fn fetch<C: LimsClient + ?Sized>(&self, client: &C, uri: &str) -> Result<Arc<Entity>> {
        let key = strip_state(uri);
        if let Some(hit) = self.lookup(&key) {
            return Ok(hit);
        }
        let entity = Arc::new(client.fetch(uri).await?);
        Ok(self.store(key, entity))
    }

    /// Seed the cache with an entity the caller already holds.
    pub fn prime(&self, entity: Entity) {
        let key = strip_state(entity.uri());
        self.store(key, Arc::new(entity));
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lookup(&self, key: &str) -> Option<Arc<Entity>> {
        self.entries.lock().ok().and_then(|m| m.get(key).cloned())
    }

    fn store(&self, key: String, entity: Arc<Entity>) -> Arc<Entity> {
        match self.entries.lock() {
            Ok(mut map) => map.entry(key).or_insert(entity).clone(),
            Err(_) => entity,
        }
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────
