//! Keyed persistence for saved maps.

use async_trait::async_trait;
use indexmap::IndexMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::SavedMap;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("map {0} already exists")]
    Conflict(Uuid),

    #[error("storage backend failed: {0}")]
    Backend(String),
}

/// Create/get/list/delete over saved maps. Ownership is not checked here;
/// see [`super::MapService`].
#[async_trait]
pub trait MapStore: Send + Sync {
    async fn create(&self, map: SavedMap) -> Result<(), StoreError>;

    async fn get(&self, id: Uuid) -> Result<Option<SavedMap>, StoreError>;

    /// Maps owned by `session_id`, newest first.
    async fn list_by_owner(&self, session_id: &str) -> Result<Vec<SavedMap>, StoreError>;

    /// Returns `false` when nothing was stored under `id`.
    async fn delete(&self, id: Uuid) -> Result<bool, StoreError>;
}

/// Process-local store. Contents are lost on restart.
#[derive(Default)]
pub struct MemoryMapStore {
    maps: RwLock<IndexMap<Uuid, SavedMap>>,
}

impl MemoryMapStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MapStore for MemoryMapStore {
    async fn create(&self, map: SavedMap) -> Result<(), StoreError> {
        let mut maps = self.maps.write().await;
        if maps.contains_key(&map.id) {
            return Err(StoreError::Conflict(map.id));
        }
        maps.insert(map.id, map);
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<SavedMap>, StoreError> {
        Ok(self.maps.read().await.get(&id).cloned())
    }

    async fn list_by_owner(&self, session_id: &str) -> Result<Vec<SavedMap>, StoreError> {
        // Reverse insertion order first so equal timestamps still list newest first.
        let mut owned: Vec<SavedMap> = self
            .maps
            .read()
            .await
            .values()
            .rev()
            .filter(|m| m.session_id == session_id)
            .cloned()
            .collect();
        owned.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(owned)
    }

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        Ok(self.maps.write().await.shift_remove(&id).is_some())
    }
}
