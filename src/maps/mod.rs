//! Saved maps: search results a session chose to keep.

pub mod store;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};
use uuid::Uuid;

pub use store::{MapStore, MemoryMapStore, StoreError};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MapMetadata {
    pub company_count: usize,
    pub industry_count: usize,
    pub signal_count: usize,
}

impl MapMetadata {
    /// Array lengths of `companies`, `industries` and `signals`; anything
    /// missing or not an array counts as zero.
    pub fn from_results(results: &Value) -> Self {
        let count = |key: &str| results.get(key).and_then(Value::as_array).map_or(0, Vec::len);
        Self {
            company_count: count("companies"),
            industry_count: count("industries"),
            signal_count: count("signals"),
        }
    }
}

/// A stored result payload. Owned by exactly one session and never mutated.
#[derive(Debug, Clone, PartialEq)]
pub struct SavedMap {
    pub id: Uuid,
    pub session_id: String,
    pub query: String,
    /// Stored as the client sent it.
    pub results: Value,
    pub metadata: MapMetadata,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, thiserror::Error)]
pub enum MapError {
    #[error("Map not found")]
    NotFound,

    #[error("Unauthorized")]
    Forbidden,

    #[error(transparent)]
    Storage(#[from] StoreError),
}

/// Map operations with the ownership rule applied: a map is readable and
/// deletable only by the session that saved it.
#[derive(Clone)]
pub struct MapService {
    store: Arc<dyn MapStore>,
}

impl MapService {
    pub fn new(store: Arc<dyn MapStore>) -> Self {
        Self { store }
    }

    pub async fn save(
        &self,
        session_id: &str,
        query: &str,
        results: Value,
    ) -> Result<SavedMap, MapError> {
        let now = Utc::now();
        let map = SavedMap {
            id: Uuid::new_v4(),
            session_id: session_id.to_string(),
            query: query.to_string(),
            metadata: MapMetadata::from_results(&results),
            results,
            created_at: now,
            updated_at: now,
        };
        self.store.create(map.clone()).await?;
        info!(map_id = %map.id, companies = map.metadata.company_count, "map saved");
        Ok(map)
    }

    /// `session_id` of `None` never matches an owner.
    pub async fn get(&self, session_id: Option<&str>, id: &str) -> Result<SavedMap, MapError> {
        let map = self.find(id).await?;
        if session_id != Some(map.session_id.as_str()) {
            warn!(map_id = %map.id, "map read by non-owner rejected");
            return Err(MapError::Forbidden);
        }
        Ok(map)
    }

    pub async fn list(&self, session_id: &str) -> Result<Vec<SavedMap>, MapError> {
        Ok(self.store.list_by_owner(session_id).await?)
    }

    pub async fn delete(&self, session_id: &str, id: &str) -> Result<(), MapError> {
        let map = self.find(id).await?;
        if map.session_id != session_id {
            warn!(map_id = %map.id, "map delete by non-owner rejected");
            return Err(MapError::Forbidden);
        }
        if !self.store.delete(map.id).await? {
            return Err(MapError::NotFound);
        }
        info!(map_id = %map.id, "map deleted");
        Ok(())
    }

    async fn find(&self, id: &str) -> Result<SavedMap, MapError> {
        let id = Uuid::parse_str(id).map_err(|_| MapError::NotFound)?;
        self.store.get(id).await?.ok_or(MapError::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::BrokenStore;
    use serde_json::json;

    fn service() -> MapService {
        MapService::new(Arc::new(MemoryMapStore::new()))
    }

    #[test]
    fn metadata_counts_result_arrays() {
        let results = json!({
            "companies": [{"name": "A"}, {"name": "B"}],
            "industries": ["AI"],
            "signals": ["x", "y", "z"],
            "people": []
        });
        assert_eq!(
            MapMetadata::from_results(&results),
            MapMetadata {
                company_count: 2,
                industry_count: 1,
                signal_count: 3
            }
        );
    }

    #[test]
    fn metadata_treats_missing_or_odd_fields_as_zero() {
        let results = json!({"companies": "lots", "signals": null});
        assert_eq!(MapMetadata::from_results(&results), MapMetadata::default());
        assert_eq!(MapMetadata::from_results(&json!([1, 2])), MapMetadata::default());
    }

    #[test]
    fn metadata_serializes_camel_case() {
        let value = serde_json::to_value(MapMetadata::default()).unwrap();
        assert_eq!(
            value,
            json!({"companyCount": 0, "industryCount": 0, "signalCount": 0})
        );
    }

    #[tokio::test]
    async fn owner_can_read_back_a_saved_map() {
        let maps = service();
        let saved = maps.save("s1", "ai", json!({"companies": []})).await.unwrap();
        assert_eq!(saved.created_at, saved.updated_at);

        let loaded = maps.get(Some("s1"), &saved.id.to_string()).await.unwrap();
        assert_eq!(loaded, saved);
    }

    #[tokio::test]
    async fn other_session_is_forbidden() {
        let maps = service();
        let saved = maps.save("s1", "ai", json!({})).await.unwrap();
        let id = saved.id.to_string();

        assert!(matches!(maps.get(Some("s2"), &id).await, Err(MapError::Forbidden)));
        assert!(matches!(maps.get(None, &id).await, Err(MapError::Forbidden)));
        assert!(matches!(maps.delete("s2", &id).await, Err(MapError::Forbidden)));
        // Still there for the owner.
        assert!(maps.get(Some("s1"), &id).await.is_ok());
    }

    #[tokio::test]
    async fn unknown_or_unparseable_ids_are_not_found() {
        let maps = service();
        let unknown = Uuid::new_v4().to_string();
        assert!(matches!(maps.get(Some("s1"), &unknown).await, Err(MapError::NotFound)));
        assert!(matches!(maps.get(Some("s1"), "not-a-uuid").await, Err(MapError::NotFound)));
        assert!(matches!(maps.delete("s1", "42").await, Err(MapError::NotFound)));
    }

    #[tokio::test]
    async fn delete_removes_the_map() {
        let maps = service();
        let saved = maps.save("s1", "ai", json!({})).await.unwrap();
        let id = saved.id.to_string();

        maps.delete("s1", &id).await.unwrap();
        assert!(matches!(maps.get(Some("s1"), &id).await, Err(MapError::NotFound)));
        assert!(matches!(maps.delete("s1", &id).await, Err(MapError::NotFound)));
    }

    #[tokio::test]
    async fn list_only_returns_own_maps() {
        let maps = service();
        maps.save("s1", "mine", json!({})).await.unwrap();
        maps.save("s2", "theirs", json!({})).await.unwrap();

        let listed = maps.list("s1").await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].query, "mine");
        assert!(maps.list("nobody").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn storage_failures_propagate() {
        let maps = MapService::new(Arc::new(BrokenStore));
        assert!(matches!(
            maps.save("s1", "ai", json!({})).await,
            Err(MapError::Storage(_))
        ));
        assert!(matches!(maps.list("s1").await, Err(MapError::Storage(_))));
    }
}
