//! Durable store capability.
//!
//! The durable store is the source of truth when the cache misses. WARDEN
//! only needs load/persist by logical key; everything else about the store
//! (schema, transactions, connection handling) is opaque to this layer.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;
use warden_core::{CacheableEntity, StoreError};

/// Source-of-truth storage for one entity type.
#[async_trait]
pub trait DurableStore<T: CacheableEntity>: Send + Sync {
    /// Load the entity stored under a logical key.
    async fn load(&self, key: &str) -> Result<Option<T>, StoreError>;

    /// Persist the entity under its canonical key, creating or overwriting.
    async fn persist(&self, entity: &T) -> Result<(), StoreError>;
}

/// In-memory durable store for tests and examples.
#[derive(Debug, Default)]
pub struct MemoryStore<T> {
    entities: RwLock<HashMap<String, T>>,
}

impl<T: CacheableEntity> MemoryStore<T> {
    pub fn new() -> Self {
        Self {
            entities: RwLock::new(HashMap::new()),
        }
    }

    /// Seed an entity directly, bypassing the persist path.
    pub fn insert(&self, entity: T) {
        if let Ok(mut entities) = self.entities.write() {
            entities.insert(entity.cache_key(), entity);
        }
    }

    fn poisoned(operation: &str) -> StoreError {
        StoreError::Backend {
            operation: operation.to_string(),
            reason: "memory store lock poisoned".to_string(),
        }
    }
}

#[async_trait]
impl<T: CacheableEntity> DurableStore<T> for MemoryStore<T> {
    async fn load(&self, key: &str) -> Result<Option<T>, StoreError> {
        let entities = self.entities.read().map_err(|_| Self::poisoned("load"))?;
        Ok(entities.get(key).cloned())
    }

    async fn persist(&self, entity: &T) -> Result<(), StoreError> {
        let mut entities = self.entities.write().map_err(|_| Self::poisoned("persist"))?;
        entities.insert(entity.cache_key(), entity.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Widget {
        id: u32,
        label: String,
    }

    impl CacheableEntity for Widget {
        fn entity_kind() -> &'static str {
            "widget"
        }

        fn cache_key(&self) -> String {
            format!("widget.{}", self.id)
        }
    }

    #[tokio::test]
    async fn test_persist_then_load() {
        let store = MemoryStore::new();
        let widget = Widget {
            id: 9,
            label: "flange".to_string(),
        };
        store.persist(&widget).await.unwrap();
        assert_eq!(store.load("widget.9").await.unwrap(), Some(widget));
    }

    #[tokio::test]
    async fn test_load_missing_is_none() {
        let store: MemoryStore<Widget> = MemoryStore::new();
        assert_eq!(store.load("widget.404").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_persist_overwrites() {
        let store = MemoryStore::new();
        store
            .persist(&Widget {
                id: 9,
                label: "flange".to_string(),
            })
            .await
            .unwrap();
        store
            .persist(&Widget {
                id: 9,
                label: "grommet".to_string(),
            })
            .await
            .unwrap();
        let loaded = store.load("widget.9").await.unwrap().unwrap();
        assert_eq!(loaded.label, "grommet");
    }
}
