//! Cache store facade: normalized reads and writes with reference-key
//! indirection.
//!
//! Reference keys let multiple logical lookup paths (by id, by a secondary
//! attribute) share one cached payload and one TTL. Resolution is exactly
//! one hop; anything else degrades to a miss. Cache corruption on the read
//! path also degrades to a miss - the facade never surfaces a corrupt
//! payload as an error to the caller.

use super::backend::CacheBackend;
use super::entry::{CacheEntry, CachedValue};
use super::key::{KeyNormalizer, PhysicalKey};
use chrono::Utc;
use std::sync::Arc;
use tracing::warn;
use warden_core::{CacheError, CacheSettings, CacheableEntity, TtlPolicy};

/// Read/write/delete against a cache backend, with key normalization and
/// reference-key fan-out.
#[derive(Clone)]
pub struct CacheFacade {
    backend: Arc<dyn CacheBackend>,
    normalizer: KeyNormalizer,
    default_ttl: TtlPolicy,
}

impl CacheFacade {
    /// Build a facade over a backend from cache settings.
    pub fn new(backend: Arc<dyn CacheBackend>, settings: &CacheSettings) -> Result<Self, CacheError> {
        Ok(Self {
            backend,
            normalizer: KeyNormalizer::new(settings.namespace.clone())?,
            default_ttl: settings.default_ttl,
        })
    }

    pub fn normalizer(&self) -> &KeyNormalizer {
        &self.normalizer
    }

    /// Write an entity under its logical key, fanning out reference keys.
    ///
    /// Every reference key is written as a pointer at the primary physical
    /// key, sharing the same expiry. With a null backend this is a
    /// guaranteed no-op success.
    pub async fn store<T: CacheableEntity>(
        &self,
        key: &str,
        entity: &T,
        ttl: Option<TtlPolicy>,
        reference_keys: &[String],
    ) -> Result<(), CacheError> {
        let primary = self.normalizer.normalize(key)?;
        // Normalize the whole fan-out up front: a bad reference key must
        // not abort after the primary write already landed.
        let references = reference_keys
            .iter()
            .map(|reference| self.normalizer.normalize(reference))
            .collect::<Result<Vec<_>, _>>()?;
        let now = Utc::now();
        let expires_at = ttl.unwrap_or(self.default_ttl).absolute_expiry(now);

        let payload = serde_json::to_value(entity).map_err(|err| CacheError::Serialization {
            reason: err.to_string(),
        })?;
        self.backend
            .set(
                &primary,
                CacheEntry::Value(CachedValue {
                    payload,
                    stored_at: now,
                    expires_at,
                }),
            )
            .await?;

        for reference_key in references {
            self.backend
                .create_reference(&reference_key, primary.clone(), expires_at)
                .await?;
        }
        Ok(())
    }

    /// Read an entity by logical key, resolving one reference hop.
    ///
    /// Returns `Ok(None)` on: nothing stored, expired entry, reference
    /// resolution miss, chained reference, or unrecognized payload shape.
    /// Only backend failures surface as errors.
    pub async fn fetch<T: CacheableEntity>(&self, key: &str) -> Result<Option<T>, CacheError> {
        let physical = self.normalizer.normalize(key)?;
        let Some(entry) = self.backend.get(&physical).await? else {
            return Ok(None);
        };

        let now = Utc::now();
        if entry.is_expired(now) {
            return Ok(None);
        }

        let value = match entry {
            CacheEntry::Value(value) => value,
            CacheEntry::Reference(reference) => {
                match self.backend.get(&reference.target).await? {
                    Some(CacheEntry::Value(value)) => {
                        if matches!(value.expires_at, Some(at) if now >= at) {
                            return Ok(None);
                        }
                        value
                    }
                    Some(CacheEntry::Reference(_)) => {
                        // One-hop invariant violated by whatever wrote this
                        // entry; treat as a miss.
                        warn!(
                            key = physical.as_str(),
                            target = reference.target.as_str(),
                            "chained reference key in cache, treating as miss"
                        );
                        return Ok(None);
                    }
                    None => return Ok(None),
                }
            }
        };

        match serde_json::from_value::<T>(value.payload) {
            Ok(entity) => Ok(Some(entity)),
            Err(err) => {
                warn!(
                    key = physical.as_str(),
                    entity_kind = T::entity_kind(),
                    error = %err,
                    "unrecognized cache payload, treating as miss"
                );
                Ok(None)
            }
        }
    }

    /// Delete the primary entry for a logical key.
    ///
    /// Reference keys pointing at it are not cascaded; stale references are
    /// caught by the miss-on-resolve path.
    pub async fn evict(&self, key: &str) -> Result<(), CacheError> {
        let physical = self.normalizer.normalize(key)?;
        self.backend.delete(&physical).await
    }

    /// Resolve a logical key to its physical form without touching the
    /// backend. Exposed for diagnostics and tests.
    pub fn physical_key(&self, key: &str) -> Result<PhysicalKey, CacheError> {
        self.normalizer.normalize(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::backend::{MemoryCacheBackend, NullCacheBackend};
    use crate::cache::entry::ReferenceEntry;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Order {
        id: u32,
        number: String,
        total_cents: i64,
    }

    impl CacheableEntity for Order {
        fn entity_kind() -> &'static str {
            "order"
        }

        fn cache_key(&self) -> String {
            format!("order.{}", self.id)
        }

        fn reference_keys(&self) -> Vec<String> {
            vec![format!("order.by-number.{}", self.number)]
        }
    }

    fn order() -> Order {
        Order {
            id: 42,
            number: "A17".to_string(),
            total_cents: 12_500,
        }
    }

    fn facade(backend: Arc<dyn CacheBackend>) -> CacheFacade {
        CacheFacade::new(backend, &CacheSettings::new("test")).unwrap()
    }

    #[tokio::test]
    async fn test_store_fetch_roundtrip() {
        let facade = facade(Arc::new(MemoryCacheBackend::new()));
        let entity = order();
        facade
            .store(&entity.cache_key(), &entity, None, &[])
            .await
            .unwrap();
        let fetched: Order = facade.fetch(&entity.cache_key()).await.unwrap().unwrap();
        assert_eq!(fetched, entity);
    }

    #[tokio::test]
    async fn test_fetch_through_reference_key() {
        let facade = facade(Arc::new(MemoryCacheBackend::new()));
        let entity = order();
        facade
            .store(&entity.cache_key(), &entity, None, &entity.reference_keys())
            .await
            .unwrap();
        let fetched: Order = facade
            .fetch("order.by-number.A17")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(fetched, entity);
    }

    #[tokio::test]
    async fn test_reference_miss_after_primary_evicted() {
        let facade = facade(Arc::new(MemoryCacheBackend::new()));
        let entity = order();
        facade
            .store(&entity.cache_key(), &entity, None, &entity.reference_keys())
            .await
            .unwrap();
        facade.evict(&entity.cache_key()).await.unwrap();

        // Stale reference resolves to nothing: a miss, never an error or a
        // stale copy.
        let via_reference: Option<Order> =
            facade.fetch("order.by-number.A17").await.unwrap();
        assert_eq!(via_reference, None);
    }

    #[tokio::test]
    async fn test_chained_reference_degrades_to_miss() {
        let backend = Arc::new(MemoryCacheBackend::new());
        let facade = facade(backend.clone());

        let a = facade.physical_key("a").unwrap();
        let b = facade.physical_key("b").unwrap();
        backend
            .set(
                &a,
                CacheEntry::Reference(ReferenceEntry {
                    target: b.clone(),
                    expires_at: None,
                }),
            )
            .await
            .unwrap();
        backend
            .set(
                &b,
                CacheEntry::Reference(ReferenceEntry {
                    target: a.clone(),
                    expires_at: None,
                }),
            )
            .await
            .unwrap();

        let fetched: Option<Order> = facade.fetch("a").await.unwrap();
        assert_eq!(fetched, None);
    }

    #[tokio::test]
    async fn test_corrupt_payload_degrades_to_miss() {
        let backend = Arc::new(MemoryCacheBackend::new());
        let facade = facade(backend.clone());

        let key = facade.physical_key("order.42").unwrap();
        backend
            .set(
                &key,
                CacheEntry::Value(CachedValue {
                    payload: serde_json::json!("not an order"),
                    stored_at: Utc::now(),
                    expires_at: None,
                }),
            )
            .await
            .unwrap();

        let fetched: Option<Order> = facade.fetch("order.42").await.unwrap();
        assert_eq!(fetched, None);
    }

    #[tokio::test]
    async fn test_expired_entry_is_miss() {
        let facade = facade(Arc::new(MemoryCacheBackend::new()));
        let entity = order();
        facade
            .store(
                &entity.cache_key(),
                &entity,
                Some(TtlPolicy::ExpiresAt(Utc::now() - chrono::Duration::seconds(1))),
                &[],
            )
            .await
            .unwrap();
        let fetched: Option<Order> = facade.fetch(&entity.cache_key()).await.unwrap();
        assert_eq!(fetched, None);
    }

    #[tokio::test]
    async fn test_null_backend_noop_store_and_miss_fetch() {
        let facade = facade(Arc::new(NullCacheBackend));
        let entity = order();
        facade
            .store(&entity.cache_key(), &entity, None, &entity.reference_keys())
            .await
            .unwrap();
        let fetched: Option<Order> = facade.fetch(&entity.cache_key()).await.unwrap();
        assert_eq!(fetched, None);
        facade.evict(&entity.cache_key()).await.unwrap();
    }

    #[tokio::test]
    async fn test_invalid_reference_key_writes_nothing() {
        let backend = Arc::new(MemoryCacheBackend::new());
        let facade = facade(backend.clone());
        let entity = order();

        let result = facade
            .store(
                &entity.cache_key(),
                &entity,
                None,
                &["order.by-number.A17".to_string(), String::new()],
            )
            .await;
        assert!(matches!(result, Err(CacheError::InvalidKey { .. })));

        // Neither the primary nor the valid reference key was written.
        assert!(backend.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_key_rejected() {
        let facade = facade(Arc::new(MemoryCacheBackend::new()));
        let result: Result<Option<Order>, _> = facade.fetch("").await;
        assert!(matches!(result, Err(CacheError::InvalidKey { .. })));
    }
}
