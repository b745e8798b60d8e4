//! Cache backend trait plus the null and in-memory implementations.
//!
//! The backend contract is deliberately small: get/set/delete over physical
//! keys, with reference-key creation expressed as a plain set. Serialization,
//! key normalization, and reference resolution all live in the facade.

use super::entry::{CacheEntry, ReferenceEntry};
use super::key::PhysicalKey;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::RwLock;
use warden_core::CacheError;

/// Cache backend capability.
///
/// Implementations must be thread-safe. A backend failure is surfaced as
/// [`CacheError::Backend`]; callers on the read path are expected to treat
/// it as a miss and fall through to the durable store.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Read the entry under a key, or `None` when nothing is stored.
    async fn get(&self, key: &PhysicalKey) -> Result<Option<CacheEntry>, CacheError>;

    /// Write an entry under a key, overwriting any previous entry.
    async fn set(&self, key: &PhysicalKey, entry: CacheEntry) -> Result<(), CacheError>;

    /// Delete the entry under a key. Deleting an absent key succeeds.
    async fn delete(&self, key: &PhysicalKey) -> Result<(), CacheError>;

    /// Write a reference entry pointing at `target`, sharing its expiry.
    async fn create_reference(
        &self,
        key: &PhysicalKey,
        target: PhysicalKey,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<(), CacheError> {
        self.set(key, CacheEntry::Reference(ReferenceEntry { target, expires_at }))
            .await
    }
}

// ============================================================================
// NULL BACKEND
// ============================================================================

/// No-op backend for environments where caching is disabled.
///
/// Every write is a guaranteed success that stores nothing; every read is a
/// miss.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullCacheBackend;

#[async_trait]
impl CacheBackend for NullCacheBackend {
    async fn get(&self, _key: &PhysicalKey) -> Result<Option<CacheEntry>, CacheError> {
        Ok(None)
    }

    async fn set(&self, _key: &PhysicalKey, _entry: CacheEntry) -> Result<(), CacheError> {
        Ok(())
    }

    async fn delete(&self, _key: &PhysicalKey) -> Result<(), CacheError> {
        Ok(())
    }
}

// ============================================================================
// IN-MEMORY BACKEND
// ============================================================================

/// In-process backend for tests and embedded single-node use.
///
/// Expiry is enforced lazily on read; expired entries are dropped when
/// observed.
#[derive(Debug, Default)]
pub struct MemoryCacheBackend {
    entries: RwLock<HashMap<PhysicalKey, CacheEntry>>,
}

impl MemoryCacheBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live (possibly expired but not yet reaped) entries.
    pub fn len(&self) -> usize {
        self.entries.read().map(|map| map.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn poisoned(operation: &str) -> CacheError {
        CacheError::Backend {
            operation: operation.to_string(),
            reason: "memory backend lock poisoned".to_string(),
        }
    }
}

#[async_trait]
impl CacheBackend for MemoryCacheBackend {
    async fn get(&self, key: &PhysicalKey) -> Result<Option<CacheEntry>, CacheError> {
        let now = Utc::now();
        let expired = {
            let entries = self.entries.read().map_err(|_| Self::poisoned("get"))?;
            match entries.get(key) {
                Some(entry) if entry.is_expired(now) => true,
                Some(entry) => return Ok(Some(entry.clone())),
                None => return Ok(None),
            }
        };
        if expired {
            let mut entries = self.entries.write().map_err(|_| Self::poisoned("get"))?;
            entries.remove(key);
        }
        Ok(None)
    }

    async fn set(&self, key: &PhysicalKey, entry: CacheEntry) -> Result<(), CacheError> {
        let mut entries = self.entries.write().map_err(|_| Self::poisoned("set"))?;
        entries.insert(key.clone(), entry);
        Ok(())
    }

    async fn delete(&self, key: &PhysicalKey) -> Result<(), CacheError> {
        let mut entries = self.entries.write().map_err(|_| Self::poisoned("delete"))?;
        entries.remove(key);
        Ok(())
    }
}
