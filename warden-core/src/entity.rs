//! Cacheable entity traits and retrieval-origin tagging.
//!
//! Entities opt into caching by implementing [`CacheableEntity`], and may
//! additionally expose [`StorageHooks`] for lifecycle diagnostics. The hook
//! capability is checked explicitly at invocation time - the default
//! `storage_hooks()` returns `None`, so plain entities pay nothing.

use crate::error::HookError;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::fmt;

/// Where a retrieved entity came from.
///
/// Used only to decide which lifecycle hook fires; never changes the
/// retrieval outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntitySource {
    /// Loaded from the durable store (source of truth).
    DurableStore,
    /// Resolved from the cache.
    Cache,
}

impl fmt::Display for EntitySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntitySource::DurableStore => write!(f, "durable store"),
            EntitySource::Cache => write!(f, "cache"),
        }
    }
}

/// Optional lifecycle hook capability for cached entities.
///
/// Hooks may return a diagnostic note, which is forwarded to the lifecycle
/// sink. A hook failure is reported to the sink and swallowed - it must
/// never abort the caller's retrieval.
pub trait StorageHooks {
    /// Called after the entity is retrieved from `source`.
    fn on_retrieved(&self, source: EntitySource) -> Result<Option<String>, HookError>;

    /// Called after the entity is written to the cache.
    fn on_stored_in_cache(&self) -> Result<Option<String>, HookError>;
}

/// Marker trait for types that can be read and written through the cache.
///
/// # Implementation Requirements
///
/// - `entity_kind()` must return a consistent value for all instances
/// - `cache_key()` must be stable for a given identity and unique across
///   entities of the same kind
/// - `reference_keys()` lists alternate logical lookup keys that should
///   resolve to the same cached payload; they must never equal the
///   canonical key
/// - Implementations must be `Clone`, `Serialize`, and `DeserializeOwned`
///   for cache storage, and `Send + Sync + 'static` for async use
pub trait CacheableEntity: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Short kind tag, e.g. `"order"`. Used in lifecycle notes and logs.
    fn entity_kind() -> &'static str;

    /// Canonical logical cache key for this instance.
    fn cache_key(&self) -> String;

    /// Alternate logical keys that should point at the canonical payload.
    fn reference_keys(&self) -> Vec<String> {
        Vec::new()
    }

    /// Lifecycle hook capability, if this entity carries one.
    fn storage_hooks(&self) -> Option<&dyn StorageHooks> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Serialize, Deserialize)]
    struct Plain {
        id: u32,
    }

    impl CacheableEntity for Plain {
        fn entity_kind() -> &'static str {
            "plain"
        }

        fn cache_key(&self) -> String {
            format!("plain:{}", self.id)
        }
    }

    #[test]
    fn test_defaults_no_references_no_hooks() {
        let p = Plain { id: 7 };
        assert!(p.reference_keys().is_empty());
        assert!(p.storage_hooks().is_none());
        assert_eq!(p.cache_key(), "plain:7");
        assert_eq!(Plain::entity_kind(), "plain");
    }

    #[test]
    fn test_entity_source_display() {
        assert_eq!(format!("{}", EntitySource::Cache), "cache");
        assert_eq!(format!("{}", EntitySource::DurableStore), "durable store");
    }
}
