//! Entry shapes stored under a physical cache key.
//!
//! A primary key holds a [`CachedValue`]; a reference key holds a
//! [`ReferenceEntry`] pointing at a primary key, sharing its expiry context
//! instead of duplicating the payload. References are exactly one hop: the
//! facade treats a reference that resolves to another reference as a miss.

use super::key::PhysicalKey;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Payload written under a primary key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedValue {
    /// Serialized entity snapshot.
    pub payload: serde_json::Value,
    /// When the snapshot was written.
    pub stored_at: DateTime<Utc>,
    /// Absolute expiry; `None` means no expiry.
    pub expires_at: Option<DateTime<Utc>>,
}

/// Pointer entry written under a reference key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceEntry {
    /// The primary key this reference resolves to.
    pub target: PhysicalKey,
    /// Expiry shared with the primary entry at creation time.
    pub expires_at: Option<DateTime<Utc>>,
}

/// What a cache backend stores under one physical key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CacheEntry {
    Value(CachedValue),
    Reference(ReferenceEntry),
}

impl CacheEntry {
    /// Whether this entry is past its absolute expiry at `now`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        let expires_at = match self {
            CacheEntry::Value(value) => value.expires_at,
            CacheEntry::Reference(reference) => reference.expires_at,
        };
        matches!(expires_at, Some(at) if now >= at)
    }
}
