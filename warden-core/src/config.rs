//! Configuration surface consumed by the coordination layer.
//!
//! WARDEN does not load configuration itself; applications build these
//! values at startup and pass them in. Per-resource-type lock tuning and
//! per-cache-store TTL policy are the two knobs the protocol consumes.

use crate::error::ConfigError;
use crate::lock::{
    LockAcquireOptions, ProviderKind, DEFAULT_CHECK_INTERVAL, DEFAULT_MAX_WAITING,
};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

// ============================================================================
// TTL POLICY
// ============================================================================

/// Expiry policy for cached values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TtlPolicy {
    /// Entries never expire (backend eviction may still remove them).
    NoExpiry,
    /// Entries expire at an absolute instant.
    ExpiresAt(DateTime<Utc>),
    /// Entries expire this many seconds after being stored.
    AfterSeconds(u64),
}

impl TtlPolicy {
    /// Resolve to an absolute expiry for an entry stored at `now`.
    pub fn absolute_expiry(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            TtlPolicy::NoExpiry => None,
            TtlPolicy::ExpiresAt(at) => Some(*at),
            TtlPolicy::AfterSeconds(secs) => {
                Some(now + ChronoDuration::seconds(*secs as i64))
            }
        }
    }
}

/// Settings for one cache store: key namespace and default TTL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheSettings {
    /// Namespace prefixed onto every physical key.
    pub namespace: String,
    /// TTL applied when a store call does not specify one.
    pub default_ttl: TtlPolicy,
}

impl CacheSettings {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            default_ttl: TtlPolicy::NoExpiry,
        }
    }

    pub fn with_default_ttl(mut self, ttl: TtlPolicy) -> Self {
        self.default_ttl = ttl;
        self
    }
}

// ============================================================================
// LOCK TUNING
// ============================================================================

/// Lock acquisition tuning, minus the per-call resource id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LockTuning {
    pub wait_for_lock: bool,
    pub auto_release: bool,
    pub check_interval: Duration,
    pub max_waiting: u32,
    pub deadline: Option<Duration>,
}

impl Default for LockTuning {
    fn default() -> Self {
        Self {
            wait_for_lock: true,
            auto_release: true,
            check_interval: DEFAULT_CHECK_INTERVAL,
            max_waiting: DEFAULT_MAX_WAITING,
            deadline: None,
        }
    }
}

/// Per-resource-type lock tuning with a fallback default.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LockDefaults {
    /// Tuning applied when a resource type has no dedicated entry.
    pub default: LockTuning,
    /// Tuning keyed by resource type, e.g. `"order"`.
    pub per_resource_type: HashMap<String, LockTuning>,
}

impl LockDefaults {
    /// Build full acquisition options for one resource.
    pub fn options_for(
        &self,
        resource_type: &str,
        resource_id: impl Into<String>,
        provider: ProviderKind,
    ) -> LockAcquireOptions {
        let tuning = self
            .per_resource_type
            .get(resource_type)
            .unwrap_or(&self.default);
        LockAcquireOptions {
            provider,
            resource_id: resource_id.into(),
            wait_for_lock: tuning.wait_for_lock,
            auto_release: tuning.auto_release,
            check_interval: tuning.check_interval,
            max_waiting: tuning.max_waiting,
            deadline: tuning.deadline,
        }
    }

    /// Validate every tuning entry by building options against a probe id.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.options_for("", "probe", ProviderKind::Local).validate()?;
        for resource_type in self.per_resource_type.keys() {
            self.options_for(resource_type, "probe", ProviderKind::Local)
                .validate()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ttl_policy_absolute_expiry() {
        let now = Utc::now();
        assert_eq!(TtlPolicy::NoExpiry.absolute_expiry(now), None);

        let at = now + ChronoDuration::minutes(5);
        assert_eq!(TtlPolicy::ExpiresAt(at).absolute_expiry(now), Some(at));

        let after = TtlPolicy::AfterSeconds(60).absolute_expiry(now).unwrap();
        assert_eq!(after, now + ChronoDuration::seconds(60));
    }

    #[test]
    fn test_lock_defaults_fallback_and_override() {
        let mut defaults = LockDefaults::default();
        defaults.per_resource_type.insert(
            "order".to_string(),
            LockTuning {
                wait_for_lock: false,
                max_waiting: 2,
                ..LockTuning::default()
            },
        );

        let order = defaults.options_for("order", "order:42", ProviderKind::Local);
        assert!(!order.wait_for_lock);
        assert_eq!(order.max_waiting, 2);
        assert_eq!(order.resource_id, "order:42");

        let other = defaults.options_for("invoice", "invoice:7", ProviderKind::Local);
        assert!(other.wait_for_lock);
        assert_eq!(other.max_waiting, DEFAULT_MAX_WAITING);
    }

    #[test]
    fn test_lock_defaults_validate_catches_bad_tuning() {
        let mut defaults = LockDefaults::default();
        defaults.per_resource_type.insert(
            "order".to_string(),
            LockTuning {
                check_interval: Duration::ZERO,
                ..LockTuning::default()
            },
        );
        assert!(defaults.validate().is_err());
    }

    #[test]
    fn test_cache_settings_builder() {
        let settings =
            CacheSettings::new("warden").with_default_ttl(TtlPolicy::AfterSeconds(300));
        assert_eq!(settings.namespace, "warden");
        assert_eq!(settings.default_ttl, TtlPolicy::AfterSeconds(300));
    }
}
