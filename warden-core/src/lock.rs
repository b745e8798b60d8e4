//! Mutation lock option types and lifecycle states.
//!
//! A handle moves `Requested -> Held -> Released`; `Released` is terminal
//! and a failed acquisition never enters `Held`. The semaphore backend, not
//! this layer, enforces mutual exclusion - these types only describe one
//! acquisition attempt and the handle's observable state.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use uuid::Uuid;

/// Default interval between poll attempts while waiting for a lock.
pub const DEFAULT_CHECK_INTERVAL: Duration = Duration::from_millis(250);

/// Default maximum number of queued waiters per resource.
pub const DEFAULT_MAX_WAITING: u32 = 6;

// ============================================================================
// PROVIDER SELECTOR
// ============================================================================

/// Selects which registered semaphore provider serves an acquisition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProviderKind {
    /// In-process semaphore table, for tests and single-node deployments.
    Local,
    /// External semaphore service plugged in by the application.
    Remote,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Local => "local",
            ProviderKind::Remote => "remote",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "local" => Ok(ProviderKind::Local),
            "remote" => Ok(ProviderKind::Remote),
            other => Err(ConfigError::InvalidValue {
                field: "provider".to_string(),
                value: other.to_string(),
                reason: "expected 'local' or 'remote'".to_string(),
            }),
        }
    }
}

// ============================================================================
// LOCK IDENTITY
// ============================================================================

/// Identity of one lock handle: a UUIDv7 plus a human-readable label.
///
/// The label exists purely for diagnostics; uniqueness comes from the id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LockId {
    id: Uuid,
    label: String,
}

impl LockId {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7(),
            label: label.into(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}

impl fmt::Display for LockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.label, self.id)
    }
}

// ============================================================================
// LIFECYCLE STATE
// ============================================================================

/// Observable state of a mutation lock handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LockState {
    /// Acquisition attempted, not yet held.
    Requested,
    /// The semaphore is held; the protected protocol may proceed.
    Held,
    /// Terminal: the semaphore has been returned to the backend.
    Released,
}

// ============================================================================
// ACQUIRE OPTIONS
// ============================================================================

/// Configuration for one lock acquisition attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LockAcquireOptions {
    /// Which registered provider serves this acquisition.
    pub provider: ProviderKind,
    /// Identifier of the resource to lock.
    pub resource_id: String,
    /// Block and poll when the lock is held, instead of failing fast.
    pub wait_for_lock: bool,
    /// Release on scope exit even without an explicit `release()` call.
    pub auto_release: bool,
    /// Interval between poll attempts while waiting.
    pub check_interval: Duration,
    /// Maximum queued waiters for the resource before aborting.
    pub max_waiting: u32,
    /// Optional wall-clock bound on the whole wait. `None` preserves the
    /// historical unbounded behavior.
    pub deadline: Option<Duration>,
}

impl LockAcquireOptions {
    /// Options with defaults: local provider, waiting enabled at the
    /// default interval, auto-release on, no deadline.
    pub fn new(resource_id: impl Into<String>) -> Self {
        Self {
            provider: ProviderKind::Local,
            resource_id: resource_id.into(),
            wait_for_lock: true,
            auto_release: true,
            check_interval: DEFAULT_CHECK_INTERVAL,
            max_waiting: DEFAULT_MAX_WAITING,
            deadline: None,
        }
    }

    /// Select the provider.
    pub fn with_provider(mut self, provider: ProviderKind) -> Self {
        self.provider = provider;
        self
    }

    /// Enable or disable waiting for a held lock.
    pub fn with_wait(mut self, wait: bool) -> Self {
        self.wait_for_lock = wait;
        self
    }

    /// Enable or disable release on scope exit.
    pub fn with_auto_release(mut self, auto_release: bool) -> Self {
        self.auto_release = auto_release;
        self
    }

    /// Set the poll interval.
    pub fn with_check_interval(mut self, interval: Duration) -> Self {
        self.check_interval = interval;
        self
    }

    /// Set the waiter-queue bound.
    pub fn with_max_waiting(mut self, max: u32) -> Self {
        self.max_waiting = max;
        self
    }

    /// Bound the total wait time.
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Check option invariants.
    ///
    /// `check_interval` must be positive when waiting is enabled, the
    /// resource id must be non-empty, and a deadline, if set, must be
    /// positive.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.resource_id.is_empty() {
            return Err(ConfigError::MissingRequired {
                field: "resource_id".to_string(),
            });
        }
        if self.wait_for_lock && self.check_interval.is_zero() {
            return Err(ConfigError::InvalidValue {
                field: "check_interval".to_string(),
                value: "0".to_string(),
                reason: "must be positive when wait_for_lock is set".to_string(),
            });
        }
        if let Some(deadline) = self.deadline {
            if deadline.is_zero() {
                return Err(ConfigError::InvalidValue {
                    field: "deadline".to_string(),
                    value: "0".to_string(),
                    reason: "must be positive when set".to_string(),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = LockAcquireOptions::new("order:42");
        assert_eq!(options.provider, ProviderKind::Local);
        assert!(options.wait_for_lock);
        assert!(options.auto_release);
        assert_eq!(options.check_interval, Duration::from_millis(250));
        assert_eq!(options.max_waiting, 6);
        assert_eq!(options.deadline, None);
        options.validate().unwrap();
    }

    #[test]
    fn test_builder_chain() {
        let options = LockAcquireOptions::new("order:42")
            .with_provider(ProviderKind::Remote)
            .with_wait(false)
            .with_auto_release(false)
            .with_check_interval(Duration::from_millis(50))
            .with_max_waiting(2)
            .with_deadline(Duration::from_secs(5));
        assert_eq!(options.provider, ProviderKind::Remote);
        assert!(!options.wait_for_lock);
        assert!(!options.auto_release);
        assert_eq!(options.check_interval, Duration::from_millis(50));
        assert_eq!(options.max_waiting, 2);
        assert_eq!(options.deadline, Some(Duration::from_secs(5)));
    }

    #[test]
    fn test_validate_rejects_empty_resource() {
        let options = LockAcquireOptions::new("");
        assert!(matches!(
            options.validate(),
            Err(ConfigError::MissingRequired { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_zero_interval_when_waiting() {
        let options =
            LockAcquireOptions::new("order:42").with_check_interval(Duration::ZERO);
        assert!(options.validate().is_err());

        // No waiting, no polling: zero interval is fine.
        let options = LockAcquireOptions::new("order:42")
            .with_wait(false)
            .with_check_interval(Duration::ZERO);
        options.validate().unwrap();
    }

    #[test]
    fn test_validate_rejects_zero_deadline() {
        let options = LockAcquireOptions::new("order:42").with_deadline(Duration::ZERO);
        assert!(options.validate().is_err());
    }

    #[test]
    fn test_provider_kind_roundtrip() {
        for kind in [ProviderKind::Local, ProviderKind::Remote] {
            let parsed: ProviderKind = kind.as_str().parse().unwrap();
            assert_eq!(kind, parsed);
        }
        assert!("zookeeper".parse::<ProviderKind>().is_err());
    }

    #[test]
    fn test_lock_id_label() {
        let a = LockId::new("mutate order");
        let b = LockId::new("mutate order");
        assert_eq!(a.label(), "mutate order");
        assert_ne!(a.id(), b.id());
    }
}
