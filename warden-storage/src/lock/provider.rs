//! Semaphore provider capability, provider registry, and the in-process
//! provider.
//!
//! The provider only answers "who holds the semaphore for this resource" -
//! the acquisition algorithm, polling, and handle lifetime live in
//! [`crate::lock::handle`]. Providers are resolved through an explicit
//! registry value passed by reference; there is no ambient global lookup.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use uuid::Uuid;
use warden_core::{LockError, ProviderKind};

/// Proof of one successful `try_acquire`. Opaque to callers; returned to
/// the provider on release.
#[derive(Debug, PartialEq, Eq)]
pub struct SemaphorePermit {
    resource_id: String,
    token: Uuid,
}

impl SemaphorePermit {
    /// Build a permit. Intended for provider implementations only.
    pub fn new(resource_id: impl Into<String>, token: Uuid) -> Self {
        Self {
            resource_id: resource_id.into(),
            token,
        }
    }

    pub fn resource_id(&self) -> &str {
        &self.resource_id
    }

    pub fn token(&self) -> Uuid {
        self.token
    }
}

/// Distributed semaphore capability.
///
/// The backend guarantees at most one outstanding permit per resource id
/// globally. Waiter registration exists only to bound contention
/// (`max_waiting`); it promises no fairness or queue order.
#[async_trait]
pub trait SemaphoreProvider: Send + Sync {
    /// Single non-blocking acquisition attempt. `None` means held elsewhere.
    async fn try_acquire(&self, resource_id: &str) -> Result<Option<SemaphorePermit>, LockError>;

    /// Return a permit. Releasing a permit whose semaphore was already
    /// returned must be a no-op, not an error.
    async fn release(&self, permit: SemaphorePermit) -> Result<(), LockError>;

    /// Register the caller as a waiter; returns the waiter count including
    /// the caller.
    async fn register_waiter(&self, resource_id: &str) -> Result<u32, LockError>;

    /// Remove one waiter registration for the caller.
    async fn deregister_waiter(&self, resource_id: &str) -> Result<(), LockError>;
}

// ============================================================================
// PROVIDER REGISTRY
// ============================================================================

/// Typed registry mapping a [`ProviderKind`] to one concrete provider.
///
/// Built once at startup and passed by reference into acquisition.
#[derive(Default)]
pub struct ProviderRegistry {
    providers: HashMap<ProviderKind, Arc<dyn SemaphoreProvider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the provider for a kind.
    pub fn register(&mut self, kind: ProviderKind, provider: Arc<dyn SemaphoreProvider>) {
        self.providers.insert(kind, provider);
    }

    /// Registry preloaded with an in-process local provider.
    pub fn with_local() -> Self {
        let mut registry = Self::new();
        registry.register(ProviderKind::Local, Arc::new(LocalSemaphoreProvider::new()));
        registry
    }

    /// Resolve the provider for a kind.
    pub fn resolve(&self, kind: ProviderKind) -> Result<Arc<dyn SemaphoreProvider>, LockError> {
        self.providers
            .get(&kind)
            .cloned()
            .ok_or_else(|| LockError::ProviderNotRegistered {
                provider: kind.to_string(),
            })
    }
}

// ============================================================================
// LOCAL PROVIDER
// ============================================================================

#[derive(Debug, Default)]
struct ResourceSlot {
    holder: Option<Uuid>,
    waiters: u32,
}

/// In-process semaphore table for tests and single-node deployments.
#[derive(Debug, Default)]
pub struct LocalSemaphoreProvider {
    slots: Mutex<HashMap<String, ResourceSlot>>,
}

impl LocalSemaphoreProvider {
    pub fn new() -> Self {
        Self::default()
    }

    fn poisoned(operation: &str) -> LockError {
        LockError::Backend {
            operation: operation.to_string(),
            reason: "local semaphore table poisoned".to_string(),
        }
    }
}

#[async_trait]
impl SemaphoreProvider for LocalSemaphoreProvider {
    async fn try_acquire(&self, resource_id: &str) -> Result<Option<SemaphorePermit>, LockError> {
        let mut slots = self.slots.lock().map_err(|_| Self::poisoned("try_acquire"))?;
        let slot = slots.entry(resource_id.to_string()).or_default();
        if slot.holder.is_some() {
            return Ok(None);
        }
        let token = Uuid::now_v7();
        slot.holder = Some(token);
        Ok(Some(SemaphorePermit::new(resource_id, token)))
    }

    async fn release(&self, permit: SemaphorePermit) -> Result<(), LockError> {
        let mut slots = self.slots.lock().map_err(|_| Self::poisoned("release"))?;
        if let Some(slot) = slots.get_mut(permit.resource_id()) {
            // A stale permit (already released, semaphore since reacquired
            // by someone else) must not free the current holder.
            if slot.holder == Some(permit.token()) {
                slot.holder = None;
            }
            if slot.holder.is_none() && slot.waiters == 0 {
                slots.remove(permit.resource_id());
            }
        }
        Ok(())
    }

    async fn register_waiter(&self, resource_id: &str) -> Result<u32, LockError> {
        let mut slots = self
            .slots
            .lock()
            .map_err(|_| Self::poisoned("register_waiter"))?;
        let slot = slots.entry(resource_id.to_string()).or_default();
        slot.waiters += 1;
        Ok(slot.waiters)
    }

    async fn deregister_waiter(&self, resource_id: &str) -> Result<(), LockError> {
        let mut slots = self
            .slots
            .lock()
            .map_err(|_| Self::poisoned("deregister_waiter"))?;
        if let Some(slot) = slots.get_mut(resource_id) {
            slot.waiters = slot.waiters.saturating_sub(1);
            if slot.holder.is_none() && slot.waiters == 0 {
                slots.remove(resource_id);
            }
        }
        Ok(())
    }
}
