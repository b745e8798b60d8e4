//! Lock acquisition algorithm and the mutation lock handle.
//!
//! Acquisition is a single non-blocking attempt, then (when waiting is
//! enabled) a poll loop at `check_interval` bounded by `max_waiting`, an
//! optional deadline, and an optional cancellation signal. The poll sleep is
//! the only suspension point in the protocol and the only place cancellation
//! is honored.
//!
//! A handle is immutable once constructed: releasing and reacquiring
//! requires a new handle. Release is idempotent, and handles acquired with
//! `auto_release` return the semaphore on drop even when `release()` was
//! never called.

use super::provider::{ProviderRegistry, SemaphorePermit, SemaphoreProvider};
use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, warn};
use warden_core::{LockAcquireOptions, LockError, LockId, LockState, WardenResult};

/// A held (or released) distributed lock for one resource id.
pub struct MutationLockHandle {
    lock_id: LockId,
    resource_id: String,
    auto_release: bool,
    acquired_at: DateTime<Utc>,
    provider: Arc<dyn SemaphoreProvider>,
    permit: Option<SemaphorePermit>,
}

impl MutationLockHandle {
    /// Acquire a lock per the configured wait policy.
    ///
    /// Fails with [`LockError::Busy`] when the lock is held and waiting is
    /// disabled, [`LockError::QueueFull`] when registering would exceed
    /// `max_waiting`, and [`LockError::DeadlineExceeded`] when a configured
    /// deadline elapses first.
    pub async fn acquire(
        registry: &ProviderRegistry,
        lock_id: LockId,
        options: &LockAcquireOptions,
    ) -> WardenResult<Self> {
        Self::acquire_inner(registry, lock_id, options, None).await
    }

    /// Like [`Self::acquire`], aborting with [`LockError::Cancelled`] when
    /// the watch signal turns true while waiting.
    pub async fn acquire_cancellable(
        registry: &ProviderRegistry,
        lock_id: LockId,
        options: &LockAcquireOptions,
        cancel: watch::Receiver<bool>,
    ) -> WardenResult<Self> {
        Self::acquire_inner(registry, lock_id, options, Some(cancel)).await
    }

    async fn acquire_inner(
        registry: &ProviderRegistry,
        lock_id: LockId,
        options: &LockAcquireOptions,
        cancel: Option<watch::Receiver<bool>>,
    ) -> WardenResult<Self> {
        options.validate()?;
        let provider = registry.resolve(options.provider)?;
        debug!(
            resource_id = options.resource_id.as_str(),
            lock_id = %lock_id,
            state = ?LockState::Requested,
            "lock acquisition requested"
        );

        if let Some(permit) = provider.try_acquire(&options.resource_id).await? {
            return Ok(Self::held(lock_id, options, provider, permit));
        }

        if !options.wait_for_lock {
            return Err(LockError::Busy {
                resource_id: options.resource_id.clone(),
            }
            .into());
        }

        let waiting = provider.register_waiter(&options.resource_id).await?;
        if waiting > options.max_waiting {
            let _ = provider.deregister_waiter(&options.resource_id).await;
            return Err(LockError::QueueFull {
                resource_id: options.resource_id.clone(),
                waiting,
                max_waiting: options.max_waiting,
            }
            .into());
        }

        let outcome = Self::poll_for_permit(provider.as_ref(), options, cancel).await;
        // The waiter registration must not dangle on any exit path.
        if let Err(err) = provider.deregister_waiter(&options.resource_id).await {
            warn!(
                resource_id = options.resource_id.as_str(),
                error = %err,
                "failed to deregister lock waiter"
            );
        }
        Ok(Self::held(lock_id, options, provider, outcome?))
    }

    /// Poll loop: sleep up to `check_interval`, reattempt, until acquired,
    /// cancelled, or past the deadline.
    async fn poll_for_permit(
        provider: &dyn SemaphoreProvider,
        options: &LockAcquireOptions,
        mut cancel: Option<watch::Receiver<bool>>,
    ) -> Result<SemaphorePermit, LockError> {
        let started = Instant::now();

        // An already-fired signal aborts before the first sleep.
        if let Some(rx) = &cancel {
            if *rx.borrow() {
                return Err(LockError::Cancelled {
                    resource_id: options.resource_id.clone(),
                });
            }
        }

        loop {
            // The sleep never overshoots a configured deadline, and the
            // deadline is re-checked after waking so a post-deadline
            // try_acquire can never hand out the lock.
            let sleep_for = match options.deadline {
                Some(deadline) => {
                    let waited = started.elapsed();
                    if waited >= deadline {
                        return Err(LockError::DeadlineExceeded {
                            resource_id: options.resource_id.clone(),
                            waited_ms: waited.as_millis() as u64,
                        });
                    }
                    options.check_interval.min(deadline - waited)
                }
                None => options.check_interval,
            };

            match &mut cancel {
                Some(rx) => {
                    tokio::select! {
                        _ = tokio::time::sleep(sleep_for) => {}
                        changed = rx.changed() => {
                            if changed.is_err() || *rx.borrow() {
                                return Err(LockError::Cancelled {
                                    resource_id: options.resource_id.clone(),
                                });
                            }
                            // Signal flipped back to false: re-enter the loop
                            // without an acquisition attempt.
                            continue;
                        }
                    }
                }
                None => tokio::time::sleep(sleep_for).await,
            }

            if let Some(deadline) = options.deadline {
                let waited = started.elapsed();
                if waited >= deadline {
                    return Err(LockError::DeadlineExceeded {
                        resource_id: options.resource_id.clone(),
                        waited_ms: waited.as_millis() as u64,
                    });
                }
            }

            if let Some(permit) = provider.try_acquire(&options.resource_id).await? {
                return Ok(permit);
            }
        }
    }

    fn held(
        lock_id: LockId,
        options: &LockAcquireOptions,
        provider: Arc<dyn SemaphoreProvider>,
        permit: SemaphorePermit,
    ) -> Self {
        Self {
            lock_id,
            resource_id: options.resource_id.clone(),
            auto_release: options.auto_release,
            acquired_at: Utc::now(),
            provider,
            permit: Some(permit),
        }
    }

    pub fn lock_id(&self) -> &LockId {
        &self.lock_id
    }

    pub fn resource_id(&self) -> &str {
        &self.resource_id
    }

    pub fn acquired_at(&self) -> DateTime<Utc> {
        self.acquired_at
    }

    /// Observable lifecycle state. A constructed handle is `Held`;
    /// `Released` is terminal.
    pub fn state(&self) -> LockState {
        if self.permit.is_some() {
            LockState::Held
        } else {
            LockState::Released
        }
    }

    pub fn is_held(&self) -> bool {
        self.permit.is_some()
    }

    /// Return the semaphore to the backend.
    ///
    /// Idempotent: releasing an already-released handle is a no-op, and a
    /// subsequent auto-release on drop will not double-release.
    pub async fn release(&mut self) -> Result<(), LockError> {
        match self.permit.take() {
            Some(permit) => self.provider.release(permit).await,
            None => Ok(()),
        }
    }
}

impl fmt::Debug for MutationLockHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MutationLockHandle")
            .field("lock_id", &self.lock_id)
            .field("resource_id", &self.resource_id)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl Drop for MutationLockHandle {
    fn drop(&mut self) {
        if !self.auto_release {
            return;
        }
        let Some(permit) = self.permit.take() else {
            return;
        };
        let provider = Arc::clone(&self.provider);
        let resource_id = self.resource_id.clone();
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                runtime.spawn(async move {
                    if let Err(err) = provider.release(permit).await {
                        warn!(
                            resource_id = resource_id.as_str(),
                            error = %err,
                            "auto-release failed, relying on backend lock expiry"
                        );
                    }
                });
            }
            Err(_) => {
                warn!(
                    resource_id = resource_id.as_str(),
                    "lock handle dropped outside a runtime, relying on backend lock expiry"
                );
            }
        }
    }
}

/// A held lock bound to the entity instance it protects.
///
/// The binding must live for the full read -> mutate -> persist -> cache
/// refresh sequence; dropping it (or calling [`Self::release`]) ends the
/// protected section.
pub struct EntityMutationLock<T> {
    handle: MutationLockHandle,
    entity: T,
}

impl<T> EntityMutationLock<T> {
    pub fn new(handle: MutationLockHandle, entity: T) -> Self {
        Self { handle, entity }
    }

    pub fn handle(&self) -> &MutationLockHandle {
        &self.handle
    }

    pub fn handle_mut(&mut self) -> &mut MutationLockHandle {
        &mut self.handle
    }

    pub fn entity(&self) -> &T {
        &self.entity
    }

    pub fn entity_mut(&mut self) -> &mut T {
        &mut self.entity
    }

    /// Release the lock and hand back the entity.
    pub async fn release(mut self) -> Result<T, LockError> {
        self.handle.release().await?;
        Ok(self.entity)
    }

    /// Hand back the entity without touching the lock; the handle's own
    /// release (or drop behavior) still applies.
    pub fn into_entity(self) -> T {
        self.entity
    }
}
