//! Mutation coordinator: the full entity mutation protocol.
//!
//! For a mutation of entity E the coordinator acquires the mutation lock
//! for E's resource id, reads E (cache first, checksum-validated, falling
//! back to the durable store), applies the caller's mutation, persists,
//! refreshes the cache (including reference keys), and releases the lock on
//! every exit path. Readers without a lock may call the read path freely;
//! stale reads are what the checksum validates against, not prevents.

use crate::cache::CacheFacade;
use crate::hooks::HookInvoker;
use crate::lock::{EntityMutationLock, MutationLockHandle, ProviderRegistry};
use crate::store::DurableStore;
use tracing::warn;
use warden_core::{
    CacheableEntity, ChecksumError, ChecksumValidator, Checksummed, EntitySource, LockDefaults,
    LockId, ProviderKind, StoreError, WardenResult,
};

/// Sequences lock, cache, checksum, and store around entity mutation.
pub struct MutationCoordinator {
    cache: CacheFacade,
    registry: ProviderRegistry,
    hooks: HookInvoker,
    lock_defaults: LockDefaults,
    provider: ProviderKind,
}

impl MutationCoordinator {
    pub fn new(cache: CacheFacade, registry: ProviderRegistry, provider: ProviderKind) -> Self {
        Self {
            cache,
            registry,
            hooks: HookInvoker::with_tracing(),
            lock_defaults: LockDefaults::default(),
            provider,
        }
    }

    pub fn with_hooks(mut self, hooks: HookInvoker) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn with_lock_defaults(mut self, defaults: LockDefaults) -> Self {
        self.lock_defaults = defaults;
        self
    }

    pub fn cache(&self) -> &CacheFacade {
        &self.cache
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    /// Read an entity, cache first, with checksum validation.
    ///
    /// Cache backend failures and checksum divergence both degrade to the
    /// durable store; a cache miss is never an error. On a store load the
    /// cache is re-populated (read-through) and the lifecycle hooks fire
    /// with the matching origin tag. Requires no lock: stale reads are
    /// tolerated by design.
    ///
    /// [`ChecksumError::Compute`] is fatal: an entity whose fields cannot
    /// be collected must not be trusted from either source.
    pub async fn fetch_validated<T, S>(
        &self,
        store: &S,
        key: &str,
    ) -> WardenResult<Option<(T, EntitySource)>>
    where
        T: CacheableEntity + Checksummed,
        S: DurableStore<T>,
    {
        match self.cache.fetch::<T>(key).await {
            Ok(Some(mut entity)) => match ChecksumValidator::validate(&mut entity) {
                Ok(()) => {
                    self.hooks.invoke(&entity, EntitySource::Cache, false);
                    return Ok(Some((entity, EntitySource::Cache)));
                }
                Err(ChecksumError::Mismatch { .. }) => {
                    warn!(key, "cache/store divergence detected, refetching from durable store");
                }
                Err(err) => return Err(err.into()),
            },
            Ok(None) => {}
            Err(err) => {
                warn!(key, error = %err, "cache read failed, falling back to durable store");
            }
        }

        let Some(mut entity) = store.load(key).await? else {
            return Ok(None);
        };
        ChecksumValidator::validate(&mut entity)?;

        let stored_in_cache = match self
            .cache
            .store(&entity.cache_key(), &entity, None, &entity.reference_keys())
            .await
        {
            Ok(()) => true,
            Err(err) => {
                warn!(key, error = %err, "read-through cache populate failed");
                false
            }
        };
        self.hooks
            .invoke(&entity, EntitySource::DurableStore, stored_in_cache);
        Ok(Some((entity, EntitySource::DurableStore)))
    }

    /// Mutate the entity stored under `key`, end to end.
    ///
    /// Acquires the mutation lock using the tuning configured for
    /// `resource_type`, runs the validated read, applies `apply`, stamps a
    /// fresh checksum, persists, refreshes the cache, and releases the
    /// lock whether or not any step failed. A cache refresh failure does
    /// not fail the mutation - the durable write already succeeded - but
    /// the primary key is evicted so no pre-mutation copy survives.
    pub async fn mutate<T, S, F>(
        &self,
        store: &S,
        resource_type: &str,
        key: &str,
        apply: F,
    ) -> WardenResult<T>
    where
        T: CacheableEntity + Checksummed,
        S: DurableStore<T>,
        F: FnOnce(&mut T) -> WardenResult<()>,
    {
        let options = self.lock_defaults.options_for(resource_type, key, self.provider);
        let lock_id = LockId::new(format!("mutate {resource_type} {key}"));
        let mut handle = MutationLockHandle::acquire(&self.registry, lock_id, &options).await?;

        let fetched = match self.fetch_validated(store, key).await {
            Ok(fetched) => fetched,
            Err(err) => {
                self.release_or_warn(&mut handle).await;
                return Err(err);
            }
        };
        let Some((entity, _source)) = fetched else {
            self.release_or_warn(&mut handle).await;
            return Err(StoreError::NotFound {
                key: key.to_string(),
            }
            .into());
        };

        let mut bound = EntityMutationLock::new(handle, entity);
        let outcome = self.apply_and_persist(store, &mut bound, apply).await;
        self.release_or_warn(bound.handle_mut()).await;
        outcome.map(|()| bound.into_entity())
    }

    /// Steps that run strictly inside the held lock.
    async fn apply_and_persist<T, S, F>(
        &self,
        store: &S,
        bound: &mut EntityMutationLock<T>,
        apply: F,
    ) -> WardenResult<()>
    where
        T: CacheableEntity + Checksummed,
        S: DurableStore<T>,
        F: FnOnce(&mut T) -> WardenResult<()>,
    {
        apply(bound.entity_mut())?;
        ChecksumValidator::stamp(bound.entity_mut())?;
        store.persist(bound.entity()).await?;

        let entity = bound.entity();
        let key = entity.cache_key();
        match self
            .cache
            .store(&key, entity, None, &entity.reference_keys())
            .await
        {
            Ok(()) => self.hooks.invoke_stored(entity),
            Err(err) => {
                warn!(key, error = %err, "cache refresh failed after mutation, evicting stale copy");
                // A surviving pre-mutation copy is self-consistent, so it
                // would pass validation on the next locked read and shadow
                // the write that just landed in the durable store.
                if let Err(err) = self.cache.evict(&key).await {
                    warn!(key, error = %err, "stale copy eviction failed after refresh failure");
                }
            }
        }
        Ok(())
    }

    /// Release must happen on every exit path; a failure here is logged,
    /// and the backend's own lock expiry is the last resort.
    async fn release_or_warn(&self, handle: &mut MutationLockHandle) {
        if let Err(err) = handle.release().await {
            warn!(
                resource_id = handle.resource_id(),
                error = %err,
                "lock release failed"
            );
        }
    }
}
