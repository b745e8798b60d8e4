//! # warden-storage
//!
//! Storage-facing half of warden: cache backends and façade, mutation lock
//! providers and handles, durable store traits, lifecycle hook dispatch,
//! and the coordinator that sequences a full entity mutation.
//!
//! The layering mirrors the data path:
//!
//! - [`cache`] - logical-to-physical key normalization, the entry model
//!   (values and one-hop references), pluggable backends, and the façade.
//! - [`lock`] - per-resource semaphore providers behind a registry, plus
//!   the poll-based [`lock::MutationLockHandle`].
//! - [`store`] - the durable source of truth behind the cache.
//! - [`hooks`] - entity lifecycle hook invocation, observability only.
//! - [`coordinator`] - acquire, validated read, mutate, persist, refresh,
//!   release.
//!
//! Pure data types (checksums, entity traits, lock options, errors) live
//! in `warden-core`; this crate owns everything that touches a backend.

pub mod cache;
pub mod coordinator;
pub mod hooks;
pub mod lock;
pub mod store;

pub use cache::{CacheBackend, CacheFacade, MemoryCacheBackend, NullCacheBackend};
pub use coordinator::MutationCoordinator;
pub use hooks::{HookInvoker, LifecycleLevel, LifecycleSink, TracingSink};
pub use lock::{
    EntityMutationLock, LocalSemaphoreProvider, MutationLockHandle, ProviderRegistry,
    SemaphoreProvider,
};
pub use store::{DurableStore, MemoryStore};
