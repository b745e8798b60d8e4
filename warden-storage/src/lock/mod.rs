//! Mutation lock layer: semaphore providers and the poll-based acquisition
//! handle.

pub mod handle;
pub mod provider;

pub use handle::{EntityMutationLock, MutationLockHandle};
pub use provider::{
    LocalSemaphoreProvider, ProviderRegistry, SemaphorePermit, SemaphoreProvider,
};
