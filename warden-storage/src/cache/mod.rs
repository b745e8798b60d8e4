//! Cache layer: key normalization, entry model, backends, and the façade
//! that ties them together.

pub mod backend;
pub mod entry;
pub mod facade;
pub mod key;

pub use backend::{CacheBackend, MemoryCacheBackend, NullCacheBackend};
pub use entry::{CacheEntry, CachedValue, ReferenceEntry};
pub use facade::CacheFacade;
pub use key::{KeyNormalizer, PhysicalKey, MAX_PHYSICAL_KEY_LEN};
