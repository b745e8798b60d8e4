//! WARDEN Core - Coordination Data Types
//!
//! Pure data types and leaf logic for the WARDEN mutation concurrency and
//! cache-consistency layer: error taxonomy, content checksums, cacheable
//! entity traits, lock options, and the consumed configuration surface.
//! No backend I/O lives here - that belongs to `warden-storage`.

pub mod checksum;
pub mod config;
pub mod entity;
pub mod error;
pub mod lock;

pub use checksum::{ChecksumDigest, ChecksumFields, ChecksumValidator, Checksummed, DIGEST_LEN};
pub use config::{CacheSettings, LockDefaults, LockTuning, TtlPolicy};
pub use entity::{CacheableEntity, EntitySource, StorageHooks};
pub use error::{
    CacheError, ChecksumError, ConfigError, HookError, LockError, StoreError, WardenError,
    WardenResult,
};
pub use lock::{
    LockAcquireOptions, LockId, LockState, ProviderKind, DEFAULT_CHECK_INTERVAL,
    DEFAULT_MAX_WAITING,
};
