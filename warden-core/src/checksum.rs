//! Content checksum for detecting cache/store divergence.
//!
//! An entity declares an ordered list of checksum-relevant fields. The digest
//! is a pure function of that list: no hidden state, no current time. Field
//! order is part of the contract - reordering the declaration changes the
//! digest, so implementations must keep the order stable across versions.

use crate::error::ChecksumError;
use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};
use std::fmt;

/// Length of a checksum digest in bytes.
pub const DIGEST_LEN: usize = 20;

/// Fixed-length content digest over an entity's declared fields.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChecksumDigest([u8; DIGEST_LEN]);

impl ChecksumDigest {
    /// Wrap raw digest bytes.
    pub fn from_bytes(bytes: [u8; DIGEST_LEN]) -> Self {
        Self(bytes)
    }

    /// Raw digest bytes.
    pub fn as_bytes(&self) -> &[u8; DIGEST_LEN] {
        &self.0
    }

    /// Lowercase hex rendering, for diagnostics and error messages.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for ChecksumDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for ChecksumDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ChecksumDigest({})", self.to_hex())
    }
}

/// Ordered (name, value) pairs an entity feeds into its digest.
pub type ChecksumFields = Vec<(&'static str, String)>;

/// Capability trait for entities that carry a content checksum.
///
/// `checksum_fields` must return the same ordered list for the same entity
/// content; collection may fail (e.g., a field became unreadable), which is
/// surfaced as [`ChecksumError::Compute`] by the validator.
///
/// The validated flag gates trust: callers must not mutate a fetched entity
/// until the flag is set by a successful [`ChecksumValidator::validate`] or
/// an explicit [`ChecksumValidator::override_validation`].
pub trait Checksummed {
    /// Human-readable subject for error messages, e.g. `"order 42"`.
    fn checksum_subject(&self) -> String;

    /// Ordered checksum-relevant fields.
    fn checksum_fields(&self) -> Result<ChecksumFields, ChecksumError>;

    /// The digest stored on the entity at its last persist, if any.
    fn stored_digest(&self) -> Option<ChecksumDigest>;

    /// Record a freshly computed digest on the entity.
    fn set_stored_digest(&mut self, digest: ChecksumDigest);

    /// Whether this instance has passed validation since retrieval.
    fn checksum_validated(&self) -> bool;

    /// Set the validated flag.
    fn set_checksum_validated(&mut self, validated: bool);
}

/// Computes and compares entity content digests.
pub struct ChecksumValidator;

impl ChecksumValidator {
    /// Compute a digest over an ordered field list.
    ///
    /// Each pair is fed as `name=value` followed by a NUL separator, so
    /// field boundaries cannot alias (`("a", "bc")` never collides with
    /// `("ab", "c")`).
    pub fn compute(fields: &[(&'static str, String)]) -> ChecksumDigest {
        let mut hasher = Sha1::new();
        for (name, value) in fields {
            hasher.update(name.as_bytes());
            hasher.update(b"=");
            hasher.update(value.as_bytes());
            hasher.update(b"\0");
        }
        let result = hasher.finalize();
        let mut digest = [0u8; DIGEST_LEN];
        digest.copy_from_slice(&result);
        ChecksumDigest::from_bytes(digest)
    }

    /// Recompute and compare against the entity's stored digest.
    ///
    /// Returns `false` when no stored digest exists. Only field-collection
    /// failure is an error.
    pub fn verify<T: Checksummed>(entity: &T) -> Result<bool, ChecksumError> {
        let Some(stored) = entity.stored_digest() else {
            return Ok(false);
        };
        let fields = entity.checksum_fields()?;
        Ok(Self::compute(&fields) == stored)
    }

    /// Validate the entity and set its validated flag on success.
    ///
    /// An entity with no stored digest validates trivially (there is nothing
    /// to diverge from); a present digest that does not match the recomputed
    /// one fails with [`ChecksumError::Mismatch`] and leaves the flag false.
    pub fn validate<T: Checksummed>(entity: &mut T) -> Result<(), ChecksumError> {
        let fields = entity.checksum_fields()?;
        if let Some(stored) = entity.stored_digest() {
            let computed = Self::compute(&fields);
            if computed != stored {
                return Err(ChecksumError::Mismatch {
                    subject: entity.checksum_subject(),
                    stored: stored.to_hex(),
                    computed: computed.to_hex(),
                });
            }
        }
        entity.set_checksum_validated(true);
        Ok(())
    }

    /// Explicitly trust the entity without comparing digests.
    pub fn override_validation<T: Checksummed>(entity: &mut T) {
        entity.set_checksum_validated(true);
    }

    /// Recompute the digest from current content, store it on the entity,
    /// and mark it validated.
    ///
    /// Used on the persist path so the durable copy always carries a digest
    /// matching its content.
    pub fn stamp<T: Checksummed>(entity: &mut T) -> Result<ChecksumDigest, ChecksumError> {
        let fields = entity.checksum_fields()?;
        let digest = Self::compute(&fields);
        entity.set_stored_digest(digest);
        entity.set_checksum_validated(true);
        Ok(digest)
    }
}
