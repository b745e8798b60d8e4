//! Logical-to-physical cache key normalization.
//!
//! A physical key is `namespace:encoded-logical-key`. Bytes outside
//! `[A-Za-z0-9_.-]` are percent-encoded, so the mapping is injective: two
//! distinct logical keys can never collide, and the same logical key always
//! yields the same physical key. The encoding is pure and total apart from
//! the two rejection cases (empty key, oversized result).

use serde::{Deserialize, Serialize};
use std::fmt;
use warden_core::CacheError;

/// Maximum physical key length accepted by supported backends.
pub const MAX_PHYSICAL_KEY_LEN: usize = 250;

/// A fully normalized, backend-ready cache key.
///
/// Constructed only by [`KeyNormalizer::normalize`]; the private field keeps
/// unvalidated strings out of backend calls.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PhysicalKey(String);

impl PhysicalKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PhysicalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Maps logical keys into the backend's namespaced key format.
#[derive(Debug, Clone)]
pub struct KeyNormalizer {
    namespace: String,
}

impl KeyNormalizer {
    /// Create a normalizer for one namespace.
    ///
    /// The namespace itself must be non-empty and restricted to the safe
    /// character set, so it can never alias an encoded logical key.
    pub fn new(namespace: impl Into<String>) -> Result<Self, CacheError> {
        let namespace = namespace.into();
        if namespace.is_empty() {
            return Err(CacheError::InvalidKey {
                reason: "namespace must not be empty".to_string(),
            });
        }
        if !namespace.bytes().all(is_safe_byte) {
            return Err(CacheError::InvalidKey {
                reason: format!("namespace '{namespace}' contains unsafe characters"),
            });
        }
        Ok(Self { namespace })
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Normalize a logical key into its physical form.
    ///
    /// Deterministic and injective within a namespace. Rejects empty keys
    /// and keys whose encoded form exceeds [`MAX_PHYSICAL_KEY_LEN`].
    pub fn normalize(&self, logical: &str) -> Result<PhysicalKey, CacheError> {
        if logical.is_empty() {
            return Err(CacheError::InvalidKey {
                reason: "logical key must not be empty".to_string(),
            });
        }

        let mut physical = String::with_capacity(self.namespace.len() + 1 + logical.len());
        physical.push_str(&self.namespace);
        physical.push(':');
        for byte in logical.bytes() {
            if is_safe_byte(byte) {
                physical.push(byte as char);
            } else {
                physical.push('%');
                physical.push_str(&format!("{byte:02X}"));
            }
        }

        if physical.len() > MAX_PHYSICAL_KEY_LEN {
            return Err(CacheError::InvalidKey {
                reason: format!(
                    "key '{logical}' normalizes to {} bytes, max {MAX_PHYSICAL_KEY_LEN}",
                    physical.len()
                ),
            });
        }
        Ok(PhysicalKey(physical))
    }
}

/// Bytes passed through verbatim. `%` is excluded so escapes cannot alias.
fn is_safe_byte(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || matches!(byte, b'_' | b'.' | b'-')
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn normalizer() -> KeyNormalizer {
        KeyNormalizer::new("warden").unwrap()
    }

    #[test]
    fn test_normalize_plain_key() {
        let key = normalizer().normalize("order.42").unwrap();
        assert_eq!(key.as_str(), "warden:order.42");
    }

    #[test]
    fn test_normalize_escapes_unsafe_bytes() {
        let key = normalizer().normalize("order:42/eu west").unwrap();
        assert_eq!(key.as_str(), "warden:order%3A42%2Feu%20west");
    }

    #[test]
    fn test_normalize_is_deterministic() {
        let n = normalizer();
        assert_eq!(n.normalize("a b").unwrap(), n.normalize("a b").unwrap());
    }

    #[test]
    fn test_normalize_rejects_empty() {
        assert!(matches!(
            normalizer().normalize(""),
            Err(CacheError::InvalidKey { .. })
        ));
    }

    #[test]
    fn test_normalize_rejects_oversized() {
        let long = "x".repeat(MAX_PHYSICAL_KEY_LEN + 1);
        assert!(matches!(
            normalizer().normalize(&long),
            Err(CacheError::InvalidKey { .. })
        ));
    }

    #[test]
    fn test_percent_input_cannot_alias_escapes() {
        // A literal "%3A" in a logical key must not collide with an
        // escaped ':'.
        let n = normalizer();
        assert_ne!(n.normalize("a:b").unwrap(), n.normalize("a%3Ab").unwrap());
    }

    #[test]
    fn test_namespace_validation() {
        assert!(KeyNormalizer::new("").is_err());
        assert!(KeyNormalizer::new("bad namespace").is_err());
        assert!(KeyNormalizer::new("warden-v2").is_ok());
    }

    proptest! {
        #[test]
        fn prop_normalize_injective(a in "[ -~]{1,60}", b in "[ -~]{1,60}") {
            prop_assume!(a != b);
            let n = normalizer();
            let ka = n.normalize(&a).unwrap();
            let kb = n.normalize(&b).unwrap();
            prop_assert_ne!(ka, kb);
        }

        #[test]
        fn prop_normalize_deterministic(key in "[ -~]{1,60}") {
            let n = normalizer();
            prop_assert_eq!(n.normalize(&key).unwrap(), n.normalize(&key).unwrap());
        }
    }
}
