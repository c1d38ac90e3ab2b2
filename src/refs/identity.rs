//! Stable element fingerprinting for change detection.
//!
//! [`IdentityHash`] is a pure function of an element's stable properties —
//! `tag`, `role`, `aria-label`, `name`, `id`, and a prefix of its text
//! content. Two elements with identical stable properties hash identically,
//! even across snapshots taken in different processes or at different
//! times — which `std::collections::hash_map::DefaultHasher` does not
//! guarantee in general, so this module hand-rolls a small FNV-1a
//! implementation rather than lean on an unspecified standard-library
//! hasher for a correctness property the crate actually depends on.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Number of leading characters of an element's text used in its identity
/// fingerprint.
const TEXT_PREFIX_LEN: usize = 32;

const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash = FNV_OFFSET_BASIS;
    for byte in bytes {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

/// A deterministic fingerprint of an element's unchanging attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IdentityHash(pub u64);

impl fmt::Display for IdentityHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

impl IdentityHash {
    /// Computes the identity hash for an element from its stable fields.
    #[must_use]
    pub fn compute(
        tag: &str,
        role: Option<&str>,
        aria_label: Option<&str>,
        name: Option<&str>,
        id: Option<&str>,
        text: Option<&str>,
    ) -> Self {
        let text_prefix: String = text
            .unwrap_or_default()
            .chars()
            .take(TEXT_PREFIX_LEN)
            .collect();

        let mut buf = String::new();
        buf.push_str(tag);
        buf.push('\u{1}');
        buf.push_str(role.unwrap_or_default());
        buf.push('\u{1}');
        buf.push_str(aria_label.unwrap_or_default());
        buf.push('\u{1}');
        buf.push_str(name.unwrap_or_default());
        buf.push('\u{1}');
        buf.push_str(id.unwrap_or_default());
        buf.push('\u{1}');
        buf.push_str(&text_prefix);

        Self(fnv1a(buf.as_bytes()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_stable_fields_hash_identically() {
        let a = IdentityHash::compute(
            "button",
            Some("button"),
            Some("Cancel Order"),
            None,
            Some("cancel-btn"),
            Some("Cancel Order"),
        );
        let b = IdentityHash::compute(
            "button",
            Some("button"),
            Some("Cancel Order"),
            None,
            Some("cancel-btn"),
            Some("Cancel Order"),
        );
        assert_eq!(a, b);
    }

    #[test]
    fn differing_fields_hash_differently() {
        let a = IdentityHash::compute("button", None, None, None, Some("a"), Some("Submit"));
        let b = IdentityHash::compute("button", None, None, None, Some("b"), Some("Submit"));
        assert_ne!(a, b);
    }
}
