//! Versioned element snapshots and the ref manager.

use std::collections::{HashMap, VecDeque};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::identity::IdentityHash;

/// Default number of historical snapshots retained for diagnostics.
pub const DEFAULT_HISTORY_LIMIT: usize = 5;

/// One element observed on a page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Element {
    /// HTML tag name, lower-cased (e.g. `"button"`).
    pub tag: String,
    /// ARIA role, if any.
    pub role: Option<String>,
    /// Visible or accessible label text.
    pub label: Option<String>,
    /// Element's text content.
    pub text: Option<String>,
    /// Arbitrary attributes (`id`, `name`, `aria-label`, `value`, `class`, …).
    pub attributes: HashMap<String, String>,
}

impl Element {
    /// Computes this element's [`IdentityHash`] from its stable properties.
    #[must_use]
    pub fn identity_hash(&self) -> IdentityHash {
        IdentityHash::compute(
            &self.tag,
            self.role.as_deref(),
            self.attributes.get("aria-label").map(String::as_str),
            self.attributes.get("name").map(String::as_str),
            self.attributes.get("id").map(String::as_str),
            self.text.as_deref(),
        )
    }
}

/// A versioned view of observed page elements.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    /// Monotonic version number.
    pub version: u32,
    /// When this snapshot was taken.
    pub timestamp: DateTime<Utc>,
    /// The page URL at the time of capture.
    pub url: String,
    /// Elements keyed by their 1-indexed ref within this snapshot.
    pub elements: HashMap<u32, Element>,
}

/// The pair `version:ref` used to address an element safely across
/// snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VersionedRef {
    /// Snapshot version component.
    pub version: u32,
    /// 1-indexed ref within that snapshot.
    pub ref_id: u32,
}

impl VersionedRef {
    /// Parses a `"version:ref"` string.
    ///
    /// # Errors
    ///
    /// Returns [`RefError::Malformed`] if the string isn't `u32:u32`.
    pub fn parse(s: &str) -> Result<Self, RefError> {
        let (version_str, ref_str) = s.split_once(':').ok_or_else(|| RefError::Malformed {
            input: s.to_string(),
        })?;
        let version = version_str.parse().map_err(|_| RefError::Malformed {
            input: s.to_string(),
        })?;
        let ref_id = ref_str.parse().map_err(|_| RefError::Malformed {
            input: s.to_string(),
        })?;
        Ok(Self { version, ref_id })
    }
}

impl std::fmt::Display for VersionedRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.version, self.ref_id)
    }
}

/// Errors from ref-manager operations.
#[derive(Debug, Error)]
pub enum RefError {
    /// The ref string wasn't `"version:ref"` with integer components.
    #[error("malformed versioned ref: '{input}'")]
    Malformed {
        /// The offending input string.
        input: String,
    },

    /// The ref references a version other than the current one.
    #[error("stale ref: requested version {requested_version}, current version is {current_version}")]
    Stale {
        /// The version the caller requested.
        requested_version: u32,
        /// The version the ref manager is currently on.
        current_version: u32,
    },

    /// The ref doesn't exist within its (current) snapshot.
    #[error("ref {ref_id} not found in snapshot version {version}")]
    NotFound {
        /// Snapshot version searched.
        version: u32,
        /// Ref id searched for.
        ref_id: u32,
    },
}

/// The result of validating a versioned ref string.
#[derive(Debug, Clone)]
pub struct RefValidation<'a> {
    /// Whether the ref currently resolves to a live element.
    pub valid: bool,
    /// The resolved element, if `valid`.
    pub element: Option<&'a Element>,
    /// The reason validation failed, if not `valid`.
    pub error: Option<RefError>,
}

/// Holds a monotonically versioned history of element snapshots.
pub struct RefManager {
    current_version: u32,
    history: VecDeque<Snapshot>,
    history_limit: usize,
}

impl Default for RefManager {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LIMIT)
    }
}

impl RefManager {
    /// Creates a ref manager retaining up to `history_limit` snapshots.
    #[must_use]
    pub fn new(history_limit: usize) -> Self {
        Self {
            current_version: 0,
            history: VecDeque::new(),
            history_limit: history_limit.max(1),
        }
    }

    /// The current (latest) snapshot version, or `0` before any snapshot has
    /// been created.
    #[must_use]
    pub fn current_version(&self) -> u32 {
        self.current_version
    }

    /// Takes a new snapshot of `elements` observed at `url`, incrementing the
    /// version counter and assigning 1-indexed refs in iteration order.
    ///
    /// Evicts the oldest retained snapshot (lowest version) if the history
    /// exceeds `history_limit`.
    pub fn create_snapshot(&mut self, url: impl Into<String>, elements: Vec<Element>) -> &Snapshot {
        self.current_version += 1;
        let map = elements
            .into_iter()
            .enumerate()
            .map(|(i, el)| (u32::try_from(i + 1).unwrap_or(u32::MAX), el))
            .collect();

        let snapshot = Snapshot {
            version: self.current_version,
            timestamp: Utc::now(),
            url: url.into(),
            elements: map,
        };

        self.history.push_back(snapshot);
        while self.history.len() > self.history_limit {
            self.history.pop_front();
        }

        self.history.back().expect("just pushed")
    }

    /// The current (latest) snapshot, if one has been created.
    #[must_use]
    pub fn current_snapshot(&self) -> Option<&Snapshot> {
        self.history.back()
    }

    /// A historical snapshot by version, if still retained.
    #[must_use]
    pub fn snapshot(&self, version: u32) -> Option<&Snapshot> {
        self.history.iter().find(|s| s.version == version)
    }

    /// Validates a `"version:ref"` string. Only the current version is ever
    /// valid — any other version is stale, even if still retained in
    /// history for diagnostics.
    #[must_use]
    pub fn validate_ref(&self, s: &str) -> RefValidation<'_> {
        let parsed = match VersionedRef::parse(s) {
            Ok(v) => v,
            Err(e) => {
                return RefValidation {
                    valid: false,
                    element: None,
                    error: Some(e),
                };
            }
        };

        if parsed.version != self.current_version {
            return RefValidation {
                valid: false,
                element: None,
                error: Some(RefError::Stale {
                    requested_version: parsed.version,
                    current_version: self.current_version,
                }),
            };
        }

        match self
            .current_snapshot()
            .and_then(|snap| snap.elements.get(&parsed.ref_id))
        {
            Some(element) => RefValidation {
                valid: true,
                element: Some(element),
                error: None,
            },
            None => RefValidation {
                valid: false,
                element: None,
                error: Some(RefError::NotFound {
                    version: parsed.version,
                    ref_id: parsed.ref_id,
                }),
            },
        }
    }

    /// Renders a compact textual view of a snapshot for LLM consumption:
    /// one line per element, `ref=V:R role "label" text="…" [attrs]`,
    /// truncated to `max_elements` with a trailing note if exceeded.
    #[must_use]
    pub fn format_for_llm(&self, snapshot: Option<&Snapshot>, max_elements: usize) -> String {
        let Some(snapshot) = snapshot.or_else(|| self.current_snapshot()) else {
            return String::new();
        };

        let mut refs: Vec<u32> = snapshot.elements.keys().copied().collect();
        refs.sort_unstable();

        let mut lines = Vec::new();
        for &ref_id in refs.iter().take(max_elements) {
            let el = &snapshot.elements[&ref_id];
            let role = el.role.as_deref().unwrap_or("generic");
            let label = el.label.as_deref().unwrap_or("");
            let text = el.text.as_deref().unwrap_or("");
            let mut attrs: Vec<String> = el
                .attributes
                .iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect();
            attrs.sort();
            let attrs_str = if attrs.is_empty() {
                String::new()
            } else {
                format!(" [{}]", attrs.join(" "))
            };
            lines.push(format!(
                "ref={}:{ref_id} {role} \"{label}\" text=\"{text}\"{attrs_str}",
                snapshot.version
            ));
        }

        if refs.len() > max_elements {
            lines.push(format!(
                "... {} more elements truncated",
                refs.len() - max_elements
            ));
        }

        lines.join("\n")
    }

    /// Compares the identity hash of the element at `old_ref` (in its
    /// original snapshot) against the element at the same ref number in
    /// `current_snapshot`.
    ///
    /// Returns `true` if the element is gone, or its identity hash changed.
    #[must_use]
    pub fn has_element_changed(&self, old_ref: &str, current_snapshot: &Snapshot) -> bool {
        let Ok(parsed) = VersionedRef::parse(old_ref) else {
            return true;
        };
        let Some(old_snapshot) = self.snapshot(parsed.version) else {
            return true;
        };
        let Some(old_element) = old_snapshot.elements.get(&parsed.ref_id) else {
            return true;
        };
        match current_snapshot.elements.get(&parsed.ref_id) {
            Some(current_element) => {
                old_element.identity_hash() != current_element.identity_hash()
            }
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn el(tag: &str, text: &str) -> Element {
        Element {
            tag: tag.to_string(),
            role: None,
            label: None,
            text: Some(text.to_string()),
            attributes: HashMap::new(),
        }
    }

    #[test]
    fn stale_ref_after_page_mutation() {
        let mut mgr = RefManager::default();
        mgr.create_snapshot("https://shop.example/cart", vec![el("button", "Cancel Order")]);
        mgr.create_snapshot("https://shop.example/cart", vec![el("button", "Cancel Order")]);

        let validation = mgr.validate_ref("1:1");
        assert!(!validation.valid);
        let msg = validation.error.unwrap().to_string();
        assert!(msg.contains("stale"));
    }

    #[test]
    fn current_version_ref_is_valid() {
        let mut mgr = RefManager::default();
        mgr.create_snapshot("https://example.com", vec![el("a", "Home")]);
        let validation = mgr.validate_ref("1:1");
        assert!(validation.valid);
        assert_eq!(validation.element.unwrap().tag, "a");
    }

    #[test]
    fn history_is_bounded() {
        let mut mgr = RefManager::new(2);
        for i in 0..5 {
            mgr.create_snapshot("https://example.com", vec![el("div", &i.to_string())]);
        }
        assert_eq!(mgr.current_version(), 5);
        assert!(mgr.snapshot(3).is_none());
        assert!(mgr.snapshot(5).is_some());
    }

    #[test]
    fn format_for_llm_truncates_with_marker() {
        let mut mgr = RefManager::default();
        let elements: Vec<Element> = (0..5).map(|i| el("li", &format!("item {i}"))).collect();
        mgr.create_snapshot("https://example.com", elements);
        let out = mgr.format_for_llm(None, 2);
        assert!(out.contains("3 more elements truncated"));
    }

    #[test]
    fn identical_properties_same_hash_across_snapshots() {
        let mut mgr = RefManager::default();
        let snap1 = mgr.create_snapshot("https://example.com", vec![el("button", "Cancel Order")]);
        let hash1 = snap1.elements[&1].identity_hash();
        let snap2 = mgr.create_snapshot("https://example.com", vec![el("button", "Cancel Order")]);
        let hash2 = snap2.elements[&1].identity_hash();
        assert_eq!(hash1, hash2);
    }
}
