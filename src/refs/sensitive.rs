//! Sensitive-action element detection.
//!
//! Flags elements whose label/text/aria-label/value suggests an
//! irreversible or high-consequence action (deletion, payment, account
//! closure, …) — independent of the policy engine's action-level checks.

use std::sync::LazyLock;

use regex::RegexSet;
use serde::{Deserialize, Serialize};

use super::snapshot::{Element, Snapshot};

const SENSITIVE_PATTERNS: &[&str] = &[
    r"(?i)\bdelete\b",
    r"(?i)\bremove\b",
    r"(?i)\brefund\b",
    r"(?i)\bcancel\s+(order|subscription|account)\b",
    r"(?i)\bpay\s*now\b",
    r"(?i)\bpurchase\b",
    r"(?i)\bsubmit\s+payment\b",
    r"(?i)\btransfer\s+(funds|money)\b",
    r"(?i)\bsend\s+money\b",
    r"(?i)\bconfirm\s+(delete|removal|payment)\b",
    r"(?i)\bpermanent(ly)?\b",
    r"(?i)\birreversible\b",
    r"(?i)\bclose\s+account\b",
    r"(?i)\brevoke\b",
];

static SENSITIVE_SET: LazyLock<RegexSet> =
    LazyLock::new(|| RegexSet::new(SENSITIVE_PATTERNS).expect("sensitive pattern set compiles"));

/// Result of checking a single element for sensitivity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensitivityCheck {
    /// Whether the element was flagged.
    pub sensitive: bool,
    /// The reason it was flagged (the pattern description), if any.
    pub reason: Option<String>,
}

/// Checks whether an element represents a sensitive action.
///
/// Inspects the concatenation of `label`, `text`, the `aria-label`
/// attribute, and the `value` attribute.
#[must_use]
pub fn is_sensitive(element: &Element) -> SensitivityCheck {
    let mut haystack = String::new();
    if let Some(label) = &element.label {
        haystack.push_str(label);
        haystack.push(' ');
    }
    if let Some(text) = &element.text {
        haystack.push_str(text);
        haystack.push(' ');
    }
    if let Some(aria) = element.attributes.get("aria-label") {
        haystack.push_str(aria);
        haystack.push(' ');
    }
    if let Some(value) = element.attributes.get("value") {
        haystack.push_str(value);
    }

    let matches = SENSITIVE_SET.matches(&haystack);
    if let Some(idx) = matches.iter().next() {
        SensitivityCheck {
            sensitive: true,
            reason: Some(format!("matched sensitive pattern: {}", SENSITIVE_PATTERNS[idx])),
        }
    } else {
        SensitivityCheck {
            sensitive: false,
            reason: None,
        }
    }
}

/// Returns every ref in `snapshot` flagged as sensitive, with its check
/// result.
#[must_use]
pub fn find_sensitive_elements(snapshot: &Snapshot) -> Vec<(u32, SensitivityCheck)> {
    let mut refs: Vec<u32> = snapshot.elements.keys().copied().collect();
    refs.sort_unstable();
    refs.into_iter()
        .filter_map(|r| {
            let check = is_sensitive(&snapshot.elements[&r]);
            check.sensitive.then_some((r, check))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn el(text: &str) -> Element {
        Element {
            tag: "button".to_string(),
            role: Some("button".to_string()),
            label: None,
            text: Some(text.to_string()),
            attributes: HashMap::new(),
        }
    }

    #[test]
    fn flags_destructive_actions() {
        assert!(is_sensitive(&el("Delete Account")).sensitive);
        assert!(is_sensitive(&el("Pay Now")).sensitive);
        assert!(is_sensitive(&el("Cancel subscription")).sensitive);
    }

    #[test]
    fn ignores_benign_actions() {
        assert!(!is_sensitive(&el("View details")).sensitive);
        assert!(!is_sensitive(&el("Add to cart")).sensitive);
    }
}
