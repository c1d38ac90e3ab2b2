//! Static pattern library backing the intent parser.
//!
//! One `std::sync::LazyLock` per pattern set, compiled once per process.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use unicode_normalization::UnicodeNormalization;

use crate::types::{SensitiveLabel, TaskType};

// ── Domain matching ─────────────────────────────────────────────────────

/// Normalizes a hostname for comparison: lower-cases, strips a trailing
/// dot, and applies Unicode NFKC normalization so visually confusable
/// code points (full-width Latin, compatibility characters) collapse to
/// the same form as their ASCII look-alikes before any comparison runs.
///
/// This does not defend against true homoglyph attacks across scripts
/// (Cyrillic `а` vs. Latin `a` remain distinct code points under NFKC);
/// it closes the cheaper compatibility-character class of lookalike.
#[must_use]
fn normalize_host(host: &str) -> String {
    host.trim_end_matches('.').nfkc().collect::<String>().to_lowercase()
}

/// Whether `host` is covered by `allowed` under subdomain-matching
/// semantics: exact match, or `host` ends with `.{allowed}`.
///
/// This is the one definition of domain membership used throughout the
/// crate (policy engine, HTTP filter, intent). Comparison is
/// case-insensitive and Unicode-normalized; trailing dots are stripped
/// first.
#[must_use]
pub fn domain_matches(host: &str, allowed: &str) -> bool {
    let host = normalize_host(host);
    let allowed = normalize_host(allowed);
    if allowed.is_empty() {
        return false;
    }
    host == allowed || host.ends_with(&format!(".{allowed}"))
}

/// Whether any member of `set` covers `host`.
#[must_use]
pub fn domain_in_set<'a>(host: &str, set: impl IntoIterator<Item = &'a String>) -> bool {
    set.into_iter().any(|allowed| domain_matches(host, allowed))
}

/// Extracts the host from an `http(s)://host[:port][/...]` URL, lower-cased.
#[must_use]
pub fn extract_host(url: &str) -> Option<String> {
    let rest = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))?;
    let host_and_port = rest.split(['/', '?', '#']).next().unwrap_or(rest);
    let host = host_and_port.split(':').next().unwrap_or(host_and_port);
    if host.is_empty() {
        None
    } else {
        Some(host.to_lowercase())
    }
}

/// Fixed TLD allowlist for bare `name.tld` host detection in free text.
pub const KNOWN_TLDS: &[&str] = &[
    "com", "org", "net", "io", "dev", "co", "app", "ai", "gov", "edu", "shop", "store",
];

static BARE_HOST_RE: LazyLock<Regex> = LazyLock::new(|| {
    let tlds = KNOWN_TLDS.join("|");
    Regex::new(&format!(
        r"(?i)\b([a-z0-9][a-z0-9-]*(?:\.[a-z0-9][a-z0-9-]*)*\.(?:{tlds}))\b"
    ))
    .expect("bare host pattern compiles")
});

static EXPLICIT_URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)https?://([a-z0-9.-]+)").expect("url pattern compiles"));

/// Hostnames mentioned as `http(s)://host` occurrences in free text.
#[must_use]
pub fn explicit_url_hosts(text: &str) -> Vec<String> {
    EXPLICIT_URL_RE
        .captures_iter(text)
        .filter_map(|c| c.get(1).map(|m| m.as_str().to_lowercase()))
        .collect()
}

/// Bare `name.tld` hostnames mentioned in free text (not part of a URL).
#[must_use]
pub fn bare_hosts(text: &str) -> Vec<String> {
    BARE_HOST_RE
        .find_iter(text)
        .map(|m| m.as_str().to_lowercase())
        .collect()
}

/// Well-known CDN/API companion hosts for a small set of anchor domains.
///
/// Extendable by callers via `ParseOptions::extra_companions`.
pub static ANCHOR_COMPANIONS: LazyLock<HashMap<&'static str, &'static [&'static str]>> =
    LazyLock::new(|| {
        HashMap::from([
            (
                "github.com",
                &["api.github.com", "raw.githubusercontent.com", "githubusercontent.com"][..],
            ),
            ("gitlab.com", &["gitlab.com"][..]),
            (
                "google.com",
                &["www.googleapis.com", "accounts.google.com"][..],
            ),
            ("amazon.com", &["images-amazon.com", "ssl-images-amazon.com"][..]),
        ])
    });

/// Default domain set for search tasks when no domain is otherwise derived.
pub const SEARCH_ENGINE_DOMAINS: &[&str] = &["google.com", "www.google.com", "bing.com", "www.bing.com"];

// ── Task-type detection ─────────────────────────────────────────────────

static TASK_TYPE_PATTERNS: LazyLock<Vec<(TaskType, Regex)>> = LazyLock::new(|| {
    vec![
        (
            TaskType::Login,
            Regex::new(r"(?i)\b(log\s*in|sign\s*in|authenticate)\b").unwrap(),
        ),
        (
            TaskType::Purchase,
            Regex::new(r"(?i)\b(buy|purchase|checkout|order|add\s+to\s+cart)\b").unwrap(),
        ),
        (
            TaskType::Monitor,
            Regex::new(r"(?i)\b(monitor|watch\s+for|alert\s+me|notify\s+me|keep\s+an\s+eye)\b")
                .unwrap(),
        ),
        (
            TaskType::Interact,
            Regex::new(r"(?i)\b(fill\s+out|submit|post\s+a|reply\s+to|comment\s+on)\b").unwrap(),
        ),
        (
            TaskType::Search,
            Regex::new(r"(?i)\b(search|find|look\s+up|look\s+for)\b").unwrap(),
        ),
    ]
});

/// First-match task-type detection over an ordered pattern list. Default is
/// [`TaskType::Extract`].
#[must_use]
pub fn detect_task_type(text: &str) -> TaskType {
    for (task_type, pattern) in TASK_TYPE_PATTERNS.iter() {
        if pattern.is_match(text) {
            return *task_type;
        }
    }
    TaskType::Extract
}

// ── Sensitive-data detection ────────────────────────────────────────────

static SENSITIVE_PATTERNS: LazyLock<Vec<(SensitiveLabel, Regex)>> = LazyLock::new(|| {
    vec![
        (
            SensitiveLabel::Ssn,
            Regex::new(r"\b\d{3}-\d{2}-\d{4}\b").unwrap(),
        ),
        (
            SensitiveLabel::CreditCard,
            Regex::new(r"\b(?:\d[ -]?){16}\b").unwrap(),
        ),
        (
            SensitiveLabel::Email,
            Regex::new(r"(?i)\b[a-z0-9._%+-]+@[a-z0-9.-]+\.[a-z]{2,}\b").unwrap(),
        ),
        (
            SensitiveLabel::Password,
            Regex::new(r"(?i)\bpassword\s*[:=]?\s*\S+").unwrap(),
        ),
        (
            SensitiveLabel::ApiKey,
            Regex::new(r"(?i)\bapi[_-]?key\b").unwrap(),
        ),
        (
            SensitiveLabel::Secret,
            Regex::new(r"(?i)\bsecret\b").unwrap(),
        ),
    ]
});

/// Detects sensitive-data labels present in free text, plus any
/// caller-supplied custom `(label_name, regex_source)` patterns.
///
/// Custom patterns that don't compile are skipped rather than causing the
/// whole detection pass to fail — malformed caller input should degrade
/// gracefully, not break intent parsing.
#[must_use]
pub fn detect_sensitive_labels(
    text: &str,
    extra_patterns: &[(String, String)],
) -> std::collections::BTreeSet<SensitiveLabel> {
    let mut labels = std::collections::BTreeSet::new();
    for (label, pattern) in SENSITIVE_PATTERNS.iter() {
        if pattern.is_match(text) {
            labels.insert(*label);
        }
    }
    for (name, source) in extra_patterns {
        if let Ok(re) = Regex::new(source) {
            if re.is_match(text) {
                if let Some(label) = custom_label_from_name(name) {
                    labels.insert(label);
                }
            }
        }
    }
    labels
}

fn custom_label_from_name(name: &str) -> Option<SensitiveLabel> {
    match name.to_lowercase().as_str() {
        "password" => Some(SensitiveLabel::Password),
        "credit_card" => Some(SensitiveLabel::CreditCard),
        "ssn" => Some(SensitiveLabel::Ssn),
        "email" => Some(SensitiveLabel::Email),
        "api_key" => Some(SensitiveLabel::ApiKey),
        "secret" => Some(SensitiveLabel::Secret),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subdomain_matching() {
        assert!(domain_matches("www.github.com", "github.com"));
        assert!(domain_matches("github.com", "github.com"));
        assert!(!domain_matches("github.com.attacker.com", "github.com"));
        assert!(!domain_matches("githubcom.org", "github.com"));
    }

    #[test]
    fn nfkc_normalization_collapses_compatibility_characters() {
        // U+FF47 FULLWIDTH LATIN SMALL LETTER G decomposes to ASCII 'g' under NFKC.
        let fullwidth = "\u{FF47}ithub.com";
        assert!(domain_matches(fullwidth, "github.com"));
    }

    #[test]
    fn task_type_detection_defaults_to_extract() {
        assert_eq!(detect_task_type("tell me about rust"), TaskType::Extract);
        assert_eq!(detect_task_type("please log in to my account"), TaskType::Login);
        assert_eq!(detect_task_type("search for RTX 5090 prices"), TaskType::Search);
    }

    #[test]
    fn explicit_and_bare_host_detection() {
        assert_eq!(
            explicit_url_hosts("check https://gitlab.com/issues"),
            vec!["gitlab.com"]
        );
        assert_eq!(bare_hosts("prices on newegg.com today"), vec!["newegg.com"]);
    }

    #[test]
    fn sensitive_detection_finds_ssn_and_email() {
        let labels = detect_sensitive_labels("my ssn is 123-45-6789 email a@b.com", &[]);
        assert!(labels.contains(&SensitiveLabel::Ssn));
        assert!(labels.contains(&SensitiveLabel::Email));
    }
}
