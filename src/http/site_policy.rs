//! HTTP-level site policies: the governing configuration a destination
//! host is evaluated against.

use serde::{Deserialize, Serialize};

use super::sitemap::SitemapEntry;

/// The effect a site policy (or one of its rules) resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyDefault {
    /// Permit the request unconditionally.
    Allow,
    /// Forbid the request.
    Deny,
    /// Permit the request but strip credential headers and cookies.
    AllowPublic,
}

/// A rule mapping a sitemap entry's `semantic_action` to an effect.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpRule {
    /// The [`SitemapEntry::semantic_action`] this rule resolves.
    pub semantic_action: String,
    /// What matching requests resolve to.
    pub effect: PolicyDefault,
    /// Human-readable explanation, surfaced in [`super::filter::FilterDecision`].
    pub reason: String,
}

/// An explicit bypass: requests whose URL is prefixed by `url` (and whose
/// method matches, if specified) skip sitemap/rule resolution entirely.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllowedRequest {
    /// URL prefix to match against the request's URL.
    pub url: String,
    /// Required method, if any; unset matches any method.
    #[serde(default)]
    pub method: Option<String>,
}

/// A site's full HTTP-level policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SitePolicy {
    /// Human-readable name.
    pub name: String,
    /// Human-readable description.
    #[serde(default)]
    pub description: String,
    /// The effect applied when no sitemap entry and no explicit bypass
    /// matches a request.
    pub default: PolicyDefault,
    /// Hosts this policy is registered under (used for policy lookup).
    pub domains: Vec<String>,
    /// Additional hosts this policy permits as cross-origin destinations
    /// when it is the *current* domain's policy.
    #[serde(default)]
    pub allowed_domains: Vec<String>,
    /// Explicit request bypasses.
    #[serde(default)]
    pub allowed_requests: Vec<AllowedRequest>,
    /// Named rules keyed by sitemap `semantic_action`.
    #[serde(default)]
    pub rules: Vec<HttpRule>,
    /// The sitemap this policy's sitemap-matching layer consults.
    #[serde(default)]
    pub sitemap: Vec<SitemapEntry>,
}

impl SitePolicy {
    /// Whether `host` is one of this policy's registered domains.
    #[must_use]
    pub fn covers(&self, host: &str) -> bool {
        self.domains
            .iter()
            .any(|d| crate::intent::domain_matches(host, d))
    }

    /// Whether this policy admits `host` as an allowed cross-origin
    /// destination when it is the current domain's governing policy.
    #[must_use]
    pub fn admits(&self, host: &str) -> bool {
        self.allowed_domains
            .iter()
            .any(|d| crate::intent::domain_matches(host, d))
    }

    /// The rule for `semantic_action`, if one is declared.
    #[must_use]
    pub fn rule_for(&self, semantic_action: &str) -> Option<&HttpRule> {
        self.rules
            .iter()
            .find(|r| r.semantic_action == semantic_action)
    }

    /// The sitemap entry matching this request, by ascending priority,
    /// first match wins.
    #[must_use]
    pub fn matching_sitemap_entry(
        &self,
        method: &str,
        path: &str,
        body: Option<&serde_json::Value>,
        resource_type: Option<&str>,
    ) -> Option<&SitemapEntry> {
        let mut entries: Vec<&SitemapEntry> = self.sitemap.iter().collect();
        entries.sort_by_key(|e| e.priority);
        entries
            .into_iter()
            .find(|e| e.matches(method, path, body, resource_type).unwrap_or(false))
    }

    /// The first `allowed_requests` bypass matching `url`/`method`, if any.
    #[must_use]
    pub fn matching_allowed_request(&self, url: &str, method: &str) -> Option<&AllowedRequest> {
        self.allowed_requests.iter().find(|req| {
            url.starts_with(&req.url)
                && req
                    .method
                    .as_deref()
                    .is_none_or(|m| m.eq_ignore_ascii_case(method))
        })
    }
}
