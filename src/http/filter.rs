//! The HTTP request filter: the independent second line of defense
//! against exfiltration, mediating the fetch side of the tool surface.

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::types::Intent;

use super::site_policy::{PolicyDefault, SitePolicy};

/// Errors from HTTP-filter configuration loading or evaluation.
#[derive(Debug, Error)]
pub enum HttpFilterError {
    /// A site policy document failed to parse.
    #[error("invalid site policy document: {0}")]
    InvalidPolicy(String),

    /// A request's URL had no parseable host.
    #[error("request URL '{0}' has no parseable host")]
    UnparseableUrl(String),
}

/// An outbound HTTP request as seen by the filter.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HttpRequest {
    /// Full destination URL.
    pub url: String,
    /// HTTP method, default `GET`.
    #[serde(default = "default_method")]
    pub method: String,
    /// Request headers.
    #[serde(default)]
    pub headers: HashMap<String, String>,
    /// Raw request body, if any.
    #[serde(default)]
    pub body: Option<String>,
    /// The tool-surface resource type this request represents (e.g.
    /// `"xhr"`, `"document"`, `"script"`), if known.
    #[serde(default)]
    pub resource_type: Option<String>,
}

fn default_method() -> String {
    "GET".to_string()
}

/// Header names stripped when a request resolves to `allow_public` or
/// an explicit `strip_cookies` configuration.
pub const CREDENTIAL_HEADERS: &[&str] = &["Cookie", "cookie", "Authorization", "authorization"];

impl HttpRequest {
    fn parsed_body(&self) -> Option<Value> {
        let body = self.body.as_deref()?;
        if let Ok(json) = serde_json::from_str::<Value>(body) {
            return Some(json);
        }
        let mut map = serde_json::Map::new();
        for pair in body.split('&') {
            if pair.is_empty() {
                continue;
            }
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            map.insert(key.to_string(), Value::String(value.to_string()));
        }
        if map.is_empty() {
            None
        } else {
            Some(Value::Object(map))
        }
    }

    /// Headers with credential headers removed.
    #[must_use]
    pub fn stripped_headers(&self) -> HashMap<String, String> {
        let mut headers = self.headers.clone();
        for name in CREDENTIAL_HEADERS {
            headers.remove(*name);
        }
        headers
    }
}

/// The outcome of filtering one request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterDecision {
    /// Whether the request may proceed.
    pub allowed: bool,
    /// Human-readable explanation.
    pub reason: String,
    /// Whether credential headers/cookies should be stripped before the
    /// request is sent.
    pub strip_cookies: bool,
    /// The sitemap entry's `semantic_action` that produced this decision,
    /// if a sitemap match was involved.
    pub matched_semantic_action: Option<String>,
}

impl FilterDecision {
    fn deny(reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            reason: reason.into(),
            strip_cookies: false,
            matched_semantic_action: None,
        }
    }

    fn from_effect(effect: PolicyDefault, reason: impl Into<String>, semantic_action: Option<String>) -> Self {
        Self {
            allowed: effect != PolicyDefault::Deny,
            reason: reason.into(),
            strip_cookies: effect == PolicyDefault::AllowPublic,
            matched_semantic_action: semantic_action,
        }
    }
}

/// The tracked predicted allowlist, set by `set_predicted_allowlist`.
#[derive(Debug, Clone, Default)]
struct PredictedAllowlist {
    domains: BTreeSet<String>,
    active: bool,
}

/// Mediates outbound HTTP requests against loaded site policies.
#[derive(Default)]
pub struct HttpFilter {
    policies: Vec<SitePolicy>,
    predicted_allowlist: PredictedAllowlist,
}

impl HttpFilter {
    /// An empty filter with no policies loaded.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers (or replaces, by name) a site policy.
    pub fn load_policy(&mut self, policy: SitePolicy) {
        self.policies.retain(|p| p.name != policy.name);
        self.policies.push(policy);
    }

    /// Appends sitemap entries to the named policy.
    ///
    /// # Errors
    ///
    /// Returns [`HttpFilterError::InvalidPolicy`] if no policy with that
    /// name is loaded.
    pub fn load_sitemap(
        &mut self,
        policy_name: &str,
        entries: Vec<super::sitemap::SitemapEntry>,
    ) -> Result<(), HttpFilterError> {
        let policy = self
            .policies
            .iter_mut()
            .find(|p| p.name == policy_name)
            .ok_or_else(|| HttpFilterError::InvalidPolicy(format!("no policy named '{policy_name}'")))?;
        policy.sitemap.extend(entries);
        Ok(())
    }

    /// Appends rules to the named policy.
    ///
    /// # Errors
    ///
    /// Returns [`HttpFilterError::InvalidPolicy`] if no policy with that
    /// name is loaded.
    pub fn load_rules(
        &mut self,
        policy_name: &str,
        rules: Vec<super::site_policy::HttpRule>,
    ) -> Result<(), HttpFilterError> {
        let policy = self
            .policies
            .iter_mut()
            .find(|p| p.name == policy_name)
            .ok_or_else(|| HttpFilterError::InvalidPolicy(format!("no policy named '{policy_name}'")))?;
        policy.rules.extend(rules);
        Ok(())
    }

    /// Sets the predicted allowlist: hosts expected to be contacted, and
    /// whether enforcement of it is active.
    pub fn set_predicted_allowlist(&mut self, domains: BTreeSet<String>, active: bool) {
        self.predicted_allowlist = PredictedAllowlist { domains, active };
    }

    fn policy_for(&self, host: &str) -> Option<&SitePolicy> {
        self.policies
            .iter()
            .filter(|p| p.covers(host))
            .max_by_key(|p| {
                p.domains
                    .iter()
                    .filter(|d| crate::intent::domain_matches(host, d))
                    .map(String::len)
                    .max()
                    .unwrap_or(0)
            })
    }

    /// Evaluates `request`, optionally in the context of `current_domain`
    /// (the domain the request originates from).
    ///
    /// # Errors
    ///
    /// Returns [`HttpFilterError::UnparseableUrl`] if the request URL has
    /// no parseable host.
    #[tracing::instrument(skip(self, request), fields(url = %request.url, method = %request.method))]
    pub fn filter(
        &self,
        request: &HttpRequest,
        current_domain: Option<&str>,
    ) -> Result<FilterDecision, HttpFilterError> {
        let host = crate::intent::patterns::extract_host(&request.url)
            .ok_or_else(|| HttpFilterError::UnparseableUrl(request.url.clone()))?;

        if self.predicted_allowlist.active
            && !self
                .predicted_allowlist
                .domains
                .iter()
                .any(|d| crate::intent::domain_matches(&host, d))
        {
            let current_admits = current_domain
                .and_then(|cd| self.policy_for(cd))
                .is_some_and(|p| p.admits(&host));
            if !current_admits {
                tracing::warn!(host = %host, "destination outside predicted allowlist");
                return Ok(FilterDecision::deny(format!(
                    "'{host}' is not in the predicted allowlist"
                )));
            }
        }

        let dest_policy = self.policy_for(&host);
        let current_policy = current_domain.and_then(|cd| self.policy_for(cd));

        // A destination's own policy governs first; absent that, the
        // current domain's policy governs if it explicitly admits the
        // destination as an allowed cross-origin target.
        let governing = dest_policy.or_else(|| current_policy.filter(|p| p.admits(&host)));

        let Some(policy) = governing else {
            tracing::warn!(host = %host, "no governing policy for destination");
            return Ok(FilterDecision::deny(format!(
                "no policy covers destination '{host}' and the current domain's policy does not admit it"
            )));
        };

        let path = request
            .url
            .split_once("://")
            .map(|(_, rest)| rest)
            .and_then(|rest| rest.split_once('/'))
            .map(|(_, path)| format!("/{path}"))
            .unwrap_or_else(|| "/".to_string());
        let body = request.parsed_body();

        if let Some(entry) = policy.matching_sitemap_entry(
            &request.method,
            &path,
            body.as_ref(),
            request.resource_type.as_deref(),
        ) {
            return Ok(match policy.rule_for(&entry.semantic_action) {
                Some(rule) => FilterDecision::from_effect(
                    rule.effect,
                    rule.reason.clone(),
                    Some(entry.semantic_action.clone()),
                ),
                None => FilterDecision::from_effect(
                    policy.default,
                    format!(
                        "no rule for '{}', falling back to policy default",
                        entry.semantic_action
                    ),
                    Some(entry.semantic_action.clone()),
                ),
            });
        }

        if policy.matching_allowed_request(&request.url, &request.method).is_some() {
            return Ok(FilterDecision {
                allowed: true,
                reason: "matched an explicit allowed_requests bypass".to_string(),
                strip_cookies: policy.default == PolicyDefault::AllowPublic,
                matched_semantic_action: None,
            });
        }

        Ok(FilterDecision::from_effect(
            policy.default,
            "no sitemap or bypass match, falling back to policy default",
            None,
        ))
    }
}

/// Expands an intent's allowed domains with their known CDN/API companion
/// hosts, for use as a predicted allowlist.
#[must_use]
pub fn predict_allowlist_from_intent(intent: &Intent) -> BTreeSet<String> {
    let mut domains: BTreeSet<String> = intent.allowed_domains.clone();
    for domain in &intent.allowed_domains {
        if let Some(companions) = crate::intent::patterns::ANCHOR_COMPANIONS.get(domain.as_str()) {
            domains.extend(companions.iter().map(|s| (*s).to_string()));
        }
    }
    domains
}

/// Builds a filter from `intent`: activates a predicted allowlist derived
/// from [`predict_allowlist_from_intent`], and installs a default policy
/// per allowed domain — `allow_public` for `extract` tasks (stripping
/// credentials by default), `allow` otherwise.
#[must_use]
pub fn filter_from_intent(intent: &Intent) -> HttpFilter {
    let mut filter = HttpFilter::new();
    let allowlist = predict_allowlist_from_intent(intent);
    filter.set_predicted_allowlist(allowlist, true);

    let default = if intent.task_type == crate::types::TaskType::Extract {
        PolicyDefault::AllowPublic
    } else {
        PolicyDefault::Allow
    };

    for domain in &intent.allowed_domains {
        filter.load_policy(SitePolicy {
            name: domain.clone(),
            description: format!("default policy for {domain}"),
            default,
            domains: vec![domain.clone()],
            allowed_domains: vec![],
            allowed_requests: vec![],
            rules: vec![],
            sitemap: vec![],
        });
    }

    filter
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TaskType;
    use chrono::Utc;

    fn intent(domains: &[&str], task_type: TaskType) -> Intent {
        Intent {
            goal: "goal".to_string(),
            task_type,
            allowed_domains: domains.iter().map(|d| (*d).to_string()).collect(),
            allowed_actions: BTreeSet::new(),
            sensitive_data: BTreeSet::new(),
            max_depth: 5,
            timeout_ms: 30_000,
            original_request: "r".to_string(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn denies_destination_outside_predicted_allowlist() {
        let filter = filter_from_intent(&intent(&["newegg.com"], TaskType::Search));
        let req = HttpRequest {
            url: "https://evil.example/steal".to_string(),
            ..Default::default()
        };
        let decision = filter.filter(&req, None).unwrap();
        assert!(!decision.allowed);
    }

    #[test]
    fn allows_request_to_registered_domain() {
        let filter = filter_from_intent(&intent(&["newegg.com"], TaskType::Search));
        let req = HttpRequest {
            url: "https://www.newegg.com/search?q=gpu".to_string(),
            ..Default::default()
        };
        let decision = filter.filter(&req, None).unwrap();
        assert!(decision.allowed);
    }

    #[test]
    fn extract_task_default_strips_cookies() {
        let filter = filter_from_intent(&intent(&["example.com"], TaskType::Extract));
        let req = HttpRequest {
            url: "https://example.com/page".to_string(),
            ..Default::default()
        };
        let decision = filter.filter(&req, None).unwrap();
        assert!(decision.allowed);
        assert!(decision.strip_cookies);
    }

    #[test]
    fn sitemap_rule_overrides_policy_default() {
        let mut filter = HttpFilter::new();
        filter.load_policy(SitePolicy {
            name: "shop.example".to_string(),
            description: String::new(),
            default: PolicyDefault::Allow,
            domains: vec!["shop.example".to_string()],
            allowed_domains: vec![],
            allowed_requests: vec![],
            rules: vec![super::super::site_policy::HttpRule {
                semantic_action: "submit-payment".to_string(),
                effect: PolicyDefault::Deny,
                reason: "payments require confirmation".to_string(),
            }],
            sitemap: vec![super::super::sitemap::SitemapEntry {
                category: "checkout".to_string(),
                semantic_action: "submit-payment".to_string(),
                url_pattern: "/checkout".to_string(),
                method: "POST".to_string(),
                body_pattern: None,
                regex: None,
                resource_types: None,
                priority: 0,
            }],
        });
        let req = HttpRequest {
            url: "https://shop.example/checkout".to_string(),
            method: "POST".to_string(),
            ..Default::default()
        };
        let decision = filter.filter(&req, None).unwrap();
        assert!(!decision.allowed);
        assert_eq!(decision.matched_semantic_action.as_deref(), Some("submit-payment"));
    }

    #[test]
    fn strips_credential_headers() {
        let mut headers = HashMap::new();
        headers.insert("Cookie".to_string(), "session=1".to_string());
        headers.insert("Accept".to_string(), "*/*".to_string());
        let req = HttpRequest {
            url: "https://example.com".to_string(),
            headers,
            ..Default::default()
        };
        let stripped = req.stripped_headers();
        assert!(!stripped.contains_key("Cookie"));
        assert!(stripped.contains_key("Accept"));
    }
}
