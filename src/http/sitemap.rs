//! Sitemap entries: the mapping from concrete HTTP requests to named
//! semantic operations that policy rules fire against.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::pattern::{compile_url_pattern, PatternError};

/// One row of a site's sitemap.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SitemapEntry {
    /// Grouping label (e.g. `"account"`, `"checkout"`), for audit display.
    pub category: String,
    /// The named operation this entry maps requests to, e.g.
    /// `"submit-payment"`. Policy rules key off this name.
    pub semantic_action: String,
    /// The path/URL template this entry matches, e.g. `"/users/{id}"`.
    pub url_pattern: String,
    /// HTTP method this entry matches, compared case-insensitively.
    pub method: String,
    /// Required subtree of the request body: every key here must be
    /// present in the request body with an equal value, recursively.
    #[serde(default)]
    pub body_pattern: Option<Value>,
    /// Explicit regex overriding `url_pattern`'s compiled form, for
    /// matches the template language can't express.
    #[serde(default)]
    pub regex: Option<String>,
    /// If present, the request's resource type must be one of these.
    #[serde(default)]
    pub resource_types: Option<Vec<String>>,
    /// Evaluation priority; entries are tried in ascending order.
    pub priority: u32,
}

impl SitemapEntry {
    /// Whether this entry matches `method`, `path`, `body`, and
    /// `resource_type`.
    ///
    /// # Errors
    ///
    /// Returns [`PatternError`] if `url_pattern` fails to compile (the
    /// `regex` override, if present, is trusted as pre-validated).
    pub fn matches(
        &self,
        method: &str,
        path: &str,
        body: Option<&Value>,
        resource_type: Option<&str>,
    ) -> Result<bool, PatternError> {
        if !self.method.eq_ignore_ascii_case(method) {
            return Ok(false);
        }

        let url_matches = match &self.regex {
            Some(pattern) => regex::Regex::new(pattern)
                .map(|re| re.is_match(path))
                .unwrap_or(false),
            None => compile_url_pattern(&self.url_pattern)?.is_match(path),
        };
        if !url_matches {
            return Ok(false);
        }

        if let Some(pattern) = &self.body_pattern {
            match body {
                Some(body) if body_contains(body, pattern) => {}
                _ => return Ok(false),
            }
        }

        if let Some(types) = &self.resource_types {
            match resource_type {
                Some(rt) if types.iter().any(|t| t == rt) => {}
                _ => return Ok(false),
            }
        }

        Ok(true)
    }
}

/// Whether every key in `pattern` is present in `body` with an equal
/// value, recursing into nested objects.
fn body_contains(body: &Value, pattern: &Value) -> bool {
    match (body, pattern) {
        (Value::Object(body_map), Value::Object(pattern_map)) => {
            pattern_map.iter().all(|(key, expected)| {
                body_map
                    .get(key)
                    .is_some_and(|actual| body_contains(actual, expected))
            })
        }
        _ => body == pattern,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entry() -> SitemapEntry {
        SitemapEntry {
            category: "checkout".to_string(),
            semantic_action: "submit-payment".to_string(),
            url_pattern: "/api/checkout/{id}".to_string(),
            method: "POST".to_string(),
            body_pattern: Some(json!({"confirm": true})),
            regex: None,
            resource_types: None,
            priority: 10,
        }
    }

    #[test]
    fn matches_method_path_and_body_subtree() {
        let e = entry();
        let body = json!({"confirm": true, "amount": 42});
        assert!(e.matches("post", "/api/checkout/999", Some(&body), None).unwrap());
    }

    #[test]
    fn rejects_missing_body_key() {
        let e = entry();
        let body = json!({"amount": 42});
        assert!(!e.matches("POST", "/api/checkout/999", Some(&body), None).unwrap());
    }

    #[test]
    fn rejects_wrong_method() {
        let e = entry();
        let body = json!({"confirm": true});
        assert!(!e.matches("GET", "/api/checkout/999", Some(&body), None).unwrap());
    }
}
