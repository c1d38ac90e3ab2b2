//! Intent validation rules.
//!
//! Shared by the parser (which validates what it just produced) and by
//! callers that want to re-validate an `Intent` built or edited elsewhere —
//! there is exactly one rule table, consulted both times.

use crate::types::{Intent, SensitiveLabel, TaskType};

/// The outcome of validating an [`Intent`].
#[derive(Debug, Clone)]
pub struct ValidationReport {
    /// Whether the intent satisfies every invariant.
    pub valid: bool,
    /// Human-readable descriptions of every violated invariant.
    pub issues: Vec<String>,
}

/// Validates an intent against the invariants in the data model:
///
/// - `allowed_domains` non-empty
/// - every domain is more than 3 characters and not the literal `*`
/// - `timeout_ms <= 300_000`
/// - a `login` task forbids the `password` sensitive label
/// - a `purchase` task forbids the `credit_card` sensitive label
#[must_use]
pub fn validate_intent(intent: &Intent) -> ValidationReport {
    let mut issues = Vec::new();

    if intent.allowed_domains.is_empty() {
        issues.push("allowed_domains must not be empty".to_string());
    }

    for domain in &intent.allowed_domains {
        if domain == "*" {
            issues.push("allowed_domains must not contain the literal wildcard '*'".to_string());
        } else if domain.len() <= 3 {
            issues.push(format!("domain '{domain}' is too short (must be > 3 chars)"));
        }
    }

    if intent.timeout_ms > 300_000 {
        issues.push(format!(
            "timeout_ms {} exceeds the 300000ms ceiling",
            intent.timeout_ms
        ));
    }

    if intent.task_type == TaskType::Login && intent.sensitive_data.contains(&SensitiveLabel::Password)
    {
        issues.push("login task_type forbids a detected 'password' sensitive label".to_string());
    }

    if intent.task_type == TaskType::Purchase
        && intent.sensitive_data.contains(&SensitiveLabel::CreditCard)
    {
        issues.push(
            "purchase task_type forbids a detected 'credit_card' sensitive label".to_string(),
        );
    }

    ValidationReport {
        valid: issues.is_empty(),
        issues,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Action;
    use std::collections::BTreeSet;

    fn base_intent() -> Intent {
        Intent {
            goal: "test".to_string(),
            task_type: TaskType::Extract,
            allowed_domains: BTreeSet::from(["example.com".to_string()]),
            allowed_actions: BTreeSet::from([Action::Navigate]),
            sensitive_data: BTreeSet::new(),
            max_depth: 3,
            timeout_ms: 30_000,
            original_request: "extract the page".to_string(),
            created_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn empty_domains_is_invalid() {
        let mut intent = base_intent();
        intent.allowed_domains.clear();
        let report = validate_intent(&intent);
        assert!(!report.valid);
    }

    #[test]
    fn timeout_boundary() {
        let mut intent = base_intent();
        intent.timeout_ms = 300_000;
        assert!(validate_intent(&intent).valid);

        intent.timeout_ms = 300_001;
        assert!(!validate_intent(&intent).valid);
    }

    #[test]
    fn login_with_password_label_is_invalid() {
        let mut intent = base_intent();
        intent.task_type = TaskType::Login;
        intent.sensitive_data.insert(SensitiveLabel::Password);
        assert!(!validate_intent(&intent).valid);
    }

    #[test]
    fn purchase_with_credit_card_label_is_invalid() {
        let mut intent = base_intent();
        intent.task_type = TaskType::Purchase;
        intent.sensitive_data.insert(SensitiveLabel::CreditCard);
        assert!(!validate_intent(&intent).valid);
    }

    #[test]
    fn short_or_wildcard_domain_is_invalid() {
        let mut intent = base_intent();
        intent.allowed_domains = BTreeSet::from(["io".to_string()]);
        assert!(!validate_intent(&intent).valid);

        intent.allowed_domains = BTreeSet::from(["*".to_string()]);
        assert!(!validate_intent(&intent).valid);
    }
}
