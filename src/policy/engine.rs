//! The policy engine: the single authority for "is this action allowed"
//! and "is this intent allowed" questions.
//!
//! Decisions are returned as data ([`Decision`]), never raised as
//! exceptions, so control-flow results stay inspectable rather than
//! thrown.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use aho_corasick::AhoCorasick;
use regex::RegexSet;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{Action, Intent, TaskType};

use super::rule::{MatchInput, PolicyEffect, PolicySource, PolicyRule, Scope};
use super::site::SitePolicy;

/// Errors from policy-engine construction or evaluation.
#[derive(Debug, Error)]
pub enum PolicyError {
    /// A site-supplied rule could not be parsed.
    #[error("invalid site policy directive: {0}")]
    InvalidSiteDirective(String),
}

/// The outcome of a policy evaluation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Decision {
    /// Whether the action/intent may proceed without further gating.
    pub allowed: bool,
    /// What the matching (or default) rule decided.
    pub effect: PolicyEffect,
    /// The id of the rule that produced this decision, if any rule matched.
    pub matched_rule: Option<String>,
    /// Human-readable explanation, always populated.
    pub reason: String,
}

impl Decision {
    fn allow(reason: impl Into<String>) -> Self {
        Self {
            allowed: true,
            effect: PolicyEffect::Allow,
            matched_rule: None,
            reason: reason.into(),
        }
    }

    fn deny(rule_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            effect: PolicyEffect::Deny,
            matched_rule: Some(rule_id.into()),
            reason: reason.into(),
        }
    }

    fn confirm(rule_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            allowed: true,
            effect: PolicyEffect::Confirm,
            matched_rule: Some(rule_id.into()),
            reason: reason.into(),
        }
    }

    fn from_rule(rule: &PolicyRule) -> Self {
        match rule.effect {
            PolicyEffect::Allow => Self::allow(rule.rationale.clone()),
            PolicyEffect::Deny => Self::deny(rule.id.clone(), rule.rationale.clone()),
            PolicyEffect::Confirm => Self::confirm(rule.id.clone(), rule.rationale.clone()),
        }
    }
}

/// An action a plan step intends to perform, as seen by the policy engine.
#[derive(Debug, Clone, Default)]
pub struct PlannedAction {
    /// The operation being attempted.
    pub action: Option<Action>,
    /// Its target: a URL for navigate, a selector description otherwise.
    pub target: Option<String>,
    /// Free-text description (e.g. the label of the element being clicked).
    pub description: Option<String>,
}

/// Execution context a policy evaluation needs beyond the action itself.
#[derive(Debug, Clone, Default)]
pub struct ActionContext {
    /// The page the action is being attempted from, if known.
    pub current_url: Option<String>,
    /// Whether the current connection is known to be HTTPS.
    pub is_https: Option<bool>,
}

const EXECUTABLE_EXTENSIONS: &[&str] = &[
    ".exe", ".msi", ".dmg", ".pkg", ".app", ".bat", ".cmd", ".sh", ".ps1",
];

const PAYMENT_PATTERNS: &[&str] = &[
    r"(?i)\bpay\s*now\b",
    r"(?i)\bplace\s+order\b",
    r"(?i)\bcheckout\b",
    r"(?i)\bbuy\s+for\s+\$",
    r"(?i)\bcomplete\s+purchase\b",
    r"(?i)\bsubmit\s+payment\b",
    r"(?i)\bconfirm\s+payment\b",
];

static PAYMENT_SET: LazyLock<RegexSet> =
    LazyLock::new(|| RegexSet::new(PAYMENT_PATTERNS).expect("payment pattern set compiles"));

const MALICIOUS_DOMAIN_SUBSTRINGS: &[&str] = &["phishing", "malware", "-verify-", "-secure-login"];

const URL_SHORTENERS: &[&str] = &[
    "bit.ly", "tinyurl.com", "goo.gl", "t.co", "ow.ly", "is.gd", "buff.ly",
];

/// Multi-pattern matcher over [`MALICIOUS_DOMAIN_SUBSTRINGS`], built once:
/// a hostname is checked against every known-malicious substring in a
/// single linear scan rather than one `contains` call per pattern.
static MALICIOUS_SUBSTRING_MATCHER: LazyLock<AhoCorasick> = LazyLock::new(|| {
    AhoCorasick::new(MALICIOUS_DOMAIN_SUBSTRINGS).expect("malicious-domain pattern set compiles")
});

/// Whether `domain` matches a known-malicious pattern: a substring commonly
/// present in phishing hostnames, or a known URL shortener used to obscure
/// the real destination.
#[must_use]
pub fn is_malicious_domain(domain: &str) -> bool {
    let lower = domain.to_lowercase();
    MALICIOUS_SUBSTRING_MATCHER.is_match(&lower)
        || URL_SHORTENERS
            .iter()
            .any(|host| crate::intent::domain_matches(&lower, host))
}

/// Task types that never mutate page state, used to gate the generic
/// confirm-on-click rule onto the task types where a stray click would be
/// meaningfully consequential.
const READ_ONLY_TASK_TYPES: &[TaskType] = &[TaskType::Search, TaskType::Extract, TaskType::Monitor];

fn static_rules() -> Vec<PolicyRule> {
    vec![
        PolicyRule {
            id: "no-auto-payment".to_string(),
            source: PolicySource::Static,
            scope: Scope::default(),
            effect: PolicyEffect::Deny,
            priority: 0,
            rationale: "payment-completing actions are never auto-approved".to_string(),
            procedural: true,
        },
        PolicyRule {
            id: "https-only-credentials".to_string(),
            source: PolicySource::Static,
            scope: Scope {
                task_types: Some(BTreeSet::from([TaskType::Login])),
                insecure_only: true,
                ..Scope::default()
            },
            effect: PolicyEffect::Deny,
            priority: 0,
            rationale: "credentials are never submitted over a non-HTTPS connection".to_string(),
            procedural: true,
        },
        PolicyRule {
            id: "no-executable-download".to_string(),
            source: PolicySource::Static,
            scope: Scope::default(),
            effect: PolicyEffect::Deny,
            priority: 0,
            rationale: "targets with an executable file extension are never fetched".to_string(),
            procedural: true,
        },
        PolicyRule {
            id: "block-malicious-domains".to_string(),
            source: PolicySource::Static,
            scope: Scope::default(),
            effect: PolicyEffect::Deny,
            priority: 0,
            rationale: "navigation targets matching known phishing/shortener patterns are blocked"
                .to_string(),
            procedural: true,
        },
        PolicyRule {
            id: "confirm-form-submit".to_string(),
            source: PolicySource::Static,
            scope: Scope {
                actions: Some(BTreeSet::from([Action::Click])),
                ..Scope::default()
            },
            effect: PolicyEffect::Confirm,
            priority: 10,
            rationale: "clicks are gated behind confirmation unless a lower-priority rule already allows them"
                .to_string(),
            procedural: false,
        },
        PolicyRule {
            id: "confirm-external-nav".to_string(),
            source: PolicySource::Static,
            scope: Scope {
                actions: Some(BTreeSet::from([Action::Navigate, Action::Click])),
                cross_domain_only: true,
                ..Scope::default()
            },
            effect: PolicyEffect::Confirm,
            priority: 10,
            rationale: "navigation that leaves the current origin requires confirmation".to_string(),
            procedural: false,
        },
    ]
}

fn task_derived_rules(intent: &Intent) -> Vec<PolicyRule> {
    let mut rules = vec![
        PolicyRule {
            id: "domain-allowlist".to_string(),
            source: PolicySource::Task,
            scope: Scope {
                domains: Some(intent.allowed_domains.clone()),
                actions: Some(BTreeSet::from([Action::Navigate])),
                ..Scope::default()
            },
            effect: PolicyEffect::Allow,
            priority: 5,
            rationale: "navigation within the intent's allowed domains".to_string(),
            procedural: true,
        },
        PolicyRule {
            id: "domain-denylist".to_string(),
            source: PolicySource::Task,
            scope: Scope::default(),
            effect: PolicyEffect::Deny,
            priority: 100,
            rationale: "navigation outside the intent's allowed domains is denied by default"
                .to_string(),
            procedural: true,
        },
        PolicyRule {
            id: "action-allowlist".to_string(),
            source: PolicySource::Task,
            scope: Scope {
                actions: Some(intent.allowed_actions.clone()),
                ..Scope::default()
            },
            effect: PolicyEffect::Allow,
            priority: 5,
            rationale: "action is within the intent's permitted action alphabet".to_string(),
            procedural: true,
        },
    ];

    if intent.task_type == TaskType::Login {
        rules.push(PolicyRule {
            id: "login-same-domain".to_string(),
            source: PolicySource::Task,
            scope: Scope {
                task_types: Some(BTreeSet::from([TaskType::Login])),
                ..Scope::default()
            },
            effect: PolicyEffect::Deny,
            priority: 5,
            rationale: "login sessions never navigate outside their originating domain".to_string(),
            procedural: true,
        });
    }

    if READ_ONLY_TASK_TYPES.contains(&intent.task_type) {
        rules.push(PolicyRule {
            id: "confirm-on-click".to_string(),
            source: PolicySource::Task,
            scope: Scope {
                actions: Some(BTreeSet::from([Action::Click])),
                task_types: Some(READ_ONLY_TASK_TYPES.iter().copied().collect()),
                ..Scope::default()
            },
            effect: PolicyEffect::Confirm,
            priority: 20,
            rationale: "read-only task types confirm before any click".to_string(),
            procedural: false,
        });
    }

    rules
}

/// The central policy decision point.
///
/// Holds a priority-sorted rule table (static + task-derived + site +
/// user rules) plus the intent it was constructed against. `allows()`
/// evaluates a concrete action; `allows_intent()` evaluates the intent
/// itself (used once, at session start).
pub struct PolicyEngine {
    rules: Vec<PolicyRule>,
    intent: Option<Intent>,
}

impl PolicyEngine {
    /// Builds an engine seeded with the static rule table and, if an intent
    /// is supplied, its task-derived rules.
    #[must_use]
    pub fn new(intent: Option<Intent>) -> Self {
        let mut rules = static_rules();
        if let Some(intent) = &intent {
            rules.extend(task_derived_rules(intent));
        }
        rules.sort_by_key(|r| r.priority);
        Self { rules, intent }
    }

    /// Appends rules advertised by a site's `<meta name="ai-agent-policy">`
    /// tag, re-sorting by priority.
    pub fn add_site_rules(&mut self, site: &SitePolicy) {
        self.rules.extend(site.to_rules());
        self.rules.sort_by_key(|r| r.priority);
    }

    /// Appends host-supplied rules, re-sorting by priority.
    pub fn add_user_rules(&mut self, rules: Vec<PolicyRule>) {
        self.rules.extend(rules);
        self.rules.sort_by_key(|r| r.priority);
    }

    /// A snapshot of the full rule table, in evaluation order, for audit
    /// and introspection.
    #[must_use]
    pub fn rules(&self) -> &[PolicyRule] {
        &self.rules
    }

    /// The intent this engine was constructed against, if any.
    #[must_use]
    pub fn intent(&self) -> Option<&Intent> {
        self.intent.as_ref()
    }

    /// Evaluates whether `intent` itself may be accepted, independent of
    /// any single action: rejects intents that pair data extraction with
    /// detected sensitive-data categories, and intents whose allowed
    /// domains already include a known-malicious host.
    #[must_use]
    pub fn allows_intent(&self, intent: &Intent) -> Decision {
        if intent.task_type == TaskType::Extract && !intent.sensitive_data.is_empty() {
            return Decision::deny(
                "no-sensitive-extraction",
                "extraction tasks may not target sensitive-data categories",
            );
        }

        for domain in &intent.allowed_domains {
            if is_malicious_domain(domain) {
                return Decision::deny(
                    "block-malicious-domains",
                    format!("allowed domain '{domain}' matches a known-malicious pattern"),
                );
            }
        }

        Decision::allow("intent accepted")
    }

    /// Evaluates whether `action` may proceed given `ctx`.
    ///
    /// Evaluation order:
    /// 1. Security short-circuit (non-overridable): executable download
    ///    target, payment-completing description, credentials over a
    ///    non-HTTPS connection during a login task.
    /// 2. Domain check for navigate actions: malicious-pattern match, then
    ///    subdomain membership against the intent's allowed domains.
    /// 3. Action-alphabet check against the intent's allowed actions.
    /// 4. The sorted rule table's non-procedural (confirm/deny) rules —
    ///    first match by ascending priority.
    /// 5. Fallthrough: allow.
    #[must_use]
    pub fn allows(&self, action: &PlannedAction, ctx: &ActionContext) -> Decision {
        if let Some(target) = &action.target {
            let lower = target.to_lowercase();
            if EXECUTABLE_EXTENSIONS.iter().any(|ext| lower.ends_with(ext)) {
                return Decision::deny(
                    "no-executable-download",
                    format!("target '{target}' has an executable file extension"),
                );
            }
        }

        if let Some(description) = &action.description {
            if PAYMENT_SET.is_match(description) {
                return Decision::deny(
                    "no-auto-payment",
                    format!("description '{description}' matches a payment-completion pattern"),
                );
            }
        }

        let is_login = self
            .intent
            .as_ref()
            .is_some_and(|i| i.task_type == TaskType::Login);
        if is_login && ctx.is_https == Some(false) {
            return Decision::deny(
                "https-only-credentials",
                "login task attempted over a non-HTTPS connection",
            );
        }

        let target_domain = action
            .target
            .as_deref()
            .and_then(crate::intent::patterns::extract_host)
            .or_else(|| {
                (action.action == Some(Action::Navigate))
                    .then(|| action.target.clone())
                    .flatten()
            });
        let current_domain = ctx
            .current_url
            .as_deref()
            .and_then(crate::intent::patterns::extract_host);

        if action.action == Some(Action::Navigate) {
            if let Some(domain) = &target_domain {
                if is_malicious_domain(domain) {
                    return Decision::deny(
                        "block-malicious-domains",
                        format!("navigation target '{domain}' matches a known-malicious pattern"),
                    );
                }
                if let Some(intent) = &self.intent {
                    if !intent.allows_domain(domain) {
                        return Decision::deny(
                            "domain-denylist",
                            format!("'{domain}' is outside the intent's allowed domains"),
                        );
                    }
                }
            }
        }

        if let (Some(intent), Some(action_kind)) = (&self.intent, action.action) {
            if !intent.allows_action(action_kind) {
                return Decision::deny(
                    "action-alphabet",
                    format!("'{action_kind}' is outside the intent's permitted actions"),
                );
            }
        }

        let input = MatchInput {
            action: action.action,
            target_domain: target_domain.as_deref(),
            current_domain: current_domain.as_deref(),
            task_type: self.intent.as_ref().map(|i| i.task_type),
            is_https: ctx.is_https,
        };

        for rule in &self.rules {
            if rule.procedural {
                continue;
            }
            if rule.effect == PolicyEffect::Allow {
                continue;
            }
            if rule.scope.matches(input) {
                return Decision::from_rule(rule);
            }
        }

        Decision::allow("no matching deny or confirm rule")
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use chrono::Utc;

    use super::*;

    fn intent(task_type: TaskType, domains: &[&str], actions: &[Action]) -> Intent {
        Intent {
            goal: "test goal".to_string(),
            task_type,
            allowed_domains: domains.iter().map(|d| (*d).to_string()).collect(),
            allowed_actions: actions.iter().copied().collect(),
            sensitive_data: BTreeSet::new(),
            max_depth: 5,
            timeout_ms: 30_000,
            original_request: "test".to_string(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn denies_navigation_outside_allowed_domains() {
        let engine = PolicyEngine::new(Some(intent(
            TaskType::Search,
            &["newegg.com"],
            &[Action::Navigate],
        )));
        let decision = engine.allows(
            &PlannedAction {
                action: Some(Action::Navigate),
                target: Some("https://evil.example".to_string()),
                description: None,
            },
            &ActionContext::default(),
        );
        assert!(!decision.allowed);
        assert_eq!(decision.matched_rule.as_deref(), Some("domain-denylist"));
    }

    #[test]
    fn allows_navigation_within_allowed_domains() {
        let engine = PolicyEngine::new(Some(intent(
            TaskType::Search,
            &["newegg.com"],
            &[Action::Navigate],
        )));
        let decision = engine.allows(
            &PlannedAction {
                action: Some(Action::Navigate),
                target: Some("https://www.newegg.com/search".to_string()),
                description: None,
            },
            &ActionContext::default(),
        );
        assert!(decision.allowed);
    }

    #[test]
    fn denies_payment_completing_click_regardless_of_domain() {
        let engine = PolicyEngine::new(Some(intent(
            TaskType::Purchase,
            &["shop.example"],
            &[Action::Click],
        )));
        let decision = engine.allows(
            &PlannedAction {
                action: Some(Action::Click),
                target: None,
                description: Some("Pay Now".to_string()),
            },
            &ActionContext::default(),
        );
        assert!(!decision.allowed);
        assert_eq!(decision.matched_rule.as_deref(), Some("no-auto-payment"));
    }

    #[test]
    fn denies_executable_download_target() {
        let engine = PolicyEngine::new(None);
        let decision = engine.allows(
            &PlannedAction {
                action: Some(Action::Navigate),
                target: Some("https://example.com/setup.exe".to_string()),
                description: None,
            },
            &ActionContext::default(),
        );
        assert!(!decision.allowed);
        assert_eq!(
            decision.matched_rule.as_deref(),
            Some("no-executable-download")
        );
    }

    #[test]
    fn denies_login_credentials_over_plaintext_http() {
        let engine = PolicyEngine::new(Some(intent(
            TaskType::Login,
            &["example.com"],
            &[Action::Type],
        )));
        let decision = engine.allows(
            &PlannedAction {
                action: Some(Action::Type),
                target: None,
                description: None,
            },
            &ActionContext {
                current_url: Some("http://example.com/login".to_string()),
                is_https: Some(false),
            },
        );
        assert!(!decision.allowed);
        assert_eq!(
            decision.matched_rule.as_deref(),
            Some("https-only-credentials")
        );
    }

    #[test]
    fn confirm_gate_fires_for_plain_click_within_scope() {
        let engine = PolicyEngine::new(Some(intent(
            TaskType::Interact,
            &["forum.example"],
            &[Action::Click],
        )));
        let decision = engine.allows(
            &PlannedAction {
                action: Some(Action::Click),
                target: None,
                description: Some("Reply".to_string()),
            },
            &ActionContext::default(),
        );
        assert!(decision.allowed);
        assert_eq!(decision.effect, PolicyEffect::Confirm);
        assert_eq!(decision.matched_rule.as_deref(), Some("confirm-form-submit"));
    }

    #[test]
    fn allows_intent_rejects_sensitive_extraction() {
        let mut base = intent(TaskType::Extract, &["bank.example"], &[Action::Extract]);
        base.sensitive_data = BTreeSet::from([crate::types::SensitiveLabel::Ssn]);
        let engine = PolicyEngine::new(None);
        let decision = engine.allows_intent(&base);
        assert!(!decision.allowed);
    }

    #[test]
    fn allows_intent_rejects_malicious_allowed_domain() {
        let base = intent(TaskType::Search, &["bit.ly"], &[Action::Navigate]);
        let engine = PolicyEngine::new(None);
        let decision = engine.allows_intent(&base);
        assert!(!decision.allowed);
    }

    #[test]
    fn site_policy_narrows_below_default_confirm() {
        let mut engine = PolicyEngine::new(Some(intent(
            TaskType::Interact,
            &["forum.example"],
            &[Action::Click],
        )));
        engine.add_site_rules(&SitePolicy::parse("read-only").unwrap());
        let decision = engine.allows(
            &PlannedAction {
                action: Some(Action::Click),
                target: None,
                description: Some("Reply".to_string()),
            },
            &ActionContext::default(),
        );
        assert!(!decision.allowed);
        assert_eq!(decision.matched_rule.as_deref(), Some("site-read-only"));
    }
}
