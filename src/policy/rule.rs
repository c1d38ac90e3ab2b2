//! Policy rules: the declarative data consulted by [`super::engine::PolicyEngine`].
//!
//! Rules are data, not code — a `scope` is a struct-of-optionals predicate,
//! never a subclass, per the design note on rules-as-data.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::types::{Action, TaskType};

/// Where a rule originated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicySource {
    /// Compiled into the crate, process-global, immutable.
    Static,
    /// Advertised by a page via `<meta name="ai-agent-policy">`.
    Site,
    /// Derived from the current intent.
    Task,
    /// Injected by host configuration.
    User,
}

/// What a matching rule decides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyEffect {
    /// Permit the action/intent.
    Allow,
    /// Forbid the action/intent.
    Deny,
    /// Permit contingent on out-of-band user acknowledgement.
    Confirm,
}

/// A predicate over the fields an `allows()` call can supply.
///
/// Every field defaults to "matches anything" (`None`/`false`). All
/// present fields must hold for the scope to match — it is a conjunction,
/// not a disjunction.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Scope {
    /// Candidate domains this rule applies to. `None` matches any domain.
    pub domains: Option<BTreeSet<String>>,
    /// Candidate actions this rule applies to. `None` matches any action.
    pub actions: Option<BTreeSet<Action>>,
    /// Candidate task types this rule applies to. `None` matches any task type.
    pub task_types: Option<BTreeSet<TaskType>>,
    /// Matches only when the action's target domain differs from the
    /// context's current domain (a true cross-origin transition), modeling
    /// the "external navigation" gate described for `confirm-external-nav`.
    #[serde(default)]
    pub cross_domain_only: bool,
    /// Matches only when the context is known to be non-HTTPS, modeling
    /// the "credentials over plaintext" gate.
    #[serde(default)]
    pub insecure_only: bool,
}

/// Fields an `allows()` call evaluates a [`Scope`] against.
#[derive(Debug, Clone, Copy, Default)]
pub struct MatchInput<'a> {
    /// The action being evaluated.
    pub action: Option<Action>,
    /// The action's target domain (navigate target, or host of a click's page).
    pub target_domain: Option<&'a str>,
    /// The context's current domain.
    pub current_domain: Option<&'a str>,
    /// The intent's task type.
    pub task_type: Option<TaskType>,
    /// Whether the current connection is known to be HTTPS.
    pub is_https: Option<bool>,
}

impl Scope {
    /// Whether every present predicate in this scope holds for `input`.
    #[must_use]
    pub fn matches(&self, input: MatchInput<'_>) -> bool {
        if let Some(domains) = &self.domains {
            let candidate = input.target_domain.or(input.current_domain);
            let Some(candidate) = candidate else {
                return false;
            };
            if !domains
                .iter()
                .any(|d| crate::intent::domain_matches(candidate, d))
            {
                return false;
            }
        }

        if let Some(actions) = &self.actions {
            match input.action {
                Some(action) if actions.contains(&action) => {}
                _ => return false,
            }
        }

        if let Some(task_types) = &self.task_types {
            match input.task_type {
                Some(task_type) if task_types.contains(&task_type) => {}
                _ => return false,
            }
        }

        if self.cross_domain_only {
            match (input.target_domain, input.current_domain) {
                (Some(target), Some(current)) if target != current => {}
                _ => return false,
            }
        }

        if self.insecure_only && input.is_https != Some(false) {
            return false;
        }

        true
    }
}

/// A single prioritized policy rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyRule {
    /// Stable identifier (e.g. `"no-auto-payment"`).
    pub id: String,
    /// Where the rule came from.
    pub source: PolicySource,
    /// The predicate this rule applies under.
    pub scope: Scope,
    /// What the rule decides when its scope matches.
    pub effect: PolicyEffect,
    /// Evaluation priority — lower values are evaluated first.
    pub priority: u32,
    /// Human-readable rationale, surfaced in audit output.
    pub rationale: String,
    /// Whether this rule's behavior is already realized by the engine's
    /// hardcoded procedural checks (security short-circuit, domain check,
    /// action-alphabet check). Procedural rules are kept in the table for
    /// introspection and audit purposes, but are not separately matched
    /// during `allows()` — doing so would double-enforce (or, for the
    /// broader scopes like `https-only-credentials`, over-enforce) the
    /// same condition.
    #[serde(default)]
    pub procedural: bool,
}
