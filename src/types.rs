//! Core domain types shared across every subsystem.
//!
//! Keeping `Action`, `TaskType`, `SensitiveLabel`, and `Intent` in one module
//! avoids circular dependencies between `intent`, `dag`, `policy`, and `http`
//! — all of which need to name the action alphabet and task-type enum.
//!
//! Per the design note on variants: every one of these is a closed
//! enumeration. Matches on them should be exhaustive so a new variant is a
//! compile error at every call site that needs to handle it, not a silent
//! fallthrough.

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One primitive operation in the browser action alphabet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// Load a URL.
    Navigate,
    /// Click an element.
    Click,
    /// Scroll the viewport.
    Scroll,
    /// Type text into an element.
    Type,
    /// Pull structured data out of the page.
    Extract,
    /// Capture a screenshot.
    Screenshot,
    /// Wait a fixed duration.
    Wait,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Navigate => "navigate",
            Self::Click => "click",
            Self::Scroll => "scroll",
            Self::Type => "type",
            Self::Extract => "extract",
            Self::Screenshot => "screenshot",
            Self::Wait => "wait",
        };
        write!(f, "{s}")
    }
}

/// The kind of browsing session the user's request describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    /// Search for information across one or more sites.
    Search,
    /// Pull structured data from a known page.
    Extract,
    /// Periodically re-check a page for a condition.
    Monitor,
    /// Multi-step interaction with a site (forms, menus, …).
    Interact,
    /// Complete a purchase flow.
    Purchase,
    /// Authenticate against a site.
    Login,
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Search => "search",
            Self::Extract => "extract",
            Self::Monitor => "monitor",
            Self::Interact => "interact",
            Self::Purchase => "purchase",
            Self::Login => "login",
        };
        write!(f, "{s}")
    }
}

impl TaskType {
    /// The action alphabet permitted for this task type (§6 table).
    #[must_use]
    pub fn allowed_actions(self) -> &'static [Action] {
        use Action::{Click, Extract, Navigate, Scroll, Screenshot, Type, Wait};
        match self {
            Self::Search => &[Navigate, Type, Click, Scroll, Extract],
            Self::Extract => &[Navigate, Scroll, Extract, Screenshot],
            Self::Monitor => &[Navigate, Scroll, Extract, Screenshot, Wait],
            Self::Interact => &[Navigate, Click, Scroll, Type, Extract],
            Self::Purchase => &[Navigate, Click, Scroll, Type, Extract],
            Self::Login => &[Navigate, Click, Type],
        }
    }

    /// The default `(max_depth, timeout_ms)` pair for this task type (§6).
    #[must_use]
    pub fn defaults(self) -> (u32, u64) {
        match self {
            Self::Search => (3, 30_000),
            Self::Extract => (5, 60_000),
            Self::Monitor => (2, 120_000),
            Self::Interact => (5, 60_000),
            Self::Purchase => (10, 180_000),
            Self::Login => (3, 30_000),
        }
    }
}

/// A category of sensitive data detected in the originating request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensitiveLabel {
    /// A password or credential.
    Password,
    /// A credit card number.
    CreditCard,
    /// A social security number.
    Ssn,
    /// An email address.
    Email,
    /// An API key or token.
    ApiKey,
    /// A generic secret.
    Secret,
}

impl fmt::Display for SensitiveLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Password => "password",
            Self::CreditCard => "credit_card",
            Self::Ssn => "ssn",
            Self::Email => "email",
            Self::ApiKey => "api_key",
            Self::Secret => "secret",
        };
        write!(f, "{s}")
    }
}

/// A bounded description of what the agent is permitted to do for one request.
///
/// Produced by [`crate::intent::IntentParser`], consumed by the policy
/// engine, the plan generator, and the HTTP filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Intent {
    /// Short prose summary of the goal, truncated to 100 chars.
    pub goal: String,
    /// What kind of browsing session this is.
    pub task_type: TaskType,
    /// Hostnames the session may contact (exact or subdomain match).
    pub allowed_domains: BTreeSet<String>,
    /// Subset of the action alphabet this session may perform.
    pub allowed_actions: BTreeSet<Action>,
    /// Sensitive-data categories detected in the originating request.
    pub sensitive_data: BTreeSet<SensitiveLabel>,
    /// Upper bound on navigation hops.
    pub max_depth: u32,
    /// Upper bound on wall-clock execution time, in milliseconds.
    pub timeout_ms: u64,
    /// The original natural-language request, preserved for audit.
    pub original_request: String,
    /// When this intent was derived.
    pub created_at: DateTime<Utc>,
}

impl Intent {
    /// Whether `domain` is covered by `allowed_domains`, using subdomain
    /// matching (exact match, or `domain` ends with `.{allowed}`).
    ///
    /// This is the single definition of domain membership used by both the
    /// policy engine and the HTTP filter, resolving the ambiguity between
    /// exact and subdomain matching named in the source material.
    #[must_use]
    pub fn allows_domain(&self, domain: &str) -> bool {
        self.allowed_domains
            .iter()
            .any(|allowed| crate::intent::patterns::domain_matches(domain, allowed))
    }

    /// Whether `action` is in the allowed-action alphabet.
    #[must_use]
    pub fn allows_action(&self, action: Action) -> bool {
        self.allowed_actions.contains(&action)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_type_action_tables_match_spec() {
        assert_eq!(
            TaskType::Login.allowed_actions(),
            &[Action::Navigate, Action::Click, Action::Type]
        );
        assert_eq!(TaskType::Purchase.defaults(), (10, 180_000));
    }

    #[test]
    fn display_round_trips_through_serde() {
        assert_eq!(Action::Navigate.to_string(), "navigate");
        assert_eq!(TaskType::Login.to_string(), "login");
        assert_eq!(SensitiveLabel::ApiKey.to_string(), "api_key");
    }
}
