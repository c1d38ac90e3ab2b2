//! Parses a page's advertised `<meta name="ai-agent-policy">` directives
//! into policy rules.
//!
//! Sites may self-declare constraints narrower than what the intent would
//! otherwise permit (e.g. a page that forbids automated form submission
//! entirely). Advertised policy can only narrow, never widen, what the
//! intent and static rules already allow — [`SitePolicy::to_rules`] only
//! ever emits `Deny`/`Confirm` rules.

use std::collections::BTreeSet;

use crate::types::Action;

use super::engine::PolicyError;
use super::rule::{PolicyEffect, PolicyRule, PolicySource, Scope};

/// A single directive a page can advertise in its `ai-agent-policy` meta
/// tag content, comma-separated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SiteDirective {
    /// Automated form submission is refused.
    NoFormSubmit,
    /// Only read actions (navigate, scroll, extract, screenshot) are
    /// permitted; anything that mutates page state is refused.
    ReadOnly,
    /// The page opts out of automated agents entirely.
    NoAiAgents,
}

impl SiteDirective {
    fn parse(token: &str) -> Option<Self> {
        match token.trim().trim_matches(['"', '\'']).to_lowercase().as_str() {
            "no-form-submit" => Some(Self::NoFormSubmit),
            "read-only" => Some(Self::ReadOnly),
            "no-ai-agents" => Some(Self::NoAiAgents),
            _ => None,
        }
    }
}

/// A page's parsed `ai-agent-policy` advertisement.
#[derive(Debug, Clone, Default)]
pub struct SitePolicy {
    directives: Vec<SiteDirective>,
}

impl SitePolicy {
    /// Parses the content attribute of a
    /// `<meta name="ai-agent-policy" content="...">` tag: a comma-separated
    /// list of directive tokens, each optionally quoted.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError::InvalidSiteDirective`] for any non-empty
    /// token that isn't one of `no-form-submit`, `read-only`, or
    /// `no-ai-agents` — a site's advertised policy must be fully
    /// understood before it is trusted to narrow anything.
    pub fn parse(content: &str) -> Result<Self, PolicyError> {
        let mut directives = Vec::new();
        for token in content.split(',') {
            let trimmed = token.trim();
            if trimmed.is_empty() {
                continue;
            }
            match SiteDirective::parse(trimmed) {
                Some(directive) => directives.push(directive),
                None => return Err(PolicyError::InvalidSiteDirective(trimmed.to_string())),
            }
        }
        Ok(Self { directives })
    }

    /// Whether the page opted out of automated agents entirely.
    #[must_use]
    pub fn forbids_agents(&self) -> bool {
        self.directives.contains(&SiteDirective::NoAiAgents)
    }

    /// Converts the advertised directives into policy rules, at a fixed
    /// priority below the static security short-circuits but above the
    /// default confirm gates, so a site's narrower declaration is honored
    /// before the generic confirm rules are consulted.
    #[must_use]
    pub fn to_rules(&self) -> Vec<PolicyRule> {
        let mut rules = Vec::new();
        for directive in &self.directives {
            match directive {
                SiteDirective::NoFormSubmit => rules.push(PolicyRule {
                    id: "site-no-form-submit".to_string(),
                    source: PolicySource::Site,
                    scope: Scope {
                        actions: Some(BTreeSet::from([Action::Type, Action::Click])),
                        ..Scope::default()
                    },
                    effect: PolicyEffect::Deny,
                    priority: 1,
                    rationale: "page advertises no-form-submit".to_string(),
                    procedural: false,
                }),
                SiteDirective::ReadOnly => rules.push(PolicyRule {
                    id: "site-read-only".to_string(),
                    source: PolicySource::Site,
                    scope: Scope {
                        actions: Some(BTreeSet::from([Action::Click, Action::Type])),
                        ..Scope::default()
                    },
                    effect: PolicyEffect::Deny,
                    priority: 1,
                    rationale: "page advertises read-only".to_string(),
                    procedural: false,
                }),
                SiteDirective::NoAiAgents => rules.push(PolicyRule {
                    id: "site-no-ai-agents".to_string(),
                    source: PolicySource::Site,
                    scope: Scope::default(),
                    effect: PolicyEffect::Deny,
                    priority: 1,
                    rationale: "page opts out of automated agents".to_string(),
                    procedural: false,
                }),
            }
        }
        rules
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_comma_separated_directives() {
        let policy = SitePolicy::parse("no-form-submit, read-only").unwrap();
        assert_eq!(
            policy.directives,
            vec![SiteDirective::NoFormSubmit, SiteDirective::ReadOnly]
        );
    }

    #[test]
    fn parses_quoted_single_directive() {
        let policy = SitePolicy::parse("\"no-ai-agents\"").unwrap();
        assert!(policy.forbids_agents());
    }

    #[test]
    fn rejects_unrecognized_tokens() {
        let err = SitePolicy::parse("no-form-submit, something-unrecognized").unwrap_err();
        assert!(matches!(err, PolicyError::InvalidSiteDirective(token) if token == "something-unrecognized"));
    }

    #[test]
    fn empty_content_parses_to_no_directives() {
        let policy = SitePolicy::parse("").unwrap();
        assert!(policy.directives.is_empty());
    }

    #[test]
    fn to_rules_never_allows() {
        let policy = SitePolicy::parse("read-only").unwrap();
        assert!(policy
            .to_rules()
            .iter()
            .all(|r| r.effect != PolicyEffect::Allow));
    }
}
