//! Shared scaffolding reused by every per-task-type template: the
//! pre-enumerated failure-mode branches (404, login-required, captcha,
//! cookie banner, rate-limit, no-results) and domain-constraint stamping.

use crate::dag::model::{BranchCondition, BrowserAction, Constraint, Edge, ExtractionTarget, Node, TerminalResult};
use crate::types::{Action, Intent};

/// Per-template instantiation knobs.
#[derive(Debug, Clone, Default)]
pub struct TemplateOptions {
    /// Extraction targets to attach to the template's extraction node(s),
    /// beyond whatever the template declares by default.
    pub extraction_targets: Vec<ExtractionTarget>,
}

/// The first of the intent's allowed domains, used as the template's
/// navigation target.
#[must_use]
pub fn primary_domain(intent: &Intent) -> String {
    intent.allowed_domains.iter().next().cloned().unwrap_or_default()
}

/// The domain constraint every node in a template-generated DAG carries.
#[must_use]
pub fn domain_constraint(intent: &Intent) -> Constraint {
    Constraint::Domain {
        allowed: intent.allowed_domains.clone(),
    }
}

/// Stamps `constraint` onto every node that doesn't already carry a
/// domain constraint.
pub fn stamp_domain_constraint(nodes: &mut [Node], intent: &Intent) {
    let constraint = domain_constraint(intent);
    for node in nodes.iter_mut() {
        let has_domain = node
            .constraints
            .iter()
            .any(|c| matches!(c, Constraint::Domain { .. }));
        if !has_domain {
            node.constraints.push(constraint.clone());
        }
    }
}

/// The six standard terminal failure nodes, namespaced under `prefix`.
#[must_use]
pub fn failure_nodes(prefix: &str) -> Vec<Node> {
    let terminal = |suffix: &str, result: TerminalResult, description: &str| Node {
        id: format!("{prefix}_{suffix}").into(),
        action: BrowserAction {
            action_type: Action::Extract,
            description: description.to_string(),
            target: None,
            value: None,
        },
        expected_outcomes: vec![],
        extraction_targets: vec![],
        constraints: vec![],
        is_terminal: true,
        terminal_result: Some(result),
    };

    vec![
        terminal("not_found", TerminalResult::Error, "page not found (404)"),
        terminal(
            "login_required",
            TerminalResult::Abort,
            "blocked by a login wall (403)",
        ),
        terminal("captcha", TerminalResult::Abort, "blocked by a CAPTCHA challenge"),
        terminal(
            "cookie_banner",
            TerminalResult::Error,
            "blocked by an undismissable cookie banner",
        ),
        terminal("rate_limited", TerminalResult::Error, "rate limited"),
        terminal("no_results", TerminalResult::Error, "no results found"),
    ]
}

/// Edges from `from` to each of [`failure_nodes`]`(prefix)`, at
/// priorities 1 through 6 so they're tried before any `default` edge a
/// caller adds at a higher priority number.
#[must_use]
pub fn failure_edges(from: &str, prefix: &str) -> Vec<Edge> {
    let edge = |suffix: &str, priority: u32, condition: BranchCondition| Edge {
        from: from.into(),
        to: format!("{prefix}_{suffix}").into(),
        condition,
        priority,
    };

    vec![
        edge(
            "not_found",
            1,
            BranchCondition::ContentMatch {
                value: r"(?i)404|page not found".to_string(),
            },
        ),
        edge(
            "login_required",
            2,
            BranchCondition::ContentMatch {
                value: r"(?i)sign in to continue|login required|403 forbidden".to_string(),
            },
        ),
        edge(
            "captcha",
            3,
            BranchCondition::ElementPresent {
                value: "[class*=captcha]".to_string(),
            },
        ),
        edge(
            "cookie_banner",
            4,
            BranchCondition::ElementPresent {
                value: "[class*=cookie-banner]".to_string(),
            },
        ),
        edge(
            "rate_limited",
            5,
            BranchCondition::ContentMatch {
                value: r"(?i)rate limit|too many requests".to_string(),
            },
        ),
        edge(
            "no_results",
            6,
            BranchCondition::ContentMatch {
                value: r"(?i)no results found|\b0 results\b".to_string(),
            },
        ),
    ]
}
