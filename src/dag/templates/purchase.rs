//! Template for `TaskType::Purchase`: add to cart, begin checkout, and
//! stop short of payment confirmation — the policy engine's
//! `no-auto-payment` rule and the confirm gates govern whether the final
//! step may actually proceed at run time; the template only enumerates
//! the flow's shape.

use chrono::Utc;

use crate::dag::model::{BranchCondition, BrowserAction, Dag, Edge, Node, TerminalResult};
use crate::types::{Action, Intent};

use super::common::{failure_edges, failure_nodes, primary_domain, stamp_domain_constraint, TemplateOptions};

/// Builds a purchase-task template DAG.
#[must_use]
pub fn build(intent: &Intent, options: &TemplateOptions) -> Dag {
    const PREFIX: &str = "purchase";
    let domain = primary_domain(intent);

    let mut nodes = vec![
        Node {
            id: "navigate".into(),
            action: BrowserAction {
                action_type: Action::Navigate,
                description: format!("navigate to {domain}"),
                target: Some(format!("https://{domain}")),
                value: None,
            },
            expected_outcomes: vec![],
            extraction_targets: vec![],
            constraints: vec![],
            is_terminal: false,
            terminal_result: None,
        },
        Node {
            id: "add_to_cart".into(),
            action: BrowserAction {
                action_type: Action::Click,
                description: "add item to cart".to_string(),
                target: Some("[data-action=add-to-cart]".to_string()),
                value: None,
            },
            expected_outcomes: vec![],
            extraction_targets: vec![],
            constraints: vec![],
            is_terminal: false,
            terminal_result: None,
        },
        Node {
            id: "begin_checkout".into(),
            action: BrowserAction {
                action_type: Action::Click,
                description: "begin checkout".to_string(),
                target: Some("[data-action=checkout]".to_string()),
                value: None,
            },
            expected_outcomes: vec![],
            extraction_targets: vec![],
            constraints: vec![],
            is_terminal: false,
            terminal_result: None,
        },
        Node {
            id: "review_order".into(),
            action: BrowserAction {
                action_type: Action::Extract,
                description: "extract order summary for review".to_string(),
                target: None,
                value: None,
            },
            expected_outcomes: vec![],
            extraction_targets: options.extraction_targets.clone(),
            constraints: vec![],
            is_terminal: false,
            terminal_result: None,
        },
        Node {
            id: "confirmation_pending".into(),
            action: BrowserAction {
                action_type: Action::Extract,
                description: "order ready for payment confirmation".to_string(),
                target: None,
                value: None,
            },
            expected_outcomes: vec![],
            extraction_targets: vec![],
            constraints: vec![],
            is_terminal: true,
            terminal_result: Some(TerminalResult::Success),
        },
    ];
    nodes.extend(failure_nodes(PREFIX));

    let mut edges = vec![
        Edge {
            from: "navigate".into(),
            to: "add_to_cart".into(),
            condition: BranchCondition::Default,
            priority: 100,
        },
        Edge {
            from: "add_to_cart".into(),
            to: "begin_checkout".into(),
            condition: BranchCondition::Default,
            priority: 100,
        },
        Edge {
            from: "begin_checkout".into(),
            to: "review_order".into(),
            condition: BranchCondition::Default,
            priority: 100,
        },
        Edge {
            from: "review_order".into(),
            to: "confirmation_pending".into(),
            condition: BranchCondition::Default,
            priority: 100,
        },
    ];
    edges.extend(failure_edges("navigate", PREFIX));
    edges.extend(failure_edges("begin_checkout", PREFIX));

    stamp_domain_constraint(&mut nodes, intent);

    Dag {
        id: format!("purchase-{}", uuid::Uuid::new_v4()),
        intent: intent.clone(),
        nodes,
        edges,
        entry_point: "navigate".into(),
        created_at: Utc::now(),
    }
}
