//! Template for `TaskType::Interact`: open a form, fill it, submit, and
//! confirm.

use chrono::Utc;

use crate::dag::model::{BranchCondition, BrowserAction, Dag, Edge, Node, TerminalResult};
use crate::types::{Action, Intent};

use super::common::{failure_edges, failure_nodes, primary_domain, stamp_domain_constraint, TemplateOptions};

/// Builds an interact-task template DAG.
#[must_use]
pub fn build(intent: &Intent, options: &TemplateOptions) -> Dag {
    const PREFIX: &str = "interact";
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
            id: "open_form".into(),
            action: BrowserAction {
                action_type: Action::Click,
                description: "open the interaction form".to_string(),
                target: Some("form".to_string()),
                value: None,
            },
            expected_outcomes: vec![],
            extraction_targets: vec![],
            constraints: vec![],
            is_terminal: false,
            terminal_result: None,
        },
        Node {
            id: "fill_field".into(),
            action: BrowserAction {
                action_type: Action::Type,
                description: "fill the form field".to_string(),
                target: Some("textarea, input[type=text]".to_string()),
                value: Some(intent.goal.clone()),
            },
            expected_outcomes: vec![],
            extraction_targets: vec![],
            constraints: vec![],
            is_terminal: false,
            terminal_result: None,
        },
        Node {
            id: "submit_form".into(),
            action: BrowserAction {
                action_type: Action::Click,
                description: "submit the form".to_string(),
                target: Some("button[type=submit]".to_string()),
                value: None,
            },
            expected_outcomes: vec![],
            extraction_targets: vec![],
            constraints: vec![],
            is_terminal: false,
            terminal_result: None,
        },
        Node {
            id: "extract_confirmation".into(),
            action: BrowserAction {
                action_type: Action::Extract,
                description: "extract submission confirmation".to_string(),
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
            id: "success".into(),
            action: BrowserAction {
                action_type: Action::Extract,
                description: "interaction complete".to_string(),
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
            to: "open_form".into(),
            condition: BranchCondition::Default,
            priority: 100,
        },
        Edge {
            from: "open_form".into(),
            to: "fill_field".into(),
            condition: BranchCondition::Default,
            priority: 100,
        },
        Edge {
            from: "fill_field".into(),
            to: "submit_form".into(),
            condition: BranchCondition::Default,
            priority: 100,
        },
        Edge {
            from: "submit_form".into(),
            to: "extract_confirmation".into(),
            condition: BranchCondition::Default,
            priority: 100,
        },
        Edge {
            from: "extract_confirmation".into(),
            to: "success".into(),
            condition: BranchCondition::Default,
            priority: 100,
        },
    ];
    edges.extend(failure_edges("navigate", PREFIX));
    edges.extend(failure_edges("submit_form", PREFIX));

    stamp_domain_constraint(&mut nodes, intent);

    Dag {
        id: format!("interact-{}", uuid::Uuid::new_v4()),
        intent: intent.clone(),
        nodes,
        edges,
        entry_point: "navigate".into(),
        created_at: Utc::now(),
    }
}
