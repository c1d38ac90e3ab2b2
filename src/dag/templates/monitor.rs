//! Template for `TaskType::Monitor`: poll a page, extract, check a
//! condition, and either finish or wait and recheck.
//!
//! Unlike the other templates this one is cyclic — `wait_and_recheck`
//! loops back to `navigate`. The DAG validator only requires reachability
//! and a terminal, not acyclicity, so a polling loop is a valid shape.

use chrono::Utc;

use crate::dag::model::{BranchCondition, BrowserAction, Dag, Edge, Node, TerminalResult};
use crate::types::{Action, Intent};

use super::common::{failure_edges, failure_nodes, primary_domain, stamp_domain_constraint, TemplateOptions};

/// Builds a monitor-task template DAG.
#[must_use]
pub fn build(intent: &Intent, options: &TemplateOptions) -> Dag {
    const PREFIX: &str = "monitor";
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
            id: "extract_state".into(),
            action: BrowserAction {
                action_type: Action::Extract,
                description: "extract the monitored condition".to_string(),
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
            id: "wait_and_recheck".into(),
            action: BrowserAction {
                action_type: Action::Wait,
                description: "wait before rechecking".to_string(),
                target: None,
                value: None,
            },
            expected_outcomes: vec![],
            extraction_targets: vec![],
            constraints: vec![],
            is_terminal: false,
            terminal_result: None,
        },
        Node {
            id: "condition_met".into(),
            action: BrowserAction {
                action_type: Action::Extract,
                description: "monitored condition observed".to_string(),
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
            to: "extract_state".into(),
            condition: BranchCondition::Default,
            priority: 100,
        },
        Edge {
            from: "extract_state".into(),
            to: "condition_met".into(),
            condition: BranchCondition::ContentMatch {
                value: r"(?i)in stock|available now|price dropped".to_string(),
            },
            priority: 10,
        },
        Edge {
            from: "extract_state".into(),
            to: "wait_and_recheck".into(),
            condition: BranchCondition::Default,
            priority: 100,
        },
        Edge {
            from: "wait_and_recheck".into(),
            to: "navigate".into(),
            condition: BranchCondition::Default,
            priority: 100,
        },
    ];
    edges.extend(failure_edges("navigate", PREFIX));

    stamp_domain_constraint(&mut nodes, intent);

    Dag {
        id: format!("monitor-{}", uuid::Uuid::new_v4()),
        intent: intent.clone(),
        nodes,
        edges,
        entry_point: "navigate".into(),
        created_at: Utc::now(),
    }
}
