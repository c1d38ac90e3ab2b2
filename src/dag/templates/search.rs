//! Template for `TaskType::Search`: navigate, type a query, submit, and
//! extract results.

use chrono::Utc;

use crate::dag::model::{BranchCondition, BrowserAction, Dag, Edge, Node, TerminalResult};
use crate::types::{Action, Intent};

use super::common::{failure_edges, failure_nodes, primary_domain, stamp_domain_constraint, TemplateOptions};

/// Builds a search-task template DAG.
#[must_use]
pub fn build(intent: &Intent, options: &TemplateOptions) -> Dag {
    const PREFIX: &str = "search";
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
            id: "type_query".into(),
            action: BrowserAction {
                action_type: Action::Type,
                description: "type the search query".to_string(),
                target: Some("input[type=search]".to_string()),
                value: Some(intent.goal.clone()),
            },
            expected_outcomes: vec![],
            extraction_targets: vec![],
            constraints: vec![],
            is_terminal: false,
            terminal_result: None,
        },
        Node {
            id: "submit_search".into(),
            action: BrowserAction {
                action_type: Action::Click,
                description: "submit the search".to_string(),
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
            id: "extract_results".into(),
            action: BrowserAction {
                action_type: Action::Extract,
                description: "extract search results".to_string(),
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
                description: "search complete".to_string(),
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
            to: "type_query".into(),
            condition: BranchCondition::Default,
            priority: 100,
        },
        Edge {
            from: "type_query".into(),
            to: "submit_search".into(),
            condition: BranchCondition::Default,
            priority: 100,
        },
        Edge {
            from: "submit_search".into(),
            to: "extract_results".into(),
            condition: BranchCondition::Default,
            priority: 100,
        },
        Edge {
            from: "extract_results".into(),
            to: "success".into(),
            condition: BranchCondition::Default,
            priority: 100,
        },
    ];
    edges.extend(failure_edges("navigate", PREFIX));
    edges.extend(failure_edges("extract_results", PREFIX));

    stamp_domain_constraint(&mut nodes, intent);

    Dag {
        id: format!("search-{}", uuid::Uuid::new_v4()),
        intent: intent.clone(),
        nodes,
        edges,
        entry_point: "navigate".into(),
        created_at: Utc::now(),
    }
}
