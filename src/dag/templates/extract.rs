//! Template for `TaskType::Extract`: navigate, scroll to load lazy
//! content, then extract.

use chrono::Utc;

use crate::dag::model::{BranchCondition, BrowserAction, Dag, Edge, Node, TerminalResult};
use crate::types::{Action, Intent};

use super::common::{failure_edges, failure_nodes, primary_domain, stamp_domain_constraint, TemplateOptions};

/// Builds an extract-task template DAG.
#[must_use]
pub fn build(intent: &Intent, options: &TemplateOptions) -> Dag {
    const PREFIX: &str = "extract";
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
            id: "scroll_page".into(),
            action: BrowserAction {
                action_type: Action::Scroll,
                description: "scroll to load lazily-rendered content".to_string(),
                target: Some("down".to_string()),
                value: None,
            },
            expected_outcomes: vec![],
            extraction_targets: vec![],
            constraints: vec![],
            is_terminal: false,
            terminal_result: None,
        },
        Node {
            id: "extract_data".into(),
            action: BrowserAction {
                action_type: Action::Extract,
                description: "extract target data".to_string(),
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
                description: "extraction complete".to_string(),
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
            to: "scroll_page".into(),
            condition: BranchCondition::Default,
            priority: 100,
        },
        Edge {
            from: "scroll_page".into(),
            to: "extract_data".into(),
            condition: BranchCondition::Default,
            priority: 100,
        },
        Edge {
            from: "extract_data".into(),
            to: "success".into(),
            condition: BranchCondition::Default,
            priority: 100,
        },
    ];
    edges.extend(failure_edges("navigate", PREFIX));
    edges.extend(failure_edges("extract_data", PREFIX));

    stamp_domain_constraint(&mut nodes, intent);

    Dag {
        id: format!("extract-{}", uuid::Uuid::new_v4()),
        intent: intent.clone(),
        nodes,
        edges,
        entry_point: "navigate".into(),
        created_at: Utc::now(),
    }
}
