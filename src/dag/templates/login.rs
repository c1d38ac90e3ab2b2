//! Template for `TaskType::Login`: navigate, fill credentials, submit.

use chrono::Utc;

use crate::dag::model::{BranchCondition, BrowserAction, Dag, Edge, Node, TerminalResult};
use crate::types::{Action, Intent};

use super::common::{failure_edges, failure_nodes, primary_domain, stamp_domain_constraint, TemplateOptions};

/// Builds a login-task template DAG.
#[must_use]
pub fn build(intent: &Intent, options: &TemplateOptions) -> Dag {
    const PREFIX: &str = "login";
    let domain = primary_domain(intent);

    let mut nodes = vec![
        Node {
            id: "navigate".into(),
            action: BrowserAction {
                action_type: Action::Navigate,
                description: format!("navigate to {domain} login page"),
                target: Some(format!("https://{domain}/login")),
                value: None,
            },
            expected_outcomes: vec![],
            extraction_targets: vec![],
            constraints: vec![],
            is_terminal: false,
            terminal_result: None,
        },
        Node {
            id: "type_username".into(),
            action: BrowserAction {
                action_type: Action::Type,
                description: "enter username".to_string(),
                target: Some("input[name=username], input[type=email]".to_string()),
                value: None,
            },
            expected_outcomes: vec![],
            extraction_targets: vec![],
            constraints: vec![],
            is_terminal: false,
            terminal_result: None,
        },
        Node {
            id: "type_password".into(),
            action: BrowserAction {
                action_type: Action::Type,
                description: "enter password".to_string(),
                target: Some("input[type=password]".to_string()),
                value: None,
            },
            expected_outcomes: vec![],
            extraction_targets: vec![],
            constraints: vec![],
            is_terminal: false,
            terminal_result: None,
        },
        Node {
            id: "submit_login".into(),
            action: BrowserAction {
                action_type: Action::Click,
                description: "submit login".to_string(),
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
            id: "success".into(),
            action: BrowserAction {
                action_type: Action::Extract,
                description: "login complete".to_string(),
                target: None,
                value: None,
            },
            expected_outcomes: vec![],
            extraction_targets: options.extraction_targets.clone(),
            constraints: vec![],
            is_terminal: true,
            terminal_result: Some(TerminalResult::Success),
        },
    ];
    nodes.extend(failure_nodes(PREFIX));

    let mut edges = vec![
        Edge {
            from: "navigate".into(),
            to: "type_username".into(),
            condition: BranchCondition::Default,
            priority: 100,
        },
        Edge {
            from: "type_username".into(),
            to: "type_password".into(),
            condition: BranchCondition::Default,
            priority: 100,
        },
        Edge {
            from: "type_password".into(),
            to: "submit_login".into(),
            condition: BranchCondition::Default,
            priority: 100,
        },
        Edge {
            from: "submit_login".into(),
            to: "success".into(),
            condition: BranchCondition::ContentMatch {
                value: r"(?i)welcome|dashboard|signed in".to_string(),
            },
            priority: 10,
        },
    ];
    edges.extend(failure_edges("navigate", PREFIX));
    edges.extend(failure_edges("submit_login", PREFIX));
    edges.push(Edge {
        from: "submit_login".into(),
        to: "login_login_required".into(),
        condition: BranchCondition::Default,
        priority: 100,
    });

    stamp_domain_constraint(&mut nodes, intent);

    Dag {
        id: format!("login-{}", uuid::Uuid::new_v4()),
        intent: intent.clone(),
        nodes,
        edges,
        entry_point: "navigate".into(),
        created_at: Utc::now(),
    }
}
