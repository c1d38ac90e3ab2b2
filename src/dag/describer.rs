//! Human-readable plan descriptions for confirmation UIs.

use std::collections::{HashSet, VecDeque};

use super::model::Dag;

/// One line of a plan description: a node's action plus its outgoing
/// branches, in BFS order from the entry point.
#[derive(Debug, Clone)]
pub struct PlanStep {
    /// The described node's id.
    pub node_id: String,
    /// The action description for this node.
    pub action: String,
    /// `"{condition description} → {destination node id}"` for each
    /// outgoing edge, in priority order.
    pub branches: Vec<String>,
    /// Present and populated with the terminal result if this node ends
    /// the session.
    pub terminal_result: Option<String>,
}

/// Describes `dag` as a BFS walk from its entry point: one [`PlanStep`]
/// per node, in visitation order, each listing its outgoing branches and
/// (if terminal) its terminal result.
#[must_use]
pub fn describe_plan(dag: &Dag) -> Vec<PlanStep> {
    let mut visited = HashSet::new();
    let mut queue = VecDeque::new();
    let mut steps = Vec::new();

    queue.push_back(dag.entry_point.clone());
    visited.insert(dag.entry_point.clone());

    while let Some(node_id) = queue.pop_front() {
        let Some(node) = dag.node(&node_id) else {
            continue;
        };

        let outgoing = dag.outgoing(&node_id);
        let branches = outgoing
            .iter()
            .map(|edge| format!("{} → {}", edge.condition.describe(), edge.to))
            .collect();

        steps.push(PlanStep {
            node_id: node_id.to_string(),
            action: node.action.description.clone(),
            branches,
            terminal_result: node
                .terminal_result
                .map(|r| format!("{r:?}").to_lowercase()),
        });

        for edge in outgoing {
            if visited.insert(edge.to.clone()) {
                queue.push_back(edge.to.clone());
            }
        }
    }

    steps
}

/// Renders [`describe_plan`]'s output as plain text, one line per step.
#[must_use]
pub fn describe_plan_text(dag: &Dag) -> String {
    describe_plan(dag)
        .iter()
        .map(|step| {
            let mut line = format!("{}: {}", step.node_id, step.action);
            if !step.branches.is_empty() {
                line.push_str(&format!(" [{}]", step.branches.join("; ")));
            }
            if let Some(result) = &step.terminal_result {
                line.push_str(&format!(" (terminal: {result})"));
            }
            line
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use chrono::Utc;

    use super::*;
    use crate::dag::model::{BranchCondition, BrowserAction, Edge, Node, TerminalResult};
    use crate::types::{Action, Intent, TaskType};

    fn dag() -> Dag {
        let intent = Intent {
            goal: "goal".to_string(),
            task_type: TaskType::Search,
            allowed_domains: BTreeSet::from(["example.com".to_string()]),
            allowed_actions: BTreeSet::from([Action::Navigate, Action::Extract]),
            sensitive_data: BTreeSet::new(),
            max_depth: 5,
            timeout_ms: 30_000,
            original_request: "r".to_string(),
            created_at: Utc::now(),
        };
        Dag {
            id: "d".to_string(),
            intent,
            nodes: vec![
                Node {
                    id: "start".into(),
                    action: BrowserAction {
                        action_type: Action::Navigate,
                        description: "go to example.com".to_string(),
                        target: Some("https://example.com".to_string()),
                        value: None,
                    },
                    expected_outcomes: vec![],
                    extraction_targets: vec![],
                    constraints: vec![],
                    is_terminal: false,
                    terminal_result: None,
                },
                Node {
                    id: "end".into(),
                    action: BrowserAction {
                        action_type: Action::Extract,
                        description: "extract results".to_string(),
                        target: None,
                        value: None,
                    },
                    expected_outcomes: vec![],
                    extraction_targets: vec![],
                    constraints: vec![],
                    is_terminal: true,
                    terminal_result: Some(TerminalResult::Success),
                },
            ],
            edges: vec![Edge {
                from: "start".into(),
                to: "end".into(),
                condition: BranchCondition::Default,
                priority: 0,
            }],
            entry_point: "start".into(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn walks_in_bfs_order_from_entry() {
        let steps = describe_plan(&dag());
        assert_eq!(steps.len(), 2);
        assert_eq!(steps[0].node_id, "start");
        assert_eq!(steps[1].node_id, "end");
        assert_eq!(steps[1].terminal_result.as_deref(), Some("success"));
    }

    #[test]
    fn text_rendering_includes_branches() {
        let text = describe_plan_text(&dag());
        assert!(text.contains("otherwise → end"));
    }
}
