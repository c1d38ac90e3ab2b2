//! Structural validation of a [`Dag`] against the invariants in the data
//! model: the entry exists, every non-terminal node has outgoing edges,
//! every node is reachable, every edge endpoint resolves, and at least
//! one terminal exists.

use std::collections::{HashSet, VecDeque};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::model::Dag;

/// Errors constructing or loading a DAG outside of structural validation
/// (structural issues are reported via [`ValidationReport`], not this
/// type — see the design note on decisions-as-data).
#[derive(Debug, Error)]
pub enum DagError {
    /// The DAG failed structural validation and the caller required a
    /// valid one (e.g. plan generation after retries exhausted).
    #[error("DAG '{dag_id}' failed validation: {issues:?}")]
    Invalid {
        /// The invalid DAG's id.
        dag_id: String,
        /// The specific structural issues found.
        issues: Vec<String>,
    },
}

/// The result of validating a DAG's structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationReport {
    /// Whether the DAG passed every structural invariant.
    pub valid: bool,
    /// Human-readable descriptions of every invariant violated.
    pub issues: Vec<String>,
}

/// Validates `dag` against every structural invariant.
#[must_use]
pub fn validate_dag(dag: &Dag) -> ValidationReport {
    let mut issues = Vec::new();

    let node_ids: HashSet<&super::model::NodeId> = dag.nodes.iter().map(|n| &n.id).collect();

    if !node_ids.contains(&dag.entry_point) {
        issues.push(format!(
            "entry point '{}' is not a node in this DAG",
            dag.entry_point
        ));
    }

    for edge in &dag.edges {
        if !node_ids.contains(&edge.from) {
            issues.push(format!("edge references unknown source node '{}'", edge.from));
        }
        if !node_ids.contains(&edge.to) {
            issues.push(format!(
                "edge from '{}' references unknown destination node '{}'",
                edge.from, edge.to
            ));
        }
    }

    for node in &dag.nodes {
        if !node.is_terminal && dag.outgoing(&node.id).is_empty() {
            issues.push(format!(
                "non-terminal node '{}' has no outgoing edges",
                node.id
            ));
        }
    }

    if !dag.nodes.iter().any(|n| n.is_terminal) {
        issues.push("DAG has no terminal node".to_string());
    }

    if node_ids.contains(&dag.entry_point) {
        let reachable = reachable_from(dag, &dag.entry_point);
        for node in &dag.nodes {
            if !reachable.contains(&node.id) {
                issues.push(format!("node '{}' is not reachable from the entry point", node.id));
            }
        }
    }

    ValidationReport {
        valid: issues.is_empty(),
        issues,
    }
}

fn reachable_from(dag: &Dag, entry: &super::model::NodeId) -> HashSet<super::model::NodeId> {
    let mut visited = HashSet::new();
    let mut queue = VecDeque::new();
    queue.push_back(entry.clone());
    visited.insert(entry.clone());

    while let Some(current) = queue.pop_front() {
        for edge in dag.outgoing(&current) {
            if visited.insert(edge.to.clone()) {
                queue.push_back(edge.to.clone());
            }
        }
    }

    visited
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use chrono::Utc;

    use super::*;
    use crate::dag::model::{BrowserAction, Edge, Node, TerminalResult};
    use crate::types::{Action, Intent, TaskType};

    fn base_intent() -> Intent {
        Intent {
            goal: "goal".to_string(),
            task_type: TaskType::Search,
            allowed_domains: BTreeSet::from(["example.com".to_string()]),
            allowed_actions: BTreeSet::from([Action::Navigate, Action::Extract]),
            sensitive_data: BTreeSet::new(),
            max_depth: 5,
            timeout_ms: 30_000,
            original_request: "r".to_string(),
            created_at: Utc::now(),
        }
    }

    fn node(id: &str, terminal: bool) -> Node {
        Node {
            id: id.into(),
            action: BrowserAction {
                action_type: Action::Navigate,
                description: "go".to_string(),
                target: Some("https://example.com".to_string()),
                value: None,
            },
            expected_outcomes: vec![],
            extraction_targets: vec![],
            constraints: vec![],
            is_terminal: terminal,
            terminal_result: terminal.then_some(TerminalResult::Success),
        }
    }

    fn base_dag() -> Dag {
        Dag {
            id: "dag-1".to_string(),
            intent: base_intent(),
            nodes: vec![node("start", false), node("end", true)],
            edges: vec![Edge {
                from: "start".into(),
                to: "end".into(),
                condition: crate::dag::model::BranchCondition::Default,
                priority: 0,
            }],
            entry_point: "start".into(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn valid_dag_passes() {
        let report = validate_dag(&base_dag());
        assert!(report.valid, "{:?}", report.issues);
    }

    #[test]
    fn missing_entry_point_is_invalid() {
        let mut dag = base_dag();
        dag.entry_point = "nowhere".into();
        let report = validate_dag(&dag);
        assert!(!report.valid);
        assert!(report.issues.iter().any(|i| i.contains("entry point")));
    }

    #[test]
    fn unreachable_node_is_invalid() {
        let mut dag = base_dag();
        dag.nodes.push(node("orphan", true));
        let report = validate_dag(&dag);
        assert!(!report.valid);
        assert!(report.issues.iter().any(|i| i.contains("orphan")));
    }

    #[test]
    fn non_terminal_without_outgoing_edges_is_invalid() {
        let mut dag = base_dag();
        dag.edges.clear();
        let report = validate_dag(&dag);
        assert!(!report.valid);
        assert!(report.issues.iter().any(|i| i.contains("no outgoing edges")));
    }

    #[test]
    fn no_terminal_node_is_invalid() {
        let mut dag = base_dag();
        for node in &mut dag.nodes {
            node.is_terminal = false;
            node.terminal_result = None;
        }
        dag.edges.push(Edge {
            from: "end".into(),
            to: "start".into(),
            condition: crate::dag::model::BranchCondition::Default,
            priority: 0,
        });
        let report = validate_dag(&dag);
        assert!(!report.valid);
        assert!(report.issues.iter().any(|i| i.contains("no terminal")));
    }

    #[test]
    fn dangling_edge_endpoint_is_invalid() {
        let mut dag = base_dag();
        dag.edges.push(Edge {
            from: "start".into(),
            to: "ghost".into(),
            condition: crate::dag::model::BranchCondition::Default,
            priority: 1,
        });
        let report = validate_dag(&dag);
        assert!(!report.valid);
        assert!(report.issues.iter().any(|i| i.contains("ghost")));
    }
}
