//! The secure interpreter: the step-bounded driver that walks a [`Dag`]
//! against a live [`BrowserAdapter`], re-checking policy before every
//! action and re-validating expected outcomes and branch steering after
//! every observation.

use std::time::Instant;

use chrono::Utc;
use regex::Regex;
use serde_json::Value;

use crate::dag::model::{BranchCondition, Dag, Edge, Node, NodeId, TerminalResult};
use crate::policy::{ActionContext, PlannedAction, PolicyEngine};
use crate::refs::RefManager;
use crate::types::Action;

use super::adapter::{BrowserAdapter, ScrollDirection};
use super::model::{ExecutionStatus, Observation, SessionResult, TraceDecision, TraceEntry};
use super::selector;
use super::steering::{detect_steering, SteeringContext};

/// Upper bound on one session's wall-clock budget, regardless of what an
/// intent's `timeout_ms` requests.
pub const MAX_SESSION_TIMEOUT_MS: u64 = 300_000;

/// Drives one [`Dag`] to completion against a live [`BrowserAdapter`],
/// holding its own [`PolicyEngine`] and [`RefManager`] as owned state
/// rather than shared handles — a session's security posture must not be
/// mutable out from under it mid-execution.
pub struct SecureInterpreter<A: BrowserAdapter> {
    policy: PolicyEngine,
    refs: RefManager,
    adapter: A,
}

impl<A: BrowserAdapter> SecureInterpreter<A> {
    /// Builds an interpreter from its three owned collaborators.
    #[must_use]
    pub fn new(policy: PolicyEngine, refs: RefManager, adapter: A) -> Self {
        Self { policy, refs, adapter }
    }

    /// The ref manager, for callers that want to inspect snapshot history
    /// after a session completes.
    #[must_use]
    pub fn refs(&self) -> &RefManager {
        &self.refs
    }

    /// Drives `dag` from its entry point to a terminal node, a policy
    /// denial, a validation failure, detected branch steering, or the
    /// session's timeout, whichever comes first.
    #[tracing::instrument(skip(self, dag), fields(dag_id = %dag.id, entry = %dag.entry_point))]
    pub async fn execute(&mut self, dag: &Dag) -> SessionResult {
        let started = Instant::now();
        let timeout_ms = dag.intent.timeout_ms.min(MAX_SESSION_TIMEOUT_MS);
        let max_depth = dag.intent.max_depth;

        let mut trace = Vec::new();
        let mut collected_data: Option<Value> = None;
        let mut steering_ctx = SteeringContext::default();
        let mut current_id = dag.entry_point.clone();
        let mut current_url: Option<String> = None;
        let mut depth: u32 = 0;

        loop {
            if elapsed_ms(started) >= timeout_ms {
                return Self::finish(ExecutionStatus::Timeout, collected_data, Some("execution deadline elapsed".to_string()), trace, started);
            }

            let Some(node) = dag.node(&current_id) else {
                return Self::finish(
                    ExecutionStatus::Error,
                    collected_data,
                    Some(format!("node '{current_id}' not found")),
                    trace,
                    started,
                );
            };

            if depth > max_depth {
                return Self::finish(
                    ExecutionStatus::Aborted,
                    collected_data,
                    Some(format!("session exceeded its max depth of {max_depth}")),
                    trace,
                    started,
                );
            }

            let planned = PlannedAction {
                action: Some(node.action.action_type),
                target: node.action.target.clone(),
                description: Some(node.action.description.clone()),
            };
            let ctx = ActionContext {
                current_url: current_url.clone(),
                is_https: current_url.as_deref().map(|u| u.starts_with("https://")),
            };
            let decision = self.policy.allows(&planned, &ctx);
            if !decision.allowed {
                tracing::warn!(node = %node.id, action = ?node.action.action_type, reason = %decision.reason, "policy blocked action");
                trace.push(TraceEntry {
                    node_id: node.id.0.clone(),
                    action: node.action.action_type,
                    observation: None,
                    decision: TraceDecision::Abort,
                    taken_branch: None,
                    timestamp: Utc::now(),
                });
                return Self::finish(ExecutionStatus::Blocked, collected_data, Some(decision.reason), trace, started);
            }

            let (observation, extracted) = match self.dispatch(node).await {
                Ok(pair) => pair,
                Err(e) => {
                    trace.push(TraceEntry {
                        node_id: node.id.0.clone(),
                        action: node.action.action_type,
                        observation: None,
                        decision: TraceDecision::Abort,
                        taken_branch: None,
                        timestamp: Utc::now(),
                    });
                    return Self::finish(ExecutionStatus::Error, collected_data, Some(e.to_string()), trace, started);
                }
            };

            if let Some(value) = extracted {
                collected_data = Some(merge_extracted(collected_data, &node.id.0, value));
            }

            current_url = Some(observation.url.clone());
            let domain = crate::intent::patterns::extract_host(&observation.url);
            if let Some(domain) = &domain {
                steering_ctx.record_domain(domain.clone());
            }

            if node.is_terminal {
                trace.push(TraceEntry {
                    node_id: node.id.0.clone(),
                    action: node.action.action_type,
                    observation: Some(observation),
                    decision: TraceDecision::Continue,
                    taken_branch: None,
                    timestamp: Utc::now(),
                });
                let status = match node.terminal_result {
                    Some(TerminalResult::Success) => ExecutionStatus::Complete,
                    Some(TerminalResult::Abort) => ExecutionStatus::Aborted,
                    Some(TerminalResult::Error) | None => ExecutionStatus::Error,
                };
                return Self::finish(status, collected_data, None, trace, started);
            }

            if let Err(reason) = validate_outcomes(node, &observation) {
                trace.push(TraceEntry {
                    node_id: node.id.0.clone(),
                    action: node.action.action_type,
                    observation: Some(observation),
                    decision: TraceDecision::Abort,
                    taken_branch: None,
                    timestamp: Utc::now(),
                });
                return Self::finish(ExecutionStatus::Aborted, collected_data, Some(reason), trace, started);
            }

            let edge = match select_branch(dag, &node.id, &observation) {
                Some(edge) => edge,
                None => {
                    trace.push(TraceEntry {
                        node_id: node.id.0.clone(),
                        action: node.action.action_type,
                        observation: Some(observation),
                        decision: TraceDecision::Abort,
                        taken_branch: None,
                        timestamp: Utc::now(),
                    });
                    return Self::finish(
                        ExecutionStatus::Error,
                        collected_data,
                        Some(format!("no outgoing branch condition matched from node '{}'", node.id)),
                        trace,
                        started,
                    );
                }
            };

            if let Some(domain) = &domain {
                if detect_steering(domain, &steering_ctx) {
                    tracing::warn!(node = %node.id, domain = %domain, "branch steering detected");
                    trace.push(TraceEntry {
                        node_id: node.id.0.clone(),
                        action: node.action.action_type,
                        observation: Some(observation),
                        decision: TraceDecision::Abort,
                        taken_branch: None,
                        timestamp: Utc::now(),
                    });
                    return Self::finish(
                        ExecutionStatus::Aborted,
                        collected_data,
                        Some(format!("branch steering detected: unexpected transition to '{domain}'")),
                        trace,
                        started,
                    );
                }
            }

            trace.push(TraceEntry {
                node_id: node.id.0.clone(),
                action: node.action.action_type,
                observation: Some(observation),
                decision: TraceDecision::Branch,
                taken_branch: Some(edge.to.0.clone()),
                timestamp: Utc::now(),
            });
            current_id = edge.to.clone();
            depth += 1;
        }
    }

    async fn dispatch(&mut self, node: &Node) -> Result<(Observation, Option<Value>), super::model::InterpreterError> {
        match node.action.action_type {
            Action::Navigate => {
                let url = node.action.target.clone().unwrap_or_default();
                Ok((self.adapter.navigate(&url).await?, None))
            }
            Action::Click => {
                let selector = node.action.target.clone().unwrap_or_default();
                Ok((self.adapter.click(&selector).await?, None))
            }
            Action::Type => {
                let selector = node.action.target.clone().unwrap_or_default();
                let text = node.action.value.clone().unwrap_or_default();
                Ok((self.adapter.type_text(&selector, &text).await?, None))
            }
            Action::Scroll => {
                let direction = match node.action.value.as_deref() {
                    Some("up") => ScrollDirection::Up,
                    _ => ScrollDirection::Down,
                };
                Ok((self.adapter.scroll(direction, None).await?, None))
            }
            Action::Extract => {
                let selectors: Vec<String> = node
                    .extraction_targets
                    .iter()
                    .map(|t| t.selector.clone())
                    .collect();
                let (observation, value) = self.adapter.extract(&selectors).await?;
                Ok((observation, Some(value)))
            }
            Action::Screenshot => {
                let (observation, _bytes) = self.adapter.screenshot().await?;
                Ok((observation, None))
            }
            Action::Wait => {
                let ms = node
                    .action
                    .value
                    .as_deref()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(1_000);
                Ok((self.adapter.wait(ms).await?, None))
            }
        }
    }

    fn finish(
        status: ExecutionStatus,
        data: Option<Value>,
        reason: Option<String>,
        trace: Vec<TraceEntry>,
        started: Instant,
    ) -> SessionResult {
        let duration_ms = elapsed_ms(started);
        tracing::info!(?status, steps = trace.len(), duration_ms, "session finished");
        SessionResult {
            status,
            data,
            reason,
            trace,
            duration_ms,
        }
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

fn merge_extracted(existing: Option<Value>, node_id: &str, value: Value) -> Value {
    let mut map = match existing {
        Some(Value::Object(map)) => map,
        _ => serde_json::Map::new(),
    };
    map.insert(node_id.to_string(), value);
    Value::Object(map)
}

fn evaluate_condition(condition: &BranchCondition, observation: &Observation) -> bool {
    match condition {
        BranchCondition::Default => true,
        BranchCondition::ElementPresent { value } => selector::any_matches(value, &observation.elements),
        BranchCondition::ElementAbsent { value } => !selector::any_matches(value, &observation.elements),
        BranchCondition::UrlMatch { value } => Regex::new(value).is_ok_and(|re| re.is_match(&observation.url)),
        BranchCondition::ContentMatch { value } => observation.visible_text.as_deref().is_some_and(|text| {
            Regex::new(&format!("(?i){value}")).is_ok_and(|re| re.is_match(text))
        }),
    }
}

fn validate_outcomes(node: &Node, observation: &Observation) -> Result<(), String> {
    for outcome in &node.expected_outcomes {
        if outcome.required && !evaluate_condition(&outcome.condition, observation) {
            return Err(format!(
                "expected outcome '{}' did not hold after node '{}'",
                outcome.condition.describe(),
                node.id
            ));
        }
    }
    Ok(())
}

fn select_branch<'a>(dag: &'a Dag, node_id: &NodeId, observation: &Observation) -> Option<&'a Edge> {
    dag.outgoing(node_id)
        .into_iter()
        .find(|edge| evaluate_condition(&edge.condition, observation))
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use chrono::Utc;

    use super::*;
    use crate::dag::model::{BrowserAction, ExpectedOutcome};
    use crate::interpreter::mock::MockBrowserAdapter;
    use crate::types::{Intent, TaskType};

    fn test_intent(domains: &[&str], actions: &[Action], timeout_ms: u64, max_depth: u32) -> Intent {
        Intent {
            goal: "test goal".to_string(),
            task_type: TaskType::Extract,
            allowed_domains: domains.iter().map(|d| (*d).to_string()).collect(),
            allowed_actions: actions.iter().copied().collect(),
            sensitive_data: BTreeSet::new(),
            max_depth,
            timeout_ms,
            original_request: "test".to_string(),
            created_at: Utc::now(),
        }
    }

    fn node(id: &str, action_type: Action, target: Option<&str>, is_terminal: bool, terminal_result: Option<TerminalResult>) -> Node {
        Node {
            id: NodeId::from(id),
            action: BrowserAction {
                action_type,
                description: format!("{action_type} step"),
                target: target.map(str::to_string),
                value: None,
            },
            expected_outcomes: vec![],
            extraction_targets: vec![],
            constraints: vec![],
            is_terminal,
            terminal_result,
        }
    }

    #[tokio::test]
    async fn completes_to_success_terminal() {
        let intent = test_intent(&["example.com"], &[Action::Navigate, Action::Extract], 30_000, 5);
        let dag = Dag {
            id: "d1".to_string(),
            intent: intent.clone(),
            nodes: vec![
                node("start", Action::Navigate, Some("https://example.com"), false, None),
                node("done", Action::Extract, None, true, Some(TerminalResult::Success)),
            ],
            edges: vec![Edge {
                from: "start".into(),
                to: "done".into(),
                condition: BranchCondition::Default,
                priority: 0,
            }],
            entry_point: "start".into(),
            created_at: Utc::now(),
        };

        let mut adapter = MockBrowserAdapter::new();
        adapter.queue_observation(Observation::bare("https://example.com"));
        adapter.queue_observation(Observation::bare("https://example.com"));
        adapter.queue_extraction(serde_json::json!({"title": "Example"}));

        let policy = PolicyEngine::new(Some(intent));
        let mut interpreter = SecureInterpreter::new(policy, RefManager::default(), adapter);
        let result = interpreter.execute(&dag).await;

        assert_eq!(result.status, ExecutionStatus::Complete);
        assert!(result.data.is_some());
        assert_eq!(result.trace.len(), 2);
    }

    #[tokio::test]
    async fn policy_denial_blocks_execution() {
        let intent = test_intent(&["example.com"], &[Action::Navigate], 30_000, 5);
        let dag = Dag {
            id: "d2".to_string(),
            intent: intent.clone(),
            nodes: vec![node(
                "start",
                Action::Navigate,
                Some("https://evil.example"),
                true,
                Some(TerminalResult::Success),
            )],
            edges: vec![],
            entry_point: "start".into(),
            created_at: Utc::now(),
        };

        let policy = PolicyEngine::new(Some(intent));
        let mut interpreter = SecureInterpreter::new(policy, RefManager::default(), MockBrowserAdapter::new());
        let result = interpreter.execute(&dag).await;

        assert_eq!(result.status, ExecutionStatus::Blocked);
    }

    #[tokio::test]
    async fn zero_timeout_yields_timeout_status() {
        let intent = test_intent(&["example.com"], &[Action::Navigate], 0, 5);
        let dag = Dag {
            id: "d3".to_string(),
            intent: intent.clone(),
            nodes: vec![node(
                "start",
                Action::Navigate,
                Some("https://example.com"),
                true,
                Some(TerminalResult::Success),
            )],
            edges: vec![],
            entry_point: "start".into(),
            created_at: Utc::now(),
        };

        let policy = PolicyEngine::new(Some(intent));
        let mut interpreter = SecureInterpreter::new(policy, RefManager::default(), MockBrowserAdapter::new());
        let result = interpreter.execute(&dag).await;

        assert_eq!(result.status, ExecutionStatus::Timeout);
    }

    #[tokio::test]
    async fn no_matching_branch_is_error() {
        let intent = test_intent(&["example.com"], &[Action::Navigate], 30_000, 5);
        let dag = Dag {
            id: "d4".to_string(),
            intent: intent.clone(),
            nodes: vec![node("start", Action::Navigate, Some("https://example.com"), false, None)],
            edges: vec![Edge {
                from: "start".into(),
                to: "nowhere".into(),
                condition: BranchCondition::UrlMatch {
                    value: "^https://nomatch".to_string(),
                },
                priority: 0,
            }],
            entry_point: "start".into(),
            created_at: Utc::now(),
        };

        let mut adapter = MockBrowserAdapter::new();
        adapter.queue_observation(Observation::bare("https://example.com"));

        let policy = PolicyEngine::new(Some(intent));
        let mut interpreter = SecureInterpreter::new(policy, RefManager::default(), adapter);
        let result = interpreter.execute(&dag).await;

        assert_eq!(result.status, ExecutionStatus::Error);
    }

    #[tokio::test]
    async fn required_outcome_mismatch_aborts() {
        let intent = test_intent(&["example.com"], &[Action::Navigate], 30_000, 5);
        let mut start = node("start", Action::Navigate, Some("https://example.com"), false, None);
        start.expected_outcomes.push(ExpectedOutcome {
            condition: BranchCondition::ElementPresent {
                value: "#missing".to_string(),
            },
            required: true,
        });
        let dag = Dag {
            id: "d5".to_string(),
            intent: intent.clone(),
            nodes: vec![
                start,
                node("done", Action::Extract, None, true, Some(TerminalResult::Success)),
            ],
            edges: vec![Edge {
                from: "start".into(),
                to: "done".into(),
                condition: BranchCondition::Default,
                priority: 0,
            }],
            entry_point: "start".into(),
            created_at: Utc::now(),
        };

        let mut adapter = MockBrowserAdapter::new();
        adapter.queue_observation(Observation::bare("https://example.com"));

        let policy = PolicyEngine::new(Some(intent));
        let mut interpreter = SecureInterpreter::new(policy, RefManager::default(), adapter);
        let result = interpreter.execute(&dag).await;

        assert_eq!(result.status, ExecutionStatus::Aborted);
    }
}
