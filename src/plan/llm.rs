//! The LLM-backed plan generation strategy: a port plus the prompt
//! construction, response extraction, and domain re-constraining around
//! it.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::LazyLock;

use regex::Regex;

use crate::dag::{BranchCondition, Constraint, Dag, Edge, ExpectedOutcome, ExtractionTarget, Node, NodeId};
use crate::types::{Action, Intent};

use super::generator::PlanError;

/// What an [`LlmProvider`] returns for one plan-generation call.
#[derive(Debug, Clone)]
pub struct LlmPlanResponse {
    /// The raw text the provider returned, fenced code block or not.
    pub raw_response: String,
    /// Token usage, if the provider reports it.
    pub tokens_used: Option<u64>,
}

/// The LLM integration point: a single async operation returning a
/// structured response. Composition (logging, caching, retries-at-a-
/// higher-layer) happens via decorators over this trait, never inside an
/// implementation of it — the port itself must not retry.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Generates a plan for `intent`, given a fixed `system_prompt`, a
    /// derived `user_prompt`, and a JSON `schema` describing the DAG
    /// shape the response should conform to.
    async fn generate_plan(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        schema: &Value,
        intent: &Intent,
    ) -> Result<LlmPlanResponse, PlanError>;
}

/// The fixed system prompt declaring the single-shot principle, the
/// action/condition alphabets, the security rules, and the requirement
/// for complete branch enumeration.
#[must_use]
pub fn system_prompt() -> String {
    r#"You are the planning component of a browser automation security system.
Produce a single complete execution plan as a DAG. No further planning
calls will be made once execution starts — every branch the session
could take must be enumerated now, including failure modes (404,
login-required, CAPTCHA, cookie banner, rate-limit, no-results).

Action alphabet: navigate, click, scroll, type, extract, screenshot, wait.
Condition alphabet: element_present, element_absent, url_match, content_match, default.

Security rules, non-negotiable:
- Every node must stay within the intent's allowed domains.
- Never include a node that completes a payment or submits credentials
  over a non-HTTPS origin.
- Every non-terminal node must have at least one outgoing edge.
- At least one terminal node must exist, each labeled success, error, or abort.

Respond with JSON matching the supplied schema, optionally inside a
```json fenced code block. Required keys: nodes, edges, entryPoint."#
        .to_string()
}

/// Builds the user prompt for `intent`: a plain-language restatement of
/// the goal, task type, allowed domains/actions, and bounds.
#[must_use]
pub fn user_prompt(intent: &Intent) -> String {
    format!(
        "Goal: {}\nTask type: {}\nAllowed domains: {}\nAllowed actions: {}\nMax depth: {}\nTimeout: {}ms",
        intent.goal,
        intent.task_type,
        intent
            .allowed_domains
            .iter()
            .cloned()
            .collect::<Vec<_>>()
            .join(", "),
        intent
            .allowed_actions
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", "),
        intent.max_depth,
        intent.timeout_ms,
    )
}

/// The JSON schema describing the on-the-wire DAG shape, supplied to the
/// provider alongside the prompts.
#[must_use]
pub fn dag_schema() -> Value {
    serde_json::json!({
        "type": "object",
        "required": ["nodes", "edges", "entryPoint"],
        "properties": {
            "nodes": {"type": "array"},
            "edges": {"type": "array"},
            "entryPoint": {"type": "string"}
        }
    })
}

static FENCED_JSON_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```(?:json)?\s*(\{.*?\})\s*```").expect("fence pattern compiles"));

/// Extracts a JSON object from `raw`, preferring a fenced code block if
/// present, else the raw text itself.
#[must_use]
pub fn extract_json(raw: &str) -> Option<Value> {
    if let Some(captures) = FENCED_JSON_RE.captures(raw) {
        if let Some(json_text) = captures.get(1) {
            if let Ok(value) = serde_json::from_str(json_text.as_str()) {
                return Some(value);
            }
        }
    }
    serde_json::from_str(raw.trim()).ok()
}

#[derive(Debug, Deserialize)]
struct WireDag {
    nodes: Vec<WireNode>,
    edges: Vec<WireEdge>,
    #[serde(rename = "entryPoint")]
    entry_point: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireNode {
    id: String,
    action: WireAction,
    #[serde(default, rename = "expectedOutcomes")]
    expected_outcomes: Vec<ExpectedOutcome>,
    #[serde(default, rename = "extractionTargets")]
    extraction_targets: Vec<ExtractionTarget>,
    #[serde(default, rename = "isTerminal")]
    is_terminal: bool,
    #[serde(default, rename = "terminalResult")]
    terminal_result: Option<crate::dag::TerminalResult>,
}

#[derive(Debug, Deserialize)]
struct WireAction {
    #[serde(rename = "type")]
    action_type: Action,
    description: String,
    #[serde(default)]
    target: Option<String>,
    #[serde(default)]
    value: Option<String>,
}

#[derive(Debug, Deserialize, Serialize)]
struct WireEdge {
    from: String,
    to: String,
    condition: BranchCondition,
    #[serde(default)]
    priority: u32,
}

/// Parses a provider's raw response into a [`Dag`], applying the
/// defaulting rules (missing constraint/outcome arrays become empty,
/// missing `entryPoint` falls back to the first node id) and then
/// re-stamping every node's domain constraint from `intent` regardless
/// of what the response contained.
///
/// # Errors
///
/// Returns [`PlanError::LlmResponseUnparseable`] if no JSON object could
/// be extracted, or [`PlanError::LlmResponseMalformed`] if the extracted
/// JSON doesn't match the wire shape.
pub fn parse_llm_response(raw: &str, intent: &Intent) -> Result<Dag, PlanError> {
    let json = extract_json(raw).ok_or_else(|| PlanError::LlmResponseUnparseable {
        raw: raw.to_string(),
    })?;

    let wire: WireDag = serde_json::from_value(json).map_err(|e| PlanError::LlmResponseMalformed {
        reason: e.to_string(),
    })?;

    if wire.nodes.is_empty() {
        return Err(PlanError::LlmResponseMalformed {
            reason: "response contained no nodes".to_string(),
        });
    }

    let entry_point: NodeId = wire
        .entry_point
        .unwrap_or_else(|| wire.nodes[0].id.clone())
        .into();

    let domain_constraint = Constraint::Domain {
        allowed: intent.allowed_domains.clone(),
    };

    let nodes = wire
        .nodes
        .into_iter()
        .map(|n| Node {
            id: n.id.into(),
            action: crate::dag::BrowserAction {
                action_type: n.action.action_type,
                description: n.action.description,
                target: n.action.target,
                value: n.action.value,
            },
            expected_outcomes: n.expected_outcomes,
            extraction_targets: n.extraction_targets,
            constraints: vec![domain_constraint.clone()],
            is_terminal: n.is_terminal,
            terminal_result: n.terminal_result,
        })
        .collect();

    let edges = wire
        .edges
        .into_iter()
        .map(|e| Edge {
            from: e.from.into(),
            to: e.to.into(),
            condition: e.condition,
            priority: e.priority,
        })
        .collect();

    Ok(Dag {
        id: format!("llm-{}", uuid::Uuid::new_v4()),
        intent: intent.clone(),
        nodes,
        edges,
        entry_point,
        created_at: chrono::Utc::now(),
    })
}

/// A test double that returns a fixed response (or error) regardless of
/// input, for exercising the plan generator without a real provider.
pub struct MockLlmProvider {
    response: Result<String, String>,
}

impl MockLlmProvider {
    /// A mock that always returns `raw_response` verbatim.
    #[must_use]
    pub fn responding_with(raw_response: impl Into<String>) -> Self {
        Self {
            response: Ok(raw_response.into()),
        }
    }

    /// A mock that always fails with `reason`.
    #[must_use]
    pub fn failing_with(reason: impl Into<String>) -> Self {
        Self {
            response: Err(reason.into()),
        }
    }
}

#[async_trait]
impl LlmProvider for MockLlmProvider {
    async fn generate_plan(
        &self,
        _system_prompt: &str,
        _user_prompt: &str,
        _schema: &Value,
        _intent: &Intent,
    ) -> Result<LlmPlanResponse, PlanError> {
        match &self.response {
            Ok(raw) => Ok(LlmPlanResponse {
                raw_response: raw.clone(),
                tokens_used: None,
            }),
            Err(reason) => Err(PlanError::LlmProviderFailed {
                reason: reason.clone(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn intent() -> Intent {
        Intent {
            goal: "goal".to_string(),
            task_type: crate::types::TaskType::Search,
            allowed_domains: BTreeSet::from(["example.com".to_string()]),
            allowed_actions: BTreeSet::from([Action::Navigate, Action::Extract]),
            sensitive_data: BTreeSet::new(),
            max_depth: 3,
            timeout_ms: 30_000,
            original_request: "r".to_string(),
            created_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn extracts_json_from_fenced_block() {
        let raw = "here is the plan:\n```json\n{\"nodes\":[],\"edges\":[]}\n```\nthanks";
        let value = extract_json(raw).unwrap();
        assert!(value.get("nodes").is_some());
    }

    #[test]
    fn extracts_bare_json() {
        let raw = "{\"nodes\":[],\"edges\":[]}";
        assert!(extract_json(raw).is_some());
    }

    #[test]
    fn parses_response_and_reconstrains_domains() {
        let raw = r#"{
            "nodes": [
                {"id": "n1", "action": {"type": "navigate", "description": "go"}, "isTerminal": true, "terminalResult": "success"}
            ],
            "edges": [],
            "entryPoint": "n1"
        }"#;
        let dag = parse_llm_response(raw, &intent()).unwrap();
        assert_eq!(dag.entry_point.to_string(), "n1");
        assert!(dag.nodes[0]
            .constraints
            .iter()
            .any(|c| matches!(c, Constraint::Domain { allowed } if allowed.contains("example.com"))));
    }

    #[test]
    fn missing_entry_point_falls_back_to_first_node() {
        let raw = r#"{
            "nodes": [
                {"id": "only", "action": {"type": "extract", "description": "go"}, "isTerminal": true, "terminalResult": "success"}
            ],
            "edges": []
        }"#;
        let dag = parse_llm_response(raw, &intent()).unwrap();
        assert_eq!(dag.entry_point.to_string(), "only");
    }

    #[test]
    fn unparseable_response_is_an_error() {
        assert!(parse_llm_response("not json at all", &intent()).is_err());
    }
}
