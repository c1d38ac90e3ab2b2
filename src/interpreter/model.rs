//! Interpreter data model: observations, trace entries, and the terminal
//! session result.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::refs::Element;
use crate::types::Action;

/// Errors from interpreter construction or execution that are not
/// themselves a terminal [`ExecutionStatus`] — adapter wiring failures,
/// malformed bulk-action payloads, and similar conditions surfaced before
/// (or independent of) a driven session.
#[derive(Debug, Error)]
pub enum InterpreterError {
    /// The underlying browser adapter reported a failure performing an
    /// action.
    #[error("browser adapter failed: {0}")]
    AdapterFailure(String),

    /// A bulk-action payload could not be parsed.
    #[error("malformed bulk-action payload: {0}")]
    MalformedBulkPayload(String),
}

/// What the browser adapter observed after performing an action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Observation {
    /// The page URL at the time of observation.
    pub url: String,
    /// The page title, if known.
    pub title: Option<String>,
    /// Extracted visible text, if the adapter captured it.
    pub visible_text: Option<String>,
    /// Elements visible on the page.
    pub elements: Vec<Element>,
    /// When this observation was captured.
    pub timestamp: DateTime<Utc>,
}

impl Observation {
    /// Builds an observation with no elements and no visible text, useful
    /// for adapters/tests that only care about the URL transition.
    #[must_use]
    pub fn bare(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: None,
            visible_text: None,
            elements: Vec::new(),
            timestamp: Utc::now(),
        }
    }
}

/// How one driver-loop step was resolved, recorded in the [`TraceEntry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TraceDecision {
    /// The step completed normally and a next node was selected.
    Continue,
    /// The step was a non-terminal node whose branch was taken.
    Branch,
    /// The session was aborted at this step.
    Abort,
}

/// One recorded step of a driven session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceEntry {
    /// The node executed at this step.
    pub node_id: String,
    /// The action that node performed.
    pub action: Action,
    /// The observation following the action, if the action produced one.
    pub observation: Option<Observation>,
    /// How this step was resolved.
    pub decision: TraceDecision,
    /// The edge taken out of this node, if any (by destination node id).
    pub taken_branch: Option<String>,
    /// When this step was recorded.
    pub timestamp: DateTime<Utc>,
}

/// The terminal outcome of a driven session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    /// The session reached a `success` terminal node.
    Complete,
    /// The session was deliberately abandoned (outcome mismatch in strict
    /// mode, or branch steering detected).
    Aborted,
    /// A planned action was denied by policy.
    Blocked,
    /// The session's deadline elapsed before completion.
    Timeout,
    /// The session reached an `error` terminal node, hit a missing node or
    /// branch, or the adapter failed.
    Error,
}

impl std::fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Complete => "complete",
            Self::Aborted => "aborted",
            Self::Blocked => "blocked",
            Self::Timeout => "timeout",
            Self::Error => "error",
        };
        write!(f, "{s}")
    }
}

/// The full result of driving a DAG to completion (or abandonment).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionResult {
    /// The terminal status.
    pub status: ExecutionStatus,
    /// Data collected by `extract` nodes along the way, if any.
    pub data: Option<Value>,
    /// Human-readable explanation of the terminal status.
    pub reason: Option<String>,
    /// Every step taken, in execution order.
    pub trace: Vec<TraceEntry>,
    /// Wall-clock duration of the session, in milliseconds.
    pub duration_ms: u64,
}
