//! DAG data model: a statically-checkable representation of an entire
//! browsing session with all branches pre-enumerated.
//!
//! Cross-references between nodes and edges are always by [`NodeId`],
//! never by pointer or index — a plan must stay serializable, cacheable,
//! and checkable independent of any in-memory arena.

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{Action, Intent};

/// An interned node identifier, unique within one DAG.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub String);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for NodeId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for NodeId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// One browser operation a node performs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserAction {
    /// Which primitive this is.
    #[serde(rename = "type")]
    pub action_type: Action,
    /// Human-readable description, surfaced in plan descriptions and
    /// consulted by the policy engine's payment-pattern check.
    pub description: String,
    /// Navigation target or selector, depending on `action_type`.
    #[serde(default)]
    pub target: Option<String>,
    /// Text to type, for `Action::Type`.
    #[serde(default)]
    pub value: Option<String>,
}

/// A tagged predicate evaluated against an observation at a branch point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BranchCondition {
    /// True if any element matches the given selector.
    ElementPresent {
        /// Selector string.
        value: String,
    },
    /// True if no element matches the given selector.
    ElementAbsent {
        /// Selector string.
        value: String,
    },
    /// True if the observation's URL matches the given regex.
    UrlMatch {
        /// Regex source.
        value: String,
    },
    /// True if the observation's visible text matches the given regex,
    /// case-insensitively.
    ContentMatch {
        /// Regex source.
        value: String,
    },
    /// Always true; used as a catch-all fallback edge.
    Default,
}

impl BranchCondition {
    /// A human-readable description for plan-confirmation UIs.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::ElementPresent { value } => format!("element present: {value}"),
            Self::ElementAbsent { value } => format!("element absent: {value}"),
            Self::UrlMatch { value } => format!("URL matches: {value}"),
            Self::ContentMatch { value } => format!("page content matches: {value}"),
            Self::Default => "otherwise".to_string(),
        }
    }
}

/// An outcome a node's action is expected to produce, checked against the
/// observation that follows it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpectedOutcome {
    /// The condition expected to hold.
    #[serde(flatten)]
    pub condition: BranchCondition,
    /// Whether a mismatch is fatal under strict-mode validation.
    #[serde(default = "default_required")]
    pub required: bool,
}

fn default_required() -> bool {
    true
}

/// What structured data a node's `extract` action should pull out.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionTarget {
    /// A name for the extracted field, used as its key in collected data.
    pub name: String,
    /// Selector identifying the element(s) to extract from.
    pub selector: String,
    /// Attribute to read instead of text content, if any.
    #[serde(default)]
    pub attribute: Option<String>,
}

/// A constraint a node's action must satisfy, independent of the policy
/// engine — chiefly the per-node domain constraint every node carries.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Constraint {
    /// The action's target (for navigate) must resolve to one of these
    /// domains.
    Domain {
        /// Allowed domains.
        allowed: BTreeSet<String>,
    },
}

/// How a terminal node's session ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminalResult {
    /// The session achieved its goal.
    Success,
    /// The session ended in a recoverable failure (404, no-results, …).
    Error,
    /// The session was deliberately abandoned (captcha, login wall, …).
    Abort,
}

/// One node of a DAG.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    /// This node's id, unique within its DAG.
    pub id: NodeId,
    /// The browser operation this node performs.
    pub action: BrowserAction,
    /// Outcomes checked against the observation following this node's
    /// action.
    #[serde(default)]
    pub expected_outcomes: Vec<ExpectedOutcome>,
    /// Extraction targets for this node's action, if it's an `extract`.
    #[serde(default)]
    pub extraction_targets: Vec<ExtractionTarget>,
    /// Constraints this node's action must satisfy.
    #[serde(default)]
    pub constraints: Vec<Constraint>,
    /// Whether this node ends the session.
    #[serde(default)]
    pub is_terminal: bool,
    /// How the session ends, if `is_terminal`.
    #[serde(default)]
    pub terminal_result: Option<TerminalResult>,
}

/// One edge of a DAG: a possible transition out of `from`, taken when
/// `condition` evaluates true against the observation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Edge {
    /// Source node id.
    pub from: NodeId,
    /// Destination node id.
    pub to: NodeId,
    /// The predicate gating this transition.
    pub condition: BranchCondition,
    /// Evaluation priority among a node's outgoing edges; lower first.
    #[serde(default)]
    pub priority: u32,
}

/// The full execution graph for one browsing session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dag {
    /// Unique id for this plan instance.
    pub id: String,
    /// The intent this plan was generated for.
    pub intent: Intent,
    /// All nodes, keyed by their own [`NodeId`].
    pub nodes: Vec<Node>,
    /// All edges.
    pub edges: Vec<Edge>,
    /// The node execution begins at.
    pub entry_point: NodeId,
    /// When this plan was generated.
    pub created_at: DateTime<Utc>,
}

impl Dag {
    /// The node with id `id`, if present.
    #[must_use]
    pub fn node(&self, id: &NodeId) -> Option<&Node> {
        self.nodes.iter().find(|n| &n.id == id)
    }

    /// Outgoing edges from `id`, sorted by ascending priority.
    #[must_use]
    pub fn outgoing(&self, id: &NodeId) -> Vec<&Edge> {
        let mut edges: Vec<&Edge> = self.edges.iter().filter(|e| &e.from == id).collect();
        edges.sort_by_key(|e| e.priority);
        edges
    }
}
