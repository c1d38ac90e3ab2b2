//! The bulk-action sub-protocol: batching independent ref-addressed
//! actions to cut agent/adapter round-trips.
//!
//! Calibrated constants are advisory estimates surfaced to callers
//! deciding whether batching is worth the added complexity; they do not
//! gate any allow/deny decision.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::refs::VersionedRef;
use crate::types::Action;

use super::model::InterpreterError;

/// One action in a batched request, addressed by a versioned ref rather
/// than a live selector (the element was already resolved against a
/// specific snapshot).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkAction {
    /// Which primitive this is.
    #[serde(rename = "type")]
    pub action_type: Action,
    /// The versioned ref (`"version:ref"`) this action targets.
    #[serde(rename = "ref")]
    pub target_ref: String,
    /// Text to type, for `Action::Type`.
    #[serde(default)]
    pub text: Option<String>,
    /// Whether to clear the field before typing.
    #[serde(default, rename = "shouldClear")]
    pub should_clear: Option<bool>,
    /// Multiple values, for multi-select-style inputs.
    #[serde(default)]
    pub values: Vec<String>,
    /// Whether this click should be a double-click.
    #[serde(default, rename = "doubleClick")]
    pub double_click: Option<bool>,
    /// Whether this click should be a right-click.
    #[serde(default, rename = "rightClick")]
    pub right_click: Option<bool>,
}

impl BulkAction {
    fn versioned_ref(&self) -> Result<VersionedRef, crate::refs::RefError> {
        VersionedRef::parse(&self.target_ref)
    }
}

/// The result of checking whether a batch of actions can be batched.
#[derive(Debug, Clone)]
pub struct BatchCheck {
    /// Whether the actions can be safely batched.
    pub ok: bool,
    /// Why not, if `!ok`.
    pub reason: Option<String>,
}

/// Whether `actions` can be safely executed as one batch: no `navigate` is
/// present (navigation invalidates every ref after it), every ref shares
/// one snapshot version, and no single action carries a syntactically
/// invalid ref.
#[must_use]
pub fn can_batch(actions: &[BulkAction]) -> BatchCheck {
    if actions.is_empty() {
        return BatchCheck { ok: true, reason: None };
    }

    if let Some(nav) = actions.iter().find(|a| a.action_type == Action::Navigate) {
        return BatchCheck {
            ok: false,
            reason: Some(format!(
                "action targeting '{}' is a navigate, which invalidates refs for the rest of the batch",
                nav.target_ref
            )),
        };
    }

    let mut versions = Vec::new();
    for action in actions {
        match action.versioned_ref() {
            Ok(v) => versions.push(v.version),
            Err(e) => {
                return BatchCheck {
                    ok: false,
                    reason: Some(e.to_string()),
                };
            }
        }
    }

    let first = versions[0];
    if versions.iter().any(|v| *v != first) {
        return BatchCheck {
            ok: false,
            reason: Some("actions reference refs from more than one snapshot version".to_string()),
        };
    }

    BatchCheck { ok: true, reason: None }
}

/// Greedily groups `actions` into batches: starts a new batch whenever
/// adding the next action would violate [`can_batch`] for the
/// in-progress group (in particular, always cuts before a `navigate`).
#[must_use]
pub fn optimize(actions: &[BulkAction]) -> Vec<Vec<BulkAction>> {
    let mut batches: Vec<Vec<BulkAction>> = Vec::new();
    let mut current: Vec<BulkAction> = Vec::new();

    for action in actions {
        let mut candidate = current.clone();
        candidate.push(action.clone());
        if can_batch(&candidate).ok {
            current = candidate;
        } else {
            if !current.is_empty() {
                batches.push(std::mem::take(&mut current));
            }
            current.push(action.clone());
        }
    }

    if !current.is_empty() {
        batches.push(current);
    }

    batches
}

#[derive(Debug, Deserialize)]
struct BulkPayload {
    #[serde(rename = "bulkActions", default)]
    bulk_actions: Option<Vec<BulkAction>>,
    #[serde(default)]
    actions: Option<Vec<BulkAction>>,
}

/// Parses a bulk-action request: either `{"bulkActions": [...]}` or
/// `{"actions": [...]}`. Every entry's `ref` must be a syntactically
/// valid versioned ref (validity against the *current* snapshot is
/// checked later, by the ref manager).
///
/// # Errors
///
/// Returns [`InterpreterError::MalformedBulkPayload`] if the JSON doesn't
/// match either accepted shape, or if any entry's `ref` doesn't parse.
pub fn parse_bulk(json: &Value) -> Result<Vec<BulkAction>, InterpreterError> {
    let payload: BulkPayload = serde_json::from_value(json.clone())
        .map_err(|e| InterpreterError::MalformedBulkPayload(e.to_string()))?;

    let actions = payload
        .bulk_actions
        .or(payload.actions)
        .ok_or_else(|| {
            InterpreterError::MalformedBulkPayload(
                "expected a 'bulkActions' or 'actions' array".to_string(),
            )
        })?;

    for action in &actions {
        action
            .versioned_ref()
            .map_err(|e| InterpreterError::MalformedBulkPayload(e.to_string()))?;
    }

    Ok(actions)
}

/// Calibrated time cost of one sequential (non-batched) action
/// round-trip, in milliseconds.
pub const SEQUENTIAL_MS_PER_ACTION: u64 = 6_400;
/// Calibrated time cost of one batched round-trip, in milliseconds,
/// regardless of how many actions the batch contains.
pub const BULK_MS_PER_BATCH: u64 = 10_500;
/// Calibrated token cost of one sequential agent round-trip.
pub const SEQUENTIAL_TOKENS_PER_CALL: u64 = 6_800;
/// Calibrated token cost of one batched agent round-trip.
pub const BULK_TOKENS_PER_CALL: u64 = 8_000;

/// Advisory estimate of what batching `n_actions` into `n_batches`
/// batches saves over running them sequentially.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct EstimatedGains {
    /// Average number of actions per batch.
    pub avg_batch_size: f64,
    /// Estimated wall-clock time saved, in milliseconds. Negative if
    /// batching would cost more than running sequentially (e.g. one
    /// action per batch).
    pub estimated_time_saved_ms: i64,
    /// Estimated token budget saved.
    pub estimated_tokens_saved: i64,
}

/// Estimates the gains from grouping `n_actions` into `n_batches`, using
/// the calibrated per-action / per-batch constants. Advisory only — does
/// not gate any decision.
#[must_use]
pub fn estimate_gains(n_actions: usize, n_batches: usize) -> EstimatedGains {
    let n_batches = n_batches.max(1);
    #[allow(clippy::cast_precision_loss)]
    let avg_batch_size = n_actions as f64 / n_batches as f64;

    let sequential_time = i64::try_from(n_actions).unwrap_or(i64::MAX)
        .saturating_mul(i64::try_from(SEQUENTIAL_MS_PER_ACTION).unwrap_or(i64::MAX));
    let bulk_time = i64::try_from(n_batches).unwrap_or(i64::MAX)
        .saturating_mul(i64::try_from(BULK_MS_PER_BATCH).unwrap_or(i64::MAX));

    let sequential_tokens = i64::try_from(n_actions).unwrap_or(i64::MAX)
        .saturating_mul(i64::try_from(SEQUENTIAL_TOKENS_PER_CALL).unwrap_or(i64::MAX));
    let bulk_tokens = i64::try_from(n_batches).unwrap_or(i64::MAX)
        .saturating_mul(i64::try_from(BULK_TOKENS_PER_CALL).unwrap_or(i64::MAX));

    EstimatedGains {
        avg_batch_size,
        estimated_time_saved_ms: sequential_time - bulk_time,
        estimated_tokens_saved: sequential_tokens - bulk_tokens,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn action(action_type: Action, target_ref: &str) -> BulkAction {
        BulkAction {
            action_type,
            target_ref: target_ref.to_string(),
            text: None,
            should_clear: None,
            values: vec![],
            double_click: None,
            right_click: None,
        }
    }

    #[test]
    fn can_batch_rejects_navigate() {
        let actions = vec![action(Action::Click, "3:1"), action(Action::Navigate, "3:2")];
        let check = can_batch(&actions);
        assert!(!check.ok);
    }

    #[test]
    fn can_batch_rejects_mixed_versions() {
        let actions = vec![action(Action::Click, "3:1"), action(Action::Click, "4:2")];
        assert!(!can_batch(&actions).ok);
    }

    #[test]
    fn can_batch_accepts_same_version_no_navigate() {
        let actions = vec![action(Action::Click, "3:1"), action(Action::Type, "3:2")];
        assert!(can_batch(&actions).ok);
    }

    #[test]
    fn optimize_cuts_at_navigate() {
        let actions = vec![
            action(Action::Click, "3:1"),
            action(Action::Navigate, "3:2"),
            action(Action::Click, "4:3"),
        ];
        let batches = optimize(&actions);
        assert_eq!(batches.len(), 3);
    }

    #[test]
    fn optimize_cuts_at_version_change() {
        let actions = vec![
            action(Action::Click, "3:1"),
            action(Action::Type, "3:2"),
            action(Action::Click, "4:3"),
        ];
        let batches = optimize(&actions);
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0].len(), 2);
    }

    #[test]
    fn parse_bulk_accepts_either_key() {
        let json = serde_json::json!({"bulkActions": [{"type": "click", "ref": "1:1"}]});
        assert_eq!(parse_bulk(&json).unwrap().len(), 1);

        let json = serde_json::json!({"actions": [{"type": "click", "ref": "1:1"}]});
        assert_eq!(parse_bulk(&json).unwrap().len(), 1);
    }

    #[test]
    fn parse_bulk_rejects_malformed_ref() {
        let json = serde_json::json!({"actions": [{"type": "click", "ref": "not-a-ref"}]});
        assert!(parse_bulk(&json).is_err());
    }

    #[test]
    fn estimate_gains_favors_larger_batches() {
        let small = estimate_gains(10, 10);
        let large = estimate_gains(10, 2);
        assert!(large.estimated_time_saved_ms > small.estimated_time_saved_ms);
    }
}
