//! Crate-level error aggregation.
//!
//! Each subsystem owns a narrow `thiserror` error enum for its own fallible
//! operations (file I/O, malformed input, structural validation). Policy and
//! HTTP-filter *decisions* are never represented as errors — see
//! [`crate::policy::Decision`] and [`crate::http::FilterDecision`].
//!
//! [`GuardError`] exists for callers that cross subsystem boundaries (chiefly
//! the [`crate::mediator`] facade) and want a single `?`-compatible error
//! type.

use thiserror::Error;

use crate::config::ConfigError;
use crate::dag::DagError;
use crate::http::HttpFilterError;
use crate::intent::IntentError;
use crate::interpreter::InterpreterError;
use crate::plan::PlanError;
use crate::policy::PolicyError;
use crate::refs::RefError;

/// Aggregated error type spanning every subsystem.
#[derive(Debug, Error)]
pub enum GuardError {
    /// Configuration could not be resolved.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The natural-language request could not be turned into a valid intent.
    #[error(transparent)]
    Intent(#[from] IntentError),

    /// A DAG failed structural validation.
    #[error(transparent)]
    Dag(#[from] DagError),

    /// Plan generation exhausted its retries with no usable fallback.
    #[error(transparent)]
    Plan(#[from] PlanError),

    /// A ref-manager operation failed.
    #[error(transparent)]
    Ref(#[from] RefError),

    /// A policy-engine operation failed (as distinct from a normal
    /// allow/deny [`crate::policy::Decision`]).
    #[error(transparent)]
    Policy(#[from] PolicyError),

    /// The HTTP filter could not evaluate a request.
    #[error(transparent)]
    HttpFilter(#[from] HttpFilterError),

    /// The secure interpreter could not execute a DAG.
    #[error(transparent)]
    Interpreter(#[from] InterpreterError),
}
