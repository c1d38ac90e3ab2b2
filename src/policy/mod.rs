//! Policy engine: rule-based allow/deny/confirm decisions over actions and
//! intents.
//!
//! A [`rule::PolicyRule`] pairs a [`rule::Scope`] predicate with an
//! [`rule::PolicyEffect`]. [`engine::PolicyEngine`] holds a priority-sorted
//! table drawn from four sources ([`rule::PolicySource`]) and answers two
//! questions: whether an [`crate::types::Intent`] should be accepted at
//! session start ([`engine::PolicyEngine::allows_intent`]), and whether a
//! single planned action may proceed ([`engine::PolicyEngine::allows`]).

pub mod engine;
pub mod rule;
pub mod site;

pub use engine::{ActionContext, Decision, PlannedAction, PolicyEngine, PolicyError};
pub use rule::{MatchInput, PolicyEffect, PolicyRule, PolicySource, Scope};
pub use site::{SiteDirective, SitePolicy};
