//! Plan generation: converting a validated [`crate::types::Intent`] into a
//! complete, pre-enumerated [`crate::dag::Dag`] before any untrusted
//! content is observed.
//!
//! [`generator::build_plan`] is the single entry point for both
//! strategies: the always-available template strategy
//! ([`crate::dag::templates`]) and the LLM-backed strategy
//! ([`llm::LlmProvider`]), which retries against the DAG validator and can
//! fall back to the template strategy on exhaustion.

pub mod generator;
pub mod llm;

pub use generator::{build_plan, PlanError, PlanOptions, PlanStrategy};
pub use llm::{LlmPlanResponse, LlmProvider, MockLlmProvider};
