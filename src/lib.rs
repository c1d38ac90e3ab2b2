//! # browser-guard
//!
//! A security mediator sitting between a language-model-driven browser
//! agent and a browser/HTTP tool surface. It prevents prompt injection
//! arriving through web content from steering the agent into unintended
//! navigation, data exfiltration, credential disclosure, or destructive
//! UI actions.
//!
//! It does so in four stages:
//!
//! 1. [`intent`] derives a structured, bounded browsing [`types::Intent`]
//!    from the user's natural-language request.
//! 2. [`plan`] produces, before any untrusted content is observed, a
//!    complete conditional execution graph ([`dag`]) enumerating every
//!    branch the session could take, including its failure modes.
//! 3. [`policy`] and [`http`] enforce multi-layered rules on every
//!    planned browser action and every outbound HTTP request.
//! 4. [`interpreter`] drives the graph against a browser abstraction one
//!    step at a time, observing page state only at pre-declared branch
//!    points and detecting branch-steering along the way.
//!
//! [`mediator`] composes all of the above behind the single
//! `before_tool_call` contract a host agent runtime calls against.
//!
//! ## Out of scope
//!
//! The browser driver itself (CDP/DOM access), the LLM client that
//! generates a plan (only its request/response contract is specified by
//! [`plan::llm::LlmProvider`]), and the plugin glue that installs this
//! crate into a host agent runtime are external collaborators this crate
//! only defines thin seams for.
//!
//! ## Modules
//!
//! - [`types`] – the action alphabet, task types, and the `Intent` struct
//! - [`intent`] – natural-language request to `Intent` derivation
//! - [`dag`] – the execution-graph data model, validator, and templates
//! - [`plan`] – template and LLM-backed plan generation
//! - [`policy`] – the action/intent policy engine
//! - [`http`] – the independent outbound HTTP request filter
//! - [`refs`] – versioned element snapshots and staleness detection
//! - [`interpreter`] – the step-bounded DAG driver
//! - [`mediator`] – the `before_tool_call` facade
//! - [`config`] – guard configuration, loading, and validation
//! - [`error`] – the crate-level aggregated error type

#![warn(missing_docs, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

pub mod config;
pub mod dag;
pub mod error;
pub mod http;
pub mod intent;
pub mod interpreter;
pub mod mediator;
pub mod plan;
pub mod policy;
pub mod refs;
pub mod types;

/// Re-exports for convenient access to the crate's primary public types.
pub mod prelude {
    pub use crate::config::{GuardConfig, GuardConfigBuilder, GuardMode};
    pub use crate::dag::{build_template, Dag, Node, NodeId};
    pub use crate::error::GuardError;
    pub use crate::http::{filter_from_intent, HttpFilter, HttpRequest};
    pub use crate::intent::{IntentParser, ParseOptions};
    pub use crate::interpreter::{BrowserAdapter, ExecutionStatus, SecureInterpreter, SessionResult};
    pub use crate::mediator::{before_tool_call, MediatorContext, MediatorRequest, MediatorResponse};
    pub use crate::plan::{build_plan, LlmProvider, PlanOptions, PlanStrategy};
    pub use crate::policy::{Decision, PolicyEngine};
    pub use crate::refs::RefManager;
    pub use crate::types::{Action, Intent, TaskType};
}
