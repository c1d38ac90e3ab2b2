//! The execution graph model: a statically-checkable representation of
//! an entire browsing session with all branches pre-enumerated.

pub mod describer;
pub mod model;
pub mod templates;
pub mod validator;

pub use describer::{describe_plan, describe_plan_text, PlanStep};
pub use model::{
    BranchCondition, BrowserAction, Constraint, Dag, Edge, ExpectedOutcome, ExtractionTarget, Node,
    NodeId, TerminalResult,
};
pub use templates::{build_template, TemplateOptions};
pub use validator::{validate_dag, DagError, ValidationReport};
