//! Per-task-type plan templates: the always-available, always-fallback
//! strategy for plan generation.
//!
//! Every template shares the same shape: a happy-path chain of action
//! nodes ending in a success terminal, plus the standard set of
//! pre-enumerated failure branches from [`common`] attached to the
//! node(s) most likely to observe them (the initial navigation, and
//! whichever step submits something to the server).

mod common;
mod extract;
mod interact;
mod login;
mod monitor;
mod purchase;
mod search;

pub use common::TemplateOptions;

use crate::dag::model::Dag;
use crate::types::{Intent, TaskType};

/// Builds a template DAG for `intent.task_type`.
#[must_use]
pub fn build_template(intent: &Intent, options: &TemplateOptions) -> Dag {
    match intent.task_type {
        TaskType::Search => search::build(intent, options),
        TaskType::Extract => extract::build(intent, options),
        TaskType::Monitor => monitor::build(intent, options),
        TaskType::Interact => interact::build(intent, options),
        TaskType::Purchase => purchase::build(intent, options),
        TaskType::Login => login::build(intent, options),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use chrono::Utc;

    use super::*;
    use crate::dag::validator::validate_dag;
    use crate::types::Action;

    fn intent(task_type: TaskType) -> Intent {
        Intent {
            goal: "goal".to_string(),
            task_type,
            allowed_domains: BTreeSet::from(["example.com".to_string()]),
            allowed_actions: task_type.allowed_actions().iter().copied().collect(),
            sensitive_data: BTreeSet::new(),
            max_depth: task_type.defaults().0,
            timeout_ms: task_type.defaults().1,
            original_request: "r".to_string(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn every_task_type_template_validates() {
        for task_type in [
            TaskType::Search,
            TaskType::Extract,
            TaskType::Monitor,
            TaskType::Interact,
            TaskType::Purchase,
            TaskType::Login,
        ] {
            let dag = build_template(&intent(task_type), &TemplateOptions::default());
            let report = validate_dag(&dag);
            assert!(report.valid, "{task_type}: {:?}", report.issues);
        }
    }

    #[test]
    fn every_node_carries_domain_constraint() {
        let dag = build_template(&intent(TaskType::Search), &TemplateOptions::default());
        for node in &dag.nodes {
            assert!(node
                .constraints
                .iter()
                .any(|c| matches!(c, crate::dag::model::Constraint::Domain { .. })));
        }
    }

    #[test]
    fn search_template_includes_expected_actions() {
        let dag = build_template(&intent(TaskType::Search), &TemplateOptions::default());
        let actions: BTreeSet<Action> = dag.nodes.iter().map(|n| n.action.action_type).collect();
        assert!(actions.contains(&Action::Navigate));
        assert!(actions.contains(&Action::Type));
        assert!(actions.contains(&Action::Click));
        assert!(actions.contains(&Action::Extract));
    }
}
