//! Plan generation: the single-shot, policy-neutral construction of a
//! complete execution DAG before any untrusted content is observed.
//!
//! Two strategies share one entry point. The template strategy (always
//! available, also the fallback) is driven by [`crate::dag::templates`].
//! The LLM-backed strategy calls out to an [`crate::plan::llm::LlmProvider`],
//! parses and domain-reconstrains its response, and retries against the
//! DAG validator before falling back to the template strategy.

use thiserror::Error;

use crate::dag::templates::{build_template, TemplateOptions};
use crate::dag::validator::validate_dag;
use crate::dag::Dag;
use crate::plan::llm::{
    dag_schema, parse_llm_response, system_prompt, user_prompt, LlmProvider,
};
use crate::types::Intent;

/// Errors from plan generation.
#[derive(Debug, Error)]
pub enum PlanError {
    /// The provider's raw response contained no extractable JSON object.
    #[error("LLM response contained no extractable JSON: {raw}")]
    LlmResponseUnparseable {
        /// The raw response text.
        raw: String,
    },

    /// The extracted JSON didn't match the expected wire shape.
    #[error("LLM response did not match the expected DAG shape: {reason}")]
    LlmResponseMalformed {
        /// What about the shape was wrong.
        reason: String,
    },

    /// The provider itself returned an error.
    #[error("LLM provider failed: {reason}")]
    LlmProviderFailed {
        /// The provider's error message.
        reason: String,
    },

    /// Every retry produced a DAG that failed structural validation, and no
    /// template fallback was configured (or the template strategy was used
    /// directly and somehow failed, which should not happen for any valid
    /// intent).
    #[error("plan generation exhausted {attempts} attempt(s); last cause: {cause}")]
    ExhaustedRetries {
        /// The last validation or provider failure observed.
        cause: String,
        /// How many attempts were made.
        attempts: u32,
    },
}

/// Which strategy [`build_plan`] uses.
pub enum PlanStrategy<'a> {
    /// Always-available template strategy, selected by task type.
    Template,
    /// LLM-backed strategy, retried up to `max_retries` times against the
    /// supplied provider before falling back (if configured).
    Llm(&'a dyn LlmProvider),
}

/// Caller-supplied knobs for [`build_plan`].
pub struct PlanOptions<'a> {
    /// Which strategy to use.
    pub strategy: PlanStrategy<'a>,
    /// Maximum LLM-generation attempts before giving up or falling back.
    /// Ignored by [`PlanStrategy::Template`].
    pub max_retries: u32,
    /// Whether to fall back to the template strategy once `max_retries` is
    /// exhausted. Ignored by [`PlanStrategy::Template`].
    pub fallback_to_template: bool,
    /// Template instantiation knobs, consulted by both strategies (the LLM
    /// strategy's template fallback uses the same options).
    pub template_options: TemplateOptions,
}

impl Default for PlanOptions<'_> {
    fn default() -> Self {
        Self {
            strategy: PlanStrategy::Template,
            max_retries: 3,
            fallback_to_template: true,
            template_options: TemplateOptions::default(),
        }
    }
}

/// Builds a complete execution DAG for `intent`. No web content has been
/// observed when this runs — the plan enumerates every branch the session
/// could take up front.
///
/// # Errors
///
/// Returns [`PlanError::ExhaustedRetries`] if the LLM strategy's retries are
/// exhausted with no template fallback configured, or if the provider
/// itself fails on every attempt.
#[tracing::instrument(skip(intent, options), fields(task_type = ?intent.task_type))]
pub async fn build_plan(intent: &Intent, options: &PlanOptions<'_>) -> Result<Dag, PlanError> {
    match &options.strategy {
        PlanStrategy::Template => {
            tracing::debug!("building template plan");
            Ok(build_template(intent, &options.template_options))
        }
        PlanStrategy::Llm(provider) => {
            tracing::debug!(max_retries = options.max_retries, "building LLM-backed plan");
            generate_with_llm(intent, *provider, options).await
        }
    }
}

async fn generate_with_llm(
    intent: &Intent,
    provider: &dyn LlmProvider,
    options: &PlanOptions<'_>,
) -> Result<Dag, PlanError> {
    let system = system_prompt();
    let user = user_prompt(intent);
    let schema = dag_schema();

    let mut last_cause = String::new();
    let attempts = options.max_retries.max(1);

    for attempt in 1..=attempts {
        let response = match provider.generate_plan(&system, &user, &schema, intent).await {
            Ok(r) => r,
            Err(PlanError::LlmProviderFailed { reason }) => {
                last_cause = format!("attempt {attempt}: provider failed: {reason}");
                continue;
            }
            Err(other) => {
                last_cause = format!("attempt {attempt}: {other}");
                continue;
            }
        };

        let dag = match parse_llm_response(&response.raw_response, intent) {
            Ok(dag) => dag,
            Err(e) => {
                last_cause = format!("attempt {attempt}: {e}");
                continue;
            }
        };

        let report = validate_dag(&dag);
        if report.valid {
            tracing::debug!(attempt, "LLM-backed plan validated");
            return Ok(dag);
        }
        last_cause = format!("attempt {attempt}: DAG invalid: {}", report.issues.join("; "));
        tracing::warn!(attempt, cause = %last_cause, "LLM-backed plan rejected by validator");
    }

    if options.fallback_to_template {
        tracing::warn!(attempts, cause = %last_cause, "LLM plan retries exhausted, falling back to template");
        return Ok(build_template(intent, &options.template_options));
    }

    Err(PlanError::ExhaustedRetries {
        cause: last_cause,
        attempts,
    })
}
