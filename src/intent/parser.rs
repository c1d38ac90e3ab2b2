//! Natural-language request to [`Intent`] derivation.

use std::collections::{BTreeSet, HashMap};

use thiserror::Error;

use crate::intent::patterns::{
    self, bare_hosts, detect_sensitive_labels, detect_task_type, explicit_url_hosts,
    ANCHOR_COMPANIONS, SEARCH_ENGINE_DOMAINS,
};
use crate::intent::validate::validate_intent;
use crate::types::{Intent, TaskType};

/// Maximum length of `Intent::goal`, after which it is truncated with an
/// ellipsis.
const GOAL_MAX_CHARS: usize = 100;

/// Errors produced while deriving or validating an [`Intent`].
#[derive(Debug, Error)]
pub enum IntentError {
    /// The derived intent violates one or more invariants.
    #[error("intent failed validation: {}", .issues.join("; "))]
    Invalid {
        /// Every violated invariant, human-readable.
        issues: Vec<String>,
    },
}

/// Caller-supplied knobs for [`IntentParser::parse`].
#[derive(Debug, Clone, Default)]
pub struct ParseOptions {
    /// Additional domains to union into `allowed_domains` regardless of what
    /// the text mentions.
    pub extra_domains: Vec<String>,
    /// Additional `(label_name, regex_source)` sensitive-data detectors —
    /// the locale-extension injection point named in the design notes.
    pub extra_sensitive_patterns: Vec<(String, String)>,
    /// Additional anchor-host companion entries, merged with the built-in
    /// table.
    pub extra_companions: HashMap<String, Vec<String>>,
    /// Override for `max_depth`, instead of the task-type default.
    pub max_depth_override: Option<u32>,
    /// Override for `timeout_ms`, instead of the task-type default.
    pub timeout_ms_override: Option<u64>,
}

/// Converts free text into a bounded, typed [`Intent`].
pub struct IntentParser;

impl IntentParser {
    /// Derives an [`Intent`] from `text`, then validates it.
    ///
    /// # Errors
    ///
    /// Returns [`IntentError::Invalid`] carrying every violated invariant if
    /// the derived intent does not satisfy [`validate_intent`].
    pub fn parse(text: &str, options: &ParseOptions) -> Result<Intent, IntentError> {
        let task_type = detect_task_type(text);

        let allowed_domains = Self::derive_domains(text, task_type, options);
        let sensitive_data =
            detect_sensitive_labels(text, &options.extra_sensitive_patterns);

        let allowed_actions: BTreeSet<_> = task_type.allowed_actions().iter().copied().collect();

        let (default_depth, default_timeout) = task_type.defaults();
        let max_depth = options.max_depth_override.unwrap_or(default_depth);
        let timeout_ms = options.timeout_ms_override.unwrap_or(default_timeout);

        let goal = Self::truncate_goal(text);

        let intent = Intent {
            goal,
            task_type,
            allowed_domains,
            allowed_actions,
            sensitive_data,
            max_depth,
            timeout_ms,
            original_request: text.to_string(),
            created_at: chrono::Utc::now(),
        };

        let report = validate_intent(&intent);
        if !report.valid {
            return Err(IntentError::Invalid {
                issues: report.issues,
            });
        }

        Ok(intent)
    }

    fn derive_domains(
        text: &str,
        task_type: TaskType,
        options: &ParseOptions,
    ) -> BTreeSet<String> {
        let mut domains: BTreeSet<String> = BTreeSet::new();
        domains.extend(explicit_url_hosts(text));
        domains.extend(bare_hosts(text));
        domains.extend(options.extra_domains.iter().cloned());

        // Add the `www.` sibling of every host that doesn't already have one.
        let originals: Vec<String> = domains.iter().cloned().collect();
        for host in &originals {
            if !host.starts_with("www.") {
                domains.insert(format!("www.{host}"));
            }
        }

        // Add companion hosts for known anchors.
        let anchors: Vec<String> = domains.iter().cloned().collect();
        for host in &anchors {
            if let Some(companions) = ANCHOR_COMPANIONS.get(host.as_str()) {
                domains.extend(companions.iter().map(|s| s.to_string()));
            }
            if let Some(companions) = options.extra_companions.get(host) {
                domains.extend(companions.iter().cloned());
            }
        }

        if domains.is_empty() && task_type == TaskType::Search {
            domains.extend(SEARCH_ENGINE_DOMAINS.iter().map(|s| s.to_string()));
        }

        domains
    }

    fn truncate_goal(text: &str) -> String {
        let trimmed = text.trim();
        if trimmed.chars().count() <= GOAL_MAX_CHARS {
            return trimmed.to_string();
        }
        let mut truncated: String = trimmed.chars().take(GOAL_MAX_CHARS).collect();
        truncated.push('…');
        truncated
    }
}

/// Re-validates an already-constructed [`Intent`] without re-parsing.
#[must_use]
pub fn validate(intent: &Intent) -> crate::intent::validate::ValidationReport {
    validate_intent(intent)
}

// Re-export `domain_matches` for convenience at the parser call site too.
pub use patterns::domain_matches;
