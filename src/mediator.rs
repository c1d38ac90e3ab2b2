//! The mediator facade: the one place allowed to compose the intent
//! parser, policy engine, and HTTP filter together to answer a single
//! question the host agent runtime asks before every tool call.
//!
//! Intentionally thin — the plugin glue that actually installs this in
//! a host runtime is out of scope; this module only implements the
//! `before_tool_call` contract those adapters are built on.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::{GuardConfig, GuardMode};
use crate::error::GuardError;
use crate::http::{filter_from_intent, HttpRequest};
use crate::intent::{IntentParser, ParseOptions};
use crate::policy::{ActionContext, PlannedAction, PolicyEngine};
use crate::types::{Action, Intent};

/// Context the host runtime supplies alongside every tool call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MediatorContext {
    /// The user's original natural-language request, re-derived into an
    /// [`Intent`] on every call (session-level intent caching is a host
    /// concern, not this facade's).
    pub user_request: String,
    /// The page the call originates from, if the host tracks it.
    #[serde(default)]
    pub current_url: Option<String>,
}

/// One incoming tool call, as seen by the mediator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediatorRequest {
    /// The tool name the host is about to invoke.
    pub tool: String,
    /// The tool's call parameters, in whatever shape that tool expects.
    pub params: Value,
    /// Ambient context for this call.
    pub context: MediatorContext,
}

/// A transformed tool call, substituted for the original when the guard
/// needs to strip or adjust parameters rather than outright deny.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transform {
    /// The (possibly unchanged) tool name.
    pub tool: String,
    /// The transformed parameters.
    pub params: Value,
}

/// The mediator's verdict on one tool call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediatorResponse {
    /// Whether the host may proceed with the call.
    pub allow: bool,
    /// Human-readable explanation, populated whenever `allow` is `false`
    /// or a transform was applied.
    #[serde(default)]
    pub reason: Option<String>,
    /// A substitute call to make instead of the original, if any.
    #[serde(default)]
    pub transform: Option<Transform>,
}

impl MediatorResponse {
    fn pass() -> Self {
        Self {
            allow: true,
            reason: None,
            transform: None,
        }
    }

    fn deny(reason: impl Into<String>) -> Self {
        Self {
            allow: false,
            reason: Some(reason.into()),
            transform: None,
        }
    }
}

const MEDIATED_TOOLS: &[&str] = &["web_fetch", "browser"];

/// Evaluates one tool call against the guard's full pipeline: intent
/// derivation, intent-level policy acceptance, then a tool-specific
/// check (HTTP filtering for `web_fetch`, action policy for `browser`).
///
/// Tool names other than `web_fetch` and `browser` pass through
/// unconditionally. When `config.enabled` is `false` every call passes
/// through, unchecked — an explicit opt-out for callers running their
/// own enforcement. `config.mode == GuardMode::Warn` converts a would-be
/// denial into a logged pass rather than blocking it.
///
/// # Errors
///
/// Returns [`GuardError`] if intent derivation or HTTP-filter evaluation
/// itself fails (malformed request, for instance) — as distinct from the
/// call being denied, which is a normal `MediatorResponse { allow: false, .. }`.
#[tracing::instrument(skip(request, config), fields(tool = %request.tool))]
pub fn before_tool_call(request: &MediatorRequest, config: &GuardConfig) -> Result<MediatorResponse, GuardError> {
    if !config.enabled || !MEDIATED_TOOLS.contains(&request.tool.as_str()) {
        return Ok(MediatorResponse::pass());
    }

    let mut intent = IntentParser::parse(&request.context.user_request, &ParseOptions::default())?;
    if intent.max_depth > config.default_max_depth_cap {
        intent.max_depth = config.default_max_depth_cap;
    }
    if intent.timeout_ms > config.default_timeout_cap_ms {
        intent.timeout_ms = config.default_timeout_cap_ms;
    }

    let engine = PolicyEngine::new(Some(intent.clone()));
    let intent_decision = engine.allows_intent(&intent);
    if !intent_decision.allowed {
        return Ok(enforce(config.mode, MediatorResponse::deny(intent_decision.reason)));
    }

    let response = match request.tool.as_str() {
        "web_fetch" => mediate_web_fetch(request, &intent)?,
        "browser" => mediate_browser(request, &engine),
        other => unreachable!("tool '{other}' is not in MEDIATED_TOOLS"),
    };

    Ok(enforce(config.mode, response))
}

/// In [`GuardMode::Warn`], a would-be denial is logged and converted to a
/// pass; allows are returned unchanged in either mode.
fn enforce(mode: GuardMode, response: MediatorResponse) -> MediatorResponse {
    if response.allow || mode == GuardMode::Block {
        return response;
    }
    tracing::warn!(reason = response.reason.as_deref().unwrap_or(""), "browser guard: denial downgraded to warning");
    MediatorResponse {
        allow: true,
        reason: response.reason.map(|r| format!("warn-mode override of: {r}")),
        transform: None,
    }
}

fn mediate_web_fetch(request: &MediatorRequest, intent: &Intent) -> Result<MediatorResponse, GuardError> {
    let http_request: HttpRequest = serde_json::from_value(request.params.clone())
        .map_err(|e| crate::http::HttpFilterError::InvalidPolicy(format!("malformed web_fetch params: {e}")))?;

    let filter = filter_from_intent(intent);
    let current_domain = request
        .context
        .current_url
        .as_deref()
        .and_then(crate::intent::patterns::extract_host);
    let decision = filter.filter(&http_request, current_domain.as_deref())?;

    if !decision.allowed {
        return Ok(MediatorResponse::deny(format!("browser guard: {}", decision.reason)));
    }

    if decision.strip_cookies {
        let mut transformed = http_request;
        transformed.headers = transformed.stripped_headers();
        let params = serde_json::to_value(&transformed)
            .map_err(|e| crate::http::HttpFilterError::InvalidPolicy(e.to_string()))?;
        return Ok(MediatorResponse {
            allow: true,
            reason: Some(decision.reason),
            transform: Some(Transform {
                tool: request.tool.clone(),
                params,
            }),
        });
    }

    Ok(MediatorResponse {
        allow: true,
        reason: Some(decision.reason),
        transform: None,
    })
}

#[derive(Debug, Deserialize)]
struct BrowserCallParams {
    action: Action,
    #[serde(default)]
    target: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

fn mediate_browser(request: &MediatorRequest, engine: &PolicyEngine) -> MediatorResponse {
    let Ok(params) = serde_json::from_value::<BrowserCallParams>(request.params.clone()) else {
        return MediatorResponse::deny("browser guard: malformed browser tool params");
    };

    let planned = PlannedAction {
        action: Some(params.action),
        target: params.target,
        description: params.description,
    };
    let ctx = ActionContext {
        current_url: request.context.current_url.clone(),
        is_https: request
            .context
            .current_url
            .as_deref()
            .map(|u| u.starts_with("https://")),
    };
    let decision = engine.allows(&planned, &ctx);

    if !decision.allowed {
        return MediatorResponse::deny(format!("browser guard: {}", decision.reason));
    }

    MediatorResponse {
        allow: true,
        reason: Some(decision.reason),
        transform: None,
    }
}
