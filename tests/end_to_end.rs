//! End-to-end scenarios spanning intent derivation, plan generation, the
//! policy engine, the HTTP filter, and ref staleness — each scenario
//! exercises the public surface the way a host integration would.

use std::collections::BTreeSet;

use browser_guard::dag::{build_template, TemplateOptions};
use browser_guard::http::{filter_from_intent, HttpRequest};
use browser_guard::intent::{validate_intent, IntentParser, ParseOptions};
use browser_guard::plan::llm::MockLlmProvider;
use browser_guard::plan::{build_plan, PlanOptions, PlanStrategy};
use browser_guard::policy::{ActionContext, Decision, PlannedAction, PolicyEngine};
use browser_guard::refs::RefManager;
use browser_guard::types::{Action, Intent, TaskType};

fn intent(task_type: TaskType, domains: &[&str], actions: &[Action]) -> Intent {
    Intent {
        goal: "test scenario".to_string(),
        task_type,
        allowed_domains: domains.iter().map(|d| (*d).to_string()).collect(),
        allowed_actions: actions.iter().copied().collect(),
        sensitive_data: BTreeSet::new(),
        max_depth: 5,
        timeout_ms: 30_000,
        original_request: "test scenario".to_string(),
        created_at: chrono::Utc::now(),
    }
}

fn assert_denied(decision: &Decision) {
    assert!(!decision.allowed, "expected denial, got: {decision:?}");
}

/// S1 — clean search: a natural-language request derives a search
/// intent covering the site and its `www` sibling, validates, and its
/// template plan covers navigate/type/click/extract with at least one
/// success terminal and one failure terminal. The derived HTTP filter
/// allows the target site and denies a phishing lookalike.
#[test]
fn s1_clean_search() {
    let parsed = IntentParser::parse(
        "Search for RTX 5090 prices on newegg.com",
        &ParseOptions::default(),
    )
    .expect("a clean search request should derive a valid intent");

    assert_eq!(parsed.task_type, TaskType::Search);
    assert!(parsed.allowed_domains.contains("newegg.com"));
    assert!(parsed.allowed_domains.contains("www.newegg.com"));
    assert!(validate_intent(&parsed).valid);

    let dag = build_template(&parsed, &TemplateOptions::default());
    let action_types: BTreeSet<Action> = dag.nodes.iter().map(|n| n.action.action_type).collect();
    assert!(action_types.contains(&Action::Navigate));
    assert!(action_types.contains(&Action::Type));
    assert!(action_types.contains(&Action::Click));
    assert!(action_types.contains(&Action::Extract));

    let terminals: Vec<_> = dag.nodes.iter().filter(|n| n.is_terminal).collect();
    assert!(terminals.len() >= 2);
    assert!(terminals.iter().any(|n| {
        matches!(
            n.terminal_result,
            Some(browser_guard::dag::TerminalResult::Success)
        )
    }));
    assert!(terminals.iter().any(|n| {
        matches!(
            n.terminal_result,
            Some(browser_guard::dag::TerminalResult::Error | browser_guard::dag::TerminalResult::Abort)
        )
    }));

    let filter = filter_from_intent(&parsed);
    let allowed = filter
        .filter(
            &HttpRequest {
                url: "https://newegg.com/p/ABC".to_string(),
                ..Default::default()
            },
            None,
        )
        .unwrap();
    assert!(allowed.allowed);

    let denied = filter
        .filter(
            &HttpRequest {
                url: "https://phishing.example/fake".to_string(),
                ..Default::default()
            },
            None,
        )
        .unwrap();
    assert!(!denied.allowed);
}

/// S2 — an SSH-key exfiltration attempt: the HTTP filter allows the
/// legitimate API call and denies a POST to an unrelated attacker host,
/// citing domain/allowlist in its reason.
#[test]
fn s2_ssh_key_exfiltration_attempt() {
    let it = intent(TaskType::Extract, &["gitlab.com"], &[Action::Navigate, Action::Extract]);
    let filter = filter_from_intent(&it);

    let allowed = filter
        .filter(
            &HttpRequest {
                url: "https://gitlab.com/api/v4/issues".to_string(),
                ..Default::default()
            },
            None,
        )
        .unwrap();
    assert!(allowed.allowed);

    let denied = filter
        .filter(
            &HttpRequest {
                url: "https://attacker.com/collect".to_string(),
                method: "POST".to_string(),
                ..Default::default()
            },
            None,
        )
        .unwrap();
    assert!(!denied.allowed);
    let reason = denied.reason.to_lowercase();
    assert!(reason.contains("domain") || reason.contains("allowlist"));
}

/// S3 — lookalike domains: the filter allows the real site and its
/// subdomain, and denies three distinct lookalike-hostname tricks.
#[test]
fn s3_lookalike_domain() {
    let it = intent(TaskType::Extract, &["github.com"], &[Action::Navigate, Action::Extract]);
    let filter = filter_from_intent(&it);

    for url in ["https://github.com/octocat", "https://api.github.com/users/octocat"] {
        let decision = filter
            .filter(&HttpRequest { url: url.to_string(), ..Default::default() }, None)
            .unwrap();
        assert!(decision.allowed, "expected '{url}' to be allowed");
    }

    for url in [
        "https://github.com.attacker.com/octocat",
        "https://githubcom.org/octocat",
        "https://github-api.attacker.com/octocat",
    ] {
        let decision = filter
            .filter(&HttpRequest { url: url.to_string(), ..Default::default() }, None)
            .unwrap();
        assert!(!decision.allowed, "expected '{url}' to be denied");
    }
}

/// S4 — a stale ref: after the page mutates between two snapshots, the
/// original ref no longer resolves and the error names it "stale".
#[test]
fn s4_stale_ref() {
    use browser_guard::refs::Element;
    use std::collections::HashMap;

    let mut manager = RefManager::default();
    let cancel_button = Element {
        tag: "button".to_string(),
        role: None,
        label: None,
        text: Some("Cancel Order".to_string()),
        attributes: HashMap::new(),
    };
    manager.create_snapshot("https://shop.example/cart", vec![cancel_button.clone()]);
    manager.create_snapshot("https://shop.example/cart", vec![cancel_button]);

    let validation = manager.validate_ref("1:1");
    assert!(!validation.valid);
    assert!(validation.error.unwrap().to_string().contains("stale"));
}

/// S5 — an injected payment click: regardless of domain or task type, a
/// click whose description matches a payment-completion pattern is
/// denied, citing "payment".
#[test]
fn s5_injected_payment_click() {
    let it = intent(TaskType::Extract, &["shopping.com"], &[Action::Click]);
    let engine = PolicyEngine::new(Some(it));
    let decision = engine.allows(
        &PlannedAction {
            action: Some(Action::Click),
            target: None,
            description: Some("Pay Now".to_string()),
        },
        &ActionContext::default(),
    );
    assert_denied(&decision);
    assert!(decision.reason.to_lowercase().contains("payment"));
}

/// S6 — HTTP login: typing a credential value into a login task running
/// over a plaintext connection is denied.
#[test]
fn s6_http_login_denied() {
    let it = intent(TaskType::Login, &["mysite.com"], &[Action::Type]);
    let engine = PolicyEngine::new(Some(it));
    let decision = engine.allows(
        &PlannedAction {
            action: Some(Action::Type),
            target: None,
            description: None,
        },
        &ActionContext {
            current_url: Some("http://mysite.com/login".to_string()),
            is_https: Some(false),
        },
    );
    assert_denied(&decision);
}

/// S7 — an extract task's HTTP filter defaults to `allow_public`,
/// stripping credentials, for its own allowed domain.
#[test]
fn s7_extract_task_strips_credentials() {
    let it = intent(TaskType::Extract, &["techcrunch.com"], &[Action::Navigate, Action::Extract]);
    let filter = filter_from_intent(&it);
    let decision = filter
        .filter(
            &HttpRequest {
                url: "https://techcrunch.com/article".to_string(),
                ..Default::default()
            },
            None,
        )
        .unwrap();
    assert!(decision.allowed);
    assert!(decision.strip_cookies);
}

/// S8 — a purchase plan generated by a sloppy LLM (no confirmation step
/// on its terminal) still has every node's domain constraint finalized
/// by the core regardless of what the model emitted, and its terminal
/// result survives intact.
#[tokio::test]
async fn s8_purchase_planner_stays_honest() {
    let it = intent(
        TaskType::Purchase,
        &["shop.example"],
        &[Action::Navigate, Action::Click, Action::Extract],
    );

    let raw = r#"{
        "nodes": [
            {
                "id": "checkout",
                "action": {"type": "click", "description": "Place Order", "target": "#place-order"},
                "isTerminal": true,
                "terminalResult": "success"
            }
        ],
        "edges": [],
        "entryPoint": "checkout"
    }"#;
    let provider = MockLlmProvider::responding_with(raw);
    let options = PlanOptions {
        strategy: PlanStrategy::Llm(&provider),
        max_retries: 1,
        fallback_to_template: false,
        template_options: TemplateOptions::default(),
    };

    let dag = build_plan(&it, &options).await.expect("malformed-but-parseable response should still produce a dag");

    assert!(dag.nodes.iter().all(|n| n.constraints.iter().any(|c| matches!(
        c,
        browser_guard::dag::Constraint::Domain { allowed } if allowed.contains("shop.example")
    ))));

    let terminal = dag.node(&"checkout".into()).unwrap();
    assert_eq!(
        terminal.terminal_result,
        Some(browser_guard::dag::TerminalResult::Success)
    );
}
