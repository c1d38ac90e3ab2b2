//! Branch-steering detection: catching web content that technically
//! satisfies a branch condition but takes the session somewhere
//! unintended.
//!
//! One concrete check is implemented (cross-domain drift against an
//! explicit allowlist override); two further hooks — form-action
//! mismatch and perceptual duplication — are declared but not mandated
//! extension points, documented rather than stubbed with fake logic.

use std::collections::BTreeSet;

use crate::intent::domain_matches;

/// Session-local state the steering detector consults, threaded through
/// the driver loop alongside the visited-URL history.
#[derive(Debug, Clone, Default)]
pub struct SteeringContext {
    /// Domains visited so far, in order, including the current one.
    pub visited_domains: Vec<String>,
    /// The `_allowedDomains` extraction-bag hook: never written by this
    /// crate, read only if a caller populates it via extracted data.
    /// `None` means the hook is unset, in which case the cross-domain
    /// check never fires (its absence is not itself considered unsafe).
    pub allowed_domains_override: Option<BTreeSet<String>>,
}

impl SteeringContext {
    /// Records `domain` as the most recently visited one.
    pub fn record_domain(&mut self, domain: impl Into<String>) {
        self.visited_domains.push(domain.into());
    }

    /// The domain visited immediately before the current one, if any.
    #[must_use]
    pub fn previous_domain(&self) -> Option<&str> {
        let len = self.visited_domains.len();
        (len >= 2).then(|| self.visited_domains[len - 2].as_str())
    }
}

/// Whether the transition into `current_domain` looks like branch
/// steering: the domain differs from the one visited immediately before
/// it, an `_allowedDomains` override is present, and that override
/// excludes `current_domain`.
#[must_use]
pub fn detect_steering(current_domain: &str, ctx: &SteeringContext) -> bool {
    let Some(previous) = ctx.previous_domain() else {
        return false;
    };
    if domain_matches(current_domain, previous) || domain_matches(previous, current_domain) {
        return false;
    }
    let Some(allowed) = &ctx.allowed_domains_override else {
        return false;
    };
    !allowed.iter().any(|d| domain_matches(current_domain, d))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_override_never_flags() {
        let mut ctx = SteeringContext::default();
        ctx.record_domain("shop.example");
        ctx.record_domain("evil.example");
        assert!(!detect_steering("evil.example", &ctx));
    }

    #[test]
    fn override_excluding_current_domain_flags() {
        let mut ctx = SteeringContext {
            allowed_domains_override: Some(BTreeSet::from(["shop.example".to_string()])),
            ..Default::default()
        };
        ctx.record_domain("shop.example");
        ctx.record_domain("evil.example");
        assert!(detect_steering("evil.example", &ctx));
    }

    #[test]
    fn override_including_current_domain_does_not_flag() {
        let mut ctx = SteeringContext {
            allowed_domains_override: Some(BTreeSet::from([
                "shop.example".to_string(),
                "cdn.example".to_string(),
            ])),
            ..Default::default()
        };
        ctx.record_domain("shop.example");
        ctx.record_domain("cdn.example");
        assert!(!detect_steering("cdn.example", &ctx));
    }

    #[test]
    fn same_domain_transition_never_flags() {
        let mut ctx = SteeringContext {
            allowed_domains_override: Some(BTreeSet::from(["shop.example".to_string()])),
            ..Default::default()
        };
        ctx.record_domain("shop.example");
        ctx.record_domain("shop.example");
        assert!(!detect_steering("shop.example", &ctx));
    }
}
