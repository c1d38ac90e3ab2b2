//! The HTTP request filter — the independent second line of defense
//! against exfiltration, mediating the fetch side of the tool surface
//! alongside the browser-facing policy engine.

pub mod filter;
pub mod pattern;
pub mod site_policy;
pub mod sitemap;

pub use filter::{
    filter_from_intent, predict_allowlist_from_intent, FilterDecision, HttpFilter, HttpFilterError,
    HttpRequest, CREDENTIAL_HEADERS,
};
pub use pattern::{compile_url_pattern, PatternError};
pub use site_policy::{AllowedRequest, HttpRule, PolicyDefault, SitePolicy};
pub use sitemap::SitemapEntry;
