//! URL-pattern to regex compilation.
//!
//! A sitemap entry's `url_pattern` is a small templating language, not a
//! raw regex: `{ident}` stands for one non-slash path segment and `*`
//! stands for "anything". Compilation escapes regex metacharacters first,
//! then substitutes the two placeholder forms back in — combining the two
//! passes would let a pattern author's literal `{` or `*` collide with the
//! placeholder syntax.

use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

/// Errors from pattern compilation.
#[derive(Debug, Error)]
pub enum PatternError {
    /// The generated regex failed to compile — should not happen for any
    /// pattern built only from escaped literals and the two known
    /// substitutions, but surfaced rather than panicked on.
    #[error("pattern '{pattern}' compiled to an invalid regex: {source}")]
    InvalidRegex {
        /// The original pattern string.
        pattern: String,
        /// The underlying regex error.
        #[source]
        source: regex::Error,
    },
}

static PLACEHOLDER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\\\{(\w+)\\\}").expect("placeholder pattern compiles"));

/// Compiles a sitemap `url_pattern` into an anchored regex.
///
/// # Errors
///
/// Returns [`PatternError::InvalidRegex`] if the resulting pattern somehow
/// fails to compile.
pub fn compile_url_pattern(pattern: &str) -> Result<Regex, PatternError> {
    let escaped = regex::escape(pattern);
    let with_idents = PLACEHOLDER_RE.replace_all(&escaped, r"([^/]+)");
    let with_wildcards = with_idents.replace(r"\*", ".*");
    let anchored = format!("^{with_wildcards}$");
    Regex::new(&anchored).map_err(|source| PatternError::InvalidRegex {
        pattern: pattern.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substitutes_identifier_placeholders() {
        let re = compile_url_pattern("/users/{id}/profile").unwrap();
        assert!(re.is_match("/users/42/profile"));
        assert!(!re.is_match("/users/42/43/profile"));
    }

    #[test]
    fn substitutes_wildcards() {
        let re = compile_url_pattern("/static/*").unwrap();
        assert!(re.is_match("/static/css/app.css"));
    }

    #[test]
    fn escapes_literal_regex_metacharacters() {
        let re = compile_url_pattern("/v1.0/item(s)").unwrap();
        assert!(re.is_match("/v1.0/item(s)"));
        assert!(!re.is_match("/v1X0/item(s)"));
    }
}
