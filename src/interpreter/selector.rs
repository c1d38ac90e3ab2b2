//! A small selector-matching engine: tag names, `.class`, `#id`, and
//! bracket attribute selectors (`[attr=value]`, `[attr*=value]`,
//! `[attr^=value]`, `[attr$=value]`), composed left-to-right as a compound
//! selector where every conjunct must match.
//!
//! This is not a CSS engine — it covers exactly the selector vocabulary
//! [`crate::dag::model::BranchCondition`] and bulk actions need to address
//! elements in an [`crate::refs::Element`] snapshot.

use std::sync::LazyLock;

use regex::Regex;

use crate::refs::Element;

#[derive(Debug, Clone, PartialEq, Eq)]
enum AttrOp {
    Equals,
    Contains,
    StartsWith,
    EndsWith,
}

#[derive(Debug, Clone)]
enum Conjunct {
    Tag(String),
    Class(String),
    Id(String),
    Attr { name: String, op: AttrOp, value: String },
}

static ATTR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\[([a-zA-Z_-]+)([*^$]?=)([^\]]*)\]$").expect("attr selector pattern compiles"));

static TOKEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\[[^\]]*\]|\.[A-Za-z0-9_-]+|#[A-Za-z0-9_-]+|[A-Za-z][A-Za-z0-9_-]*)").expect("token pattern compiles"));

fn parse_conjuncts(selector: &str) -> Vec<Conjunct> {
    TOKEN_RE
        .find_iter(selector.trim())
        .filter_map(|m| parse_one(m.as_str()))
        .collect()
}

fn parse_one(token: &str) -> Option<Conjunct> {
    if let Some(rest) = token.strip_prefix('.') {
        return Some(Conjunct::Class(rest.to_string()));
    }
    if let Some(rest) = token.strip_prefix('#') {
        return Some(Conjunct::Id(rest.to_string()));
    }
    if token.starts_with('[') {
        let caps = ATTR_RE.captures(token)?;
        let name = caps[1].to_string();
        let op = match &caps[2] {
            "=" => AttrOp::Equals,
            "*=" => AttrOp::Contains,
            "^=" => AttrOp::StartsWith,
            "$=" => AttrOp::EndsWith,
            _ => return None,
        };
        let value = caps[3].trim_matches(['"', '\'']).to_string();
        return Some(Conjunct::Attr { name, op, value });
    }
    Some(Conjunct::Tag(token.to_lowercase()))
}

fn element_classes(element: &Element) -> Vec<&str> {
    element
        .attributes
        .get("class")
        .map(|c| c.split_whitespace().collect())
        .unwrap_or_default()
}

fn conjunct_matches(conjunct: &Conjunct, element: &Element) -> bool {
    match conjunct {
        Conjunct::Tag(tag) => element.tag.eq_ignore_ascii_case(tag),
        Conjunct::Class(class) => element_classes(element).iter().any(|c| c == class),
        Conjunct::Id(id) => element.attributes.get("id").is_some_and(|v| v == id),
        Conjunct::Attr { name, op, value } => {
            let Some(actual) = element.attributes.get(name) else {
                return false;
            };
            match op {
                AttrOp::Equals => actual == value,
                AttrOp::Contains => actual.contains(value.as_str()),
                AttrOp::StartsWith => actual.starts_with(value.as_str()),
                AttrOp::EndsWith => actual.ends_with(value.as_str()),
            }
        }
    }
}

/// Whether `element` matches every conjunct of `selector`.
#[must_use]
pub fn matches(selector: &str, element: &Element) -> bool {
    let conjuncts = parse_conjuncts(selector);
    if conjuncts.is_empty() {
        return false;
    }
    conjuncts.iter().all(|c| conjunct_matches(c, element))
}

/// Whether any element in `elements` matches `selector`.
#[must_use]
pub fn any_matches(selector: &str, elements: &[Element]) -> bool {
    elements.iter().any(|el| matches(selector, el))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn el(tag: &str, attrs: &[(&str, &str)]) -> Element {
        Element {
            tag: tag.to_string(),
            role: None,
            label: None,
            text: None,
            attributes: attrs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<HashMap<_, _>>(),
        }
    }

    #[test]
    fn matches_tag_alone() {
        assert!(matches("button", &el("button", &[])));
        assert!(!matches("a", &el("button", &[])));
    }

    #[test]
    fn matches_class_and_id() {
        let e = el("div", &[("class", "primary large"), ("id", "submit-btn")]);
        assert!(matches(".primary", &e));
        assert!(matches("#submit-btn", &e));
        assert!(matches("div.primary#submit-btn", &e));
        assert!(!matches(".secondary", &e));
    }

    #[test]
    fn matches_attribute_operators() {
        let e = el("div", &[("class", "cookie-banner-v2")]);
        assert!(matches("[class*=cookie-banner]", &e));
        assert!(matches("[class^=cookie]", &e));
        assert!(matches("[class$=v2]", &e));
        assert!(!matches("[class=cookie-banner]", &e));
    }

    #[test]
    fn compound_selector_requires_every_conjunct() {
        let e = el("button", &[("class", "primary")]);
        assert!(!matches("button.primary#missing", &e));
    }

    #[test]
    fn any_matches_scans_the_whole_list() {
        let elements = vec![el("a", &[]), el("div", &[("class", "captcha-widget")])];
        assert!(any_matches("[class*=captcha]", &elements));
    }
}
