//! Declarative rule evaluation against inbound requests.
//!
//! A response matches when every rule on it matches; a response with no
//! rules matches unconditionally. `path` rules are resolved during endpoint
//! lookup in the repository and skipped here, as is any rule type we do not
//! recognize.

mod json_path;

pub use json_path::nested_value;

use crate::request::InboundRequest;
use crate::store::{MockResponse, MockRule};

/// Whether every rule on a response matches the request.
pub fn matches_rules(response: &MockResponse, req: &InboundRequest) -> bool {
    response.rules.iter().all(|rule| matches_rule(rule, req))
}

fn matches_rule(rule: &MockRule, req: &InboundRequest) -> bool {
    match rule.rule_type.as_str() {
        "header" => match_value(&rule.operator, &req.header_value(&rule.key), &rule.value),
        "query" => match_value(&rule.operator, &req.query_value(&rule.key), &rule.value),
        "body" => match_body_rule(rule, req),
        // "path" is handled during endpoint lookup; unknown types are skipped.
        _ => true,
    }
}

fn match_body_rule(rule: &MockRule, req: &InboundRequest) -> bool {
    let body_text = String::from_utf8_lossy(&req.body);

    // For JSON bodies, try dot-path extraction first. An empty extraction
    // (missing path, non-navigable node) falls back to the raw body text.
    if let Ok(data) = serde_json::from_slice::<serde_json::Value>(&req.body) {
        let extracted = nested_value(&data, &rule.key);
        if !extracted.is_empty() {
            return match_value(&rule.operator, &extracted, &rule.value);
        }
    }

    match_value(&rule.operator, &body_text, &rule.value)
}

/// Compare an extracted value against the expected one.
/// Operators are case-insensitive; anything unrecognized collapses to `equals`.
pub fn match_value(operator: &str, actual: &str, expected: &str) -> bool {
    match operator.to_lowercase().as_str() {
        "contains" => actual.contains(expected),
        _ => actual == expected,
    }
}
