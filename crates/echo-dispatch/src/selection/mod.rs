//! Response selection: rule filtering, fallback rescue, and mode arbitration.

mod rotation;

pub use rotation::RoundRobinRegistry;

use rand::Rng;

use crate::request::InboundRequest;
use crate::rules::matches_rules;
use crate::store::MockResponse;

/// How an endpoint picks among its valid responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionMode {
    Static,
    Random,
    RoundRobin,
}

impl SelectionMode {
    /// Parse a mode token case-insensitively; unknown tokens select randomly.
    pub fn parse(token: &str) -> SelectionMode {
        match token.to_lowercase().as_str() {
            "static" => SelectionMode::Static,
            "round_robin" => SelectionMode::RoundRobin,
            _ => SelectionMode::Random,
        }
    }
}

/// Pick at most one response for the request.
///
/// Responses whose rules all match form the candidate set. When none match,
/// zero-rule responses are rescued as candidates and the last response
/// flagged `is_fallback` is remembered; it serves only when the rescue also
/// comes up empty. Candidates are ordered by priority, higher first, with
/// insertion order breaking ties.
pub fn select_response<'a>(
    endpoint_id: &str,
    responses: &'a [MockResponse],
    mode_token: &str,
    req: &InboundRequest,
    rotation: &RoundRobinRegistry,
) -> Option<&'a MockResponse> {
    let mut valid: Vec<&MockResponse> = responses
        .iter()
        .filter(|r| matches_rules(r, req))
        .collect();

    let mut fallback_only: Option<&MockResponse> = None;
    if valid.is_empty() {
        for response in responses {
            if response.rules.is_empty() {
                valid.push(response);
                continue;
            }
            if response.is_fallback {
                // Last fallback in list order wins.
                fallback_only = Some(response);
            }
        }
    }

    if valid.is_empty() {
        return fallback_only;
    }

    // Stable sort: equal priorities keep insertion order.
    valid.sort_by_key(|r| std::cmp::Reverse(r.priority));

    match SelectionMode::parse(mode_token) {
        SelectionMode::Static => Some(valid[0]),
        SelectionMode::Random => {
            let index = rand::thread_rng().gen_range(0..valid.len());
            Some(valid[index])
        }
        SelectionMode::RoundRobin => {
            let index = rotation.next_index(endpoint_id, valid.len());
            Some(valid[index])
        }
    }
}
