//! Type definitions for the dispatch data model.
//!
//! All entities are read-only to the dispatch core; creation and mutation
//! happen in the external administration surface.

use serde::{Deserialize, Serialize};

/// How a project answers inbound traffic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectMode {
    /// Synthesize responses from stored fixtures.
    Mock,
    /// Try mocks first, forward unmatched requests upstream.
    Proxy,
    /// Forward every request upstream.
    Forwarder,
    /// Reject traffic with a 503 envelope.
    Disabled,
    /// Any mode token the storage layer hands us that we do not recognize.
    /// The dispatcher answers these with a 500 envelope.
    #[serde(other)]
    Unknown,
}

impl ProjectMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectMode::Mock => "mock",
            ProjectMode::Proxy => "proxy",
            ProjectMode::Forwarder => "forwarder",
            ProjectMode::Disabled => "disabled",
            ProjectMode::Unknown => "unknown",
        }
    }
}

/// A logical tenant, addressed by URL-prefix alias.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    /// Unique URL-safe token; the first path segment of inbound requests.
    pub alias: String,
    pub mode: ProjectMode,
    /// Upstream target used by proxy and forwarder modes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_proxy: Option<ProxyTarget>,
    /// Opaque JSON blob; see [`AdvanceConfig::parse`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub advance_config: Option<String>,
}

/// An absolute upstream URL (scheme + host + optional base path).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyTarget {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub project_id: String,
    /// Informational name shown in the administration surface.
    #[serde(default)]
    pub label: String,
    pub url: String,
}

/// A mock endpoint owned by a project.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Endpoint {
    pub id: String,
    pub project_id: String,
    pub method: String,
    /// Path pattern; matching is owned by the repository.
    pub path: String,
    /// Selection mode token: `static`, `random`, or `round_robin`
    /// (case-insensitive; anything else selects randomly).
    #[serde(default = "default_response_mode")]
    pub response_mode: String,
    /// When true and a target is set, the endpoint forwards instead of mocking.
    #[serde(default)]
    pub use_proxy: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxy_target: Option<ProxyTarget>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub advance_config: Option<String>,
}

fn default_response_mode() -> String {
    "random".to_string()
}

/// A stored response for an endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MockResponse {
    pub id: String,
    pub endpoint_id: String,
    #[serde(default = "default_status_code")]
    pub status_code: u16,
    /// Opaque bytes-as-string body.
    #[serde(default)]
    pub body: String,
    /// JSON object string mapping header name to value.
    #[serde(default)]
    pub headers: String,
    /// Higher precedes lower among rule-matched candidates.
    #[serde(default)]
    pub priority: i32,
    #[serde(default)]
    pub delay_ms: u64,
    /// Serves when no rule-bearing response matches.
    #[serde(default)]
    pub is_fallback: bool,
    #[serde(default)]
    pub rules: Vec<MockRule>,
}

fn default_status_code() -> u16 {
    200
}

/// A declarative predicate gating a response.
///
/// `rule_type` and `operator` are free strings on purpose: unknown operators
/// collapse to `equals`, unknown rule types are skipped, and `path` rules are
/// resolved during endpoint lookup rather than here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MockRule {
    #[serde(rename = "type")]
    pub rule_type: String,
    /// Header name, query name, or JSON dot-path.
    pub key: String,
    pub operator: String,
    pub value: String,
}

/// Parsed form of the `advance_config` blob carried by projects and endpoints.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AdvanceConfig {
    #[serde(default, alias = "delayMs")]
    pub delay_ms: u64,
}

impl AdvanceConfig {
    /// Parse an advance-config blob. A missing, empty, or malformed blob is
    /// `None`: configuration parse errors are silently skipped and contribute
    /// no delay at that tier.
    pub fn parse(blob: Option<&str>) -> Option<AdvanceConfig> {
        let blob = blob?.trim();
        if blob.is_empty() {
            return None;
        }
        serde_json::from_str(blob).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_project_mode_unknown_token() {
        let mode: ProjectMode = serde_json::from_str(r#""replay""#).unwrap();
        assert_eq!(mode, ProjectMode::Unknown);
    }

    #[test]
    fn test_project_mode_roundtrip() {
        for (token, mode) in [
            ("mock", ProjectMode::Mock),
            ("proxy", ProjectMode::Proxy),
            ("forwarder", ProjectMode::Forwarder),
            ("disabled", ProjectMode::Disabled),
        ] {
            let parsed: ProjectMode = serde_json::from_str(&format!("\"{token}\"")).unwrap();
            assert_eq!(parsed, mode);
            assert_eq!(mode.as_str(), token);
        }
    }

    #[test]
    fn test_advance_config_parse() {
        let cfg = AdvanceConfig::parse(Some(r#"{"delay_ms": 250}"#)).unwrap();
        assert_eq!(cfg.delay_ms, 250);

        // camelCase spelling from older storage rows
        let cfg = AdvanceConfig::parse(Some(r#"{"delayMs": 100}"#)).unwrap();
        assert_eq!(cfg.delay_ms, 100);
    }

    #[test]
    fn test_advance_config_parse_failures_are_silent() {
        assert!(AdvanceConfig::parse(None).is_none());
        assert!(AdvanceConfig::parse(Some("")).is_none());
        assert!(AdvanceConfig::parse(Some("not json")).is_none());
        assert!(AdvanceConfig::parse(Some("[1,2]")).is_none());
    }

    #[test]
    fn test_mock_response_defaults() {
        let json = r#"{"id": "r1", "endpoint_id": "e1"}"#;
        let resp: MockResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.status_code, 200);
        assert_eq!(resp.priority, 0);
        assert!(!resp.is_fallback);
        assert!(resp.rules.is_empty());
    }

    #[test]
    fn test_rule_type_field_rename() {
        let json = r#"{"type": "header", "key": "X-Env", "operator": "equals", "value": "prod"}"#;
        let rule: MockRule = serde_json::from_str(json).unwrap();
        assert_eq!(rule.rule_type, "header");
    }
}
