//! End-to-end dispatcher scenarios over the in-memory repository.

use super::*;
use crate::config::Config;
use crate::store::{Endpoint, InMemoryRepository, MockResponse, MockRule, ProxyTarget};
use bytes::Bytes;
use http_body_util::BodyExt;
use hyper::header::{HeaderName, HeaderValue};
use hyper::{HeaderMap, Method};

fn dispatcher_with(repo: InMemoryRepository) -> Dispatcher {
    Dispatcher::new(Arc::new(repo), &Config::default())
}

fn project(alias: &str, mode: ProjectMode) -> Project {
    Project {
        id: format!("proj-{alias}"),
        alias: alias.to_string(),
        mode,
        active_proxy: None,
        advance_config: None,
    }
}

/// An upstream that nothing answers; tests that must not forward would see a
/// 502 envelope if they did.
fn dead_proxy() -> ProxyTarget {
    ProxyTarget {
        id: "t1".to_string(),
        project_id: String::new(),
        label: "staging".to_string(),
        url: "http://192.0.2.1:9".to_string(),
    }
}

fn endpoint(id: &str, project_id: &str, path: &str, response_mode: &str) -> Endpoint {
    Endpoint {
        id: id.to_string(),
        project_id: project_id.to_string(),
        method: "GET".to_string(),
        path: path.to_string(),
        response_mode: response_mode.to_string(),
        use_proxy: false,
        proxy_target: None,
        advance_config: None,
    }
}

fn response(id: &str, endpoint_id: &str, body: &str, priority: i32) -> MockResponse {
    MockResponse {
        id: id.to_string(),
        endpoint_id: endpoint_id.to_string(),
        status_code: 200,
        body: body.to_string(),
        headers: String::new(),
        priority,
        delay_ms: 0,
        is_fallback: false,
        rules: vec![],
    }
}

fn inbound(method: Method, path: &str) -> InboundRequest {
    InboundRequest {
        method,
        path: path.to_string(),
        raw_query: String::new(),
        headers: HeaderMap::new(),
        body: Bytes::new(),
    }
}

async fn body_text(response: Response<Full<Bytes>>) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8_lossy(&bytes).to_string()
}

async fn body_json(response: Response<Full<Bytes>>) -> serde_json::Value {
    serde_json::from_str(&body_text(response).await).unwrap()
}

#[tokio::test]
async fn test_alias_miss_is_a_soft_200() {
    let dispatcher = dispatcher_with(InMemoryRepository::new());

    let outcome = dispatcher
        .handle("ghost", &inbound(Method::GET, "/ghost/users"))
        .await;

    assert_eq!(outcome.response.status(), StatusCode::OK);
    assert_eq!(outcome.project_id, None);
    assert_eq!(outcome.execution_mode, None);
    assert!(!outcome.matched);

    let body = body_json(outcome.response).await;
    assert!(body["message"]
        .as_str()
        .unwrap()
        .contains("Project not found"));
}

#[tokio::test]
async fn test_endpoint_miss_returns_default_envelope() {
    let repo = InMemoryRepository::new();
    repo.add_project(project("demo", ProjectMode::Mock));
    let dispatcher = dispatcher_with(repo);

    let outcome = dispatcher
        .handle("demo", &inbound(Method::GET, "/demo/nowhere"))
        .await;

    assert_eq!(outcome.response.status(), StatusCode::OK);
    assert_eq!(outcome.execution_mode, Some(ProjectMode::Mock));
    assert!(!outcome.matched);

    let body = body_json(outcome.response).await;
    assert!(body["message"].as_str().unwrap().contains("Endpoint not found"));
}

#[tokio::test]
async fn test_alias_prefix_is_stripped_before_endpoint_lookup() {
    let repo = InMemoryRepository::new();
    repo.add_project(project("demo", ProjectMode::Mock));
    repo.add_endpoint(endpoint("e1", "proj-demo", "/users", "static"));
    repo.add_response(response("r1", "e1", "users!", 0));
    let dispatcher = dispatcher_with(repo);

    let outcome = dispatcher
        .handle("demo", &inbound(Method::GET, "/demo/users"))
        .await;

    assert!(outcome.matched);
    assert_eq!(body_text(outcome.response).await, "users!");
}

#[tokio::test]
async fn test_static_selection_takes_highest_priority() {
    let repo = InMemoryRepository::new();
    repo.add_project(project("demo", ProjectMode::Mock));
    repo.add_endpoint(endpoint("e1", "proj-demo", "/status", "static"));
    repo.add_response(response("r1", "e1", "low", 1));
    repo.add_response(response("r2", "e1", "high", 5));
    repo.add_response(response("r3", "e1", "mid", 3));
    let dispatcher = dispatcher_with(repo);

    let outcome = dispatcher
        .handle("demo", &inbound(Method::GET, "/demo/status"))
        .await;

    assert!(outcome.matched);
    assert_eq!(outcome.execution_mode, Some(ProjectMode::Mock));
    assert_eq!(body_text(outcome.response).await, "high");
}

#[tokio::test]
async fn test_header_rule_gates_selection() {
    let repo = InMemoryRepository::new();
    repo.add_project(project("demo", ProjectMode::Mock));
    repo.add_endpoint(endpoint("e1", "proj-demo", "/status", "static"));

    let mut gated = response("r1", "e1", "prod answer", 5);
    gated.rules = vec![MockRule {
        rule_type: "header".to_string(),
        key: "X-Env".to_string(),
        operator: "equals".to_string(),
        value: "prod".to_string(),
    }];
    repo.add_response(gated);
    repo.add_response(response("r2", "e1", "default answer", 1));
    let dispatcher = dispatcher_with(repo);

    let mut with_header = inbound(Method::GET, "/demo/status");
    with_header.headers.insert(
        HeaderName::from_static("x-env"),
        HeaderValue::from_static("prod"),
    );
    let outcome = dispatcher.handle("demo", &with_header).await;
    assert_eq!(body_text(outcome.response).await, "prod answer");

    let outcome = dispatcher
        .handle("demo", &inbound(Method::GET, "/demo/status"))
        .await;
    assert_eq!(body_text(outcome.response).await, "default answer");
}

#[tokio::test]
async fn test_round_robin_rotates_across_requests() {
    let repo = InMemoryRepository::new();
    repo.add_project(project("demo", ProjectMode::Mock));
    repo.add_endpoint(endpoint("e1", "proj-demo", "/status", "round_robin"));
    repo.add_response(response("r1", "e1", "a", 0));
    repo.add_response(response("r2", "e1", "b", 0));
    repo.add_response(response("r3", "e1", "c", 0));
    let dispatcher = dispatcher_with(repo);
    dispatcher.rotation().reset_all();

    let mut seen = Vec::new();
    for _ in 0..6 {
        let outcome = dispatcher
            .handle("demo", &inbound(Method::GET, "/demo/status"))
            .await;
        seen.push(body_text(outcome.response).await);
    }
    assert_eq!(seen, vec!["a", "b", "c", "a", "b", "c"]);
}

#[tokio::test]
async fn test_no_responses_configured() {
    let repo = InMemoryRepository::new();
    repo.add_project(project("demo", ProjectMode::Mock));
    repo.add_endpoint(endpoint("e1", "proj-demo", "/status", "static"));
    let dispatcher = dispatcher_with(repo);

    let outcome = dispatcher
        .handle("demo", &inbound(Method::GET, "/demo/status"))
        .await;

    // The endpoint matched even though it had nothing to serve.
    assert!(outcome.matched);
    let body = body_json(outcome.response).await;
    assert!(body["message"].as_str().unwrap().contains("No response"));
}

#[tokio::test]
async fn test_no_selection_is_unmatched() {
    let repo = InMemoryRepository::new();
    repo.add_project(project("demo", ProjectMode::Mock));
    repo.add_endpoint(endpoint("e1", "proj-demo", "/status", "static"));

    let mut gated = response("r1", "e1", "never", 0);
    gated.rules = vec![MockRule {
        rule_type: "header".to_string(),
        key: "X-Env".to_string(),
        operator: "equals".to_string(),
        value: "prod".to_string(),
    }];
    repo.add_response(gated);
    let dispatcher = dispatcher_with(repo);

    let outcome = dispatcher
        .handle("demo", &inbound(Method::GET, "/demo/status"))
        .await;

    assert!(!outcome.matched);
    let body = body_json(outcome.response).await;
    assert!(body["message"].as_str().unwrap().contains("No response"));
}

#[tokio::test]
async fn test_proxy_mode_serves_mock_first() {
    let repo = InMemoryRepository::new();
    let mut proxied = project("demo", ProjectMode::Proxy);
    proxied.active_proxy = Some(dead_proxy());
    repo.add_project(proxied);
    repo.add_endpoint(endpoint("e1", "proj-demo", "/status", "static"));
    repo.add_response(response("r1", "e1", "mocked", 0));
    let dispatcher = dispatcher_with(repo);

    let outcome = dispatcher
        .handle("demo", &inbound(Method::GET, "/demo/status"))
        .await;

    // A forward to the dead upstream would have produced a 502 envelope.
    assert_eq!(outcome.response.status(), StatusCode::OK);
    assert!(outcome.matched);
    assert_eq!(outcome.execution_mode, Some(ProjectMode::Proxy));
    assert_eq!(
        outcome
            .response
            .headers()
            .get("beo-echo-response-type")
            .unwrap(),
        "mock"
    );
    assert_eq!(body_text(outcome.response).await, "mocked");
}

#[tokio::test]
async fn test_proxy_mode_forward_miss_stamps_proxy_type() {
    let repo = InMemoryRepository::new();
    let mut proxied = project("demo", ProjectMode::Proxy);
    proxied.active_proxy = Some(ProxyTarget {
        id: "t1".to_string(),
        project_id: String::new(),
        label: String::new(),
        // Unparseable target keeps the test off the network.
        url: "http://bad host".to_string(),
    });
    repo.add_project(proxied);
    let dispatcher = dispatcher_with(repo);

    let outcome = dispatcher
        .handle("demo", &inbound(Method::GET, "/demo/anything"))
        .await;

    assert!(!outcome.matched);
    assert_eq!(
        outcome.response.status(),
        StatusCode::INTERNAL_SERVER_ERROR
    );
    assert_eq!(
        outcome
            .response
            .headers()
            .get("beo-echo-response-type")
            .unwrap(),
        "proxy"
    );
}

#[tokio::test]
async fn test_proxy_mode_without_target_is_a_500() {
    let repo = InMemoryRepository::new();
    repo.add_project(project("demo", ProjectMode::Proxy));
    let dispatcher = dispatcher_with(repo);

    let outcome = dispatcher
        .handle("demo", &inbound(Method::GET, "/demo/users"))
        .await;

    assert_eq!(
        outcome.response.status(),
        StatusCode::INTERNAL_SERVER_ERROR
    );
    let body = body_json(outcome.response).await;
    assert_eq!(body["message"], "No proxy target configured");
}

#[tokio::test]
async fn test_proxy_mode_rejects_looping_request() {
    let repo = InMemoryRepository::new();
    let mut proxied = project("demo", ProjectMode::Proxy);
    proxied.active_proxy = Some(dead_proxy());
    repo.add_project(proxied);
    let dispatcher = dispatcher_with(repo);

    let mut req = inbound(Method::GET, "/demo/users");
    req.headers.insert(
        HeaderName::from_static("beo-echo-loop-detect"),
        HeaderValue::from_static("true"),
    );
    let outcome = dispatcher.handle("demo", &req).await;

    assert_eq!(outcome.response.status(), StatusCode::LOOP_DETECTED);
    assert!(!outcome.matched);
}

#[tokio::test]
async fn test_forwarder_mode_rejects_looping_request() {
    let repo = InMemoryRepository::new();
    let mut forwarding = project("demo", ProjectMode::Forwarder);
    forwarding.active_proxy = Some(dead_proxy());
    repo.add_project(forwarding);
    let dispatcher = dispatcher_with(repo);

    let mut req = inbound(Method::GET, "/demo/users");
    req.headers.insert(
        HeaderName::from_static("beo-echo-loop-detect"),
        HeaderValue::from_static("true"),
    );
    let outcome = dispatcher.handle("demo", &req).await;

    assert_eq!(outcome.response.status(), StatusCode::LOOP_DETECTED);
    assert_eq!(outcome.execution_mode, Some(ProjectMode::Forwarder));
    assert!(!outcome.matched);

    let body = body_json(outcome.response).await;
    assert_eq!(body["error"], true);
}

#[tokio::test]
async fn test_forwarder_mode_without_target_is_a_500() {
    let repo = InMemoryRepository::new();
    repo.add_project(project("demo", ProjectMode::Forwarder));
    let dispatcher = dispatcher_with(repo);

    let outcome = dispatcher
        .handle("demo", &inbound(Method::GET, "/demo/users"))
        .await;
    assert_eq!(
        outcome.response.status(),
        StatusCode::INTERNAL_SERVER_ERROR
    );
}

#[tokio::test]
async fn test_disabled_project_is_a_503() {
    let repo = InMemoryRepository::new();
    repo.add_project(project("demo", ProjectMode::Disabled));
    let dispatcher = dispatcher_with(repo);

    let outcome = dispatcher
        .handle("demo", &inbound(Method::GET, "/demo/users"))
        .await;

    assert_eq!(outcome.response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body = body_json(outcome.response).await;
    assert_eq!(body["error"], true);
    assert_eq!(body["message"], "Service is disabled");
}

#[tokio::test]
async fn test_unknown_project_mode_is_a_500() {
    let repo = InMemoryRepository::new();
    repo.add_project(project("demo", ProjectMode::Unknown));
    let dispatcher = dispatcher_with(repo);

    let outcome = dispatcher
        .handle("demo", &inbound(Method::GET, "/demo/users"))
        .await;

    assert_eq!(
        outcome.response.status(),
        StatusCode::INTERNAL_SERVER_ERROR
    );
    let body = body_json(outcome.response).await;
    assert_eq!(body["message"], "Invalid project mode");
}

#[tokio::test]
async fn test_proxied_endpoint_rejects_looping_request_in_mock_mode() {
    // Mock mode has no outer loop check; the forwarder's inner check must
    // still catch it when the endpoint is proxied.
    let repo = InMemoryRepository::new();
    repo.add_project(project("demo", ProjectMode::Mock));
    let mut proxied = endpoint("e1", "proj-demo", "/users", "static");
    proxied.use_proxy = true;
    proxied.proxy_target = Some(dead_proxy());
    repo.add_endpoint(proxied);
    let dispatcher = dispatcher_with(repo);

    let mut req = inbound(Method::GET, "/demo/users");
    req.headers.insert(
        HeaderName::from_static("beo-echo-response-type"),
        HeaderValue::from_static("mock"),
    );
    let outcome = dispatcher.handle("demo", &req).await;

    assert_eq!(outcome.response.status(), StatusCode::LOOP_DETECTED);
    assert_eq!(outcome.execution_mode, Some(ProjectMode::Proxy));
    assert!(outcome.matched);
}

#[tokio::test]
async fn test_brotli_encoded_mock_round_trips() {
    use std::io::Read;

    let repo = InMemoryRepository::new();
    repo.add_project(project("demo", ProjectMode::Mock));
    repo.add_endpoint(endpoint("e1", "proj-demo", "/compressed", "static"));

    let mut compressed = response("r1", "e1", "hello", 0);
    compressed.headers = r#"{"Content-Encoding":"br"}"#.to_string();
    repo.add_response(compressed);
    let dispatcher = dispatcher_with(repo);

    let outcome = dispatcher
        .handle("demo", &inbound(Method::GET, "/demo/compressed"))
        .await;
    assert!(outcome.matched);

    let declared: usize = outcome
        .response
        .headers()
        .get("content-length")
        .unwrap()
        .to_str()
        .unwrap()
        .parse()
        .unwrap();
    let bytes = outcome
        .response
        .into_body()
        .collect()
        .await
        .unwrap()
        .to_bytes();
    assert_eq!(declared, bytes.len());

    let mut decoded = String::new();
    brotli::Decompressor::new(bytes.as_ref(), 4096)
        .read_to_string(&mut decoded)
        .unwrap();
    assert_eq!(decoded, "hello");
}

#[tokio::test]
async fn test_fallback_serves_when_no_rule_matches() {
    let repo = InMemoryRepository::new();
    repo.add_project(project("demo", ProjectMode::Mock));
    repo.add_endpoint(endpoint("e1", "proj-demo", "/status", "static"));

    let gate = MockRule {
        rule_type: "header".to_string(),
        key: "X-Env".to_string(),
        operator: "equals".to_string(),
        value: "prod".to_string(),
    };
    let mut first = response("r1", "e1", "first fallback", 0);
    first.rules = vec![gate.clone()];
    first.is_fallback = true;
    let mut second = response("r2", "e1", "last fallback", 0);
    second.rules = vec![gate];
    second.is_fallback = true;
    repo.add_response(first);
    repo.add_response(second);
    let dispatcher = dispatcher_with(repo);

    let outcome = dispatcher
        .handle("demo", &inbound(Method::GET, "/demo/status"))
        .await;
    assert_eq!(body_text(outcome.response).await, "last fallback");
}
