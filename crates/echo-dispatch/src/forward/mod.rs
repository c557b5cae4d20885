//! Upstream request forwarding.
//!
//! Builds, issues, and returns an HTTP response from an upstream target,
//! copying body and headers faithfully, stamping diagnostic headers, and
//! rejecting requests that have already traversed this service.

mod client;
mod tls;

pub use client::{build_forward_client, ForwardClient};

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::header::{HeaderMap, HeaderValue, HOST, REFERER};
use hyper::{Request, Response, StatusCode, Uri};
use std::time::{Duration, Instant};
use tracing::{debug, error};

use crate::dispatch::envelope::error_response;
use crate::request::InboundRequest;
use crate::server::headers::{EchoHeadersExt, BEO_ECHO_LATENCY_MS, BEO_ECHO_LOOP_DETECT, VALUE_TRUE};

/// Inbound header-name prefix that marks a request as having already passed
/// through this service.
pub const LOOP_HEADER_PREFIX: &str = "beo-echo";

pub const LOOP_DETECTED_MESSAGE: &str =
    "Proxy loop detected: request contains beo-echo header";

/// Whether any inbound header name carries the loop prefix. Header names in
/// the map are already lowercase, so the comparison is case-insensitive.
pub fn has_loop_header(headers: &HeaderMap) -> bool {
    headers
        .keys()
        .any(|name| name.as_str().starts_with(LOOP_HEADER_PREFIX))
}

/// Forward the request to `target_url`, joining `sub_path` onto the target's
/// base path and carrying the inbound query string verbatim.
///
/// Never fails: URL parse errors come back as a 500 envelope and build,
/// transport, timeout, and body-read errors as 502 envelopes. Loop detection
/// runs here again even though the mode branches already checked, so code
/// paths that skip the outer check still cannot recurse.
pub async fn forward_request(
    client: &ForwardClient,
    target_url: &str,
    sub_path: &str,
    req: &InboundRequest,
    timeout: Duration,
) -> Response<Full<Bytes>> {
    if has_loop_header(&req.headers) {
        return error_response(StatusCode::LOOP_DETECTED, LOOP_DETECTED_MESSAGE);
    }

    let target: Uri = match target_url.parse() {
        Ok(uri) => uri,
        Err(err) => {
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &format!("Invalid proxy URL: {err}"),
            )
        }
    };
    let authority = match target.authority() {
        Some(authority) => authority.clone(),
        None => {
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Invalid proxy URL: missing host",
            )
        }
    };

    let joined_path = join_paths(target.path(), sub_path);
    let path_and_query = if req.raw_query.is_empty() {
        joined_path
    } else {
        format!("{joined_path}?{}", req.raw_query)
    };

    let uri = match Uri::builder()
        .scheme(target.scheme_str().unwrap_or("http"))
        .authority(authority.clone())
        .path_and_query(path_and_query)
        .build()
    {
        Ok(uri) => uri,
        Err(err) => {
            return error_response(
                StatusCode::BAD_GATEWAY,
                &format!("Failed to create request: {err}"),
            )
        }
    };

    debug!(%uri, "forwarding upstream");

    let mut outgoing = match Request::builder()
        .method(req.method.clone())
        .uri(uri)
        .body(Full::new(req.body.clone()))
    {
        Ok(outgoing) => outgoing,
        Err(err) => {
            return error_response(
                StatusCode::BAD_GATEWAY,
                &format!("Failed to create request: {err}"),
            )
        }
    };

    // Copy every inbound header in order, multi-values included. `Referer`
    // is dropped and `Host` is rewritten to the target authority.
    let outgoing_headers = outgoing.headers_mut();
    for (name, value) in req.headers.iter() {
        if name == REFERER || name == HOST {
            continue;
        }
        outgoing_headers.append(name.clone(), value.clone());
    }
    if let Ok(host) = HeaderValue::from_str(authority.as_str()) {
        outgoing_headers.insert(HOST, host);
    }
    outgoing_headers.insert(BEO_ECHO_LOOP_DETECT.clone(), VALUE_TRUE.clone());

    let start = Instant::now();
    let upstream = match tokio::time::timeout(timeout, client.request(outgoing)).await {
        Ok(Ok(upstream)) => upstream,
        Ok(Err(err)) => {
            error!(%err, "upstream request failed");
            return error_response(StatusCode::BAD_GATEWAY, &format!("Request error: {err}"));
        }
        Err(_) => {
            error!(timeout_secs = timeout.as_secs(), "upstream request timed out");
            return error_response(
                StatusCode::BAD_GATEWAY,
                &format!(
                    "Request error: upstream did not respond within {}s",
                    timeout.as_secs()
                ),
            );
        }
    };
    let latency_ms = start.elapsed().as_millis();

    let (mut parts, body) = upstream.into_parts();
    let body_bytes = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(err) => {
            error!(%err, "failed to read upstream response body");
            return error_response(
                StatusCode::BAD_GATEWAY,
                &format!("Failed to read upstream response body: {err}"),
            );
        }
    };

    // The body is re-materialized, so connection-level framing headers from
    // the upstream no longer apply.
    for name in ["transfer-encoding", "connection", "keep-alive"] {
        parts.headers.remove(name);
    }

    let mut response = Response::from_parts(parts, Full::new(body_bytes));
    response.set_echo_header_value(&BEO_ECHO_LATENCY_MS, &latency_ms.to_string());
    response
}

/// POSIX-style path join with lexical cleaning: repeated separators
/// collapse, `.` segments drop, and `..` pops the preceding segment (at the
/// root it drops). The result is always rooted.
fn join_paths(base: &str, sub: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for segment in base.split('/').chain(sub.split('/')) {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            segment => segments.push(segment),
        }
    }

    if segments.is_empty() {
        "/".to_string()
    } else {
        format!("/{}", segments.join("/"))
    }
}
