//! JSON envelopes for soft misses and failures.
//!
//! The dispatch core never surfaces a transport-layer failure to its HTTP
//! caller; every miss and error becomes one of these well-formed envelopes.

use bytes::Bytes;
use http_body_util::Full;
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::{Response, StatusCode};

/// A 200 envelope with a descriptive message, used for the soft-miss paths
/// (unknown alias, unmatched endpoint, unconfigured responses). Clients get
/// a parseable body rather than a transport error.
pub fn default_message_response(message: &str) -> Response<Full<Bytes>> {
    let body = serde_json::json!({ "message": message }).to_string();

    let mut response = Response::builder()
        .status(StatusCode::OK)
        .body(Full::new(Bytes::from(body)))
        .expect("envelope from static parts");
    response.headers_mut().insert(
        CONTENT_TYPE,
        HeaderValue::from_static("application/json; charset=utf-8"),
    );
    response
}

/// A non-200 envelope: `{"error": true, "message": …}`.
pub fn error_response(status: StatusCode, message: &str) -> Response<Full<Bytes>> {
    let body = serde_json::json!({ "error": true, "message": message }).to_string();

    let mut response = Response::builder()
        .status(status)
        .body(Full::new(Bytes::from(body)))
        .expect("envelope from static parts");
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    response
}
