//! Buffered view of an inbound request.
//!
//! The server boundary reads the body exactly once; every later observer
//! (rule matcher, forwarder, access log) sees the same bytes. `Bytes` clones
//! are reference-counted, so this is the materialized-body discipline the
//! resource model asks for without repeated reads.

use bytes::Bytes;
use hyper::{HeaderMap, Method};
use std::collections::HashMap;

/// An inbound request with its body fully buffered.
#[derive(Debug, Clone)]
pub struct InboundRequest {
    pub method: Method,
    /// Full inbound path, including the `/{alias}` prefix.
    pub path: String,
    /// Raw query string, forwarded verbatim upstream.
    pub raw_query: String,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl InboundRequest {
    /// First value of a header, or empty when absent or non-UTF-8.
    pub fn header_value(&self, name: &str) -> String {
        self.headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string()
    }

    /// First value of a query parameter, percent-decoded, or empty when absent.
    pub fn query_value(&self, name: &str) -> String {
        parse_query_string(&self.raw_query)
            .remove(name)
            .unwrap_or_default()
    }
}

/// Parse a raw query string into first-value-wins parameters.
pub fn parse_query_string(query: &str) -> HashMap<String, String> {
    let mut params = HashMap::new();
    for pair in query.split('&') {
        if let Some((key, value)) = pair.split_once('=') {
            params
                .entry(key.to_string())
                .or_insert_with(|| urlencoding::decode(value).unwrap_or_default().to_string());
        } else if !pair.is_empty() {
            params.entry(pair.to_string()).or_default();
        }
    }
    params
}
