//! Compile-time safe names and values for the service's diagnostic headers.

use hyper::header::{HeaderName, HeaderValue};
use hyper::Response;

/// Routing diagnostic: whether a proxy-mode request was answered by a mock
/// or forwarded upstream.
pub static BEO_ECHO_RESPONSE_TYPE: HeaderName =
    HeaderName::from_static("beo-echo-response-type");
/// Upstream wall-clock latency in whole milliseconds.
pub static BEO_ECHO_LATENCY_MS: HeaderName = HeaderName::from_static("beo-echo-latency-ms");
/// Stamped on every outbound forwarded request; its presence on an inbound
/// request marks a proxy loop.
pub static BEO_ECHO_LOOP_DETECT: HeaderName = HeaderName::from_static("beo-echo-loop-detect");

pub static VALUE_TRUE: HeaderValue = HeaderValue::from_static("true");
pub static VALUE_MOCK: HeaderValue = HeaderValue::from_static("mock");
pub static VALUE_PROXY: HeaderValue = HeaderValue::from_static("proxy");

/// Extension trait for stamping diagnostic headers on responses.
pub trait EchoHeadersExt {
    fn set_echo_header(&mut self, name: &HeaderName, value: &HeaderValue);

    /// Returns false when the value cannot be represented as a header value.
    fn set_echo_header_value(&mut self, name: &HeaderName, value: &str) -> bool;
}

impl<B> EchoHeadersExt for Response<B> {
    fn set_echo_header(&mut self, name: &HeaderName, value: &HeaderValue) {
        self.headers_mut().insert(name.clone(), value.clone());
    }

    fn set_echo_header_value(&mut self, name: &HeaderName, value: &str) -> bool {
        match HeaderValue::from_str(value) {
            Ok(value) => {
                self.headers_mut().insert(name.clone(), value);
                true
            }
            Err(_) => false,
        }
    }
}
