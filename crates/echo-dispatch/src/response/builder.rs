//! Mock response synthesis.
//!
//! Builds an HTTP response from a stored body and headers blob, encoding the
//! body when the stored `Content-Encoding` header asks for `gzip` or `br`.

use bytes::Bytes;
use http_body_util::Full;
use hyper::header::{HeaderName, HeaderValue, CONTENT_LENGTH};
use hyper::{Response, StatusCode};
use std::collections::HashMap;
use std::io::Write;
use std::str::FromStr;
use tracing::warn;

use crate::store::MockResponse;

/// Build an HTTP response from a stored mock.
///
/// A malformed headers blob is tolerated and treated as empty. Encoding
/// failures and invalid stored status codes are build errors; the caller
/// decides whether that becomes a 500 envelope (mock mode) or a fall-through
/// to the upstream (proxy mode).
pub fn build_mock_response(mock: &MockResponse) -> anyhow::Result<Response<Full<Bytes>>> {
    let headers: HashMap<String, String> = match serde_json::from_str(&mock.headers) {
        Ok(parsed) => parsed,
        Err(err) => {
            if !mock.headers.trim().is_empty() {
                warn!(response_id = %mock.id, %err, "stored response headers are not a JSON object, ignoring");
            }
            HashMap::new()
        }
    };

    let content_encoding = headers
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case("content-encoding"))
        .map(|(_, value)| value.to_lowercase())
        .unwrap_or_default();

    let payload: Bytes = match content_encoding.as_str() {
        "gzip" => gzip_encode(mock.body.as_bytes())?.into(),
        "br" => brotli_encode(mock.body.as_bytes())?.into(),
        _ => Bytes::copy_from_slice(mock.body.as_bytes()),
    };

    let status = StatusCode::from_u16(mock.status_code)
        .map_err(|_| anyhow::anyhow!("invalid stored status code {}", mock.status_code))?;

    let content_length = payload.len();
    let mut response = Response::builder()
        .status(status)
        .body(Full::new(payload))
        .expect("response from validated parts");

    for (name, value) in &headers {
        match (HeaderName::from_str(name), HeaderValue::from_str(value)) {
            (Ok(name), Ok(value)) => {
                response.headers_mut().insert(name, value);
            }
            _ => warn!(header = %name, "skipping stored header with invalid name or value"),
        }
    }
    response
        .headers_mut()
        .insert(CONTENT_LENGTH, HeaderValue::from(content_length as u64));

    Ok(response)
}

fn gzip_encode(raw: &[u8]) -> anyhow::Result<Vec<u8>> {
    let mut encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
    encoder.write_all(raw)?;
    Ok(encoder.finish()?)
}

fn brotli_encode(raw: &[u8]) -> anyhow::Result<Vec<u8>> {
    let mut out = Vec::new();
    {
        let mut encoder = brotli::CompressorWriter::new(&mut out, 4096, 5, 22);
        encoder.write_all(raw)?;
        encoder.flush()?;
    }
    Ok(out)
}
