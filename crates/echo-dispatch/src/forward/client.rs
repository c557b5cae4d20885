//! Upstream HTTP client construction.

use super::tls::NoVerifier;
use bytes::Bytes;
use http_body_util::Full;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use std::sync::Arc;
use tracing::warn;

/// The client used for forwarding requests upstream.
pub type ForwardClient = Client<hyper_rustls::HttpsConnector<HttpConnector>, Full<Bytes>>;

/// Build the forwarding client.
///
/// With `skip_tls_verify` (the default) the client accepts any upstream
/// certificate; the service is a testing tool that regularly targets
/// staging hosts with invalid certs. This is security-relevant, so it is
/// logged loudly on construction.
pub fn build_forward_client(skip_tls_verify: bool) -> ForwardClient {
    let mut http_connector = HttpConnector::new();
    http_connector.enforce_http(false); // allow both http and https targets

    let https_connector = if skip_tls_verify {
        warn!("TLS certificate verification DISABLED for upstream forwarding");
        hyper_rustls::HttpsConnectorBuilder::new()
            .with_tls_config(
                rustls::ClientConfig::builder()
                    .dangerous()
                    .with_custom_certificate_verifier(Arc::new(NoVerifier))
                    .with_no_client_auth(),
            )
            .https_or_http()
            .enable_http1()
            .wrap_connector(http_connector)
    } else {
        hyper_rustls::HttpsConnectorBuilder::new()
            .with_native_roots()
            .expect("native root certificates must load when verification is enabled")
            .https_or_http()
            .enable_http1()
            .wrap_connector(http_connector)
    };

    Client::builder(TokioExecutor::new()).build(https_connector)
}
