//! HTTP surface: accept loop, alias routing, and access-record emission.
//!
//! Each inbound request is handled on its own task; the only shared mutable
//! state lives inside the dispatcher (round-robin counters).

pub mod headers;
pub mod log;

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::dispatch::envelope::error_response;
use crate::dispatch::Dispatcher;
use crate::request::InboundRequest;
use crate::store::MockRepository;
use self::log::LogRecord;

/// The mocking/proxying HTTP server.
pub struct EchoServer {
    config: Config,
    dispatcher: Arc<Dispatcher>,
}

impl EchoServer {
    pub fn new(config: Config, repo: Arc<dyn MockRepository>) -> Self {
        let dispatcher = Arc::new(Dispatcher::new(repo, &config));
        Self { config, dispatcher }
    }

    /// Bind and serve until the process exits.
    pub async fn run(self) -> anyhow::Result<()> {
        let addr = format!("{}:{}", self.config.listen.host, self.config.listen.port);
        let listener = TcpListener::bind(&addr).await?;
        info!(%addr, "listening");

        loop {
            let (stream, client_addr) = listener.accept().await?;
            let dispatcher = Arc::clone(&self.dispatcher);

            tokio::spawn(async move {
                let io = TokioIo::new(stream);
                let service = service_fn(move |req| {
                    let dispatcher = Arc::clone(&dispatcher);
                    async move {
                        Ok::<_, Infallible>(dispatch_one(&dispatcher, client_addr, req).await)
                    }
                });

                if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                    debug!(%err, "connection closed with error");
                }
            });
        }
    }
}

/// Buffer the body, split the alias off the path, dispatch, and emit one
/// access record.
async fn dispatch_one(
    dispatcher: &Dispatcher,
    client_addr: SocketAddr,
    req: Request<Incoming>,
) -> Response<Full<Bytes>> {
    let start = Instant::now();
    let method = req.method().clone();
    let uri = req.uri().clone();
    let headers = req.headers().clone();
    let path = uri.path().to_string();
    let raw_query = uri.query().unwrap_or("").to_string();

    // The body is read exactly once; every later observer shares the buffer.
    let body = match req.into_body().collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(err) => {
            warn!(%err, "failed to read request body");
            return error_response(
                StatusCode::BAD_GATEWAY,
                &format!("Failed to read request body: {err}"),
            );
        }
    };

    let alias = path
        .trim_start_matches('/')
        .split('/')
        .next()
        .unwrap_or("")
        .to_string();

    let inbound = InboundRequest {
        method: method.clone(),
        path: path.clone(),
        raw_query,
        headers,
        body,
    };

    let outcome = dispatcher.handle(&alias, &inbound).await;

    LogRecord {
        timestamp: chrono::Utc::now().to_rfc3339(),
        client_addr: client_addr.to_string(),
        method: method.to_string(),
        path,
        alias,
        project_id: outcome.project_id.clone(),
        execution_mode: outcome.execution_mode,
        matched: outcome.matched,
        status: outcome.response.status().as_u16(),
        latency_ms: start.elapsed().as_millis() as u64,
    }
    .emit();

    outcome.response
}
