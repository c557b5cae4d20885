//! Per-request dispatch: alias routing, mode arbitration, and delegation to
//! the mock, proxy, and forwarder flows.

pub mod envelope;

#[cfg(test)]
mod tests;

use bytes::Bytes;
use http_body_util::Full;
use hyper::{Response, StatusCode};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::Config;
use crate::delay::apply_delay;
use crate::forward::{
    build_forward_client, forward_request, has_loop_header, ForwardClient, LOOP_DETECTED_MESSAGE,
};
use crate::request::InboundRequest;
use crate::response::build_mock_response;
use crate::selection::{select_response, RoundRobinRegistry};
use crate::server::headers::{EchoHeadersExt, BEO_ECHO_RESPONSE_TYPE, VALUE_MOCK, VALUE_PROXY};
use crate::store::{MockRepository, Project, ProjectMode};
use envelope::{default_message_response, error_response};

/// What the caller gets back for one dispatched request: the response plus
/// the tagging needed to log the outcome.
pub struct DispatchOutcome {
    pub response: Response<Full<Bytes>>,
    pub project_id: Option<String>,
    /// Which branch served the request; `None` when the alias did not resolve.
    pub execution_mode: Option<ProjectMode>,
    /// True iff a concrete mock endpoint supplied the response.
    pub matched: bool,
}

/// The top-level request-dispatch state machine.
pub struct Dispatcher {
    repo: Arc<dyn MockRepository>,
    rotation: RoundRobinRegistry,
    client: ForwardClient,
    forward_timeout: Duration,
    messages: crate::config::Messages,
}

impl Dispatcher {
    pub fn new(repo: Arc<dyn MockRepository>, config: &Config) -> Self {
        Self {
            repo,
            rotation: RoundRobinRegistry::new(),
            client: build_forward_client(config.forward.tls_skip_verify),
            forward_timeout: Duration::from_secs(config.forward.timeout_secs),
            messages: config.messages.clone(),
        }
    }

    /// Round-robin state, exposed so tests can reset rotation between cases.
    pub fn rotation(&self) -> &RoundRobinRegistry {
        &self.rotation
    }

    /// Dispatch one request addressed to `alias`.
    pub async fn handle(&self, alias: &str, req: &InboundRequest) -> DispatchOutcome {
        let project = match self.repo.find_project_by_alias(alias) {
            Ok(project) => project,
            Err(err) => {
                debug!(alias, %err, "alias did not resolve");
                return DispatchOutcome {
                    response: default_message_response(&self.messages.project_not_found),
                    project_id: None,
                    execution_mode: None,
                    matched: false,
                };
            }
        };

        // Strip the leading /{alias} prefix before sub-flow dispatch.
        let prefix = format!("/{}", project.alias);
        let clean_path = req
            .path
            .strip_prefix(&prefix)
            .unwrap_or(&req.path)
            .to_string();

        match project.mode {
            ProjectMode::Mock => {
                let (response, mode, matched) =
                    self.handle_mock_mode(&project, &clean_path, req).await;
                DispatchOutcome {
                    response,
                    project_id: Some(project.id),
                    execution_mode: Some(mode),
                    matched,
                }
            }
            ProjectMode::Proxy => {
                let (response, matched) = self.handle_proxy_mode(&project, &clean_path, req).await;
                DispatchOutcome {
                    response,
                    project_id: Some(project.id),
                    execution_mode: Some(ProjectMode::Proxy),
                    matched,
                }
            }
            ProjectMode::Forwarder => {
                let response = self.handle_forwarder_mode(&project, &clean_path, req).await;
                DispatchOutcome {
                    response,
                    project_id: Some(project.id),
                    execution_mode: Some(ProjectMode::Forwarder),
                    matched: false,
                }
            }
            ProjectMode::Disabled => DispatchOutcome {
                response: error_response(StatusCode::SERVICE_UNAVAILABLE, "Service is disabled"),
                project_id: Some(project.id),
                execution_mode: Some(ProjectMode::Disabled),
                matched: false,
            },
            ProjectMode::Unknown => DispatchOutcome {
                response: error_response(StatusCode::INTERNAL_SERVER_ERROR, "Invalid project mode"),
                project_id: Some(project.id),
                execution_mode: Some(ProjectMode::Unknown),
                matched: false,
            },
        }
    }

    /// Mock flow: endpoint lookup, selection, delay, synthesis. The reported
    /// mode flips to `Proxy` when the endpoint itself is proxied.
    async fn handle_mock_mode(
        &self,
        project: &Project,
        path: &str,
        req: &InboundRequest,
    ) -> (Response<Full<Bytes>>, ProjectMode, bool) {
        let endpoint =
            match self
                .repo
                .find_matching_endpoint(&project.id, req.method.as_str(), path)
            {
                Ok(endpoint) => endpoint,
                Err(_) => {
                    apply_delay(Some(project), None, None).await;
                    return (
                        default_message_response(&self.messages.endpoint_not_found),
                        ProjectMode::Mock,
                        false,
                    );
                }
            };

        if endpoint.use_proxy {
            if let Some(target) = &endpoint.proxy_target {
                apply_delay(Some(project), Some(&endpoint), None).await;
                let response =
                    forward_request(&self.client, &target.url, path, req, self.forward_timeout)
                        .await;
                return (response, ProjectMode::Proxy, true);
            }
        }

        let responses = self
            .repo
            .find_responses_by_endpoint_id(&endpoint.id)
            .unwrap_or_default();
        if responses.is_empty() {
            apply_delay(Some(project), Some(&endpoint), None).await;
            return (
                default_message_response(&self.messages.no_response),
                ProjectMode::Mock,
                true,
            );
        }

        let Some(selected) = select_response(
            &endpoint.id,
            &responses,
            &endpoint.response_mode,
            req,
            &self.rotation,
        ) else {
            return (
                default_message_response(&self.messages.no_response),
                ProjectMode::Mock,
                false,
            );
        };

        apply_delay(Some(project), Some(&endpoint), Some(selected)).await;

        match build_mock_response(selected) {
            Ok(response) => (response, ProjectMode::Mock, true),
            Err(err) => {
                warn!(endpoint_id = %endpoint.id, %err, "failed to build mock response");
                (
                    error_response(
                        StatusCode::INTERNAL_SERVER_ERROR,
                        &format!("Failed to build mock response: {err}"),
                    ),
                    ProjectMode::Mock,
                    true,
                )
            }
        }
    }

    /// Proxy flow: try the mock path first; on any miss, forward to the
    /// project's active proxy. The bool is true iff a mock served it.
    async fn handle_proxy_mode(
        &self,
        project: &Project,
        path: &str,
        req: &InboundRequest,
    ) -> (Response<Full<Bytes>>, bool) {
        let Some(active_proxy) = &project.active_proxy else {
            return (
                error_response(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "No proxy target configured",
                ),
                false,
            );
        };

        if has_loop_header(&req.headers) {
            return (
                error_response(StatusCode::LOOP_DETECTED, LOOP_DETECTED_MESSAGE),
                false,
            );
        }

        if let Ok(endpoint) =
            self.repo
                .find_matching_endpoint(&project.id, req.method.as_str(), path)
        {
            if let Ok(responses) = self.repo.find_responses_by_endpoint_id(&endpoint.id) {
                if !responses.is_empty() {
                    if let Some(selected) = select_response(
                        &endpoint.id,
                        &responses,
                        &endpoint.response_mode,
                        req,
                        &self.rotation,
                    ) {
                        apply_delay(Some(project), Some(&endpoint), Some(selected)).await;

                        match build_mock_response(selected) {
                            Ok(mut response) => {
                                response.set_echo_header(&BEO_ECHO_RESPONSE_TYPE, &VALUE_MOCK);
                                return (response, true);
                            }
                            Err(err) => {
                                // Fall through to the upstream on build failure.
                                warn!(endpoint_id = %endpoint.id, %err, "mock build failed, forwarding instead");
                            }
                        }
                    }
                }
            }
        }

        apply_delay(Some(project), None, None).await;
        let mut response = forward_request(
            &self.client,
            &active_proxy.url,
            path,
            req,
            self.forward_timeout,
        )
        .await;
        response.set_echo_header(&BEO_ECHO_RESPONSE_TYPE, &VALUE_PROXY);
        (response, false)
    }

    /// Forwarder flow: every request goes upstream.
    async fn handle_forwarder_mode(
        &self,
        project: &Project,
        path: &str,
        req: &InboundRequest,
    ) -> Response<Full<Bytes>> {
        let Some(active_proxy) = &project.active_proxy else {
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "No proxy target configured",
            );
        };

        if has_loop_header(&req.headers) {
            return error_response(StatusCode::LOOP_DETECTED, LOOP_DETECTED_MESSAGE);
        }

        apply_delay(Some(project), None, None).await;
        forward_request(
            &self.client,
            &active_proxy.url,
            path,
            req,
            self.forward_timeout,
        )
        .await
    }
}
