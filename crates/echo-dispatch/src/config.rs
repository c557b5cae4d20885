//! Service configuration.
//!
//! Loaded from a YAML file; every section has defaults so an empty file is a
//! valid configuration. Fixture projects let a deployment run entirely from
//! the in-memory repository; installations with real storage leave
//! `projects` empty and hand the dispatcher their own repository.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

use crate::store::{
    Endpoint, InMemoryRepository, MockResponse, MockRule, Project, ProjectMode, ProxyTarget,
};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub listen: ListenConfig,
    #[serde(default)]
    pub forward: ForwardConfig,
    #[serde(default)]
    pub messages: Messages,
    /// Optional in-memory fixture projects.
    #[serde(default)]
    pub projects: Vec<ProjectFixture>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListenConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ListenConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForwardConfig {
    /// Ceiling on a single upstream attempt, in seconds.
    #[serde(default = "default_forward_timeout")]
    pub timeout_secs: u64,
    /// Accept any upstream certificate. On by default: the forwarder
    /// routinely targets staging hosts with self-signed certs. Set to false
    /// at the deployment boundary when stricter behavior is required.
    #[serde(default = "default_true")]
    pub tls_skip_verify: bool,
}

impl Default for ForwardConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_forward_timeout(),
            tls_skip_verify: true,
        }
    }
}

fn default_forward_timeout() -> u64 {
    30
}

fn default_true() -> bool {
    true
}

/// Texts for the soft-miss envelopes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Messages {
    #[serde(default = "default_project_not_found")]
    pub project_not_found: String,
    #[serde(default = "default_endpoint_not_found")]
    pub endpoint_not_found: String,
    #[serde(default = "default_no_response")]
    pub no_response: String,
}

impl Default for Messages {
    fn default() -> Self {
        Self {
            project_not_found: default_project_not_found(),
            endpoint_not_found: default_endpoint_not_found(),
            no_response: default_no_response(),
        }
    }
}

fn default_project_not_found() -> String {
    "Project not found. Check the alias in the request URL.".to_string()
}

fn default_endpoint_not_found() -> String {
    "Endpoint not found. No mock endpoint matches this method and path.".to_string()
}

fn default_no_response() -> String {
    "No response configured for this endpoint.".to_string()
}

/// A project defined inline in the config file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectFixture {
    #[serde(default)]
    pub id: String,
    pub alias: String,
    pub mode: ProjectMode,
    #[serde(default)]
    pub active_proxy: Option<ProxyTarget>,
    #[serde(default)]
    pub advance_config: Option<String>,
    #[serde(default)]
    pub endpoints: Vec<EndpointFixture>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointFixture {
    #[serde(default)]
    pub id: String,
    pub method: String,
    pub path: String,
    #[serde(default = "default_response_mode")]
    pub response_mode: String,
    #[serde(default)]
    pub use_proxy: bool,
    #[serde(default)]
    pub proxy_target: Option<ProxyTarget>,
    #[serde(default)]
    pub advance_config: Option<String>,
    #[serde(default)]
    pub responses: Vec<ResponseFixture>,
}

fn default_response_mode() -> String {
    "random".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseFixture {
    #[serde(default)]
    pub id: String,
    #[serde(default = "default_status_code")]
    pub status_code: u16,
    #[serde(default)]
    pub body: String,
    /// JSON object string, same shape the storage layer keeps.
    #[serde(default)]
    pub headers: String,
    #[serde(default)]
    pub priority: i32,
    #[serde(default)]
    pub delay_ms: u64,
    #[serde(default)]
    pub is_fallback: bool,
    #[serde(default)]
    pub rules: Vec<MockRule>,
}

fn default_status_code() -> u16 {
    200
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, anyhow::Error> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.listen.port == 0 {
            anyhow::bail!("listen.port must be non-zero");
        }
        if self.forward.timeout_secs == 0 {
            anyhow::bail!("forward.timeout_secs must be non-zero");
        }

        let mut aliases = HashSet::new();
        for project in &self.projects {
            if project.alias.is_empty() {
                anyhow::bail!("fixture project alias cannot be empty");
            }
            if !aliases.insert(project.alias.as_str()) {
                anyhow::bail!("duplicate fixture project alias '{}'", project.alias);
            }
        }
        Ok(())
    }

    /// Build an in-memory repository from the fixture projects. Missing ids
    /// are filled in deterministically from positions.
    pub fn build_repository(&self) -> InMemoryRepository {
        let repo = InMemoryRepository::new();

        for (pi, fixture) in self.projects.iter().enumerate() {
            let project_id = non_empty_or(&fixture.id, || format!("project-{}", pi + 1));
            repo.add_project(Project {
                id: project_id.clone(),
                alias: fixture.alias.clone(),
                mode: fixture.mode,
                active_proxy: fixture.active_proxy.clone(),
                advance_config: fixture.advance_config.clone(),
            });

            for (ei, endpoint) in fixture.endpoints.iter().enumerate() {
                let endpoint_id =
                    non_empty_or(&endpoint.id, || format!("{}-endpoint-{}", project_id, ei + 1));
                repo.add_endpoint(Endpoint {
                    id: endpoint_id.clone(),
                    project_id: project_id.clone(),
                    method: endpoint.method.clone(),
                    path: endpoint.path.clone(),
                    response_mode: endpoint.response_mode.clone(),
                    use_proxy: endpoint.use_proxy,
                    proxy_target: endpoint.proxy_target.clone(),
                    advance_config: endpoint.advance_config.clone(),
                });

                for (ri, response) in endpoint.responses.iter().enumerate() {
                    repo.add_response(MockResponse {
                        id: non_empty_or(&response.id, || {
                            format!("{}-response-{}", endpoint_id, ri + 1)
                        }),
                        endpoint_id: endpoint_id.clone(),
                        status_code: response.status_code,
                        body: response.body.clone(),
                        headers: response.headers.clone(),
                        priority: response.priority,
                        delay_ms: response.delay_ms,
                        is_fallback: response.is_fallback,
                        rules: response.rules.clone(),
                    });
                }
            }
        }

        repo
    }
}

fn non_empty_or(value: &str, fallback: impl FnOnce() -> String) -> String {
    if value.is_empty() {
        fallback()
    } else {
        value.to_string()
    }
}
