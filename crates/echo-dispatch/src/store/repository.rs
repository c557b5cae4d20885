//! Read-only lookup interface over the storage collaborator.

use super::types::{Endpoint, MockResponse, Project};

/// Errors surfaced by repository lookups.
///
/// The dispatcher only distinguishes "found" from "not found"; any other
/// storage failure is treated as a miss and answered with the corresponding
/// soft envelope.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("project with alias '{0}' not found")]
    ProjectNotFound(String),
    #[error("no endpoint matches {method} {path}")]
    EndpointNotFound { method: String, path: String },
    #[error("storage error: {0}")]
    Storage(String),
}

/// Read-only lookups the dispatch core needs from storage.
///
/// Implementations own path matching for endpoints, including evaluation of
/// `path`-type rules; the rule matcher never sees them.
pub trait MockRepository: Send + Sync {
    fn find_project_by_alias(&self, alias: &str) -> Result<Project, RepositoryError>;

    fn find_matching_endpoint(
        &self,
        project_id: &str,
        method: &str,
        path: &str,
    ) -> Result<Endpoint, RepositoryError>;

    fn find_responses_by_endpoint_id(
        &self,
        endpoint_id: &str,
    ) -> Result<Vec<MockResponse>, RepositoryError>;
}
