//! In-memory repository used by the bundled binary and the test suite.
//!
//! Production deployments hand the dispatcher a repository backed by real
//! storage; this one is seeded from fixture projects in the service config.

use parking_lot::RwLock;
use std::collections::HashMap;

use super::repository::{MockRepository, RepositoryError};
use super::types::{Endpoint, MockResponse, Project};

#[derive(Default)]
struct Tables {
    projects: Vec<Project>,
    endpoints: Vec<Endpoint>,
    responses: HashMap<String, Vec<MockResponse>>,
}

/// Fixture-backed repository. Lookups are linear scans; fixture sets are
/// small by construction.
#[derive(Default)]
pub struct InMemoryRepository {
    tables: RwLock<Tables>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_project(&self, project: Project) {
        self.tables.write().projects.push(project);
    }

    pub fn add_endpoint(&self, endpoint: Endpoint) {
        self.tables.write().endpoints.push(endpoint);
    }

    pub fn add_response(&self, response: MockResponse) {
        let mut tables = self.tables.write();
        tables
            .responses
            .entry(response.endpoint_id.clone())
            .or_default()
            .push(response);
    }
}

impl MockRepository for InMemoryRepository {
    fn find_project_by_alias(&self, alias: &str) -> Result<Project, RepositoryError> {
        self.tables
            .read()
            .projects
            .iter()
            .find(|p| p.alias == alias)
            .cloned()
            .ok_or_else(|| RepositoryError::ProjectNotFound(alias.to_string()))
    }

    fn find_matching_endpoint(
        &self,
        project_id: &str,
        method: &str,
        path: &str,
    ) -> Result<Endpoint, RepositoryError> {
        self.tables
            .read()
            .endpoints
            .iter()
            .find(|e| {
                e.project_id == project_id
                    && e.method.eq_ignore_ascii_case(method)
                    && path_matches(&e.path, path)
            })
            .cloned()
            .ok_or_else(|| RepositoryError::EndpointNotFound {
                method: method.to_string(),
                path: path.to_string(),
            })
    }

    fn find_responses_by_endpoint_id(
        &self,
        endpoint_id: &str,
    ) -> Result<Vec<MockResponse>, RepositoryError> {
        Ok(self
            .tables
            .read()
            .responses
            .get(endpoint_id)
            .cloned()
            .unwrap_or_default())
    }
}

/// Match a request path against an endpoint pattern.
///
/// Segments named `:param` match any single segment; a trailing `*` matches
/// any remaining suffix. Everything else is an exact segment comparison.
fn path_matches(pattern: &str, path: &str) -> bool {
    let pattern_segments: Vec<&str> = pattern.split('/').filter(|s| !s.is_empty()).collect();
    let path_segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

    let mut pi = 0;
    for (i, seg) in pattern_segments.iter().enumerate() {
        if *seg == "*" && i == pattern_segments.len() - 1 {
            return true;
        }
        match path_segments.get(pi) {
            Some(actual) => {
                if !seg.starts_with(':') && seg != actual {
                    return false;
                }
            }
            None => return false,
        }
        pi += 1;
    }

    pi == path_segments.len()
}
