//! Data model and repository interface for the dispatch core.

mod memory;
mod repository;
mod types;

pub use memory::InMemoryRepository;
pub use repository::{MockRepository, RepositoryError};
pub use types::{
    AdvanceConfig, Endpoint, MockResponse, MockRule, Project, ProjectMode, ProxyTarget,
};
