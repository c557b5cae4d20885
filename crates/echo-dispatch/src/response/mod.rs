//! Response synthesis from stored mocks.

mod builder;

pub use builder::build_mock_response;
