//! Request-dispatch core for the beo-echo mocking and proxying service.
//!
//! Clients address a logical project by URL-prefix alias; per request the
//! core decides whether to synthesize a mock response, forward upstream, or
//! return a structured error envelope.

pub mod config;
pub mod delay;
pub mod dispatch;
pub mod forward;
pub mod request;
pub mod response;
pub mod rules;
pub mod selection;
pub mod server;
pub mod store;
