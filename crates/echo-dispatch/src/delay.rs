//! Tiered delay composition.
//!
//! The effective delay is the first positive value in
//! response → endpoint → project order; a zero or unparseable tier is
//! skipped, and once a tier is chosen the search stops.

use std::time::Duration;
use tracing::debug;

use crate::store::{AdvanceConfig, Endpoint, MockResponse, Project};

/// Resolve the effective delay for this request, in milliseconds.
pub fn effective_delay_ms(
    project: Option<&Project>,
    endpoint: Option<&Endpoint>,
    response: Option<&MockResponse>,
) -> u64 {
    if let Some(response) = response {
        if response.delay_ms > 0 {
            return response.delay_ms;
        }
    }

    if let Some(endpoint) = endpoint {
        if let Some(config) = AdvanceConfig::parse(endpoint.advance_config.as_deref()) {
            if config.delay_ms > 0 {
                return config.delay_ms;
            }
        }
    }

    if let Some(project) = project {
        if let Some(config) = AdvanceConfig::parse(project.advance_config.as_deref()) {
            if config.delay_ms > 0 {
                return config.delay_ms;
            }
        }
    }

    0
}

/// Sleep the caller for the effective delay, if any. Cancelling the caller's
/// future interrupts the sleep.
pub async fn apply_delay(
    project: Option<&Project>,
    endpoint: Option<&Endpoint>,
    response: Option<&MockResponse>,
) {
    let delay_ms = effective_delay_ms(project, endpoint, response);
    if delay_ms > 0 {
        debug!(delay_ms, "applying configured delay");
        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    }
}
