//! Process-wide round-robin state, keyed by endpoint id.

use parking_lot::Mutex;
use std::collections::HashMap;

/// Per-endpoint rotation counters.
///
/// A single lock protects the whole map, so the read-and-increment pair is
/// atomic with respect to other selectors on the same endpoint: N successive
/// selections over a stable list of length N visit each index exactly once.
/// Counters live for the process lifetime only; a restart resets rotation.
#[derive(Default)]
pub struct RoundRobinRegistry {
    counters: Mutex<HashMap<String, usize>>,
}

impl RoundRobinRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the next index for this endpoint and advance the counter.
    pub fn next_index(&self, endpoint_id: &str, response_count: usize) -> usize {
        if response_count == 0 {
            return 0;
        }

        let mut counters = self.counters.lock();
        let counter = counters.entry(endpoint_id.to_string()).or_insert(0);
        let index = *counter % response_count;
        *counter = counter.wrapping_add(1);
        index
    }

    /// Reset rotation for one endpoint.
    pub fn reset(&self, endpoint_id: &str) {
        self.counters.lock().remove(endpoint_id);
    }

    /// Reset all rotation state. Tests that need deterministic rotation
    /// call this between cases.
    pub fn reset_all(&self) {
        self.counters.lock().clear();
    }
}
