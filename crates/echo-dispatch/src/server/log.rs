//! Structured access record handed to the logging collaborator.

use serde::Serialize;

use crate::store::ProjectMode;

/// One record per dispatched request. Persistence and streaming are owned by
/// the external logging surface; the core only emits the record.
#[derive(Debug, Clone, Serialize)]
pub struct LogRecord {
    pub timestamp: String,
    pub client_addr: String,
    pub method: String,
    pub path: String,
    pub alias: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    /// Which branch served the request; absent when the alias did not resolve.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution_mode: Option<ProjectMode>,
    /// True iff a concrete mock endpoint supplied the response.
    pub matched: bool,
    pub status: u16,
    pub latency_ms: u64,
}

impl LogRecord {
    /// Emit the record on the access-log target.
    pub fn emit(&self) {
        let payload = serde_json::to_string(self).unwrap_or_default();
        tracing::info!(target: "echo::access", record = %payload);
    }
}
