//! Audit sink: the narrow append-only interface the core calls through
//! (spec §6 "Audit log interface"). A real deployment backs this with
//! SQLite (out of scope here, spec §1); the default here mirrors the
//! structured-event shape of `turbomcp-auth::audit::AuditLogger` but
//! without its provider/session-lifecycle event taxonomy, which this
//! gateway doesn't need.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tracing::{error, info};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize)]
pub struct BridgeAuditRecord {
    pub method: String,
    pub params: Option<Value>,
    /// `None` for notifications - the absence of a response is itself
    /// meaningful, not a gap (spec §9 Open Question, resolved).
    pub response: Option<Value>,
    pub error: Option<Value>,
    pub request_size: usize,
    pub response_size: usize,
    pub duration_ms: u64,
    pub created_at: DateTime<Utc>,
}

#[async_trait]
pub trait AuditSink: Send + Sync {
    /// Appends a bridge audit record. Failures are logged but must never
    /// fail the request the record describes (spec §6).
    async fn record(&self, record: BridgeAuditRecord);
}

/// Writes each record as a structured `tracing` event under the
/// `audit::bridge` target. The default sink for deployments that forward
/// logs to their own aggregation pipeline rather than a local database.
pub struct TracingAuditSink;

#[async_trait]
impl AuditSink for TracingAuditSink {
    async fn record(&self, record: BridgeAuditRecord) {
        info!(
            target: "audit::bridge",
            audit_id = %Uuid::new_v4(),
            method = %record.method,
            has_response = record.response.is_some(),
            is_error = record.error.is_some(),
            request_size = record.request_size,
            response_size = record.response_size,
            duration_ms = record.duration_ms,
            "bridge call audited"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn tracing_sink_never_panics_on_error_records() {
        let sink = TracingAuditSink;
        sink.record(BridgeAuditRecord {
            method: "tools/call".to_string(),
            params: None,
            response: None,
            error: Some(serde_json::json!({"code": -32603, "message": "boom"})),
            request_size: 10,
            response_size: 0,
            duration_ms: 5,
            created_at: Utc::now(),
        })
        .await;
    }

    #[tokio::test]
    async fn notification_records_carry_no_response() {
        let record = BridgeAuditRecord {
            method: "notifications/initialized".to_string(),
            params: None,
            response: None,
            error: None,
            request_size: 0,
            response_size: 0,
            duration_ms: 1,
            created_at: Utc::now(),
        };
        assert!(record.response.is_none());
        TracingAuditSink.record(record).await;
    }
}
