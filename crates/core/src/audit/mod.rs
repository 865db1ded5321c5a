//! Best-effort audit event sink.
//!
//! Audit recording is fire-and-forget: sink failures must never affect the
//! transaction outcome of the operation that emitted the event.

use std::sync::Arc;

/// Receiver for engine audit events.
pub trait AuditSink: Send + Sync {
    fn record(&self, event: &str, user_id: Option<&str>, meta: serde_json::Value);
}

/// Sink that discards all events.
pub struct NoOpAuditSink;

impl AuditSink for NoOpAuditSink {
    fn record(&self, _event: &str, _user_id: Option<&str>, _meta: serde_json::Value) {}
}

/// Sink that writes events through the `log` facade.
pub struct LogAuditSink;

impl AuditSink for LogAuditSink {
    fn record(&self, event: &str, user_id: Option<&str>, meta: serde_json::Value) {
        log::info!(
            "audit event={} user={} meta={}",
            event,
            user_id.unwrap_or("-"),
            meta
        );
    }
}

pub fn noop_sink() -> Arc<dyn AuditSink> {
    Arc::new(NoOpAuditSink)
}
