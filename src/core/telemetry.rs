//! Telemetry Emitter
//!
//! Two entry points:
//! - [`TelemetryEmitter::emit`]: codex, sink and broadcast channel held by
//!   the emitter (one per runtime context)
//! - [`emit_explicit`]: uses only its arguments
//!
//! Both are gated by `telemetry.enabled && telemetry.emit_events` and redact
//! top-level payload keys listed in `telemetry.redact_fields`. Nested objects
//! are not scanned.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::broadcast;

use crate::types::{CodexDocument, TelemetryEvent, REDACTED_MARKER};

/// Receiver for emitted events
pub trait TelemetrySink: Send + Sync {
    fn publish(&self, event: &TelemetryEvent);
}

impl<F> TelemetrySink for F
where
    F: Fn(&TelemetryEvent) + Send + Sync,
{
    fn publish(&self, event: &TelemetryEvent) {
        self(event)
    }
}

/// Replace listed top-level keys with the redaction marker
pub fn redact_payload(mut payload: Value, redact_fields: &[String]) -> Value {
    if let Value::Object(map) = &mut payload {
        for field in redact_fields {
            if let Some(slot) = map.get_mut(field) {
                *slot = Value::String(REDACTED_MARKER.to_string());
            }
        }
    }
    payload
}

/// Build the redacted event, or `None` when telemetry is off
fn prepare(codex: &CodexDocument, name: &str, payload: Value) -> Option<TelemetryEvent> {
    if !codex.telemetry_active() {
        return None;
    }
    Some(TelemetryEvent::new(name, redact_payload(payload, codex.redact_fields())))
}

/// Emit with no held state: only `codex` and `publish` are consulted
pub fn emit_explicit(
    codex: &CodexDocument,
    name: &str,
    payload: Value,
    publish: &dyn Fn(&TelemetryEvent),
) -> Option<TelemetryEvent> {
    let event = prepare(codex, name, payload)?;
    publish(&event);
    Some(event)
}

/// Per-context emitter
#[derive(Clone)]
pub struct TelemetryEmitter {
    codex: Arc<CodexDocument>,
    sink: Option<Arc<dyn TelemetrySink>>,
    broadcast: Option<broadcast::Sender<TelemetryEvent>>,
}

impl std::fmt::Debug for TelemetryEmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelemetryEmitter")
            .field("codex_version", &self.codex.version)
            .field("sink", &self.sink.is_some())
            .field("broadcast", &self.broadcast.is_some())
            .finish()
    }
}

impl TelemetryEmitter {
    pub fn new(codex: Arc<CodexDocument>) -> Self {
        Self {
            codex,
            sink: None,
            broadcast: None,
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn TelemetrySink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn with_broadcast(mut self, tx: broadcast::Sender<TelemetryEvent>) -> Self {
        self.broadcast = Some(tx);
        self
    }

    /// Register or replace the sink
    pub fn set_sink(&mut self, sink: Arc<dyn TelemetrySink>) {
        self.sink = Some(sink);
    }

    pub fn clear_sink(&mut self) {
        self.sink = None;
    }

    /// Listen for events broadcast by this emitter
    pub fn subscribe(&self) -> Option<broadcast::Receiver<TelemetryEvent>> {
        self.broadcast.as_ref().map(|tx| tx.subscribe())
    }

    /// Emit an event: log sink always, registered sink and broadcast when set
    pub fn emit(&self, name: &str, payload: Value) -> Option<TelemetryEvent> {
        let event = prepare(&self.codex, name, payload)?;

        tracing::info!(
            target: "codex::telemetry",
            event = %event.name,
            data = %event.data,
            "telemetry"
        );

        if let Some(sink) = &self.sink {
            sink.publish(&event);
        }
        if let Some(tx) = &self.broadcast {
            // No receivers is fine
            let _ = tx.send(event.clone());
        }
        Some(event)
    }
}

// =============================================================================
// TESTS
// =============================================================================
