//! Runtime context: one per session
//!
//! Holds the shared immutable codex, the current handshake and the
//! session's telemetry emitter. Every decision routes through the free
//! functions in the sibling modules with the current handshake filled in.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::{json, Value};

use crate::core::{
    build_handshake, classify_failure, decay_status, decide_citation, failure_text,
    reflex_order, schedule, should_run_omission_scan, validate_handshake,
    TelemetryEmitter, TelemetrySink,
};
use crate::types::{
    CodexDocument, DecayCounters, DecayStatus, FailureKind, FailureOutcome, FailureText,
    Handshake, HandshakeNormalization, HandshakeOverrides, HandshakePatch, ReflexReport,
    TelemetryEvent,
};

/// Per-session policy context
#[derive(Debug, Clone)]
pub struct CodexRuntime {
    codex: Arc<CodexDocument>,
    handshake: Handshake,
    telemetry: TelemetryEmitter,
    update_count: u64,
}

impl CodexRuntime {
    /// Context with a handshake built from codex defaults
    pub fn new(codex: Arc<CodexDocument>) -> Self {
        Self::with_overrides(codex, &HandshakeOverrides::default())
    }

    pub fn with_overrides(codex: Arc<CodexDocument>, overrides: &HandshakeOverrides) -> Self {
        let handshake = build_handshake(&codex, overrides);
        tracing::debug!(handshake = %handshake.to_parseable_string(), "runtime created");
        Self {
            telemetry: TelemetryEmitter::new(Arc::clone(&codex)),
            codex,
            handshake,
            update_count: 0,
        }
    }

    /// Replace the emitter (e.g. to attach a broadcast channel)
    pub fn with_telemetry(mut self, telemetry: TelemetryEmitter) -> Self {
        self.telemetry = telemetry;
        self
    }

    pub fn register_sink(&mut self, sink: Arc<dyn TelemetrySink>) {
        self.telemetry.set_sink(sink);
    }

    pub fn codex(&self) -> &CodexDocument {
        &self.codex
    }

    pub fn handshake(&self) -> &Handshake {
        &self.handshake
    }

    pub fn telemetry(&self) -> &TelemetryEmitter {
        &self.telemetry
    }

    /// Number of committed handshake updates
    pub fn update_count(&self) -> u64 {
        self.update_count
    }

    /// Validate `patch` without committing it
    pub fn preview_handshake(&self, patch: &HandshakePatch) -> HandshakeNormalization {
        validate_handshake(&self.codex, &self.handshake, patch)
    }

    /// Validate and commit `patch`, then emit `handshake.update`
    pub fn set_handshake(&mut self, patch: &HandshakePatch) -> HandshakeNormalization {
        let result = self.preview_handshake(patch);
        if !result.ok() {
            tracing::warn!(ignored = ?result.ignored_fields(), "handshake update coerced");
        }

        self.handshake = result.normalized.clone();
        self.update_count += 1;

        self.telemetry.emit(
            "handshake.update",
            json!({
                "handshake": self.handshake.header(),
                "ignored": result.ignored_fields(),
            }),
        );
        result
    }

    /// Citation requirement under the current handshake
    pub fn decide_citation(&self, confidence: f64, external_claim: bool) -> bool {
        decide_citation(
            &self.codex,
            self.handshake.stakes,
            confidence,
            external_claim,
            self.handshake.cite_policy,
        )
    }

    pub fn should_run_omission_scan(&self) -> bool {
        should_run_omission_scan(&self.codex, self.handshake.stakes, self.handshake.omission_scan)
    }

    /// Does `confidence` clear the handshake's floor?
    pub fn meets_confidence(&self, confidence: f64) -> bool {
        confidence >= self.handshake.min_confidence
    }

    pub fn reflex_order(&self) -> Vec<String> {
        reflex_order(&self.codex, &self.handshake.reflex_profile)
    }

    pub fn schedule_reflexes(&self, scores: &HashMap<String, f64>) -> ReflexReport {
        schedule(&self.codex, &self.handshake.reflex_profile, scores, self.handshake.stakes)
    }

    pub fn decay_status(&self, counters: &DecayCounters) -> DecayStatus {
        decay_status(&self.codex, counters)
    }

    pub fn classify(&self, confidence: f64) -> FailureOutcome {
        classify_failure(&self.codex, confidence)
    }

    pub fn failure_text(&self, kind: FailureKind) -> FailureText {
        failure_text(&self.codex, kind)
    }

    pub fn emit(&self, name: &str, payload: Value) -> Option<TelemetryEvent> {
        self.telemetry.emit(name, payload)
    }
}
