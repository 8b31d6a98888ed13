//! Core types for the codex runtime

mod policy;
mod codex;
mod reason;
mod handshake;
mod reflex;
mod outcome;
mod telemetry;

pub use policy::{Mode, Stakes, CitePolicy, OmissionScan, OmissionScanRepr};
pub use codex::{
    CodexDocument, RequiredFields, HandshakeDefaults, ModePolicy, StakesPolicy,
    QualifierFrequency, DriftAlerts, CitationHooks, ContextDecay, ReflexProfile,
    ReflexThreshold, FailureSemantics, FailureText, TelemetrySettings, BUILTIN_CODEX_JSON,
};
pub use reason::{ValidationIssue, ValidationReport};
pub use handshake::{Handshake, HandshakeOverrides, HandshakePatch, IgnoredField, HandshakeNormalization};
pub use reflex::{ReflexDecision, ReflexOutcome, ReflexReport};
pub use outcome::{FailureOutcome, FailureKind, DecayCounters, DecayStatus};
pub use telemetry::{TelemetryEvent, REDACTED_MARKER};
