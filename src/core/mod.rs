//! Core modules for the codex runtime

pub mod validator;
pub mod loader;
pub mod policy;
pub mod handshake;
pub mod reflex;
pub mod decay;
pub mod failure;
pub mod telemetry;
pub mod runtime;
pub mod api;

pub use validator::{validate, is_semver};
pub use loader::{load_codex, load_codex_checked, load_codex_strict};
pub use policy::{decide_citation, anchor_required, should_run_omission_scan, enforce_confidence};
pub use handshake::{build_handshake, validate_handshake};
pub use reflex::{reflex_order, should_trigger_reflex, schedule, cooldown};
pub use decay::{context_expired, decay_status};
pub use failure::{classify_failure, failure_text, failure_thresholds};
pub use telemetry::{TelemetryEmitter, TelemetrySink, emit_explicit, redact_payload};
pub use runtime::CodexRuntime;
pub use api::{create_router, run_server};
