//! Codex runtime: configuration-driven policy engine for response pipelines
//!
//! A caller loads a codex document once, builds a handshake from it, and then
//! asks the runtime per request which confidence bar applies, whether
//! citation or omission work is mandatory, which reflexes fire or block, and
//! how a low-confidence outcome is phrased. Nothing here performs I/O except
//! the loader and the HTTP wrapper.

pub mod core;
pub mod error;
pub mod types;

pub use error::{CodexError, CodexResult};

use types::{Mode, Stakes};

// =============================================================================
// HANDSHAKE FALLBACKS - used when the codex declares no default
// =============================================================================

pub const FALLBACK_MODE: Mode = Mode::Careful;
pub const FALLBACK_STAKES: Stakes = Stakes::Medium;
pub const DEFAULT_REFLEX_PROFILE: &str = "default";

/// Stakes floor when the codex has no entry for the tier
pub fn fallback_stakes_floor(stakes: Stakes) -> f64 {
    match stakes {
        Stakes::Low => 0.45,
        Stakes::Medium => 0.60,
        Stakes::High => 0.75,
    }
}

/// Mode default confidence when the codex has no entry for the mode
pub fn fallback_mode_confidence(mode: Mode) -> f64 {
    match mode {
        Mode::Direct => 0.55,
        Mode::Careful => 0.70,
        Mode::Recap => 0.50,
    }
}

// =============================================================================
// DECISION THRESHOLDS
// =============================================================================

/// Under `auto`, medium/high stakes answers below this confidence must cite
pub const CITATION_CONFIDENCE_BAR: f64 = 0.85;

/// Failure thresholds when the codex leaves them unset
pub const DEFAULT_HEDGE_THRESHOLD: f64 = 0.4;
pub const DEFAULT_REFUSE_THRESHOLD: f64 = 0.2;

/// Context decay limits when the codex omits the section
pub const DEFAULT_DECAY_MAX_TURNS: u32 = 12;
pub const DEFAULT_DECAY_MAX_TOKENS: u64 = 6000;

// =============================================================================
// VERSION
// =============================================================================

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
