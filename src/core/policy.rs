//! Policy decision functions: citation, omission scan, confidence floor
//!
//! All total and side-effect free.

use crate::types::{CitePolicy, CodexDocument, Mode, OmissionScan, Stakes};
use crate::CITATION_CONFIDENCE_BAR;

/// Must this response carry citations?
///
/// - `force`: always
/// - `off`: only suppresses citation at low stakes
/// - `auto`: on external claims, hooked tiers, or medium/high stakes below
///   the citation confidence bar
pub fn decide_citation(
    codex: &CodexDocument,
    stakes: Stakes,
    confidence: f64,
    external_claim: bool,
    cite_policy: CitePolicy,
) -> bool {
    match cite_policy {
        CitePolicy::Force => true,
        CitePolicy::Off => stakes != Stakes::Low,
        CitePolicy::Auto => {
            external_claim
                || codex.citation_hooks.always_cite_stakes.contains(&stakes)
                // NaN counts as below the bar
                || (stakes >= Stakes::Medium && !(confidence >= CITATION_CONFIDENCE_BAR))
        }
    }
}

/// Whether cited claims must carry an anchor/source
pub fn anchor_required(codex: &CodexDocument) -> bool {
    codex.citation_hooks.require_anchor
}

/// Is the omission scan mandatory?
pub fn should_run_omission_scan(
    _codex: &CodexDocument,
    stakes: Stakes,
    omission_scan: OmissionScan,
) -> bool {
    match omission_scan {
        OmissionScan::Explicit(run) => run,
        // Low resolves on as well, matching the deployed policy table.
        OmissionScan::Auto => match stakes {
            Stakes::Low => true,
            Stakes::Medium | Stakes::High => true,
        },
    }
}

/// Effective confidence floor: `max(stakes floor, requested ?? mode default)`.
/// Non-finite requests count as absent.
pub fn enforce_confidence(
    codex: &CodexDocument,
    stakes: Stakes,
    requested: Option<f64>,
    mode: Mode,
) -> f64 {
    let floor = codex.stakes_floor(stakes);
    let wanted = requested
        .filter(|r| r.is_finite())
        .unwrap_or_else(|| codex.mode_default_confidence(mode));
    floor.max(wanted)
}

// =============================================================================
// TESTS
// =============================================================================
