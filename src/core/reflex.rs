//! Reflex Scheduler: orders safety checks by profile and gates external
//! scores against codex thresholds.
//!
//! Cooldowns declared on profiles are advisory; no timing happens here.

use std::collections::HashMap;
use std::time::Duration;

use crate::types::{CodexDocument, ReflexDecision, ReflexOutcome, ReflexProfile, ReflexReport, Stakes};
use crate::DEFAULT_REFLEX_PROFILE;

/// Profile by name, falling back to `default` for unknown names
fn resolve_profile<'a>(codex: &'a CodexDocument, profile: &str) -> Option<&'a ReflexProfile> {
    codex
        .reflex_profiles
        .get(profile)
        .or_else(|| {
            tracing::debug!(profile, "unknown reflex profile, using default");
            codex.reflex_profiles.get(DEFAULT_REFLEX_PROFILE)
        })
}

/// Declared order of `profile`, keeping only reflexes that have thresholds
pub fn reflex_order(codex: &CodexDocument, profile: &str) -> Vec<String> {
    resolve_profile(codex, profile)
        .map(|p| {
            p.order
                .iter()
                .filter(|id| codex.reflex_thresholds.contains_key(id.as_str()))
                .cloned()
                .collect()
        })
        .unwrap_or_default()
}

/// Gate one score
pub fn should_trigger_reflex(
    codex: &CodexDocument,
    reflex: &str,
    score: f64,
    stakes: Stakes,
) -> ReflexDecision {
    let Some(threshold) = codex.reflex_thresholds.get(reflex) else {
        return ReflexDecision::QUIET;
    };

    if let Some(min_stakes) = threshold.suppress_below_stakes {
        if stakes < min_stakes {
            return ReflexDecision::QUIET;
        }
    }

    ReflexDecision {
        trigger: score >= threshold.trigger_at,
        block: threshold.block_if_over.is_some_and(|b| score >= b),
    }
}

/// Walk `profile` in order, gating every reflex that has a supplied score
pub fn schedule(
    codex: &CodexDocument,
    profile: &str,
    scores: &HashMap<String, f64>,
    stakes: Stakes,
) -> ReflexReport {
    let outcomes: Vec<ReflexOutcome> = reflex_order(codex, profile)
        .into_iter()
        .filter_map(|reflex| {
            let score = *scores.get(&reflex)?;
            let decision = should_trigger_reflex(codex, &reflex, score, stakes);
            Some(ReflexOutcome { reflex, score, decision })
        })
        .collect();

    let report = ReflexReport { profile: profile.to_string(), outcomes };
    if let Some(block) = report.first_block() {
        tracing::info!(
            profile,
            reflex = %block.reflex,
            score = block.score,
            stakes = %stakes,
            "reflex blocks output"
        );
    }
    report
}

/// Advisory cooldown for `reflex` under `profile`
pub fn cooldown(codex: &CodexDocument, profile: &str, reflex: &str) -> Option<Duration> {
    resolve_profile(codex, profile)?
        .cooldowns_ms
        .get(reflex)
        .map(|ms| Duration::from_millis(*ms))
}

// =============================================================================
// TESTS
// =============================================================================
