//! Failure Classifier: confidence → ok / hedge / refuse, plus wording
//!
//! Boundaries resolve to the more cautious outcome.

use crate::types::{CodexDocument, FailureKind, FailureOutcome, FailureText};
use crate::{DEFAULT_HEDGE_THRESHOLD, DEFAULT_REFUSE_THRESHOLD};

/// (refuse, hedge) thresholds with defaults applied
pub fn failure_thresholds(codex: &CodexDocument) -> (f64, f64) {
    let semantics = codex.failure_semantics.as_ref();
    let refuse = semantics
        .and_then(|s| s.refuse_threshold)
        .unwrap_or(DEFAULT_REFUSE_THRESHOLD);
    let hedge = semantics
        .and_then(|s| s.hedge_threshold)
        .unwrap_or(DEFAULT_HEDGE_THRESHOLD);
    (refuse, hedge)
}

/// Classify a final confidence. Non-finite values refuse.
pub fn classify_failure(codex: &CodexDocument, confidence: f64) -> FailureOutcome {
    let (refuse, hedge) = failure_thresholds(codex);
    if !confidence.is_finite() || confidence <= refuse {
        FailureOutcome::Refuse
    } else if confidence <= hedge {
        FailureOutcome::Hedge
    } else {
        FailureOutcome::Ok
    }
}

/// User-facing text and action for a failure kind
pub fn failure_text(codex: &CodexDocument, kind: FailureKind) -> FailureText {
    match &codex.failure_semantics {
        Some(s) => match kind {
            FailureKind::Refuse => s.refuse.clone(),
            FailureKind::Hedge => s.hedge.clone(),
            FailureKind::AskClarify => s.ask_clarify.clone(),
        },
        None => builtin_text(kind),
    }
}

fn builtin_text(kind: FailureKind) -> FailureText {
    let (text, action) = match kind {
        FailureKind::Refuse => ("I can't answer that reliably.", "decline"),
        FailureKind::Hedge => ("I'm not certain about this.", "answer_with_qualifiers"),
        FailureKind::AskClarify => ("Could you clarify what you mean?", "request_clarification"),
    };
    FailureText {
        text: text.to_string(),
        action: action.to_string(),
    }
}

// =============================================================================
// TESTS
// =============================================================================
