//! Context Decay Tracker: threshold check on caller-owned counters

use crate::types::{CodexDocument, DecayCounters, DecayStatus};

/// True once either counter reaches its configured limit
pub fn context_expired(codex: &CodexDocument, counters: &DecayCounters) -> bool {
    let limits = &codex.context_decay;
    counters.turns_since_recap >= limits.max_turns
        || counters.tokens_since_recap >= limits.max_tokens
}

/// Expiry plus the mode to fall back to
pub fn decay_status(codex: &CodexDocument, counters: &DecayCounters) -> DecayStatus {
    let expired = context_expired(codex, counters);
    DecayStatus {
        expired,
        fallback_mode: expired.then_some(codex.context_decay.fallback_mode),
    }
}
