//! Failure outcomes and context decay state

use serde::{Deserialize, Serialize};

use crate::types::Mode;

/// Three-tier classification of a final confidence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureOutcome {
    Ok,
    Hedge,
    Refuse,
}

impl FailureOutcome {
    /// Failure kind carrying user-facing text, `None` for `Ok`
    pub fn kind(&self) -> Option<FailureKind> {
        match self {
            FailureOutcome::Ok => None,
            FailureOutcome::Hedge => Some(FailureKind::Hedge),
            FailureOutcome::Refuse => Some(FailureKind::Refuse),
        }
    }
}

impl std::fmt::Display for FailureOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            FailureOutcome::Ok => "OK",
            FailureOutcome::Hedge => "HEDGE",
            FailureOutcome::Refuse => "REFUSE",
        };
        write!(f, "{}", name)
    }
}

/// Kinds with user-facing wording. `AskClarify` is raised by the caller on
/// ambiguous input and is never produced by classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Refuse,
    Hedge,
    AskClarify,
}

/// Caller-owned counters since the last recap
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DecayCounters {
    #[serde(default)]
    pub turns_since_recap: u32,
    #[serde(default)]
    pub tokens_since_recap: u64,
}

impl DecayCounters {
    pub fn new(turns_since_recap: u32, tokens_since_recap: u64) -> Self {
        Self { turns_since_recap, tokens_since_recap }
    }

    /// Count one more turn of `tokens` tokens
    pub fn record_turn(&mut self, tokens: u64) {
        self.turns_since_recap = self.turns_since_recap.saturating_add(1);
        self.tokens_since_recap = self.tokens_since_recap.saturating_add(tokens);
    }

    /// Call after a recap has been produced
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecayStatus {
    pub expired: bool,
    /// Mode to switch to, set only when expired
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_mode: Option<Mode>,
}
