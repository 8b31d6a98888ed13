//! Reflex gating results

use serde::{Deserialize, Serialize};

/// Gate decision for one reflex score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ReflexDecision {
    pub trigger: bool,
    pub block: bool,
}

impl ReflexDecision {
    pub const QUIET: ReflexDecision = ReflexDecision { trigger: false, block: false };
}

/// One evaluated reflex in schedule order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReflexOutcome {
    pub reflex: String,
    pub score: f64,
    #[serde(flatten)]
    pub decision: ReflexDecision,
}

/// All reflexes evaluated for one response, in profile order
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ReflexReport {
    pub profile: String,
    pub outcomes: Vec<ReflexOutcome>,
}

impl ReflexReport {
    /// Ids that fired, in order
    pub fn triggered(&self) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter(|o| o.decision.trigger)
            .map(|o| o.reflex.as_str())
            .collect()
    }

    /// Whether any reflex blocks output
    pub fn blocked(&self) -> bool {
        self.outcomes.iter().any(|o| o.decision.block)
    }

    /// First blocking reflex in schedule order
    pub fn first_block(&self) -> Option<&ReflexOutcome> {
        self.outcomes.iter().find(|o| o.decision.block)
    }
}
