//! Codex document: the versioned configuration that defines every policy
//! default and threshold the runtime applies.
//!
//! Parsing is strictly typed (unknown modes, stakes tiers or cite policies are
//! rejected by serde). Sections whose absence is a *semantic* error
//! (`failure_semantics`, `telemetry`) are optional here and reported by the
//! schema validator instead.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

use crate::error::{CodexError, CodexResult};
use crate::types::{CitePolicy, Mode, OmissionScan, Stakes};

/// Built-in codex shipped with the crate
pub const BUILTIN_CODEX_JSON: &str = include_str!("../../assets/codex.json");

/// The full codex document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodexDocument {
    /// Semantic version of this document
    pub version: String,
    /// Required-fields schema, must mirror `version`
    pub schema: RequiredFields,
    /// Declared handshake defaults
    #[serde(default)]
    pub defaults: HandshakeDefaults,
    /// Per-mode policy
    #[serde(default)]
    pub modes: BTreeMap<Mode, ModePolicy>,
    /// Per-stakes policy
    #[serde(default)]
    pub stakes: BTreeMap<Stakes, StakesPolicy>,
    #[serde(default)]
    pub citation_hooks: CitationHooks,
    #[serde(default)]
    pub context_decay: ContextDecay,
    /// Named reflex orderings (`default`, `strict`, `lenient`)
    #[serde(default)]
    pub reflex_profiles: BTreeMap<String, ReflexProfile>,
    /// Per-reflex gating thresholds
    #[serde(default)]
    pub reflex_thresholds: BTreeMap<String, ReflexThreshold>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_semantics: Option<FailureSemantics>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub telemetry: Option<TelemetrySettings>,
}

/// Required-fields schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequiredFields {
    pub version: String,
    #[serde(default)]
    pub modes: Vec<String>,
    #[serde(default)]
    pub stakes: Vec<String>,
    #[serde(default)]
    pub cite_policies: Vec<String>,
    /// Numeric range for every confidence value, must be exactly [0, 1]
    pub confidence_range: [f64; 2],
}

/// Handshake defaults declared by the codex
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct HandshakeDefaults {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<Mode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stakes: Option<Stakes>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_confidence: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cite_policy: Option<CitePolicy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub omission_scan: Option<OmissionScan>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reflex_profile: Option<String>,
}

/// How often hedging qualifiers appear in a response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualifierFrequency {
    Minimal,
    Moderate,
    Frequent,
}

/// How eagerly topic drift is surfaced to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DriftAlerts {
    Lazy,
    Normal,
    Eager,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModePolicy {
    pub qualifiers: QualifierFrequency,
    /// Default confidence floor for this mode
    pub min_confidence: f64,
    pub drift_alerts: DriftAlerts,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StakesPolicy {
    #[serde(default)]
    pub cite_policy: CitePolicy,
    #[serde(default)]
    pub omission_scan: OmissionScan,
    /// Hard floor: no handshake at this tier goes below it
    pub min_confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct CitationHooks {
    /// Tiers where citation is always mandatory under `auto`
    #[serde(default)]
    pub always_cite_stakes: Vec<Stakes>,
    /// Whether a cited claim must carry an anchor/source
    #[serde(default)]
    pub require_anchor: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextDecay {
    pub max_turns: u32,
    pub max_tokens: u64,
    /// Mode to fall back to once context has expired
    pub fallback_mode: Mode,
}

impl Default for ContextDecay {
    fn default() -> Self {
        Self {
            max_turns: crate::DEFAULT_DECAY_MAX_TURNS,
            max_tokens: crate::DEFAULT_DECAY_MAX_TOKENS,
            fallback_mode: Mode::Recap,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ReflexProfile {
    /// Reflex ids in firing order
    #[serde(default)]
    pub order: Vec<String>,
    /// Advisory cooldowns, not enforced here
    #[serde(default)]
    pub cooldowns_ms: BTreeMap<String, u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReflexThreshold {
    pub trigger_at: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_if_over: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suppress_below_stakes: Option<Stakes>,
}

/// User-facing wording for one failure kind
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureText {
    pub text: String,
    pub action: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureSemantics {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hedge_threshold: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refuse_threshold: Option<f64>,
    pub refuse: FailureText,
    pub hedge: FailureText,
    pub ask_clarify: FailureText,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TelemetrySettings {
    pub enabled: bool,
    #[serde(default = "default_true")]
    pub emit_events: bool,
    /// Top-level payload keys replaced by the redaction marker
    #[serde(default)]
    pub redact_fields: Vec<String>,
}

fn default_true() -> bool {
    true
}

impl CodexDocument {
    /// Parse a codex from JSON text
    pub fn from_json_str(json: &str) -> CodexResult<Self> {
        serde_json::from_str(json).map_err(CodexError::Parse)
    }

    /// The codex embedded in the crate
    pub fn builtin() -> CodexResult<Self> {
        Self::from_json_str(BUILTIN_CODEX_JSON)
    }

    /// SHA-256 of the canonical JSON form, hex encoded
    pub fn fingerprint(&self) -> String {
        // BTreeMap keys keep serialization order stable
        let bytes = serde_json::to_vec(self).unwrap_or_default();
        let digest: [u8; 32] = Sha256::digest(&bytes).into();
        digest.iter().map(|b| format!("{:02x}", b)).collect()
    }

    pub fn mode_policy(&self, mode: Mode) -> Option<&ModePolicy> {
        self.modes.get(&mode)
    }

    pub fn stakes_policy(&self, stakes: Stakes) -> Option<&StakesPolicy> {
        self.stakes.get(&stakes)
    }

    /// Stakes floor, with the built-in fallback when the tier is missing
    pub fn stakes_floor(&self, stakes: Stakes) -> f64 {
        self.stakes_policy(stakes)
            .map(|p| p.min_confidence)
            .unwrap_or_else(|| crate::fallback_stakes_floor(stakes))
    }

    /// Mode default confidence, with the built-in fallback when the mode is missing
    pub fn mode_default_confidence(&self, mode: Mode) -> f64 {
        self.mode_policy(mode)
            .map(|p| p.min_confidence)
            .unwrap_or_else(|| crate::fallback_mode_confidence(mode))
    }

    /// Whether telemetry events are emitted at all
    pub fn telemetry_active(&self) -> bool {
        self.telemetry
            .as_ref()
            .map(|t| t.enabled && t.emit_events)
            .unwrap_or(false)
    }

    pub fn redact_fields(&self) -> &[String] {
        self.telemetry
            .as_ref()
            .map(|t| t.redact_fields.as_slice())
            .unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_parses() {
        let codex = CodexDocument::builtin().unwrap();
        assert_eq!(codex.version, codex.schema.version);
        assert_eq!(codex.modes.len(), 3);
        assert_eq!(codex.stakes.len(), 3);
        assert!(codex.reflex_profiles.contains_key("default"));
    }

    #[test]
    fn test_unknown_mode_key_is_parse_error() {
        let mut value: serde_json::Value = serde_json::from_str(BUILTIN_CODEX_JSON).unwrap();
        value["modes"]["verbose"] = value["modes"]["direct"].clone();
        let result = CodexDocument::from_json_str(&value.to_string());
        assert!(matches!(result, Err(CodexError::Parse(_))));
    }

    #[test]
    fn test_missing_optional_sections_parse() {
        let mut value: serde_json::Value = serde_json::from_str(BUILTIN_CODEX_JSON).unwrap();
        let obj = value.as_object_mut().unwrap();
        obj.remove("failure_semantics");
        obj.remove("telemetry");
        let codex = CodexDocument::from_json_str(&value.to_string()).unwrap();
        assert!(codex.failure_semantics.is_none());
        assert!(!codex.telemetry_active());
        assert!(codex.redact_fields().is_empty());
    }

    #[test]
    fn test_fingerprint_is_stable_and_sensitive() {
        let a = CodexDocument::builtin().unwrap();
        let mut b = a.clone();
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_eq!(a.fingerprint().len(), 64);

        b.context_decay.max_turns += 1;
        assert_ne!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn test_floor_falls_back_when_tier_missing() {
        let mut codex = CodexDocument::builtin().unwrap();
        codex.stakes.remove(&Stakes::High);
        assert_eq!(codex.stakes_floor(Stakes::High), crate::fallback_stakes_floor(Stakes::High));
    }
}
