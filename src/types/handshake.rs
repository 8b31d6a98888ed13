//! Handshake: the effective policy for one session

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::{CitePolicy, Mode, OmissionScan, Stakes};

/// Resolved policy in effect for the current session. Serializes to the
/// handshake header forwarded to operators and downstream calls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Handshake {
    pub mode: Mode,
    pub stakes: Stakes,
    /// Always at or above the stakes floor
    pub min_confidence: f64,
    pub cite_policy: CitePolicy,
    pub omission_scan: OmissionScan,
    pub reflex_profile: String,
    /// Codex version this handshake was built against
    pub codex_version: String,
}

impl Handshake {
    /// Header as a JSON value
    pub fn header(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    /// Single-line form for logs and terminals
    pub fn to_parseable_string(&self) -> String {
        format!(
            "mode={} | stakes={} | min_confidence={:.2} | cite={} | omission={} | profile={} | codex={}",
            self.mode,
            self.stakes,
            self.min_confidence,
            self.cite_policy,
            self.omission_scan,
            self.reflex_profile,
            self.codex_version
        )
    }
}

/// Typed per-call overrides for building a handshake
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HandshakeOverrides {
    #[serde(default)]
    pub mode: Option<Mode>,
    #[serde(default)]
    pub stakes: Option<Stakes>,
    #[serde(default)]
    pub min_confidence: Option<f64>,
    #[serde(default)]
    pub cite_policy: Option<CitePolicy>,
    #[serde(default)]
    pub omission_scan: Option<OmissionScan>,
    #[serde(default)]
    pub reflex_profile: Option<String>,
}

/// Untyped partial update. Values are checked against their domains when
/// applied; anything out of domain keeps the previous value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HandshakePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stakes: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_confidence: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cite_policy: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub omission_scan: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reflex_profile: Option<Value>,
    /// Keys that belong to no handshake field
    #[serde(flatten, default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub unknown: serde_json::Map<String, Value>,
}

impl HandshakePatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(mut self, value: impl Into<Value>) -> Self {
        self.mode = Some(value.into());
        self
    }

    pub fn stakes(mut self, value: impl Into<Value>) -> Self {
        self.stakes = Some(value.into());
        self
    }

    pub fn min_confidence(mut self, value: impl Into<Value>) -> Self {
        self.min_confidence = Some(value.into());
        self
    }

    pub fn cite_policy(mut self, value: impl Into<Value>) -> Self {
        self.cite_policy = Some(value.into());
        self
    }

    pub fn omission_scan(mut self, value: impl Into<Value>) -> Self {
        self.omission_scan = Some(value.into());
        self
    }

    pub fn reflex_profile(mut self, value: impl Into<Value>) -> Self {
        self.reflex_profile = Some(value.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.mode.is_none()
            && self.stakes.is_none()
            && self.min_confidence.is_none()
            && self.cite_policy.is_none()
            && self.omission_scan.is_none()
            && self.reflex_profile.is_none()
            && self.unknown.is_empty()
    }
}

/// A patch value that was rejected and replaced by the previous value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IgnoredField {
    pub field: String,
    pub value: Value,
    pub reason: String,
}

impl std::fmt::Display for IgnoredField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: ignored {} ({})", self.field, self.value, self.reason)
    }
}

/// Outcome of validating a partial update. `normalized` is always complete
/// and valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandshakeNormalization {
    pub normalized: Handshake,
    pub ignored: Vec<IgnoredField>,
}

impl HandshakeNormalization {
    pub fn ok(&self) -> bool {
        self.ignored.is_empty()
    }

    pub fn errors(&self) -> Vec<String> {
        self.ignored.iter().map(|i| i.to_string()).collect()
    }

    pub fn ignored_fields(&self) -> Vec<&str> {
        self.ignored.iter().map(|i| i.field.as_str()).collect()
    }
}
