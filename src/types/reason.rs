//! Issue codes for codex validation and handshake coercion

use serde::{Deserialize, Serialize};

/// One validation finding. Rendered to a descriptive string for reports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "code")]
#[allow(non_camel_case_types)]
pub enum ValidationIssue {
    // =========================================================================
    // V001: Versions
    // =========================================================================
    /// Version string is not MAJOR.MINOR.PATCH
    V001_VERSION_MALFORMED { field: String, value: String },
    /// Schema version differs from document version
    V001_VERSION_MISMATCH { document: String, schema: String },

    // =========================================================================
    // V002: Schema enumerations
    // =========================================================================
    /// Enumeration is missing an expected member
    V002_ENUM_MEMBER_MISSING { enumeration: String, member: String },
    /// Confidence range is not exactly [0, 1]
    V002_RANGE_NOT_UNIT { min: f64, max: f64 },

    // =========================================================================
    // V003: Policy tables
    // =========================================================================
    /// Mode has no policy entry
    V003_MODE_POLICY_MISSING { mode: String },
    /// Stakes tier has no policy entry
    V003_STAKES_POLICY_MISSING { stakes: String },
    /// Confidence value outside [0, 1]
    V003_CONFIDENCE_OUT_OF_RANGE { field: String, value: f64 },
    /// Refuse threshold not strictly below hedge threshold, so hedge is unreachable
    V003_FAILURE_THRESHOLDS_INVERTED { refuse: f64, hedge: f64 },

    // =========================================================================
    // V004: Reflexes
    // =========================================================================
    /// No `default` reflex profile declared
    V004_DEFAULT_PROFILE_MISSING,
    /// `default` reflex profile has an empty ordering
    V004_DEFAULT_PROFILE_EMPTY,

    // =========================================================================
    // V005: Required sections
    // =========================================================================
    V005_FAILURE_SEMANTICS_MISSING,
    V005_TELEMETRY_MISSING,
}

impl ValidationIssue {
    /// Get the code string (for logging)
    pub fn code(&self) -> &'static str {
        match self {
            Self::V001_VERSION_MALFORMED { .. } => "V001_VERSION_MALFORMED",
            Self::V001_VERSION_MISMATCH { .. } => "V001_VERSION_MISMATCH",
            Self::V002_ENUM_MEMBER_MISSING { .. } => "V002_ENUM_MEMBER_MISSING",
            Self::V002_RANGE_NOT_UNIT { .. } => "V002_RANGE_NOT_UNIT",
            Self::V003_MODE_POLICY_MISSING { .. } => "V003_MODE_POLICY_MISSING",
            Self::V003_STAKES_POLICY_MISSING { .. } => "V003_STAKES_POLICY_MISSING",
            Self::V003_CONFIDENCE_OUT_OF_RANGE { .. } => "V003_CONFIDENCE_OUT_OF_RANGE",
            Self::V003_FAILURE_THRESHOLDS_INVERTED { .. } => "V003_FAILURE_THRESHOLDS_INVERTED",
            Self::V004_DEFAULT_PROFILE_MISSING => "V004_DEFAULT_PROFILE_MISSING",
            Self::V004_DEFAULT_PROFILE_EMPTY => "V004_DEFAULT_PROFILE_EMPTY",
            Self::V005_FAILURE_SEMANTICS_MISSING => "V005_FAILURE_SEMANTICS_MISSING",
            Self::V005_TELEMETRY_MISSING => "V005_TELEMETRY_MISSING",
        }
    }

    /// Get human-readable description
    pub fn description(&self) -> String {
        match self {
            Self::V001_VERSION_MALFORMED { field, value } => {
                format!("{} \"{}\" is not a semantic version", field, value)
            }
            Self::V001_VERSION_MISMATCH { document, schema } => {
                format!("schema.version {} does not match version {}", schema, document)
            }
            Self::V002_ENUM_MEMBER_MISSING { enumeration, member } => {
                format!("schema.{} is missing \"{}\"", enumeration, member)
            }
            Self::V002_RANGE_NOT_UNIT { min, max } => {
                format!("schema.confidence_range must be [0, 1], got [{}, {}]", min, max)
            }
            Self::V003_MODE_POLICY_MISSING { mode } => format!("modes.{} is missing", mode),
            Self::V003_STAKES_POLICY_MISSING { stakes } => format!("stakes.{} is missing", stakes),
            Self::V003_CONFIDENCE_OUT_OF_RANGE { field, value } => {
                format!("{} must be in [0, 1], got {}", field, value)
            }
            Self::V003_FAILURE_THRESHOLDS_INVERTED { refuse, hedge } => format!(
                "failure_semantics.refuse_threshold ({}) must be below hedge_threshold ({})",
                refuse, hedge
            ),
            Self::V004_DEFAULT_PROFILE_MISSING => "reflex_profiles.default is missing".to_string(),
            Self::V004_DEFAULT_PROFILE_EMPTY => "reflex_profiles.default.order is empty".to_string(),
            Self::V005_FAILURE_SEMANTICS_MISSING => "failure_semantics section is missing".to_string(),
            Self::V005_TELEMETRY_MISSING => "telemetry section is missing".to_string(),
        }
    }
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code(), self.description())
    }
}

/// Result of validating a codex
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub ok: bool,
    /// Rendered issues, one per line
    pub errors: Vec<String>,
    #[serde(skip)]
    pub issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    pub fn from_issues(issues: Vec<ValidationIssue>) -> Self {
        Self {
            ok: issues.is_empty(),
            errors: issues.iter().map(|i| i.to_string()).collect(),
            issues,
        }
    }

    pub fn has(&self, code: &str) -> bool {
        self.issues.iter().any(|i| i.code() == code)
    }
}
