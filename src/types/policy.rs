//! Enumerated policy domains: mode, stakes, cite policy, omission scan

use serde::{Deserialize, Serialize};

/// Response mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Short answers, minimal qualifiers
    Direct,
    /// Qualified answers, eager drift alerts
    Careful,
    /// Summarize accumulated context
    Recap,
}

impl Mode {
    pub const ALL: [Mode; 3] = [Mode::Direct, Mode::Careful, Mode::Recap];

    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Direct => "direct",
            Mode::Careful => "careful",
            Mode::Recap => "recap",
        }
    }

    /// Parse from the wire name, `None` outside the domain
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.as_str() == s)
    }
}

/// Three-tier severity. Ordering is `Low < Medium < High`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stakes {
    Low,
    Medium,
    High,
}

impl Stakes {
    pub const ALL: [Stakes; 3] = [Stakes::Low, Stakes::Medium, Stakes::High];

    pub fn as_str(&self) -> &'static str {
        match self {
            Stakes::Low => "low",
            Stakes::Medium => "medium",
            Stakes::High => "high",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == s)
    }
}

/// Whether a response must carry citations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CitePolicy {
    #[default]
    Auto,
    Force,
    Off,
}

impl CitePolicy {
    pub const ALL: [CitePolicy; 3] = [CitePolicy::Auto, CitePolicy::Force, CitePolicy::Off];

    pub fn as_str(&self) -> &'static str {
        match self {
            CitePolicy::Auto => "auto",
            CitePolicy::Force => "force",
            CitePolicy::Off => "off",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.as_str() == s)
    }
}

/// Omission scan setting: an explicit flag or `"auto"`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(try_from = "OmissionScanRepr", into = "OmissionScanRepr")]
pub enum OmissionScan {
    Explicit(bool),
    #[default]
    Auto,
}

/// Wire form of [`OmissionScan`]: `true`, `false` or `"auto"`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OmissionScanRepr {
    Flag(bool),
    Keyword(String),
}

impl TryFrom<OmissionScanRepr> for OmissionScan {
    type Error = String;

    fn try_from(repr: OmissionScanRepr) -> Result<Self, Self::Error> {
        match repr {
            OmissionScanRepr::Flag(b) => Ok(OmissionScan::Explicit(b)),
            OmissionScanRepr::Keyword(k) if k == "auto" => Ok(OmissionScan::Auto),
            OmissionScanRepr::Keyword(k) => {
                Err(format!("omission_scan must be true, false or \"auto\", got \"{}\"", k))
            }
        }
    }
}

impl From<OmissionScan> for OmissionScanRepr {
    fn from(scan: OmissionScan) -> Self {
        match scan {
            OmissionScan::Explicit(b) => OmissionScanRepr::Flag(b),
            OmissionScan::Auto => OmissionScanRepr::Keyword("auto".to_string()),
        }
    }
}

macro_rules! impl_display_as_str {
    ($($ty:ty),*) => {
        $(impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.as_str())
            }
        })*
    };
}

impl_display_as_str!(Mode, Stakes, CitePolicy);

impl std::fmt::Display for OmissionScan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OmissionScan::Explicit(b) => write!(f, "{}", b),
            OmissionScan::Auto => write!(f, "auto"),
        }
    }
}
