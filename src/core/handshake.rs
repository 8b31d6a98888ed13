//! Handshake Builder
//!
//! Resolution per field: explicit override → codex default → built-in
//! fallback. `min_confidence` always passes through [`enforce_confidence`],
//! so a stakes floor is never undercut by a lower request.

use serde_json::Value;

use crate::core::policy::enforce_confidence;
use crate::types::{
    CitePolicy, CodexDocument, Handshake, HandshakeNormalization, HandshakeOverrides,
    HandshakePatch, IgnoredField, Mode, OmissionScan, Stakes,
};
use crate::{DEFAULT_REFLEX_PROFILE, FALLBACK_MODE, FALLBACK_STAKES};

/// Build a handshake from codex defaults and per-call overrides
pub fn build_handshake(codex: &CodexDocument, overrides: &HandshakeOverrides) -> Handshake {
    let defaults = &codex.defaults;

    let mode = overrides.mode.or(defaults.mode).unwrap_or(FALLBACK_MODE);
    let stakes = overrides.stakes.or(defaults.stakes).unwrap_or(FALLBACK_STAKES);

    // Out-of-range requests count as absent, same as a rejected patch value
    let requested = overrides
        .min_confidence
        .filter(in_unit_range)
        .or_else(|| defaults.min_confidence.filter(in_unit_range));
    let min_confidence = enforce_confidence(codex, stakes, requested, mode);

    let tier = codex.stakes_policy(stakes);
    let cite_policy = overrides
        .cite_policy
        .or_else(|| tier.map(|t| t.cite_policy))
        .unwrap_or(CitePolicy::Auto);
    let omission_scan = overrides
        .omission_scan
        .or_else(|| tier.map(|t| t.omission_scan))
        .unwrap_or(OmissionScan::Auto);

    let reflex_profile = overrides
        .reflex_profile
        .clone()
        .or_else(|| defaults.reflex_profile.clone())
        .unwrap_or_else(|| DEFAULT_REFLEX_PROFILE.to_string());

    Handshake {
        mode,
        stakes,
        min_confidence,
        cite_policy,
        omission_scan,
        reflex_profile,
        codex_version: codex.version.clone(),
    }
}

/// Apply a partial update on top of `current`.
///
/// Out-of-domain values keep the previous value and are listed in
/// `ignored`. The result is always a complete, valid handshake.
pub fn validate_handshake(
    codex: &CodexDocument,
    current: &Handshake,
    patch: &HandshakePatch,
) -> HandshakeNormalization {
    let mut ignored = Vec::new();
    let mut next = current.clone();

    if let Some(value) = &patch.mode {
        match value.as_str().and_then(Mode::parse) {
            Some(mode) => next.mode = mode,
            None => ignored.push(ignore("mode", value, "not one of direct, careful, recap")),
        }
    }

    if let Some(value) = &patch.stakes {
        match value.as_str().and_then(Stakes::parse) {
            Some(stakes) => next.stakes = stakes,
            None => ignored.push(ignore("stakes", value, "not one of low, medium, high")),
        }
    }

    if let Some(value) = &patch.cite_policy {
        match value.as_str().and_then(CitePolicy::parse) {
            Some(policy) => next.cite_policy = policy,
            None => ignored.push(ignore("cite_policy", value, "not one of auto, force, off")),
        }
    }

    if let Some(value) = &patch.omission_scan {
        match parse_omission_scan(value) {
            Some(scan) => next.omission_scan = scan,
            None => ignored.push(ignore("omission_scan", value, "must be true, false or \"auto\"")),
        }
    }

    if let Some(value) = &patch.reflex_profile {
        match value.as_str().filter(|p| codex.reflex_profiles.contains_key(*p)) {
            Some(profile) => next.reflex_profile = profile.to_string(),
            None => ignored.push(ignore("reflex_profile", value, "no such profile in codex")),
        }
    }

    let mut requested = Some(current.min_confidence);
    if let Some(value) = &patch.min_confidence {
        match value.as_f64().filter(in_unit_range) {
            Some(confidence) => requested = Some(confidence),
            None => ignored.push(ignore("min_confidence", value, "must be a number in [0, 1]")),
        }
    }
    // Re-enforce: a stakes change may raise the floor
    next.min_confidence = enforce_confidence(codex, next.stakes, requested, next.mode);

    for (key, value) in &patch.unknown {
        ignored.push(IgnoredField {
            field: key.clone(),
            value: value.clone(),
            reason: "not a handshake field".to_string(),
        });
    }

    next.codex_version = codex.version.clone();

    HandshakeNormalization { normalized: next, ignored }
}

fn in_unit_range(value: &f64) -> bool {
    (0.0..=1.0).contains(value)
}

fn parse_omission_scan(value: &Value) -> Option<OmissionScan> {
    match value {
        Value::Bool(b) => Some(OmissionScan::Explicit(*b)),
        Value::String(s) if s == "auto" => Some(OmissionScan::Auto),
        _ => None,
    }
}

fn ignore(field: &str, value: &Value, reason: &str) -> IgnoredField {
    IgnoredField {
        field: field.to_string(),
        value: value.clone(),
        reason: reason.to_string(),
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn codex() -> CodexDocument {
        CodexDocument::builtin().unwrap()
    }

    #[test]
    fn test_build_from_defaults() {
        let c = codex();
        let hs = build_handshake(&c, &HandshakeOverrides::default());
        assert_eq!(
            hs,
            Handshake {
                mode: Mode::Careful,
                stakes: Stakes::Medium,
                min_confidence: 0.70,
                cite_policy: CitePolicy::Auto,
                omission_scan: OmissionScan::Auto,
                reflex_profile: "default".to_string(),
                codex_version: "2.1.0".to_string(),
            }
        );
    }

    #[test]
    fn test_high_stakes_floor_beats_mode_default() {
        let c = codex();
        let overrides = HandshakeOverrides { stakes: Some(Stakes::High), ..Default::default() };
        let hs = build_handshake(&c, &overrides);
        assert_eq!(hs.min_confidence, 0.75);
        assert_eq!(hs.cite_policy, CitePolicy::Force);
        assert_eq!(hs.omission_scan, OmissionScan::Explicit(true));
    }

    #[test]
    fn test_low_requested_confidence_is_raised() {
        let c = codex();
        let overrides = HandshakeOverrides {
            stakes: Some(Stakes::Medium),
            min_confidence: Some(0.2),
            ..Default::default()
        };
        assert_eq!(build_handshake(&c, &overrides).min_confidence, 0.60);
    }

    #[test]
    fn test_out_of_range_requested_confidence_is_absent() {
        let c = codex();
        for bad in [1.5, -0.3, f64::NAN, f64::INFINITY] {
            let overrides = HandshakeOverrides {
                mode: Some(Mode::Direct),
                stakes: Some(Stakes::Low),
                min_confidence: Some(bad),
                ..Default::default()
            };
            // Falls back to the direct mode default
            assert_eq!(build_handshake(&c, &overrides).min_confidence, 0.55);
        }

        let mut c = codex();
        c.defaults.min_confidence = Some(2.0);
        let hs = build_handshake(&c, &HandshakeOverrides::default());
        assert!((0.0..=1.0).contains(&hs.min_confidence));
        assert_eq!(hs.min_confidence, 0.70);
    }

    #[test]
    fn test_explicit_overrides_win() {
        let c = codex();
        let overrides = HandshakeOverrides {
            mode: Some(Mode::Direct),
            stakes: Some(Stakes::High),
            min_confidence: Some(0.9),
            cite_policy: Some(CitePolicy::Off),
            omission_scan: Some(OmissionScan::Explicit(false)),
            reflex_profile: Some("strict".to_string()),
        };
        let hs = build_handshake(&c, &overrides);
        assert_eq!(hs.mode, Mode::Direct);
        assert_eq!(hs.min_confidence, 0.9);
        assert_eq!(hs.cite_policy, CitePolicy::Off);
        assert_eq!(hs.omission_scan, OmissionScan::Explicit(false));
        assert_eq!(hs.reflex_profile, "strict");
    }

    #[test]
    fn test_hardcoded_fallbacks_without_defaults() {
        let mut c = codex();
        c.defaults = Default::default();
        c.stakes.clear();
        let hs = build_handshake(&c, &HandshakeOverrides::default());
        assert_eq!(hs.mode, FALLBACK_MODE);
        assert_eq!(hs.stakes, FALLBACK_STAKES);
        assert_eq!(hs.cite_policy, CitePolicy::Auto);
        assert_eq!(hs.omission_scan, OmissionScan::Auto);
        assert_eq!(hs.reflex_profile, DEFAULT_REFLEX_PROFILE);
    }

    #[test]
    fn test_valid_patch_applies() {
        let c = codex();
        let current = build_handshake(&c, &HandshakeOverrides::default());
        let patch = HandshakePatch::new()
            .mode("direct")
            .cite_policy("force")
            .omission_scan(false)
            .reflex_profile("lenient");
        let result = validate_handshake(&c, &current, &patch);
        assert!(result.ok());
        assert_eq!(result.normalized.mode, Mode::Direct);
        assert_eq!(result.normalized.cite_policy, CitePolicy::Force);
        assert_eq!(result.normalized.omission_scan, OmissionScan::Explicit(false));
        assert_eq!(result.normalized.reflex_profile, "lenient");
    }

    #[test]
    fn test_invalid_values_keep_previous() {
        let c = codex();
        let current = build_handshake(&c, &HandshakeOverrides::default());
        let patch = HandshakePatch::new()
            .mode("verbose")
            .stakes(3)
            .cite_policy("always")
            .omission_scan("sometimes")
            .reflex_profile("paranoid")
            .min_confidence(1.7);
        let result = validate_handshake(&c, &current, &patch);

        assert!(!result.ok());
        assert_eq!(result.normalized, current);
        assert_eq!(
            result.ignored_fields(),
            vec!["mode", "stakes", "cite_policy", "omission_scan", "reflex_profile", "min_confidence"]
        );
        assert_eq!(result.errors().len(), 6);
    }

    #[test]
    fn test_partial_invalid_is_not_half_applied() {
        let c = codex();
        let current = build_handshake(&c, &HandshakeOverrides::default());
        let patch = HandshakePatch::new().stakes("high").mode("shouting");
        let result = validate_handshake(&c, &current, &patch);
        assert_eq!(result.normalized.stakes, Stakes::High);
        assert_eq!(result.normalized.mode, current.mode);
        assert_eq!(result.ignored_fields(), vec!["mode"]);
    }

    #[test]
    fn test_stakes_raise_reenforces_floor() {
        let c = codex();
        let current = build_handshake(
            &c,
            &HandshakeOverrides {
                mode: Some(Mode::Recap),
                stakes: Some(Stakes::Low),
                ..Default::default()
            },
        );
        assert_eq!(current.min_confidence, 0.50);

        let result = validate_handshake(&c, &current, &HandshakePatch::new().stakes("high"));
        assert_eq!(result.normalized.min_confidence, 0.75);
    }

    #[test]
    fn test_stakes_drop_keeps_previous_confidence() {
        let c = codex();
        let current = build_handshake(
            &c,
            &HandshakeOverrides { stakes: Some(Stakes::High), ..Default::default() },
        );
        assert_eq!(current.min_confidence, 0.75);

        // The previous value is the request; the lower floor does not pull it down
        let result = validate_handshake(&c, &current, &HandshakePatch::new().stakes("low"));
        assert_eq!(result.normalized.stakes, Stakes::Low);
        assert_eq!(result.normalized.min_confidence, 0.75);

        // An explicit request in the same patch lowers it
        let patch = HandshakePatch::new().stakes("low").min_confidence(0.5);
        let result = validate_handshake(&c, &current, &patch);
        assert_eq!(result.normalized.min_confidence, 0.5);
    }

    #[test]
    fn test_unknown_keys_reported() {
        let c = codex();
        let current = build_handshake(&c, &HandshakeOverrides::default());
        let patch: HandshakePatch = serde_json::from_value(json!({"temperature": 0.2})).unwrap();
        let result = validate_handshake(&c, &current, &patch);
        assert_eq!(result.normalized, current);
        assert_eq!(result.ignored_fields(), vec!["temperature"]);
    }
}
