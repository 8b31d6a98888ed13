//! Schema Validator: structural and semantic invariants of a codex
//!
//! Never fails. The caller decides whether a non-ok report aborts startup or
//! proceeds on best-effort defaults.

use lazy_static::lazy_static;
use regex::Regex;

use crate::core::failure::failure_thresholds;
use crate::types::{
    CitePolicy, CodexDocument, Mode, Stakes, ValidationIssue, ValidationReport,
};
use crate::DEFAULT_REFLEX_PROFILE;

lazy_static! {
    static ref RE_SEMVER: Regex = Regex::new(
        r"^(0|[1-9]\d*)\.(0|[1-9]\d*)\.(0|[1-9]\d*)(-[0-9A-Za-z][0-9A-Za-z.-]*)?$"
    ).unwrap();
}

/// Is `s` a MAJOR.MINOR.PATCH version, optionally with a prerelease tag?
pub fn is_semver(s: &str) -> bool {
    RE_SEMVER.is_match(s)
}

/// Validate a codex document
pub fn validate(codex: &CodexDocument) -> ValidationReport {
    let mut issues = Vec::new();

    check_versions(codex, &mut issues);
    check_enumerations(codex, &mut issues);
    check_policy_tables(codex, &mut issues);
    check_reflexes(codex, &mut issues);

    if codex.failure_semantics.is_none() {
        issues.push(ValidationIssue::V005_FAILURE_SEMANTICS_MISSING);
    }
    if codex.telemetry.is_none() {
        issues.push(ValidationIssue::V005_TELEMETRY_MISSING);
    }

    let report = ValidationReport::from_issues(issues);
    if report.ok {
        tracing::debug!(version = %codex.version, "codex validated");
    } else {
        tracing::warn!(
            version = %codex.version,
            issues = report.errors.len(),
            "codex failed validation"
        );
    }
    report
}

fn check_versions(codex: &CodexDocument, issues: &mut Vec<ValidationIssue>) {
    if !is_semver(&codex.version) {
        issues.push(ValidationIssue::V001_VERSION_MALFORMED {
            field: "version".to_string(),
            value: codex.version.clone(),
        });
    }
    if !is_semver(&codex.schema.version) {
        issues.push(ValidationIssue::V001_VERSION_MALFORMED {
            field: "schema.version".to_string(),
            value: codex.schema.version.clone(),
        });
    }
    if codex.schema.version != codex.version {
        issues.push(ValidationIssue::V001_VERSION_MISMATCH {
            document: codex.version.clone(),
            schema: codex.schema.version.clone(),
        });
    }
}

fn check_enumerations(codex: &CodexDocument, issues: &mut Vec<ValidationIssue>) {
    let schema = &codex.schema;
    let expected: [(&str, &[String], Vec<&str>); 3] = [
        ("modes", schema.modes.as_slice(), Mode::ALL.iter().map(|m| m.as_str()).collect()),
        ("stakes", schema.stakes.as_slice(), Stakes::ALL.iter().map(|s| s.as_str()).collect()),
        (
            "cite_policies",
            schema.cite_policies.as_slice(),
            CitePolicy::ALL.iter().map(|p| p.as_str()).collect(),
        ),
    ];

    for (enumeration, declared, members) in expected {
        for member in members {
            if !declared.iter().any(|d| d == member) {
                issues.push(ValidationIssue::V002_ENUM_MEMBER_MISSING {
                    enumeration: enumeration.to_string(),
                    member: member.to_string(),
                });
            }
        }
    }

    let [min, max] = schema.confidence_range;
    if min != 0.0 || max != 1.0 {
        issues.push(ValidationIssue::V002_RANGE_NOT_UNIT { min, max });
    }
}

fn check_policy_tables(codex: &CodexDocument, issues: &mut Vec<ValidationIssue>) {
    for mode in Mode::ALL {
        match codex.mode_policy(mode) {
            Some(policy) => check_unit(
                format!("modes.{}.min_confidence", mode),
                policy.min_confidence,
                issues,
            ),
            None => issues.push(ValidationIssue::V003_MODE_POLICY_MISSING {
                mode: mode.to_string(),
            }),
        }
    }

    for stakes in Stakes::ALL {
        match codex.stakes_policy(stakes) {
            Some(policy) => check_unit(
                format!("stakes.{}.min_confidence", stakes),
                policy.min_confidence,
                issues,
            ),
            None => issues.push(ValidationIssue::V003_STAKES_POLICY_MISSING {
                stakes: stakes.to_string(),
            }),
        }
    }

    if let Some(value) = codex.defaults.min_confidence {
        check_unit("defaults.min_confidence".to_string(), value, issues);
    }

    if let Some(failure) = &codex.failure_semantics {
        if let Some(value) = failure.hedge_threshold {
            check_unit("failure_semantics.hedge_threshold".to_string(), value, issues);
        }
        if let Some(value) = failure.refuse_threshold {
            check_unit("failure_semantics.refuse_threshold".to_string(), value, issues);
        }
    }

    // Thresholds with defaults applied, so a single unset one is still compared
    let (refuse, hedge) = failure_thresholds(codex);
    if refuse >= hedge {
        issues.push(ValidationIssue::V003_FAILURE_THRESHOLDS_INVERTED { refuse, hedge });
    }
}

fn check_reflexes(codex: &CodexDocument, issues: &mut Vec<ValidationIssue>) {
    match codex.reflex_profiles.get(DEFAULT_REFLEX_PROFILE) {
        None => issues.push(ValidationIssue::V004_DEFAULT_PROFILE_MISSING),
        Some(profile) if profile.order.is_empty() => {
            issues.push(ValidationIssue::V004_DEFAULT_PROFILE_EMPTY)
        }
        Some(_) => {}
    }

    for (id, threshold) in &codex.reflex_thresholds {
        check_unit(format!("reflex_thresholds.{}.trigger_at", id), threshold.trigger_at, issues);
        if let Some(block) = threshold.block_if_over {
            check_unit(format!("reflex_thresholds.{}.block_if_over", id), block, issues);
        }
    }
}

fn check_unit(field: String, value: f64, issues: &mut Vec<ValidationIssue>) {
    if !(0.0..=1.0).contains(&value) {
        issues.push(ValidationIssue::V003_CONFIDENCE_OUT_OF_RANGE { field, value });
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn codex() -> CodexDocument {
        CodexDocument::builtin().unwrap()
    }

    #[test]
    fn test_builtin_is_valid() {
        let report = validate(&codex());
        assert!(report.ok, "unexpected issues: {:?}", report.errors);
        assert!(report.errors.is_empty());
    }

    #[test]
    fn test_semver_forms() {
        assert!(is_semver("1.0.0"));
        assert!(is_semver("2.10.3-rc.1"));
        assert!(!is_semver("1.0"));
        assert!(!is_semver("v1.0.0"));
        assert!(!is_semver("01.0.0"));
        assert!(!is_semver(""));
    }

    #[test]
    fn test_version_mismatch_reported() {
        let mut c = codex();
        c.schema.version = "2.0.0".to_string();
        let report = validate(&c);
        assert!(!report.ok);
        assert!(report.has("V001_VERSION_MISMATCH"));
    }

    #[test]
    fn test_malformed_version_reported() {
        let mut c = codex();
        c.version = "latest".to_string();
        c.schema.version = "latest".to_string();
        let report = validate(&c);
        assert!(report.has("V001_VERSION_MALFORMED"));
        assert!(!report.has("V001_VERSION_MISMATCH"));
        assert_eq!(report.errors.len(), 2);
    }

    #[test]
    fn test_missing_enum_member_reported() {
        let mut c = codex();
        c.schema.modes.retain(|m| m != "recap");
        let report = validate(&c);
        assert!(report.has("V002_ENUM_MEMBER_MISSING"));
        assert!(report.errors[0].contains("recap"));
    }

    #[test]
    fn test_range_must_be_exactly_unit() {
        let mut c = codex();
        c.schema.confidence_range = [0.0, 100.0];
        assert!(validate(&c).has("V002_RANGE_NOT_UNIT"));
    }

    #[test]
    fn test_missing_policy_entries_reported() {
        let mut c = codex();
        c.modes.remove(&Mode::Direct);
        c.stakes.remove(&Stakes::Low);
        let report = validate(&c);
        assert!(report.has("V003_MODE_POLICY_MISSING"));
        assert!(report.has("V003_STAKES_POLICY_MISSING"));
    }

    #[test]
    fn test_out_of_range_floor_reported() {
        let mut c = codex();
        c.stakes.get_mut(&Stakes::High).unwrap().min_confidence = 1.5;
        let report = validate(&c);
        assert!(report.has("V003_CONFIDENCE_OUT_OF_RANGE"));
        assert!(report.errors[0].contains("stakes.high.min_confidence"));
    }

    #[test]
    fn test_inverted_failure_thresholds_reported() {
        let mut c = codex();
        let semantics = c.failure_semantics.as_mut().unwrap();
        semantics.hedge_threshold = Some(0.1);
        semantics.refuse_threshold = None;
        let report = validate(&c);
        assert!(!report.ok);
        assert!(report.has("V003_FAILURE_THRESHOLDS_INVERTED"));
        assert!(!report.has("V003_CONFIDENCE_OUT_OF_RANGE"));

        // Equal thresholds leave no hedge interval either
        let semantics = c.failure_semantics.as_mut().unwrap();
        semantics.hedge_threshold = Some(0.3);
        semantics.refuse_threshold = Some(0.3);
        assert!(validate(&c).has("V003_FAILURE_THRESHOLDS_INVERTED"));

        let semantics = c.failure_semantics.as_mut().unwrap();
        semantics.refuse_threshold = Some(0.1);
        assert!(validate(&c).ok);
    }

    #[test]
    fn test_default_profile_rules() {
        let mut c = codex();
        c.reflex_profiles.get_mut("default").unwrap().order.clear();
        assert!(validate(&c).has("V004_DEFAULT_PROFILE_EMPTY"));

        c.reflex_profiles.remove("default");
        assert!(validate(&c).has("V004_DEFAULT_PROFILE_MISSING"));
    }

    #[test]
    fn test_required_sections_reported() {
        let mut c = codex();
        c.failure_semantics = None;
        c.telemetry = None;
        let report = validate(&c);
        assert!(report.has("V005_FAILURE_SEMANTICS_MISSING"));
        assert!(report.has("V005_TELEMETRY_MISSING"));
    }
}
