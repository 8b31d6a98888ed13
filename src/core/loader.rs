//! Codex loading. The only file I/O the library performs.

use std::path::Path;

use crate::core::validator::validate;
use crate::error::{CodexError, CodexResult};
use crate::types::{CodexDocument, ValidationReport};

/// Read and parse a codex. Validation is left to the caller.
pub fn load_codex(path: impl AsRef<Path>) -> CodexResult<CodexDocument> {
    let path = path.as_ref();
    let json = std::fs::read_to_string(path)?;
    let codex = CodexDocument::from_json_str(&json)?;
    tracing::info!(
        path = %path.display(),
        version = %codex.version,
        fingerprint = %codex.fingerprint(),
        "codex loaded"
    );
    Ok(codex)
}

/// Read, parse and validate; returns the report alongside the document so
/// the caller can proceed on best-effort defaults.
pub fn load_codex_checked(path: impl AsRef<Path>) -> CodexResult<(CodexDocument, ValidationReport)> {
    let codex = load_codex(path)?;
    let report = validate(&codex);
    Ok((codex, report))
}

/// Read, parse and validate; any validation issue is an error
pub fn load_codex_strict(path: impl AsRef<Path>) -> CodexResult<CodexDocument> {
    let (codex, report) = load_codex_checked(path)?;
    if !report.ok {
        return Err(CodexError::Invalid(report.errors));
    }
    Ok(codex)
}
