//! Errors at the I/O edges. Decision functions never return these.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CodexError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("codex parse error: {0}")]
    Parse(#[source] serde_json::Error),

    /// Strict loading only; the permissive path reports these as data.
    #[error("codex failed validation: {}", .0.join("; "))]
    Invalid(Vec<String>),
}

pub type CodexResult<T> = Result<T, CodexError>;
