//! Error taxonomy for a trigger run.
//!
//! Only fatal failures live here. A staging failure is not an error: it is
//! reported as [`crate::StageOutcome::Skipped`] and the run carries on.

use std::path::PathBuf;

/// Fatal errors that abort a trigger run.
#[derive(Debug, thiserror::Error)]
pub enum TriggerError {
    #[error("failed to run git: {0}")]
    GitSpawn(#[source] std::io::Error),

    #[error("`git {command}` failed{}: {stderr}", exit_suffix(.code))]
    GitCommand {
        command: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("invalid config {path}: {message}")]
    Config { path: PathBuf, message: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

fn exit_suffix(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!(" with exit code {code}"),
        None => String::new(),
    }
}

impl TriggerError {
    /// Exit status the process should terminate with for this error.
    ///
    /// A git failure propagates git's own code; everything else is 1.
    pub fn exit_code(&self) -> i32 {
        match self {
            TriggerError::GitCommand {
                code: Some(code), ..
            } if *code != 0 => *code,
            _ => 1,
        }
    }

    /// Diagnostic text printed by the underlying tool, if any.
    pub fn tool_stderr(&self) -> Option<&str> {
        match self {
            TriggerError::GitCommand { stderr, .. } if !stderr.is_empty() => Some(stderr),
            _ => None,
        }
    }
}

/// Result type for trigger operations.
pub type Result<T> = std::result::Result<T, TriggerError>;
