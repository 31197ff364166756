//! RB-002: Error kinds raised while executing runbook statements.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RunbookError {
    /// An assert's probe never succeeded before polling gave up.
    #[error("Error! Assertion `{cmd}` failed")]
    AssertionFailed { cmd: String },

    /// A command ran but exited non-zero.
    #[error("`{command}` exited with status {exit_code} on {host}: {stderr}")]
    CommandFailed {
        host: String,
        command: String,
        exit_code: i32,
        stderr: String,
    },

    /// The command could not be run on the host at all.
    #[error("transport error on {host}: {detail}")]
    Transport { host: String, detail: String },

    /// The worker pool for fanning out over hosts could not be built.
    #[error("failed to create worker pool: {0}")]
    WorkerPool(String),

    #[error("YAML parse error: {0}")]
    Parse(String),

    #[error("{} validation error(s): {}", .0.len(), .0.join("; "))]
    Validation(Vec<String>),

    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl RunbookError {
    /// True for the assertion-timeout kind.
    pub fn is_assertion_failure(&self) -> bool {
        matches!(self, Self::AssertionFailed { .. })
    }
}
