use std::time::Duration;
use thiserror::Error;

/// Failure talking to the remote execution sandbox.
///
/// Every variant is an infrastructure fault: the run aborts and nothing
/// may be persisted, distinct from a test failure.
#[derive(Debug, Error)]
pub enum ExecError {
    #[error("sandbox transport error: {0}")]
    Transport(String),

    #[error("sandbox returned HTTP {status}: {detail}")]
    Api { status: u16, detail: String },

    #[error("malformed sandbox response: {0}")]
    Malformed(String),

    #[error("sandbox call exceeded the {0:?} deadline")]
    Deadline(Duration),
}

impl From<reqwest::Error> for ExecError {
    fn from(e: reqwest::Error) -> Self {
        ExecError::Transport(e.to_string())
    }
}
