pub mod error;
pub mod piston;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use error::ExecError;

/// One program execution: source compiled (if needed) and run once with
/// the given argument list.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExecRequest {
    /// Canonical language identifier.
    pub language: String,
    /// Full source code.
    pub source: String,
    /// Program arguments, in order.
    pub args: Vec<String>,
}

/// How the program (or its compilation) terminated.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExitInfo {
    pub code: Option<i32>,
    pub signal: Option<String>,
}

impl ExitInfo {
    /// Returns true for a clean exit (code 0, no signal).
    pub fn clean(&self) -> bool {
        self.code == Some(0) && self.signal.is_none()
    }
}

/// Result of one sandbox execution.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecOutcome {
    pub stdout: String,
    pub stderr: String,
    pub exit: ExitInfo,
}

impl ExecOutcome {
    /// Returns true when the sandbox reported a compile or runtime error.
    pub fn crashed(&self) -> bool {
        !self.exit.clean()
    }
}

/// Remote service that compiles and runs arbitrary code.
///
/// Treated as an unreliable network dependency: implementations surface
/// every transport or protocol fault as `ExecError` and never retry.
#[async_trait]
pub trait ExecutionService: Send + Sync {
    async fn execute(&self, request: ExecRequest) -> Result<ExecOutcome, ExecError>;
}

/// First `max_chars` characters of `text`, marked when cut short.
pub(crate) fn snippet(text: &str, max_chars: usize) -> String {
    let trimmed = text.trim();
    if trimmed.chars().count() <= max_chars {
        return trimmed.to_string();
    }
    let head: String = trimmed.chars().take(max_chars).collect();
    format!("{head}…")
}
