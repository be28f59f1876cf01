use std::fmt;

use common::EventState;

use crate::error::GateError;

/// User-facing operations subject to lifecycle gating.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operation {
    Submit,
    Cancel,
    Stats,
    Stop,
    Close,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Submit => "submit",
            Self::Cancel => "cancel",
            Self::Stats => "stats",
            Self::Stop => "stop",
            Self::Close => "close",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Checks `operation` against the lifecycle gating matrix.
///
/// Submit and cancel need a round that still accepts entries; stats stays
/// readable until the round is archived; stop and close each require the
/// exact predecessor state.
pub fn ensure_allowed(operation: Operation, state: EventState) -> Result<(), GateError> {
    let allowed = match operation {
        Operation::Submit | Operation::Cancel => state.accepts_entries(),
        Operation::Stats => state.allows_stats(),
        Operation::Stop => state == EventState::Open,
        Operation::Close => state == EventState::Ended,
    };
    if allowed {
        Ok(())
    } else {
        Err(GateError { operation, state })
    }
}
