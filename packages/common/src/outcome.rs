use serde::{Deserialize, Serialize};
use std::fmt;

/// Why a test case failed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureKind {
    /// Program ran but its normalized output differed from the expected
    /// string.
    Mismatch { expected: String, actual: String },
    /// The sandbox reported a compile or runtime error.
    RuntimeError { detail: String },
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mismatch { .. } => f.write_str("output mismatch"),
            Self::RuntimeError { .. } => f.write_str("runtime error"),
        }
    }
}

/// Outcome of a single test case within a run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CaseOutcome {
    Passed,
    Failed(FailureKind),
    /// Never executed because an earlier case stopped the run.
    Unattempted,
}

impl CaseOutcome {
    pub fn is_passed(&self) -> bool {
        matches!(self, Self::Passed)
    }
}

/// Terminal outcome of a full autograder run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SuiteVerdict {
    /// Every configured case passed.
    AllPassed,
    /// Case `index` (0-based) failed; later cases were not attempted.
    FailedAt { index: usize, kind: FailureKind },
    /// The sandbox was unreachable or misbehaved; distinct from a test
    /// failure, nothing may be persisted.
    Infra { detail: String },
}

/// Result of running the whole configured suite, one outcome per case in
/// test order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuiteReport {
    pub verdict: SuiteVerdict,
    pub outcomes: Vec<CaseOutcome>,
}

impl SuiteReport {
    /// Returns true when persistence is allowed.
    pub fn passed(&self) -> bool {
        matches!(self.verdict, SuiteVerdict::AllPassed)
    }

    /// Number of cases that actually passed.
    pub fn passed_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_passed()).count()
    }
}
