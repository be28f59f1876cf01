use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lifecycle state of a contest round.
///
/// Transitions are monotonic within a round: Open -> Ended -> Closed.
/// A new round begins only through the explicit start action, which
/// rewrites the stored metadata.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventState {
    /// Accepting submissions and cancellations.
    Open,
    /// Round finished; stats remain readable, entries are frozen.
    Ended,
    /// Round archived; every user-facing operation is disallowed.
    Closed,
}

impl EventState {
    /// All states, in transition order.
    pub const ALL: &'static [EventState] = &[Self::Open, Self::Ended, Self::Closed];

    /// Returns true while submit and cancel are permitted.
    pub fn accepts_entries(&self) -> bool {
        !matches!(self, Self::Ended | Self::Closed)
    }

    /// Returns true while the stats report is permitted.
    pub fn allows_stats(&self) -> bool {
        !matches!(self, Self::Closed)
    }

    /// Returns the lowercase token used by the topic grammar.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Ended => "ended",
            Self::Closed => "closed",
        }
    }
}

impl fmt::Display for EventState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error when parsing an invalid state token.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid event state '{invalid}' (expected one of: open, ended, closed)")]
pub struct ParseEventStateError {
    invalid: String,
}

impl FromStr for EventState {
    type Err = ParseEventStateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(Self::Open),
            "ended" => Ok(Self::Ended),
            "closed" => Ok(Self::Closed),
            _ => Err(ParseEventStateError {
                invalid: s.to_string(),
            }),
        }
    }
}

/// One autograded test case: arguments passed to the program and the
/// output it must produce.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCase {
    /// Arguments handed to the sandboxed program, in order.
    pub args: Vec<String>,
    /// Expected stdout, compared after output normalization.
    pub expected: String,
}

impl TestCase {
    pub fn new(args: Vec<String>, expected: impl Into<String>) -> Self {
        Self {
            args,
            expected: expected.into(),
        }
    }
}

/// Metadata of the current contest round, persisted inside the contest
/// channel topic.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventMetadata {
    pub state: EventState,
    /// Day the round started; scopes all history scans.
    pub start_date: NaiveDate,
    /// Human-readable round name.
    pub name: String,
    /// Ordered autograder test cases. Empty means submissions are
    /// accepted without grading.
    pub autotests: Vec<TestCase>,
}

impl EventMetadata {
    /// Returns true if the round has autograder cases configured.
    pub fn has_autotests(&self) -> bool {
        !self.autotests.is_empty()
    }

    /// Lower bound for participation scans: the start date at midnight UTC.
    pub fn round_start(&self) -> DateTime<Utc> {
        self.start_date.and_time(NaiveTime::MIN).and_utc()
    }
}
