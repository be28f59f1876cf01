pub mod event;
pub mod languages;
pub mod outcome;

pub use event::{EventMetadata, EventState, ParseEventStateError, TestCase};
pub use languages::{
    EquivalenceGroup, LanguageConfigError, LanguageDescriptor, LanguageRegistry,
};
pub use outcome::{CaseOutcome, FailureKind, SuiteReport, SuiteVerdict};
