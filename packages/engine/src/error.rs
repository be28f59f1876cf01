use thiserror::Error;

use chat::ChatError;
use common::EventState;

use crate::gate::Operation;
use crate::topic::TopicParseError;

/// Rejection of a draft submission. Nothing has changed; the message is
/// meant for inline display to the submitter.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("no fenced code block found in the message")]
    MissingCodeBlock,

    #[error("the code block is empty")]
    EmptyCode,

    #[error("code is {len} characters long, the limit is {max}")]
    CodeTooLong { len: usize, max: usize },

    #[error("no language tag on the code block")]
    MissingLanguage,

    #[error("unknown language '{tag}'")]
    UnknownLanguage { tag: String },
}

/// Operation refused at the current lifecycle state.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("{operation} is not allowed while the event is {state}")]
pub struct GateError {
    pub operation: Operation,
    pub state: EventState,
}

/// Umbrella error for engine operations.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Gate(#[from] GateError),

    #[error(transparent)]
    Topic(#[from] TopicParseError),

    #[error(transparent)]
    Chat(#[from] ChatError),
}
