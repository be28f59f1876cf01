use thiserror::Error;

use crate::models::{ChannelId, MessageId};

/// Failures surfaced by a chat platform adapter.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("channel {0} not found")]
    UnknownChannel(ChannelId),

    #[error("message {0} not found")]
    UnknownMessage(MessageId),

    #[error("operation forbidden: {0}")]
    Forbidden(String),

    #[error("transport error: {0}")]
    Transport(String),
}
