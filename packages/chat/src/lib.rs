pub mod error;
pub mod models;
pub mod traits;

pub use error::ChatError;
pub use models::{
    CONFIRM, ChannelId, ChannelMessage, DECLINE, DIGITS, MessageId, ReactionEvent, ReactionFilter,
    RecordCard, RecordField, UserId,
};
pub use traits::ChatGateway;
