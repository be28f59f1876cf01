use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::time::Duration;

use crate::error::ChatError;
use crate::models::{
    ChannelId, ChannelMessage, MessageId, ReactionEvent, ReactionFilter, RecordCard, UserId,
};

/// Boundary to the hosting chat platform.
///
/// The engine is written against this trait only; the embedding bot
/// process supplies the concrete adapter. All methods are one logical
/// platform call; none of them retries.
#[async_trait]
pub trait ChatGateway: Send + Sync {
    /// Identity of the bot account, used to filter history scans.
    fn bot_user(&self) -> UserId;

    /// Full topic text of a channel.
    async fn read_topic(&self, channel: ChannelId) -> Result<String, ChatError>;

    /// Replaces the topic text of a channel.
    async fn write_topic(&self, channel: ChannelId, text: &str) -> Result<(), ChatError>;

    /// Messages posted in `channel` at or after `since`, newest first.
    ///
    /// This walks the channel history; cost grows with the number of
    /// messages in the window.
    async fn history_since(
        &self,
        channel: ChannelId,
        since: DateTime<Utc>,
    ) -> Result<Vec<ChannelMessage>, ChatError>;

    /// Posts a structured record card.
    async fn post_card(
        &self,
        channel: ChannelId,
        card: RecordCard,
    ) -> Result<MessageId, ChatError>;

    /// Replaces the card payload of an existing message.
    async fn edit_card(
        &self,
        channel: ChannelId,
        message: MessageId,
        card: RecordCard,
    ) -> Result<(), ChatError>;

    /// Posts a plain text notice.
    async fn post_notice(&self, channel: ChannelId, text: &str) -> Result<MessageId, ChatError>;

    /// Replaces the text of an existing notice.
    async fn edit_notice(
        &self,
        channel: ChannelId,
        message: MessageId,
        text: &str,
    ) -> Result<(), ChatError>;

    /// Deletes a message.
    async fn delete_message(&self, channel: ChannelId, message: MessageId)
    -> Result<(), ChatError>;

    /// Attaches menu glyphs to a message, in order.
    async fn add_reactions(
        &self,
        channel: ChannelId,
        message: MessageId,
        glyphs: &[&str],
    ) -> Result<(), ChatError>;

    /// Removes every reaction from a message (stale menu affordances).
    async fn clear_reactions(
        &self,
        channel: ChannelId,
        message: MessageId,
    ) -> Result<(), ChatError>;

    /// Single-shot cancellable wait: resolves with the first reaction
    /// matching `filter`, or `None` once `timeout` elapses. Expiry has no
    /// other side effects.
    async fn await_reaction(
        &self,
        filter: ReactionFilter,
        timeout: Duration,
    ) -> Result<Option<ReactionEvent>, ChatError>;
}
