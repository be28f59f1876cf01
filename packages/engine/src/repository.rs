use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use chat::{ChannelId, ChatGateway, UserId};

use crate::error::EngineError;
use crate::record::{self, NewParticipation, ParticipationEntry};

/// Participation store backed by the code channel's message history.
///
/// There is no database: each entry is its own display record. Queries
/// scan the history window newest first and reconstruct entries from
/// cards, so cost grows with the round's record count.
#[derive(Clone)]
pub struct ParticipationRepository {
    gateway: Arc<dyn ChatGateway>,
    channel: ChannelId,
}

impl ParticipationRepository {
    pub fn new(gateway: Arc<dyn ChatGateway>, channel: ChannelId) -> Self {
        ParticipationRepository { gateway, channel }
    }

    /// Every current entry posted at or after `since`, one per
    /// `(submitter, language)` slot, newest record winning.
    pub async fn find_all(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Vec<ParticipationEntry>, EngineError> {
        let bot = self.gateway.bot_user();
        let history = self.gateway.history_since(self.channel, since).await?;

        let mut slots: BTreeMap<(u64, String), ParticipationEntry> = BTreeMap::new();
        for message in &history {
            if message.author != bot {
                continue;
            }
            let Some(card) = &message.card else {
                continue;
            };
            let Some(entry) = record::parse_card(card, message.id) else {
                debug!(message = %message.id, "skipping unparseable participation record");
                continue;
            };
            // History is newest first, so the first record seen wins its slot.
            slots
                .entry((entry.submitter.0, entry.language.clone()))
                .or_insert(entry);
        }
        Ok(slots.into_values().collect())
    }

    /// One submitter's entries, keyed by canonical language.
    pub async fn find_by_submitter(
        &self,
        submitter: UserId,
        since: DateTime<Utc>,
    ) -> Result<BTreeMap<String, ParticipationEntry>, EngineError> {
        let all = self.find_all(since).await?;
        Ok(all
            .into_iter()
            .filter(|entry| entry.submitter == submitter)
            .map(|entry| (entry.language.clone(), entry))
            .collect())
    }

    /// The entry currently holding one `(submitter, language)` slot.
    pub async fn find_slot(
        &self,
        submitter: UserId,
        language: &str,
        since: DateTime<Utc>,
    ) -> Result<Option<ParticipationEntry>, EngineError> {
        Ok(self
            .find_by_submitter(submitter, since)
            .await?
            .remove(language))
    }

    /// Appends a fresh display record.
    pub async fn create(
        &self,
        new: &NewParticipation,
    ) -> Result<ParticipationEntry, EngineError> {
        let card = record::render_card(new);
        let message = self.gateway.post_card(self.channel, card).await?;
        Ok(new.to_entry(message))
    }

    /// Overwrites an existing record in place.
    pub async fn update(
        &self,
        existing: &ParticipationEntry,
        new: &NewParticipation,
    ) -> Result<ParticipationEntry, EngineError> {
        let card = record::render_card(new);
        self.gateway
            .edit_card(self.channel, existing.message, card)
            .await?;
        // Stale menu glyphs on the record would read as live affordances.
        if let Err(err) = self
            .gateway
            .clear_reactions(self.channel, existing.message)
            .await
        {
            warn!(error = %err, message = %existing.message, "failed to clear stale reactions");
        }
        Ok(new.to_entry(existing.message))
    }

    /// Removes an entry's display record.
    pub async fn delete(&self, entry: &ParticipationEntry) -> Result<(), EngineError> {
        self.gateway.delete_message(self.channel, entry.message).await?;
        Ok(())
    }
}
