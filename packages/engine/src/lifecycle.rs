use std::sync::Arc;

use chrono::Utc;
use tracing::{info, instrument, warn};

use chat::{ChannelId, ChatGateway};
use common::EventState;

use crate::error::EngineError;
use crate::gate::{Operation, ensure_allowed};
use crate::ranking::{MEDALS, global_ranking, per_language_ranking};
use crate::record::ParticipationEntry;
use crate::repository::ParticipationRepository;
use crate::topic::{TopicPatch, TopicStateStore};

/// Drives the Open -> Ended -> Closed round lifecycle.
pub struct EventLifecycleController {
    gateway: Arc<dyn ChatGateway>,
    topic: TopicStateStore,
    repository: ParticipationRepository,
    /// Channel receiving the final leaderboard.
    channel: ChannelId,
}

impl EventLifecycleController {
    pub fn new(
        gateway: Arc<dyn ChatGateway>,
        topic: TopicStateStore,
        repository: ParticipationRepository,
        channel: ChannelId,
    ) -> Self {
        EventLifecycleController {
            gateway,
            topic,
            repository,
            channel,
        }
    }

    /// Opens a fresh round named `name`, starting today.
    ///
    /// Permitted from any prior state. Because queries are scoped to
    /// records after the start date, prior rounds' entries simply fall
    /// out of every scan; nothing is deleted.
    #[instrument(skip(self))]
    pub async fn start(&self, name: &str) -> Result<(), EngineError> {
        let patch = TopicPatch {
            state: Some(EventState::Open),
            start_date: Some(Utc::now().date_naive()),
            name: Some(name.to_string()),
            autotests: None,
        };
        self.topic.write(patch).await?;
        info!(name, "round started");
        Ok(())
    }

    /// Ends the open round and posts the final leaderboard.
    #[instrument(skip(self))]
    pub async fn stop(&self) -> Result<(), EngineError> {
        let metadata = self.topic.read().await?;
        ensure_allowed(Operation::Stop, metadata.state)?;

        let entries = self.repository.find_all(metadata.round_start()).await?;
        let board = render_leaderboard(&metadata.name, entries);

        self.topic.write(TopicPatch::state_only(EventState::Ended)).await?;
        info!("round ended");

        if let Err(err) = self.gateway.post_notice(self.channel, &board).await {
            warn!(error = %err, "failed to post the final leaderboard");
        }
        Ok(())
    }

    /// Archives an ended round; every user-facing operation is then
    /// disallowed.
    #[instrument(skip(self))]
    pub async fn close(&self) -> Result<(), EngineError> {
        let metadata = self.topic.read().await?;
        ensure_allowed(Operation::Close, metadata.state)?;

        self.topic.write(TopicPatch::state_only(EventState::Closed)).await?;
        info!("round closed");
        Ok(())
    }
}

fn render_leaderboard(round: &str, entries: Vec<ParticipationEntry>) -> String {
    let global = global_ranking(entries);
    if global.is_empty() {
        return format!("Final results for {round}: no participations this round.");
    }

    let mut lines = vec![format!("Final results for {round}:")];
    lines.push("Overall podium:".to_string());
    for (index, entry) in global.iter().take(MEDALS.len()).enumerate() {
        lines.push(format!(
            "{} {}: {} characters in {}",
            MEDALS[index], entry.mention, entry.code_length, entry.language
        ));
    }

    for (language, bucket) in per_language_ranking(global) {
        lines.push(format!("{language}:"));
        for (index, entry) in bucket.iter().take(MEDALS.len()).enumerate() {
            lines.push(format!(
                "  {} {}: {} characters",
                MEDALS[index], entry.mention, entry.code_length
            ));
        }
    }
    lines.join("\n")
}
