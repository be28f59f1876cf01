use std::sync::Arc;

use tracing::instrument;

use chat::{ChannelId, ChatGateway, UserId};

use crate::error::EngineError;
use crate::gate::{Operation, ensure_allowed};
use crate::ranking::{global_ranking, neighbors, rank_of};
use crate::record::ParticipationEntry;
use crate::repository::ParticipationRepository;
use crate::topic::TopicStateStore;

/// A stats command as received from the platform.
#[derive(Clone, Debug)]
pub struct StatsRequest {
    pub requester: UserId,
    pub origin: ChannelId,
}

/// Round statistics: totals plus the requester's own standing.
pub struct StatsReporter {
    gateway: Arc<dyn ChatGateway>,
    topic: TopicStateStore,
    repository: ParticipationRepository,
}

impl StatsReporter {
    pub fn new(
        gateway: Arc<dyn ChatGateway>,
        topic: TopicStateStore,
        repository: ParticipationRepository,
    ) -> Self {
        StatsReporter {
            gateway,
            topic,
            repository,
        }
    }

    /// Posts the round report to the origin channel and returns it.
    #[instrument(skip(self, request), fields(requester = %request.requester))]
    pub async fn stats(&self, request: StatsRequest) -> Result<String, EngineError> {
        let metadata = self.topic.read().await?;
        ensure_allowed(Operation::Stats, metadata.state)?;

        let entries = self.repository.find_all(metadata.round_start()).await?;
        let report = render_stats(&metadata.name, entries, request.requester);
        self.gateway.post_notice(request.origin, &report).await?;
        Ok(report)
    }
}

fn render_stats(round: &str, entries: Vec<ParticipationEntry>, requester: UserId) -> String {
    let sorted = global_ranking(entries);

    let mut lines = vec![format!("Stats for {round}:")];
    lines.push(format!("Participations: {}", sorted.len()));
    match sorted.first() {
        Some(best) => lines.push(format!(
            "Shortest entry: {} characters ({})",
            best.code_length, best.language
        )),
        None => lines.push("Shortest entry: none yet".to_string()),
    }

    // The requester's best entry is their first hit in rank order.
    let mine = sorted.iter().find(|entry| entry.submitter == requester);
    match mine {
        None => lines.push("You have no participation in this round.".to_string()),
        Some(entry) => {
            if let Some(rank) = rank_of(&sorted, entry.message) {
                lines.push(format!(
                    "Your best entry: {} characters in {}, ranked {}/{}",
                    entry.code_length,
                    entry.language,
                    rank,
                    sorted.len()
                ));
            }
            let (better, worse) = neighbors(&sorted, entry.message).unwrap_or((None, None));
            lines.push(match better {
                Some(b) => format!("Ahead of you: {} ({} characters)", b.mention, b.code_length),
                None => "Ahead of you: nobody".to_string(),
            });
            lines.push(match worse {
                Some(w) => format!("Behind you: {} ({} characters)", w.mention, w.code_length),
                None => "Behind you: nobody".to_string(),
            });
        }
    }

    lines.join("\n")
}
