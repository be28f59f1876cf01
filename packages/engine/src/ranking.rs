use std::collections::BTreeMap;

use chat::MessageId;

use crate::record::ParticipationEntry;

/// Medal glyphs for podium positions 1 to 3.
pub const MEDALS: [&str; 3] = ["\u{1f947}", "\u{1f948}", "\u{1f949}"];

/// Sorts entries by the contest ordering: shortest code first, ties to
/// the earlier submission. The sort is stable, so equal keys keep their
/// input order.
pub fn global_ranking(mut entries: Vec<ParticipationEntry>) -> Vec<ParticipationEntry> {
    entries.sort_by_key(|entry| (entry.code_length, entry.submitted_at));
    entries
}

/// The contest ordering applied independently per canonical language.
pub fn per_language_ranking(
    entries: Vec<ParticipationEntry>,
) -> BTreeMap<String, Vec<ParticipationEntry>> {
    let mut buckets: BTreeMap<String, Vec<ParticipationEntry>> = BTreeMap::new();
    for entry in entries {
        buckets.entry(entry.language.clone()).or_default().push(entry);
    }
    for bucket in buckets.values_mut() {
        bucket.sort_by_key(|entry| (entry.code_length, entry.submitted_at));
    }
    buckets
}

/// 1-based rank of the entry backed by `message` within a sorted ranking.
pub fn rank_of(sorted: &[ParticipationEntry], message: MessageId) -> Option<usize> {
    sorted
        .iter()
        .position(|entry| entry.message == message)
        .map(|index| index + 1)
}

/// The adjacent better- and worse-ranked entries around `message`.
///
/// `None` on either side is the boundary sentinel: nobody ranks above
/// first place and nobody ranks below the last.
pub fn neighbors(
    sorted: &[ParticipationEntry],
    message: MessageId,
) -> Option<(Option<&ParticipationEntry>, Option<&ParticipationEntry>)> {
    let index = sorted.iter().position(|entry| entry.message == message)?;
    let better = index.checked_sub(1).map(|i| &sorted[i]);
    let worse = sorted.get(index + 1);
    Some((better, worse))
}

/// Medal glyph for a 1-based podium rank.
pub fn medal(rank: usize) -> Option<&'static str> {
    MEDALS.get(rank.checked_sub(1)?).copied()
}
