use std::ops::Range;
use std::sync::Arc;

use chrono::NaiveDate;
use thiserror::Error;
use tracing::debug;

use chat::{ChannelId, ChatGateway};
use common::{EventMetadata, EventState, ParseEventStateError, TestCase};

use crate::error::EngineError;

pub const STATE_KEY: &str = "event-state";
pub const DATE_KEY: &str = "event-date";
pub const NAME_KEY: &str = "event-name";
pub const AUTOTESTS_KEY: &str = "event-autotests";

const DATE_FORMAT: &str = "%d/%m/%Y";

/// Violation of the topic metadata grammar. Fatal to the calling
/// operation; the engine never falls back to defaults here.
#[derive(Debug, Error)]
pub enum TopicParseError {
    #[error("topic field '{0}' is missing")]
    MissingField(&'static str),

    #[error("invalid event date '{raw}', expected DD/MM/YYYY")]
    InvalidDate { raw: String },

    #[error(transparent)]
    InvalidState(#[from] ParseEventStateError),

    #[error("malformed autotests block: {0}")]
    Autotests(String),
}

/// Fields to merge into the topic. `None` leaves a field untouched.
#[derive(Clone, Debug, Default)]
pub struct TopicPatch {
    pub state: Option<EventState>,
    pub start_date: Option<NaiveDate>,
    pub name: Option<String>,
    pub autotests: Option<Vec<TestCase>>,
}

impl TopicPatch {
    /// Patch that changes only the lifecycle state.
    pub fn state_only(state: EventState) -> Self {
        TopicPatch {
            state: Some(state),
            ..Default::default()
        }
    }
}

/// Event metadata store backed by a channel topic.
///
/// The topic is a free-form text blob owned by channel moderators; the
/// engine claims only its own grammar lines and leaves every other byte
/// alone.
#[derive(Clone)]
pub struct TopicStateStore {
    gateway: Arc<dyn ChatGateway>,
    channel: ChannelId,
}

impl TopicStateStore {
    pub fn new(gateway: Arc<dyn ChatGateway>, channel: ChannelId) -> Self {
        TopicStateStore { gateway, channel }
    }

    /// Reads and parses the current round metadata.
    pub async fn read(&self) -> Result<EventMetadata, EngineError> {
        let blob = self.gateway.read_topic(self.channel).await?;
        Ok(parse_metadata(&blob)?)
    }

    /// Merges `patch` into the topic via targeted substitution.
    ///
    /// Purely textual: works even when fields the patch does not touch
    /// are absent or malformed. Last write wins under concurrency.
    pub async fn write(&self, patch: TopicPatch) -> Result<(), EngineError> {
        let blob = self.gateway.read_topic(self.channel).await?;
        let updated = apply_patch(&blob, &patch);
        debug!(channel = %self.channel, "updating topic metadata");
        self.gateway.write_topic(self.channel, &updated).await?;
        Ok(())
    }
}

/// Parses the full metadata out of a topic blob, failing fast on any
/// missing or malformed field.
pub fn parse_metadata(blob: &str) -> Result<EventMetadata, TopicParseError> {
    let state_raw = scalar_value(blob, STATE_KEY)
        .ok_or(TopicParseError::MissingField(STATE_KEY))?
        .trim();
    let state: EventState = state_raw.parse()?;

    let date_raw = scalar_value(blob, DATE_KEY)
        .ok_or(TopicParseError::MissingField(DATE_KEY))?
        .trim();
    let start_date =
        NaiveDate::parse_from_str(date_raw, DATE_FORMAT).map_err(|_| TopicParseError::InvalidDate {
            raw: date_raw.to_string(),
        })?;

    let name = scalar_value(blob, NAME_KEY)
        .ok_or(TopicParseError::MissingField(NAME_KEY))?
        .trim()
        .to_string();
    if name.is_empty() {
        return Err(TopicParseError::MissingField(NAME_KEY));
    }

    let autotests = match autotests_slot(blob) {
        AutotestsSlot::Absent => Vec::new(),
        AutotestsSlot::Unstructured(range) => {
            if blob[range].trim().is_empty() {
                Vec::new()
            } else {
                return Err(TopicParseError::Autotests(
                    "expected a [[ ... ]] block".to_string(),
                ));
            }
        }
        AutotestsSlot::Block(range) => {
            parse_cases(&blob[range.start + 2..range.end - 2])?
        }
    };

    Ok(EventMetadata {
        state,
        start_date,
        name,
        autotests,
    })
}

/// Returns `blob` with the patched fields substituted in place and any
/// missing grammar lines appended at the end.
pub fn apply_patch(blob: &str, patch: &TopicPatch) -> String {
    let mut updated = blob.to_string();
    if let Some(state) = patch.state {
        set_scalar(&mut updated, STATE_KEY, state.as_str());
    }
    if let Some(date) = patch.start_date {
        set_scalar(&mut updated, DATE_KEY, &date.format(DATE_FORMAT).to_string());
    }
    if let Some(name) = &patch.name {
        set_scalar(&mut updated, NAME_KEY, name.trim());
    }
    if let Some(cases) = &patch.autotests {
        set_autotests(&mut updated, cases);
    }
    updated
}

/// Where the autotests field sits in the blob, if anywhere.
enum AutotestsSlot {
    /// No `event-autotests :` line at all; no tests configured.
    Absent,
    /// The key is present but its value is not a `[[ ... ]]` block.
    /// Range spans the value up to end of line.
    Unstructured(Range<usize>),
    /// Well-formed block. Range spans the `[[ ... ]]` inclusive.
    Block(Range<usize>),
}

/// Locates `key` followed by a colon and returns the byte range of its
/// value, running to end of line. The key must sit at a word boundary.
fn scalar_value_range(blob: &str, key: &str) -> Option<Range<usize>> {
    let mut from = 0;
    while let Some(rel) = blob[from..].find(key) {
        let at = from + rel;
        from = at + key.len();

        let boundary = at == 0
            || blob[..at]
                .chars()
                .next_back()
                .is_some_and(char::is_whitespace);
        if !boundary {
            continue;
        }

        let tail = &blob[at + key.len()..];
        let spaces = tail.len() - tail.trim_start_matches([' ', '\t']).len();
        if !tail[spaces..].starts_with(':') {
            continue;
        }

        let value_at = at + key.len() + spaces + 1;
        let line_end = blob[value_at..]
            .find('\n')
            .map_or(blob.len(), |i| value_at + i);
        return Some(value_at..line_end);
    }
    None
}

fn scalar_value<'a>(blob: &'a str, key: &str) -> Option<&'a str> {
    scalar_value_range(blob, key).map(|range| &blob[range])
}

fn autotests_slot(blob: &str) -> AutotestsSlot {
    let Some(value_range) = scalar_value_range(blob, AUTOTESTS_KEY) else {
        return AutotestsSlot::Absent;
    };

    let value_at = value_range.start;
    // The block may span lines, so search past the value line too.
    let rest = &blob[value_at..];
    let Some(open_rel) = rest.find("[[") else {
        return AutotestsSlot::Unstructured(value_range);
    };
    if !rest[..open_rel].trim().is_empty() || open_rel > value_range.end - value_at {
        return AutotestsSlot::Unstructured(value_range);
    }
    let Some(close_rel) = rest[open_rel + 2..].find("]]") else {
        return AutotestsSlot::Unstructured(value_range);
    };
    let start = value_at + open_rel;
    let end = value_at + open_rel + 2 + close_rel + 2;
    AutotestsSlot::Block(start..end)
}

/// Parses the inside of a `[[ ... ]]` block: a sequence of
/// `{args|pipe|separated} : [expected]` pairs.
fn parse_cases(inner: &str) -> Result<Vec<TestCase>, TopicParseError> {
    let mut cases = Vec::new();
    let mut rest = inner.trim_start();
    while !rest.is_empty() {
        let Some(after_brace) = rest.strip_prefix('{') else {
            return Err(TopicParseError::Autotests(format!(
                "expected '{{' at '{}'",
                head_of(rest)
            )));
        };
        let Some(brace_end) = after_brace.find('}') else {
            return Err(TopicParseError::Autotests(
                "unclosed argument braces".to_string(),
            ));
        };
        let args_raw = &after_brace[..brace_end];

        let after_args = after_brace[brace_end + 1..].trim_start();
        let Some(after_colon) = after_args.strip_prefix(':') else {
            return Err(TopicParseError::Autotests(
                "expected ':' between arguments and expected output".to_string(),
            ));
        };
        let after_colon = after_colon.trim_start();
        let Some(after_bracket) = after_colon.strip_prefix('[') else {
            return Err(TopicParseError::Autotests(
                "expected '[' around the expected output".to_string(),
            ));
        };
        let Some(bracket_end) = after_bracket.find(']') else {
            return Err(TopicParseError::Autotests(
                "unclosed expected-output bracket".to_string(),
            ));
        };
        let expected = &after_bracket[..bracket_end];

        let args: Vec<String> = if args_raw.trim().is_empty() {
            Vec::new()
        } else {
            args_raw.split('|').map(|a| a.trim().to_string()).collect()
        };
        cases.push(TestCase::new(args, expected));

        rest = after_bracket[bracket_end + 1..].trim_start();
    }
    Ok(cases)
}

fn render_autotests(cases: &[TestCase]) -> String {
    if cases.is_empty() {
        return "[[ ]]".to_string();
    }
    let parts: Vec<String> = cases
        .iter()
        .map(|case| format!("{{{}}} : [{}]", case.args.join("|"), case.expected))
        .collect();
    format!("[[ {} ]]", parts.join(" "))
}

fn set_scalar(blob: &mut String, key: &str, value: &str) {
    match scalar_value_range(blob, key) {
        Some(range) => blob.replace_range(range, &format!(" {value}")),
        None => append_line(blob, &format!("{key} : {value}")),
    }
}

fn set_autotests(blob: &mut String, cases: &[TestCase]) {
    let rendered = render_autotests(cases);
    match autotests_slot(blob) {
        AutotestsSlot::Absent => append_line(blob, &format!("{AUTOTESTS_KEY} : {rendered}")),
        AutotestsSlot::Unstructured(range) => {
            blob.replace_range(range, &format!(" {rendered}"));
        }
        AutotestsSlot::Block(range) => blob.replace_range(range, &rendered),
    }
}

fn append_line(blob: &mut String, line: &str) {
    if !blob.is_empty() && !blob.ends_with('\n') {
        blob.push('\n');
    }
    blob.push_str(line);
}

fn head_of(text: &str) -> String {
    text.chars().take(20).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL: &str = "welcome to the golf channel\n\
        event-state : open\n\
        event-date : 14/03/2024\n\
        event-name : pi day golf\n\
        event-autotests : [[ {} : [3.14] {5|2} : [2.5] ]]\n\
        be nice";

    #[test]
    fn test_parse_full_topic() {
        let meta = parse_metadata(FULL).unwrap();
        assert_eq!(meta.state, EventState::Open);
        assert_eq!(meta.start_date, NaiveDate::from_ymd_opt(2024, 3, 14).unwrap());
        assert_eq!(meta.name, "pi day golf");
        assert_eq!(meta.autotests.len(), 2);
        assert!(meta.autotests[0].args.is_empty());
        assert_eq!(meta.autotests[0].expected, "3.14");
        assert_eq!(meta.autotests[1].args, vec!["5", "2"]);
        assert_eq!(meta.autotests[1].expected, "2.5");
    }

    #[test]
    fn test_missing_fields_fail_fast() {
        let err = parse_metadata("event-date : 01/01/2024\nevent-name : x").unwrap_err();
        assert!(matches!(err, TopicParseError::MissingField(STATE_KEY)));

        let err = parse_metadata("event-state : open\nevent-name : x").unwrap_err();
        assert!(matches!(err, TopicParseError::MissingField(DATE_KEY)));

        let err = parse_metadata("event-state : open\nevent-date : 01/01/2024").unwrap_err();
        assert!(matches!(err, TopicParseError::MissingField(NAME_KEY)));
    }

    #[test]
    fn test_invalid_date_and_state() {
        let err =
            parse_metadata("event-state : open\nevent-date : 2024-03-14\nevent-name : x")
                .unwrap_err();
        assert!(matches!(err, TopicParseError::InvalidDate { .. }));

        let err =
            parse_metadata("event-state : paused\nevent-date : 14/03/2024\nevent-name : x")
                .unwrap_err();
        assert!(matches!(err, TopicParseError::InvalidState(_)));
    }

    #[test]
    fn test_absent_autotests_means_no_tests() {
        let meta =
            parse_metadata("event-state : open\nevent-date : 14/03/2024\nevent-name : x")
                .unwrap();
        assert!(meta.autotests.is_empty());
    }

    #[test]
    fn test_malformed_autotests_is_a_hard_error() {
        let blob = "event-state : open\nevent-date : 14/03/2024\nevent-name : x\n\
            event-autotests : {1} : [2]";
        assert!(matches!(
            parse_metadata(blob).unwrap_err(),
            TopicParseError::Autotests(_)
        ));

        let blob = "event-state : open\nevent-date : 14/03/2024\nevent-name : x\n\
            event-autotests : [[ {1} ]]";
        assert!(matches!(
            parse_metadata(blob).unwrap_err(),
            TopicParseError::Autotests(_)
        ));
    }

    #[test]
    fn test_empty_autotests_value_means_no_tests() {
        let blob = "event-state : open\nevent-date : 14/03/2024\nevent-name : x\n\
            event-autotests : ";
        assert!(parse_metadata(blob).unwrap().autotests.is_empty());

        let blob = "event-state : open\nevent-date : 14/03/2024\nevent-name : x\n\
            event-autotests : [[ ]]";
        assert!(parse_metadata(blob).unwrap().autotests.is_empty());
    }

    #[test]
    fn test_patch_preserves_surrounding_text() {
        let patched = apply_patch(FULL, &TopicPatch::state_only(EventState::Ended));
        assert!(patched.starts_with("welcome to the golf channel\n"));
        assert!(patched.ends_with("be nice"));
        assert!(patched.contains("event-state : ended"));
        assert!(patched.contains("event-date : 14/03/2024"));
        assert!(patched.contains("event-autotests : [[ {} : [3.14] {5|2} : [2.5] ]]"));
    }

    #[test]
    fn test_patch_appends_missing_lines() {
        let patch = TopicPatch {
            state: Some(EventState::Open),
            start_date: NaiveDate::from_ymd_opt(2024, 6, 1),
            name: Some("summer golf".to_string()),
            autotests: None,
        };
        let patched = apply_patch("rules: no cheating", &patch);
        assert_eq!(
            patched,
            "rules: no cheating\nevent-state : open\nevent-date : 01/06/2024\nevent-name : summer golf"
        );
    }

    #[test]
    fn test_roundtrip_for_every_state() {
        for state in EventState::ALL {
            let patch = TopicPatch {
                state: Some(*state),
                start_date: NaiveDate::from_ymd_opt(2025, 12, 31),
                name: Some("year end".to_string()),
                autotests: Some(vec![TestCase::new(vec!["a".into()], "b")]),
            };
            let blob = apply_patch("", &patch);
            let meta = parse_metadata(&blob).unwrap();
            assert_eq!(meta.state, *state);
            assert_eq!(meta.start_date, NaiveDate::from_ymd_opt(2025, 12, 31).unwrap());
            assert_eq!(meta.name, "year end");
            assert_eq!(meta.autotests, vec![TestCase::new(vec!["a".into()], "b")]);
        }
    }

    #[test]
    fn test_patch_replaces_autotests_block() {
        let patch = TopicPatch {
            autotests: Some(vec![TestCase::new(Vec::new(), "7")]),
            ..Default::default()
        };
        let patched = apply_patch(FULL, &patch);
        assert!(patched.contains("event-autotests : [[ {} : [7] ]]"));
        assert!(!patched.contains("3.14"));
        assert!(patched.ends_with("be nice"));
    }

    #[test]
    fn test_sloppy_spacing_is_tolerated_on_read() {
        let blob = "event-state:ended\nevent-date\t:  01/02/2024\nevent-name :golf";
        let meta = parse_metadata(blob).unwrap();
        assert_eq!(meta.state, EventState::Ended);
        assert_eq!(meta.name, "golf");
    }

    #[test]
    fn test_key_inside_a_word_is_not_a_field() {
        let blob = "my-event-state : open\nevent-state : ended\n\
            event-date : 01/02/2024\nevent-name : golf";
        let meta = parse_metadata(blob).unwrap();
        assert_eq!(meta.state, EventState::Ended);
    }
}
