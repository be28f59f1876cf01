use chrono::{DateTime, Utc};

use chat::{MessageId, RecordCard, UserId};

use crate::fence::{parse_fenced, render_fenced};

pub const CARD_TITLE: &str = "Participation";

const USER_FIELD: &str = "User";
const LANGUAGE_FIELD: &str = "Language";
const LENGTH_FIELD: &str = "Length";
const DATE_FIELD: &str = "Date";
const CODE_FIELD: &str = "Code";

/// A stored participation: one submitter's entry in one language.
///
/// The display record in the code channel IS the storage; this struct is
/// what a scan reconstructs from one card.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParticipationEntry {
    pub submitter: UserId,
    /// Platform mention string, kept for rendered reports.
    pub mention: String,
    /// Canonical language id (equivalence-collapsed).
    pub language: String,
    pub code: String,
    /// Characters in `code`; the ranking key.
    pub code_length: u32,
    pub submitted_at: DateTime<Utc>,
    /// Message carrying the display record.
    pub message: MessageId,
}

/// A participation about to be persisted.
#[derive(Clone, Debug)]
pub struct NewParticipation {
    pub submitter: UserId,
    pub mention: String,
    pub language: String,
    /// Trimmed code body.
    pub code: String,
    pub submitted_at: DateTime<Utc>,
}

impl NewParticipation {
    pub fn code_length(&self) -> u32 {
        self.code.chars().count() as u32
    }

    /// The entry this participation becomes once its record is posted.
    pub fn to_entry(&self, message: MessageId) -> ParticipationEntry {
        ParticipationEntry {
            submitter: self.submitter,
            mention: self.mention.clone(),
            language: self.language.clone(),
            code: self.code.clone(),
            code_length: self.code_length(),
            submitted_at: self.submitted_at,
            message,
        }
    }
}

/// Renders the display record for a participation.
pub fn render_card(new: &NewParticipation) -> RecordCard {
    RecordCard::new(CARD_TITLE)
        .field(USER_FIELD, format!("{}|{}", new.submitter, new.mention))
        .field(LANGUAGE_FIELD, new.language.as_str())
        .field(LENGTH_FIELD, new.code_length().to_string())
        .field(DATE_FIELD, new.submitted_at.to_rfc3339())
        .field(CODE_FIELD, render_fenced(&new.language, &new.code))
}

/// Reconstructs an entry from a display record.
///
/// Returns `None` for cards that are not participation records or fail
/// to parse; callers skip those.
pub fn parse_card(card: &RecordCard, message: MessageId) -> Option<ParticipationEntry> {
    if card.title != CARD_TITLE {
        return None;
    }

    let user_raw = card.get(USER_FIELD)?;
    let (id_raw, mention) = user_raw.split_once('|')?;
    let submitter = UserId(id_raw.trim().parse().ok()?);

    let language = card.get(LANGUAGE_FIELD)?.trim().to_string();
    let code_length: u32 = card.get(LENGTH_FIELD)?.trim().parse().ok()?;
    let submitted_at = DateTime::parse_from_rfc3339(card.get(DATE_FIELD)?.trim())
        .ok()?
        .with_timezone(&Utc);
    let code = parse_fenced(card.get(CODE_FIELD)?)?.body.trim().to_string();

    Some(ParticipationEntry {
        submitter,
        mention: mention.trim().to_string(),
        language,
        code,
        code_length,
        submitted_at,
        message,
    })
}
