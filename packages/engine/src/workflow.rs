use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use tracing::{info, instrument, warn};

use chat::{
    CONFIRM, ChannelId, ChatGateway, DECLINE, DIGITS, MessageId, ReactionFilter, UserId,
};
use common::{CaseOutcome, FailureKind, LanguageRegistry, SuiteReport, SuiteVerdict, TestCase};
use grader::{Autograder, NoopObserver, RunObserver};

use crate::config::EngineConfig;
use crate::error::{EngineError, ValidationError};
use crate::fence::{parse_fenced, render_fenced};
use crate::gate::{Operation, ensure_allowed};
use crate::record::{NewParticipation, ParticipationEntry};
use crate::repository::ParticipationRepository;
use crate::topic::TopicStateStore;

const PENDING_GLYPH: &str = "\u{23f3}";
const UNATTEMPTED_GLYPH: &str = "\u{2b1c}";

/// A submission command as received from the platform.
#[derive(Clone, Debug)]
pub struct SubmitRequest {
    pub submitter: UserId,
    /// Platform mention string for the submitter.
    pub mention: String,
    /// Channel the command arrived in; previews and menus go there.
    pub origin: ChannelId,
    /// Raw message body containing the fenced code.
    pub body: String,
}

/// Terminal outcome of a submit run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// A fresh entry was persisted.
    Created,
    /// An existing `(submitter, language)` slot was overwritten.
    Updated,
    /// The autograder rejected the code; nothing was persisted.
    TestsFailed(SuiteReport),
    /// The grading service failed; nothing was persisted.
    GraderUnavailable(SuiteReport),
    /// The submitter declined the confirmation.
    Cancelled,
    /// The confirmation window elapsed with no selection.
    Expired,
}

/// A cancel command as received from the platform.
#[derive(Clone, Debug)]
pub struct CancelRequest {
    pub requester: UserId,
    pub origin: ChannelId,
}

/// Terminal outcome of a cancel run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CancelOutcome {
    /// The selected entry's record was removed.
    Removed { language: String },
    /// The requester has no entries this round.
    NothingToCancel,
    /// The menu elapsed with no selection.
    Expired,
}

enum Selection {
    Accepted,
    Declined,
    Expired,
}

struct Draft {
    language: String,
    code: String,
}

/// Drives a submission from draft to persisted entry, and entry removal
/// through the numbered cancel menu.
pub struct SubmissionWorkflow {
    gateway: Arc<dyn ChatGateway>,
    topic: TopicStateStore,
    repository: ParticipationRepository,
    registry: LanguageRegistry,
    grader: Autograder,
    confirm_timeout: Duration,
    max_code_chars: usize,
}

impl SubmissionWorkflow {
    pub fn new(
        gateway: Arc<dyn ChatGateway>,
        topic: TopicStateStore,
        repository: ParticipationRepository,
        registry: LanguageRegistry,
        grader: Autograder,
        config: &EngineConfig,
    ) -> Self {
        SubmissionWorkflow {
            gateway,
            topic,
            repository,
            registry,
            grader,
            confirm_timeout: config.confirm_timeout(),
            max_code_chars: config.max_code_chars,
        }
    }

    /// Runs the full submission state machine.
    ///
    /// Draft validation errors come back as `EngineError::Validation`
    /// with no state change; a declined or expired confirmation ends the
    /// run without mutation.
    #[instrument(skip(self, request), fields(submitter = %request.submitter))]
    pub async fn submit(&self, request: SubmitRequest) -> Result<SubmitOutcome, EngineError> {
        let metadata = self.topic.read().await?;
        ensure_allowed(Operation::Submit, metadata.state)?;

        let draft = self.draft(&request)?;
        info!(language = %draft.language, length = draft.code.chars().count(), "submission drafted");

        match self.confirm(&request, &draft).await? {
            Selection::Expired => {
                info!("confirmation window expired");
                return Ok(SubmitOutcome::Expired);
            }
            Selection::Declined => {
                self.notify(request.origin, "Submission cancelled.").await;
                return Ok(SubmitOutcome::Cancelled);
            }
            Selection::Accepted => {}
        }

        if metadata.has_autotests() {
            let report = self.grade(&request, &draft, &metadata.autotests).await;
            match &report.verdict {
                SuiteVerdict::AllPassed => {}
                SuiteVerdict::FailedAt { .. } => {
                    self.notify(request.origin, &render_suite_report(&report)).await;
                    return Ok(SubmitOutcome::TestsFailed(report));
                }
                SuiteVerdict::Infra { .. } => {
                    self.notify(
                        request.origin,
                        "The grading service is unavailable right now, please try again later.",
                    )
                    .await;
                    return Ok(SubmitOutcome::GraderUnavailable(report));
                }
            }
        }

        let new = NewParticipation {
            submitter: request.submitter,
            mention: request.mention.clone(),
            language: draft.language.clone(),
            code: draft.code.clone(),
            submitted_at: Utc::now(),
        };
        let existing = self
            .repository
            .find_slot(request.submitter, &draft.language, metadata.round_start())
            .await?;
        let outcome = match existing {
            Some(entry) => {
                self.repository.update(&entry, &new).await?;
                SubmitOutcome::Updated
            }
            None => {
                self.repository.create(&new).await?;
                SubmitOutcome::Created
            }
        };

        info!(language = %new.language, length = new.code_length(), "participation persisted");
        self.notify(
            request.origin,
            &format!(
                "Your {} entry ({} characters) is in. Good luck!",
                new.language,
                new.code_length()
            ),
        )
        .await;
        Ok(outcome)
    }

    /// Removes one of the requester's entries through a numbered menu.
    #[instrument(skip(self, request), fields(requester = %request.requester))]
    pub async fn cancel(&self, request: CancelRequest) -> Result<CancelOutcome, EngineError> {
        let metadata = self.topic.read().await?;
        ensure_allowed(Operation::Cancel, metadata.state)?;

        let entries = self
            .repository
            .find_by_submitter(request.requester, metadata.round_start())
            .await?;
        if entries.is_empty() {
            self.notify(
                request.origin,
                "You have no participation to cancel in this round.",
            )
            .await;
            return Ok(CancelOutcome::NothingToCancel);
        }

        let choices: Vec<(String, ParticipationEntry)> =
            entries.into_iter().take(DIGITS.len()).collect();
        let menu = render_cancel_menu(&choices);
        let message = self.gateway.post_notice(request.origin, &menu).await?;
        let glyphs: Vec<&str> = DIGITS.iter().take(choices.len()).copied().collect();
        if let Err(err) = self
            .gateway
            .add_reactions(request.origin, message, &glyphs)
            .await
        {
            warn!(error = %err, "failed to attach menu glyphs");
        }

        let filter = ReactionFilter::new(message, &glyphs, request.requester);
        let selection = self.gateway.await_reaction(filter, self.confirm_timeout).await?;
        let Some(event) = selection else {
            info!("cancel menu expired");
            return Ok(CancelOutcome::Expired);
        };
        let choice = DIGITS
            .iter()
            .position(|glyph| *glyph == event.glyph)
            .and_then(|index| choices.get(index));
        let Some((language, entry)) = choice else {
            return Ok(CancelOutcome::Expired);
        };

        self.repository.delete(entry).await?;
        info!(language = %language, "participation removed");
        self.notify(
            request.origin,
            &format!("Your {language} participation has been removed."),
        )
        .await;
        Ok(CancelOutcome::Removed {
            language: language.clone(),
        })
    }

    fn draft(&self, request: &SubmitRequest) -> Result<Draft, ValidationError> {
        let fenced = parse_fenced(&request.body).ok_or(ValidationError::MissingCodeBlock)?;

        let code = fenced.body.trim();
        if code.is_empty() {
            return Err(ValidationError::EmptyCode);
        }
        let len = code.chars().count();
        if len > self.max_code_chars {
            return Err(ValidationError::CodeTooLong {
                len,
                max: self.max_code_chars,
            });
        }

        if fenced.tag.is_empty() {
            return Err(ValidationError::MissingLanguage);
        }
        let descriptor = self
            .registry
            .resolve(&fenced.tag)
            .ok_or_else(|| ValidationError::UnknownLanguage {
                tag: fenced.tag.clone(),
            })?;
        let canonical = self.registry.collapse(descriptor);

        Ok(Draft {
            language: canonical.id.clone(),
            code: code.to_string(),
        })
    }

    async fn confirm(
        &self,
        request: &SubmitRequest,
        draft: &Draft,
    ) -> Result<Selection, EngineError> {
        let preview = render_preview(request, draft);
        let message = self.gateway.post_notice(request.origin, &preview).await?;
        if let Err(err) = self
            .gateway
            .add_reactions(request.origin, message, &[CONFIRM, DECLINE])
            .await
        {
            warn!(error = %err, "failed to attach confirmation glyphs");
        }

        let filter = ReactionFilter::new(message, &[CONFIRM, DECLINE], request.submitter);
        let selection = self.gateway.await_reaction(filter, self.confirm_timeout).await?;
        Ok(match selection {
            Some(event) if event.glyph == CONFIRM => Selection::Accepted,
            Some(_) => Selection::Declined,
            None => Selection::Expired,
        })
    }

    async fn grade(
        &self,
        request: &SubmitRequest,
        draft: &Draft,
        cases: &[TestCase],
    ) -> SuiteReport {
        let pending = vec![PENDING_GLYPH.to_string(); cases.len()];
        match self.gateway.post_notice(request.origin, &render_progress(&pending)).await {
            Ok(message) => {
                let board = ProgressBoard {
                    gateway: Arc::clone(&self.gateway),
                    channel: request.origin,
                    message,
                    cells: Mutex::new(pending),
                };
                self.grader
                    .run(&draft.language, &draft.code, cases, &board)
                    .await
            }
            Err(err) => {
                warn!(error = %err, "failed to post grading progress notice");
                self.grader
                    .run(&draft.language, &draft.code, cases, &NoopObserver)
                    .await
            }
        }
    }

    /// Post-outcome notices are best-effort: a persisted mutation is
    /// never rolled back because a notification failed.
    async fn notify(&self, channel: ChannelId, text: &str) {
        if let Err(err) = self.gateway.post_notice(channel, text).await {
            warn!(error = %err, "failed to post notice");
        }
    }
}

/// Live progress board: one cell per test case, edited into a status
/// notice as outcomes settle.
struct ProgressBoard {
    gateway: Arc<dyn ChatGateway>,
    channel: ChannelId,
    message: MessageId,
    cells: Mutex<Vec<String>>,
}

#[async_trait]
impl RunObserver for ProgressBoard {
    async fn case_settled(&self, index: usize, outcome: &CaseOutcome) {
        let text = {
            let mut cells = self.cells.lock().await;
            if let Some(cell) = cells.get_mut(index) {
                *cell = outcome_glyph(outcome).to_string();
            }
            render_progress(&cells)
        };
        if let Err(err) = self
            .gateway
            .edit_notice(self.channel, self.message, &text)
            .await
        {
            warn!(error = %err, "failed to update grading progress");
        }
    }
}

fn outcome_glyph(outcome: &CaseOutcome) -> &'static str {
    match outcome {
        CaseOutcome::Passed => CONFIRM,
        CaseOutcome::Failed(_) => DECLINE,
        CaseOutcome::Unattempted => UNATTEMPTED_GLYPH,
    }
}

fn render_progress(cells: &[String]) -> String {
    format!("Running tests: {}", cells.join(" "))
}

fn render_preview(request: &SubmitRequest, draft: &Draft) -> String {
    format!(
        "{} you are about to submit a {}-character {} entry:\n{}\nConfirm with {CONFIRM} or cancel with {DECLINE}.",
        request.mention,
        draft.code.chars().count(),
        draft.language,
        render_fenced(&draft.language, &draft.code),
    )
}

fn render_cancel_menu(choices: &[(String, ParticipationEntry)]) -> String {
    let mut lines = vec!["Select the participation to cancel:".to_string()];
    for (index, (language, entry)) in choices.iter().enumerate() {
        lines.push(format!(
            "{} {language} ({} characters)",
            DIGITS[index], entry.code_length
        ));
    }
    lines.join("\n")
}

/// Per-case report shown after a failed run.
pub fn render_suite_report(report: &SuiteReport) -> String {
    let mut lines = vec![format!(
        "Tests passed: {}/{}",
        report.passed_count(),
        report.outcomes.len()
    )];
    for (index, outcome) in report.outcomes.iter().enumerate() {
        let line = match outcome {
            CaseOutcome::Passed => format!("{}. {CONFIRM} passed", index + 1),
            CaseOutcome::Failed(FailureKind::Mismatch { expected, actual }) => format!(
                "{}. {DECLINE} expected `{expected}`, got `{actual}`",
                index + 1
            ),
            CaseOutcome::Failed(FailureKind::RuntimeError { detail }) => {
                format!("{}. {DECLINE} runtime error: {detail}", index + 1)
            }
            CaseOutcome::Unattempted => {
                format!("{}. {UNATTEMPTED_GLYPH} not attempted", index + 1)
            }
        };
        lines.push(line);
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_suite_report_rendering() {
        let report = SuiteReport {
            verdict: SuiteVerdict::FailedAt {
                index: 1,
                kind: FailureKind::Mismatch {
                    expected: "2".into(),
                    actual: "5".into(),
                },
            },
            outcomes: vec![
                CaseOutcome::Passed,
                CaseOutcome::Failed(FailureKind::Mismatch {
                    expected: "2".into(),
                    actual: "5".into(),
                }),
                CaseOutcome::Unattempted,
            ],
        };
        let rendered = render_suite_report(&report);
        assert!(rendered.starts_with("Tests passed: 1/3"));
        assert!(rendered.contains("2. \u{274c} expected `2`, got `5`"));
        assert!(rendered.contains("3. \u{2b1c} not attempted"));
    }

    #[test]
    fn test_cancel_menu_lists_digit_per_language() {
        let entry = |language: &str, length: u32| ParticipationEntry {
            submitter: UserId(1),
            mention: "@a".into(),
            language: language.into(),
            code: "x".repeat(length as usize),
            code_length: length,
            submitted_at: Utc::now(),
            message: MessageId(9),
        };
        let menu = render_cancel_menu(&[
            ("javascript".to_string(), entry("javascript", 12)),
            ("python".to_string(), entry("python", 8)),
        ]);
        assert!(menu.contains("1\u{fe0f}\u{20e3} javascript (12 characters)"));
        assert!(menu.contains("2\u{fe0f}\u{20e3} python (8 characters)"));
    }
}
