use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use common::{CaseOutcome, FailureKind, SuiteReport, SuiteVerdict, TestCase};
use tokio::time::{sleep, timeout};
use tracing::{error, info};
use uuid::Uuid;

use crate::config::GraderConfig;
use crate::sandbox::error::ExecError;
use crate::sandbox::{ExecOutcome, ExecRequest, ExecutionService, snippet};

const STDERR_LIMIT: usize = 300;

/// Receives each case outcome as it settles, in test order.
///
/// Unattempted cases are reported too, so callers rendering a live
/// progress board see every slot filled by the end of the run.
#[async_trait]
pub trait RunObserver: Send + Sync {
    async fn case_settled(&self, index: usize, outcome: &CaseOutcome);
}

/// Observer that discards progress updates.
pub struct NoopObserver;

#[async_trait]
impl RunObserver for NoopObserver {
    async fn case_settled(&self, _index: usize, _outcome: &CaseOutcome) {}
}

/// Runs a submission against an ordered test list, one sandbox call per
/// case, stopping at the first case that does not pass.
pub struct Autograder {
    service: Arc<dyn ExecutionService>,
    inter_call_delay: Duration,
    call_deadline: Duration,
}

impl Autograder {
    pub fn new(service: Arc<dyn ExecutionService>, config: &GraderConfig) -> Self {
        Autograder {
            service,
            inter_call_delay: config.inter_call_delay(),
            call_deadline: config.call_deadline(),
        }
    }

    /// Grades `source` against `cases` sequentially.
    ///
    /// Never fails: sandbox faults abort the run and come back as an
    /// `Infra` verdict, with the interrupted and remaining cases marked
    /// unattempted.
    pub async fn run(
        &self,
        language: &str,
        source: &str,
        cases: &[TestCase],
        observer: &dyn RunObserver,
    ) -> SuiteReport {
        let run_id = Uuid::new_v4();
        info!(%run_id, language, cases = cases.len(), "starting autograder run");

        let mut outcomes: Vec<CaseOutcome> = Vec::with_capacity(cases.len());
        let mut verdict = SuiteVerdict::AllPassed;

        for (index, case) in cases.iter().enumerate() {
            if index > 0 {
                sleep(self.inter_call_delay).await;
            }

            let settled = match self.execute_case(language, source, case).await {
                Ok(outcome) => outcome,
                Err(err) => {
                    error!(%run_id, index, error = %err, "sandbox fault aborted the run");
                    verdict = SuiteVerdict::Infra {
                        detail: err.to_string(),
                    };
                    break;
                }
            };

            observer.case_settled(index, &settled).await;
            let failure = match &settled {
                CaseOutcome::Failed(kind) => Some(kind.clone()),
                _ => None,
            };
            outcomes.push(settled);

            if let Some(kind) = failure {
                verdict = SuiteVerdict::FailedAt { index, kind };
                break;
            }
        }

        for index in outcomes.len()..cases.len() {
            let settled = CaseOutcome::Unattempted;
            observer.case_settled(index, &settled).await;
            outcomes.push(settled);
        }

        let report = SuiteReport { verdict, outcomes };
        info!(%run_id, passed = report.passed_count(), total = cases.len(), "autograder run finished");
        report
    }

    async fn execute_case(
        &self,
        language: &str,
        source: &str,
        case: &TestCase,
    ) -> Result<CaseOutcome, ExecError> {
        let request = ExecRequest {
            language: language.to_string(),
            source: source.to_string(),
            args: case.args.clone(),
        };

        let outcome = match timeout(self.call_deadline, self.service.execute(request)).await {
            Ok(result) => result?,
            Err(_) => return Err(ExecError::Deadline(self.call_deadline)),
        };

        if outcome.crashed() {
            return Ok(CaseOutcome::Failed(FailureKind::RuntimeError {
                detail: crash_detail(&outcome),
            }));
        }

        let actual = normalize_output(&outcome.stdout);
        if actual == case.expected {
            Ok(CaseOutcome::Passed)
        } else {
            Ok(CaseOutcome::Failed(FailureKind::Mismatch {
                expected: case.expected.clone(),
                actual,
            }))
        }
    }
}

/// Strips trailing whitespace from each line and drops trailing blank
/// lines. Interior blank lines and leading whitespace are significant.
pub fn normalize_output(raw: &str) -> String {
    let mut lines: Vec<&str> = raw.split('\n').map(|line| line.trim_end()).collect();
    while lines.last().is_some_and(|line| line.is_empty()) {
        lines.pop();
    }
    lines.join("\n")
}

fn crash_detail(outcome: &ExecOutcome) -> String {
    let stderr = snippet(&outcome.stderr, STDERR_LIMIT);
    if !stderr.is_empty() {
        return stderr;
    }
    match (&outcome.exit.code, &outcome.exit.signal) {
        (_, Some(signal)) => format!("killed by {signal}"),
        (Some(code), None) => format!("exit code {code}"),
        (None, None) => "no exit status reported".to_string(),
    }
}
