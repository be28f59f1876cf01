use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::error::ExecError;
use super::{ExecOutcome, ExecRequest, ExecutionService, ExitInfo, snippet};

const DETAIL_LIMIT: usize = 200;

/// Client for a Piston-compatible code execution API.
///
/// Servers pick the installed version for us (`version: "*"`), so the
/// request carries only language, source and argument list.
pub struct PistonClient {
    http: Client,
    base_url: String,
}

impl PistonClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        PistonClient {
            http: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[derive(Serialize)]
struct ExecuteBody<'a> {
    language: &'a str,
    version: &'a str,
    files: Vec<FileBody<'a>>,
    args: &'a [String],
}

#[derive(Serialize)]
struct FileBody<'a> {
    content: &'a str,
}

#[derive(Deserialize)]
struct ExecuteResponse {
    run: StageResponse,
    #[serde(default)]
    compile: Option<StageResponse>,
}

#[derive(Deserialize)]
struct StageResponse {
    #[serde(default)]
    stdout: String,
    #[serde(default)]
    stderr: String,
    #[serde(default)]
    code: Option<i32>,
    #[serde(default)]
    signal: Option<String>,
}

fn stage_outcome(stage: StageResponse) -> ExecOutcome {
    ExecOutcome {
        stdout: stage.stdout,
        stderr: stage.stderr,
        exit: ExitInfo {
            code: stage.code,
            signal: stage.signal,
        },
    }
}

/// A failed compile stage settles the outcome; the run stage never ran.
fn fold_response(response: ExecuteResponse) -> ExecOutcome {
    if let Some(compile) = response.compile {
        let outcome = stage_outcome(compile);
        if outcome.crashed() {
            return outcome;
        }
    }
    stage_outcome(response.run)
}

#[async_trait]
impl ExecutionService for PistonClient {
    async fn execute(&self, request: ExecRequest) -> Result<ExecOutcome, ExecError> {
        let body = ExecuteBody {
            language: &request.language,
            version: "*",
            files: vec![FileBody {
                content: &request.source,
            }],
            args: &request.args,
        };

        debug!(language = %request.language, args = request.args.len(), "calling execution sandbox");
        let response = self
            .http
            .post(format!("{}/execute", self.base_url))
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let detail = snippet(&response.text().await.unwrap_or_default(), DETAIL_LIMIT);
            return Err(ExecError::Api {
                status: status.as_u16(),
                detail,
            });
        }

        let parsed: ExecuteResponse = response
            .json()
            .await
            .map_err(|e| ExecError::Malformed(e.to_string()))?;
        Ok(fold_response(parsed))
    }
}
