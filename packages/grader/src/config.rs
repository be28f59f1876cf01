use std::time::Duration;

use serde::Deserialize;

/// Autograder settings.
#[derive(Debug, Clone, Deserialize)]
pub struct GraderConfig {
    /// Base URL of the Piston-compatible execution API.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Deadline for a single sandbox call, in milliseconds.
    #[serde(default = "default_call_deadline_ms")]
    pub call_deadline_ms: u64,
    /// Pause between successive sandbox calls, in milliseconds. The
    /// public Piston instance rate-limits aggressively.
    #[serde(default = "default_inter_call_delay_ms")]
    pub inter_call_delay_ms: u64,
}

fn default_base_url() -> String {
    "https://emkc.org/api/v2/piston".to_string()
}

fn default_call_deadline_ms() -> u64 {
    15_000
}

fn default_inter_call_delay_ms() -> u64 {
    1_000
}

impl Default for GraderConfig {
    fn default() -> Self {
        GraderConfig {
            base_url: default_base_url(),
            call_deadline_ms: default_call_deadline_ms(),
            inter_call_delay_ms: default_inter_call_delay_ms(),
        }
    }
}

impl GraderConfig {
    pub fn call_deadline(&self) -> Duration {
        Duration::from_millis(self.call_deadline_ms)
    }

    pub fn inter_call_delay(&self) -> Duration {
        Duration::from_millis(self.inter_call_delay_ms)
    }
}
