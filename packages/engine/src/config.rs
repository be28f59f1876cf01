use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

use common::{
    EquivalenceGroup, LanguageConfigError, LanguageDescriptor, LanguageRegistry,
};
use grader::GraderConfig;

/// Contest engine settings.
#[derive(Debug, Deserialize, Clone)]
pub struct EngineConfig {
    /// Channel holding the topic metadata and participation records.
    pub code_channel: u64,
    /// Seconds an interactive menu waits for a selection.
    #[serde(default = "default_confirm_timeout_secs")]
    pub confirm_timeout_secs: u64,
    /// Upper bound on submitted code, in characters.
    #[serde(default = "default_max_code_chars")]
    pub max_code_chars: usize,
}

fn default_confirm_timeout_secs() -> u64 {
    120
}

fn default_max_code_chars() -> usize {
    1000
}

impl EngineConfig {
    pub fn confirm_timeout(&self) -> Duration {
        Duration::from_secs(self.confirm_timeout_secs)
    }
}

/// Language set override, replacing the built-in one wholesale.
#[derive(Debug, Deserialize, Clone)]
pub struct LanguageSetConfig {
    pub languages: Vec<LanguageDescriptor>,
    #[serde(default)]
    pub groups: Vec<EquivalenceGroup>,
}

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub engine: EngineConfig,
    #[serde(default)]
    pub grader: GraderConfig,
    /// When absent, `LanguageRegistry::default_set()` applies.
    #[serde(default)]
    pub languages: Option<LanguageSetConfig>,
}

impl AppConfig {
    /// Builds the validated registry from the configured set, or the
    /// built-in set when none is configured.
    pub fn language_registry(&self) -> Result<LanguageRegistry, LanguageConfigError> {
        match &self.languages {
            Some(set) => LanguageRegistry::new(set.languages.clone(), set.groups.clone()),
            None => Ok(LanguageRegistry::default_set()),
        }
    }

    pub fn load() -> Result<Self, ConfigError> {
        let s = Config::builder()
            .set_default("engine.confirm_timeout_secs", 120)?
            .set_default("engine.max_code_chars", 1000)?
            .set_default("grader.base_url", "https://emkc.org/api/v2/piston")?
            .set_default("grader.call_deadline_ms", 15_000)?
            .set_default("grader.inter_call_delay_ms", 1_000)?
            // Load from config/config.toml
            .add_source(File::with_name("config/config").required(false))
            // Override from environment (e.g., GOLFBOT__ENGINE__CODE_CHANNEL)
            .add_source(Environment::with_prefix("GOLFBOT").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
