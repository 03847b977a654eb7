//! Configuration loading and merging
//!
//! Handles loading from config files, environment variables, and CLI arguments
//! with proper precedence (CLI > Env > File > Defaults).

pub mod loader;
pub mod merge;

pub use loader::load_settings;
pub use merge::{merge_cli_with_config, CliOverrides};

use serde::{Deserialize, Serialize};

pub const DEFAULT_MODEL: &str = "gpt-4o";
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1/chat/completions";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Model whose answers are generated and scored.
    pub model: String,
    /// Model used as judge; falls back to `model`.
    pub eval_model: Option<String>,
    pub llm: LlmSettings,
    pub workers: WorkerSettings,
    pub lint: LintSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            eval_model: None,
            llm: LlmSettings::default(),
            workers: WorkerSettings::default(),
            lint: LintSettings::default(),
        }
    }
}

impl Settings {
    pub fn eval_model(&self) -> &str {
        self.eval_model.as_deref().unwrap_or(&self.model)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    pub base_url: String,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
    /// Total attempts for a request answered with a 5xx status.
    pub max_retries: u32,
    pub retry_backoff_secs: u64,
    pub temperature: f32,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            timeout_secs: 60,
            max_retries: 3,
            retry_backoff_secs: 2,
            temperature: 0.2,
        }
    }
}

/// Thread pool sizes, one per batch command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerSettings {
    pub answer: usize,
    pub translate: usize,
    pub evaluate: usize,
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self { answer: 2, translate: 2, evaluate: 2 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LintSettings {
    pub validators: Vec<ValidatorSpec>,
}

impl Default for LintSettings {
    fn default() -> Self {
        Self {
            validators: vec![
                ValidatorSpec::new("kubeval", "kubeval", &["{file}"], 30),
                ValidatorSpec::new("datree", "datree", &["test", "{file}"], 60),
                ValidatorSpec::new(
                    "dryrun",
                    "kubectl",
                    &["apply", "--dry-run=client", "-f", "{file}"],
                    30,
                ),
            ],
        }
    }
}

/// An external structural validator invoked once per extracted YAML block.
/// `{file}` in `args` is replaced with the path of the block's temp file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidatorSpec {
    pub name: String,
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default = "default_validator_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl ValidatorSpec {
    pub fn new(name: &str, program: &str, args: &[&str], timeout_secs: u64) -> Self {
        Self {
            name: name.to_string(),
            program: program.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
            timeout_secs,
            enabled: true,
        }
    }
}

fn default_validator_timeout() -> u64 {
    30
}

fn default_true() -> bool {
    true
}
