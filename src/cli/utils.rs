//! Shared CLI utilities.

use anyhow::Result;
use clap::Args;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::config::{load_settings, merge_cli_with_config, CliOverrides, Settings};
use crate::domain::{LoadedQuestion, SourceMode};
use crate::llm::{ChatClient, OpenAiChatClient};
use crate::load::{DirectoryLoader, TabularLoader};
use crate::pool::BatchReport;

/// Default ledger file name inside the question directory.
pub const DEFAULT_LEDGER: &str = "results.csv";

/// Parse a comma-separated string into a `Vec<String>`, trimming whitespace and
/// discarding empty segments.  Returns `None` when `value` is `None`.
pub fn parse_csv(value: &Option<String>) -> Option<Vec<String>> {
    value.as_ref().map(|s| {
        s.split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(|part| part.to_string())
            .collect::<Vec<_>>()
    })
}

/// Where questions come from and where results go.
#[derive(Args, Debug, Clone)]
pub struct SourceArgs {
    /// Question directory root (one folder per question)
    #[arg(short, long, value_name = "DIR", default_value = "data")]
    pub dir: PathBuf,

    /// Read questions from this CSV instead; folders are created under --dir
    #[arg(long, value_name = "FILE")]
    pub csv: Option<PathBuf>,

    /// Result ledger CSV [default: <DIR>/results.csv]
    #[arg(short, long, value_name = "FILE")]
    pub ledger: Option<PathBuf>,

    /// Process at most this many questions
    #[arg(short = 'n', long, value_name = "N")]
    pub limit: Option<usize>,

    /// Skip this many questions first
    #[arg(long, value_name = "N", default_value_t = 0)]
    pub skip: usize,

    /// Walk question folders in descending name order
    #[arg(long)]
    pub reverse: bool,
}

impl SourceArgs {
    pub fn ledger_path(&self) -> PathBuf {
        self.ledger.clone().unwrap_or_else(|| self.dir.join(DEFAULT_LEDGER))
    }

    pub fn mode(&self) -> SourceMode {
        if self.csv.is_some() {
            SourceMode::Tabular
        } else {
            SourceMode::Directory
        }
    }

    /// Load questions, applying skip, order and limit. In CSV mode only the
    /// `candidate_model` answer column is used when one is given.
    pub fn load(&self, candidate_model: Option<&str>) -> Result<Vec<LoadedQuestion>> {
        let limit = self.limit.unwrap_or(usize::MAX);
        let items: Vec<LoadedQuestion> = match &self.csv {
            Some(csv) => TabularLoader::new(csv, &self.dir)
                .candidate_model(candidate_model)
                .skip(self.skip)
                .load()?
                .take(limit)
                .collect(),
            None => DirectoryLoader::new(&self.dir)
                .reverse(self.reverse)
                .skip(self.skip)
                .load()?
                .take(limit)
                .collect(),
        };
        tracing::info!("Loaded {} questions from {}", items.len(), self.origin().display());
        Ok(items)
    }

    fn origin(&self) -> &Path {
        self.csv.as_deref().unwrap_or(&self.dir)
    }
}

/// Model endpoint and worker flags shared by every LLM-backed command.
#[derive(Args, Debug, Clone)]
pub struct LlmArgs {
    /// Path to config file (stack-eval.toml or stack-eval.yaml)
    #[arg(short = 'c', long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Model name [default: gpt-4o]
    #[arg(short, long, value_name = "MODEL")]
    pub model: Option<String>,

    /// Chat completions endpoint
    #[arg(long, value_name = "URL")]
    pub base_url: Option<String>,

    /// API key (defaults to OPENAI_API_KEY)
    #[arg(long, value_name = "KEY")]
    pub api_key: Option<String>,

    /// Number of concurrent workers
    #[arg(short = 'w', long, value_name = "N")]
    pub workers: Option<usize>,

    /// Redo work whose output already exists
    #[arg(short, long)]
    pub force: bool,
}

impl LlmArgs {
    pub fn overrides(&self) -> CliOverrides {
        CliOverrides {
            model: self.model.clone(),
            base_url: self.base_url.clone(),
            api_key: self.api_key.clone(),
            ..CliOverrides::default()
        }
    }
}

/// Settings from defaults, config file, environment, then `overrides`.
pub fn settings(config: Option<&Path>, overrides: CliOverrides) -> Result<Settings> {
    let cwd = std::env::current_dir()?;
    let file_settings = load_settings(&cwd, config)?;
    Ok(merge_cli_with_config(file_settings, overrides))
}

pub fn chat_client(settings: &Settings, model: &str) -> Result<Arc<dyn ChatClient>> {
    let client = OpenAiChatClient::new(&settings.llm, model)?;
    tracing::debug!("Using {} at {}", model, client.url());
    Ok(Arc::new(client))
}

pub fn print_report(command: &str, report: &BatchReport, elapsed: Duration) {
    println!();
    println!("{}", console::style(format!("{command} complete!")).green().bold());
    println!();
    println!("Statistics:");
    println!("  Submitted:  {}", report.submitted);
    println!("  Completed:  {}", report.completed);
    println!("  Skipped:    {}", report.skipped);
    println!("  Failed:     {}", report.failed);
    println!("  Time:       {:.2}s", elapsed.as_secs_f64());
}
