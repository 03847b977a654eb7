//! Core domain types shared across loaders, stores and evaluators.

use chrono::{DateTime, NaiveDateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Which side of a comparison an answer sits on.
///
/// Attached by the loader that produced the answer, so no caller ever has to
/// guess from an answer's position in the list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnswerRole {
    /// Machine-generated answer being scored.
    Candidate,
    /// Human/gold answer used as the scoring baseline.
    Reference,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    pub id: u64,
    pub body: String,
    pub created_at: DateTime<Utc>,
    pub accepted: bool,
    pub score: i64,
    pub link: String,
    pub role: AnswerRole,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub id: u64,
    pub title: String,
    pub body: String,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub link: String,
    pub answers: Vec<Answer>,
}

impl Question {
    /// First answer tagged as the candidate being scored.
    pub fn candidate(&self) -> Option<&Answer> {
        self.answers.iter().find(|a| a.role == AnswerRole::Candidate)
    }

    /// First answer tagged as the human reference.
    pub fn reference(&self) -> Option<&Answer> {
        self.answers.iter().find(|a| a.role == AnswerRole::Reference)
    }

    pub fn references(&self) -> impl Iterator<Item = &Answer> {
        self.answers.iter().filter(|a| a.role == AnswerRole::Reference)
    }
}

/// Where a batch of questions came from. Decides content-resolution priority
/// in the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceMode {
    Directory,
    Tabular,
}

/// A question together with the directory holding its artifacts.
#[derive(Debug, Clone)]
pub struct LoadedQuestion {
    pub dir: std::path::PathBuf,
    pub question: Question,
}

impl LoadedQuestion {
    /// Short label used in log lines.
    pub fn label(&self) -> String {
        self.question.id.to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EvalModule {
    Lint,
    Coverage,
    LlmEval,
    Compare,
}

impl EvalModule {
    pub const ALL: [EvalModule; 4] =
        [EvalModule::Lint, EvalModule::Coverage, EvalModule::LlmEval, EvalModule::Compare];

    pub fn as_str(&self) -> &'static str {
        match self {
            EvalModule::Lint => "lint",
            EvalModule::Coverage => "coverage",
            EvalModule::LlmEval => "llm-eval",
            EvalModule::Compare => "compare",
        }
    }

    /// Expand a list of module names; empty input or `all` selects every module.
    pub fn parse_set<S: AsRef<str>>(names: &[S]) -> anyhow::Result<BTreeSet<EvalModule>> {
        if names.is_empty() || names.iter().any(|n| n.as_ref().trim() == "all") {
            return Ok(Self::ALL.into_iter().collect());
        }
        names.iter().map(|n| n.as_ref().parse()).collect()
    }
}

impl FromStr for EvalModule {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lint" => Ok(EvalModule::Lint),
            "coverage" => Ok(EvalModule::Coverage),
            "llm-eval" | "llm_eval" | "eval" => Ok(EvalModule::LlmEval),
            "compare" => Ok(EvalModule::Compare),
            other => anyhow::bail!(
                "Invalid evaluation module '{}'. Expected one of: lint, coverage, llm-eval, compare, all",
                other
            ),
        }
    }
}

impl fmt::Display for EvalModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

static NON_TOKEN_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-zA-Z0-9_]+").expect("valid regex"));
static REPEATED_UNDERSCORES: Lazy<Regex> = Lazy::new(|| Regex::new(r"_+").expect("valid regex"));

/// Normalize a model name into the token used in file names and ledger columns.
///
/// Examples:
/// - `gpt-4.1`           → `gpt4_1`
/// - `gpt-4.1-mini`      → `gpt4_1mini`
/// - `o1-preview`        → `o1preview`
/// - `claude-3.5-sonnet` → `claude3_5sonnet`
/// - `gpt-4o:eastus`     → `gpt4o` (deployment suffix dropped)
pub fn model_token(model: &str) -> String {
    let name = model.split(':').next().unwrap_or("");
    let name = name.replace('.', "_");
    let token = NON_TOKEN_CHARS.replace_all(&name, "").to_lowercase();
    let token = REPEATED_UNDERSCORES.replace_all(&token, "_");
    let token = token.trim_matches('_');
    if token.is_empty() {
        "model".to_string()
    } else {
        token.to_string()
    }
}

/// Parse an ISO-8601 timestamp, with or without offset. Naive values are taken as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(naive.and_utc());
        }
    }
    None
}
