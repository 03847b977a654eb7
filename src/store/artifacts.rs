//! Per-question artifact directory.

use crate::domain::Question;
use crate::store::ledger::DATE_FORMAT;
use anyhow::{Context, Result};
use globset::{Glob, GlobMatcher};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

pub const METADATA_FILE: &str = "metadata.json";
pub const COMBINED_FILE: &str = "question_answer.md";
pub const COMBINED_TRANSLATED_FILE: &str = "question_answer_translated.md";
pub const TRANSLATION_RAW_FILE: &str = "translation_raw.json";

static ANSWER_FILES: Lazy<GlobMatcher> =
    Lazy::new(|| Glob::new("*_answer.md").expect("valid glob").compile_matcher());

pub fn answer_file(tok: &str) -> String {
    format!("{tok}_answer.md")
}

pub fn answer_raw_file(tok: &str) -> String {
    format!("{tok}_answer_raw.json")
}

pub fn answer_translated_file(tok: &str) -> String {
    format!("{tok}_answer_translated.md")
}

pub fn evaluation_file(eval_tok: &str, answer_tok: &str) -> String {
    format!("{eval_tok}_evaluate_{answer_tok}_answer.md")
}

pub fn evaluation_raw_file(eval_tok: &str, answer_tok: &str) -> String {
    format!("{eval_tok}_evaluate_{answer_tok}_answer_raw.json")
}

pub fn lint_log_file(tok: &str) -> String {
    format!("{tok}_lint.log")
}

pub fn coverage_file(tok: &str) -> String {
    format!("{tok}_coverage.json")
}

fn compare_stem(tok: &str, no_reference: bool) -> String {
    if no_reference {
        format!("{tok}_compare_no_reference")
    } else {
        format!("{tok}_compare")
    }
}

pub fn compare_prompt_file(tok: &str, no_reference: bool) -> String {
    format!("{}_prompt.txt", compare_stem(tok, no_reference))
}

pub fn compare_result_file(tok: &str, no_reference: bool) -> String {
    format!("{}_result.md", compare_stem(tok, no_reference))
}

pub fn compare_raw_file(tok: &str, no_reference: bool) -> String {
    format!("{}_result_raw.json", compare_stem(tok, no_reference))
}

/// Sidecar `metadata.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sidecar {
    pub question_id: u64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub link: String,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub answer_count: usize,
}

impl Sidecar {
    pub fn from_question(question: &Question) -> Self {
        Self {
            question_id: question.id,
            title: question.title.clone(),
            body: question.body.clone(),
            tags: question.tags.clone(),
            link: question.link.clone(),
            created_at: question.created_at.format(DATE_FORMAT).to_string(),
            answer_count: question.answers.len(),
        }
    }
}

/// A question's directory and the files inside it.
#[derive(Debug, Clone)]
pub struct ArtifactDir {
    dir: PathBuf,
}

impl ArtifactDir {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    /// A file counts as done when it exists and is not empty.
    pub fn is_done(&self, name: &str) -> bool {
        fs::metadata(self.path(name)).map(|m| m.is_file() && m.len() > 0).unwrap_or(false)
    }

    /// Contents of `name` if it holds anything besides whitespace.
    pub fn read(&self, name: &str) -> Option<String> {
        let text = fs::read_to_string(self.path(name)).ok()?;
        if text.trim().is_empty() {
            None
        } else {
            Some(text)
        }
    }

    pub fn write(&self, name: &str, contents: &str) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path(name);
        fs::write(&path, contents).with_context(|| format!("Failed to write {}", path.display()))
    }

    pub fn write_json(&self, name: &str, value: &Value) -> Result<()> {
        self.write(name, &serde_json::to_string_pretty(value)?)
    }

    pub fn read_sidecar(&self) -> Result<Sidecar> {
        let path = self.path(METADATA_FILE);
        let text = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("Invalid sidecar {}", path.display()))
    }

    /// Write the sidecar and the combined question/answers document.
    pub fn save_question(&self, question: &Question) -> Result<()> {
        let sidecar = serde_json::to_value(Sidecar::from_question(question))?;
        self.write_json(METADATA_FILE, &sidecar)?;
        self.write(COMBINED_FILE, &super::document::render(question))
    }

    /// File names directly inside the directory, sorted.
    pub fn file_names(&self) -> Vec<String> {
        let mut names: Vec<String> = walkdir::WalkDir::new(&self.dir)
            .min_depth(1)
            .max_depth(1)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter_map(|e| e.file_name().to_str().map(str::to_string))
            .collect();
        names.sort();
        names
    }

    /// `(token, file name)` for every `{tok}_answer.md` model answer, leaving
    /// out the combined document, judge output and comparison files.
    pub fn model_answer_files(&self) -> Vec<(String, String)> {
        self.file_names()
            .into_iter()
            .filter(|name| name != COMBINED_FILE && ANSWER_FILES.is_match(name))
            .filter_map(|name| {
                let tok = name.strip_suffix("_answer.md")?.to_string();
                let excluded =
                    tok.is_empty() || tok.contains("_evaluate_") || tok.contains("_compare");
                (!excluded).then_some((tok, name))
            })
            .collect()
    }
}
