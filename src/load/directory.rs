//! Loader over a tree of previously fetched question directories.

use crate::domain::{parse_timestamp, Answer, AnswerRole, LoadedQuestion, Question};
use crate::store::artifacts::{ArtifactDir, COMBINED_FILE, METADATA_FILE};
use crate::store::document;
use anyhow::{Context, Result};
use chrono::Utc;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Scans the immediate subdirectories of `root`, sorted by name.
pub struct DirectoryLoader {
    root: PathBuf,
    reverse: bool,
    skip: usize,
}

impl DirectoryLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into(), reverse: false, skip: 0 }
    }

    /// Sort directory names descending instead of ascending.
    pub fn reverse(mut self, reverse: bool) -> Self {
        self.reverse = reverse;
        self
    }

    /// Drop the first `n` directories after sorting.
    pub fn skip(mut self, n: usize) -> Self {
        self.skip = n;
        self
    }

    /// Directories are listed up front; each one is parsed as the iterator
    /// reaches it. Unparsable directories are logged and skipped.
    pub fn load(self) -> Result<impl Iterator<Item = LoadedQuestion>> {
        if !self.root.is_dir() {
            anyhow::bail!("Question directory not found: {}", self.root.display());
        }

        let mut dirs: Vec<PathBuf> = WalkDir::new(&self.root)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_dir())
            .map(|e| e.into_path())
            .collect();
        if self.reverse {
            dirs.reverse();
        }
        tracing::debug!("Found {} question directories under {}", dirs.len(), self.root.display());

        Ok(dirs.into_iter().skip(self.skip).filter_map(|dir| match load_question_dir(&dir) {
            Ok(question) => Some(LoadedQuestion { dir, question }),
            Err(e) => {
                tracing::warn!("Skipping {}: {:#}", dir.display(), e);
                None
            }
        }))
    }
}

/// Build a question from `metadata.json` plus `question_answer.md`.
pub fn load_question_dir(dir: &Path) -> Result<Question> {
    let artifacts = ArtifactDir::new(dir);
    for required in [METADATA_FILE, COMBINED_FILE] {
        if !artifacts.path(required).is_file() {
            anyhow::bail!("missing {}", required);
        }
    }

    let sidecar = artifacts.read_sidecar()?;
    let combined = std::fs::read_to_string(artifacts.path(COMBINED_FILE))
        .with_context(|| format!("Failed to read {}", COMBINED_FILE))?;
    let doc = document::parse(&combined);

    let created_at = parse_timestamp(&sidecar.created_at)
        .or(doc.created_at)
        .unwrap_or_else(Utc::now);

    let answers = doc
        .answers
        .into_iter()
        .enumerate()
        .map(|(idx, parsed)| Answer {
            id: parsed.id.unwrap_or(idx as u64 + 1),
            body: parsed.body,
            created_at: parsed.created_at.unwrap_or(created_at),
            accepted: parsed.accepted,
            score: parsed.score,
            link: parsed.link,
            role: AnswerRole::Reference,
        })
        .collect();

    Ok(Question {
        id: sidecar.question_id,
        title: first_non_empty(sidecar.title, doc.title),
        body: first_non_empty(sidecar.body, doc.body),
        tags: if sidecar.tags.is_empty() { doc.tags } else { sidecar.tags },
        created_at,
        link: first_non_empty(sidecar.link, doc.link),
        answers,
    })
}

fn first_non_empty(preferred: String, fallback: String) -> String {
    if preferred.trim().is_empty() {
        fallback
    } else {
        preferred
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_question(root: &Path, name: &str, id: u64, title: &str) {
        let dir = root.join(name);
        fs::create_dir_all(&dir).unwrap();
        fs::write(
            dir.join(METADATA_FILE),
            format!(
                r#"{{"question_id": {id}, "link": "https://stackoverflow.com/q/{id}", "tags": ["kubernetes"], "created_at": "2023-02-01T10:00:00", "answer_count": 1}}"#
            ),
        )
        .unwrap();
        fs::write(
            dir.join(COMBINED_FILE),
            format!(
                "# {title}\nLink: x\nCreated: 2023-02-01T10:00:00\nTags: kubernetes\n\n## Question\nBody of {id}\n\n## Answers\n### Answer 1\nAccepted: True\nScore: 4\nLink: https://stackoverflow.com/a/{}\nCreated: 2023-02-02T10:00:00\n\nHuman answer {id}\n",
                id + 1
            ),
        )
        .unwrap();
    }

    fn fixture() -> TempDir {
        let tmp = TempDir::new().expect("tmp");
        write_question(tmp.path(), "20230101_a", 1, "First");
        write_question(tmp.path(), "20230102_b", 2, "Second");
        write_question(tmp.path(), "20230103_c", 3, "Third");
        fs::create_dir_all(tmp.path().join("20230104_incomplete")).unwrap();
        fs::write(tmp.path().join("20230104_incomplete").join(METADATA_FILE), "{}").unwrap();
        fs::write(tmp.path().join("stray.txt"), "not a directory").unwrap();
        tmp
    }

    #[test]
    fn test_sorted_and_incomplete_skipped() {
        let tmp = fixture();
        let ids: Vec<u64> =
            DirectoryLoader::new(tmp.path()).load().unwrap().map(|lq| lq.question.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn test_reverse_then_skip() {
        let tmp = fixture();
        let ids: Vec<u64> = DirectoryLoader::new(tmp.path())
            .reverse(true)
            .skip(2)
            .load()
            .unwrap()
            .map(|lq| lq.question.id)
            .collect();
        // incomplete, c, b, a -> skip two -> b, a
        assert_eq!(ids, vec![2, 1]);
    }

    #[test]
    fn test_question_fields_and_reference_role() {
        let tmp = fixture();
        let first = DirectoryLoader::new(tmp.path()).load().unwrap().next().unwrap();
        let q = first.question;

        assert_eq!(first.dir, tmp.path().join("20230101_a"));
        assert_eq!(q.title, "First", "title falls back to the document heading");
        assert_eq!(q.body, "Body of 1");
        assert_eq!(q.link, "https://stackoverflow.com/q/1");
        assert_eq!(q.answers.len(), 1);

        let reference = q.reference().unwrap();
        assert_eq!(reference.id, 2);
        assert!(reference.accepted);
        assert_eq!(reference.body, "Human answer 1");
        assert!(q.candidate().is_none());
    }

    #[test]
    fn test_missing_root_is_error() {
        let tmp = TempDir::new().expect("tmp");
        assert!(DirectoryLoader::new(tmp.path().join("nope")).load().is_err());
    }
}
