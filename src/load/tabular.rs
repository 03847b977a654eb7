//! Loader over a wide CSV, typically a ledger written by an earlier run.

use super::{candidate_column_token, is_candidate_column};
use crate::domain::{model_token, parse_timestamp, Answer, AnswerRole, LoadedQuestion, Question};
use crate::store::ledger::{parse_id, ID_COLUMN};
use crate::text::tabular_dir_name;
use anyhow::{Context, Result};
use chrono::Utc;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

type Row = HashMap<String, String>;

pub struct TabularLoader {
    csv_path: PathBuf,
    out_dir: PathBuf,
    candidate_model: Option<String>,
    skip: usize,
}

impl TabularLoader {
    /// Rows of `csv_path` become questions whose directories live under `out_dir`.
    pub fn new(csv_path: impl Into<PathBuf>, out_dir: impl Into<PathBuf>) -> Self {
        Self { csv_path: csv_path.into(), out_dir: out_dir.into(), candidate_model: None, skip: 0 }
    }

    /// Only take the candidate answer from this model's `{model}_Answer` column.
    pub fn candidate_model(mut self, model: Option<&str>) -> Self {
        self.candidate_model = model.map(model_token);
        self
    }

    pub fn skip(mut self, n: usize) -> Self {
        self.skip = n;
        self
    }

    /// Every row is read before the first question is yielded, so the CSV may be
    /// rewritten while the iterator is consumed.
    pub fn load(self) -> Result<impl Iterator<Item = LoadedQuestion>> {
        let (headers, rows) = read_rows(&self.csv_path)?;
        tracing::info!("Read {} rows from {}", rows.len(), self.csv_path.display());

        let candidate_columns: Vec<String> = headers
            .into_iter()
            .filter(|h| match &self.candidate_model {
                Some(tok) => candidate_column_token(h).as_deref() == Some(tok.as_str()),
                None => is_candidate_column(h),
            })
            .collect();
        if candidate_columns.is_empty() {
            tracing::warn!("No candidate answer columns in {}", self.csv_path.display());
        }

        let out_dir = self.out_dir;
        Ok(rows.into_iter().skip(self.skip).filter_map(move |(line, row)| {
            match row_to_question(&row, &candidate_columns, &out_dir) {
                Ok(loaded) => Some(loaded),
                Err(e) => {
                    tracing::warn!("Skipping CSV row {}: {:#}", line, e);
                    None
                }
            }
        }))
    }
}

fn read_rows(path: &Path) -> Result<(Vec<String>, Vec<(usize, Row)>)> {
    if !path.is_file() {
        anyhow::bail!("CSV file not found: {}", path.display());
    }
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;
    let headers: Vec<String> = reader.headers()?.iter().map(|h| h.trim().to_string()).collect();

    let mut rows = Vec::new();
    for (idx, record) in reader.records().enumerate() {
        let line = idx + 2;
        match record {
            Ok(record) => {
                let row: Row = headers
                    .iter()
                    .zip(record.iter())
                    .map(|(h, v)| (h.clone(), v.to_string()))
                    .collect();
                rows.push((line, row));
            }
            Err(e) => tracing::warn!("Skipping unreadable CSV row {}: {}", line, e),
        }
    }
    Ok((headers, rows))
}

fn cell<'a>(row: &'a Row, column: &str) -> &'a str {
    row.get(column).map(|v| v.trim()).unwrap_or("")
}

fn row_to_question(
    row: &Row,
    candidate_columns: &[String],
    out_dir: &Path,
) -> Result<LoadedQuestion> {
    let raw_id = cell(row, ID_COLUMN);
    let id = parse_id(raw_id)
        .with_context(|| format!("invalid {} '{}'", ID_COLUMN, raw_id))?;

    let title = cell(row, "Question Title").to_string();
    let created_at = parse_timestamp(cell(row, "Question Creation Date")).unwrap_or_else(Utc::now);
    let tags = cell(row, "Question Tags")
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect();

    let mut answers = Vec::new();
    if let Some(body) = candidate_columns.iter().map(|c| cell(row, c)).find(|b| !b.is_empty()) {
        answers.push(Answer {
            id: 0,
            body: body.to_string(),
            created_at,
            accepted: false,
            score: 0,
            link: String::new(),
            role: AnswerRole::Candidate,
        });
    }

    let reference_body = cell(row, "Answer Body");
    if !reference_body.is_empty() {
        let answer_id = parse_id(cell(row, "Answer ID")).unwrap_or(0);
        answers.push(Answer {
            id: answer_id,
            body: reference_body.to_string(),
            created_at: parse_timestamp(cell(row, "Answer Creation Date")).unwrap_or(created_at),
            accepted: true,
            score: 0,
            link: format!("https://stackoverflow.com/a/{answer_id}"),
            role: AnswerRole::Reference,
        });
    }

    let dir = out_dir.join(tabular_dir_name(id, &title));
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create {}", dir.display()))?;

    Ok(LoadedQuestion {
        dir,
        question: Question {
            id,
            title,
            body: cell(row, "Question Body").to_string(),
            tags,
            created_at,
            link: format!("https://stackoverflow.com/questions/{id}"),
            answers,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const CSV: &str = "\
Question ID,Question Title,Question Body,Question Tags,Question Creation Date,Answer ID,Answer Body,Answer Creation Date,gpt4o_Answer_Translated,gpt4_1_Evaluate_gpt4o_Answer,gpt-4o_Answer,gpt-4.1_Answer
101,CSV I/O Test,How?,\"kubernetes, helm\",2023-01-01T00:00:00,555,Use kubectl,2023-01-02T00:00:00,translated,judged,,from 4.1
102,Second,Body,,,,,,,,from 4o,
abc,Broken,Body,,,,,,,,x,
";

    fn fixture() -> (TempDir, PathBuf) {
        let tmp = TempDir::new().expect("tmp");
        let path = tmp.path().join("questions.csv");
        fs::write(&path, CSV).unwrap();
        (tmp, path)
    }

    #[test]
    fn test_first_non_empty_candidate_and_reference() {
        let (tmp, path) = fixture();
        let out = tmp.path().join("out");
        let loaded: Vec<_> = TabularLoader::new(&path, &out).load().unwrap().collect();

        assert_eq!(loaded.len(), 2, "row with a bad id is skipped");
        let first = &loaded[0];
        assert_eq!(first.dir, out.join("101_CSV_IO_Test"));
        assert!(first.dir.is_dir());

        let q = &first.question;
        assert_eq!(q.tags, vec!["kubernetes", "helm"]);
        assert_eq!(q.link, "https://stackoverflow.com/questions/101");
        assert_eq!(q.answers[0].role, AnswerRole::Candidate);
        assert_eq!(q.candidate().unwrap().body, "from 4.1");

        let reference = q.reference().unwrap();
        assert_eq!(reference.id, 555);
        assert_eq!(reference.link, "https://stackoverflow.com/a/555");
        assert!(reference.accepted);

        let second = &loaded[1].question;
        assert_eq!(second.candidate().unwrap().body, "from 4o");
        assert!(second.reference().is_none());
    }

    #[test]
    fn test_configured_model_column_only() {
        let (tmp, path) = fixture();
        let loaded: Vec<_> = TabularLoader::new(&path, tmp.path())
            .candidate_model(Some("gpt-4o"))
            .load()
            .unwrap()
            .collect();

        assert!(loaded[0].question.candidate().is_none());
        assert_eq!(loaded[1].question.candidate().unwrap().body, "from 4o");
    }

    #[test]
    fn test_skip_applies_before_parsing() {
        let (tmp, path) = fixture();
        let ids: Vec<u64> = TabularLoader::new(&path, tmp.path())
            .skip(1)
            .load()
            .unwrap()
            .map(|lq| lq.question.id)
            .collect();
        assert_eq!(ids, vec![102]);
    }

    #[test]
    fn test_spreadsheet_float_ids() {
        let tmp = TempDir::new().expect("tmp");
        let path = tmp.path().join("export.csv");
        fs::write(
            &path,
            "Question ID,Question Title,Answer ID,Answer Body,gpt4o_Answer\n\
             123.0,Float id,456.0,Use a Service,kubectl expose\n",
        )
        .unwrap();

        let loaded: Vec<_> = TabularLoader::new(&path, tmp.path()).load().unwrap().collect();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].question.id, 123);
        assert_eq!(loaded[0].question.reference().unwrap().id, 456);
    }

    #[test]
    fn test_missing_csv_is_error() {
        let tmp = TempDir::new().expect("tmp");
        assert!(TabularLoader::new(tmp.path().join("none.csv"), tmp.path()).load().is_err());
    }
}
