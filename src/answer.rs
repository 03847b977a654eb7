//! Candidate answer generation.

use crate::domain::{model_token, AnswerRole, LoadedQuestion};
use crate::llm::prompts::ANSWER_SYSTEM_PROMPT;
use crate::llm::{ChatClient, ChatMessage};
use crate::pool::{self, BatchReport, ItemOutcome};
use crate::store::artifacts::{self, ArtifactDir, COMBINED_FILE};
use crate::store::ledger::{answer_column, Ledger};
use anyhow::{Context, Result};
use std::sync::Arc;

/// Writes `{tok}_answer.md` for every question that lacks one.
pub struct Answerer {
    ledger: Arc<Ledger>,
    client: Arc<dyn ChatClient>,
    force: bool,
    tok: String,
}

impl Answerer {
    pub fn new(ledger: Arc<Ledger>, client: Arc<dyn ChatClient>) -> Self {
        let tok = model_token(client.model());
        Self { ledger, client, force: false, tok }
    }

    pub fn force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    pub fn run(&self, items: Vec<LoadedQuestion>, workers: usize) -> Result<BatchReport> {
        pool::run_batch(workers, items, "answer", |item| self.process(item))
    }

    pub fn process(&self, item: &LoadedQuestion) -> Result<ItemOutcome> {
        let label = item.label();
        let dir = ArtifactDir::new(&item.dir);

        // Only human answers go into the combined document.
        if !dir.is_done(COMBINED_FILE) {
            let mut question = item.question.clone();
            question.answers.retain(|a| a.role == AnswerRole::Reference);
            dir.save_question(&question)?;
        }

        let answer_file = artifacts::answer_file(&self.tok);
        if !self.force && dir.is_done(&answer_file) {
            tracing::info!("[{}] Answer already exists, skipping", label);
            return Ok(ItemOutcome::Skipped);
        }

        tracing::info!("[{}] Generating answer with {}", label, self.client.model());
        let question = &item.question;
        let messages = [
            ChatMessage::system(ANSWER_SYSTEM_PROMPT),
            ChatMessage::user(format!("{}\n\n{}", question.title, question.body)),
        ];
        let completion = self
            .client
            .complete(&messages)
            .with_context(|| format!("answer generation with {} failed", self.client.model()))?;

        dir.write(&answer_file, &completion.text)?;
        dir.write_json(&artifacts::answer_raw_file(&self.tok), &completion.raw)?;
        self.ledger.ensure_question(question)?;
        self.ledger.upsert(question.id, [(answer_column(&self.tok), completion.text)])?;

        tracing::info!("[{}] Answer saved", label);
        Ok(ItemOutcome::Completed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Answer, Question};
    use crate::llm::fake::EchoClient;
    use crate::store::artifacts::METADATA_FILE;
    use chrono::Utc;
    use tempfile::TempDir;

    fn loaded(root: &std::path::Path, id: u64) -> LoadedQuestion {
        let now = Utc::now();
        let answer = |body: &str, role| Answer {
            id: 9,
            body: body.into(),
            created_at: now,
            accepted: true,
            score: 1,
            link: String::new(),
            role,
        };
        LoadedQuestion {
            dir: root.join(format!("{id}_question")),
            question: Question {
                id,
                title: "CrashLoopBackOff".into(),
                body: "Container exits with code 1.".into(),
                tags: vec!["kubernetes".into()],
                created_at: now,
                link: String::new(),
                answers: vec![
                    answer("old machine answer", AnswerRole::Candidate),
                    answer("Check the logs.", AnswerRole::Reference),
                ],
            },
        }
    }

    #[test]
    fn test_generates_once_then_skips() {
        let tmp = TempDir::new().unwrap();
        let ledger = Arc::new(Ledger::open(tmp.path().join("results.csv")).unwrap());
        let client = Arc::new(EchoClient::new("gpt-4o", "ANSWER: "));
        let answerer = Answerer::new(ledger.clone(), client.clone());
        let item = loaded(tmp.path(), 11);

        assert_eq!(answerer.process(&item).unwrap(), ItemOutcome::Completed);
        let dir = ArtifactDir::new(&item.dir);
        let text = dir.read("gpt4o_answer.md").unwrap();
        assert_eq!(text, "ANSWER: CrashLoopBackOff\n\nContainer exits with code 1.");
        assert!(dir.is_done("gpt4o_answer_raw.json"));
        assert!(dir.is_done(METADATA_FILE));

        let combined = dir.read(COMBINED_FILE).unwrap();
        assert!(combined.contains("Check the logs."));
        assert!(!combined.contains("old machine answer"));

        let row = ledger.get(11).unwrap();
        assert_eq!(row["gpt4o_Answer"], text);
        assert_eq!(row["Question Title"], "CrashLoopBackOff");

        assert_eq!(answerer.process(&item).unwrap(), ItemOutcome::Skipped);
        assert_eq!(client.call_count(), 1);

        let forced = Answerer::new(ledger, client.clone()).force(true);
        assert_eq!(forced.process(&item).unwrap(), ItemOutcome::Completed);
        assert_eq!(client.call_count(), 2);
    }
}
