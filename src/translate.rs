//! Chinese translations of the combined Q&A document and of model answers.

use crate::domain::{model_token, AnswerRole, LoadedQuestion};
use crate::llm::prompts::{
    translate_document_prompt, translate_text_prompt, TRANSLATION_SYSTEM_PROMPT,
};
use crate::llm::{ChatClient, ChatMessage};
use crate::pool::{self, BatchReport, ItemOutcome};
use crate::store::artifacts::{
    self, ArtifactDir, COMBINED_FILE, COMBINED_TRANSLATED_FILE, TRANSLATION_RAW_FILE,
};
use crate::store::document;
use crate::store::ledger::{answer_translated_column, Ledger};
use crate::text::contains_cjk;
use anyhow::{Context, Result};
use std::sync::Arc;

pub struct Translator {
    ledger: Arc<Ledger>,
    client: Arc<dyn ChatClient>,
    force: bool,
}

impl Translator {
    pub fn new(ledger: Arc<Ledger>, client: Arc<dyn ChatClient>) -> Self {
        Self { ledger, client, force: false }
    }

    pub fn force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    pub fn run(&self, items: Vec<LoadedQuestion>, workers: usize) -> Result<BatchReport> {
        pool::run_batch(workers, items, "translate", |item| self.process(item))
    }

    /// Translate whatever is still missing for one question. A failed answer
    /// translation is logged and does not stop the others.
    pub fn process(&self, item: &LoadedQuestion) -> Result<ItemOutcome> {
        let label = item.label();
        let dir = ArtifactDir::new(&item.dir);
        let mut translated = 0;

        if self.force || !dir.is_done(COMBINED_TRANSLATED_FILE) {
            self.translate_document(item, &dir)?;
            translated += 1;
        }

        for (token, answer_file) in dir.model_answer_files() {
            let target = artifacts::answer_translated_file(&token);
            if !self.force && dir.is_done(&target) {
                continue;
            }
            let Some(text) = dir.read(&answer_file) else { continue };
            if contains_cjk(&text) {
                tracing::debug!("[{}] {} answer already in Chinese", label, token);
                continue;
            }

            tracing::info!("[{}] Translating {} answer", label, token);
            match self.complete(vec![ChatMessage::user(translate_text_prompt(&text))]) {
                Ok(completion) => {
                    dir.write(&target, &completion.text)?;
                    self.ledger.upsert(
                        item.question.id,
                        [(answer_translated_column(&model_token(&token)), completion.text)],
                    )?;
                    translated += 1;
                }
                Err(e) => tracing::error!("[{}] Failed to translate {}: {:#}", label, token, e),
            }
        }

        if translated == 0 {
            tracing::info!("[{}] Nothing to translate", label);
            return Ok(ItemOutcome::Skipped);
        }
        Ok(ItemOutcome::Completed)
    }

    fn translate_document(&self, item: &LoadedQuestion, dir: &ArtifactDir) -> Result<()> {
        let source = dir.read(COMBINED_FILE).unwrap_or_else(|| {
            let mut question = item.question.clone();
            question.answers.retain(|a| a.role == AnswerRole::Reference);
            document::render(&question)
        });

        tracing::info!("[{}] Translating Q&A", item.label());
        let completion = self.complete(vec![
            ChatMessage::system(TRANSLATION_SYSTEM_PROMPT),
            ChatMessage::user(translate_document_prompt(&source)),
        ])?;
        dir.write(COMBINED_TRANSLATED_FILE, &completion.text)?;
        dir.write_json(TRANSLATION_RAW_FILE, &completion.raw)
    }

    fn complete(&self, messages: Vec<ChatMessage>) -> Result<crate::llm::Completion> {
        self.client
            .complete(&messages)
            .with_context(|| format!("translation with {} failed", self.client.model()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Question;
    use crate::llm::fake::EchoClient;
    use chrono::Utc;
    use tempfile::TempDir;

    fn setup() -> (TempDir, Arc<Ledger>, LoadedQuestion) {
        let tmp = TempDir::new().unwrap();
        let ledger = Arc::new(Ledger::open(tmp.path().join("results.csv")).unwrap());
        let item = LoadedQuestion {
            dir: tmp.path().join("5_q"),
            question: Question {
                id: 5,
                title: "Helm upgrade fails".into(),
                body: "Error: UPGRADE FAILED".into(),
                tags: vec![],
                created_at: Utc::now(),
                link: String::new(),
                answers: vec![],
            },
        };
        (tmp, ledger, item)
    }

    #[test]
    fn test_translates_missing_outputs_only() {
        let (_tmp, ledger, item) = setup();
        let dir = ArtifactDir::new(&item.dir);
        dir.write("gpt4o_answer.md", "Use helm rollback.").unwrap();
        dir.write("claude3_5sonnet_answer.md", "使用 helm rollback。").unwrap();

        let client = Arc::new(EchoClient::new("gpt-4o", "译: "));
        let translator = Translator::new(ledger.clone(), client.clone());
        assert_eq!(translator.process(&item).unwrap(), ItemOutcome::Completed);

        let combined = dir.read(COMBINED_TRANSLATED_FILE).unwrap();
        assert!(combined.starts_with("译: Translate the following Stack Overflow question"));
        assert!(combined.contains("# Helm upgrade fails"));
        assert!(dir.is_done(TRANSLATION_RAW_FILE));

        let answer = dir.read("gpt4o_answer_translated.md").unwrap();
        assert!(answer.ends_with("Use helm rollback."));
        assert!(!dir.is_done("claude3_5sonnet_answer_translated.md"));
        assert_eq!(ledger.get(5).unwrap()["gpt4o_Answer_Translated"], answer);
        assert_eq!(client.call_count(), 2);

        assert_eq!(translator.process(&item).unwrap(), ItemOutcome::Skipped);
        assert_eq!(client.call_count(), 2);
    }
}
