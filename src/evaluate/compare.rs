//! Multi-candidate comparison: gather every model answer known for a question
//! and build one prompt ranking them, with or without the human reference.

use crate::domain::Question;
use crate::llm::prompts::{
    compare_no_ref_user_prompt, compare_user_prompt, COMPARE_NO_REF_SYSTEM_PROMPT,
    COMPARE_SYSTEM_PROMPT,
};
use crate::llm::ChatMessage;
use crate::load::candidate_column_token;
use crate::store::artifacts::ArtifactDir;
use crate::store::Record;
use std::collections::BTreeMap;

/// Model token -> answer text.
pub type Candidates = BTreeMap<String, String>;

/// Answers from `{tok}_answer.md` files, then from `{model}_Answer` ledger
/// cells for tokens not already found on disk.
pub fn collect_candidates(artifacts: &ArtifactDir, record: Option<&Record>) -> Candidates {
    let mut candidates = Candidates::new();

    for (token, name) in artifacts.model_answer_files() {
        if let Some(text) = artifacts.read(&name) {
            candidates.insert(token, text);
        }
    }

    if let Some(record) = record {
        for (column, value) in record {
            if value.trim().is_empty() {
                continue;
            }
            if let Some(token) = candidate_column_token(column) {
                candidates.entry(token).or_insert_with(|| value.clone());
            }
        }
    }

    candidates
}

/// A ready-to-send comparison request.
#[derive(Debug, Clone, PartialEq)]
pub struct ComparePrompt {
    pub system: &'static str,
    pub user: String,
}

impl ComparePrompt {
    /// `reference` is ignored when `no_reference` is set. Returns `None` when
    /// there is nothing to compare against.
    pub fn build(
        question: &Question,
        reference: Option<&str>,
        candidates: &Candidates,
        no_reference: bool,
    ) -> Option<Self> {
        if candidates.is_empty() {
            return None;
        }
        let question_text =
            format!("**Title:** {}\n\n**Body:**\n{}", question.title, question.body);
        let candidates_text = candidates
            .iter()
            .map(|(name, content)| format!("**[{name}]**:\n{content}"))
            .collect::<Vec<_>>()
            .join("\n\n");

        if no_reference {
            return Some(Self {
                system: COMPARE_NO_REF_SYSTEM_PROMPT,
                user: compare_no_ref_user_prompt(&question_text, &candidates_text),
            });
        }

        let reference = reference.filter(|r| !r.trim().is_empty())?;
        Some(Self {
            system: COMPARE_SYSTEM_PROMPT,
            user: compare_user_prompt(&question_text, reference, &candidates_text),
        })
    }

    pub fn messages(&self) -> Vec<ChatMessage> {
        vec![ChatMessage::system(self.system), ChatMessage::user(self.user.clone())]
    }

    /// Contents of the `_prompt.txt` artifact, for manual replay.
    pub fn file_contents(&self) -> String {
        format!("=== SYSTEM PROMPT ===\n{}\n\n=== USER PROMPT ===\n{}\n", self.system, self.user)
    }
}
