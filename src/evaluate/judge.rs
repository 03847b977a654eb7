//! LLM-judged audit of a single candidate answer.

use crate::domain::Question;
use crate::llm::prompts::EVALUATION_SYSTEM_PROMPT;
use crate::llm::ChatMessage;
use crate::store::document;

pub const NO_REFERENCE_TEXT: &str = "No human reference answers provided.";

/// User message for the judge: the question section of the combined
/// document, the candidate, then the reference answers.
pub fn judge_prompt(question: &Question, candidate: &str) -> String {
    let mut references_only = question.clone();
    references_only.answers.retain(|a| a.role == crate::domain::AnswerRole::Reference);

    let rendered = document::render(&references_only);
    let (question_part, answers_part) = document::split_answers(&rendered);
    let human = match answers_part.map(str::trim) {
        Some(text) if !references_only.answers.is_empty() && !text.is_empty() => text,
        _ => NO_REFERENCE_TEXT,
    };

    format!(
        "[Question]\n{}\n\n[LLM Answer]\n{}\n\n[Human Reference Answer]\n{}",
        question_part.trim(),
        candidate,
        human
    )
}

pub fn judge_messages(question: &Question, candidate: &str) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(EVALUATION_SYSTEM_PROMPT),
        ChatMessage::user(judge_prompt(question, candidate)),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Answer, AnswerRole};
    use chrono::{TimeZone, Utc};

    fn question(answers: Vec<Answer>) -> Question {
        Question {
            id: 42,
            title: "Pod stuck in Pending".into(),
            body: "Scheduler says insufficient cpu.".into(),
            tags: vec!["kubernetes".into()],
            created_at: Utc.with_ymd_and_hms(2021, 6, 1, 0, 0, 0).unwrap(),
            link: "https://stackoverflow.com/questions/42".into(),
            answers,
        }
    }

    fn answer(body: &str, role: AnswerRole) -> Answer {
        Answer {
            id: 7,
            body: body.into(),
            created_at: Utc.with_ymd_and_hms(2021, 6, 2, 0, 0, 0).unwrap(),
            accepted: true,
            score: 4,
            link: "https://stackoverflow.com/a/7".into(),
            role,
        }
    }

    #[test]
    fn test_prompt_sections() {
        let q = question(vec![
            answer("Machine text", AnswerRole::Candidate),
            answer("Lower the requests.", AnswerRole::Reference),
        ]);
        let prompt = judge_prompt(&q, "Add a node.");

        assert!(prompt.starts_with("[Question]\n# Pod stuck in Pending"));
        assert!(prompt.contains("## Question\nScheduler says insufficient cpu."));
        assert!(prompt
            .contains("\n\n[LLM Answer]\nAdd a node.\n\n[Human Reference Answer]\n### Answer 1"));
        assert!(prompt.trim_end().ends_with("Lower the requests."));
        assert!(!prompt.contains("Machine text"), "candidate answers are not references");
    }

    #[test]
    fn test_missing_reference_fallback() {
        let q = question(vec![answer("Machine text", AnswerRole::Candidate)]);
        let prompt = judge_prompt(&q, "Add a node.");
        assert!(prompt.ends_with("[Human Reference Answer]\nNo human reference answers provided."));
    }

    #[test]
    fn test_messages_roles() {
        let messages = judge_messages(&question(vec![]), "x");
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, "system");
        assert!(messages[0].content.contains("AUDIT"));
        assert_eq!(messages[1].role, "user");
    }
}
