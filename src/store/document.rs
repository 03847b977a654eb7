//! The combined `question_answer.md` document.
//!
//! Layout:
//!
//! ```text
//! # {title}
//! Link: {link}
//! Created: {timestamp}
//! Tags: a, b
//!
//! ## Question
//! {body}
//!
//! ## Answers
//! ### Answer 1
//! Accepted: true
//! Score: 12
//! Link: https://stackoverflow.com/a/1
//! Created: {timestamp}
//!
//! {answer body}
//! ```
//!
//! The `## Answers` header separates the question from its answers and must be
//! kept verbatim; readers split on it.

use crate::domain::{parse_timestamp, Question};
use crate::store::ledger::DATE_FORMAT;
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

pub const ANSWERS_HEADER: &str = "## Answers";
const QUESTION_HEADER: &str = "## Question";
const NO_ANSWERS: &str = "No answers retrieved.";

static ANSWER_LINK_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/a/(\d+)").expect("valid regex"));

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedDocument {
    pub title: String,
    pub link: String,
    pub tags: Vec<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub body: String,
    pub answers: Vec<ParsedAnswer>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedAnswer {
    /// Taken from an `/a/{id}` link when present.
    pub id: Option<u64>,
    pub accepted: bool,
    pub score: i64,
    pub link: String,
    pub created_at: Option<DateTime<Utc>>,
    pub body: String,
}

pub fn render(question: &Question) -> String {
    let mut lines = vec![
        format!("# {}", question.title),
        format!("Link: {}", question.link),
        format!("Created: {}", question.created_at.format(DATE_FORMAT)),
        format!("Tags: {}", question.tags.join(", ")),
        String::new(),
        QUESTION_HEADER.to_string(),
        question.body.clone(),
        String::new(),
        ANSWERS_HEADER.to_string(),
    ];

    if question.answers.is_empty() {
        lines.push(NO_ANSWERS.to_string());
    }
    for (idx, answer) in question.answers.iter().enumerate() {
        lines.push(format!("### Answer {}", idx + 1));
        lines.push(format!("Accepted: {}", answer.accepted));
        lines.push(format!("Score: {}", answer.score));
        lines.push(format!("Link: {}", answer.link));
        lines.push(format!("Created: {}", answer.created_at.format(DATE_FORMAT)));
        lines.push(String::new());
        lines.push(answer.body.clone());
        lines.push(String::new());
    }

    lines.join("\n")
}

/// Split a combined document at the first `## Answers`. The second half is
/// `None` when the header is missing.
pub fn split_answers(text: &str) -> (&str, Option<&str>) {
    match text.split_once(ANSWERS_HEADER) {
        Some((question, answers)) => (question, Some(answers)),
        None => (text, None),
    }
}

pub fn parse(text: &str) -> ParsedDocument {
    let lines: Vec<&str> = text.lines().collect();
    let separator = lines.iter().position(|l| l.trim().eq_ignore_ascii_case(ANSWERS_HEADER));
    let (question_lines, answer_lines) = match separator {
        Some(idx) => (&lines[..idx], &lines[idx + 1..]),
        None => (&lines[..], &lines[..0]),
    };

    let mut doc = ParsedDocument::default();
    let mut body_start = None;
    for (idx, line) in question_lines.iter().enumerate() {
        let trimmed = line.trim();
        if trimmed.eq_ignore_ascii_case(QUESTION_HEADER) {
            body_start = Some(idx + 1);
            break;
        }
        if idx == 0 && trimmed.starts_with('#') {
            doc.title = trimmed.trim_start_matches('#').trim().to_string();
        } else if let Some((key, value)) = meta_line(trimmed, &["link", "created", "tags"]) {
            match key.as_str() {
                "link" => doc.link = value.to_string(),
                "created" => doc.created_at = parse_timestamp(value),
                _ => {
                    doc.tags = value
                        .split(',')
                        .map(str::trim)
                        .filter(|t| !t.is_empty())
                        .map(str::to_string)
                        .collect()
                }
            }
        }
    }
    let body_lines = match body_start {
        Some(start) => &question_lines[start..],
        None => question_lines.get(1..).unwrap_or(&[]),
    };
    doc.body = body_lines.join("\n").trim().to_string();

    let mut sections: Vec<Vec<&str>> = Vec::new();
    for line in answer_lines {
        if line.trim().to_ascii_lowercase().starts_with("### answer") {
            sections.push(Vec::new());
        } else if let Some(current) = sections.last_mut() {
            current.push(line);
        }
    }
    doc.answers = sections.iter().map(|s| parse_answer(s)).collect();

    doc
}

fn parse_answer(lines: &[&str]) -> ParsedAnswer {
    let mut answer = ParsedAnswer::default();
    let mut rest = lines;

    // Metadata sits at the top of the section, up to the first blank line.
    while let Some((first, tail)) = rest.split_first() {
        let Some((key, value)) = meta_line(first.trim(), &["accepted", "score", "link", "created"])
        else {
            break;
        };
        match key.as_str() {
            "accepted" => answer.accepted = value.eq_ignore_ascii_case("true"),
            "score" => answer.score = value.parse().unwrap_or(0),
            "link" => {
                answer.id = ANSWER_LINK_ID
                    .captures(value)
                    .and_then(|c| c.get(1))
                    .and_then(|m| m.as_str().parse().ok());
                answer.link = value.to_string();
            }
            _ => answer.created_at = parse_timestamp(value),
        }
        rest = tail;
    }

    answer.body = rest.join("\n").trim().to_string();
    answer
}

/// `Key: value` where the lowercased key is one of `keys`.
fn meta_line<'a>(line: &'a str, keys: &[&str]) -> Option<(String, &'a str)> {
    let (key, value) = line.split_once(':')?;
    let key = key.trim().to_ascii_lowercase();
    keys.contains(&key.as_str()).then(|| (key, value.trim()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Answer, AnswerRole};
    use chrono::TimeZone;

    fn sample() -> Question {
        let created = Utc.with_ymd_and_hms(2021, 7, 8, 9, 10, 11).unwrap();
        Question {
            id: 68000001,
            title: "Ingress returns 404".into(),
            body: "My ingress:\n\n```yaml\nkind: Ingress\n```".into(),
            tags: vec!["kubernetes".into(), "nginx-ingress".into()],
            created_at: created,
            link: "https://stackoverflow.com/questions/68000001".into(),
            answers: vec![
                Answer {
                    id: 68000002,
                    body: "Set `pathType: Prefix`.\n\nLink: unrelated line".into(),
                    created_at: created,
                    accepted: true,
                    score: 12,
                    link: "https://stackoverflow.com/a/68000002".into(),
                    role: AnswerRole::Reference,
                },
                Answer {
                    id: 68000003,
                    body: "Check the class annotation.".into(),
                    created_at: created,
                    accepted: false,
                    score: -1,
                    link: String::new(),
                    role: AnswerRole::Reference,
                },
            ],
        }
    }

    #[test]
    fn test_render_layout() {
        let text = render(&sample());
        insta::assert_snapshot!(text.lines().take(9).collect::<Vec<_>>().join("\n"), @r###"
        # Ingress returns 404
        Link: https://stackoverflow.com/questions/68000001
        Created: 2021-07-08T09:10:11
        Tags: kubernetes, nginx-ingress

        ## Question
        My ingress:

        ```yaml
        "###);
        assert!(text.contains("\n## Answers\n### Answer 1\nAccepted: true\nScore: 12\n"));
    }

    #[test]
    fn test_parse_rendered_document() {
        let question = sample();
        let doc = parse(&render(&question));

        assert_eq!(doc.title, question.title);
        assert_eq!(doc.body, question.body);
        assert_eq!(doc.tags, question.tags);
        assert_eq!(doc.created_at, Some(question.created_at));
        assert_eq!(doc.answers.len(), 2);

        let first = &doc.answers[0];
        assert_eq!(first.id, Some(68000002));
        assert!(first.accepted);
        assert_eq!(first.score, 12);
        assert_eq!(first.body, question.answers[0].body, "body lines that look like metadata stay");

        let second = &doc.answers[1];
        assert_eq!(second.id, None);
        assert_eq!(second.score, -1);
    }

    #[test]
    fn test_no_answers() {
        let mut question = sample();
        question.answers.clear();
        let text = render(&question);
        assert!(text.ends_with("## Answers\nNo answers retrieved."));
        assert!(parse(&text).answers.is_empty());
    }

    #[test]
    fn test_python_style_booleans_and_missing_question_header() {
        let text = "# Title\nLink: x\nsome body\n## Answers\n### Answer 1\nAccepted: True\nScore: 2\n\nUse a Service.\n";
        let doc = parse(text);
        assert_eq!(doc.body, "Link: x\nsome body");
        assert!(doc.answers[0].accepted);
        assert_eq!(doc.answers[0].body, "Use a Service.");
    }

    #[test]
    fn test_split_answers() {
        let (q, a) = split_answers("Q text\n## Answers\nA text");
        assert_eq!(q, "Q text\n");
        assert_eq!(a, Some("\nA text"));
        assert_eq!(split_answers("only question"), ("only question", None));
    }
}
