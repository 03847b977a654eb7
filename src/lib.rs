//! stack-eval: answer, translate and score Stack Overflow questions with LLMs
//!
//! Questions live either in a directory tree (one folder per question) or in a
//! wide CSV ledger. The evaluation engine runs YAML lint, field coverage, an
//! LLM-judged rubric and a multi-candidate comparison over them, writing the
//! results back to both places.

pub mod answer;
pub mod cli;
pub mod config;
pub mod coverage;
pub mod domain;
pub mod evaluate;
pub mod lint;
pub mod llm;
pub mod load;
pub mod pool;
pub mod store;
pub mod text;
pub mod translate;
