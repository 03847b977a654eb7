//! Question loaders.
//!
//! Both loaders yield [`LoadedQuestion`]s in a deterministic order with an
//! optional skip offset applied after ordering. Every answer they produce is
//! tagged with its [`AnswerRole`](crate::domain::AnswerRole).

pub mod directory;
pub mod tabular;

pub use directory::DirectoryLoader;
pub use tabular::TabularLoader;

use crate::domain::model_token;

/// A ledger column holding a model's answer: `{model}_Answer`, excluding
/// judge output columns such as `{eval}_Evaluate_{model}_Answer`.
pub fn is_candidate_column(name: &str) -> bool {
    name.ends_with("_Answer") && !name.contains("_Evaluate_")
}

/// Model token of a candidate column, e.g. `gpt-4.1_Answer` -> `gpt4_1`.
pub fn candidate_column_token(name: &str) -> Option<String> {
    if !is_candidate_column(name) {
        return None;
    }
    name.strip_suffix("_Answer").map(model_token)
}
