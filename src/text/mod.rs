//! Text helpers: filesystem-safe names, language detection, fenced code blocks.

pub mod fences;

pub use fences::{fenced_blocks, FencedBlock};

/// Maximum length of a tabular-originated question directory name.
const MAX_DIR_NAME_CHARS: usize = 50;

/// Keep alphanumerics, spaces, `_` and `-`; trim; spaces become underscores.
pub fn sanitize_filename(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '_' | '-'))
        .collect::<String>()
        .trim()
        .replace(' ', "_")
}

/// Directory name for a question that came from a CSV row: `{id}_{title}`,
/// cut to 50 characters.
pub fn tabular_dir_name(id: u64, title: &str) -> String {
    format!("{}_{}", id, sanitize_filename(title)).chars().take(MAX_DIR_NAME_CHARS).collect()
}

/// True when the text contains at least one CJK unified ideograph.
pub fn contains_cjk(text: &str) -> bool {
    text.chars().any(|c| ('\u{4e00}'..='\u{9fff}').contains(&c))
}
