//! YAML document extraction and template cleanup.

use once_cell::sync::Lazy;
use regex::Regex;

static YAML_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```(?:yaml)?\n(.*?)```").expect("valid regex"));
static DOC_SEPARATOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n\s*---\s*\n").expect("valid regex"));
static TRIM_TEMPLATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)\{\{-\s*.+?\s*\}\}").expect("valid regex"));
static TEMPLATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)\{\{\s*.+?\s*\}\}").expect("valid regex"));

/// Strip Helm expressions and `...` markers, then drop blank lines.
pub fn preprocess_template(yaml: &str) -> String {
    let content = TRIM_TEMPLATE.replace_all(yaml, "");
    let content = TEMPLATE.replace_all(&content, "");
    let content = content.replace("...", "");
    content.split('\n').filter(|line| !line.trim().is_empty()).collect::<Vec<_>>().join("\n")
}

/// YAML documents from every ```` ``` ```` or ```` ```yaml ```` fence, in
/// document order. Multi-document blocks are split on `---` lines.
pub fn extract_yaml_docs(text: &str) -> Vec<String> {
    let mut docs = Vec::new();

    for caps in YAML_BLOCK.captures_iter(text) {
        let block = caps.get(1).map(|m| m.as_str().trim()).unwrap_or("");
        if block.is_empty() {
            continue;
        }

        for doc in DOC_SEPARATOR.split(block) {
            let mut doc = doc.trim();
            if doc.starts_with("---") {
                match doc.split_once('\n') {
                    Some((first, rest)) if first.trim() == "---" => doc = rest.trim(),
                    None if doc.trim() == "---" => continue,
                    _ => {}
                }
            }
            if !doc.is_empty() {
                docs.push(doc.to_string());
            }
        }
    }

    docs
}
