//! Complete Kubernetes manifests from fenced code blocks.

use crate::text::fenced_blocks;
use once_cell::sync::Lazy;
use regex::Regex;

static DOC_SEPARATOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^---\s*$").expect("valid regex"));

const MIN_MANIFEST_LINES: usize = 5;

/// Manifests worth handing to a validator. `yaml`/`yml` fences come first,
/// then unlabeled fences whose body was not already collected.
pub fn extract_manifests(text: &str) -> Vec<String> {
    let blocks = fenced_blocks(text);

    let mut bodies: Vec<&str> =
        blocks.iter().filter(|b| b.is_yaml()).map(|b| b.body.as_str()).collect();
    for block in blocks.iter().filter(|b| b.is_unlabeled()) {
        if !bodies.contains(&block.body.as_str()) {
            bodies.push(&block.body);
        }
    }

    bodies
        .into_iter()
        .map(str::trim)
        .filter(|body| !body.is_empty())
        .flat_map(|body| DOC_SEPARATOR.split(body))
        .map(str::trim)
        .filter(|doc| !doc.is_empty() && is_complete_manifest(doc))
        .map(str::to_string)
        .collect()
}

/// At least five non-empty lines, `apiVersion:` on the first meaningful line,
/// and a `kind:` line somewhere.
pub fn is_complete_manifest(doc: &str) -> bool {
    let lines: Vec<&str> = doc.lines().map(str::trim).filter(|l| !l.is_empty()).collect();
    if lines.len() < MIN_MANIFEST_LINES {
        return false;
    }

    let first = lines.iter().find(|l| !l.starts_with('#')).copied().unwrap_or("");
    first.starts_with("apiVersion:") && lines.iter().any(|l| l.starts_with("kind:"))
}

#[cfg(test)]
mod tests {
    use super::*;

    const POD: &str = "apiVersion: v1\nkind: Pod\nmetadata:\n  name: web\nspec:\n  containers: []";

    #[test]
    fn test_complete_manifest_accepted() {
        assert!(is_complete_manifest(POD));
        assert!(is_complete_manifest(&format!("# comment\n{POD}")));
    }

    #[test]
    fn test_short_or_partial_blocks_rejected() {
        assert!(!is_complete_manifest("apiVersion: v1\nkind: Pod\nmetadata:\n  name: web"));
        assert!(!is_complete_manifest("kind: Pod\napiVersion: v1\nmetadata:\n  name: a\nspec: {}"));
        assert!(!is_complete_manifest(
            "apiVersion: v1\nmetadata:\n  name: a\nspec:\n  stdin: true\n  tty: true"
        ));
        assert!(!is_complete_manifest("stdin: true\ntty: true\na: 1\nb: 2\nc: 3"));
    }

    #[test]
    fn test_yaml_fences_then_unlabeled_without_duplicates() {
        let service = POD.replace("Pod", "Service");
        let text = format!(
            "```\n{service}\n```\n```yaml\n{POD}\n```\n```yml\nstdin: true\n```\n```\n{POD}\n```\n```bash\n{POD}\n```"
        );
        assert_eq!(extract_manifests(&text), vec![POD.to_string(), service]);
    }

    #[test]
    fn test_multi_document_block_split() {
        let service = POD.replace("Pod", "Service");
        let text = format!("```yaml\n---\n{POD}\n---   \n{service}\n```");
        assert_eq!(extract_manifests(&text), vec![POD.to_string(), service]);
    }
}
