//! Line-oriented fenced code block scanning.

/// A ```` ``` ```` fenced block. `lang` is the lowercased first word of the info
/// string, empty for unlabeled fences.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FencedBlock {
    pub lang: String,
    pub body: String,
}

impl FencedBlock {
    pub fn is_yaml(&self) -> bool {
        matches!(self.lang.as_str(), "yaml" | "yml")
    }

    pub fn is_unlabeled(&self) -> bool {
        self.lang.is_empty()
    }
}

/// Collect every closed fenced block in document order. A fence left open at
/// the end of the text is dropped.
pub fn fenced_blocks(text: &str) -> Vec<FencedBlock> {
    let mut blocks = Vec::new();
    let mut current: Option<(String, Vec<&str>)> = None;

    for line in text.lines() {
        let trimmed = line.trim_start();
        let is_fence = trimmed.starts_with("```");

        let info = trimmed.trim_start_matches('`').trim();

        if current.is_none() {
            if is_fence {
                let lang = info.split_whitespace().next().unwrap_or("").to_ascii_lowercase();
                current = Some((lang, Vec::new()));
            }
            continue;
        }

        if is_fence && info.is_empty() {
            if let Some((lang, lines)) = current.take() {
                blocks.push(FencedBlock { lang, body: lines.join("\n") });
            }
            continue;
        }

        if let Some((_, lines)) = current.as_mut() {
            lines.push(line);
        }
    }

    blocks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labeled_and_unlabeled_blocks_in_order() {
        let text = "intro\n```yaml\na: 1\n```\nmiddle\n```\nplain\n```\n```bash\nls\n```\n";
        let blocks = fenced_blocks(text);
        assert_eq!(blocks.len(), 3);
        assert!(blocks[0].is_yaml());
        assert_eq!(blocks[0].body, "a: 1");
        assert!(blocks[1].is_unlabeled());
        assert_eq!(blocks[1].body, "plain");
        assert_eq!(blocks[2].lang, "bash");
    }

    #[test]
    fn unclosed_fence_is_dropped() {
        let blocks = fenced_blocks("```yaml\na: 1\n");
        assert!(blocks.is_empty());
    }

    #[test]
    fn uppercase_yml_counts_as_yaml() {
        let blocks = fenced_blocks("```YML\nkind: Pod\n```");
        assert_eq!(blocks.len(), 1);
        assert!(blocks[0].is_yaml());
    }
}
