//! Flattening a YAML value into its set of dotted field paths.

use serde_yaml::Value;
use std::collections::BTreeSet;

/// Every mapping key path, lowercased and dot-joined. Sequence items are not
/// keys themselves; nested mappings inside them are reached through an indexed
/// segment (`parent.[0].name`). Scalars add nothing beyond their parent's path.
pub fn field_keys(value: &Value) -> BTreeSet<String> {
    let mut keys = BTreeSet::new();
    collect(value, "", &mut keys);
    keys
}

fn collect(value: &Value, parent: &str, keys: &mut BTreeSet<String>) {
    match value {
        Value::Mapping(map) => {
            for (key, child) in map {
                let key = key_segment(key);
                let path = join(parent, &key);
                if is_container(child) {
                    collect(child, &path, keys);
                }
                keys.insert(path);
            }
        }
        Value::Sequence(items) => {
            for (idx, item) in items.iter().enumerate() {
                let path = join(parent, &format!("[{idx}]"));
                if is_container(item) {
                    collect(item, &path, keys);
                }
            }
        }
        Value::Tagged(tagged) => collect(&tagged.value, parent, keys),
        _ => {}
    }
}

fn is_container(value: &Value) -> bool {
    match value {
        Value::Mapping(_) | Value::Sequence(_) => true,
        Value::Tagged(tagged) => is_container(&tagged.value),
        _ => false,
    }
}

fn join(parent: &str, segment: &str) -> String {
    if parent.is_empty() {
        segment.to_string()
    } else {
        format!("{parent}.{segment}")
    }
}

/// Non-string keys are stringified the way the benchmark datasets were built:
/// `true`, `1`, `none`.
fn key_segment(key: &Value) -> String {
    match key {
        Value::String(s) => s.to_lowercase(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string().to_lowercase(),
        Value::Null => "none".to_string(),
        Value::Tagged(tagged) => key_segment(&tagged.value),
        other => serde_yaml::to_string(other).unwrap_or_default().trim().to_lowercase(),
    }
}
