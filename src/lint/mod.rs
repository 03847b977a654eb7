//! YAML lint: pull complete Kubernetes manifests out of an answer and run
//! each one through a list of external validators.
//!
//! A validator whose binary is missing counts as a passed, skipped check.

pub mod extract;
pub mod runner;

pub use extract::{extract_manifests, is_complete_manifest};
pub use runner::{CommandValidator, Validator};

use crate::config::LintSettings;
use serde::Serialize;
use std::io::Write;

pub const NO_YAML_FOUND: &str = "NO_YAML_FOUND";
pub const NO_CHECKS_RUN: &str = "NO_CHECKS_RUN";
pub const BLOCK_SEPARATOR: &str = "\n---BLOCK---\n";

/// Outcome of one validator on one manifest.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LintCheck {
    pub tool: String,
    /// 1-based manifest index.
    pub block: usize,
    pub passed: bool,
    /// The validator was unavailable; `passed` is true.
    pub skipped: bool,
    pub output: String,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolCount {
    pub tool: String,
    pub passed: usize,
    pub total: usize,
}

/// Everything one lint pass produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LintReport {
    pub blocks: Vec<String>,
    pub checks: Vec<LintCheck>,
    tools: Vec<String>,
}

impl LintReport {
    /// Per-tool pass counts in validator order; tools that never ran are omitted.
    pub fn counts(&self) -> Vec<ToolCount> {
        self.tools
            .iter()
            .map(|tool| {
                let runs = self.checks.iter().filter(|c| &c.tool == tool);
                ToolCount {
                    tool: tool.clone(),
                    passed: runs.clone().filter(|c| c.passed).count(),
                    total: runs.count(),
                }
            })
            .filter(|count| count.total > 0)
            .collect()
    }

    /// `kubeval:2/3; datree:3/3`, or a sentinel when there was nothing to check.
    pub fn summary(&self) -> String {
        if self.blocks.is_empty() {
            return NO_YAML_FOUND.to_string();
        }
        let parts: Vec<String> = self
            .counts()
            .iter()
            .map(|c| format!("{}:{}/{}", c.tool, c.passed, c.total))
            .collect();
        if parts.is_empty() {
            NO_CHECKS_RUN.to_string()
        } else {
            parts.join("; ")
        }
    }

    pub fn all_passed(&self) -> bool {
        !self.blocks.is_empty() && self.checks.iter().all(|c| c.passed)
    }

    pub fn merged_blocks(&self) -> String {
        self.blocks.join(BLOCK_SEPARATOR)
    }

    /// Full validator output, one section per check.
    pub fn logs(&self) -> String {
        self.checks
            .iter()
            .map(|check| {
                let mut entry = format!("=== {} (Block {}) ===", check.tool, check.block);
                entry.push_str(if check.passed { "\n✅ PASSED" } else { "\n❌ FAILED" });
                if !check.output.trim().is_empty() {
                    entry.push_str("\n[OUTPUT]\n");
                    entry.push_str(check.output.trim());
                }
                if !check.error.trim().is_empty() {
                    entry.push_str("\n[ERROR]\n");
                    entry.push_str(check.error.trim());
                }
                entry
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

pub struct LintRunner {
    validators: Vec<Box<dyn Validator>>,
}

impl LintRunner {
    pub fn new(validators: Vec<Box<dyn Validator>>) -> Self {
        Self { validators }
    }

    /// Command validators for every enabled entry, in configured order.
    pub fn from_settings(settings: &LintSettings) -> Self {
        let validators = settings
            .validators
            .iter()
            .filter(|spec| spec.enabled)
            .map(|spec| Box::new(CommandValidator::from_spec(spec)) as Box<dyn Validator>)
            .collect();
        Self::new(validators)
    }

    pub fn run(&self, text: &str) -> LintReport {
        let blocks = extract_manifests(text);
        let tools = self.validators.iter().map(|v| v.name().to_string()).collect();
        if blocks.is_empty() {
            tracing::debug!("No Kubernetes manifests found");
        }

        let mut checks = Vec::new();
        for (idx, block) in blocks.iter().enumerate() {
            let block_no = idx + 1;
            // Dropping the temp file removes it, whatever the validators did.
            let file = match write_temp(block) {
                Ok(file) => file,
                Err(e) => {
                    for validator in &self.validators {
                        checks.push(LintCheck {
                            tool: validator.name().to_string(),
                            block: block_no,
                            passed: false,
                            skipped: false,
                            output: String::new(),
                            error: format!("failed to write temp file: {e}"),
                        });
                    }
                    continue;
                }
            };
            for validator in &self.validators {
                let mut check = validator.check(file.path());
                check.block = block_no;
                checks.push(check);
            }
        }

        LintReport { blocks, checks, tools }
    }
}

fn write_temp(block: &str) -> std::io::Result<tempfile::NamedTempFile> {
    let mut file = tempfile::Builder::new().prefix("stack-eval-").suffix(".yaml").tempfile()?;
    file.write_all(block.as_bytes())?;
    file.flush()?;
    Ok(file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::{Path, PathBuf};
    use std::sync::Mutex;

    const ANSWER: &str = "Try this:\n\n```yaml\napiVersion: v1\nkind: Pod\nmetadata:\n  name: a\nspec:\n  containers: []\n---\napiVersion: v1\nkind: Service\nmetadata:\n  name: b\nspec:\n  ports: []\n```\n";

    /// Passes every block except the listed ones; remembers the files it saw.
    struct Scripted {
        name: &'static str,
        fail_blocks: Vec<usize>,
        seen: Mutex<Vec<PathBuf>>,
    }

    impl Scripted {
        fn new(name: &'static str, fail_blocks: Vec<usize>) -> Self {
            Self { name, fail_blocks, seen: Mutex::new(Vec::new()) }
        }
    }

    impl Validator for Scripted {
        fn name(&self) -> &str {
            self.name
        }

        fn check(&self, file: &Path) -> LintCheck {
            assert!(file.exists());
            let mut seen = self.seen.lock().unwrap();
            seen.push(file.to_path_buf());
            let passed = !self.fail_blocks.contains(&seen.len());
            LintCheck {
                tool: self.name.to_string(),
                block: 0,
                passed,
                skipped: false,
                output: std::fs::read_to_string(file).unwrap().lines().nth(1).unwrap().into(),
                error: if passed { String::new() } else { "invalid spec\n".into() },
            }
        }
    }

    #[test]
    fn test_no_yaml_found() {
        let runner = LintRunner::new(vec![Box::new(Scripted::new("kubeval", vec![]))]);
        let report = runner.run("kubectl rollout restart deploy/web");
        assert_eq!(report.summary(), NO_YAML_FOUND);
        assert_eq!(report.logs(), "");
        assert_eq!(report.merged_blocks(), "");
        assert!(!report.all_passed());
    }

    #[test]
    fn test_no_checks_run() {
        let report = LintRunner::new(Vec::new()).run(ANSWER);
        assert_eq!(report.blocks.len(), 2);
        assert_eq!(report.summary(), NO_CHECKS_RUN);
    }

    #[test]
    fn test_summary_and_logs() {
        let runner = LintRunner::new(vec![
            Box::new(Scripted::new("kubeval", vec![2])),
            Box::new(Scripted::new("dryrun", vec![])),
        ]);
        let report = runner.run(ANSWER);

        insta::assert_snapshot!(report.summary(), @"kubeval:1/2; dryrun:2/2");
        insta::assert_snapshot!(report.logs(), @r###"
        === kubeval (Block 1) ===
        ✅ PASSED
        [OUTPUT]
        kind: Pod

        === dryrun (Block 1) ===
        ✅ PASSED
        [OUTPUT]
        kind: Pod

        === kubeval (Block 2) ===
        ❌ FAILED
        [OUTPUT]
        kind: Service
        [ERROR]
        invalid spec

        === dryrun (Block 2) ===
        ✅ PASSED
        [OUTPUT]
        kind: Service
        "###);
        assert!(report.merged_blocks().contains("\n---BLOCK---\napiVersion: v1\nkind: Service"));
        assert!(!report.all_passed());
    }

    #[test]
    fn test_temp_files_removed_after_run() {
        let validator = std::sync::Arc::new(Scripted::new("kubeval", vec![]));

        struct Shared(std::sync::Arc<Scripted>);
        impl Validator for Shared {
            fn name(&self) -> &str {
                self.0.name()
            }
            fn check(&self, file: &Path) -> LintCheck {
                self.0.check(file)
            }
        }

        let runner = LintRunner::new(vec![Box::new(Shared(validator.clone()))]);
        runner.run(ANSWER);

        let seen = validator.seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        for path in seen.iter() {
            assert_eq!(path.extension().and_then(|e| e.to_str()), Some("yaml"));
            assert!(!path.exists(), "{} left behind", path.display());
        }
    }

    #[test]
    fn test_disabled_validators_not_built() {
        let mut settings = LintSettings::default();
        settings.validators[1].enabled = false;
        let runner = LintRunner::from_settings(&settings);
        let names: Vec<_> = runner.validators.iter().map(|v| v.name().to_string()).collect();
        assert_eq!(names, vec!["kubeval", "dryrun"]);
    }
}
