//! Config file discovery and layered loading

use super::Settings;
use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Toml, Yaml};
use figment::Figment;
use std::path::{Path, PathBuf};

const ENV_PREFIX: &str = "STACK_EVAL_";

/// Load settings: defaults, then the config file, then environment.
///
/// An explicitly provided config file must parse; an auto-discovered one that
/// fails is reported and ignored.
pub fn load_settings(base_dir: &Path, config_path: Option<&Path>) -> Result<Settings> {
    let config_path_provided = config_path.is_some();

    let discovered = match config_path {
        Some(path) => Some(path.to_path_buf()),
        None => discover_config(base_dir),
    };

    let mut figment = Figment::from(Serialized::defaults(Settings::default()));

    if let Some(config_file) = discovered {
        match with_file(figment.clone(), &config_file) {
            Ok(layered) => figment = layered,
            Err(e) => {
                if config_path_provided {
                    return Err(e);
                }
                tracing::warn!(
                    "Failed to parse auto-discovered config {}: {:#}",
                    config_file.display(),
                    e
                );
            }
        }
    }

    let figment = with_env(figment);
    figment.extract().context("Invalid configuration in environment")
}

/// Merge a TOML or YAML file on top of `figment`, validating that the result
/// still deserializes.
fn with_file(figment: Figment, config_file: &Path) -> Result<Figment> {
    if !config_file.exists() {
        anyhow::bail!("Config file not found: {}", config_file.display());
    }

    let ext = config_file.extension().and_then(|e| e.to_str()).unwrap_or("").to_ascii_lowercase();
    let layered = match ext.as_str() {
        "toml" => figment.merge(Toml::file(config_file)),
        "yaml" | "yml" => figment.merge(Yaml::file(config_file)),
        other => anyhow::bail!(
            "Unsupported config extension '.{}' for file {}",
            other,
            config_file.display()
        ),
    };

    layered
        .extract::<Settings>()
        .with_context(|| format!("Invalid config file: {}", config_file.display()))?;
    Ok(layered)
}

/// Well-known OpenAI variables first, so `STACK_EVAL_*` can override them.
fn with_env(figment: Figment) -> Figment {
    figment
        .merge(Env::raw().only(&["OPENAI_API_KEY", "OPENAI_BASE_URL"]).map(|key| {
            if key.as_str().eq_ignore_ascii_case("OPENAI_API_KEY") {
                "llm.api_key".into()
            } else {
                "llm.base_url".into()
            }
        }))
        .merge(Env::prefixed(ENV_PREFIX).split("__"))
}

fn discover_config(base_dir: &Path) -> Option<PathBuf> {
    let candidates =
        ["stack-eval.toml", ".stack-eval.toml", "stack-eval.yaml", "stack-eval.yml"];

    for candidate in candidates {
        let path = base_dir.join(candidate);
        if path.exists() {
            return Some(path);
        }
    }

    None
}
