//! CLI flag precedence over file/env settings

use super::Settings;

/// Values given on the command line. `None` leaves the loaded setting alone.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub model: Option<String>,
    pub eval_model: Option<String>,
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub answer_workers: Option<usize>,
    pub translate_workers: Option<usize>,
    pub evaluate_workers: Option<usize>,
    /// Validator names to switch off for this run.
    pub disabled_validators: Vec<String>,
}

pub fn merge_cli_with_config(mut settings: Settings, cli: CliOverrides) -> Settings {
    if let Some(model) = cli.model {
        settings.model = model;
    }
    if cli.eval_model.is_some() {
        settings.eval_model = cli.eval_model;
    }
    if let Some(url) = cli.base_url {
        settings.llm.base_url = url;
    }
    if cli.api_key.is_some() {
        settings.llm.api_key = cli.api_key;
    }
    if let Some(n) = cli.answer_workers {
        settings.workers.answer = n.max(1);
    }
    if let Some(n) = cli.translate_workers {
        settings.workers.translate = n.max(1);
    }
    if let Some(n) = cli.evaluate_workers {
        settings.workers.evaluate = n.max(1);
    }
    for validator in settings.lint.validators.iter_mut() {
        if cli.disabled_validators.iter().any(|name| name.eq_ignore_ascii_case(&validator.name)) {
            validator.enabled = false;
        }
    }
    settings
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_wins_over_file() {
        let mut file = Settings::default();
        file.model = "gpt-4o-mini".into();
        file.workers.evaluate = 4;

        let merged = merge_cli_with_config(
            file,
            CliOverrides {
                model: Some("gpt-4.1".into()),
                evaluate_workers: Some(0),
                ..CliOverrides::default()
            },
        );
        assert_eq!(merged.model, "gpt-4.1");
        assert_eq!(merged.workers.evaluate, 1, "worker count is clamped to at least one");
    }

    #[test]
    fn test_unset_overrides_keep_settings() {
        let mut file = Settings::default();
        file.eval_model = Some("o1".into());
        let merged = merge_cli_with_config(file.clone(), CliOverrides::default());
        assert_eq!(merged, file);
    }

    #[test]
    fn test_disable_validator_by_name() {
        let merged = merge_cli_with_config(
            Settings::default(),
            CliOverrides { disabled_validators: vec!["Datree".into()], ..CliOverrides::default() },
        );
        let enabled: Vec<_> =
            merged.lint.validators.iter().filter(|v| v.enabled).map(|v| v.name.as_str()).collect();
        assert_eq!(enabled, vec!["kubeval", "dryrun"]);
    }
}
