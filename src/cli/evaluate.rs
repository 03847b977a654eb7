//! Evaluate command implementation

use anyhow::Result;
use clap::Args;
use std::sync::Arc;
use std::time::Instant;

use super::utils::{chat_client, parse_csv, print_report, settings, LlmArgs, SourceArgs};
use crate::config::CliOverrides;
use crate::domain::EvalModule;
use crate::evaluate::{CoverageStats, Dispatcher, EvalOptions};
use crate::lint::LintRunner;
use crate::store::Ledger;

#[derive(Args)]
pub struct EvaluateArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    #[command(flatten)]
    pub llm: LlmArgs,

    /// Judge model for llm-eval and compare [default: --model]
    #[arg(long, value_name = "MODEL")]
    pub eval_model: Option<String>,

    /// Modules to run (comma-separated: lint, coverage, llm-eval, compare, all)
    #[arg(long, value_name = "MODULES", default_value = "all")]
    pub modules: Option<String>,

    /// Compare model answers among themselves, without the human reference
    #[arg(long)]
    pub no_reference: bool,

    /// Turn off a lint validator by name (repeatable or comma-separated)
    #[arg(long, value_name = "NAME", value_delimiter = ',', num_args = 1..)]
    pub disable_validator: Vec<String>,
}

pub fn run(args: EvaluateArgs) -> Result<()> {
    let start_time = Instant::now();

    let modules = EvalModule::parse_set(&parse_csv(&args.modules).unwrap_or_default())?;
    let settings = settings(
        args.llm.config.as_deref(),
        CliOverrides {
            eval_model: args.eval_model.clone(),
            evaluate_workers: args.llm.workers,
            disabled_validators: args.disable_validator.clone(),
            ..args.llm.overrides()
        },
    )?;

    // Only the answer model's column may feed its ledger columns.
    let items = args.source.load(Some(&settings.model))?;
    let ledger = Arc::new(Ledger::open(args.source.ledger_path())?);
    let client = chat_client(&settings, settings.eval_model())?;

    let options = EvalOptions::new(&settings.model, args.source.mode())
        .eval_model(Some(settings.eval_model()))
        .modules(modules)
        .force(args.llm.force)
        .no_reference(args.no_reference);
    let coverage_enabled = options.enabled(EvalModule::Coverage);

    let dispatcher = Dispatcher::new(ledger.clone(), client, options)
        .with_lint_runner(LintRunner::from_settings(&settings.lint));
    let report = dispatcher.run(items, settings.workers.evaluate)?;
    tracing::info!("Evaluate complete: {}", report);

    if coverage_enabled {
        if let Err(e) = ledger.reload() {
            tracing::warn!("Could not reload ledger for coverage summary: {:#}", e);
        }
        match CoverageStats::from_ledger(&ledger, &settings.model) {
            Some(stats) => print!("\n{stats}"),
            None => tracing::warn!("No coverage column for {} in the ledger", settings.model),
        }
    }

    print_report("Evaluate", &report, start_time.elapsed());
    Ok(())
}
