//! Translate command implementation

use anyhow::Result;
use clap::Args;
use std::sync::Arc;
use std::time::Instant;

use super::utils::{chat_client, print_report, settings, LlmArgs, SourceArgs};
use crate::config::CliOverrides;
use crate::store::Ledger;
use crate::translate::Translator;

#[derive(Args)]
pub struct TranslateArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    #[command(flatten)]
    pub llm: LlmArgs,
}

pub fn run(args: TranslateArgs) -> Result<()> {
    let start_time = Instant::now();

    let settings = settings(
        args.llm.config.as_deref(),
        CliOverrides { translate_workers: args.llm.workers, ..args.llm.overrides() },
    )?;

    let items = args.source.load(None)?;
    let ledger = Arc::new(Ledger::open(args.source.ledger_path())?);
    let client = chat_client(&settings, &settings.model)?;

    let translator = Translator::new(ledger, client).force(args.llm.force);
    let report = translator.run(items, settings.workers.translate)?;
    tracing::info!("Translate complete: {}", report);

    print_report("Translate", &report, start_time.elapsed());
    Ok(())
}
