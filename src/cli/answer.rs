//! Answer command implementation

use anyhow::Result;
use clap::Args;
use std::sync::Arc;
use std::time::Instant;

use super::utils::{chat_client, print_report, settings, LlmArgs, SourceArgs};
use crate::answer::Answerer;
use crate::config::CliOverrides;
use crate::store::Ledger;

#[derive(Args)]
pub struct AnswerArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    #[command(flatten)]
    pub llm: LlmArgs,
}

pub fn run(args: AnswerArgs) -> Result<()> {
    let start_time = Instant::now();

    let settings = settings(
        args.llm.config.as_deref(),
        CliOverrides { answer_workers: args.llm.workers, ..args.llm.overrides() },
    )?;

    let items = args.source.load(None)?;
    let ledger = Arc::new(Ledger::open(args.source.ledger_path())?);
    let client = chat_client(&settings, &settings.model)?;

    let answerer = Answerer::new(ledger, client).force(args.llm.force);
    let report = answerer.run(items, settings.workers.answer)?;
    tracing::info!("Answer complete: {}", report);

    print_report("Answer", &report, start_time.elapsed());
    Ok(())
}
