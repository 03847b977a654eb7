//! Summary command implementation

use anyhow::Result;
use clap::Args;
use std::path::PathBuf;

use crate::config::DEFAULT_MODEL;
use crate::evaluate::CoverageStats;
use crate::store::Ledger;

#[derive(Args)]
pub struct SummaryArgs {
    /// Result ledger CSV
    #[arg(short, long, value_name = "FILE")]
    pub ledger: PathBuf,

    /// Model whose coverage column to summarize
    #[arg(short, long, value_name = "MODEL", default_value = DEFAULT_MODEL)]
    pub model: String,
}

pub fn run(args: SummaryArgs) -> Result<()> {
    if !args.ledger.is_file() {
        anyhow::bail!("Ledger not found: {}", args.ledger.display());
    }
    let ledger = Ledger::open(&args.ledger)?;

    match CoverageStats::from_ledger(&ledger, &args.model) {
        Some(stats) => print!("{stats}"),
        None => anyhow::bail!(
            "No coverage column for '{}' in {}",
            args.model,
            args.ledger.display()
        ),
    }
    Ok(())
}
