//! Command-line interface for stack-eval
//!
//! Provides `answer`, `translate`, `evaluate` and `summary` subcommands over a
//! question directory or CSV, plus shell completions.

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod answer;
mod completions;
mod evaluate;
mod summary;
mod translate;
mod utils;

/// Generate, translate and score LLM answers to Stack Overflow questions
#[derive(Parser)]
#[command(name = "stack-eval")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging (sets log level to DEBUG)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a model answer for every question
    Answer(answer::AnswerArgs),

    /// Translate questions and model answers to Chinese
    Translate(translate::TranslateArgs),

    /// Run lint, coverage, LLM-eval and compare over model answers
    Evaluate(Box<evaluate::EvaluateArgs>),

    /// Print coverage statistics from a result ledger
    Summary(summary::SummaryArgs),

    /// Generate a shell completion script
    Completions(completions::CompletionsArgs),
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    // Values in .env never override variables already set.
    let _ = dotenvy::dotenv();

    // RUST_LOG in the environment always takes precedence; --verbose falls back to DEBUG.
    let filter = if cli.verbose {
        EnvFilter::from_default_env().add_directive(Level::DEBUG.into())
    } else {
        EnvFilter::from_default_env().add_directive(Level::INFO.into())
    };
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .try_init();

    match cli.command {
        Commands::Answer(args) => answer::run(args),
        Commands::Translate(args) => translate::run(args),
        Commands::Evaluate(args) => evaluate::run(*args),
        Commands::Summary(args) => summary::run(args),
        Commands::Completions(args) => completions::run(args),
    }
}
