//! Bounded fan-out/fan-in over a batch of questions.
//!
//! Each item runs on a dedicated rayon pool. An item that errors or panics is
//! logged and counted; it never stops its siblings.

use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use std::io::IsTerminal;
use std::panic::{catch_unwind, AssertUnwindSafe};

/// How a single item ended when it did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemOutcome {
    Completed,
    /// Nothing to do for this item (e.g. no candidate answer); already logged.
    Skipped,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub submitted: usize,
    pub completed: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl std::fmt::Display for BatchReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "submitted={} completed={} skipped={} failed={}",
            self.submitted, self.completed, self.skipped, self.failed
        )
    }
}

/// Something that can name itself in log lines.
pub trait Labeled {
    fn label(&self) -> String;
}

impl Labeled for crate::domain::LoadedQuestion {
    fn label(&self) -> String {
        crate::domain::LoadedQuestion::label(self)
    }
}

enum Outcome {
    Done(ItemOutcome),
    Failed,
}

/// Run `f` over every item with at most `workers` threads and wait for all of
/// them. Only pool construction can fail.
pub fn run_batch<T, F>(workers: usize, items: Vec<T>, name: &str, f: F) -> Result<BatchReport>
where
    T: Labeled + Send + Sync,
    F: Fn(&T) -> Result<ItemOutcome> + Sync,
{
    let pool = rayon::ThreadPoolBuilder::new().num_threads(workers.max(1)).build()?;
    let progress = progress_bar(items.len() as u64, name);

    tracing::info!("{}: {} items, {} workers", name, items.len(), workers.max(1));

    let outcomes: Vec<Outcome> = pool.install(|| {
        items
            .par_iter()
            .map(|item| {
                let label = item.label();
                let outcome = match catch_unwind(AssertUnwindSafe(|| f(item))) {
                    Ok(Ok(outcome)) => Outcome::Done(outcome),
                    Ok(Err(e)) => {
                        tracing::error!("[{}] {} failed: {:#}", label, name, e);
                        Outcome::Failed
                    }
                    Err(panic) => {
                        tracing::error!("[{}] {} panicked: {}", label, name, panic_message(&panic));
                        Outcome::Failed
                    }
                };
                progress.inc(1);
                outcome
            })
            .collect()
    });
    progress.finish_and_clear();

    let mut report = BatchReport { submitted: outcomes.len(), ..BatchReport::default() };
    for outcome in outcomes {
        match outcome {
            Outcome::Done(ItemOutcome::Completed) => report.completed += 1,
            Outcome::Done(ItemOutcome::Skipped) => report.skipped += 1,
            Outcome::Failed => report.failed += 1,
        }
    }
    Ok(report)
}

fn progress_bar(total: u64, name: &str) -> ProgressBar {
    if !std::io::stderr().is_terminal() {
        return ProgressBar::hidden();
    }
    let bar = ProgressBar::new(total);
    bar.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg} [{bar:40.cyan/blue}] {pos}/{len}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );
    bar.set_message(name.to_string());
    bar
}

fn panic_message(panic: &Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
