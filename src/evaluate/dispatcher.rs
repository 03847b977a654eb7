use super::compare::{collect_candidates, ComparePrompt};
use super::judge::judge_messages;
use crate::config::LintSettings;
use crate::coverage::{self, calculate_coverage};
use crate::domain::{model_token, EvalModule, LoadedQuestion, SourceMode};
use crate::lint::LintRunner;
use crate::llm::ChatClient;
use crate::pool::{self, BatchReport, ItemOutcome};
use crate::store::artifacts::{self, ArtifactDir};
use crate::store::ledger::{self, Ledger, LINT_COLUMN, LINT_LOGS_COLUMN};
use anyhow::{Context, Result};
use std::collections::BTreeSet;
use std::sync::Arc;

/// What to evaluate and how.
#[derive(Debug, Clone)]
pub struct EvalOptions {
    /// Model whose answers are being scored.
    pub answer_model: String,
    /// Model acting as judge and comparer.
    pub eval_model: String,
    pub modules: BTreeSet<EvalModule>,
    /// Redo LLM-eval and compare even when their artifacts exist.
    pub force: bool,
    /// Compare candidates among themselves, ignoring the reference.
    pub no_reference: bool,
    pub source: SourceMode,
}

impl EvalOptions {
    /// Every module enabled; the answer model judges itself.
    pub fn new(answer_model: &str, source: SourceMode) -> Self {
        Self {
            answer_model: answer_model.to_string(),
            eval_model: answer_model.to_string(),
            modules: EvalModule::ALL.into_iter().collect(),
            force: false,
            no_reference: false,
            source,
        }
    }

    pub fn eval_model(mut self, model: Option<&str>) -> Self {
        if let Some(model) = model.filter(|m| !m.trim().is_empty()) {
            self.eval_model = model.to_string();
        }
        self
    }

    pub fn modules(mut self, modules: BTreeSet<EvalModule>) -> Self {
        self.modules = modules;
        self
    }

    pub fn force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    pub fn no_reference(mut self, no_reference: bool) -> Self {
        self.no_reference = no_reference;
        self
    }

    pub fn enabled(&self, module: EvalModule) -> bool {
        self.modules.contains(&module)
    }
}

/// Per-question evaluation. Shared by every worker of a batch.
pub struct Dispatcher {
    ledger: Arc<Ledger>,
    client: Arc<dyn ChatClient>,
    lint: LintRunner,
    options: EvalOptions,
    answer_tok: String,
    eval_tok: String,
}

impl Dispatcher {
    /// `client` talks to the eval model. Lint uses the default validators.
    pub fn new(ledger: Arc<Ledger>, client: Arc<dyn ChatClient>, options: EvalOptions) -> Self {
        Self {
            answer_tok: model_token(&options.answer_model),
            eval_tok: model_token(&options.eval_model),
            ledger,
            client,
            lint: LintRunner::from_settings(&LintSettings::default()),
            options,
        }
    }

    pub fn with_lint_runner(mut self, lint: LintRunner) -> Self {
        self.lint = lint;
        self
    }

    pub fn options(&self) -> &EvalOptions {
        &self.options
    }

    /// Evaluate every item on `workers` threads.
    pub fn run(&self, items: Vec<LoadedQuestion>, workers: usize) -> Result<BatchReport> {
        let modules: Vec<&str> = self.options.modules.iter().map(|m| m.as_str()).collect();
        tracing::info!("Enabled evaluation modules: {}", modules.join(", "));
        pool::run_batch(workers, items, "evaluate", |item| self.process(item))
    }

    pub fn process(&self, item: &LoadedQuestion) -> Result<ItemOutcome> {
        let label = item.label();
        let question = &item.question;
        let dir = ArtifactDir::new(&item.dir);

        let Some(candidate) = self.resolve_candidate(item, &dir) else {
            tracing::warn!(
                "[{}] No candidate answer found (model: {}), skipping",
                label,
                self.options.answer_model
            );
            return Ok(ItemOutcome::Skipped);
        };
        let reference = question
            .reference()
            .map(|a| a.body.as_str())
            .filter(|body| !body.trim().is_empty());

        self.ledger.ensure_question(question)?;
        tracing::info!("[{}] Processing: {}", label, item.dir.display());

        if self.options.enabled(EvalModule::Lint) {
            self.run_lint(item, &dir, &candidate)?;
        }
        if self.options.enabled(EvalModule::Coverage) {
            match reference {
                Some(reference) => self.run_coverage(item, &dir, reference, &candidate)?,
                None => tracing::warn!("[{}] No reference answer for coverage check", label),
            }
        }
        if self.options.enabled(EvalModule::LlmEval) {
            self.run_judge(item, &dir, &candidate)?;
        }
        if self.options.enabled(EvalModule::Compare) {
            if reference.is_some() || self.options.no_reference {
                self.run_compare(item, &dir, reference)?;
            } else {
                tracing::warn!("[{}] No reference answer for comparison", label);
            }
        }

        Ok(ItemOutcome::Completed)
    }

    /// Tabular rows carry their candidate inline; directories keep it in
    /// `{tok}_answer.md`. Each mode falls back to the other source.
    fn resolve_candidate(&self, item: &LoadedQuestion, dir: &ArtifactDir) -> Option<String> {
        let inline = || {
            item.question
                .candidate()
                .map(|a| a.body.clone())
                .filter(|body| !body.trim().is_empty())
        };
        let on_disk = || dir.read(&artifacts::answer_file(&self.answer_tok));

        match self.options.source {
            SourceMode::Tabular => inline().or_else(on_disk),
            SourceMode::Directory => on_disk().or_else(inline),
        }
    }

    fn run_lint(&self, item: &LoadedQuestion, dir: &ArtifactDir, candidate: &str) -> Result<()> {
        let tok = &self.answer_tok;
        let report = self.lint.run(candidate);
        let summary = report.summary();
        tracing::info!("[{}] Lint: {}", item.label(), summary);

        let logs = report.logs();
        let log_text = if logs.is_empty() { summary.clone() } else { logs.clone() };
        dir.write(&artifacts::lint_log_file(tok), &log_text)?;

        self.ledger.upsert(
            item.question.id,
            [
                (LINT_COLUMN.to_string(), summary),
                (LINT_LOGS_COLUMN.to_string(), logs),
                (ledger::code_blocks_column(tok), report.merged_blocks()),
            ],
        )
    }

    fn run_coverage(
        &self,
        item: &LoadedQuestion,
        dir: &ArtifactDir,
        reference: &str,
        candidate: &str,
    ) -> Result<()> {
        let tok = &self.answer_tok;
        let result = calculate_coverage(reference, candidate);
        match &result {
            Ok(report) => tracing::info!("[{}] Coverage: {}", item.label(), report.ledger_cell()),
            Err(e) => tracing::warn!("[{}] Coverage not computed: {}", item.label(), e),
        }

        dir.write_json(&artifacts::coverage_file(tok), &coverage::to_json(&result))?;
        let cell = coverage::ledger_cell(&result);
        self.ledger.upsert(item.question.id, [(ledger::coverage_column(tok), cell)])
    }

    fn run_judge(&self, item: &LoadedQuestion, dir: &ArtifactDir, candidate: &str) -> Result<()> {
        let (eval_tok, answer_tok) = (&self.eval_tok, &self.answer_tok);
        let file = artifacts::evaluation_file(eval_tok, answer_tok);
        if !self.options.force && dir.is_done(&file) {
            tracing::info!("[{}] Evaluation already exists, skipping", item.label());
            return Ok(());
        }

        tracing::info!("[{}] Evaluating with {}", item.label(), self.options.eval_model);
        let completion = self
            .client
            .complete(&judge_messages(&item.question, candidate))
            .with_context(|| format!("evaluation with {} failed", self.options.eval_model))?;

        dir.write(&file, &completion.text)?;
        let raw_file = artifacts::evaluation_raw_file(eval_tok, answer_tok);
        dir.write_json(&raw_file, &completion.raw)?;
        self.ledger.upsert(
            item.question.id,
            [(ledger::evaluation_column(eval_tok, answer_tok), completion.text)],
        )?;
        tracing::info!("[{}] Evaluation saved", item.label());
        Ok(())
    }

    fn run_compare(
        &self,
        item: &LoadedQuestion,
        dir: &ArtifactDir,
        reference: Option<&str>,
    ) -> Result<()> {
        let tok = &self.answer_tok;
        let no_reference = self.options.no_reference;

        let record = self.ledger.get(item.question.id);
        let candidates = collect_candidates(dir, record.as_ref());
        let prompt = ComparePrompt::build(&item.question, reference, &candidates, no_reference);
        let Some(prompt) = prompt else {
            tracing::warn!("[{}] No candidate answers to compare", item.label());
            return Ok(());
        };

        dir.write(&artifacts::compare_prompt_file(tok, no_reference), &prompt.file_contents())?;

        let result_file = artifacts::compare_result_file(tok, no_reference);
        if !self.options.force && dir.is_done(&result_file) {
            tracing::info!("[{}] Comparison already exists, skipping", item.label());
            return Ok(());
        }

        let names: Vec<&str> = candidates.keys().map(String::as_str).collect();
        tracing::info!(
            "[{}] Comparing {} answers: {}",
            item.label(),
            names.len(),
            names.join(", ")
        );
        let completion = self
            .client
            .complete(&prompt.messages())
            .with_context(|| format!("comparison with {} failed", self.options.eval_model))?;

        dir.write(&result_file, &completion.text)?;
        dir.write_json(&artifacts::compare_raw_file(tok, no_reference), &completion.raw)?;
        self.ledger.upsert(
            item.question.id,
            [(ledger::compare_column(tok, no_reference), completion.text)],
        )?;
        tracing::info!("[{}] Comparison saved", item.label());
        Ok(())
    }
}
