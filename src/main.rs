//! stack-eval: answer, translate and score Stack Overflow questions with LLMs.

use anyhow::Result;

fn main() -> Result<()> {
    stack_eval::cli::run()
}
