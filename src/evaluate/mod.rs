//! Evaluation engine: route each question through lint, coverage, the LLM
//! judge and the multi-candidate comparison, persisting results as it goes.

pub mod compare;
pub mod dispatcher;
pub mod judge;
pub mod summary;

pub use compare::{collect_candidates, ComparePrompt};
pub use dispatcher::{Dispatcher, EvalOptions};
pub use summary::CoverageStats;
