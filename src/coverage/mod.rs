//! YAML field coverage between a reference answer and a candidate answer.
//!
//! The first reference document that parses becomes the gold document; every
//! candidate document is compared against it and the best one wins. Coverage
//! counts key paths only, so differing values are not penalized.

pub mod extract;
pub mod keys;

pub use extract::{extract_yaml_docs, preprocess_template};
pub use keys::field_keys;

use serde::Serialize;
use serde_json::{json, Value as JsonValue};
use serde_yaml::Value;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoverageReport {
    pub total_fields: usize,
    pub matched_fields: usize,
    /// Reference keys absent from the candidate, sorted.
    pub missing_fields: Vec<String>,
    pub ratio: f64,
    /// `ratio * 100`, rounded to two decimals.
    pub percentage: f64,
}

impl CoverageReport {
    /// Ledger cell text, e.g. `66.67% (2/3)`.
    pub fn ledger_cell(&self) -> String {
        format!("{:.2}% ({}/{})", self.percentage, self.matched_fields, self.total_fields)
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoverageError {
    #[error("reference answer is empty")]
    EmptyReference,
    #[error("no YAML blocks found in reference answer")]
    NoReferenceYaml,
    #[error("reference has YAML blocks but none are valid")]
    NoValidReference,
    #[error("reference YAML parsed to null")]
    NullReference,
    #[error("{0}")]
    Parse(String),
}

pub type CoverageResult = Result<CoverageReport, CoverageError>;

/// Ledger cell for a coverage outcome.
pub fn ledger_cell(result: &CoverageResult) -> String {
    match result {
        Ok(report) => report.ledger_cell(),
        Err(e) => format!("ERROR: {e}"),
    }
}

/// Contents of the `{tok}_coverage.json` artifact.
pub fn to_json(result: &CoverageResult) -> JsonValue {
    match result {
        Ok(report) => json!({
            "total_fields": report.total_fields,
            "matched_fields": report.matched_fields,
            "missing_fields": report.missing_fields,
            "ratio": report.ratio,
            "percentage": report.percentage,
            "error": null,
        }),
        Err(e) => json!({ "error": e.to_string(), "percentage": 0.0 }),
    }
}

/// Coverage of `candidate_text` against the first usable YAML document of
/// `reference_text`.
pub fn calculate_coverage(reference_text: &str, candidate_text: &str) -> CoverageResult {
    if reference_text.trim().is_empty() {
        return Err(CoverageError::EmptyReference);
    }

    let gold_docs = extract_yaml_docs(reference_text);
    if gold_docs.is_empty() {
        return Err(CoverageError::NoReferenceYaml);
    }

    let gold = gold_docs
        .iter()
        .find(|doc| compare_pair(doc, doc).is_ok())
        .ok_or(CoverageError::NoValidReference)?;

    let mut best: Option<CoverageReport> = None;
    for candidate in extract_yaml_docs(candidate_text) {
        let Ok(report) = compare_pair(gold, &candidate) else {
            continue;
        };
        if best.as_ref().map_or(true, |b| report.percentage > b.percentage) {
            best = Some(report);
        }
    }

    match best {
        Some(report) => Ok(report),
        None => compare_pair(gold, ""),
    }
}

/// Compare one reference document with one candidate document.
pub fn compare_pair(reference: &str, candidate: &str) -> CoverageResult {
    let gold = parse_yaml(&preprocess_template(reference))?;
    let pred = parse_yaml(&preprocess_template(candidate))?;

    if gold.is_null() {
        return Err(CoverageError::NullReference);
    }

    let gold_keys = field_keys(&gold);
    let pred_keys = if is_falsy(&pred) { Default::default() } else { field_keys(&pred) };

    let total = gold_keys.len();
    let matched = gold_keys.intersection(&pred_keys).count();
    let missing: Vec<String> = gold_keys.difference(&pred_keys).cloned().collect();
    let ratio = if total > 0 { matched as f64 / total as f64 } else { 0.0 };

    Ok(CoverageReport {
        total_fields: total,
        matched_fields: matched,
        missing_fields: missing,
        ratio,
        percentage: round_cents(ratio * 100.0),
    })
}

/// Round to two decimals on the exact binary value, ties to even. Scores in
/// existing datasets were rounded this way, so `1/32` gives `3.12`.
fn round_cents(value: f64) -> f64 {
    if !value.is_finite() || value == 0.0 {
        return value;
    }
    let bits = value.abs().to_bits();
    let biased_exp = ((bits >> 52) & 0x7ff) as i64;
    let fraction = bits & ((1u64 << 52) - 1);
    let (mantissa, exp) = if biased_exp == 0 {
        (fraction, -1074)
    } else {
        (fraction | (1u64 << 52), biased_exp - 1075)
    };
    if exp >= 0 {
        // Already an integer.
        return value;
    }

    // |value| * 100 == mantissa * 100 / 2^shift
    let scaled = u128::from(mantissa) * 100;
    let shift = (-exp) as u32;
    let cents = if shift >= 127 {
        0
    } else {
        let quotient = scaled >> shift;
        let remainder = scaled - (quotient << shift);
        let half = 1u128 << (shift - 1);
        if remainder > half || (remainder == half && quotient & 1 == 1) {
            quotient + 1
        } else {
            quotient
        }
    };
    (cents as f64 / 100.0).copysign(value)
}

fn parse_yaml(text: &str) -> Result<Value, CoverageError> {
    let has_content =
        text.lines().map(str::trim).any(|l| !l.is_empty() && !l.starts_with('#'));
    if !has_content {
        return Ok(Value::Null);
    }
    let value: Value =
        serde_yaml::from_str(text).map_err(|e| CoverageError::Parse(e.to_string()))?;
    if let Some(tag) = custom_tag(&value) {
        return Err(CoverageError::Parse(format!(
            "could not determine a constructor for the tag '{tag}'"
        )));
    }
    Ok(value)
}

/// Application tags such as `!Ref` are rejected rather than guessed at.
fn custom_tag(value: &Value) -> Option<String> {
    match value {
        Value::Tagged(tagged) => Some(tagged.tag.to_string()),
        Value::Sequence(items) => items.iter().find_map(custom_tag),
        Value::Mapping(map) => {
            map.iter().find_map(|(k, v)| custom_tag(k).or_else(|| custom_tag(v)))
        }
        _ => None,
    }
}

fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Sequence(items) => items.is_empty(),
        Value::Mapping(map) => map.is_empty(),
        Value::Tagged(tagged) => is_falsy(&tagged.value),
    }
}
