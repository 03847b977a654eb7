//! Coverage statistics over a ledger's `{tok}_Coverage` column.

use crate::domain::model_token;
use crate::store::ledger::coverage_column;
use crate::store::Ledger;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;

static PERCENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"([\d.]+)%").expect("valid regex"));

#[derive(Debug, Clone, PartialEq)]
pub struct CoverageStats {
    /// Ledger rows, with or without a coverage value.
    pub total_records: usize,
    pub values: Vec<f64>,
}

impl CoverageStats {
    /// Cells that don't contain a `NN.NN%` figure (blank, `ERROR: ...`) are
    /// not counted as valid.
    pub fn from_cells<'a>(total_records: usize, cells: impl IntoIterator<Item = &'a str>) -> Self {
        let values = cells
            .into_iter()
            .filter_map(|cell| PERCENT.captures(cell))
            .filter_map(|caps| caps[1].parse::<f64>().ok())
            .collect();
        Self { total_records, values }
    }

    /// `None` when the ledger has no coverage column for `model`.
    pub fn from_ledger(ledger: &Ledger, model: &str) -> Option<Self> {
        let column = coverage_column(&model_token(model));
        if !ledger.has_column(&column) {
            return None;
        }
        let cells = ledger.column_values(&column);
        Some(Self::from_cells(cells.len(), cells.iter().map(|(_, v)| v.as_str())))
    }

    pub fn valid(&self) -> usize {
        self.values.len()
    }

    pub fn mean(&self) -> Option<f64> {
        if self.values.is_empty() {
            None
        } else {
            Some(self.values.iter().sum::<f64>() / self.values.len() as f64)
        }
    }

    pub fn max(&self) -> Option<f64> {
        self.values.iter().copied().reduce(f64::max)
    }

    pub fn min(&self) -> Option<f64> {
        self.values.iter().copied().reduce(f64::min)
    }

    /// Counts for 100%, 90-99%, 60-89% and below 60%.
    pub fn buckets(&self) -> [usize; 4] {
        let mut buckets = [0; 4];
        for &v in &self.values {
            let idx = if v >= 100.0 {
                0
            } else if v >= 90.0 {
                1
            } else if v >= 60.0 {
                2
            } else {
                3
            };
            buckets[idx] += 1;
        }
        buckets
    }
}

impl fmt::Display for CoverageStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = "=".repeat(60);
        let (Some(mean), Some(max), Some(min)) = (self.mean(), self.max(), self.min()) else {
            return writeln!(f, "No valid coverage data found.");
        };
        let valid = self.valid() as f64;
        let share = |n: usize| n as f64 / valid * 100.0;
        let [full, high, medium, low] = self.buckets();

        writeln!(f, "{rule}")?;
        writeln!(f, "COMPARISON RESULT STATISTICS")?;
        writeln!(f, "{rule}")?;
        writeln!(f, "Total Records: {}", self.total_records)?;
        writeln!(f, "Valid Comparisons: {}", self.valid())?;
        writeln!(f, "Average Coverage: {mean:.2}%")?;
        writeln!(f, "Max Coverage: {max:.2}%")?;
        writeln!(f, "Min Coverage: {min:.2}%")?;
        writeln!(f)?;
        writeln!(f, "Coverage Distribution:")?;
        writeln!(f, "  100%:    {} ({:.1}%)", full, share(full))?;
        writeln!(f, "  90-99%:  {} ({:.1}%)", high, share(high))?;
        writeln!(f, "  60-89%:  {} ({:.1}%)", medium, share(medium))?;
        writeln!(f, "  <60%:    {} ({:.1}%)", low, share(low))?;
        writeln!(f, "{rule}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_stats_from_cells() {
        let cells = [
            "100.00% (4/4)",
            "95.50% (21/22)",
            "",
            "ERROR: reference answer is empty",
            "59.99% (1/2)",
            "75.00% (3/4)",
        ];
        let stats = CoverageStats::from_cells(cells.len(), cells);

        assert_eq!(stats.total_records, 6);
        assert_eq!(stats.valid(), 4);
        assert_eq!(stats.max(), Some(100.0));
        assert_eq!(stats.min(), Some(59.99));
        assert_eq!(stats.buckets(), [1, 1, 1, 1]);
        insta::assert_snapshot!(stats.to_string(), @r###"
        ============================================================
        COMPARISON RESULT STATISTICS
        ============================================================
        Total Records: 6
        Valid Comparisons: 4
        Average Coverage: 82.62%
        Max Coverage: 100.00%
        Min Coverage: 59.99%

        Coverage Distribution:
          100%:    1 (25.0%)
          90-99%:  1 (25.0%)
          60-89%:  1 (25.0%)
          <60%:    1 (25.0%)
        ============================================================
        "###);
    }

    #[test]
    fn test_no_valid_values() {
        let stats = CoverageStats::from_cells(2, ["", "ERROR: x"]);
        assert_eq!(stats.mean(), None);
        assert_eq!(stats.to_string(), "No valid coverage data found.\n");
    }

    #[test]
    fn test_from_ledger() {
        let tmp = TempDir::new().unwrap();
        let ledger = Ledger::open(tmp.path().join("results.csv")).unwrap();
        assert!(CoverageStats::from_ledger(&ledger, "gpt-4o").is_none());

        ledger.upsert(1, [("gpt4o_Coverage", "50.00% (1/2)")]).unwrap();
        ledger.upsert(2, [("Question Title", "no coverage yet")]).unwrap();

        let stats = CoverageStats::from_ledger(&ledger, "gpt-4o").unwrap();
        assert_eq!(stats.total_records, 2);
        assert_eq!(stats.values, vec![50.0]);
    }
}
