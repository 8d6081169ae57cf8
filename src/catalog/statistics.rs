//! Per-table cardinality statistics consumed by the cardinality estimator.

use crate::common::Value;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One bucket of an equi-width or equi-depth histogram.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistogramBucket {
    pub lower: Value,
    pub upper: Value,
    pub row_count: u64,
    pub distinct_count: u64,
    /// Count of the single most frequent value in the bucket, used for
    /// equality-selectivity estimates against a known popular value.
    pub repeat_count: u64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum HistogramKind {
    EquiWidth,
    EquiDepth,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Histogram {
    pub kind: HistogramKind,
    pub buckets: Vec<HistogramBucket>,
}

impl Histogram {
    pub fn total_rows(&self) -> u64 {
        self.buckets.iter().map(|b| b.row_count).sum()
    }

    /// Locate the bucket containing `value`, if any bound information is
    /// numeric-comparable.
    pub fn bucket_for<'a>(&'a self, value: &Value) -> Option<&'a HistogramBucket> {
        self.buckets
            .iter()
            .find(|b| value >= &b.lower && value <= &b.upper)
    }
}

/// Per-column statistics: distinct-value count, nulls, bounds, width, and
/// an optional histogram.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnStatistics {
    pub distinct_count: u64,
    pub null_count: u64,
    pub min: Option<Value>,
    pub max: Option<Value>,
    pub avg_width: f64,
    pub histogram: Option<Histogram>,
}

impl ColumnStatistics {
    pub fn new(distinct_count: u64) -> Self {
        Self {
            distinct_count: distinct_count.max(1),
            null_count: 0,
            min: None,
            max: None,
            avg_width: 8.0,
            histogram: None,
        }
    }

    pub fn with_histogram(mut self, histogram: Histogram) -> Self {
        self.histogram = Some(histogram);
        self
    }
}

/// Statistics for one table: row count plus per-column statistics.
/// Replaced atomically as a whole on refresh (see `Catalog::refresh_statistics`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableStatistics {
    pub row_count: u64,
    pub columns: HashMap<String, ColumnStatistics>,
    /// Pearson correlation coefficient between two columns, keyed
    /// order-independently. Absent pairs are assumed uncorrelated.
    pub column_correlations: HashMap<(String, String), f64>,
}

/// Used when no statistics have been collected for a table yet.
pub const DEFAULT_ROW_COUNT: u64 = 10_000;

impl TableStatistics {
    pub fn new(row_count: u64) -> Self {
        Self {
            row_count,
            columns: HashMap::new(),
            column_correlations: HashMap::new(),
        }
    }

    pub fn with_column(mut self, name: impl Into<String>, stats: ColumnStatistics) -> Self {
        self.columns.insert(name.into(), stats);
        self
    }

    pub fn with_correlation(mut self, a: impl Into<String>, b: impl Into<String>, corr: f64) -> Self {
        self.column_correlations.insert(correlation_key(a.into(), b.into()), corr.clamp(-1.0, 1.0));
        self
    }

    pub fn column(&self, name: &str) -> Option<&ColumnStatistics> {
        self.columns.get(name)
    }

    /// Correlation between two columns; 0.0 (independent) if no statistic
    /// has been recorded for the pair.
    pub fn correlation(&self, a: &str, b: &str) -> f64 {
        if a == b {
            return 1.0;
        }
        self.column_correlations
            .get(&correlation_key(a.to_string(), b.to_string()))
            .copied()
            .unwrap_or(0.0)
    }
}

fn correlation_key(a: String, b: String) -> (String, String) {
    if a <= b { (a, b) } else { (b, a) }
}
