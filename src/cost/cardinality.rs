//! Row-count estimation from catalog statistics. A stateless estimator
//! over `Catalog`: every call reads whatever `TableStatistics` is
//! currently registered rather than caching a snapshot, so a statistics
//! refresh is visible to the next estimate without any invalidation step.

use crate::catalog::statistics::DEFAULT_ROW_COUNT;
use crate::catalog::{Catalog, TableStatistics};
use crate::common::Value;
use crate::error::OptimizerError;
use crate::expression::{ComparisonOp, Expr, Operator};
use crate::plan::logical::JoinType;

const DEFAULT_EQ_SELECTIVITY: f64 = 0.1;
const DEFAULT_LIKE_SELECTIVITY: f64 = 0.25;
const MIN_SELECTIVITY: f64 = 1e-4;
const MAX_OR_SELECTIVITY: f64 = 0.95;
const MAX_IN_SELECTIVITY: f64 = 0.95;

pub struct CardinalityEstimator<'a> {
    catalog: &'a Catalog,
}

impl<'a> CardinalityEstimator<'a> {
    pub fn new(catalog: &'a Catalog) -> Self {
        Self { catalog }
    }

    fn stats_for(&self, table: &str) -> Option<TableStatistics> {
        self.catalog.get_statistics(table)
    }

    /// Row count for a bare table scan. Missing statistics fall back to the
    /// default row count and surface a recoverable diagnostic upstream.
    pub fn estimate_table_scan(&self, table: &str) -> (f64, Option<OptimizerError>) {
        match self.stats_for(table) {
            Some(s) => (s.row_count as f64, None),
            None => (
                DEFAULT_ROW_COUNT as f64,
                Some(OptimizerError::StatisticsUnavailable(table.to_string())),
            ),
        }
    }

    pub fn estimate_filter(&self, table: &str, input_rows: f64, predicates: &[Expr]) -> f64 {
        let stats = self.stats_for(table);
        let sel = self.combined_selectivity(stats.as_ref(), predicates);
        (input_rows * sel).max(0.0)
    }

    /// Combined selectivity of a top-level conjunction of predicates. Each
    /// predicate past the first has its selectivity adjusted against the
    /// single-column predicate immediately before it, using the table's
    /// recorded column correlation: positive correlation shrinks it
    /// (the two predicates tend to narrow the same rows), negative
    /// correlation expands it.
    fn combined_selectivity(&self, stats: Option<&TableStatistics>, predicates: &[Expr]) -> f64 {
        if predicates.is_empty() {
            return 1.0;
        }
        let mut product = 1.0;
        let mut prev_col: Option<String> = None;
        for p in predicates {
            let mut s = self.predicate_selectivity(stats, p);
            let col = single_column(p);
            if let (Some(prev), Some(cur), Some(stats)) = (&prev_col, &col, stats) {
                let corr = stats.correlation(prev, cur);
                let factor = (1.0 - corr * 0.3).max(0.0);
                s = (s * factor).min(1.0);
            }
            product *= s;
            if col.is_some() {
                prev_col = col;
            }
        }
        product.max(MIN_SELECTIVITY)
    }

    fn predicate_selectivity(&self, stats: Option<&TableStatistics>, expr: &Expr) -> f64 {
        match expr {
            Expr::BinaryOp { left, op: Operator::Logical(crate::expression::LogicalOp::And), right } => {
                self.predicate_selectivity(stats, left) * self.predicate_selectivity(stats, right)
            }
            Expr::BinaryOp { left, op: Operator::Logical(crate::expression::LogicalOp::Or), right } => {
                let a = self.predicate_selectivity(stats, left);
                let b = self.predicate_selectivity(stats, right);
                (1.0 - (1.0 - a) * (1.0 - b)).min(MAX_OR_SELECTIVITY)
            }
            Expr::BinaryOp { left, op: Operator::Comparison(cmp), right } => {
                self.comparison_selectivity(stats, left, *cmp, right)
            }
            Expr::Between { expr, low, high, negated } => {
                let s = self.range_selectivity(stats, expr, Some(low), Some(high));
                if *negated { 1.0 - s } else { s }
            }
            Expr::InList { expr, list, negated } => {
                let col = column_name(expr);
                let col_stats = col.and_then(|c| stats.and_then(|s| s.column(c)));
                let per_item = col_stats.map(|cs| 1.0 / cs.distinct_count as f64).unwrap_or(DEFAULT_EQ_SELECTIVITY);
                let s = (per_item * list.len() as f64).min(MAX_IN_SELECTIVITY);
                if *negated { 1.0 - s } else { s }
            }
            Expr::IsNull { expr, negated } => {
                let col = column_name(expr);
                let col_stats = col.and_then(|c| stats.and_then(|s| s.column(c)));
                let total = stats.map(|s| s.row_count).unwrap_or(DEFAULT_ROW_COUNT).max(1) as f64;
                let null_frac = col_stats.map(|cs| cs.null_count as f64 / total).unwrap_or(0.0);
                if *negated { 1.0 - null_frac } else { null_frac }
            }
            Expr::Not(inner) => 1.0 - self.predicate_selectivity(stats, inner),
            _ => DEFAULT_EQ_SELECTIVITY,
        }
    }

    fn comparison_selectivity(
        &self,
        stats: Option<&TableStatistics>,
        left: &Expr,
        cmp: ComparisonOp,
        right: &Expr,
    ) -> f64 {
        let (col_expr, lit_expr, flipped) = match (left, right) {
            (Expr::Column { .. }, Expr::Literal(_)) => (left, right, false),
            (Expr::Literal(_), Expr::Column { .. }) => (right, left, true),
            _ => return DEFAULT_EQ_SELECTIVITY,
        };
        let col = match column_name(col_expr) {
            Some(c) => c,
            None => return DEFAULT_EQ_SELECTIVITY,
        };
        let col_stats = stats.and_then(|s| s.column(col));
        let value = match lit_expr {
            Expr::Literal(v) => v,
            _ => return DEFAULT_EQ_SELECTIVITY,
        };

        let effective_cmp = if flipped { flip(cmp) } else { cmp };
        match effective_cmp {
            ComparisonOp::Eq => self.equality_selectivity(col_stats, value),
            ComparisonOp::NotEq => 1.0 - self.equality_selectivity(col_stats, value),
            ComparisonOp::Lt | ComparisonOp::LtEq | ComparisonOp::Gt | ComparisonOp::GtEq => {
                self.range_selectivity_bound(col_stats, effective_cmp, value)
            }
        }
    }

    fn equality_selectivity(&self, col_stats: Option<&crate::catalog::ColumnStatistics>, value: &Value) -> f64 {
        if let Some(cs) = col_stats {
            if let Some(hist) = &cs.histogram {
                if let Some(bucket) = hist.bucket_for(value) {
                    let total = hist.total_rows().max(1) as f64;
                    return (bucket.row_count as f64 / total / bucket.distinct_count.max(1) as f64).max(MIN_SELECTIVITY);
                }
            }
            return (1.0 / cs.distinct_count as f64).max(MIN_SELECTIVITY);
        }
        DEFAULT_EQ_SELECTIVITY
    }

    fn range_selectivity_bound(
        &self,
        col_stats: Option<&crate::catalog::ColumnStatistics>,
        cmp: ComparisonOp,
        bound: &Value,
    ) -> f64 {
        let Some(cs) = col_stats else { return DEFAULT_EQ_SELECTIVITY };
        let (Some(min), Some(max)) = (&cs.min, &cs.max) else { return DEFAULT_EQ_SELECTIVITY };
        let (Value::Int(lo), Value::Int(hi), Value::Int(b)) = (min, max, bound) else {
            return DEFAULT_EQ_SELECTIVITY;
        };
        if hi <= lo {
            return 1.0;
        }
        let span = (*hi - *lo) as f64;
        let frac_below = ((*b - *lo) as f64 / span).clamp(0.0, 1.0);
        match cmp {
            ComparisonOp::Lt | ComparisonOp::LtEq => frac_below,
            ComparisonOp::Gt | ComparisonOp::GtEq => 1.0 - frac_below,
            _ => DEFAULT_EQ_SELECTIVITY,
        }
    }

    fn range_selectivity(
        &self,
        stats: Option<&TableStatistics>,
        expr: &Expr,
        low: Option<&Expr>,
        high: Option<&Expr>,
    ) -> f64 {
        let col = match column_name(expr) {
            Some(c) => c,
            None => return DEFAULT_EQ_SELECTIVITY,
        };
        let col_stats = stats.and_then(|s| s.column(col));
        let above_low = match low {
            Some(Expr::Literal(v)) => self.range_selectivity_bound(col_stats, ComparisonOp::GtEq, v),
            _ => 1.0,
        };
        let below_high = match high {
            Some(Expr::Literal(v)) => self.range_selectivity_bound(col_stats, ComparisonOp::LtEq, v),
            _ => 1.0,
        };
        (above_low + below_high - 1.0).clamp(MIN_SELECTIVITY, 1.0)
    }

    /// Estimate LIKE selectivity; a known literal prefix narrows the
    /// default by scaling toward the equality estimate.
    pub fn like_selectivity(&self, pattern: &str) -> f64 {
        if let Some(prefix_len) = pattern.find('%') {
            if prefix_len > 0 {
                return (DEFAULT_LIKE_SELECTIVITY / (prefix_len as f64 + 1.0)).max(MIN_SELECTIVITY);
            }
        }
        DEFAULT_LIKE_SELECTIVITY
    }

    pub fn estimate_join(&self, left_rows: f64, right_rows: f64, join_type: JoinType, is_fk: bool) -> f64 {
        if is_fk {
            return left_rows;
        }
        let s = (1.0 / (left_rows.min(right_rows).max(1.0)).sqrt()).clamp(0.01, 0.3);
        let inner = left_rows * right_rows * s;
        match join_type {
            JoinType::Inner | JoinType::Cross => inner,
            JoinType::LeftOuter => inner.max(left_rows),
            JoinType::RightOuter => inner.max(right_rows),
            JoinType::FullOuter => (left_rows + right_rows - inner).max(inner),
            JoinType::Semi => left_rows / 2.0,
            JoinType::AntiSemi => (left_rows - left_rows / 2.0).max(0.0),
        }
    }

    pub fn estimate_distinct(&self, table: &str, columns: &[String]) -> f64 {
        let stats = self.stats_for(table);
        let ndvs: Vec<f64> = columns
            .iter()
            .filter_map(|c| stats.as_ref().and_then(|s| s.column(c)).map(|cs| cs.distinct_count as f64))
            .collect();
        ndvs.into_iter().fold(f64::INFINITY, f64::min).min(
            stats.map(|s| s.row_count as f64).unwrap_or(DEFAULT_ROW_COUNT as f64),
        )
    }
}

fn column_name(expr: &Expr) -> Option<&str> {
    match expr {
        Expr::Column { name, .. } => Some(name.as_str()),
        _ => None,
    }
}

/// The single column a predicate refers to, if it references exactly one.
fn single_column(expr: &Expr) -> Option<String> {
    let mut cols = Vec::new();
    expr.referenced_columns(&mut cols);
    cols.dedup();
    if cols.len() == 1 { cols.pop() } else { None }
}

fn flip(cmp: ComparisonOp) -> ComparisonOp {
    match cmp {
        ComparisonOp::Lt => ComparisonOp::Gt,
        ComparisonOp::LtEq => ComparisonOp::GtEq,
        ComparisonOp::Gt => ComparisonOp::Lt,
        ComparisonOp::GtEq => ComparisonOp::LtEq,
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{ColumnStatistics, TableStatistics};

    fn catalog_with_users() -> Catalog {
        let catalog = Catalog::new();
        let stats = TableStatistics::new(10_000).with_column(
            "age",
            ColumnStatistics::new(100).with_histogram(crate::catalog::Histogram {
                kind: crate::catalog::statistics::HistogramKind::EquiWidth,
                buckets: vec![],
            }),
        );
        catalog.refresh_statistics("users", stats);
        catalog
    }

    #[test]
    fn missing_statistics_falls_back_to_default() {
        let catalog = Catalog::new();
        let est = CardinalityEstimator::new(&catalog);
        let (rows, diag) = est.estimate_table_scan("ghost");
        assert_eq!(rows, DEFAULT_ROW_COUNT as f64);
        assert!(diag.is_some());
    }

    #[test]
    fn equality_selectivity_uses_ndv() {
        let catalog = catalog_with_users();
        let est = CardinalityEstimator::new(&catalog);
        let pred = Expr::column("age").eq(Expr::lit(Value::Int(30)));
        let rows = est.estimate_filter("users", 10_000.0, &[pred]);
        assert!((rows - 100.0).abs() < 1.0);
    }

    #[test]
    fn positive_correlation_shrinks_combined_selectivity() {
        let catalog = Catalog::new();
        let stats = TableStatistics::new(10_000)
            .with_column("city", ColumnStatistics::new(50))
            .with_column("state", ColumnStatistics::new(10))
            .with_correlation("city", "state", 0.9);
        catalog.refresh_statistics("users", stats);
        let est = CardinalityEstimator::new(&catalog);
        let preds = vec![
            Expr::column("city").eq(Expr::lit(Value::Int(1))),
            Expr::column("state").eq(Expr::lit(Value::Int(1))),
        ];
        let correlated = est.estimate_filter("users", 10_000.0, &preds);

        let catalog_uncorrelated = Catalog::new();
        catalog_uncorrelated.refresh_statistics(
            "users",
            TableStatistics::new(10_000)
                .with_column("city", ColumnStatistics::new(50))
                .with_column("state", ColumnStatistics::new(10)),
        );
        let est_uncorrelated = CardinalityEstimator::new(&catalog_uncorrelated);
        let uncorrelated = est_uncorrelated.estimate_filter("users", 10_000.0, &preds);

        assert!(correlated > uncorrelated);
    }

    #[test]
    fn negative_correlation_expands_combined_selectivity() {
        let catalog = Catalog::new();
        let stats = TableStatistics::new(10_000)
            .with_column("is_active", ColumnStatistics::new(2))
            .with_column("is_deleted", ColumnStatistics::new(2))
            .with_correlation("is_active", "is_deleted", -0.8);
        catalog.refresh_statistics("flags", stats);
        let est = CardinalityEstimator::new(&catalog);
        let preds = vec![
            Expr::column("is_active").eq(Expr::lit(Value::Boolean(true))),
            Expr::column("is_deleted").eq(Expr::lit(Value::Boolean(true))),
        ];
        let expanded = est.estimate_filter("flags", 10_000.0, &preds);

        let catalog_uncorrelated = Catalog::new();
        catalog_uncorrelated.refresh_statistics(
            "flags",
            TableStatistics::new(10_000)
                .with_column("is_active", ColumnStatistics::new(2))
                .with_column("is_deleted", ColumnStatistics::new(2)),
        );
        let est_uncorrelated = CardinalityEstimator::new(&catalog_uncorrelated);
        let baseline = est_uncorrelated.estimate_filter("flags", 10_000.0, &preds);

        assert!(expanded > baseline);
    }

    #[test]
    fn join_cardinality_respects_foreign_key_hint() {
        let catalog = Catalog::new();
        let est = CardinalityEstimator::new(&catalog);
        assert_eq!(est.estimate_join(1000.0, 50.0, JoinType::Inner, true), 1000.0);
    }

    #[test]
    fn left_outer_join_floor_is_left_cardinality() {
        let catalog = Catalog::new();
        let est = CardinalityEstimator::new(&catalog);
        let rows = est.estimate_join(1000.0, 1.0, JoinType::LeftOuter, false);
        assert!(rows >= 1000.0);
    }
}
