//! Per-scan index scoring: given a table's available indexes and the
//! predicates/required columns at a scan site, picks the index (if any)
//! that minimizes estimated access cost.

use crate::catalog::{Catalog, Index};
use crate::cost::cardinality::CardinalityEstimator;
use crate::expression::Expr;
use crate::hints::OptimizerHints;

const EQUALITY_PREFIX_POINTS: f64 = 10.0;
const SELECTIVITY_POINTS: f64 = 5.0;
const COVERING_BONUS: f64 = 3.0;
const UNIQUE_EQUALITY_BONUS: f64 = 20.0;
const FORCE_INDEX_BIAS: f64 = 1_000.0;

#[derive(Debug, Clone)]
pub struct IndexChoice {
    pub index_name: Option<String>,
    pub score: f64,
}

pub struct IndexSelector<'a> {
    catalog: &'a Catalog,
}

impl<'a> IndexSelector<'a> {
    pub fn new(catalog: &'a Catalog) -> Self {
        Self { catalog }
    }

    /// Choose the best index for a scan of `table`, given its pushed-down
    /// predicates and the columns the plan needs from it above the scan.
    /// Returns `None` when a full scan scores at least as well as any index.
    pub fn select(
        &self,
        table: &str,
        predicates: &[Expr],
        required_columns: &[String],
        hints: &OptimizerHints,
    ) -> IndexChoice {
        let Ok(info) = self.catalog.get_table(table) else {
            return IndexChoice { index_name: None, score: 0.0 };
        };

        let predicate_columns = equality_and_range_columns(predicates);
        let equality_columns: Vec<String> = predicate_columns.iter().filter(|(_, eq)| *eq).map(|(c, _)| c.clone()).collect();
        let range_columns: Vec<String> = predicate_columns.iter().filter(|(_, eq)| !*eq).map(|(c, _)| c.clone()).collect();

        let estimator = CardinalityEstimator::new(self.catalog);
        let (table_rows, _) = estimator.estimate_table_scan(table);
        let filtered_rows = estimator.estimate_filter(table, table_rows, predicates);

        let mut best: Option<(String, f64)> = None;
        for index in &info.indexes {
            if let Some(ignored) = hints.ignore_index.get(table) {
                if ignored == &index.name {
                    continue;
                }
            }
            if let Some(used) = hints.use_index.get(table) {
                if used != &index.name {
                    continue;
                }
            }
            let score = self.score_index(
                index,
                &equality_columns,
                &range_columns,
                required_columns,
                table_rows,
                filtered_rows,
            );
            if best.as_ref().map(|(_, s)| score > *s).unwrap_or(true) {
                best = Some((index.name.clone(), score));
            }
        }

        if let Some(forced) = hints.force_index.get(table) {
            if info.indexes.iter().any(|ix| &ix.name == forced) {
                return IndexChoice { index_name: Some(forced.clone()), score: FORCE_INDEX_BIAS };
            }
        }

        match best {
            Some((name, score)) if score > 0.0 => IndexChoice { index_name: Some(name), score },
            _ => IndexChoice { index_name: None, score: 0.0 },
        }
    }

    fn score_index(
        &self,
        index: &Index,
        equality_columns: &[String],
        range_columns: &[String],
        required_columns: &[String],
        table_rows: f64,
        filtered_rows: f64,
    ) -> f64 {
        let mut score = 0.0;

        let prefix_len = index.matching_prefix_len(equality_columns);
        score += prefix_len as f64 * EQUALITY_PREFIX_POINTS;

        // An index only earns the selectivity bonus when it can actually
        // narrow the scan with its equality prefix; otherwise every index
        // (and the full scan) would see the same predicate selectivity.
        if prefix_len > 0 && filtered_rows > 0.0 && table_rows > 0.0 {
            score += SELECTIVITY_POINTS * (table_rows / filtered_rows).log2().max(0.0);
        }

        if prefix_len == equality_columns.len() && !equality_columns.is_empty() && index.unique {
            score += UNIQUE_EQUALITY_BONUS;
        }

        if let Some(next_col) = index.columns.get(prefix_len) {
            if range_columns.contains(next_col) {
                score += SELECTIVITY_POINTS;
            }
        }

        if index.is_covering(required_columns) {
            score += COVERING_BONUS;
        }

        score
    }
}

/// Split predicates' leading column references into equality vs. range
/// comparisons, in top-level-conjunct order.
fn equality_and_range_columns(predicates: &[Expr]) -> Vec<(String, bool)> {
    use crate::expression::{ComparisonOp, Operator};
    let mut out = Vec::new();
    for p in predicates {
        match p {
            Expr::BinaryOp { left, op: Operator::Comparison(cmp), right } => {
                let col = match (left.as_ref(), right.as_ref()) {
                    (Expr::Column { name, .. }, Expr::Literal(_)) => Some(name.clone()),
                    (Expr::Literal(_), Expr::Column { name, .. }) => Some(name.clone()),
                    _ => None,
                };
                if let Some(col) = col {
                    out.push((col, matches!(cmp, ComparisonOp::Eq)));
                }
            }
            Expr::Between { expr, .. } => {
                if let Expr::Column { name, .. } = expr.as_ref() {
                    out.push((name.clone(), false));
                }
            }
            _ => {}
        }
    }
    out
}
