//! Subquery rewrites: flatten non-correlated `IN (SELECT ...)` into a
//! semi-join, and decorrelate `EXISTS`/`NOT EXISTS` into a semi-join or
//! anti-semi-join over the inner plan.
//!
//! Both rules identify the inner plan's correlating predicate structurally
//! (a `Selection` directly inside the subquery whose condition references
//! a column the subquery's own scan doesn't produce) rather than tracking
//! correlated variable bindings through a separate resolution pass — this
//! crate has no query-block-scoped name resolver, so "the column isn't in
//! this scan's schema" is the signal that it must come from the outer
//! query.

use super::{Rule, RuleContext};
use crate::error::OptimizerError;
use crate::expression::{ComparisonOp, Expr, Operator};
use crate::plan::logical::{JoinCondition, JoinType, LogicalPlan};

/// Split a subquery's body into its base scan and, if present, a
/// correlating equality condition plus the remaining (non-correlated)
/// conditions to keep filtering the inner side.
fn split_correlation(plan: &LogicalPlan) -> Option<(LogicalPlan, Option<JoinCondition>)> {
    match plan {
        LogicalPlan::Selection { input, conditions } => {
            let inner_cols = input.output_columns();
            let mut correlating = None;
            let mut remaining = Vec::new();
            for c in conditions {
                if correlating.is_none() {
                    if let Expr::BinaryOp { left, op: Operator::Comparison(ComparisonOp::Eq), right } = c {
                        let left_is_outer = !references_only(left, &inner_cols);
                        let right_is_outer = !references_only(right, &inner_cols);
                        if left_is_outer != right_is_outer {
                            let (outer, inner) = if left_is_outer { (left, right) } else { (right, left) };
                            correlating = Some(JoinCondition { left: (**outer).clone(), right: (**inner).clone() });
                            continue;
                        }
                    }
                }
                remaining.push(c.clone());
            }
            let base = if remaining.is_empty() {
                (*input.as_ref()).clone()
            } else {
                LogicalPlan::Selection { input: input.clone(), conditions: remaining }
            };
            Some((base, correlating))
        }
        LogicalPlan::Scan { .. } => Some((plan.clone(), None)),
        _ => None,
    }
}

fn references_only(expr: &Expr, columns: &[String]) -> bool {
    let mut cols = Vec::new();
    expr.referenced_columns(&mut cols);
    !cols.is_empty() && cols.iter().all(|c| columns.contains(c))
}

/// Convert a correlated `EXISTS`/`NOT EXISTS` predicate into a semi-join
/// or anti-semi-join. Gated off entirely by the `NO_DECORRELATE` hint.
pub struct Decorrelate;

impl Rule for Decorrelate {
    fn name(&self) -> &str {
        "Decorrelate"
    }

    fn matches(&self, plan: &LogicalPlan) -> bool {
        matches!(plan, LogicalPlan::Selection { conditions, .. }
            if conditions.iter().any(|c| matches!(c, Expr::Exists { .. })))
    }

    fn apply(&self, plan: LogicalPlan, ctx: &RuleContext) -> Result<LogicalPlan, OptimizerError> {
        let LogicalPlan::Selection { input, conditions } = plan else {
            unreachable!("matches() guarantees a Selection node")
        };
        if ctx.hints.no_decorrelate {
            return Ok(LogicalPlan::Selection { input, conditions });
        }

        let mut remaining = Vec::with_capacity(conditions.len());
        let mut rewritten: Option<LogicalPlan> = None;
        let mut base = *input;

        for c in conditions {
            if rewritten.is_none() {
                if let Expr::Exists { plan: subplan, negated } = &c {
                    if let Some((inner_base, Some(join_cond))) = split_correlation(subplan) {
                        let join_type = if *negated { JoinType::AntiSemi } else { JoinType::Semi };
                        rewritten = Some(LogicalPlan::Join {
                            left: Box::new(base.clone()),
                            right: Box::new(inner_base),
                            join_type,
                            conditions: vec![join_cond],
                        });
                        continue;
                    }
                }
            }
            remaining.push(c);
        }

        if let Some(joined) = rewritten {
            base = joined;
        } else {
            return Ok(LogicalPlan::Selection { input: Box::new(base), conditions: remaining });
        }

        if remaining.is_empty() {
            Ok(base)
        } else {
            Ok(LogicalPlan::Selection { input: Box::new(base), conditions: remaining })
        }
    }
}

/// Flatten a non-correlated `IN (SELECT ...)` predicate into a semi-join
/// (or, negated, an anti-semi-join) over the subquery's plan. Gated behind
/// the `SEMI_JOIN_REWRITE` hint since the rewrite is not always a win.
pub struct SubqueryFlattening;

impl Rule for SubqueryFlattening {
    fn name(&self) -> &str {
        "SubqueryFlattening"
    }

    fn matches(&self, plan: &LogicalPlan) -> bool {
        matches!(plan, LogicalPlan::Selection { conditions, .. }
            if conditions.iter().any(|c| matches!(c, Expr::InSubquery { .. })))
    }

    fn apply(&self, plan: LogicalPlan, ctx: &RuleContext) -> Result<LogicalPlan, OptimizerError> {
        let LogicalPlan::Selection { input, conditions } = plan else {
            unreachable!("matches() guarantees a Selection node")
        };
        if !ctx.hints.semi_join_rewrite {
            return Ok(LogicalPlan::Selection { input, conditions });
        }

        let mut remaining = Vec::with_capacity(conditions.len());
        let mut base = *input;
        let mut flattened = false;

        for c in conditions {
            if !flattened {
                if let Expr::InSubquery { expr, plan: subplan, negated } = &c {
                    let inner_output = subplan.output_columns();
                    if let Some(inner_col) = inner_output.first() {
                        let join_type = if *negated { JoinType::AntiSemi } else { JoinType::Semi };
                        base = LogicalPlan::Join {
                            left: Box::new(base),
                            right: subplan.clone(),
                            join_type,
                            conditions: vec![JoinCondition {
                                left: (**expr).clone(),
                                right: Expr::column(inner_col.clone()),
                            }],
                        };
                        flattened = true;
                        continue;
                    }
                }
            }
            remaining.push(c);
        }

        if remaining.is_empty() {
            Ok(base)
        } else {
            Ok(LogicalPlan::Selection { input: Box::new(base), conditions: remaining })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Catalog, Column, DataType};
    use crate::hints::OptimizerHints;
    use crate::plan::logical::ScanPushdown;

    fn scan(table: &str, col: &str) -> LogicalPlan {
        LogicalPlan::Scan {
            table_id: 1,
            table: table.into(),
            columns: vec![Column { name: col.into(), data_type: DataType::Integer, nullable: false, default: None }],
            pushdown: ScanPushdown::default(),
        }
    }

    #[test]
    fn decorrelate_converts_correlated_exists_into_semi_join() {
        let rule = Decorrelate;
        let catalog = Catalog::new();
        let hints = OptimizerHints::default();
        let ctx = RuleContext { hints: &hints, catalog: &catalog };

        let inner = LogicalPlan::Selection {
            input: Box::new(scan("orders", "customer_id")),
            conditions: vec![Expr::qualified_column("orders", "customer_id").eq(Expr::qualified_column("customers", "id"))],
        };
        let outer = LogicalPlan::Selection {
            input: Box::new(scan("customers", "id")),
            conditions: vec![Expr::Exists { plan: Box::new(inner), negated: false }],
        };
        assert!(rule.matches(&outer));
        let result = rule.apply(outer, &ctx).unwrap();
        assert!(matches!(result, LogicalPlan::Join { join_type: JoinType::Semi, .. }));
    }

    #[test]
    fn not_exists_becomes_anti_semi_join() {
        let rule = Decorrelate;
        let catalog = Catalog::new();
        let hints = OptimizerHints::default();
        let ctx = RuleContext { hints: &hints, catalog: &catalog };

        let inner = LogicalPlan::Selection {
            input: Box::new(scan("orders", "customer_id")),
            conditions: vec![Expr::qualified_column("orders", "customer_id").eq(Expr::qualified_column("customers", "id"))],
        };
        let outer = LogicalPlan::Selection {
            input: Box::new(scan("customers", "id")),
            conditions: vec![Expr::Exists { plan: Box::new(inner), negated: true }],
        };
        let result = rule.apply(outer, &ctx).unwrap();
        assert!(matches!(result, LogicalPlan::Join { join_type: JoinType::AntiSemi, .. }));
    }

    #[test]
    fn no_decorrelate_hint_leaves_selection_untouched() {
        let rule = Decorrelate;
        let catalog = Catalog::new();
        let mut hints = OptimizerHints::default();
        hints.no_decorrelate = true;
        let ctx = RuleContext { hints: &hints, catalog: &catalog };

        let inner = scan("orders", "customer_id");
        let outer = LogicalPlan::Selection {
            input: Box::new(scan("customers", "id")),
            conditions: vec![Expr::Exists { plan: Box::new(inner), negated: false }],
        };
        let result = rule.apply(outer, &ctx).unwrap();
        assert!(matches!(result, LogicalPlan::Selection { .. }));
    }

    #[test]
    fn subquery_flattening_requires_the_hint() {
        let rule = SubqueryFlattening;
        let catalog = Catalog::new();
        let hints = OptimizerHints::default();
        let ctx = RuleContext { hints: &hints, catalog: &catalog };

        let inner = scan("orders", "customer_id");
        let outer = LogicalPlan::Selection {
            input: Box::new(scan("customers", "id")),
            conditions: vec![Expr::InSubquery {
                expr: Box::new(Expr::column("id")),
                plan: Box::new(inner),
                negated: false,
            }],
        };
        let result = rule.apply(outer, &ctx).unwrap();
        assert!(matches!(result, LogicalPlan::Selection { .. }));
    }

    #[test]
    fn subquery_flattening_produces_semi_join_when_enabled() {
        let rule = SubqueryFlattening;
        let catalog = Catalog::new();
        let mut hints = OptimizerHints::default();
        hints.semi_join_rewrite = true;
        let ctx = RuleContext { hints: &hints, catalog: &catalog };

        let inner = scan("orders", "customer_id");
        let outer = LogicalPlan::Selection {
            input: Box::new(scan("customers", "id")),
            conditions: vec![Expr::InSubquery {
                expr: Box::new(Expr::column("id")),
                plan: Box::new(inner),
                negated: false,
            }],
        };
        let result = rule.apply(outer, &ctx).unwrap();
        assert!(matches!(result, LogicalPlan::Join { join_type: JoinType::Semi, .. }));
    }
}
