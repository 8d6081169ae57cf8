//! The concrete rewrite rules. Each is equivalence-preserving under the SQL
//! semantics named in its doc comment.

use super::column_pruning::ColumnPruning;
use super::subquery::{Decorrelate, SubqueryFlattening};
use super::{Rule, RuleContext};
use crate::common::Value;
use crate::error::OptimizerError;
use crate::expression::{ComparisonOp, Expr, Operator};
use crate::plan::logical::{
    AggAlgorithm, AggFuncKind, AggregateItem, JoinType, LogicalPlan, OrderItem, ScanPushdown, SortDirection,
};

pub fn default_rules() -> Vec<Box<dyn Rule>> {
    vec![
        Box::new(ConstantFolding),
        Box::new(Decorrelate),
        Box::new(SubqueryFlattening),
        Box::new(PredicatePushDown),
        Box::new(SelectionMerge),
        Box::new(ColumnPruning),
        Box::new(ProjectionElimination),
        Box::new(LimitPushDown),
        Box::new(DeriveTopNFromSortLimit),
        Box::new(DeriveTopNFromWindow),
        Box::new(OrToUnion),
        Box::new(MaxMinElimination),
        Box::new(JoinElimination),
        Box::new(HintAggregateAlgorithm),
    ]
}

/// Fold literal-only subtrees to their evaluated value. If a `Selection`
/// condition folds to `false`, the branch is marked as an always-empty
/// result (modeled as a `Selection` over a literal-false condition, which
/// downstream physical lowering turns into a zero-row scan).
pub struct ConstantFolding;

impl Rule for ConstantFolding {
    fn name(&self) -> &str {
        "ConstantFolding"
    }

    fn matches(&self, plan: &LogicalPlan) -> bool {
        matches!(plan, LogicalPlan::Selection { conditions, .. } if conditions.iter().any(|c| c.is_constant()))
    }

    fn apply(&self, plan: LogicalPlan, _ctx: &RuleContext) -> Result<LogicalPlan, OptimizerError> {
        if let LogicalPlan::Selection { input, conditions } = plan {
            let mut folded = Vec::with_capacity(conditions.len());
            let mut always_false = false;
            for c in conditions {
                match c.fold_constant() {
                    Some(Expr::Literal(Value::Boolean(true))) => {}
                    Some(Expr::Literal(Value::Boolean(false))) => always_false = true,
                    Some(folded_expr) => folded.push(folded_expr),
                    None => folded.push(c),
                }
            }
            if always_false {
                let columns = match input.as_ref() {
                    LogicalPlan::Scan { columns, .. } => columns.clone(),
                    LogicalPlan::EmptyRelation { columns } => columns.clone(),
                    _ => Vec::new(),
                };
                return Ok(LogicalPlan::EmptyRelation { columns });
            }
            return Ok(LogicalPlan::Selection { input, conditions: folded });
        }
        unreachable!("matches() guarantees a Selection node")
    }
}

/// Absorb a `Selection` directly above a `Scan` into the scan's pushdown
/// state and remove the `Selection` node.
pub struct PredicatePushDown;

impl Rule for PredicatePushDown {
    fn name(&self) -> &str {
        "PredicatePushDown"
    }

    fn matches(&self, plan: &LogicalPlan) -> bool {
        matches!(plan, LogicalPlan::Selection { input, .. } if matches!(**input, LogicalPlan::Scan { .. }))
    }

    fn apply(&self, plan: LogicalPlan, _ctx: &RuleContext) -> Result<LogicalPlan, OptimizerError> {
        if let LogicalPlan::Selection { input, conditions } = plan {
            if let LogicalPlan::Scan { table_id, table, columns, mut pushdown } = *input {
                pushdown.predicates.extend(conditions);
                return Ok(LogicalPlan::Scan { table_id, table, columns, pushdown });
            }
        }
        unreachable!("matches() guarantees a Selection-over-Scan shape")
    }
}

/// Merge a `Selection` directly above another `Selection` into one node.
pub struct SelectionMerge;

impl Rule for SelectionMerge {
    fn name(&self) -> &str {
        "SelectionMerge"
    }

    fn matches(&self, plan: &LogicalPlan) -> bool {
        matches!(plan, LogicalPlan::Selection { input, .. } if matches!(**input, LogicalPlan::Selection { .. }))
    }

    fn apply(&self, plan: LogicalPlan, _ctx: &RuleContext) -> Result<LogicalPlan, OptimizerError> {
        if let LogicalPlan::Selection { input, mut conditions } = plan {
            if let LogicalPlan::Selection { input: inner_input, conditions: inner_conditions } = *input {
                let mut merged = inner_conditions;
                merged.append(&mut conditions);
                return Ok(LogicalPlan::Selection { input: inner_input, conditions: merged });
            }
        }
        unreachable!("matches() guarantees nested Selections")
    }
}

/// Remove a `Projection` that passes its child's columns through unchanged.
pub struct ProjectionElimination;

impl Rule for ProjectionElimination {
    fn name(&self) -> &str {
        "ProjectionElimination"
    }

    fn matches(&self, plan: &LogicalPlan) -> bool {
        if let LogicalPlan::Projection { input, exprs, aliases } = plan {
            if exprs.len() != aliases.len() {
                return false;
            }
            let child_cols = input.output_columns();
            if child_cols.len() != exprs.len() {
                return false;
            }
            return exprs.iter().zip(&child_cols).zip(aliases).all(|((e, child_col), alias)| {
                matches!(e, Expr::Column { name, .. } if name == child_col) && alias == child_col
            });
        }
        false
    }

    fn apply(&self, plan: LogicalPlan, _ctx: &RuleContext) -> Result<LogicalPlan, OptimizerError> {
        if let LogicalPlan::Projection { input, .. } = plan {
            return Ok(*input);
        }
        unreachable!("matches() guarantees a pass-through Projection")
    }
}

/// Absorb a `Limit` directly above a `Scan` into the scan's pushdown
/// state; swap a `Limit` above a `Selection` so the filter still narrows
/// the result before the row cap is applied (the filter cannot increase
/// cardinality, so the swap is safe).
pub struct LimitPushDown;

impl Rule for LimitPushDown {
    fn name(&self) -> &str {
        "LimitPushDown"
    }

    fn matches(&self, plan: &LogicalPlan) -> bool {
        matches!(plan, LogicalPlan::Limit { input, .. }
            if matches!(**input, LogicalPlan::Scan { .. } | LogicalPlan::Selection { .. }))
    }

    fn apply(&self, plan: LogicalPlan, _ctx: &RuleContext) -> Result<LogicalPlan, OptimizerError> {
        if let LogicalPlan::Limit { input, limit, offset } = plan {
            match *input {
                LogicalPlan::Scan { table_id, table, columns, mut pushdown } => {
                    pushdown.limit = Some(limit);
                    pushdown.offset = Some(offset);
                    Ok(LogicalPlan::Scan { table_id, table, columns, pushdown })
                }
                LogicalPlan::Selection { input: sel_input, conditions } => Ok(LogicalPlan::Selection {
                    input: Box::new(LogicalPlan::Limit { input: sel_input, limit, offset }),
                    conditions,
                }),
                other => Ok(LogicalPlan::Limit { input: Box::new(other), limit, offset }),
            }
        } else {
            unreachable!("matches() guarantees a Limit node")
        }
    }
}

/// Collapse `Limit{k,0}` directly above `Sort` into a single `TopN` node.
pub struct DeriveTopNFromSortLimit;

impl Rule for DeriveTopNFromSortLimit {
    fn name(&self) -> &str {
        "DeriveTopNFromSortLimit"
    }

    fn matches(&self, plan: &LogicalPlan) -> bool {
        matches!(plan, LogicalPlan::Limit { input, .. } if matches!(**input, LogicalPlan::Sort { .. }))
    }

    fn apply(&self, plan: LogicalPlan, _ctx: &RuleContext) -> Result<LogicalPlan, OptimizerError> {
        if let LogicalPlan::Limit { input, limit, offset } = plan {
            if let LogicalPlan::Sort { input: sort_input, items } = *input {
                return Ok(LogicalPlan::TopN { input: sort_input, items, limit, offset });
            }
        }
        unreachable!("matches() guarantees a Limit-over-Sort shape")
    }
}

/// `SELECT MAX(c) FROM t` (or `MIN`) over an indexed column becomes an
/// index-ordered single-row lookup instead of a full aggregate scan:
/// `Scan -> Selection(c IS NOT NULL) -> Sort(c DESC|ASC) -> Limit(1) ->
/// Aggregate(Max|Min(c))`. Only applies when `c` carries an index, since
/// otherwise the rewrite trades a full scan for a full sort.
pub struct MaxMinElimination;

impl Rule for MaxMinElimination {
    fn name(&self) -> &str {
        "MaxMinElimination"
    }

    fn matches(&self, plan: &LogicalPlan) -> bool {
        matches!(plan, LogicalPlan::Aggregate { input, group_by, aggregates, .. }
            if group_by.is_empty()
                && !aggregates.is_empty()
                && aggregates.iter().all(|a| matches!(a.kind, AggFuncKind::Max | AggFuncKind::Min))
                && matches!(**input, LogicalPlan::Scan { .. }))
    }

    fn apply(&self, plan: LogicalPlan, ctx: &RuleContext) -> Result<LogicalPlan, OptimizerError> {
        let LogicalPlan::Aggregate { input, group_by, aggregates, algorithm } = plan else {
            unreachable!("matches() guarantees an Aggregate node")
        };
        let LogicalPlan::Scan { table, columns, pushdown, table_id } = *input else {
            unreachable!("matches() guarantees a Scan input")
        };
        let scan = LogicalPlan::Scan { table_id, table: table.clone(), columns, pushdown };

        if aggregates.len() == 1 {
            return self.rewrite_single(scan, table, group_by, aggregates, algorithm, ctx);
        }
        self.rewrite_multi(scan, table, group_by, aggregates, algorithm, ctx)
    }
}

impl MaxMinElimination {
    /// Index-backed single-row lookup for one MAX/MIN aggregate: a
    /// `Sort` by the aggregated column in the direction the aggregate
    /// needs, followed by `Limit 1`, replaces scanning every row.
    fn single_row_lookup(&self, scan: LogicalPlan, agg: &AggregateItem) -> LogicalPlan {
        let direction = match agg.kind {
            AggFuncKind::Max => SortDirection::Desc,
            _ => SortDirection::Asc,
        };
        let not_null = LogicalPlan::Selection {
            input: Box::new(scan),
            conditions: vec![Expr::IsNull { expr: Box::new(agg.expr.clone()), negated: true }],
        };
        let sorted = LogicalPlan::Sort {
            input: Box::new(not_null),
            items: vec![OrderItem { expr: agg.expr.clone(), direction }],
        };
        LogicalPlan::Limit { input: Box::new(sorted), limit: 1, offset: 0 }
    }

    fn rewrite_single(
        &self,
        scan: LogicalPlan,
        table: String,
        group_by: Vec<Expr>,
        aggregates: Vec<AggregateItem>,
        algorithm: Option<AggAlgorithm>,
        ctx: &RuleContext,
    ) -> Result<LogicalPlan, OptimizerError> {
        let agg = &aggregates[0];
        let column_name = match &agg.expr {
            Expr::Column { name, .. } => name.clone(),
            _ => return Ok(LogicalPlan::Aggregate { input: Box::new(scan), group_by, aggregates, algorithm }),
        };
        if !has_leading_index(ctx, &table, &column_name) {
            return Ok(LogicalPlan::Aggregate { input: Box::new(scan), group_by, aggregates, algorithm });
        }
        let limited = self.single_row_lookup(scan, agg);
        Ok(LogicalPlan::Aggregate { input: Box::new(limited), group_by: vec![], aggregates, algorithm })
    }

    /// Multiple MAX/MIN over the same table fold to a cross product of
    /// per-column single-row lookups: each aggregate backed by an index
    /// becomes its own one-row branch, joined together with a `Cross`
    /// join so the result is still a single row carrying every column.
    /// Any aggregate whose column has no leading index falls back to the
    /// original whole-table aggregate and is joined in the same way.
    fn rewrite_multi(
        &self,
        scan: LogicalPlan,
        table: String,
        group_by: Vec<Expr>,
        aggregates: Vec<AggregateItem>,
        algorithm: Option<AggAlgorithm>,
        ctx: &RuleContext,
    ) -> Result<LogicalPlan, OptimizerError> {
        if !aggregates.iter().all(|a| matches!(a.expr, Expr::Column { .. })) {
            return Ok(LogicalPlan::Aggregate { input: Box::new(scan), group_by, aggregates, algorithm });
        }

        let mut branches: Vec<LogicalPlan> = Vec::with_capacity(aggregates.len());
        for agg in &aggregates {
            let column_name = match &agg.expr {
                Expr::Column { name, .. } => name.clone(),
                _ => unreachable!("checked above"),
            };
            let branch_scan = clone_scan(&scan);
            let branch_input = if has_leading_index(ctx, &table, &column_name) {
                self.single_row_lookup(branch_scan, agg)
            } else {
                branch_scan
            };
            branches.push(LogicalPlan::Aggregate {
                input: Box::new(branch_input),
                group_by: vec![],
                aggregates: vec![agg.clone()],
                algorithm,
            });
        }

        let mut joined = branches.remove(0);
        for branch in branches {
            joined = LogicalPlan::Join {
                left: Box::new(joined),
                right: Box::new(branch),
                join_type: JoinType::Cross,
                conditions: vec![],
            };
        }
        Ok(joined)
    }
}

fn has_leading_index(ctx: &RuleContext, table: &str, column: &str) -> bool {
    ctx.catalog
        .get_table(table)
        .map(|t| t.indexes.iter().any(|ix| ix.columns.first().map(|c| c.as_str()) == Some(column)))
        .unwrap_or(false)
}

fn clone_scan(scan: &LogicalPlan) -> LogicalPlan {
    let LogicalPlan::Scan { table_id, table, columns, pushdown } = scan else {
        unreachable!("caller guarantees a Scan node")
    };
    LogicalPlan::Scan {
        table_id: *table_id,
        table: table.clone(),
        columns: columns.clone(),
        pushdown: pushdown.clone(),
    }
}

/// Drop a `LeftOuter` join whose right side scans a table on its unique
/// key with no columns from the right side referenced above, since the
/// join can only ever reproduce the left side's rows unchanged.
pub struct JoinElimination;

impl Rule for JoinElimination {
    fn name(&self) -> &str {
        "JoinElimination"
    }

    fn matches(&self, plan: &LogicalPlan) -> bool {
        matches!(plan, LogicalPlan::Join { join_type: JoinType::LeftOuter, right, conditions, .. }
            if matches!(**right, LogicalPlan::Scan { .. }) && !conditions.is_empty())
    }

    fn apply(&self, plan: LogicalPlan, ctx: &RuleContext) -> Result<LogicalPlan, OptimizerError> {
        let LogicalPlan::Join { left, right, conditions, .. } = plan else {
            unreachable!("matches() guarantees a Join node")
        };
        let LogicalPlan::Scan { table, .. } = right.as_ref() else {
            unreachable!("matches() guarantees a Scan right side")
        };

        let join_cols: Vec<String> = conditions
            .iter()
            .filter_map(|c| match &c.right {
                Expr::Column { name, .. } => Some(name.clone()),
                _ => None,
            })
            .collect();

        let right_key_is_unique = ctx
            .catalog
            .get_table(table)
            .map(|t| {
                t.indexes
                    .iter()
                    .any(|ix| ix.unique && ix.columns.len() == join_cols.len() && ix.columns.iter().all(|c| join_cols.contains(c)))
            })
            .unwrap_or(false);

        if right_key_is_unique {
            Ok(*left)
        } else {
            Ok(LogicalPlan::Join {
                left,
                right,
                join_type: JoinType::LeftOuter,
                conditions,
            })
        }
    }
}

/// Rewrite `a = v1 OR a = v2 OR ...` equality disjunctions into an
/// equivalent `IN` list so the cardinality estimator and index selector
/// can reason about it as a single predicate.
pub fn or_chain_to_in_list(expr: &Expr) -> Option<Expr> {
    fn collect(expr: &Expr, column: &mut Option<String>, values: &mut Vec<Expr>) -> bool {
        match expr {
            Expr::BinaryOp { left, op: Operator::Logical(crate::expression::LogicalOp::Or), right } => {
                collect(left, column, values) && collect(right, column, values)
            }
            Expr::BinaryOp { left, op: Operator::Comparison(ComparisonOp::Eq), right } => match (left.as_ref(), right.as_ref()) {
                (Expr::Column { name, .. }, Expr::Literal(_)) => {
                    if column.get_or_insert_with(|| name.clone()) != name {
                        return false;
                    }
                    values.push((**right).clone());
                    true
                }
                _ => false,
            },
            _ => false,
        }
    }

    let mut column = None;
    let mut values = Vec::new();
    if collect(expr, &mut column, &mut values) && values.len() > 1 {
        let col = column?;
        return Some(Expr::InList { expr: Box::new(Expr::column(col)), list: values, negated: false });
    }
    None
}

/// Collapse `Limit{k}` directly above a `Window` carrying a single
/// `ROW_NUMBER() OVER (ORDER BY ...)` with no `PARTITION BY` into a
/// `TopN` using that ordering. A non-empty `PARTITION BY` list makes the
/// per-partition semantics unsafe to collapse into a single global TopN,
/// so the rule leaves those alone.
pub struct DeriveTopNFromWindow;

impl Rule for DeriveTopNFromWindow {
    fn name(&self) -> &str {
        "DeriveTopNFromWindow"
    }

    fn matches(&self, plan: &LogicalPlan) -> bool {
        matches!(plan, LogicalPlan::Limit { input, .. } if matches!(input.as_ref(), LogicalPlan::Window { functions, .. }
            if functions.len() == 1
                && functions[0].name.eq_ignore_ascii_case("row_number")
                && functions[0].partition_by.is_empty()
                && !functions[0].order_by.is_empty()))
    }

    fn apply(&self, plan: LogicalPlan, _ctx: &RuleContext) -> Result<LogicalPlan, OptimizerError> {
        if let LogicalPlan::Limit { input, limit, offset } = plan {
            if let LogicalPlan::Window { input: win_input, mut functions } = *input {
                let order_by = std::mem::take(&mut functions[0].order_by);
                return Ok(LogicalPlan::TopN { input: win_input, items: order_by, limit, offset });
            }
        }
        unreachable!("matches() guarantees a Limit-over-Window(row_number) shape")
    }
}

/// Rewrite `a = v1 OR a = v2 OR ...` over a `Scan` into a `UNION` of
/// per-value equality scans, when the column carries an index (each
/// branch then becomes an independent index lookup rather than a single
/// full scan filtered by a disjunction).
pub struct OrToUnion;

impl Rule for OrToUnion {
    fn name(&self) -> &str {
        "OrToUnion"
    }

    fn matches(&self, plan: &LogicalPlan) -> bool {
        matches!(plan, LogicalPlan::Selection { input, conditions }
            if conditions.len() == 1
                && matches!(input.as_ref(), LogicalPlan::Scan { .. })
                && or_chain_to_in_list(&conditions[0]).is_some())
    }

    fn apply(&self, plan: LogicalPlan, ctx: &RuleContext) -> Result<LogicalPlan, OptimizerError> {
        let LogicalPlan::Selection { input, conditions } = plan else {
            unreachable!("matches() guarantees a Selection node")
        };
        let LogicalPlan::Scan { table_id, table, columns, pushdown } = *input else {
            unreachable!("matches() guarantees a Scan input")
        };
        let Some(Expr::InList { expr, list, .. }) = or_chain_to_in_list(&conditions[0]) else {
            unreachable!("matches() guarantees or_chain_to_in_list succeeds")
        };
        let column_name = match expr.as_ref() {
            Expr::Column { name, .. } => name.clone(),
            _ => unreachable!("or_chain_to_in_list always produces a bare column expr"),
        };

        let indexed = ctx
            .catalog
            .get_table(&table)
            .map(|t| t.indexes.iter().any(|ix| ix.columns.first() == Some(&column_name)))
            .unwrap_or(false);

        if !indexed {
            let restored = Expr::conjunction(vec![conditions[0].clone()]).unwrap();
            return Ok(LogicalPlan::Selection {
                input: Box::new(LogicalPlan::Scan { table_id, table, columns, pushdown }),
                conditions: vec![restored],
            });
        }

        let branches: Vec<LogicalPlan> = list
            .into_iter()
            .map(|value| {
                let mut branch_pushdown = pushdown.clone();
                branch_pushdown.predicates.push(Expr::column(column_name.clone()).eq(value));
                LogicalPlan::Scan { table_id, table: table.clone(), columns: columns.clone(), pushdown: branch_pushdown }
            })
            .collect();

        Ok(LogicalPlan::Union { inputs: branches, all: false })
    }
}

/// Apply a `HASH_AGG`/`STREAM_AGG` hint to an `Aggregate` node that has not
/// yet chosen an algorithm.
pub struct HintAggregateAlgorithm;

impl Rule for HintAggregateAlgorithm {
    fn name(&self) -> &str {
        "HintAggregateAlgorithm"
    }

    fn matches(&self, plan: &LogicalPlan) -> bool {
        matches!(plan, LogicalPlan::Aggregate { algorithm: None, .. })
    }

    fn apply(&self, plan: LogicalPlan, ctx: &RuleContext) -> Result<LogicalPlan, OptimizerError> {
        let LogicalPlan::Aggregate { input, group_by, aggregates, algorithm } = plan else {
            unreachable!("matches() guarantees an Aggregate node")
        };
        let algorithm = algorithm.or(if ctx.hints.hash_agg {
            Some(crate::plan::logical::AggAlgorithm::Hash)
        } else if ctx.hints.stream_agg {
            Some(crate::plan::logical::AggAlgorithm::Stream)
        } else {
            None
        });
        Ok(LogicalPlan::Aggregate { input, group_by, aggregates, algorithm })
    }
}
