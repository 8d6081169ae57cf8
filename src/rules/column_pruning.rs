//! Column pruning: narrows every `Scan` beneath a `Projection` to the
//! columns actually referenced above it, preserving whatever pushdown
//! state (predicates, limit) the scan already carries.
//!
//! Unlike most rules here, this one recurses through its whole owned
//! subtree in a single `apply` call rather than relying on the rule
//! engine's node-at-a-time matching, since "what's required" has to flow
//! down through every intermediate operator to reach the scans at the
//! leaves.

use super::{Rule, RuleContext};
use crate::error::OptimizerError;
use crate::expression::Expr;
use crate::plan::logical::LogicalPlan;
use std::collections::HashSet;

pub struct ColumnPruning;

impl Rule for ColumnPruning {
    fn name(&self) -> &str {
        "ColumnPruning"
    }

    fn matches(&self, plan: &LogicalPlan) -> bool {
        matches!(plan, LogicalPlan::Projection { .. })
    }

    fn apply(&self, plan: LogicalPlan, _ctx: &RuleContext) -> Result<LogicalPlan, OptimizerError> {
        let LogicalPlan::Projection { input, exprs, aliases } = plan else {
            unreachable!("matches() guarantees a Projection node")
        };
        let mut required = HashSet::new();
        for e in &exprs {
            let mut cols = Vec::new();
            e.referenced_columns(&mut cols);
            required.extend(cols);
        }
        let pruned = prune(*input, &required);
        Ok(LogicalPlan::Projection { input: Box::new(pruned), exprs, aliases })
    }
}

/// Recursively narrow `Scan.columns` to `required`, growing `required` as
/// it descends past operators that themselves reference columns (filters,
/// join conditions, sort/group keys) the scan must still produce.
fn prune(plan: LogicalPlan, required: &HashSet<String>) -> LogicalPlan {
    match plan {
        LogicalPlan::Scan { table_id, table, columns, pushdown } => {
            if required.is_empty() {
                return LogicalPlan::Scan { table_id, table, columns, pushdown };
            }
            let mut needed = required.clone();
            for p in &pushdown.predicates {
                let mut cols = Vec::new();
                p.referenced_columns(&mut cols);
                needed.extend(cols);
            }
            let columns = columns.into_iter().filter(|c| needed.contains(&c.name)).collect::<Vec<_>>();
            let columns = if columns.is_empty() { Vec::new() } else { columns };
            LogicalPlan::Scan { table_id, table, columns, pushdown }
        }
        LogicalPlan::Dual | LogicalPlan::EmptyRelation { .. } => plan,
        LogicalPlan::Selection { input, conditions } => {
            let mut needed = required.clone();
            for c in &conditions {
                let mut cols = Vec::new();
                c.referenced_columns(&mut cols);
                needed.extend(cols);
            }
            LogicalPlan::Selection { input: Box::new(prune(*input, &needed)), conditions }
        }
        LogicalPlan::Projection { input, exprs, aliases } => {
            let mut needed = HashSet::new();
            for e in &exprs {
                let mut cols = Vec::new();
                e.referenced_columns(&mut cols);
                needed.extend(cols);
            }
            LogicalPlan::Projection { input: Box::new(prune(*input, &needed)), exprs, aliases }
        }
        LogicalPlan::Limit { input, limit, offset } => {
            LogicalPlan::Limit { input: Box::new(prune(*input, required)), limit, offset }
        }
        LogicalPlan::Sort { input, items } => {
            let mut needed = required.clone();
            for i in &items {
                let mut cols = Vec::new();
                i.expr.referenced_columns(&mut cols);
                needed.extend(cols);
            }
            LogicalPlan::Sort { input: Box::new(prune(*input, &needed)), items }
        }
        LogicalPlan::TopN { input, items, limit, offset } => {
            let mut needed = required.clone();
            for i in &items {
                let mut cols = Vec::new();
                i.expr.referenced_columns(&mut cols);
                needed.extend(cols);
            }
            LogicalPlan::TopN { input: Box::new(prune(*input, &needed)), items, limit, offset }
        }
        LogicalPlan::Aggregate { input, group_by, aggregates, algorithm } => {
            let mut needed = HashSet::new();
            for g in &group_by {
                let mut cols = Vec::new();
                g.referenced_columns(&mut cols);
                needed.extend(cols);
            }
            for a in &aggregates {
                let mut cols = Vec::new();
                a.expr.referenced_columns(&mut cols);
                needed.extend(cols);
            }
            LogicalPlan::Aggregate { input: Box::new(prune(*input, &needed)), group_by, aggregates, algorithm }
        }
        LogicalPlan::Join { left, right, join_type, conditions } => {
            let mut left_needed = required.clone();
            let mut right_needed = required.clone();
            for c in &conditions {
                let mut l = Vec::new();
                c.left.referenced_columns(&mut l);
                left_needed.extend(l);
                let mut r = Vec::new();
                c.right.referenced_columns(&mut r);
                right_needed.extend(r);
            }
            // A join condition's side isn't guaranteed to name only
            // columns from that side (qualification is advisory), so both
            // subtrees see the full condition's columns as a conservative
            // superset rather than risk dropping one a side actually owns.
            left_needed.extend(right_needed.iter().cloned());
            right_needed.extend(left_needed.iter().cloned());
            LogicalPlan::Join {
                left: Box::new(prune(*left, &left_needed)),
                right: Box::new(prune(*right, &right_needed)),
                join_type,
                conditions,
            }
        }
        LogicalPlan::Union { inputs, all } => {
            LogicalPlan::Union { inputs: inputs.into_iter().map(|p| prune(p, required)).collect(), all }
        }
        LogicalPlan::Window { input, functions } => {
            let mut needed = required.clone();
            for f in &functions {
                for a in &f.args {
                    let mut cols = Vec::new();
                    a.referenced_columns(&mut cols);
                    needed.extend(cols);
                }
                for p in &f.partition_by {
                    let mut cols = Vec::new();
                    p.referenced_columns(&mut cols);
                    needed.extend(cols);
                }
                for o in &f.order_by {
                    let mut cols = Vec::new();
                    o.expr.referenced_columns(&mut cols);
                    needed.extend(cols);
                }
            }
            LogicalPlan::Window { input: Box::new(prune(*input, &needed)), functions }
        }
        // DML terminal nodes don't sit beneath a Projection in practice;
        // left untouched rather than pruned.
        other @ (LogicalPlan::Insert { .. } | LogicalPlan::Update { .. } | LogicalPlan::Delete { .. }) => other,
    }
}
