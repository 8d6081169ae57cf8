//! Post-order rewrite engine. Children are rewritten fully before any rule
//! runs at the parent — an earlier design interleaved child recursion
//! inside the rule loop itself and could re-enter a subtree every time a
//! rule changed its shape, so that ordering is intentionally not an option
//! here.

pub mod column_pruning;
pub mod library;
pub mod subquery;

use crate::cancellation::CancellationToken;
use crate::catalog::Catalog;
use crate::config::OptimizerConfig;
use crate::error::{Diagnostic, OptimizerError};
use crate::hints::OptimizerHints;
use crate::plan::LogicalPlan;

/// Context available to a rule while it considers a single node: the
/// user's hints and the catalog (for index/uniqueness-aware rewrites like
/// join elimination and max/min elimination).
pub struct RuleContext<'a> {
    pub hints: &'a OptimizerHints,
    pub catalog: &'a Catalog,
}

/// A single equivalence-preserving rewrite rule.
pub trait Rule: Send + Sync {
    fn name(&self) -> &str;
    fn matches(&self, plan: &LogicalPlan) -> bool;
    fn apply(&self, plan: LogicalPlan, ctx: &RuleContext) -> Result<LogicalPlan, OptimizerError>;
}

pub struct RuleEngine {
    rules: Vec<Box<dyn Rule>>,
    max_iterations: usize,
}

impl RuleEngine {
    pub fn new(rules: Vec<Box<dyn Rule>>, config: &OptimizerConfig) -> Self {
        Self { rules, max_iterations: config.max_rule_iterations }
    }

    pub fn with_default_rules(config: &OptimizerConfig) -> Self {
        Self::new(library::default_rules(), config)
    }

    /// Rewrite `plan` to a fixed point (or the iteration bound), returning
    /// the rewritten tree and any non-fatal diagnostics collected along the
    /// way (`RuleConvergenceExceeded` when the bound is hit; individual
    /// rule failures still propagate as hard errors).
    pub fn rewrite(
        &self,
        plan: LogicalPlan,
        ctx: &RuleContext,
        token: &CancellationToken,
    ) -> Result<(LogicalPlan, Vec<Diagnostic>), OptimizerError> {
        let mut diagnostics = Vec::new();
        let plan = self.rewrite_node(plan, ctx, token, &mut diagnostics)?;
        Ok((plan, diagnostics))
    }

    fn rewrite_node(
        &self,
        plan: LogicalPlan,
        ctx: &RuleContext,
        token: &CancellationToken,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Result<LogicalPlan, OptimizerError> {
        if token.is_cancelled() {
            diagnostics.push(Diagnostic::from_error(&OptimizerError::Cancelled));
            return Ok(plan);
        }

        // Step 1: recurse into children first.
        let plan = self.rewrite_children(plan, ctx, token, diagnostics)?;

        // Step 2: apply rules at this node to a fixed point.
        let mut current = plan;
        for _ in 0..self.max_iterations {
            if token.is_cancelled() {
                diagnostics.push(Diagnostic::from_error(&OptimizerError::Cancelled));
                break;
            }
            let mut changed = false;
            for rule in &self.rules {
                if rule.matches(&current) {
                    let before = format!("{:?}", current);
                    current = rule
                        .apply(current, ctx)
                        .map_err(|e| OptimizerError::rule_failure(rule.name(), e.to_string()))?;
                    if format!("{:?}", current) != before {
                        changed = true;
                    }
                }
            }
            if !changed {
                return Ok(current);
            }
        }
        diagnostics.push(Diagnostic::from_error(&OptimizerError::RuleConvergenceExceeded));
        Ok(current)
    }

    fn rewrite_children(
        &self,
        plan: LogicalPlan,
        ctx: &RuleContext,
        token: &CancellationToken,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Result<LogicalPlan, OptimizerError> {
        use LogicalPlan::*;
        let recurse = |p: LogicalPlan, d: &mut Vec<Diagnostic>| self.rewrite_node(p, ctx, token, d);
        Ok(match plan {
            Scan { .. } | Dual | EmptyRelation { .. } => plan,
            Selection { input, conditions } => Selection { input: Box::new(recurse(*input, diagnostics)?), conditions },
            Projection { input, exprs, aliases } => {
                Projection { input: Box::new(recurse(*input, diagnostics)?), exprs, aliases }
            }
            Limit { input, limit, offset } => Limit { input: Box::new(recurse(*input, diagnostics)?), limit, offset },
            Sort { input, items } => Sort { input: Box::new(recurse(*input, diagnostics)?), items },
            TopN { input, items, limit, offset } => {
                TopN { input: Box::new(recurse(*input, diagnostics)?), items, limit, offset }
            }
            Aggregate { input, group_by, aggregates, algorithm } => Aggregate {
                input: Box::new(recurse(*input, diagnostics)?),
                group_by,
                aggregates,
                algorithm,
            },
            Join { left, right, join_type, conditions } => Join {
                left: Box::new(recurse(*left, diagnostics)?),
                right: Box::new(recurse(*right, diagnostics)?),
                join_type,
                conditions,
            },
            Union { inputs, all } => {
                let mut rewritten = Vec::with_capacity(inputs.len());
                for i in inputs {
                    rewritten.push(recurse(i, diagnostics)?);
                }
                Union { inputs: rewritten, all }
            }
            Window { input, functions } => Window { input: Box::new(recurse(*input, diagnostics)?), functions },
            Insert { table, columns, source, values } => Insert {
                table,
                columns,
                source: source.map(|s| recurse(*s, diagnostics)).transpose()?.map(Box::new),
                values,
            },
            Update { table, assignments, filter } => Update {
                table,
                assignments,
                filter: filter.map(|f| recurse(*f, diagnostics)).transpose()?.map(Box::new),
            },
            Delete { table, filter } => Delete {
                table,
                filter: filter.map(|f| recurse(*f, diagnostics)).transpose()?.map(Box::new),
            },
        })
    }
}
