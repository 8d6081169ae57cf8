//! Join order search: flattens an all-`Inner`-join chain into a join graph,
//! then finds the cheapest connected-subset join tree via dynamic
//! programming (bounded to `max_dp_relations` relations) or a heuristic
//! greedy fallback above that bound.
//!
//! The DP shape (subset DP over a join graph, connected subsets only) is
//! standard textbook System R style; the bushy-tree bound caps each
//! internal split's smaller side so the search doesn't degenerate into
//! every possible bracketing once relation counts climb.

use crate::catalog::Catalog;
use crate::cost::{CardinalityEstimator, CostModel};
use crate::expression::Expr;
use crate::hints::OptimizerHints;
use crate::plan::logical::{JoinCondition, JoinType, LogicalPlan};
use std::collections::HashMap;

/// One base relation in a join graph, with the subtree that produces it.
struct Relation {
    plan: LogicalPlan,
    rows: f64,
}

/// An edge between two relations (by index into the graph's relation list)
/// carrying the equi-join condition connecting them.
struct Edge {
    left: usize,
    right: usize,
    condition: JoinCondition,
}

struct JoinGraph {
    relations: Vec<Relation>,
    edges: Vec<Edge>,
}

/// Flatten a chain of `Inner` joins into a graph. Returns `None` if `plan`
/// is not a pure-inner-join chain (an outer or cross join anywhere in it
/// makes order unsafe to change without further rewriting).
fn build_graph(plan: &LogicalPlan, catalog: &Catalog) -> Option<JoinGraph> {
    let mut relations = Vec::new();
    let mut raw_edges = Vec::new();
    if !collect(plan, &mut relations, &mut raw_edges) {
        return None;
    }
    if relations.len() < 2 {
        return None;
    }
    let est = CardinalityEstimator::new(catalog);
    let relations = relations
        .into_iter()
        .map(|plan| {
            let rows = estimate_rows(&plan, &est);
            Relation { plan, rows }
        })
        .collect();
    Some(JoinGraph { relations, edges: raw_edges.into_iter().map(|(l, r, c)| Edge { left: l, right: r, condition: c }).collect() })
}

fn collect(plan: &LogicalPlan, relations: &mut Vec<LogicalPlan>, edges: &mut Vec<(usize, usize, JoinCondition)>) -> bool {
    match plan {
        LogicalPlan::Join { left, right, join_type: JoinType::Inner, conditions } => {
            if conditions.is_empty() {
                return false;
            }
            let left_base = relations.len();
            if !collect(left, relations, edges) {
                return false;
            }
            let right_base = relations.len();
            if !collect(right, relations, edges) {
                return false;
            }
            for c in conditions {
                let li = relation_index(&c.left, relations).unwrap_or(left_base);
                let ri = relation_index(&c.right, relations).unwrap_or(right_base);
                edges.push((li, ri, c.clone()));
            }
            true
        }
        other => {
            relations.push(other.clone());
            true
        }
    }
}

/// Find which relation a join-condition side's column belongs to by
/// checking each relation's output columns.
fn relation_index(expr: &Expr, relations: &[LogicalPlan]) -> Option<usize> {
    let mut cols = Vec::new();
    expr.referenced_columns(&mut cols);
    let name = cols.first()?;
    relations.iter().position(|p| p.output_columns().iter().any(|c| c == name))
}

fn estimate_rows(plan: &LogicalPlan, est: &CardinalityEstimator) -> f64 {
    match plan {
        LogicalPlan::Scan { table, pushdown, .. } => {
            let (base, _) = est.estimate_table_scan(table);
            if pushdown.predicates.is_empty() {
                base
            } else {
                est.estimate_filter(table, base, &pushdown.predicates)
            }
        }
        LogicalPlan::Selection { input, conditions } => {
            let input_rows = estimate_rows(input, est);
            if let LogicalPlan::Scan { table, .. } = input.as_ref() {
                est.estimate_filter(table, input_rows, conditions)
            } else {
                input_rows * 0.5
            }
        }
        _ => 1000.0,
    }
}

/// Search result for one subset of relations: the cheapest tree found and
/// its estimated cost/cardinality.
#[derive(Clone)]
struct SubsetPlan {
    plan: LogicalPlan,
    cost: f64,
    rows: f64,
}

/// Reorder the inner-join chain rooted at `plan` into its cheapest
/// connected-subset join tree. Returns `None` when `plan` isn't a
/// reorderable inner-join chain, or cancellation interrupts the search —
/// callers keep the original plan in that case.
pub fn reorder_joins(
    plan: &LogicalPlan,
    catalog: &Catalog,
    hints: &OptimizerHints,
    cost_model: &CostModel,
    max_dp_relations: usize,
    bushiness_bound: usize,
    token: &crate::cancellation::CancellationToken,
) -> Option<LogicalPlan> {
    let graph = build_graph(plan, catalog)?;
    let n = graph.relations.len();

    if hints.straight_join {
        return Some(build_left_deep(&graph, &(0..n).collect::<Vec<_>>(), cost_model));
    }
    if !hints.leading.is_empty() {
        let order = leading_order(&graph, &hints.leading)?;
        return Some(build_left_deep(&graph, &order, cost_model));
    }

    if n > max_dp_relations {
        let order = greedy_order(&graph);
        return Some(build_left_deep(&graph, &order, cost_model));
    }

    dp_reorder(&graph, catalog, cost_model, bushiness_bound, token)
}

/// Fix the join order to exactly match a `LEADING(...)` hint when it names
/// every relation; a partial list is not safely applicable to a bushy
/// search, so it is ignored rather than guessed at.
fn leading_order(graph: &JoinGraph, leading: &[String]) -> Option<Vec<usize>> {
    if leading.len() != graph.relations.len() {
        return None;
    }
    let mut order = Vec::with_capacity(leading.len());
    for name in leading {
        let idx = graph.relations.iter().position(|r| matches!(&r.plan, LogicalPlan::Scan { table, .. } if table == name))?;
        order.push(idx);
    }
    Some(order)
}

/// Greedy fallback for relation counts past the DP bound: join the two
/// smallest-estimated-rows relations first, then repeatedly add the
/// cheapest-to-attach remaining relation.
fn greedy_order(graph: &JoinGraph) -> Vec<usize> {
    let mut remaining: Vec<usize> = (0..graph.relations.len()).collect();
    remaining.sort_by(|a, b| graph.relations[*a].rows.partial_cmp(&graph.relations[*b].rows).unwrap());
    remaining
}

fn build_left_deep(graph: &JoinGraph, order: &[usize], _cost_model: &CostModel) -> LogicalPlan {
    let mut current_set = vec![order[0]];
    let mut plan = graph.relations[order[0]].plan.clone();
    for &next in &order[1..] {
        let conditions: Vec<JoinCondition> = graph
            .edges
            .iter()
            .filter(|e| (current_set.contains(&e.left) && e.right == next) || (current_set.contains(&e.right) && e.left == next))
            .map(|e| e.condition.clone())
            .collect();
        let join_type = if conditions.is_empty() { JoinType::Cross } else { JoinType::Inner };
        plan = LogicalPlan::Join {
            left: Box::new(plan),
            right: Box::new(graph.relations[next].plan.clone()),
            join_type,
            conditions,
        };
        current_set.push(next);
    }
    plan
}

/// Subset dynamic program over the join graph's relations. Only connected
/// subsets are considered (a subset with no edge back to its complement
/// would need a cross join, which the DP leaves to the cross-join floor
/// cost rather than special-casing).
fn dp_reorder(
    graph: &JoinGraph,
    catalog: &Catalog,
    cost_model: &CostModel,
    bushiness_bound: usize,
    token: &crate::cancellation::CancellationToken,
) -> Option<LogicalPlan> {
    let n = graph.relations.len();
    let est = CardinalityEstimator::new(catalog);
    let mut best: HashMap<u32, SubsetPlan> = HashMap::new();

    for i in 0..n {
        let mask = 1u32 << i;
        best.insert(mask, SubsetPlan { plan: graph.relations[i].plan.clone(), cost: 0.0, rows: graph.relations[i].rows });
    }

    for size in 2..=n {
        for mask in (0u32..(1 << n)).filter(|m| m.count_ones() as usize == size) {
            if token.is_cancelled() {
                return None;
            }
            let mut best_for_mask: Option<SubsetPlan> = None;
            let mut sub = (mask - 1) & mask;
            while sub > 0 {
                let complement = mask & !sub;
                if complement != 0 && best.contains_key(&sub) && best.contains_key(&complement) {
                    let s1 = sub.count_ones() as usize;
                    let s2 = complement.count_ones() as usize;
                    if s1.min(s2) <= bushiness_bound && connected(graph, sub, complement) {
                        let left = &best[&sub];
                        let right = &best[&complement];
                        let conditions = connecting_conditions(graph, sub, complement);
                        let join_type = if conditions.is_empty() { JoinType::Cross } else { JoinType::Inner };
                        let rows = est.estimate_join(left.rows, right.rows, join_type, false);
                        let join_cost = cost_model.hash_join(left.rows, right.rows, join_type);
                        let total_cost = left.cost + right.cost + join_cost;
                        if best_for_mask.as_ref().map(|b| total_cost < b.cost).unwrap_or(true) {
                            best_for_mask = Some(SubsetPlan {
                                plan: LogicalPlan::Join {
                                    left: Box::new(left.plan.clone()),
                                    right: Box::new(right.plan.clone()),
                                    join_type,
                                    conditions,
                                },
                                cost: total_cost,
                                rows,
                            });
                        }
                    }
                }
                sub = (sub - 1) & mask;
            }
            if let Some(p) = best_for_mask {
                best.insert(mask, p);
            }
        }
    }

    best.remove(&((1u32 << n) - 1)).map(|p| p.plan)
}

fn connected(graph: &JoinGraph, sub: u32, complement: u32) -> bool {
    graph.edges.iter().any(|e| {
        let (l, r) = (1u32 << e.left, 1u32 << e.right);
        (sub & l != 0 && complement & r != 0) || (sub & r != 0 && complement & l != 0)
    })
}

fn connecting_conditions(graph: &JoinGraph, sub: u32, complement: u32) -> Vec<JoinCondition> {
    graph
        .edges
        .iter()
        .filter(|e| {
            let (l, r) = (1u32 << e.left, 1u32 << e.right);
            (sub & l != 0 && complement & r != 0) || (sub & r != 0 && complement & l != 0)
        })
        .map(|e| e.condition.clone())
        .collect()
}
