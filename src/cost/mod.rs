//! Scalar cost model: translates cardinality estimates and operator shape
//! into a single comparable cost, under four tunable factors (IO, CPU,
//! memory, network). The factors are a plain, copyable struct the rest of
//! the optimizer reads through a shared reference; they change only
//! between `Optimize` calls, never mid-plan.

pub mod cardinality;

use crate::config::CostFactors;
use crate::plan::logical::JoinType;

pub use cardinality::CardinalityEstimator;

#[derive(Debug, Clone, Copy)]
pub struct CostModel {
    pub factors: CostFactors,
}

impl CostModel {
    pub fn new(factors: CostFactors) -> Self {
        Self { factors }
    }

    pub fn scan(&self, rows: f64, uses_index: bool, selectivity: f64) -> f64 {
        let io_scale = if uses_index { selectivity.clamp(0.001, 1.0) } else { 1.0 };
        rows * (self.factors.io * io_scale + self.factors.cpu)
    }

    pub fn filter(&self, in_rows: f64, selectivity: f64) -> f64 {
        let out_rows = in_rows * selectivity;
        in_rows * self.factors.cpu + out_rows
    }

    pub fn project(&self, rows: f64, n_exprs: usize) -> f64 {
        rows * n_exprs.max(1) as f64 * self.factors.cpu
    }

    pub fn limit(&self, in_cost: f64, k: usize) -> f64 {
        in_cost + k as f64 * 0.01
    }

    pub fn sort(&self, rows: f64) -> f64 {
        if rows <= 1.0 {
            return rows * self.factors.cpu;
        }
        rows * rows.log2() * self.factors.cpu + rows * self.factors.memory
    }

    pub fn top_n(&self, rows: f64, k: usize) -> f64 {
        rows * (k.max(1) as f64).log2().max(1.0) * self.factors.cpu
    }

    pub fn hash_join(&self, left_rows: f64, right_rows: f64, join_type: JoinType) -> f64 {
        let build = left_rows * (self.factors.cpu + self.factors.memory);
        let probe = right_rows * self.factors.cpu;
        let type_adj = match join_type {
            JoinType::FullOuter => (left_rows + right_rows) * self.factors.cpu * 0.1,
            JoinType::LeftOuter | JoinType::RightOuter | JoinType::Semi | JoinType::AntiSemi => {
                left_rows.min(right_rows) * self.factors.cpu * 0.05
            }
            _ => 0.0,
        };
        build + probe + type_adj
    }

    pub fn hash_aggregate(&self, rows: f64, n_groups: f64, n_aggs: usize) -> f64 {
        let group_cost = self.factors.cpu + self.factors.memory * (n_groups / rows.max(1.0));
        rows * (group_cost + self.factors.cpu * n_aggs.max(1) as f64)
    }

    pub fn stream_aggregate(&self, rows: f64, n_aggs: usize) -> f64 {
        // Assumes input arrives pre-sorted by group key: no hash table, no
        // extra memory factor, strictly cheaper per row than hashing.
        rows * self.factors.cpu * (1.0 + n_aggs.max(1) as f64 * 0.5)
    }
}
