//! Physical plan tree: mirrors logical structure but every node carries a
//! concrete implementation choice plus estimated cost and cardinality.

use crate::catalog::Column;
use crate::expression::Expr;
use crate::plan::logical::{AggAlgorithm, AggregateItem, JoinCondition, JoinType, OrderItem, WindowFunction};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinAlgorithm {
    Hash,
    Merge,
    NestedLoop,
}

/// A node's estimated cost and cardinality, attached by the cost model as
/// physical nodes are built bottom-up.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CostEstimate {
    pub cost: f64,
    pub cardinality: f64,
}

#[derive(Debug, Clone)]
pub enum PhysicalPlan {
    /// A statically-known-empty relation; lowered straight through from
    /// `LogicalPlan::EmptyRelation` without visiting an execution operator.
    EmptyRelation {
        columns: Vec<Column>,
        estimate: CostEstimate,
    },
    TableScan {
        table: String,
        columns: Vec<Column>,
        predicates: Vec<Expr>,
        index: Option<String>,
        limit: Option<usize>,
        offset: Option<usize>,
        estimate: CostEstimate,
    },
    Selection {
        input: Box<PhysicalPlan>,
        conditions: Vec<Expr>,
        estimate: CostEstimate,
    },
    Projection {
        input: Box<PhysicalPlan>,
        exprs: Vec<Expr>,
        aliases: Vec<String>,
        estimate: CostEstimate,
    },
    Limit {
        input: Box<PhysicalPlan>,
        limit: usize,
        offset: usize,
        estimate: CostEstimate,
    },
    Sort {
        input: Box<PhysicalPlan>,
        items: Vec<OrderItem>,
        estimate: CostEstimate,
    },
    TopN {
        input: Box<PhysicalPlan>,
        items: Vec<OrderItem>,
        limit: usize,
        offset: usize,
        estimate: CostEstimate,
    },
    HashAggregate {
        input: Box<PhysicalPlan>,
        group_by: Vec<Expr>,
        aggregates: Vec<AggregateItem>,
        estimate: CostEstimate,
    },
    StreamAggregate {
        input: Box<PhysicalPlan>,
        group_by: Vec<Expr>,
        aggregates: Vec<AggregateItem>,
        estimate: CostEstimate,
    },
    Join {
        left: Box<PhysicalPlan>,
        right: Box<PhysicalPlan>,
        join_type: JoinType,
        algorithm: JoinAlgorithm,
        conditions: Vec<JoinCondition>,
        estimate: CostEstimate,
    },
    Union {
        inputs: Vec<PhysicalPlan>,
        all: bool,
        estimate: CostEstimate,
    },
    Window {
        input: Box<PhysicalPlan>,
        functions: Vec<WindowFunction>,
        estimate: CostEstimate,
    },
    Insert {
        table: String,
        columns: Vec<String>,
        source: Option<Box<PhysicalPlan>>,
        values: Vec<Vec<Expr>>,
        estimate: CostEstimate,
    },
    Update {
        table: String,
        assignments: Vec<(String, Expr)>,
        filter: Option<Box<PhysicalPlan>>,
        estimate: CostEstimate,
    },
    Delete {
        table: String,
        filter: Option<Box<PhysicalPlan>>,
        estimate: CostEstimate,
    },
}

impl PhysicalPlan {
    pub fn estimate(&self) -> CostEstimate {
        match self {
            PhysicalPlan::EmptyRelation { estimate, .. }
            | PhysicalPlan::TableScan { estimate, .. }
            | PhysicalPlan::Selection { estimate, .. }
            | PhysicalPlan::Projection { estimate, .. }
            | PhysicalPlan::Limit { estimate, .. }
            | PhysicalPlan::Sort { estimate, .. }
            | PhysicalPlan::TopN { estimate, .. }
            | PhysicalPlan::HashAggregate { estimate, .. }
            | PhysicalPlan::StreamAggregate { estimate, .. }
            | PhysicalPlan::Join { estimate, .. }
            | PhysicalPlan::Union { estimate, .. }
            | PhysicalPlan::Window { estimate, .. }
            | PhysicalPlan::Insert { estimate, .. }
            | PhysicalPlan::Update { estimate, .. }
            | PhysicalPlan::Delete { estimate, .. } => *estimate,
        }
    }

    pub fn cost(&self) -> f64 {
        self.estimate().cost
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn estimate_accessor_reads_every_variant_field() {
        let scan = PhysicalPlan::TableScan {
            table: "t".into(),
            columns: vec![],
            predicates: vec![],
            index: None,
            limit: None,
            offset: None,
            estimate: CostEstimate { cost: 42.0, cardinality: 100.0 },
        };
        assert_eq!(scan.cost(), 42.0);
    }
}
