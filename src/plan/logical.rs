//! Logical plan tree: variant-tagged nodes with zero or more children,
//! covering the full operator set a cost-based optimizer needs (Scan,
//! Selection, Projection, Limit, Sort, TopN, Aggregate, Join, Union,
//! Window, Insert/Update/Delete).

use crate::catalog::Column;
use crate::common::TableId;
use crate::expression::Expr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

#[derive(Debug, Clone)]
pub struct OrderItem {
    pub expr: Expr,
    pub direction: SortDirection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinType {
    Inner,
    LeftOuter,
    RightOuter,
    FullOuter,
    Cross,
    Semi,
    AntiSemi,
}

#[derive(Debug, Clone)]
pub struct JoinCondition {
    pub left: Expr,
    pub right: Expr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggFuncKind {
    Count,
    Sum,
    Avg,
    Min,
    Max,
}

#[derive(Debug, Clone)]
pub struct AggregateItem {
    pub kind: AggFuncKind,
    pub expr: Expr,
    pub alias: String,
    pub distinct: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggAlgorithm {
    Hash,
    Stream,
}

#[derive(Debug, Clone)]
pub struct WindowFunction {
    pub name: String,
    pub args: Vec<Expr>,
    pub partition_by: Vec<Expr>,
    pub order_by: Vec<OrderItem>,
    pub alias: String,
}

/// Pushdown state accumulated on a `Scan` node by the rewrite rules: the
/// node is still "logical" but remembers what the engine must apply at
/// scan time.
#[derive(Debug, Clone, Default)]
pub struct ScanPushdown {
    pub predicates: Vec<Expr>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

/// A logical plan node. Trees own their children exclusively: no shared
/// subplans, no cycles.
#[derive(Debug, Clone)]
pub enum LogicalPlan {
    Scan {
        table_id: TableId,
        table: String,
        columns: Vec<Column>,
        pushdown: ScanPushdown,
    },
    /// A single-row, zero-column scan for FROM-less `SELECT` statements.
    Dual,
    /// A statically-known-empty relation with the given schema, produced
    /// when constant folding reduces a `Selection` condition to `false`.
    EmptyRelation {
        columns: Vec<Column>,
    },
    Selection {
        input: Box<LogicalPlan>,
        conditions: Vec<Expr>,
    },
    Projection {
        input: Box<LogicalPlan>,
        exprs: Vec<Expr>,
        aliases: Vec<String>,
    },
    Limit {
        input: Box<LogicalPlan>,
        limit: usize,
        offset: usize,
    },
    Sort {
        input: Box<LogicalPlan>,
        items: Vec<OrderItem>,
    },
    TopN {
        input: Box<LogicalPlan>,
        items: Vec<OrderItem>,
        limit: usize,
        offset: usize,
    },
    Aggregate {
        input: Box<LogicalPlan>,
        group_by: Vec<Expr>,
        aggregates: Vec<AggregateItem>,
        algorithm: Option<AggAlgorithm>,
    },
    Join {
        left: Box<LogicalPlan>,
        right: Box<LogicalPlan>,
        join_type: JoinType,
        conditions: Vec<JoinCondition>,
    },
    Union {
        inputs: Vec<LogicalPlan>,
        all: bool,
    },
    Window {
        input: Box<LogicalPlan>,
        functions: Vec<WindowFunction>,
    },
    Insert {
        table: String,
        columns: Vec<String>,
        source: Option<Box<LogicalPlan>>,
        values: Vec<Vec<Expr>>,
    },
    Update {
        table: String,
        assignments: Vec<(String, Expr)>,
        filter: Option<Box<LogicalPlan>>,
    },
    Delete {
        table: String,
        filter: Option<Box<LogicalPlan>>,
    },
}

impl LogicalPlan {
    pub fn children(&self) -> Vec<&LogicalPlan> {
        match self {
            LogicalPlan::Scan { .. } | LogicalPlan::Dual | LogicalPlan::EmptyRelation { .. } => vec![],
            LogicalPlan::Selection { input, .. }
            | LogicalPlan::Projection { input, .. }
            | LogicalPlan::Limit { input, .. }
            | LogicalPlan::Sort { input, .. }
            | LogicalPlan::TopN { input, .. }
            | LogicalPlan::Aggregate { input, .. }
            | LogicalPlan::Window { input, .. } => vec![input.as_ref()],
            LogicalPlan::Join { left, right, .. } => vec![left.as_ref(), right.as_ref()],
            LogicalPlan::Union { inputs, .. } => inputs.iter().collect(),
            LogicalPlan::Insert { source, .. } => source.iter().map(|b| b.as_ref()).collect(),
            LogicalPlan::Update { filter, .. } | LogicalPlan::Delete { filter, .. } => {
                filter.iter().map(|b| b.as_ref()).collect()
            }
        }
    }

    /// The column names this node outputs, used by column pruning to know
    /// what a parent actually requires from this subtree.
    pub fn output_columns(&self) -> Vec<String> {
        match self {
            LogicalPlan::Scan { columns, .. } | LogicalPlan::EmptyRelation { columns } => {
                columns.iter().map(|c| c.name.clone()).collect()
            }
            LogicalPlan::Dual => vec![],
            LogicalPlan::Projection { aliases, .. } => aliases.clone(),
            LogicalPlan::Selection { input, .. }
            | LogicalPlan::Limit { input, .. }
            | LogicalPlan::Sort { input, .. }
            | LogicalPlan::TopN { input, .. } => input.output_columns(),
            LogicalPlan::Aggregate { group_by, aggregates, .. } => {
                let mut cols: Vec<String> = Vec::new();
                for g in group_by {
                    let mut c = Vec::new();
                    g.referenced_columns(&mut c);
                    cols.extend(c);
                }
                cols.extend(aggregates.iter().map(|a| a.alias.clone()));
                cols
            }
            LogicalPlan::Join { left, right, .. } => {
                let mut cols = left.output_columns();
                cols.extend(right.output_columns());
                cols
            }
            LogicalPlan::Union { inputs, .. } => inputs.first().map(|p| p.output_columns()).unwrap_or_default(),
            LogicalPlan::Window { input, functions, .. } => {
                let mut cols = input.output_columns();
                cols.extend(functions.iter().map(|f| f.alias.clone()));
                cols
            }
            LogicalPlan::Insert { .. } | LogicalPlan::Update { .. } | LogicalPlan::Delete { .. } => vec![],
        }
    }

    pub fn is_empty_result(&self) -> bool {
        matches!(self, LogicalPlan::EmptyRelation { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::DataType;

    fn scan(table: &str) -> LogicalPlan {
        LogicalPlan::Scan {
            table_id: 1,
            table: table.to_string(),
            columns: vec![Column { name: "id".into(), data_type: DataType::Integer, nullable: false, default: None }],
            pushdown: ScanPushdown::default(),
        }
    }

    #[test]
    fn scan_has_no_children() {
        assert!(scan("t").children().is_empty());
    }

    #[test]
    fn join_exposes_both_children() {
        let join = LogicalPlan::Join {
            left: Box::new(scan("a")),
            right: Box::new(scan("b")),
            join_type: JoinType::Inner,
            conditions: vec![],
        };
        assert_eq!(join.children().len(), 2);
    }

    #[test]
    fn output_columns_pass_through_selection() {
        let sel = LogicalPlan::Selection { input: Box::new(scan("t")), conditions: vec![] };
        assert_eq!(sel.output_columns(), vec!["id".to_string()]);
    }
}
