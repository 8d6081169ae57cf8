//! Top-level entry point: turns SQL text into a cost-annotated physical
//! plan. Ties together hint extraction, AST lowering, rule rewriting, join
//! reordering, and index selection into the one pipeline callers drive.
//! Parses with `sqlparser`'s `GenericDialect` and lowers straight onto
//! `LogicalPlan`, one per-statement match arm per statement kind.

use crate::cancellation::CancellationToken;
use crate::catalog::{Catalog, Column, DataType};
use crate::config::OptimizerConfig;
use crate::cost::{CardinalityEstimator, CostModel};
use crate::error::{Diagnostic, OptimizerError, Result};
use crate::expression::Expr as OptExpr;
use crate::hints::OptimizerHints;
use crate::index_advisor::{IndexAdvisor, IndexRecommendation};
use crate::index_selector::IndexSelector;
use crate::join_optimizer::reorder_joins;
use crate::plan::logical::{
    AggAlgorithm, AggFuncKind, AggregateItem, JoinCondition, JoinType, LogicalPlan, OrderItem, ScanPushdown, SortDirection,
};
use crate::plan::physical::{CostEstimate, JoinAlgorithm, PhysicalPlan};
use crate::rules::{RuleContext, RuleEngine};
use sqlparser::ast::{
    self, BinaryOperator, Expr as SqlExpr, GroupByExpr, Join as SqlJoin, JoinConstraint, JoinOperator, ObjectName, OrderByExpr,
    Query, Select, SelectItem, SetExpr, Statement, TableFactor, TableWithJoins, UnaryOperator, Value as SqlValue,
};
use sqlparser::dialect::GenericDialect;
use sqlparser::parser::Parser;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// The result of one `Optimizer::optimize` call: the cost-annotated
/// physical plan, the hints that shaped it, and any non-fatal diagnostics.
#[derive(Debug, Clone)]
pub struct OptimizeResult {
    pub plan: PhysicalPlan,
    pub hints: OptimizerHints,
    pub diagnostics: Vec<Diagnostic>,
}

/// Cumulative counters for one `Optimizer` instance's lifetime. Cheap to
/// snapshot; no cross-statement plan cache is kept (out of scope — see the
/// crate-level notes on per-statement caching).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct OptimizerStatistics {
    pub queries_optimized: u64,
    pub total_optimization_time: Duration,
    pub rule_applications: u64,
    pub advisor_runs: u64,
}

#[derive(Default)]
struct StatsCounters {
    queries_optimized: AtomicU64,
    total_optimization_nanos: AtomicU64,
    rule_applications: AtomicU64,
    advisor_runs: AtomicU64,
}

impl StatsCounters {
    fn snapshot(&self) -> OptimizerStatistics {
        OptimizerStatistics {
            queries_optimized: self.queries_optimized.load(Ordering::Relaxed),
            total_optimization_time: Duration::from_nanos(self.total_optimization_nanos.load(Ordering::Relaxed)),
            rule_applications: self.rule_applications.load(Ordering::Relaxed),
            advisor_runs: self.advisor_runs.load(Ordering::Relaxed),
        }
    }
}

/// Fingerprint a statement for tracing spans: lowercased, whitespace
/// collapsed. Deliberately not used for plan caching — see crate notes.
fn fingerprint(sql: &str) -> String {
    sql.to_ascii_lowercase().split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Orchestrates one `Catalog`'s worth of query optimization: hint parsing,
/// SQL-to-logical-plan lowering, rule rewriting, join reordering, index
/// selection, and physical cost annotation.
pub struct Optimizer {
    catalog: Catalog,
    config: OptimizerConfig,
    rule_engine: RuleEngine,
    stats: StatsCounters,
}

impl Optimizer {
    pub fn new(catalog: Catalog) -> Self {
        Self::with_config(catalog, OptimizerConfig::default())
    }

    pub fn with_config(catalog: Catalog, config: OptimizerConfig) -> Self {
        let rule_engine = RuleEngine::with_default_rules(&config);
        Self { catalog, config, rule_engine, stats: StatsCounters::default() }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn config(&self) -> &OptimizerConfig {
        &self.config
    }

    pub fn stats(&self) -> OptimizerStatistics {
        self.stats.snapshot()
    }

    /// Run the full pipeline on one SQL statement: extract hints, parse,
    /// lower to a logical plan, rewrite to a fixed point, reorder joins,
    /// choose indexes, and cost the result.
    pub fn optimize(&self, sql: &str, token: &CancellationToken) -> Result<OptimizeResult> {
        let start = Instant::now();
        let _span = tracing::info_span!("optimize", fingerprint = %fingerprint(sql)).entered();

        let (hints, cleaned_sql) = OptimizerHints::extract(sql);
        let logical = self.lower_sql(&cleaned_sql)?;

        let ctx = RuleContext { hints: &hints, catalog: &self.catalog };
        let (rewritten, mut diagnostics) = self.rule_engine.rewrite(logical, &ctx, token)?;
        self.stats.rule_applications.fetch_add(1, Ordering::Relaxed);

        let cost_model = CostModel::new(self.config.cost_factors);
        let reordered = rewrite_joins(rewritten, &self.catalog, &hints, &cost_model, &self.config, token);

        let selector = IndexSelector::new(&self.catalog);
        let physical = lower_to_physical(&reordered, &self.catalog, &selector, &hints, &cost_model);

        if token.is_cancelled() {
            diagnostics.push(Diagnostic::from_error(&OptimizerError::Cancelled));
        }

        self.stats.queries_optimized.fetch_add(1, Ordering::Relaxed);
        self.stats.total_optimization_nanos.fetch_add(start.elapsed().as_nanos() as u64, Ordering::Relaxed);

        Ok(OptimizeResult { plan: physical, hints, diagnostics })
    }

    /// Parse and lower a batch of workload queries (rule-rewritten, not
    /// join-reordered or physically lowered) and run the index advisor over
    /// the resulting logical plans.
    pub fn recommend_indexes(&self, workload_sql: &[String], token: &CancellationToken) -> Result<Vec<IndexRecommendation>> {
        let mut plans = Vec::with_capacity(workload_sql.len());
        for sql in workload_sql {
            let (hints, cleaned_sql) = OptimizerHints::extract(sql);
            let logical = self.lower_sql(&cleaned_sql)?;
            let ctx = RuleContext { hints: &hints, catalog: &self.catalog };
            let (rewritten, _) = self.rule_engine.rewrite(logical, &ctx, token)?;
            plans.push(rewritten);
        }
        self.stats.advisor_runs.fetch_add(1, Ordering::Relaxed);
        let advisor = IndexAdvisor::new(&self.catalog, &self.config);
        Ok(advisor.recommend(&plans, token))
    }

    fn lower_sql(&self, sql: &str) -> Result<LogicalPlan> {
        let statements = Parser::parse_sql(&GenericDialect {}, sql)
            .map_err(|e| OptimizerError::unsupported(format!("SQL parse error: {e}")))?;
        let statement = statements
            .into_iter()
            .next()
            .ok_or_else(|| OptimizerError::unsupported("no statement to optimize".to_string()))?;
        lower_statement(statement, &self.catalog)
    }
}

/// Walk the plan bottom-up, reordering every maximal inner-join chain found
/// anywhere in the tree. A join subtree may be revisited by an enclosing
/// join's own reorder pass (its `collect` flattens through already-Inner
/// children); that is wasted work, not wrong output, since DP over a
/// subset that's already optimal just reproduces it.
fn rewrite_joins(
    plan: LogicalPlan,
    catalog: &Catalog,
    hints: &OptimizerHints,
    cost_model: &CostModel,
    config: &OptimizerConfig,
    token: &CancellationToken,
) -> LogicalPlan {
    use LogicalPlan::*;
    let recurse = |p: LogicalPlan| rewrite_joins(p, catalog, hints, cost_model, config, token);
    match plan {
        Scan { .. } | Dual | EmptyRelation { .. } => plan,
        Selection { input, conditions } => Selection { input: Box::new(recurse(*input)), conditions },
        Projection { input, exprs, aliases } => Projection { input: Box::new(recurse(*input)), exprs, aliases },
        Limit { input, limit, offset } => Limit { input: Box::new(recurse(*input)), limit, offset },
        Sort { input, items } => Sort { input: Box::new(recurse(*input)), items },
        TopN { input, items, limit, offset } => TopN { input: Box::new(recurse(*input)), items, limit, offset },
        Aggregate { input, group_by, aggregates, algorithm } => {
            Aggregate { input: Box::new(recurse(*input)), group_by, aggregates, algorithm }
        }
        Window { input, functions } => Window { input: Box::new(recurse(*input)), functions },
        Union { inputs, all } => Union { inputs: inputs.into_iter().map(recurse).collect(), all },
        Join { left, right, join_type, conditions } => {
            let left = recurse(*left);
            let right = recurse(*right);
            let joined = Join { left: Box::new(left), right: Box::new(right), join_type, conditions };
            reorder_joins(&joined, catalog, hints, cost_model, config.max_dp_relations, config.bushiness_bound, token)
                .unwrap_or(joined)
        }
        Insert { table, columns, source, values } => {
            Insert { table, columns, source: source.map(|s| Box::new(recurse(*s))), values }
        }
        Update { table, assignments, filter } => Update { table, assignments, filter: filter.map(|f| Box::new(recurse(*f))) },
        Delete { table, filter } => Delete { table, filter: filter.map(|f| Box::new(recurse(*f))) },
    }
}

// ---------------------------------------------------------------------
// AST lowering
// ---------------------------------------------------------------------

fn lower_statement(stmt: Statement, catalog: &Catalog) -> Result<LogicalPlan> {
    match stmt {
        Statement::Query(query) => lower_query(&query, catalog),
        Statement::Insert(insert) => lower_insert(insert, catalog),
        Statement::Update { table, assignments, selection, .. } => {
            let table_name = table_with_joins_name(&table)?;
            let assignments = assignments
                .into_iter()
                .map(|a| Ok((assignment_target_name(&a.target)?, lower_expr(&a.value)?)))
                .collect::<Result<Vec<_>>>()?;
            let filter = selection
                .map(|e| {
                    let info = catalog.get_table(&table_name).ok();
                    let columns = info.map(|i| i.columns).unwrap_or_default();
                    let scan = LogicalPlan::Scan {
                        table_id: 0,
                        table: table_name.clone(),
                        columns,
                        pushdown: ScanPushdown::default(),
                    };
                    Ok::<_, OptimizerError>(Box::new(LogicalPlan::Selection { input: Box::new(scan), conditions: vec![lower_expr(&e)?] }))
                })
                .transpose()?;
            Ok(LogicalPlan::Update { table: table_name, assignments, filter })
        }
        Statement::Delete(delete) => {
            let table_name = delete
                .from
                .iter()
                .next()
                .map(table_with_joins_name)
                .transpose()?
                .ok_or_else(|| OptimizerError::unsupported("DELETE without a FROM table".to_string()))?;
            let filter = delete
                .selection
                .map(|e| {
                    let info = catalog.get_table(&table_name).ok();
                    let columns = info.map(|i| i.columns).unwrap_or_default();
                    let scan = LogicalPlan::Scan {
                        table_id: 0,
                        table: table_name.clone(),
                        columns,
                        pushdown: ScanPushdown::default(),
                    };
                    Ok::<_, OptimizerError>(Box::new(LogicalPlan::Selection { input: Box::new(scan), conditions: vec![lower_expr(&e)?] }))
                })
                .transpose()?;
            Ok(LogicalPlan::Delete { table: table_name, filter })
        }
        Statement::ShowVariable { .. } | Statement::ShowVariables { .. } | Statement::SetVariable { .. } => {
            // This crate carries no session/variable model; SHOW/SET belong
            // to the surrounding engine, not the optimizer.
            Err(OptimizerError::unsupported("SHOW/SET session statements are not planned by this optimizer".to_string()))
        }
        other => Err(OptimizerError::unsupported(format!("unsupported statement: {other}"))),
    }
}

fn lower_insert(insert: ast::Insert, catalog: &Catalog) -> Result<LogicalPlan> {
    let table_name = object_name_to_string(&insert.table_name);
    let columns = insert.columns.iter().map(|i| i.value.clone()).collect();
    if let Some(source) = insert.source {
        let plan = lower_query(&source, catalog)?;
        return Ok(LogicalPlan::Insert { table: table_name, columns, source: Some(Box::new(plan)), values: vec![] });
    }
    Ok(LogicalPlan::Insert { table: table_name, columns, source: None, values: vec![] })
}

fn lower_query(query: &Query, catalog: &Catalog) -> Result<LogicalPlan> {
    let mut plan = match query.body.as_ref() {
        SetExpr::Select(select) => lower_select(select, catalog)?,
        SetExpr::SetOperation { op, set_quantifier, left, right } => {
            let left_plan = lower_set_expr(left, catalog)?;
            let right_plan = lower_set_expr(right, catalog)?;
            if !matches!(op, ast::SetOperator::Union) {
                return Err(OptimizerError::unsupported(format!("set operator {op} is not supported")));
            }
            let all = matches!(set_quantifier, ast::SetQuantifier::All);
            LogicalPlan::Union { inputs: vec![left_plan, right_plan], all }
        }
        other => return Err(OptimizerError::unsupported(format!("unsupported query body: {other}"))),
    };

    if let Some(order_by) = &query.order_by {
        let items = order_by_items(&order_by.exprs)?;
        if !items.is_empty() {
            plan = LogicalPlan::Sort { input: Box::new(plan), items };
        }
    }

    let limit = query.limit.as_ref().map(literal_usize).transpose()?;
    let offset = query.offset.as_ref().map(|o| literal_usize(&o.value)).transpose()?.unwrap_or(0);
    if let Some(limit) = limit {
        plan = match plan {
            LogicalPlan::Sort { input, items } => LogicalPlan::TopN { input, items, limit, offset },
            other => LogicalPlan::Limit { input: Box::new(other), limit, offset },
        };
    }

    Ok(plan)
}

fn lower_set_expr(expr: &SetExpr, catalog: &Catalog) -> Result<LogicalPlan> {
    match expr {
        SetExpr::Select(select) => lower_select(select, catalog),
        SetExpr::Query(query) => lower_query(query, catalog),
        other => Err(OptimizerError::unsupported(format!("unsupported query body: {other}"))),
    }
}

fn lower_select(select: &Select, catalog: &Catalog) -> Result<LogicalPlan> {
    let mut plan = if select.from.is_empty() {
        LogicalPlan::Dual
    } else {
        let mut iter = select.from.iter();
        let mut plan = lower_table_with_joins(iter.next().unwrap(), catalog)?;
        for twj in iter {
            let right = lower_table_with_joins(twj, catalog)?;
            plan = LogicalPlan::Join { left: Box::new(plan), right: Box::new(right), join_type: JoinType::Cross, conditions: vec![] };
        }
        plan
    };

    if let Some(selection) = &select.selection {
        let conditions = OptExpr::split_conjunction(&lower_expr(selection)?).into_iter().cloned().collect();
        plan = LogicalPlan::Selection { input: Box::new(plan), conditions };
    }

    let group_by = group_by_exprs(&select.group_by)?;
    let aggregates = aggregate_items(&select.projection)?;
    if !group_by.is_empty() || !aggregates.is_empty() {
        plan = LogicalPlan::Aggregate { input: Box::new(plan), group_by, aggregates, algorithm: None };
        if let Some(having) = &select.having {
            let conditions = OptExpr::split_conjunction(&lower_expr(having)?).into_iter().cloned().collect();
            plan = LogicalPlan::Selection { input: Box::new(plan), conditions };
        }
        return Ok(plan);
    }

    let (exprs, aliases) = projection_items(&select.projection)?;
    if !(exprs.len() == 1 && aliases.len() == 1 && aliases[0] == "*") {
        plan = LogicalPlan::Projection { input: Box::new(plan), exprs, aliases };
    }

    Ok(plan)
}

fn lower_table_with_joins(twj: &TableWithJoins, catalog: &Catalog) -> Result<LogicalPlan> {
    let mut plan = lower_table_factor(&twj.relation, catalog)?;
    for join in &twj.joins {
        plan = lower_join(plan, join, catalog)?;
    }
    Ok(plan)
}

fn lower_join(left: LogicalPlan, join: &SqlJoin, catalog: &Catalog) -> Result<LogicalPlan> {
    let right = lower_table_factor(&join.relation, catalog)?;
    let (join_type, constraint) = match &join.join_operator {
        JoinOperator::Inner(c) => (JoinType::Inner, Some(c)),
        JoinOperator::LeftOuter(c) => (JoinType::LeftOuter, Some(c)),
        JoinOperator::RightOuter(c) => (JoinType::RightOuter, Some(c)),
        JoinOperator::FullOuter(c) => (JoinType::FullOuter, Some(c)),
        JoinOperator::CrossJoin => (JoinType::Cross, None),
        other => return Err(OptimizerError::unsupported(format!("unsupported join operator: {other:?}"))),
    };

    let conditions = match constraint {
        Some(JoinConstraint::On(expr)) => join_conditions(expr)?,
        Some(JoinConstraint::Using(_)) | Some(JoinConstraint::Natural) | None => vec![],
        Some(JoinConstraint::None) => vec![],
    };

    Ok(LogicalPlan::Join { left: Box::new(left), right: Box::new(right), join_type, conditions })
}

/// Split a join's ON clause into individual equi-join conditions, one per
/// top-level AND-ed equality. Non-equality conjuncts are kept as a
/// selection wrapped around the join rather than dropped.
fn join_conditions(expr: &SqlExpr) -> Result<Vec<JoinCondition>> {
    let lowered = lower_expr(expr)?;
    let mut out = Vec::new();
    for conjunct in lowered.split_conjunction() {
        if let OptExpr::BinaryOp { left, op: crate::expression::Operator::Comparison(crate::expression::ComparisonOp::Eq), right } = conjunct {
            out.push(JoinCondition { left: (**left).clone(), right: (**right).clone() });
        }
    }
    Ok(out)
}

fn lower_table_factor(factor: &TableFactor, catalog: &Catalog) -> Result<LogicalPlan> {
    match factor {
        TableFactor::Table { name, .. } => {
            let table_name = object_name_to_string(name);
            let columns = catalog.get_table(&table_name).map(|info| info.columns).unwrap_or_else(|_| {
                vec![Column { name: "*".into(), data_type: DataType::Text, nullable: true, default: None }]
            });
            Ok(LogicalPlan::Scan { table_id: 0, table: table_name, columns, pushdown: ScanPushdown::default() })
        }
        TableFactor::Derived { subquery, .. } => lower_query(subquery, catalog),
        other => Err(OptimizerError::unsupported(format!("unsupported FROM item: {other:?}"))),
    }
}

fn table_with_joins_name(twj: &TableWithJoins) -> Result<String> {
    match &twj.relation {
        TableFactor::Table { name, .. } => Ok(object_name_to_string(name)),
        other => Err(OptimizerError::unsupported(format!("unsupported UPDATE/DELETE target: {other:?}"))),
    }
}

fn assignment_target_name(target: &ast::AssignmentTarget) -> Result<String> {
    match target {
        ast::AssignmentTarget::ColumnName(name) => Ok(object_name_to_string(name)),
        other => Err(OptimizerError::unsupported(format!("unsupported assignment target: {other:?}"))),
    }
}

fn object_name_to_string(name: &ObjectName) -> String {
    name.0.iter().map(|p| p.value.clone()).collect::<Vec<_>>().join(".")
}

fn group_by_exprs(group_by: &GroupByExpr) -> Result<Vec<OptExpr>> {
    match group_by {
        GroupByExpr::Expressions(exprs, _) => exprs.iter().map(lower_expr).collect(),
        GroupByExpr::All(_) => Ok(vec![]),
    }
}

fn order_by_items(exprs: &[OrderByExpr]) -> Result<Vec<OrderItem>> {
    exprs
        .iter()
        .map(|o| {
            let expr = lower_expr(&o.expr)?;
            let direction = if o.asc == Some(false) { SortDirection::Desc } else { SortDirection::Asc };
            Ok(OrderItem { expr, direction })
        })
        .collect()
}

fn literal_usize(expr: &SqlExpr) -> Result<usize> {
    match expr {
        SqlExpr::Value(SqlValue::Number(n, _)) => {
            n.parse::<usize>().map_err(|_| OptimizerError::unsupported(format!("non-integer LIMIT/OFFSET: {n}")))
        }
        other => Err(OptimizerError::unsupported(format!("unsupported LIMIT/OFFSET expression: {other}"))),
    }
}

const AGGREGATE_FUNCTIONS: &[(&str, AggFuncKind)] = &[
    ("count", AggFuncKind::Count),
    ("sum", AggFuncKind::Sum),
    ("avg", AggFuncKind::Avg),
    ("min", AggFuncKind::Min),
    ("max", AggFuncKind::Max),
];

fn aggregate_items(projection: &[SelectItem]) -> Result<Vec<AggregateItem>> {
    let mut items = Vec::new();
    for item in projection {
        let (expr, alias) = match item {
            SelectItem::UnnamedExpr(e) => (e, default_alias(e)),
            SelectItem::ExprWithAlias { expr, alias } => (expr, alias.value.clone()),
            _ => continue,
        };
        if let SqlExpr::Function(func) = expr {
            let name = object_name_to_string(&func.name).to_ascii_lowercase();
            if let Some((_, kind)) = AGGREGATE_FUNCTIONS.iter().find(|(n, _)| *n == name) {
                let args = function_arg_exprs(func);
                let arg_expr = args.first().map(lower_expr).transpose()?.unwrap_or(OptExpr::lit(crate::common::Value::Int(1)));
                items.push(AggregateItem { kind: *kind, expr: arg_expr, alias, distinct: function_is_distinct(func) });
            }
        }
    }
    Ok(items)
}

fn projection_items(projection: &[SelectItem]) -> Result<(Vec<OptExpr>, Vec<String>)> {
    let mut exprs = Vec::new();
    let mut aliases = Vec::new();
    for item in projection {
        match item {
            SelectItem::UnnamedExpr(e) => {
                aliases.push(default_alias(e));
                exprs.push(lower_expr(e)?);
            }
            SelectItem::ExprWithAlias { expr, alias } => {
                aliases.push(alias.value.clone());
                exprs.push(lower_expr(expr)?);
            }
            SelectItem::Wildcard(_) | SelectItem::QualifiedWildcard(_, _) => {
                exprs.push(OptExpr::column("*"));
                aliases.push("*".to_string());
            }
        }
    }
    Ok((exprs, aliases))
}

fn default_alias(expr: &SqlExpr) -> String {
    match expr {
        SqlExpr::Identifier(ident) => ident.value.clone(),
        SqlExpr::CompoundIdentifier(parts) => parts.last().map(|i| i.value.clone()).unwrap_or_default(),
        SqlExpr::Function(func) => object_name_to_string(&func.name),
        _ => "expr".to_string(),
    }
}

fn function_is_distinct(func: &ast::Function) -> bool {
    match &func.args {
        ast::FunctionArguments::List(list) => matches!(list.duplicate_treatment, Some(ast::DuplicateTreatment::Distinct)),
        _ => false,
    }
}

fn function_arg_exprs(func: &ast::Function) -> Vec<SqlExpr> {
    match &func.args {
        ast::FunctionArguments::List(list) => list
            .args
            .iter()
            .filter_map(|a| match a {
                ast::FunctionArg::Unnamed(ast::FunctionArgExpr::Expr(e)) => Some(e.clone()),
                ast::FunctionArg::Named { arg: ast::FunctionArgExpr::Expr(e), .. } => Some(e.clone()),
                _ => None,
            })
            .collect(),
        _ => vec![],
    }
}

fn lower_expr(expr: &SqlExpr) -> Result<OptExpr> {
    match expr {
        SqlExpr::Identifier(ident) => Ok(OptExpr::column(ident.value.clone())),
        SqlExpr::CompoundIdentifier(parts) => match parts.as_slice() {
            [table, column] => Ok(OptExpr::qualified_column(table.value.clone(), column.value.clone())),
            _ => Ok(OptExpr::column(parts.last().map(|i| i.value.clone()).unwrap_or_default())),
        },
        SqlExpr::Value(v) => Ok(OptExpr::Literal(lower_value(v)?)),
        SqlExpr::BinaryOp { left, op, right } => {
            let l = Box::new(lower_expr(left)?);
            let r = Box::new(lower_expr(right)?);
            let operator = lower_binary_operator(op)?;
            Ok(OptExpr::BinaryOp { left: l, op: operator, right: r })
        }
        SqlExpr::UnaryOp { op, expr } => {
            let inner = lower_expr(expr)?;
            match op {
                UnaryOperator::Not => Ok(OptExpr::Not(Box::new(inner))),
                UnaryOperator::Minus => Ok(OptExpr::Negate(Box::new(inner))),
                UnaryOperator::Plus => Ok(inner),
                other => Err(OptimizerError::unsupported(format!("unsupported unary operator: {other}"))),
            }
        }
        SqlExpr::IsNull(inner) => Ok(OptExpr::IsNull { expr: Box::new(lower_expr(inner)?), negated: false }),
        SqlExpr::IsNotNull(inner) => Ok(OptExpr::IsNull { expr: Box::new(lower_expr(inner)?), negated: true }),
        SqlExpr::Between { expr, negated, low, high } => Ok(OptExpr::Between {
            expr: Box::new(lower_expr(expr)?),
            low: Box::new(lower_expr(low)?),
            high: Box::new(lower_expr(high)?),
            negated: *negated,
        }),
        SqlExpr::InList { expr, list, negated } => Ok(OptExpr::InList {
            expr: Box::new(lower_expr(expr)?),
            list: list.iter().map(lower_expr).collect::<Result<Vec<_>>>()?,
            negated: *negated,
        }),
        SqlExpr::InSubquery { expr, subquery, negated } => {
            Ok(OptExpr::InSubquery { expr: Box::new(lower_expr(expr)?), plan: Box::new(lower_query(subquery, &Catalog::new())?), negated: *negated })
        }
        SqlExpr::Exists { subquery, negated } => Ok(OptExpr::Exists { plan: Box::new(lower_query(subquery, &Catalog::new())?), negated: *negated }),
        SqlExpr::Like { negated, expr, pattern, .. } => Ok(OptExpr::BinaryOp {
            left: Box::new(lower_expr(expr)?),
            op: if *negated { crate::expression::Operator::NotLike } else { crate::expression::Operator::Like },
            right: Box::new(lower_expr(pattern)?),
        }),
        SqlExpr::Function(func) => {
            let name = object_name_to_string(&func.name);
            let args = function_arg_exprs(func).iter().map(lower_expr).collect::<Result<Vec<_>>>()?;
            Ok(OptExpr::Function { name, args, distinct: function_is_distinct(func) })
        }
        SqlExpr::Nested(inner) => lower_expr(inner),
        other => Err(OptimizerError::unsupported(format!("unsupported expression: {other}"))),
    }
}

fn lower_value(v: &SqlValue) -> Result<crate::common::Value> {
    use crate::common::Value;
    match v {
        SqlValue::Number(n, _) => {
            if let Ok(i) = n.parse::<i64>() {
                Ok(Value::Int(i))
            } else {
                n.parse::<f64>().map(Value::Float).map_err(|_| OptimizerError::unsupported(format!("unparseable numeric literal: {n}")))
            }
        }
        SqlValue::SingleQuotedString(s) | SqlValue::DoubleQuotedString(s) => Ok(Value::Text(s.clone())),
        SqlValue::Boolean(b) => Ok(Value::Boolean(*b)),
        SqlValue::Null => Ok(Value::Null),
        other => Err(OptimizerError::unsupported(format!("unsupported literal: {other}"))),
    }
}

fn lower_binary_operator(op: &BinaryOperator) -> Result<crate::expression::Operator> {
    use crate::expression::{ArithmeticOp, ComparisonOp, LogicalOp, Operator};
    Ok(match op {
        BinaryOperator::Plus => Operator::Arithmetic(ArithmeticOp::Add),
        BinaryOperator::Minus => Operator::Arithmetic(ArithmeticOp::Sub),
        BinaryOperator::Multiply => Operator::Arithmetic(ArithmeticOp::Mul),
        BinaryOperator::Divide => Operator::Arithmetic(ArithmeticOp::Div),
        BinaryOperator::Modulo => Operator::Arithmetic(ArithmeticOp::Mod),
        BinaryOperator::Eq => Operator::Comparison(ComparisonOp::Eq),
        BinaryOperator::NotEq => Operator::Comparison(ComparisonOp::NotEq),
        BinaryOperator::Lt => Operator::Comparison(ComparisonOp::Lt),
        BinaryOperator::LtEq => Operator::Comparison(ComparisonOp::LtEq),
        BinaryOperator::Gt => Operator::Comparison(ComparisonOp::Gt),
        BinaryOperator::GtEq => Operator::Comparison(ComparisonOp::GtEq),
        BinaryOperator::And => Operator::Logical(LogicalOp::And),
        BinaryOperator::Or => Operator::Logical(LogicalOp::Or),
        other => return Err(OptimizerError::unsupported(format!("unsupported binary operator: {other}"))),
    })
}

// ---------------------------------------------------------------------
// Physical lowering
// ---------------------------------------------------------------------

fn lower_to_physical(
    plan: &LogicalPlan,
    catalog: &Catalog,
    selector: &IndexSelector,
    hints: &OptimizerHints,
    cost_model: &CostModel,
) -> PhysicalPlan {
    match plan {
        LogicalPlan::Scan { table, columns, pushdown, .. } => {
            let est = CardinalityEstimator::new(catalog);
            let (base_rows, _) = est.estimate_table_scan(table);
            let filtered_rows = if pushdown.predicates.is_empty() {
                base_rows
            } else {
                est.estimate_filter(table, base_rows, &pushdown.predicates)
            };
            let required: Vec<String> = columns.iter().map(|c| c.name.clone()).collect();
            let choice = selector.select(table, &pushdown.predicates, &required, hints);
            let selectivity = if base_rows > 0.0 { (filtered_rows / base_rows).clamp(0.0, 1.0) } else { 1.0 };
            let cost = cost_model.scan(base_rows, choice.index_name.is_some(), selectivity);
            PhysicalPlan::TableScan {
                table: table.clone(),
                columns: columns.clone(),
                predicates: pushdown.predicates.clone(),
                index: choice.index_name,
                limit: pushdown.limit,
                offset: pushdown.offset,
                estimate: CostEstimate { cost, cardinality: filtered_rows },
            }
        }
        LogicalPlan::Dual => PhysicalPlan::EmptyRelation { columns: vec![], estimate: CostEstimate { cost: 0.0, cardinality: 1.0 } },
        LogicalPlan::EmptyRelation { columns } => {
            PhysicalPlan::EmptyRelation { columns: columns.clone(), estimate: CostEstimate::default() }
        }
        LogicalPlan::Selection { input, conditions } => {
            let input_phys = lower_to_physical(input, catalog, selector, hints, cost_model);
            let in_rows = input_phys.estimate().cardinality;
            let sel = estimate_selection_selectivity(input, conditions, catalog);
            let cost = input_phys.cost() + cost_model.filter(in_rows, sel);
            let out_rows = (in_rows * sel).max(0.0);
            PhysicalPlan::Selection { input: Box::new(input_phys), conditions: conditions.clone(), estimate: CostEstimate { cost, cardinality: out_rows } }
        }
        LogicalPlan::Projection { input, exprs, aliases } => {
            let input_phys = lower_to_physical(input, catalog, selector, hints, cost_model);
            let rows = input_phys.estimate().cardinality;
            let cost = input_phys.cost() + cost_model.project(rows, exprs.len());
            PhysicalPlan::Projection { input: Box::new(input_phys), exprs: exprs.clone(), aliases: aliases.clone(), estimate: CostEstimate { cost, cardinality: rows } }
        }
        LogicalPlan::Limit { input, limit, offset } => {
            let input_phys = lower_to_physical(input, catalog, selector, hints, cost_model);
            let rows = input_phys.estimate().cardinality.min(*limit as f64);
            let cost = cost_model.limit(input_phys.cost(), *limit);
            PhysicalPlan::Limit { input: Box::new(input_phys), limit: *limit, offset: *offset, estimate: CostEstimate { cost, cardinality: rows } }
        }
        LogicalPlan::Sort { input, items } => {
            let input_phys = lower_to_physical(input, catalog, selector, hints, cost_model);
            let rows = input_phys.estimate().cardinality;
            let cost = input_phys.cost() + cost_model.sort(rows);
            PhysicalPlan::Sort { input: Box::new(input_phys), items: items.clone(), estimate: CostEstimate { cost, cardinality: rows } }
        }
        LogicalPlan::TopN { input, items, limit, offset } => {
            let input_phys = lower_to_physical(input, catalog, selector, hints, cost_model);
            let rows = input_phys.estimate().cardinality.min(*limit as f64);
            let cost = input_phys.cost() + cost_model.top_n(input_phys.estimate().cardinality, *limit);
            PhysicalPlan::TopN { input: Box::new(input_phys), items: items.clone(), limit: *limit, offset: *offset, estimate: CostEstimate { cost, cardinality: rows } }
        }
        LogicalPlan::Aggregate { input, group_by, aggregates, algorithm } => {
            let input_phys = lower_to_physical(input, catalog, selector, hints, cost_model);
            let rows = input_phys.estimate().cardinality;
            let n_groups = if group_by.is_empty() { 1.0 } else { rows.sqrt().max(1.0) };
            let use_stream = matches!(algorithm, Some(AggAlgorithm::Stream)) || (hints.stream_agg && !hints.hash_agg);
            if use_stream {
                let cost = input_phys.cost() + cost_model.stream_aggregate(rows, aggregates.len());
                PhysicalPlan::StreamAggregate {
                    input: Box::new(input_phys),
                    group_by: group_by.clone(),
                    aggregates: aggregates.clone(),
                    estimate: CostEstimate { cost, cardinality: n_groups },
                }
            } else {
                let cost = input_phys.cost() + cost_model.hash_aggregate(rows, n_groups, aggregates.len());
                PhysicalPlan::HashAggregate {
                    input: Box::new(input_phys),
                    group_by: group_by.clone(),
                    aggregates: aggregates.clone(),
                    estimate: CostEstimate { cost, cardinality: n_groups },
                }
            }
        }
        LogicalPlan::Join { left, right, join_type, conditions } => {
            let left_phys = lower_to_physical(left, catalog, selector, hints, cost_model);
            let right_phys = lower_to_physical(right, catalog, selector, hints, cost_model);
            let left_rows = left_phys.estimate().cardinality;
            let right_rows = right_phys.estimate().cardinality;
            let est = CardinalityEstimator::new(catalog);
            let rows = est.estimate_join(left_rows, right_rows, *join_type, false);
            let algorithm = choose_join_algorithm(*join_type, hints);
            let cost = left_phys.cost() + right_phys.cost() + cost_model.hash_join(left_rows, right_rows, *join_type);
            PhysicalPlan::Join {
                left: Box::new(left_phys),
                right: Box::new(right_phys),
                join_type: *join_type,
                algorithm,
                conditions: conditions.clone(),
                estimate: CostEstimate { cost, cardinality: rows },
            }
        }
        LogicalPlan::Union { inputs, all } => {
            let physical_inputs: Vec<PhysicalPlan> = inputs.iter().map(|p| lower_to_physical(p, catalog, selector, hints, cost_model)).collect();
            let rows = physical_inputs.iter().map(|p| p.estimate().cardinality).sum();
            let cost = physical_inputs.iter().map(|p| p.cost()).sum();
            PhysicalPlan::Union { inputs: physical_inputs, all: *all, estimate: CostEstimate { cost, cardinality: rows } }
        }
        LogicalPlan::Window { input, functions } => {
            let input_phys = lower_to_physical(input, catalog, selector, hints, cost_model);
            let rows = input_phys.estimate().cardinality;
            let cost = input_phys.cost() + cost_model.sort(rows) * functions.len().max(1) as f64;
            PhysicalPlan::Window { input: Box::new(input_phys), functions: functions.clone(), estimate: CostEstimate { cost, cardinality: rows } }
        }
        LogicalPlan::Insert { table, columns, source, values } => {
            let source_phys = source.as_ref().map(|s| Box::new(lower_to_physical(s, catalog, selector, hints, cost_model)));
            let rows = source_phys.as_ref().map(|p| p.estimate().cardinality).unwrap_or(values.len() as f64);
            let cost = source_phys.as_ref().map(|p| p.cost()).unwrap_or(0.0) + rows * cost_model.factors.cpu;
            PhysicalPlan::Insert { table: table.clone(), columns: columns.clone(), source: source_phys, values: values.clone(), estimate: CostEstimate { cost, cardinality: rows } }
        }
        LogicalPlan::Update { table, assignments, filter } => {
            let filter_phys = filter.as_ref().map(|f| Box::new(lower_to_physical(f, catalog, selector, hints, cost_model)));
            let rows = filter_phys.as_ref().map(|p| p.estimate().cardinality).unwrap_or(0.0);
            let cost = filter_phys.as_ref().map(|p| p.cost()).unwrap_or(0.0) + rows * cost_model.factors.cpu;
            PhysicalPlan::Update { table: table.clone(), assignments: assignments.clone(), filter: filter_phys, estimate: CostEstimate { cost, cardinality: rows } }
        }
        LogicalPlan::Delete { table, filter } => {
            let filter_phys = filter.as_ref().map(|f| Box::new(lower_to_physical(f, catalog, selector, hints, cost_model)));
            let rows = filter_phys.as_ref().map(|p| p.estimate().cardinality).unwrap_or(0.0);
            let cost = filter_phys.as_ref().map(|p| p.cost()).unwrap_or(0.0) + rows * cost_model.factors.cpu;
            PhysicalPlan::Delete { table: table.clone(), filter: filter_phys, estimate: CostEstimate { cost, cardinality: rows } }
        }
    }
}

fn estimate_selection_selectivity(input: &LogicalPlan, conditions: &[OptExpr], catalog: &Catalog) -> f64 {
    if let LogicalPlan::Scan { table, .. } = input {
        let est = CardinalityEstimator::new(catalog);
        let (rows, _) = est.estimate_table_scan(table);
        if rows > 0.0 {
            return (est.estimate_filter(table, rows, conditions) / rows).clamp(0.0, 1.0);
        }
    }
    0.5
}

fn choose_join_algorithm(join_type: JoinType, hints: &OptimizerHints) -> JoinAlgorithm {
    if !hints.merge_join_tables.is_empty() {
        JoinAlgorithm::Merge
    } else if matches!(join_type, JoinType::Cross) {
        JoinAlgorithm::NestedLoop
    } else {
        JoinAlgorithm::Hash
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Column, DataType, Index, TableInfo};
    use crate::catalog::statistics::TableStatistics;

    fn catalog_with_users_and_orders() -> Catalog {
        let catalog = Catalog::new();
        catalog
            .register_table(
                TableInfo::new(
                    "users",
                    vec![
                        Column { name: "id".into(), data_type: DataType::BigInt, nullable: false, default: None },
                        Column { name: "name".into(), data_type: DataType::Varchar(255), nullable: false, default: None },
                        Column { name: "age".into(), data_type: DataType::Integer, nullable: true, default: None },
                    ],
                )
                .with_index(Index::new("pk_users", vec!["id".into()]).primary()),
            )
            .unwrap();
        catalog.refresh_statistics("users", TableStatistics::new(10_000));
        catalog
    }

    #[test]
    fn optimizes_a_simple_projection_with_a_predicate() {
        let catalog = catalog_with_users_and_orders();
        let optimizer = Optimizer::new(catalog);
        let result = optimizer.optimize("SELECT id, name FROM users WHERE age > 25", &CancellationToken::new()).unwrap();
        assert!(result.plan.cost() >= 0.0);
        assert!(result.diagnostics.is_empty());
    }

    #[test]
    fn rejects_show_statements() {
        let catalog = Catalog::new();
        let optimizer = Optimizer::new(catalog);
        let result = optimizer.optimize("SHOW VARIABLES", &CancellationToken::new());
        assert!(matches!(result, Err(OptimizerError::UnsupportedConstruct(_))));
    }

    #[test]
    fn stats_accumulate_across_calls() {
        let catalog = catalog_with_users_and_orders();
        let optimizer = Optimizer::new(catalog);
        optimizer.optimize("SELECT id FROM users", &CancellationToken::new()).unwrap();
        optimizer.optimize("SELECT id FROM users", &CancellationToken::new()).unwrap();
        assert_eq!(optimizer.stats().queries_optimized, 2);
    }

    #[test]
    fn limit_after_order_by_becomes_top_n() {
        let catalog = catalog_with_users_and_orders();
        let optimizer = Optimizer::new(catalog);
        let result = optimizer.optimize("SELECT id FROM users ORDER BY age DESC LIMIT 10", &CancellationToken::new()).unwrap();
        assert!(matches!(result.plan, PhysicalPlan::TopN { .. } | PhysicalPlan::Projection { .. }));
    }
}
