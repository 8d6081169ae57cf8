//! Index advisor: mines a query workload for index candidates, scores each
//! one's benefit under a hypothetical catalog, and runs a genetic search
//! over the candidate powerset to pick a recommended set.

pub mod genetic;

use crate::cancellation::CancellationToken;
use crate::catalog::statistics::DEFAULT_ROW_COUNT;
use crate::catalog::{Catalog, Index, TableInfo};
use crate::config::OptimizerConfig;
use crate::cost::cardinality::CardinalityEstimator;
use crate::cost::CostModel;
use crate::expression::Expr;
use crate::hints::OptimizerHints;
use crate::plan::logical::LogicalPlan;
use parking_lot::RwLock;
use rayon::prelude::*;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU32, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CandidateSource {
    Where,
    Join,
    GroupBy,
    OrderBy,
    FullText,
    Spatial,
}

impl CandidateSource {
    fn priority(self) -> u8 {
        match self {
            CandidateSource::Where => 4,
            CandidateSource::Join => 3,
            CandidateSource::GroupBy => 2,
            CandidateSource::OrderBy => 1,
            CandidateSource::FullText | CandidateSource::Spatial => 4,
        }
    }

    fn clause_name(self) -> &'static str {
        match self {
            CandidateSource::Where => "a WHERE predicate",
            CandidateSource::Join => "a JOIN condition",
            CandidateSource::GroupBy => "a GROUP BY list",
            CandidateSource::OrderBy => "an ORDER BY list",
            CandidateSource::FullText => "a full-text search predicate",
            CandidateSource::Spatial => "a spatial predicate",
        }
    }
}

#[derive(Debug, Clone)]
pub struct IndexCandidate {
    pub table: String,
    pub columns: Vec<String>,
    pub source: CandidateSource,
    pub priority: u8,
    pub unique: bool,
}

fn candidate(table: &str, columns: Vec<String>, source: CandidateSource) -> IndexCandidate {
    IndexCandidate { table: table.to_string(), columns, priority: source.priority(), source, unique: false }
}

/// Walk a (post-rewrite) logical plan and collect raw index candidates from
/// every predicate/grouping/ordering clause it contains.
pub fn extract_candidates(plan: &LogicalPlan, out: &mut Vec<IndexCandidate>) {
    match plan {
        LogicalPlan::Scan { table, pushdown, .. } => {
            for p in &pushdown.predicates {
                collect_predicate_candidates(table, p, CandidateSource::Where, out);
            }
        }
        LogicalPlan::Selection { input, conditions } => {
            if let Some(table) = base_table(input) {
                for c in conditions {
                    collect_predicate_candidates(&table, c, CandidateSource::Where, out);
                }
            }
            extract_candidates(input, out);
        }
        LogicalPlan::Join { left, right, conditions, .. } => {
            for c in conditions {
                collect_join_side_candidate(left, &c.left, out);
                collect_join_side_candidate(right, &c.right, out);
            }
            extract_candidates(left, out);
            extract_candidates(right, out);
        }
        LogicalPlan::Aggregate { input, group_by, .. } => {
            if let Some(table) = base_table(input) {
                let cols = columns_of(group_by);
                if !cols.is_empty() {
                    out.push(candidate(&table, cols, CandidateSource::GroupBy));
                }
            }
            extract_candidates(input, out);
        }
        LogicalPlan::Sort { input, items } => {
            if let Some(table) = base_table(input) {
                let cols = columns_of(&items.iter().map(|i| i.expr.clone()).collect::<Vec<_>>());
                if !cols.is_empty() {
                    out.push(candidate(&table, cols, CandidateSource::OrderBy));
                }
            }
            extract_candidates(input, out);
        }
        LogicalPlan::TopN { input, items, .. } => {
            if let Some(table) = base_table(input) {
                let cols = columns_of(&items.iter().map(|i| i.expr.clone()).collect::<Vec<_>>());
                if !cols.is_empty() {
                    out.push(candidate(&table, cols, CandidateSource::OrderBy));
                }
            }
            extract_candidates(input, out);
        }
        LogicalPlan::Projection { input, .. } | LogicalPlan::Limit { input, .. } | LogicalPlan::Window { input, .. } => {
            extract_candidates(input, out);
        }
        LogicalPlan::Union { inputs, .. } => {
            for i in inputs {
                extract_candidates(i, out);
            }
        }
        LogicalPlan::Insert { source, .. } => {
            if let Some(s) = source {
                extract_candidates(s, out);
            }
        }
        LogicalPlan::Update { filter, .. } | LogicalPlan::Delete { filter, .. } => {
            if let Some(f) = filter {
                extract_candidates(f, out);
            }
        }
        LogicalPlan::Dual | LogicalPlan::EmptyRelation { .. } => {}
    }
}

/// The table a grouping/ordering clause's columns are drawn from, when the
/// plan below is a single-table chain. Ambiguous (multi-table) subtrees are
/// skipped rather than guessed at.
fn base_table(plan: &LogicalPlan) -> Option<String> {
    match plan {
        LogicalPlan::Scan { table, .. } => Some(table.clone()),
        LogicalPlan::Selection { input, .. }
        | LogicalPlan::Projection { input, .. }
        | LogicalPlan::Limit { input, .. }
        | LogicalPlan::Sort { input, .. }
        | LogicalPlan::TopN { input, .. }
        | LogicalPlan::Window { input, .. } => base_table(input),
        _ => None,
    }
}

fn columns_of(exprs: &[Expr]) -> Vec<String> {
    let mut cols = Vec::new();
    for e in exprs {
        e.referenced_columns(&mut cols);
    }
    cols
}

fn collect_join_side_candidate(side: &LogicalPlan, expr: &Expr, out: &mut Vec<IndexCandidate>) {
    if let (Some(table), Expr::Column { name, .. }) = (base_table(side), expr) {
        out.push(candidate(&table, vec![name.clone()], CandidateSource::Join));
    }
}

const FULL_TEXT_FUNCTIONS: &[&str] = &["match_against", "contains", "full_text_search"];
const SPATIAL_FUNCTIONS: &[&str] = &["st_within", "st_distance", "st_intersects"];

fn collect_predicate_candidates(table: &str, expr: &Expr, source: CandidateSource, out: &mut Vec<IndexCandidate>) {
    match expr {
        Expr::BinaryOp { left, op: crate::expression::Operator::Logical(_), right } => {
            collect_predicate_candidates(table, left, source, out);
            collect_predicate_candidates(table, right, source, out);
        }
        Expr::BinaryOp { left, .. } => {
            let mut cols = Vec::new();
            left.referenced_columns(&mut cols);
            if !cols.is_empty() {
                out.push(candidate(table, cols, source));
            }
        }
        Expr::Between { expr, .. } | Expr::IsNull { expr, .. } | Expr::InList { expr, .. } => {
            let mut cols = Vec::new();
            expr.referenced_columns(&mut cols);
            if !cols.is_empty() {
                out.push(candidate(table, cols, source));
            }
        }
        Expr::Function { name, args, .. } => {
            let lname = name.to_ascii_lowercase();
            let special = if FULL_TEXT_FUNCTIONS.contains(&lname.as_str()) {
                Some(CandidateSource::FullText)
            } else if SPATIAL_FUNCTIONS.contains(&lname.as_str()) {
                Some(CandidateSource::Spatial)
            } else {
                None
            };
            if let Some(special_source) = special {
                if let Some(Expr::Column { name: col, .. }) = args.first() {
                    out.push(candidate(table, vec![col.clone()], special_source));
                }
            }
        }
        _ => {}
    }
}

fn dedup_and_filter(mut candidates: Vec<IndexCandidate>, catalog: &Catalog) -> Vec<IndexCandidate> {
    let mut seen: HashSet<(String, Vec<String>)> = HashSet::new();
    candidates.retain(|c| {
        if c.columns.is_empty() {
            return false;
        }
        let Ok(info) = catalog.get_table(&c.table) else { return false };
        let indexable = c.columns.iter().all(|col| info.get_column(col).map(|column| column.data_type.is_indexable()).unwrap_or(false));
        if !indexable && !matches!(c.source, CandidateSource::FullText | CandidateSource::Spatial) {
            return false;
        }
        seen.insert((c.table.clone(), c.columns.clone()))
    });
    candidates.sort_by(|a, b| b.priority.cmp(&a.priority));
    candidates
}

#[derive(Debug, Clone)]
pub struct HypotheticalIndexStats {
    pub ndv: f64,
    pub selectivity: f64,
    pub estimated_size_bytes: u64,
    pub null_fraction: f64,
    pub correlation: f64,
}

fn derive_stats(table: &str, columns: &[String], catalog: &Catalog) -> HypotheticalIndexStats {
    let stats = catalog.get_statistics(table);
    let row_count = stats.as_ref().map(|s| s.row_count).unwrap_or(DEFAULT_ROW_COUNT) as f64;

    let known_ndv = columns
        .iter()
        .filter_map(|c| stats.as_ref().and_then(|s| s.column(c)).map(|cs| cs.distinct_count as f64))
        .fold(f64::INFINITY, f64::min);
    let ndv = if known_ndv.is_finite() {
        known_ndv
    } else {
        (row_count / row_count.max(2.0).log10()).max(1.0)
    };

    let null_fraction = columns
        .iter()
        .filter_map(|c| stats.as_ref().and_then(|s| s.column(c)))
        .map(|cs| cs.null_count as f64 / row_count.max(1.0))
        .fold(0.0, f64::max);

    HypotheticalIndexStats {
        ndv,
        selectivity: (1.0 / ndv.max(1.0)).clamp(1e-4, 1.0),
        estimated_size_bytes: (row_count * columns.len() as f64 * 8.0) as u64,
        null_fraction,
        correlation: 0.0,
    }
}

fn with_hypothetical(catalog: &Catalog, candidate: &IndexCandidate) -> Catalog {
    let temp = Catalog::new();
    if let Ok(mut info) = catalog.get_table(&candidate.table) {
        let name = format!("hyp_{}_{}", candidate.table, candidate.columns.join("_"));
        let mut index = Index::new(name, candidate.columns.clone());
        if candidate.unique {
            index = index.unique();
        }
        info.indexes.push(index);
        let table_name = info.name.clone();
        let _ = temp.register_table(info);
        if let Some(stats) = catalog.get_statistics(&table_name) {
            temp.refresh_statistics(&table_name, stats);
        }
    }
    temp
}

fn collect_scan_context(plan: &LogicalPlan, table: &str, predicates: &mut Vec<Expr>, required: &mut Vec<String>) {
    match plan {
        LogicalPlan::Scan { table: t, pushdown, columns, .. } if t == table => {
            predicates.extend(pushdown.predicates.iter().cloned());
            required.extend(columns.iter().map(|c| c.name.clone()));
        }
        LogicalPlan::Selection { input, conditions } => {
            if matches!(input.as_ref(), LogicalPlan::Scan { table: t, .. } if t == table) {
                predicates.extend(conditions.iter().cloned());
            }
            collect_scan_context(input, table, predicates, required);
        }
        _ => {
            for child in plan.children() {
                collect_scan_context(child, table, predicates, required);
            }
        }
    }
}

/// Benefit of a candidate index, expressed as a fraction of baseline scan
/// cost saved across the workload's scans of its table.
fn estimate_benefit(catalog: &Catalog, cost_model: &CostModel, candidate: &IndexCandidate, workload: &[LogicalPlan]) -> f64 {
    use crate::index_selector::IndexSelector;

    let mut predicates = Vec::new();
    let mut required = Vec::new();
    for plan in workload {
        collect_scan_context(plan, &candidate.table, &mut predicates, &mut required);
    }
    if predicates.is_empty() && required.is_empty() {
        return 0.0;
    }

    let est = CardinalityEstimator::new(catalog);
    let (table_rows, _) = est.estimate_table_scan(&candidate.table);
    let filtered_rows = est.estimate_filter(&candidate.table, table_rows, &predicates);
    let selectivity = if table_rows > 0.0 { (filtered_rows / table_rows).clamp(0.0, 1.0) } else { 1.0 };

    let no_hints = OptimizerHints::default();
    let baseline_selector = IndexSelector::new(catalog);
    let baseline_choice = baseline_selector.select(&candidate.table, &predicates, &required, &no_hints);
    let baseline_cost = cost_model.scan(table_rows, baseline_choice.index_name.is_some(), selectivity);

    let hypothetical_catalog = with_hypothetical(catalog, candidate);
    let hypothetical_selector = IndexSelector::new(&hypothetical_catalog);
    let hypothetical_choice = hypothetical_selector.select(&candidate.table, &predicates, &required, &no_hints);
    let hypothetical_cost = cost_model.scan(table_rows, hypothetical_choice.index_name.is_some(), selectivity);

    if baseline_cost <= 0.0 {
        return 0.0;
    }
    ((baseline_cost - hypothetical_cost) / baseline_cost).clamp(0.0, 1.0)
}

#[derive(Debug, Clone)]
pub struct IndexRecommendation {
    pub table: String,
    pub columns: Vec<String>,
    pub reason: String,
    pub create_statement: String,
    pub estimated_benefit: f64,
    pub estimated_size_bytes: u64,
}

fn build_recommendation(candidate: &IndexCandidate, benefit: f64, stats: &HypotheticalIndexStats) -> IndexRecommendation {
    let index_name = format!("idx_{}_{}", candidate.table, candidate.columns.join("_"));
    let create_statement = format!(
        "CREATE {}INDEX {} ON {} ({})",
        if candidate.unique { "UNIQUE " } else { "" },
        index_name,
        candidate.table,
        candidate.columns.join(", "),
    );
    let reason = format!(
        "column{} {} referenced in {} (priority {})",
        if candidate.columns.len() > 1 { "s" } else { "" },
        candidate.columns.join(", "),
        candidate.source.clause_name(),
        candidate.priority,
    );
    IndexRecommendation {
        table: candidate.table.clone(),
        columns: candidate.columns.clone(),
        reason,
        create_statement,
        estimated_benefit: benefit,
        estimated_size_bytes: stats.estimated_size_bytes,
    }
}

/// Orchestrates candidate mining, hypothetical what-if costing, and the
/// genetic search, for one workload snapshot.
pub struct IndexAdvisor<'a> {
    catalog: &'a Catalog,
    config: &'a OptimizerConfig,
}

impl<'a> IndexAdvisor<'a> {
    pub fn new(catalog: &'a Catalog, config: &'a OptimizerConfig) -> Self {
        Self { catalog, config }
    }

    /// Mine `workload` (already lowered and rule-rewritten logical plans)
    /// for index candidates, evaluate each one's benefit, and run the
    /// genetic search to choose a recommended subset.
    pub fn recommend(&self, workload: &[LogicalPlan], token: &CancellationToken) -> Vec<IndexRecommendation> {
        let mut raw = Vec::new();
        for plan in workload {
            extract_candidates(plan, &mut raw);
        }
        let candidates = dedup_and_filter(raw, self.catalog);
        if candidates.is_empty() {
            return Vec::new();
        }

        let cost_model = CostModel::new(self.config.cost_factors);
        let evaluated: Vec<(f64, HypotheticalIndexStats)> = candidates
            .par_iter()
            .map(|c| {
                let stats = derive_stats(&c.table, &c.columns, self.catalog);
                let benefit = estimate_benefit(self.catalog, &cost_model, c, workload);
                (benefit, stats)
            })
            .collect();

        let benefits: Vec<f64> = evaluated.iter().map(|(b, _)| *b).collect();
        let sizes: Vec<u64> = evaluated.iter().map(|(_, s)| s.estimated_size_bytes).collect();
        let columns_len: Vec<usize> = candidates.iter().map(|c| c.columns.len()).collect();

        let params = genetic::GeneticParams {
            benefits: &benefits,
            sizes: &sizes,
            columns_len: &columns_len,
            max_num_index: self.config.max_num_index,
            max_total_size_bytes: self.config.max_total_size_bytes,
            max_index_columns: self.config.max_index_columns,
            population_size: self.config.population_size,
            max_generations: self.config.max_generations,
            mutation_rate: self.config.mutation_rate,
            crossover_rate: self.config.crossover_rate,
            convergence_generations: self.config.convergence_generations,
            convergence_ratio: self.config.convergence_ratio,
            selection_strategy: self.config.selection_strategy,
            elite_count: self.config.elite_count,
            seed: self.config.genetic_seed,
        };
        let best = genetic::search(&params, token);

        best.genes
            .iter()
            .enumerate()
            .filter(|(_, &on)| on)
            .map(|(i, _)| build_recommendation(&candidates[i], benefits[i], &evaluated[i].1))
            .collect()
    }
}

pub type HypotheticalIndexId = u32;

#[derive(Debug, Clone)]
pub struct HypotheticalIndex {
    pub id: HypotheticalIndexId,
    pub table: String,
    pub columns: Vec<String>,
    pub unique: bool,
}

/// Installed hypothetical indexes, visible through the
/// `hypothetical_indexes` system view until explicitly cleared. Concurrent
/// reads and a single writer lock, matching the catalog's own discipline.
pub struct HypotheticalIndexStore {
    indexes: RwLock<HashMap<HypotheticalIndexId, (HypotheticalIndex, HypotheticalIndexStats)>>,
    next_id: AtomicU32,
}

impl HypotheticalIndexStore {
    pub fn new() -> Self {
        Self { indexes: RwLock::new(HashMap::new()), next_id: AtomicU32::new(1) }
    }

    pub fn add(&self, catalog: &Catalog, table: &str, columns: Vec<String>, unique: bool) -> HypotheticalIndexId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let stats = derive_stats(table, &columns, catalog);
        let entry = HypotheticalIndex { id, table: table.to_string(), columns, unique };
        self.indexes.write().insert(id, (entry, stats));
        id
    }

    pub fn get_all(&self) -> Vec<(HypotheticalIndex, HypotheticalIndexStats)> {
        self.indexes.read().values().cloned().collect()
    }

    pub fn get_for_table(&self, table: &str) -> Vec<(HypotheticalIndex, HypotheticalIndexStats)> {
        self.indexes.read().values().filter(|(ix, _)| ix.table == table).cloned().collect()
    }

    pub fn clear(&self) {
        self.indexes.write().clear();
    }
}

impl Default for HypotheticalIndexStore {
    fn default() -> Self {
        Self::new()
    }
}

/// The `index_advisor_results` system view: the latest recommendation run,
/// replaced wholesale on every `recommend` call.
pub struct AdvisorResults {
    recommendations: RwLock<Vec<IndexRecommendation>>,
}

impl AdvisorResults {
    pub fn new() -> Self {
        Self { recommendations: RwLock::new(Vec::new()) }
    }

    pub fn record(&self, recommendations: Vec<IndexRecommendation>) {
        *self.recommendations.write() = recommendations;
    }

    pub fn all(&self) -> Vec<IndexRecommendation> {
        self.recommendations.read().clone()
    }

    pub fn top_k_by_benefit(&self, k: usize) -> Vec<IndexRecommendation> {
        let mut recs = self.recommendations.read().clone();
        recs.sort_by(|a, b| b.estimated_benefit.partial_cmp(&a.estimated_benefit).unwrap_or(std::cmp::Ordering::Equal));
        recs.truncate(k);
        recs
    }

    pub fn filter(&self, predicate: impl Fn(&IndexRecommendation) -> bool) -> Vec<IndexRecommendation> {
        self.recommendations.read().iter().filter(|r| predicate(r)).cloned().collect()
    }
}

impl Default for AdvisorResults {
    fn default() -> Self {
        Self::new()
    }
}

/// The `schema_unused_indexes` system view: real indexes a workload never
/// touched, tracked by last-use timestamp (unix seconds) supplied by the
/// caller, since this crate has no clock of its own.
pub struct UnusedIndexTracker {
    usage: RwLock<HashMap<String, (String, Vec<String>, Option<u64>, u64)>>,
}

impl UnusedIndexTracker {
    pub fn new() -> Self {
        Self { usage: RwLock::new(HashMap::new()) }
    }

    pub fn record_usage(&self, table: &str, index_name: &str, columns: Vec<String>, used_at: u64, size_bytes: u64) {
        self.usage.write().insert(index_name.to_string(), (table.to_string(), columns, Some(used_at), size_bytes));
    }

    pub fn register_index(&self, table: &str, info: &TableInfo) {
        let mut usage = self.usage.write();
        for ix in &info.indexes {
            usage.entry(ix.name.clone()).or_insert_with(|| (table.to_string(), ix.columns.clone(), None, 0));
        }
    }

    pub fn unused_since(&self, cutoff: u64) -> Vec<(String, String, Vec<String>, u64)> {
        self.usage
            .read()
            .iter()
            .filter(|(_, (_, _, last_used, _))| last_used.map(|t| t < cutoff).unwrap_or(true))
            .map(|(name, (table, columns, _, size))| (name.clone(), table.clone(), columns.clone(), *size))
            .collect()
    }
}

impl Default for UnusedIndexTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Column, DataType};
    use crate::catalog::statistics::{ColumnStatistics, TableStatistics};
    use crate::common::Value;
    use crate::plan::logical::ScanPushdown;

    fn orders_catalog() -> Catalog {
        let catalog = Catalog::new();
        catalog
            .register_table(TableInfo::new(
                "orders",
                vec![
                    Column { name: "id".into(), data_type: DataType::BigInt, nullable: false, default: None },
                    Column { name: "customer_id".into(), data_type: DataType::Integer, nullable: false, default: None },
                    Column { name: "status".into(), data_type: DataType::Varchar(20), nullable: false, default: None },
                ],
            ))
            .unwrap();
        catalog.refresh_statistics(
            "orders",
            TableStatistics::new(100_000).with_column("customer_id", ColumnStatistics::new(5_000)),
        );
        catalog
    }

    fn scan_with_predicate() -> LogicalPlan {
        LogicalPlan::Scan {
            table_id: 1,
            table: "orders".into(),
            columns: vec![Column { name: "customer_id".into(), data_type: DataType::Integer, nullable: false, default: None }],
            pushdown: ScanPushdown {
                predicates: vec![Expr::column("customer_id").eq(Expr::lit(Value::Int(7)))],
                limit: None,
                offset: None,
            },
        }
    }

    #[test]
    fn extracts_a_where_candidate_from_a_pushed_down_predicate() {
        let mut out = Vec::new();
        extract_candidates(&scan_with_predicate(), &mut out);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].table, "orders");
        assert_eq!(out[0].columns, vec!["customer_id".to_string()]);
        assert_eq!(out[0].source, CandidateSource::Where);
    }

    #[test]
    fn recommend_surfaces_a_recommendation_for_a_frequently_filtered_column() {
        let catalog = orders_catalog();
        let config = OptimizerConfig::default();
        let advisor = IndexAdvisor::new(&catalog, &config);
        let workload = vec![scan_with_predicate(), scan_with_predicate(), scan_with_predicate()];
        let recs = advisor.recommend(&workload, &CancellationToken::new());
        assert!(recs.iter().any(|r| r.columns == vec!["customer_id".to_string()]));
    }

    #[test]
    fn unused_index_tracker_reports_never_used_indexes() {
        let tracker = UnusedIndexTracker::new();
        let info = TableInfo::new("orders", vec![]).with_index(Index::new("idx_status", vec!["status".into()]));
        tracker.register_index("orders", &info);
        let unused = tracker.unused_since(0);
        assert_eq!(unused.len(), 1);
        assert_eq!(unused[0].0, "idx_status");
    }

    #[test]
    fn hypothetical_index_store_add_and_clear() {
        let catalog = orders_catalog();
        let store = HypotheticalIndexStore::new();
        let id = store.add(&catalog, "orders", vec!["status".into()], false);
        assert_eq!(store.get_all().len(), 1);
        assert_eq!(store.get_for_table("orders").len(), 1);
        assert!(store.get_for_table("orders")[0].0.id == id);
        store.clear();
        assert!(store.get_all().is_empty());
    }

    #[test]
    fn advisor_results_top_k_orders_by_benefit() {
        let results = AdvisorResults::new();
        results.record(vec![
            IndexRecommendation {
                table: "t".into(),
                columns: vec!["a".into()],
                reason: "x".into(),
                create_statement: "CREATE INDEX i1 ON t (a)".into(),
                estimated_benefit: 0.2,
                estimated_size_bytes: 100,
            },
            IndexRecommendation {
                table: "t".into(),
                columns: vec!["b".into()],
                reason: "x".into(),
                create_statement: "CREATE INDEX i2 ON t (b)".into(),
                estimated_benefit: 0.8,
                estimated_size_bytes: 100,
            },
        ]);
        let top = results.top_k_by_benefit(1);
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].columns, vec!["b".to_string()]);
    }
}
