//! End-to-end scenarios against the public `Optimizer` entry point, one per
//! worked example in the optimizer's test-property notes.

use rusty_optimizer::cancellation::CancellationToken;
use rusty_optimizer::catalog::statistics::{ColumnStatistics, TableStatistics};
use rusty_optimizer::catalog::{Catalog, Column, DataType, Index, TableInfo};
use rusty_optimizer::config::OptimizerConfig;
use rusty_optimizer::error::OptimizerError;
use rusty_optimizer::plan::logical::JoinType;
use rusty_optimizer::plan::physical::PhysicalPlan;
use rusty_optimizer::Optimizer;
use std::time::Duration;

fn users_table() -> TableInfo {
    TableInfo::new(
        "users",
        vec![
            Column { name: "id".into(), data_type: DataType::BigInt, nullable: false, default: None },
            Column { name: "name".into(), data_type: DataType::Varchar(255), nullable: false, default: None },
            Column { name: "age".into(), data_type: DataType::Integer, nullable: true, default: None },
        ],
    )
    .with_index(Index::new("pk_users", vec!["id".into()]).primary())
}

fn collect_table_scans(plan: &PhysicalPlan, out: &mut Vec<String>) {
    match plan {
        PhysicalPlan::TableScan { table, .. } => out.push(table.clone()),
        PhysicalPlan::Selection { input, .. }
        | PhysicalPlan::Projection { input, .. }
        | PhysicalPlan::Limit { input, .. }
        | PhysicalPlan::Sort { input, .. }
        | PhysicalPlan::TopN { input, .. }
        | PhysicalPlan::HashAggregate { input, .. }
        | PhysicalPlan::StreamAggregate { input, .. }
        | PhysicalPlan::Window { input, .. } => collect_table_scans(input, out),
        PhysicalPlan::Join { left, right, .. } => {
            collect_table_scans(left, out);
            collect_table_scans(right, out);
        }
        PhysicalPlan::Union { inputs, .. } => {
            for i in inputs {
                collect_table_scans(i, out);
            }
        }
        PhysicalPlan::Insert { source, .. } => {
            if let Some(s) = source {
                collect_table_scans(s, out);
            }
        }
        PhysicalPlan::Update { filter, .. } | PhysicalPlan::Delete { filter, .. } => {
            if let Some(f) = filter {
                collect_table_scans(f, out);
            }
        }
        PhysicalPlan::EmptyRelation { .. } => {}
    }
}

fn contains_selection(plan: &PhysicalPlan) -> bool {
    match plan {
        PhysicalPlan::Selection { .. } => true,
        PhysicalPlan::Projection { input, .. }
        | PhysicalPlan::Limit { input, .. }
        | PhysicalPlan::Sort { input, .. }
        | PhysicalPlan::TopN { input, .. }
        | PhysicalPlan::HashAggregate { input, .. }
        | PhysicalPlan::StreamAggregate { input, .. }
        | PhysicalPlan::Window { input, .. } => contains_selection(input),
        PhysicalPlan::Join { left, right, .. } => contains_selection(left) || contains_selection(right),
        PhysicalPlan::Union { inputs, .. } => inputs.iter().any(contains_selection),
        _ => false,
    }
}

/// Scenario 1 — predicate pushdown: `age > 25` on an indexed-but-unrelated
/// table should end up as a scan-level predicate with no standalone
/// `Selection` node left above the scan.
#[test]
fn scenario_predicate_pushdown() {
    let catalog = Catalog::new();
    catalog.register_table(users_table()).unwrap();
    catalog.refresh_statistics(
        "users",
        TableStatistics::new(10_000).with_column("age", ColumnStatistics::new(100)),
    );

    let optimizer = Optimizer::new(catalog);
    let result = optimizer
        .optimize("SELECT id, name FROM users WHERE age > 25", &CancellationToken::new())
        .unwrap();

    assert!(!contains_selection(&result.plan), "no Selection node should survive pushdown");
    let mut scans = Vec::new();
    collect_table_scans(&result.plan, &mut scans);
    assert_eq!(scans, vec!["users".to_string()]);
    match &result.plan {
        PhysicalPlan::TableScan { predicates, .. } => assert_eq!(predicates.len(), 1),
        PhysicalPlan::Projection { input, .. } => match input.as_ref() {
            PhysicalPlan::TableScan { predicates, .. } => assert_eq!(predicates.len(), 1),
            other => panic!("expected TableScan under Projection, got {other:?}"),
        },
        other => panic!("expected a TableScan-rooted plan, got {other:?}"),
    }
    assert!(result.plan.estimate().cardinality >= 0.0);
    assert!(result.plan.estimate().cardinality <= 10_000.0);
}

/// Scenario 2 — TopN derivation: `ORDER BY ... LIMIT` over a single table
/// collapses to one `TopN` node, not a separate `Sort` and `Limit`.
#[test]
fn scenario_topn_derivation() {
    let catalog = Catalog::new();
    catalog
        .register_table(TableInfo::new(
            "events",
            vec![
                Column { name: "id".into(), data_type: DataType::BigInt, nullable: false, default: None },
                Column { name: "ts".into(), data_type: DataType::Timestamp, nullable: false, default: None },
            ],
        ))
        .unwrap();
    catalog.refresh_statistics("events", TableStatistics::new(50_000));

    let optimizer = Optimizer::new(catalog);
    let result = optimizer
        .optimize("SELECT id, ts FROM events ORDER BY ts DESC LIMIT 10", &CancellationToken::new())
        .unwrap();

    fn find_topn(plan: &PhysicalPlan) -> Option<&PhysicalPlan> {
        match plan {
            PhysicalPlan::TopN { .. } => Some(plan),
            PhysicalPlan::Projection { input, .. } => find_topn(input),
            _ => None,
        }
    }
    let topn = find_topn(&result.plan).expect("expected a TopN node in the physical plan");
    match topn {
        PhysicalPlan::TopN { limit, input, .. } => {
            assert_eq!(*limit, 10);
            assert!(matches!(input.as_ref(), PhysicalPlan::TableScan { .. }), "no separate Sort/Limit beneath TopN");
        }
        _ => unreachable!(),
    }
}

/// Scenario 3 — MAX/MIN elimination: `SELECT MAX(id)` over an indexed column
/// rewrites to an index-ordered single-row lookup; without the index, it
/// stays a full scan feeding a plain aggregate.
#[test]
fn scenario_max_elimination_requires_an_index() {
    let indexed_catalog = Catalog::new();
    indexed_catalog.register_table(users_table()).unwrap();
    indexed_catalog.refresh_statistics("users", TableStatistics::new(10_000));
    let optimizer = Optimizer::new(indexed_catalog);
    let result = optimizer.optimize("SELECT MAX(id) FROM users", &CancellationToken::new()).unwrap();
    match &result.plan {
        PhysicalPlan::HashAggregate { input, .. } | PhysicalPlan::StreamAggregate { input, .. } => {
            assert!(matches!(input.as_ref(), PhysicalPlan::Limit { .. }), "MAX(id) over an indexed column should lower to a Limit(1) lookup");
        }
        other => panic!("expected an Aggregate-rooted plan, got {other:?}"),
    }

    let unindexed_catalog = Catalog::new();
    unindexed_catalog
        .register_table(TableInfo::new(
            "users",
            vec![Column { name: "id".into(), data_type: DataType::BigInt, nullable: false, default: None }],
        ))
        .unwrap();
    unindexed_catalog.refresh_statistics("users", TableStatistics::new(10_000));
    let optimizer2 = Optimizer::new(unindexed_catalog);
    let result2 = optimizer2.optimize("SELECT MAX(id) FROM users", &CancellationToken::new()).unwrap();
    match &result2.plan {
        PhysicalPlan::HashAggregate { input, .. } | PhysicalPlan::StreamAggregate { input, .. } => {
            assert!(matches!(input.as_ref(), PhysicalPlan::TableScan { .. }), "without an index, MAX(id) should stay a full scan");
        }
        other => panic!("expected an Aggregate-rooted plan, got {other:?}"),
    }
}

/// Scenario 4 — join reorder honoring a LEADING hint: a hinted join order is
/// preserved exactly even when the cost model would otherwise pick a
/// different build side.
#[test]
fn scenario_join_reorder_honors_leading_hint() {
    let catalog = Catalog::new();
    catalog
        .register_table(TableInfo::new(
            "big",
            vec![
                Column { name: "id".into(), data_type: DataType::BigInt, nullable: false, default: None },
                Column { name: "sid".into(), data_type: DataType::BigInt, nullable: false, default: None },
            ],
        ))
        .unwrap();
    catalog
        .register_table(TableInfo::new(
            "small",
            vec![Column { name: "id".into(), data_type: DataType::BigInt, nullable: false, default: None }],
        ))
        .unwrap();
    catalog.refresh_statistics("big", TableStatistics::new(1_000_000));
    catalog.refresh_statistics("small", TableStatistics::new(1_000));

    let optimizer = Optimizer::new(catalog);
    let sql = "SELECT /*+ LEADING(small, big) */ * FROM big JOIN small ON big.sid = small.id";
    let result = optimizer.optimize(sql, &CancellationToken::new()).unwrap();
    assert_eq!(result.hints.leading, vec!["small".to_string(), "big".to_string()]);

    fn find_join(plan: &PhysicalPlan) -> Option<&PhysicalPlan> {
        match plan {
            PhysicalPlan::Join { .. } => Some(plan),
            PhysicalPlan::Projection { input, .. } => find_join(input),
            _ => None,
        }
    }
    let join = find_join(&result.plan).expect("expected a Join node");
    match join {
        PhysicalPlan::Join { left, .. } => {
            assert!(matches!(left.as_ref(), PhysicalPlan::TableScan { table, .. } if table == "small"), "LEADING hint should put `small` on the left");
        }
        _ => unreachable!(),
    }
}

/// Scenario 5 — index advisor basics: a workload that repeatedly filters on
/// one column should surface a recommendation naming that column, with a
/// syntactically sane `CREATE INDEX` statement.
#[test]
fn scenario_advisor_recommends_a_frequently_filtered_column() {
    let catalog = Catalog::new();
    catalog
        .register_table(TableInfo::new(
            "t",
            vec![
                Column { name: "a".into(), data_type: DataType::Integer, nullable: false, default: None },
                Column { name: "b".into(), data_type: DataType::Varchar(50), nullable: false, default: None },
                Column { name: "c".into(), data_type: DataType::Integer, nullable: false, default: None },
            ],
        ))
        .unwrap();
    catalog.refresh_statistics(
        "t",
        TableStatistics::new(200_000).with_column("a", ColumnStatistics::new(1_000)),
    );

    let optimizer = Optimizer::new(catalog);
    let workload = vec![
        "SELECT * FROM t WHERE a = 1".to_string(),
        "SELECT * FROM t WHERE a = 2".to_string(),
        "SELECT * FROM t WHERE b = 'x' ORDER BY c".to_string(),
    ];
    let recs = optimizer.recommend_indexes(&workload, &CancellationToken::new()).unwrap();

    assert!(recs.iter().any(|r| r.table == "t" && r.columns == vec!["a".to_string()]), "expected a recommendation on the high-priority WHERE column `a`: {recs:?}");
    for r in &recs {
        assert!(r.create_statement.starts_with("CREATE"));
        assert!(r.create_statement.contains(&r.table));
        for col in &r.columns {
            assert!(r.create_statement.contains(col));
        }
        assert!((0.0..=1.0).contains(&r.estimated_benefit));
    }
}

/// Scenario 5b — advisor bound: the recommended set respects `max_num_index`
/// even when more candidates would individually pay for themselves.
#[test]
fn scenario_advisor_respects_max_num_index_bound() {
    let catalog = Catalog::new();
    let columns: Vec<Column> = ('a'..='f')
        .map(|c| Column { name: c.to_string(), data_type: DataType::Integer, nullable: false, default: None })
        .collect();
    catalog.register_table(TableInfo::new("wide", columns)).unwrap();
    catalog.refresh_statistics("wide", TableStatistics::new(500_000));

    let mut config = OptimizerConfig::default();
    config.max_num_index = 2;
    config.population_size = 20;
    config.max_generations = 25;

    let catalog2 = catalog.clone();
    let optimizer = Optimizer::with_config(catalog2, config);
    let workload: Vec<String> = ('a'..='f').map(|c| format!("SELECT * FROM wide WHERE {c} = 1")).collect();
    let recs = optimizer.recommend_indexes(&workload, &CancellationToken::new()).unwrap();
    assert!(recs.len() <= 2, "advisor should respect max_num_index=2, got {} recommendations", recs.len());
}

/// Scenario 6 — cancellation: a large join still returns a valid physical
/// plan even when the cancellation token is already tripped before the
/// call starts.
#[test]
fn scenario_cancellation_returns_best_so_far() {
    let catalog = Catalog::new();
    let table_names: Vec<String> = (0..12).map(|i| format!("t{i}")).collect();
    for name in &table_names {
        catalog
            .register_table(TableInfo::new(
                name.clone(),
                vec![Column { name: "id".into(), data_type: DataType::BigInt, nullable: false, default: None }],
            ))
            .unwrap();
        catalog.refresh_statistics(name, TableStatistics::new(1_000));
    }

    let froms = table_names.join(", ");
    let mut conditions = Vec::new();
    for pair in table_names.windows(2) {
        conditions.push(format!("{}.id = {}.id", pair[0], pair[1]));
    }
    let sql = format!("SELECT * FROM {froms} WHERE {}", conditions.join(" AND "));

    let optimizer = Optimizer::new(catalog);
    let token = CancellationToken::new();
    token.cancel();
    let result = optimizer.optimize(&sql, &token).unwrap();

    assert!(result.diagnostics.iter().any(|d| d.kind == "Cancelled"));
    assert!(result.plan.estimate().cardinality >= 0.0, "best-so-far plan must still be a valid physical tree");
}

/// Determinism: optimizing the same statement twice against the same
/// catalog and config produces the same plan shape and cost.
#[test]
fn optimize_is_deterministic_given_fixed_inputs() {
    let catalog = Catalog::new();
    catalog.register_table(users_table()).unwrap();
    catalog.refresh_statistics("users", TableStatistics::new(10_000));

    let optimizer = Optimizer::new(catalog);
    let sql = "SELECT id, name FROM users WHERE age > 25";
    let r1 = optimizer.optimize(sql, &CancellationToken::new()).unwrap();
    let r2 = optimizer.optimize(sql, &CancellationToken::new()).unwrap();
    assert_eq!(r1.plan.cost(), r2.plan.cost());
    assert_eq!(r1.plan.estimate().cardinality, r2.plan.estimate().cardinality);
}

/// Genetic search reproducibility: a fixed seed produces identical
/// recommendations across independent advisor runs.
#[test]
fn genetic_search_is_reproducible_with_a_fixed_seed() {
    let catalog = Catalog::new();
    catalog
        .register_table(TableInfo::new(
            "t",
            vec![
                Column { name: "a".into(), data_type: DataType::Integer, nullable: false, default: None },
                Column { name: "b".into(), data_type: DataType::Integer, nullable: false, default: None },
            ],
        ))
        .unwrap();
    catalog.refresh_statistics("t", TableStatistics::new(100_000));

    let mut config = OptimizerConfig::default();
    config.genetic_seed = 42;
    let workload = vec!["SELECT * FROM t WHERE a = 1".to_string(), "SELECT * FROM t WHERE b = 1".to_string()];

    let opt1 = Optimizer::with_config(catalog.clone(), config.clone());
    let opt2 = Optimizer::with_config(catalog, config);
    let recs1 = opt1.recommend_indexes(&workload, &CancellationToken::new()).unwrap();
    let recs2 = opt2.recommend_indexes(&workload, &CancellationToken::new()).unwrap();

    let cols1: Vec<Vec<String>> = recs1.iter().map(|r| r.columns.clone()).collect();
    let cols2: Vec<Vec<String>> = recs2.iter().map(|r| r.columns.clone()).collect();
    assert_eq!(cols1, cols2, "same seed should produce the same recommended index set");
}

/// SHOW/SET statements are out of this optimizer's scope and should fail
/// with a structured `UnsupportedConstruct` rather than being silently
/// misrouted into a plan.
#[test]
fn show_statements_are_rejected_as_unsupported() {
    let optimizer = Optimizer::new(Catalog::new());
    let result = optimizer.optimize("SHOW VARIABLES", &CancellationToken::new());
    assert!(matches!(result, Err(OptimizerError::UnsupportedConstruct(_))));
}

/// A timeout-bounded token that elapses mid-call still yields a usable plan,
/// not an error — cancellation degrades the result, it does not abort it.
#[test]
fn timeout_token_degrades_gracefully() {
    let catalog = Catalog::new();
    catalog.register_table(users_table()).unwrap();
    catalog.refresh_statistics("users", TableStatistics::new(10_000));
    let optimizer = Optimizer::new(catalog);
    let token = CancellationToken::with_timeout(Duration::from_nanos(1));
    std::thread::sleep(Duration::from_millis(2));
    let result = optimizer.optimize("SELECT id FROM users WHERE age > 25", &token).unwrap();
    assert!(result.plan.estimate().cardinality >= 0.0);
}

/// Join type coverage: a `LEFT OUTER JOIN` plans without error even when no
/// reordering rule applies to outer joins (§4.5 only reorders inner chains).
#[test]
fn left_outer_join_plans_without_reordering() {
    let catalog = Catalog::new();
    catalog
        .register_table(TableInfo::new(
            "orders",
            vec![
                Column { name: "id".into(), data_type: DataType::BigInt, nullable: false, default: None },
                Column { name: "customer_id".into(), data_type: DataType::BigInt, nullable: false, default: None },
            ],
        ))
        .unwrap();
    catalog
        .register_table(TableInfo::new(
            "customers",
            vec![Column { name: "id".into(), data_type: DataType::BigInt, nullable: false, default: None }],
        ))
        .unwrap();
    catalog.refresh_statistics("orders", TableStatistics::new(50_000));
    catalog.refresh_statistics("customers", TableStatistics::new(5_000));

    let optimizer = Optimizer::new(catalog);
    let result = optimizer
        .optimize(
            "SELECT * FROM orders LEFT OUTER JOIN customers ON orders.customer_id = customers.id",
            &CancellationToken::new(),
        )
        .unwrap();

    fn find_join_type(plan: &PhysicalPlan) -> Option<JoinType> {
        match plan {
            PhysicalPlan::Join { join_type, .. } => Some(*join_type),
            PhysicalPlan::Projection { input, .. } => find_join_type(input),
            _ => None,
        }
    }
    assert_eq!(find_join_type(&result.plan), Some(JoinType::LeftOuter));
}
