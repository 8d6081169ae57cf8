// Optimizer Pipeline Performance Benchmarks
// Covers cost-model micro-benchmarks and full end-to-end Optimize calls
// across a handful of representative query shapes.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rusty_optimizer::cancellation::CancellationToken;
use rusty_optimizer::catalog::statistics::TableStatistics;
use rusty_optimizer::catalog::{Catalog, Column, DataType, Index, TableInfo};
use rusty_optimizer::config::CostFactors;
use rusty_optimizer::cost::CostModel;
use rusty_optimizer::plan::logical::JoinType;
use rusty_optimizer::Optimizer;

fn setup_test_catalog() -> Catalog {
    let catalog = Catalog::new();

    catalog
        .register_table(
            TableInfo::new(
                "employees",
                vec![
                    Column { name: "id".to_string(), data_type: DataType::BigInt, nullable: false, default: None },
                    Column { name: "name".to_string(), data_type: DataType::Varchar(100), nullable: false, default: None },
                    Column { name: "department_id".to_string(), data_type: DataType::BigInt, nullable: false, default: None },
                    Column { name: "salary".to_string(), data_type: DataType::Integer, nullable: false, default: None },
                    Column { name: "hire_date".to_string(), data_type: DataType::Date, nullable: false, default: None },
                ],
            )
            .with_index(Index::new("pk_employees", vec!["id".to_string()]).primary()),
        )
        .ok();
    catalog.refresh_statistics("employees", TableStatistics::new(500_000));

    catalog
        .register_table(
            TableInfo::new(
                "departments",
                vec![
                    Column { name: "id".to_string(), data_type: DataType::BigInt, nullable: false, default: None },
                    Column { name: "name".to_string(), data_type: DataType::Varchar(100), nullable: false, default: None },
                ],
            )
            .with_index(Index::new("pk_departments", vec!["id".to_string()]).primary()),
        )
        .ok();
    catalog.refresh_statistics("departments", TableStatistics::new(200));

    catalog
}

fn bench_scan_cost(c: &mut Criterion) {
    let model = CostModel::new(CostFactors::default());

    c.bench_function("scan_cost_full", |b| {
        b.iter(|| black_box(model.scan(black_box(500_000.0), false, 1.0)));
    });

    c.bench_function("scan_cost_indexed", |b| {
        b.iter(|| black_box(model.scan(black_box(500_000.0), true, 0.001)));
    });
}

fn bench_join_cost(c: &mut Criterion) {
    let mut group = c.benchmark_group("hash_join_cost");
    let model = CostModel::new(CostFactors::default());

    for (i, (left, right)) in [(1_000.0, 1_000.0), (100_000.0, 1_000.0), (500_000.0, 500_000.0)].into_iter().enumerate() {
        group.bench_with_input(BenchmarkId::from_parameter(i), &(left, right), |b, &(l, r)| {
            b.iter(|| black_box(model.hash_join(black_box(l), black_box(r), JoinType::Inner)));
        });
    }

    group.finish();
}

fn bench_end_to_end_optimize(c: &mut Criterion) {
    let catalog = setup_test_catalog();
    let optimizer = Optimizer::new(catalog);

    c.bench_function("optimize_simple_select", |b| {
        b.iter(|| {
            let token = CancellationToken::new();
            let result = optimizer.optimize(black_box("SELECT id, name FROM employees WHERE salary > 50000"), &token);
            black_box(result.ok());
        });
    });

    c.bench_function("optimize_join", |b| {
        b.iter(|| {
            let token = CancellationToken::new();
            let sql = "SELECT e.name, d.name FROM employees e JOIN departments d ON e.department_id = d.id WHERE e.salary > 50000";
            let result = optimizer.optimize(black_box(sql), &token);
            black_box(result.ok());
        });
    });

    c.bench_function("optimize_top_n", |b| {
        b.iter(|| {
            let token = CancellationToken::new();
            let sql = "SELECT * FROM employees ORDER BY salary DESC LIMIT 10";
            let result = optimizer.optimize(black_box(sql), &token);
            black_box(result.ok());
        });
    });
}

fn bench_advisor(c: &mut Criterion) {
    let catalog = setup_test_catalog();
    let optimizer = Optimizer::new(catalog);
    let workload = vec![
        "SELECT * FROM employees WHERE department_id = 1".to_string(),
        "SELECT * FROM employees WHERE salary > 100000".to_string(),
        "SELECT * FROM employees WHERE department_id = 2 AND salary > 80000".to_string(),
    ];

    c.bench_function("recommend_indexes_small_workload", |b| {
        b.iter(|| {
            let token = CancellationToken::new();
            black_box(optimizer.recommend_indexes(black_box(&workload), &token).ok());
        });
    });
}

criterion_group!(benches, bench_scan_cost, bench_join_cost, bench_end_to_end_optimize, bench_advisor);
criterion_main!(benches);
