use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use lightning_frame::{col, lit, Column, JoinType, ParallelConfig, Table};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::hint::black_box;
use std::time::Duration;

fn sales_table(rows: usize, groups: usize) -> Table {
    let mut rng = StdRng::seed_from_u64(7);
    let keys = (0..rows)
        .map(|_| Some(format!("region_{}", rng.random_range(0..groups))))
        .collect();
    let amounts = (0..rows)
        .map(|_| Some(rng.random_range(0.0..10_000.0)))
        .collect();
    let ids = (0..rows).map(|i| Some((i % 50_000) as i32)).collect();
    Table::from_columns(vec![
        ("region", Column::from_utf8(keys)),
        ("amount", Column::from_f64(amounts)),
        ("customer_id", Column::from_i32(ids)),
    ])
    .unwrap()
}

fn bench_filter(c: &mut Criterion) {
    let mut group = c.benchmark_group("filter");

    for size in [10_000, 100_000, 1_000_000].iter() {
        let table = sales_table(*size, 100);
        let predicate = col("amount").gt(lit(5_000.0));
        group.throughput(Throughput::Elements(*size as u64));
        group.bench_with_input(BenchmarkId::new("amount_gt_literal", size), &table, |b, t| {
            b.iter(|| black_box(t.filter(black_box(&predicate)).unwrap()));
        });
    }

    group.finish();
}

fn bench_group_by(c: &mut Criterion) {
    let mut group = c.benchmark_group("group_by");
    group.measurement_time(Duration::from_secs(10));

    let aggs = [
        ("total", col("amount").sum()),
        ("avg", col("amount").mean()),
        ("orders", col("amount").count()),
    ];
    let parallel = ParallelConfig {
        threshold_rows: 0,
        ..ParallelConfig::default()
    };

    for size in [100_000, 1_000_000].iter() {
        let table = sales_table(*size, 1_000);
        group.throughput(Throughput::Elements(*size as u64));

        group.bench_with_input(BenchmarkId::new("sync", size), &table, |b, t| {
            b.iter(|| black_box(t.group_by(&["region"]).unwrap().agg(&aggs).unwrap()));
        });

        group.bench_with_input(BenchmarkId::new("parallel", size), &table, |b, t| {
            b.iter(|| {
                black_box(
                    t.group_by(&["region"])
                        .unwrap()
                        .agg_parallel(&aggs, &parallel)
                        .unwrap(),
                )
            });
        });
    }

    group.finish();
}

fn bench_join(c: &mut Criterion) {
    let mut group = c.benchmark_group("join");

    let customers = Table::from_columns(vec![
        ("customer_id", Column::from_i32((0..50_000).map(Some).collect())),
        (
            "tier",
            Column::from_utf8((0..50_000).map(|i| Some(format!("tier_{}", i % 5))).collect()),
        ),
    ])
    .unwrap();

    for size in [10_000, 100_000].iter() {
        let orders = sales_table(*size, 100);
        group.throughput(Throughput::Elements(*size as u64));
        for how in [JoinType::Inner, JoinType::Left] {
            group.bench_with_input(BenchmarkId::new(how.to_string(), size), &orders, |b, t| {
                b.iter(|| black_box(t.join(&customers, &["customer_id"], how).unwrap()));
            });
        }
    }

    group.finish();
}

criterion_group!(benches, bench_filter, bench_group_by, bench_join);
criterion_main!(benches);
