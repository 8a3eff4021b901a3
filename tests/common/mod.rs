#![allow(dead_code)]

use lightning_frame::{Column, Row, Table, Value};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub fn row(fields: &[(&str, Value)]) -> Row {
    fields.iter().cloned().collect()
}

pub fn employees() -> Table {
    Table::from_rows(&[
        row(&[("id", Value::Int32(1)), ("name", Value::from("Alice"))]),
        row(&[("id", Value::Int32(2)), ("name", Value::from("Bob"))]),
        row(&[("id", Value::Int32(3)), ("name", Value::from("Charlie"))]),
        row(&[("id", Value::Int32(4)), ("name", Value::from("Diana"))]),
    ])
}

pub fn departments() -> Table {
    Table::from_rows(&[
        row(&[("id", Value::Int32(1)), ("dept", Value::from("Eng"))]),
        row(&[("id", Value::Int32(2)), ("dept", Value::from("Mkt"))]),
        row(&[("id", Value::Int32(5)), ("dept", Value::from("Sales"))]),
    ])
}

pub fn regional_sales() -> Table {
    let data = [("East", 100), ("West", 200), ("East", 150), ("West", 300), ("East", 250)];
    Table::from_rows(
        &data
            .iter()
            .map(|(region, amount)| row(&[("region", Value::from(*region)), ("amount", Value::Int32(*amount))]))
            .collect::<Vec<_>>(),
    )
}

/// Deterministic table with `groups` distinct keys, ~5% null values and a
/// secondary int key.
pub fn random_grouped_table(rows: usize, groups: usize, seed: u64) -> Table {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut keys = Vec::with_capacity(rows);
    let mut buckets = Vec::with_capacity(rows);
    let mut amounts = Vec::with_capacity(rows);
    let mut counts = Vec::with_capacity(rows);
    for _ in 0..rows {
        keys.push(Some(format!("key_{:03}", rng.random_range(0..groups))));
        buckets.push(if rng.random_bool(0.02) { None } else { Some(rng.random_range(0..4)) });
        amounts.push(if rng.random_bool(0.05) {
            None
        } else {
            Some(rng.random_range(-1_000.0..1_000.0))
        });
        counts.push(Some(rng.random_range(0..10_000)));
    }
    Table::from_columns(vec![
        ("key", Column::from_utf8(keys)),
        ("bucket", Column::from_i32(buckets)),
        ("amount", Column::from_f64(amounts)),
        ("units", Column::from_i32(counts)),
    ])
    .unwrap()
}

/// Equality with a relative tolerance for floats, exact for everything else.
pub fn values_close(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Float64(x), Value::Float64(y)) => {
            (x.is_nan() && y.is_nan()) || (x - y).abs() <= 1e-5 * x.abs().max(y.abs()).max(1.0)
        }
        _ => a == b,
    }
}

pub fn assert_tables_close(left: &Table, right: &Table) {
    assert_eq!(left.columns(), right.columns());
    assert_eq!(left.len(), right.len());
    for name in left.columns() {
        let l = left.column(name).unwrap().to_values();
        let r = right.column(name).unwrap().to_values();
        for (i, (a, b)) in l.iter().zip(&r).enumerate() {
            assert!(values_close(a, b), "column {} row {}: {} != {}", name, i, a, b);
        }
    }
}
