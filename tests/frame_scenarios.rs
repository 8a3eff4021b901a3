mod common;

use common::{departments, employees, random_grouped_table, regional_sales, row};
use lightning_frame::{
    col, lit, AggFunc, BitArray, Column, DataType, ErrorKind, JoinConfig, JoinType, SortColumn,
    StringExpr, Table, Value,
};

#[test]
fn test_left_join_keeps_every_employee() {
    let out = employees().join(&departments(), &["id"], JoinType::Left).unwrap();

    assert_eq!(out.len(), 4);
    assert_eq!(out.columns(), &["id", "name", "dept"]);
    assert_eq!(
        out.column("name").unwrap().to_values(),
        vec![
            Value::from("Alice"),
            Value::from("Bob"),
            Value::from("Charlie"),
            Value::from("Diana")
        ]
    );
    assert_eq!(
        out.column("dept").unwrap().to_values(),
        vec![Value::from("Eng"), Value::from("Mkt"), Value::Null, Value::Null]
    );
}

#[test]
fn test_outer_join_appends_unmatched_right_rows() {
    let out = employees().join(&departments(), &["id"], JoinType::Outer).unwrap();

    assert_eq!(out.len(), 5);
    let last = out.row(4).unwrap();
    assert_eq!(last.get("id"), Some(&Value::Int32(5)));
    assert_eq!(last.get("name"), Some(&Value::Null));
    assert_eq!(last.get("dept"), Some(&Value::from("Sales")));
}

#[test]
fn test_join_suffix_from_config() {
    let left = employees().with_column("dept", Column::from_utf8(vec![Some("x"); 4])).unwrap();
    let config = JoinConfig {
        how: JoinType::Inner,
        suffix: "_dept".to_string(),
    };
    let out = left.join_with(&departments(), &["id"], &config).unwrap();

    assert_eq!(out.columns(), &["id", "name", "dept", "dept_dept"]);
    assert_eq!(out.len(), 2);
}

#[test]
fn test_join_missing_key_reports_side() {
    let err = employees().join(&departments(), &["name"], JoinType::Inner).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ColumnNotFound);
    assert!(err.to_string().contains("right"));
}

#[test]
fn test_group_by_region_sums() {
    let sales = regional_sales();
    let out = sales
        .group_by(&["region"])
        .unwrap()
        .agg(&[("total", col("amount").sum()), ("orders", col("amount").count())])
        .unwrap();

    assert_eq!(out.len(), 2);
    assert_eq!(
        out.column("region").unwrap().to_values(),
        vec![Value::from("East"), Value::from("West")]
    );
    assert_eq!(
        out.column("total").unwrap().to_values(),
        vec![Value::Int32(500), Value::Int32(500)]
    );
    assert_eq!(
        out.column("orders").unwrap().to_values(),
        vec![Value::Int32(3), Value::Int32(2)]
    );
}

#[test]
fn test_group_by_shorthand_and_count() {
    let sales = regional_sales();
    let grouped = sales.group_by(&["region"]).unwrap();

    let means = grouped.agg_shorthand(&[("amount", "mean")]).unwrap();
    assert_eq!(
        means.column("amount").unwrap().to_values(),
        vec![Value::Float64(500.0 / 3.0), Value::Float64(250.0)]
    );

    let counts = grouped.count().unwrap();
    assert_eq!(counts.columns(), &["region", "count"]);
    assert_eq!(
        counts.column("count").unwrap().to_values(),
        vec![Value::Int32(3), Value::Int32(2)]
    );

    let err = grouped.agg_shorthand(&[("amount", "median")]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidOperation);
}

#[test]
fn test_group_by_rejects_row_level_expression() {
    let sales = regional_sales();
    let err = sales
        .group_by(&["region"])
        .unwrap()
        .agg(&[("doubled", col("amount").mul(lit(2)))])
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidOperation);
}

#[test]
fn test_bitmap_counts() {
    let mut bits = BitArray::new(10);
    bits.set(0, true);
    bits.set(5, true);
    bits.set(9, true);

    assert_eq!(bits.count_ones(), 3);
    assert_eq!(bits.count_zeros(), 7);
    assert_eq!(bits.iter_ones().collect::<Vec<_>>(), vec![0, 5, 9]);
    assert_eq!((!&bits).count_ones(), 7);
}

#[test]
fn test_filter_then_sort_pipeline() {
    let sales = regional_sales();
    let out = sales
        .filter(&col("amount").gt(lit(120)).and(col("region").eq(lit("East"))))
        .unwrap()
        .sort_by(&[SortColumn::descending("amount")])
        .unwrap();

    assert_eq!(
        out.column("amount").unwrap().to_values(),
        vec![Value::Int32(250), Value::Int32(150)]
    );
}

#[test]
fn test_derived_columns() {
    let sales = regional_sales()
        .with_column_expr("region_upper", &col("region").upper())
        .unwrap()
        .with_column_expr("taxed", &col("amount").mul(lit(1.5)))
        .unwrap();

    assert_eq!(sales.width(), 4);
    let first = sales.row(0).unwrap();
    assert_eq!(first.get("region_upper"), Some(&Value::from("EAST")));
    assert_eq!(first.get("taxed"), Some(&Value::Float64(150.0)));
    assert_eq!(sales.column("taxed").unwrap().data_type(), DataType::Float64);
}

#[test]
fn test_select_and_slices_share_storage() {
    let table = random_grouped_table(1_000, 10, 7);

    let projected = table.select(&["amount"]).unwrap();
    assert!(table.is_shared("amount").unwrap());
    assert!(!table.is_shared("units").unwrap());

    let head = table.head(100);
    assert_eq!(head.len(), 100);
    let original = table.column("amount").unwrap();
    assert!(head.column("amount").unwrap().column().shares_buffer_with(original.column()));

    let mut owned = projected.clone();
    owned.column_mut("amount").unwrap().set(0, Value::Float64(42.0)).unwrap();
    assert_eq!(owned.column("amount").unwrap().get(0).unwrap(), Value::Float64(42.0));
    assert_eq!(
        projected.column("amount").unwrap().get(0).unwrap(),
        table.column("amount").unwrap().get(0).unwrap()
    );

    let reified = head.reify();
    assert!(!reified
        .column("amount")
        .unwrap()
        .column()
        .shares_buffer_with(original.column()));
}

#[test]
fn test_rows_round_trip_through_json() {
    let table = employees();
    let json: Vec<serde_json::Value> = table.rows().map(|r| r.to_json()).collect();
    assert_eq!(json[0], serde_json::json!({"id": 1, "name": "Alice"}));

    let rows = json
        .iter()
        .map(lightning_frame::Row::from_json)
        .collect::<Result<Vec<_>, _>>()
        .unwrap();
    let rebuilt = Table::from_rows(&rows);
    assert_eq!(rebuilt.dtypes(), table.dtypes());
    assert_eq!(rebuilt.to_rows(), table.to_rows());
}

#[test]
fn test_ragged_rows_fill_nulls() {
    let table = Table::from_rows(&[
        row(&[("a", Value::Int32(1))]),
        row(&[("b", Value::from("x"))]),
    ]);
    assert_eq!(table.columns(), &["a", "b"]);
    assert_eq!(table.column("a").unwrap().null_count(), 1);
    assert_eq!(table.column("b").unwrap().get(0).unwrap(), Value::Null);
}

#[test]
fn test_aggregate_whole_column() {
    let table = random_grouped_table(500, 5, 11);
    let column = table.column("units").unwrap();
    let sum = column.column().aggregate(AggFunc::Sum).unwrap();
    let expected: f64 = column.to_values().iter().filter_map(Value::as_f64).sum();
    assert_eq!(sum, Value::Int32(expected as i32));

    let scalar = col("units").sum().evaluate_scalar(&table).unwrap();
    assert_eq!(scalar, sum);
}
