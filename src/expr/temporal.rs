//! Date part extraction. Dates are milliseconds since the epoch in UTC.

use chrono::{DateTime, Datelike, Timelike, Utc};

use super::{DatePart, Expr};
use crate::column::{Column, ColumnData};
use crate::value::DataType;
use crate::{Error, Result};

pub trait TemporalExpr {
    fn year(self) -> Expr;
    fn month(self) -> Expr;
    fn day(self) -> Expr;
    /// 0 = Sunday.
    fn weekday(self) -> Expr;
    fn hour(self) -> Expr;
    fn minute(self) -> Expr;
    fn second(self) -> Expr;
}

fn part(expr: Expr, part: DatePart) -> Expr {
    Expr::Temporal {
        part,
        expr: Box::new(expr),
    }
}

impl TemporalExpr for Expr {
    fn year(self) -> Expr {
        part(self, DatePart::Year)
    }

    fn month(self) -> Expr {
        part(self, DatePart::Month)
    }

    fn day(self) -> Expr {
        part(self, DatePart::Day)
    }

    fn weekday(self) -> Expr {
        part(self, DatePart::Weekday)
    }

    fn hour(self) -> Expr {
        part(self, DatePart::Hour)
    }

    fn minute(self) -> Expr {
        part(self, DatePart::Minute)
    }

    fn second(self) -> Expr {
        part(self, DatePart::Second)
    }
}

fn extract(part: DatePart, dt: DateTime<Utc>) -> i32 {
    match part {
        DatePart::Year => dt.year(),
        DatePart::Month => dt.month() as i32,
        DatePart::Day => dt.day() as i32,
        DatePart::Weekday => dt.weekday().num_days_from_sunday() as i32,
        DatePart::Hour => dt.hour() as i32,
        DatePart::Minute => dt.minute() as i32,
        DatePart::Second => dt.second() as i32,
    }
}

pub(super) fn apply(part: DatePart, column: &Column) -> Result<Column> {
    if column.null_count() == column.len() {
        return Ok(Column::nulls(DataType::Int32, column.len()));
    }
    let ColumnData::Date(values) = column.data() else {
        return Err(Error::TypeMismatch(format!(
            "{:?} requires a date operand, found {}",
            part,
            column.data_type()
        )));
    };
    Ok(Column::from_i32(
        values
            .iter()
            .enumerate()
            .map(|(i, &ms)| {
                if !column.is_valid(i) {
                    return None;
                }
                DateTime::from_timestamp_millis(ms).map(|dt| extract(part, dt))
            })
            .collect(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::col;
    use crate::table::Table;
    use crate::value::Value;

    #[test]
    fn test_date_parts() {
        // 2024-03-15T13:45:30Z, a Friday
        let ms = 1_710_510_330_000;
        let t = Table::from_columns(vec![("ts", Column::from_dates(vec![Some(ms), None]))]).unwrap();
        let get = |e: Expr| e.evaluate(&t).unwrap().to_values();
        assert_eq!(get(col("ts").year()), vec![Value::Int32(2024), Value::Null]);
        assert_eq!(get(col("ts").month())[0], Value::Int32(3));
        assert_eq!(get(col("ts").day())[0], Value::Int32(15));
        assert_eq!(get(col("ts").weekday())[0], Value::Int32(5));
        assert_eq!(get(col("ts").hour())[0], Value::Int32(13));
        assert_eq!(get(col("ts").minute())[0], Value::Int32(45));
        assert_eq!(get(col("ts").second())[0], Value::Int32(30));
    }

    #[test]
    fn test_rejects_non_dates() {
        let t = Table::from_columns(vec![("x", Column::from_f64_slice(&[1.0]))]).unwrap();
        assert!(col("x").year().evaluate(&t).is_err());
    }
}
