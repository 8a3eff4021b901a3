//! Null-skipping aggregate kernels shared by expressions, group-by and the
//! parallel workers.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use super::{Column, ColumnData};
use crate::groupby::key::push_key_component;
use crate::value::{DataType, Value};
use crate::{Error, Result};

/// Aggregate functions understood by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggFunc {
    Sum,
    Mean,
    Count,
    CountDistinct,
    Min,
    Max,
    Std,
    First,
    Last,
    List,
    Mode,
}

impl AggFunc {
    /// Parse a group-by shorthand method name.
    pub fn from_shorthand(method: &str) -> Result<Self> {
        match method {
            "sum" => Ok(AggFunc::Sum),
            "mean" => Ok(AggFunc::Mean),
            "min" => Ok(AggFunc::Min),
            "max" => Ok(AggFunc::Max),
            "count" => Ok(AggFunc::Count),
            "first" => Ok(AggFunc::First),
            "last" => Ok(AggFunc::Last),
            other => Err(Error::InvalidOperation(format!(
                "Unknown aggregation method '{}'",
                other
            ))),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            AggFunc::Sum => "sum",
            AggFunc::Mean => "mean",
            AggFunc::Count => "count",
            AggFunc::CountDistinct => "count_distinct",
            AggFunc::Min => "min",
            AggFunc::Max => "max",
            AggFunc::Std => "std",
            AggFunc::First => "first",
            AggFunc::Last => "last",
            AggFunc::List => "list",
            AggFunc::Mode => "mode",
        }
    }

    /// Column type used for the aggregate output when every group is null.
    pub fn output_type(&self, input: DataType) -> DataType {
        match self {
            AggFunc::Sum => match input {
                DataType::Boolean => DataType::Int32,
                other => other,
            },
            AggFunc::Mean | AggFunc::Std => DataType::Float64,
            AggFunc::Count | AggFunc::CountDistinct => DataType::Int32,
            AggFunc::List => DataType::Object,
            AggFunc::Min | AggFunc::Max | AggFunc::First | AggFunc::Last | AggFunc::Mode => {
                input
            }
        }
    }
}

fn count_value(n: usize) -> Value {
    i32::try_from(n).map_or(Value::Float64(n as f64), Value::Int32)
}

impl Column {
    pub fn aggregate(&self, func: AggFunc) -> Result<Value> {
        match func {
            AggFunc::Sum => self.sum(),
            AggFunc::Mean => self.mean(),
            AggFunc::Count => Ok(self.count()),
            AggFunc::CountDistinct => Ok(self.count_distinct()),
            AggFunc::Min => self.min(),
            AggFunc::Max => self.max(),
            AggFunc::Std => self.std(),
            AggFunc::First => Ok(self.first()),
            AggFunc::Last => Ok(self.last()),
            AggFunc::List => Ok(self.list()),
            AggFunc::Mode => Ok(self.mode()),
        }
    }

    /// Sum of non-null values. Int32 sums accumulate in i64 and widen to
    /// float64 only when the total leaves the i32 range.
    pub fn sum(&self) -> Result<Value> {
        match &self.data {
            ColumnData::Float64(b) => Ok(Value::Float64(self.valid_indices().map(|i| b[i]).sum())),
            ColumnData::Int32(b) => {
                let total: i64 = self.valid_indices().map(|i| b[i] as i64).sum();
                Ok(i32::try_from(total).map_or(Value::Float64(total as f64), Value::Int32))
            }
            ColumnData::Boolean(b) => Ok(count_value(self.valid_indices().filter(|&i| b[i]).count())),
            _ => Err(self.not_numeric("sum")),
        }
    }

    pub fn mean(&self) -> Result<Value> {
        let values = self.numeric_values("mean")?;
        if values.is_empty() {
            return Ok(Value::Null);
        }
        Ok(Value::Float64(values.iter().sum::<f64>() / values.len() as f64))
    }

    /// Sample standard deviation, null below two values.
    pub fn std(&self) -> Result<Value> {
        let values = self.numeric_values("std")?;
        let n = values.len();
        if n < 2 {
            return Ok(Value::Null);
        }
        let mean = values.iter().sum::<f64>() / n as f64;
        let squares: f64 = values.iter().map(|v| (v - mean) * (v - mean)).sum();
        Ok(Value::Float64((squares / (n - 1) as f64).sqrt()))
    }

    pub fn min(&self) -> Result<Value> {
        self.extreme(Ordering::Less, "min")
    }

    pub fn max(&self) -> Result<Value> {
        self.extreme(Ordering::Greater, "max")
    }

    pub fn count(&self) -> Value {
        count_value(self.len() - self.null_count())
    }

    pub fn count_distinct(&self) -> Value {
        let mut seen = HashSet::new();
        let mut key = String::new();
        for i in self.valid_indices() {
            key.clear();
            push_key_component(&mut key, &self.value_at(i));
            if !seen.contains(key.as_str()) {
                seen.insert(key.clone());
            }
        }
        count_value(seen.len())
    }

    /// First non-null value.
    pub fn first(&self) -> Value {
        self.valid_indices()
            .next()
            .map_or(Value::Null, |i| self.value_at(i))
    }

    /// Last non-null value.
    pub fn last(&self) -> Value {
        (0..self.len())
            .rev()
            .find(|&i| self.is_valid(i))
            .map_or(Value::Null, |i| self.value_at(i))
    }

    /// Every value in row order, nulls included.
    pub fn list(&self) -> Value {
        Value::List(self.to_values())
    }

    /// Most frequent non-null value; ties go to the value seen first.
    pub fn mode(&self) -> Value {
        let mut counts: HashMap<String, (usize, usize)> = HashMap::new();
        let mut key = String::new();
        for i in self.valid_indices() {
            key.clear();
            push_key_component(&mut key, &self.value_at(i));
            counts
                .entry(key.clone())
                .and_modify(|(count, _)| *count += 1)
                .or_insert((1, i));
        }
        counts
            .values()
            .max_by(|(ca, fa), (cb, fb)| ca.cmp(cb).then(fb.cmp(fa)))
            .map_or(Value::Null, |&(_, first)| self.value_at(first))
    }

    fn extreme(&self, want: Ordering, op: &str) -> Result<Value> {
        match &self.data {
            ColumnData::Float64(b) => {
                let pick = |a: f64, v: f64| if want == Ordering::Less { a.min(v) } else { a.max(v) };
                Ok(self
                    .valid_indices()
                    .map(|i| b[i])
                    .reduce(pick)
                    .map_or(Value::Null, Value::Float64))
            }
            ColumnData::Int32(b) => {
                let values = self.valid_indices().map(|i| b[i]);
                let best = if want == Ordering::Less { values.min() } else { values.max() };
                Ok(best.map_or(Value::Null, Value::Int32))
            }
            ColumnData::Object(_) => Err(Error::TypeMismatch(format!(
                "{} is not defined for object columns",
                op
            ))),
            _ => {
                let mut best: Option<Value> = None;
                for i in self.valid_indices() {
                    let candidate = self.value_at(i);
                    let replace = match &best {
                        None => true,
                        Some(current) => candidate.partial_cmp_value(current) == Some(want),
                    };
                    if replace {
                        best = Some(candidate);
                    }
                }
                Ok(best.unwrap_or(Value::Null))
            }
        }
    }

    /// Non-null values as f64; booleans count as 0 and 1.
    fn numeric_values(&self, op: &str) -> Result<Vec<f64>> {
        match &self.data {
            ColumnData::Boolean(b) => Ok(self
                .valid_indices()
                .map(|i| if b[i] { 1.0 } else { 0.0 })
                .collect()),
            ColumnData::Float64(_) | ColumnData::Int32(_) => self.f64_values(),
            _ => Err(self.not_numeric(op)),
        }
    }

    fn not_numeric(&self, op: &str) -> Error {
        Error::TypeMismatch(format!(
            "{} requires a numeric column, found {}",
            op,
            self.data_type()
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sum_skips_nulls() {
        let col = Column::from_i32(vec![Some(1), None, Some(3), None, Some(5)]);
        assert_eq!(col.sum().unwrap(), Value::Int32(9));
        let col = Column::from_f64(vec![Some(1.5), None, Some(2.5)]);
        assert_eq!(col.sum().unwrap(), Value::Float64(4.0));
    }

    #[test]
    fn test_empty_and_all_null() {
        let empty = Column::from_f64(vec![]);
        assert_eq!(empty.sum().unwrap(), Value::Float64(0.0));
        let nulls = Column::nulls(DataType::Int32, 3);
        assert_eq!(nulls.sum().unwrap(), Value::Int32(0));
        assert_eq!(nulls.mean().unwrap(), Value::Null);
        assert_eq!(nulls.min().unwrap(), Value::Null);
        assert_eq!(nulls.max().unwrap(), Value::Null);
        assert_eq!(nulls.count(), Value::Int32(0));
        assert_eq!(nulls.first(), Value::Null);
    }

    #[test]
    fn test_int32_sum_overflow_widens() {
        let col = Column::from_i32_slice(&[i32::MAX, 1]);
        assert_eq!(col.sum().unwrap(), Value::Float64(i32::MAX as f64 + 1.0));
    }

    #[test]
    fn test_sum_rejects_text() {
        let col = Column::from_utf8(vec![Some("a")]);
        assert!(matches!(col.sum().unwrap_err(), Error::TypeMismatch(_)));
    }

    #[test]
    fn test_std_is_sample() {
        let col = Column::from_f64_slice(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        let Value::Float64(std) = col.std().unwrap() else {
            panic!("std should be float64");
        };
        assert!((std - 2.138089935299395).abs() < 1e-12);
        assert_eq!(Column::from_f64_slice(&[1.0]).std().unwrap(), Value::Null);
    }

    #[test]
    fn test_min_max_keep_type() {
        let text = Column::from_utf8(vec![Some("pear"), None, Some("apple")]);
        assert_eq!(text.min().unwrap(), Value::from("apple"));
        assert_eq!(text.max().unwrap(), Value::from("pear"));
        let ints = Column::from_i32(vec![None, Some(4), Some(-2)]);
        assert_eq!(ints.min().unwrap(), Value::Int32(-2));
        let dates = Column::from_dates(vec![Some(10), Some(5)]);
        assert_eq!(dates.max().unwrap(), Value::Date(10));
    }

    #[test]
    fn test_first_last_skip_nulls() {
        let col = Column::from_i32(vec![None, Some(2), Some(3), None]);
        assert_eq!(col.first(), Value::Int32(2));
        assert_eq!(col.last(), Value::Int32(3));
    }

    #[test]
    fn test_count_distinct_and_mode() {
        let col = Column::from_utf8(vec![Some("b"), Some("a"), None, Some("a"), Some("b")]);
        assert_eq!(col.count(), Value::Int32(4));
        assert_eq!(col.count_distinct(), Value::Int32(2));
        // tie between "b" and "a": "b" was seen first
        assert_eq!(col.mode(), Value::from("b"));
        let col = Column::from_i32_slice(&[1, 2, 2]);
        assert_eq!(col.mode(), Value::Int32(2));
    }

    #[test]
    fn test_list_keeps_nulls() {
        let col = Column::from_i32(vec![Some(1), None]);
        assert_eq!(col.list(), Value::List(vec![Value::Int32(1), Value::Null]));
    }

    #[test]
    fn test_shorthand() {
        assert_eq!(AggFunc::from_shorthand("mean").unwrap(), AggFunc::Mean);
        let err = AggFunc::from_shorthand("median").unwrap_err();
        assert!(err.to_string().contains("Unknown aggregation method 'median'"));
    }
}
