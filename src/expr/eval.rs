//! Eager expression evaluation.
//!
//! Sub-expressions evaluate to either a full column or a scalar that has not
//! been broadcast yet. Binary kernels read scalars directly, so a literal is
//! only materialized when it is the final result.

use std::cmp::Ordering;
use std::rc::Rc;

use tracing::trace;

use super::{ArithOp, CmpOp, Expr, LogicalOp};
use crate::column::{Buffer, Column, ColumnData};
use crate::series::Series;
use crate::table::Table;
use crate::value::{DataType, Value};
use crate::{Error, Result};

#[derive(Debug, Clone)]
pub(crate) enum Evaluated {
    Column(Rc<Column>),
    Scalar(Value),
}

impl Evaluated {
    fn into_column(self, len: usize) -> Rc<Column> {
        match self {
            Evaluated::Column(column) => column,
            Evaluated::Scalar(value) => Rc::new(Column::full(&value, len)),
        }
    }
}

/// Borrowed view of one operand of a kernel.
#[derive(Clone, Copy)]
enum Operand<'a> {
    Column(&'a Column),
    Scalar(&'a Value),
}

impl<'a> Operand<'a> {
    fn of(evaluated: &'a Evaluated) -> Self {
        match evaluated {
            Evaluated::Column(column) => Operand::Column(column),
            Evaluated::Scalar(value) => Operand::Scalar(value),
        }
    }

    fn dtype(&self) -> Option<DataType> {
        match self {
            Operand::Column(c) => Some(c.data_type()),
            Operand::Scalar(v) => v.data_type(),
        }
    }

    fn all_null(&self) -> bool {
        match self {
            Operand::Column(c) => c.null_count() == c.len(),
            Operand::Scalar(v) => v.is_null(),
        }
    }

    fn value_at(&self, i: usize) -> Value {
        match self {
            Operand::Column(c) => c.value_at(i),
            Operand::Scalar(v) => (*v).clone(),
        }
    }

    #[inline]
    fn f64_at(&self, i: usize) -> Option<f64> {
        match self {
            Operand::Column(c) => c.f64_at(i),
            Operand::Scalar(v) => v.as_f64(),
        }
    }

    #[inline]
    fn i32_at(&self, i: usize) -> Option<i32> {
        match self {
            Operand::Column(c) => match c.data() {
                ColumnData::Int32(b) if c.is_valid(i) => Some(b[i]),
                _ => None,
            },
            Operand::Scalar(Value::Int32(v)) => Some(*v),
            Operand::Scalar(_) => None,
        }
    }

    #[inline]
    fn str_at(&self, i: usize) -> Option<&'a str> {
        match *self {
            Operand::Column(c) => match c.data() {
                ColumnData::Utf8(v) if c.is_valid(i) => Some(v[i].as_str()),
                _ => None,
            },
            Operand::Scalar(v) => v.as_str(),
        }
    }

    #[inline]
    fn bool_at(&self, i: usize) -> Option<bool> {
        match self {
            Operand::Column(c) => match c.data() {
                ColumnData::Boolean(b) if c.is_valid(i) => Some(b[i]),
                _ => None,
            },
            Operand::Scalar(v) => v.as_bool(),
        }
    }

    #[inline]
    fn date_at(&self, i: usize) -> Option<i64> {
        match self {
            Operand::Column(c) => match c.data() {
                ColumnData::Date(b) if c.is_valid(i) => Some(b[i]),
                _ => None,
            },
            Operand::Scalar(Value::Date(ms)) => Some(*ms),
            Operand::Scalar(_) => None,
        }
    }
}

impl Expr {
    /// Evaluate against `table`. Row-wise results have the table's length;
    /// expressions that aggregate produce a single row.
    pub fn evaluate(&self, table: &Table) -> Result<Series> {
        let name = self.output_name();
        let column = match self.eval(table)? {
            Evaluated::Column(column) => column,
            Evaluated::Scalar(value) => {
                let len = if self.contains_aggregate() { 1 } else { table.len() };
                let hint = self.scalar_type_hint(table);
                Rc::new(Column::from_values_with_hint(vec![value; len], hint))
            }
        };
        Ok(Series::from_shared(name, column))
    }

    /// Evaluate an expression that yields exactly one value.
    pub fn evaluate_scalar(&self, table: &Table) -> Result<Value> {
        match self.eval(table)? {
            Evaluated::Scalar(value) => Ok(value),
            Evaluated::Column(column) if column.len() == 1 => Ok(column.value_at(0)),
            Evaluated::Column(column) => Err(Error::InvalidOperation(format!(
                "expression {} produced {} rows, expected a single value",
                self,
                column.len()
            ))),
        }
    }

    fn scalar_type_hint(&self, table: &Table) -> DataType {
        self.as_column_aggregate()
            .and_then(|(func, name)| {
                table
                    .shared_column(name)
                    .ok()
                    .map(|c| func.output_type(c.data_type()))
            })
            .unwrap_or(DataType::Float64)
    }

    pub(crate) fn eval(&self, table: &Table) -> Result<Evaluated> {
        match self {
            Expr::Column(name) => Ok(Evaluated::Column(table.shared_column(name)?)),
            Expr::Literal(value) => Ok(Evaluated::Scalar(value.clone())),
            Expr::Alias { expr, .. } => expr.eval(table),
            Expr::Binary { op, left, right } => {
                let l = left.eval(table)?;
                let r = right.eval(table)?;
                combine(&l, &r, |a, b, len| arithmetic(*op, a, b, len))
            }
            Expr::Compare { op, left, right } => {
                let l = left.eval(table)?;
                let r = right.eval(table)?;
                let fast = match (&l, &r) {
                    (Evaluated::Column(c), Evaluated::Scalar(v)) => compare_literal(*op, c, v),
                    (Evaluated::Scalar(v), Evaluated::Column(c)) => {
                        compare_literal(op.flip(), c, v)
                    }
                    _ => None,
                };
                match fast {
                    Some(column) => {
                        trace!(op = op.symbol(), rows = column.len(), "column-literal comparison");
                        Ok(Evaluated::Column(Rc::new(column)))
                    }
                    None => combine(&l, &r, |a, b, len| compare(*op, a, b, len)),
                }
            }
            Expr::Logical { op, left, right } => {
                let l = left.eval(table)?;
                let r = right.eval(table)?;
                let fast = match (&l, &r) {
                    (Evaluated::Column(c), Evaluated::Scalar(Value::Boolean(b)))
                    | (Evaluated::Scalar(Value::Boolean(b)), Evaluated::Column(c)) => {
                        logical_literal(*op, c, *b)
                    }
                    _ => None,
                };
                match fast {
                    Some(out) => Ok(out),
                    None => combine(&l, &r, |a, b, len| logical(*op, a, b, len)),
                }
            }
            Expr::Not(expr) => map_unary(expr.eval(table)?, negate),
            Expr::IsNull(expr) => map_unary(expr.eval(table)?, |c| {
                Ok(bool_column((0..c.len()).map(|i| c.is_null(i)).collect()))
            }),
            Expr::IsNotNull(expr) => map_unary(expr.eval(table)?, |c| {
                Ok(bool_column((0..c.len()).map(|i| c.is_valid(i)).collect()))
            }),
            Expr::FillNull { expr, value } => {
                map_unary(expr.eval(table)?, |c| fill_null(c, value))
            }
            Expr::Coalesce(exprs) => coalesce(exprs, table),
            Expr::Str { op, expr } => {
                map_unary(expr.eval(table)?, |c| super::string::apply(op, c))
            }
            Expr::Temporal { part, expr } => {
                map_unary(expr.eval(table)?, |c| super::temporal::apply(*part, c))
            }
            Expr::Agg { func, expr } => {
                let input = expr.eval(table)?.into_column(table.len());
                Ok(Evaluated::Scalar(input.aggregate(*func)?))
            }
        }
    }
}

/// Run a binary kernel over two operands. Scalar with scalar stays scalar.
fn combine(
    left: &Evaluated,
    right: &Evaluated,
    kernel: impl FnOnce(Operand<'_>, Operand<'_>, usize) -> Result<Column>,
) -> Result<Evaluated> {
    let len = match (left, right) {
        (Evaluated::Column(a), Evaluated::Column(b)) if a.len() != b.len() => {
            return Err(Error::ShapeMismatch(format!(
                "operands have different lengths: {} vs {}",
                a.len(),
                b.len()
            )))
        }
        (Evaluated::Column(c), _) | (_, Evaluated::Column(c)) => Some(c.len()),
        _ => None,
    };
    let out = kernel(Operand::of(left), Operand::of(right), len.unwrap_or(1))?;
    Ok(match len {
        Some(_) => Evaluated::Column(Rc::new(out)),
        None => Evaluated::Scalar(out.value_at(0)),
    })
}

fn map_unary(
    input: Evaluated,
    kernel: impl FnOnce(&Column) -> Result<Column>,
) -> Result<Evaluated> {
    match input {
        Evaluated::Column(column) => Ok(Evaluated::Column(Rc::new(kernel(&column)?))),
        Evaluated::Scalar(value) => {
            let out = kernel(&Column::full(&value, 1))?;
            Ok(Evaluated::Scalar(out.value_at(0)))
        }
    }
}

fn bool_column(values: Vec<bool>) -> Column {
    Column::from_parts(ColumnData::Boolean(Buffer::from_vec(values)), None)
}

fn date_arithmetic<F>(len: usize, f: F) -> Result<Vec<Option<i64>>>
where
    F: Fn(usize) -> Result<Option<i64>>,
{
    (0..len).map(f).collect()
}

fn date_overflow(op: ArithOp, row: usize) -> Error {
    Error::InvalidOperation(format!(
        "date arithmetic '{}' overflows at row {}",
        op.symbol(),
        row
    ))
}

fn arithmetic(op: ArithOp, l: Operand<'_>, r: Operand<'_>, len: usize) -> Result<Column> {
    if l.all_null() || r.all_null() {
        return Ok(Column::nulls(DataType::Float64, len));
    }
    let (Some(lt), Some(rt)) = (l.dtype(), r.dtype()) else {
        return Ok(Column::nulls(DataType::Float64, len));
    };
    match (lt, rt) {
        (DataType::Int32, DataType::Int32) if op != ArithOp::Div => {
            Ok(int_arithmetic(op, l, r, len).unwrap_or_else(|| float_arithmetic(op, l, r, len)))
        }
        (a, b) if a.is_numeric() && b.is_numeric() => Ok(float_arithmetic(op, l, r, len)),
        (DataType::Utf8, DataType::Utf8) if op == ArithOp::Add => Ok(Column::from_utf8(
            (0..len)
                .map(|i| Some(format!("{}{}", l.str_at(i)?, r.str_at(i)?)))
                .collect(),
        )),
        (DataType::Date, n) if n.is_numeric() && matches!(op, ArithOp::Add | ArithOp::Sub) => {
            date_arithmetic(len, |i| {
                let (Some(ms), Some(delta)) = (l.date_at(i), r.f64_at(i)) else {
                    return Ok(None);
                };
                let delta = delta as i64;
                let shifted = if op == ArithOp::Add {
                    ms.checked_add(delta)
                } else {
                    ms.checked_sub(delta)
                };
                shifted.map(Some).ok_or_else(|| date_overflow(op, i))
            })
            .map(Column::from_dates)
        }
        (n, DataType::Date) if n.is_numeric() && op == ArithOp::Add => date_arithmetic(len, |i| {
            let (Some(delta), Some(ms)) = (l.f64_at(i), r.date_at(i)) else {
                return Ok(None);
            };
            ms.checked_add(delta as i64)
                .map(Some)
                .ok_or_else(|| date_overflow(op, i))
        })
        .map(Column::from_dates),
        (DataType::Date, DataType::Date) if op == ArithOp::Sub => date_arithmetic(len, |i| {
            let (Some(a), Some(b)) = (l.date_at(i), r.date_at(i)) else {
                return Ok(None);
            };
            a.checked_sub(b)
                .map(Some)
                .ok_or_else(|| date_overflow(op, i))
        })
        .map(|diffs| Column::from_f64(diffs.into_iter().map(|d| d.map(|d| d as f64)).collect())),
        _ => Err(Error::TypeMismatch(format!(
            "cannot apply '{}' to {} and {}",
            op.symbol(),
            lt,
            rt
        ))),
    }
}

/// Int32 arithmetic; `None` when any row overflows.
fn int_arithmetic(op: ArithOp, l: Operand<'_>, r: Operand<'_>, len: usize) -> Option<Column> {
    let mut out = Vec::with_capacity(len);
    for i in 0..len {
        out.push(match (l.i32_at(i), r.i32_at(i)) {
            (Some(a), Some(b)) => match op {
                ArithOp::Add => Some(a.checked_add(b)?),
                ArithOp::Sub => Some(a.checked_sub(b)?),
                ArithOp::Mul => Some(a.checked_mul(b)?),
                ArithOp::Rem if b == 0 => None,
                ArithOp::Rem => Some(a.checked_rem(b)?),
                ArithOp::Div => return None,
            },
            _ => None,
        });
    }
    Some(Column::from_i32(out))
}

fn float_arithmetic(op: ArithOp, l: Operand<'_>, r: Operand<'_>, len: usize) -> Column {
    Column::from_f64(
        (0..len)
            .map(|i| {
                let (a, b) = (l.f64_at(i)?, r.f64_at(i)?);
                match op {
                    ArithOp::Add => Some(a + b),
                    ArithOp::Sub => Some(a - b),
                    ArithOp::Mul => Some(a * b),
                    ArithOp::Div | ArithOp::Rem if b == 0.0 => None,
                    ArithOp::Div => Some(a / b),
                    ArithOp::Rem => Some(a % b),
                }
            })
            .collect(),
    )
}

#[inline]
fn holds(op: CmpOp, ord: Option<Ordering>) -> bool {
    match ord {
        None => op == CmpOp::NotEq,
        Some(ord) => match op {
            CmpOp::Eq => ord == Ordering::Equal,
            CmpOp::NotEq => ord != Ordering::Equal,
            CmpOp::Lt => ord == Ordering::Less,
            CmpOp::LtEq => ord != Ordering::Greater,
            CmpOp::Gt => ord == Ordering::Greater,
            CmpOp::GtEq => ord != Ordering::Less,
        },
    }
}

fn compare(op: CmpOp, l: Operand<'_>, r: Operand<'_>, len: usize) -> Result<Column> {
    if l.all_null() || r.all_null() {
        return Ok(Column::nulls(DataType::Boolean, len));
    }
    let (Some(lt), Some(rt)) = (l.dtype(), r.dtype()) else {
        return Ok(Column::nulls(DataType::Boolean, len));
    };
    let ordered = |f: &dyn Fn(usize) -> Option<Option<Ordering>>| {
        Column::from_bool((0..len).map(|i| f(i).map(|ord| holds(op, ord))).collect())
    };
    match (lt, rt) {
        (a, b) if a.is_numeric() && b.is_numeric() => {
            Ok(ordered(&|i| Some(l.f64_at(i)?.partial_cmp(&r.f64_at(i)?))))
        }
        (DataType::Utf8, DataType::Utf8) => Ok(ordered(&|i| Some(Some(l.str_at(i)?.cmp(r.str_at(i)?))))),
        (DataType::Boolean, DataType::Boolean) => {
            Ok(ordered(&|i| Some(Some(l.bool_at(i)?.cmp(&r.bool_at(i)?)))))
        }
        (DataType::Date, DataType::Date) => {
            Ok(ordered(&|i| Some(Some(l.date_at(i)?.cmp(&r.date_at(i)?)))))
        }
        _ => Err(Error::TypeMismatch(format!("cannot compare {} with {}", lt, rt))),
    }
}

/// Column against a literal, read straight from the column buffer. `None`
/// hands the pair to the general kernel.
fn compare_literal(op: CmpOp, column: &Column, literal: &Value) -> Option<Column> {
    let values: Vec<bool> = match (column.data(), literal) {
        (ColumnData::Float64(b), lit) => {
            let x = lit.as_f64()?;
            b.iter().map(|v| holds(op, v.partial_cmp(&x))).collect()
        }
        (ColumnData::Int32(b), Value::Int32(x)) => {
            b.iter().map(|v| holds(op, Some(v.cmp(x)))).collect()
        }
        (ColumnData::Int32(b), Value::Float64(x)) => b
            .iter()
            .map(|v| holds(op, (*v as f64).partial_cmp(x)))
            .collect(),
        (ColumnData::Utf8(v), Value::Utf8(s)) => v
            .iter()
            .map(|v| holds(op, Some(v.as_str().cmp(s.as_str()))))
            .collect(),
        (ColumnData::Boolean(b), Value::Boolean(x)) => {
            b.iter().map(|v| holds(op, Some(v.cmp(x)))).collect()
        }
        (ColumnData::Date(b), Value::Date(x)) => {
            b.iter().map(|v| holds(op, Some(v.cmp(x)))).collect()
        }
        _ => return None,
    };
    Some(Column::from_parts(
        ColumnData::Boolean(Buffer::from_vec(values)),
        column.validity().cloned(),
    ))
}

fn logical(op: LogicalOp, l: Operand<'_>, r: Operand<'_>, len: usize) -> Result<Column> {
    if l.all_null() || r.all_null() {
        return Ok(Column::nulls(DataType::Boolean, len));
    }
    for operand in [l, r] {
        if let Some(dtype) = operand.dtype().filter(|t| *t != DataType::Boolean) {
            return Err(Error::TypeMismatch(format!(
                "logical operands must be bool, found {}",
                dtype
            )));
        }
    }
    Ok(Column::from_bool(
        (0..len)
            .map(|i| {
                let (a, b) = (l.bool_at(i)?, r.bool_at(i)?);
                Some(match op {
                    LogicalOp::And => a && b,
                    LogicalOp::Or => a || b,
                })
            })
            .collect(),
    ))
}

/// Bool column combined with a bool literal without broadcasting it.
fn logical_literal(op: LogicalOp, column: &Rc<Column>, literal: bool) -> Option<Evaluated> {
    if column.data_type() != DataType::Boolean {
        return None;
    }
    match (op, literal) {
        (LogicalOp::And, true) | (LogicalOp::Or, false) => {
            Some(Evaluated::Column(Rc::clone(column)))
        }
        (LogicalOp::And, false) | (LogicalOp::Or, true) => Some(Evaluated::Column(Rc::new(
            Column::from_parts(
                ColumnData::Boolean(Buffer::from_vec(vec![literal; column.len()])),
                column.validity().cloned(),
            ),
        ))),
    }
}

fn negate(column: &Column) -> Result<Column> {
    if column.null_count() == column.len() {
        return Ok(Column::nulls(DataType::Boolean, column.len()));
    }
    match column.data() {
        ColumnData::Boolean(b) => Ok(Column::from_parts(
            ColumnData::Boolean(Buffer::from_vec(b.iter().map(|v| !v).collect())),
            column.validity().cloned(),
        )),
        _ => Err(Error::TypeMismatch(format!(
            "not requires a bool operand, found {}",
            column.data_type()
        ))),
    }
}

fn fill_null(column: &Column, value: &Value) -> Result<Column> {
    if column.null_count() == 0 || value.is_null() {
        return Ok(column.clone());
    }
    let all_null = column.null_count() == column.len();
    let values: Vec<Value> = column
        .iter()
        .map(|v| if v.is_null() { value.clone() } else { v })
        .collect();
    if all_null {
        return Ok(Column::from_values(values));
    }
    let dtype = match (column.data_type(), value) {
        (DataType::Int32, Value::Float64(_)) => DataType::Float64,
        (dtype, _) => dtype,
    };
    Column::from_values_typed(dtype, values)
}

fn coalesce(exprs: &[Expr], table: &Table) -> Result<Evaluated> {
    if exprs.is_empty() {
        return Err(Error::InvalidOperation(
            "coalesce needs at least one expression".to_string(),
        ));
    }
    let parts = exprs
        .iter()
        .map(|e| e.eval(table))
        .collect::<Result<Vec<_>>>()?;

    let mut len = None;
    for part in &parts {
        if let Evaluated::Column(c) = part {
            match len {
                Some(n) if n != c.len() => {
                    return Err(Error::ShapeMismatch(format!(
                        "coalesce operands have different lengths: {} vs {}",
                        n,
                        c.len()
                    )))
                }
                _ => len = Some(c.len()),
            }
        }
    }

    let operands: Vec<Operand<'_>> = parts.iter().map(Operand::of).collect();
    let first_non_null = |i: usize| {
        operands
            .iter()
            .map(|o| o.value_at(i))
            .find(|v| !v.is_null())
            .unwrap_or(Value::Null)
    };
    let Some(len) = len else {
        return Ok(Evaluated::Scalar(first_non_null(0)));
    };
    let hint = operands
        .iter()
        .find_map(Operand::dtype)
        .unwrap_or(DataType::Float64);
    let values = (0..len).map(first_non_null).collect();
    Ok(Evaluated::Column(Rc::new(Column::from_values_with_hint(values, hint))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::{coalesce, col, lit};

    fn table() -> Table {
        Table::from_columns(vec![
            ("a", Column::from_i32(vec![Some(1), None, Some(3), Some(4)])),
            ("b", Column::from_f64(vec![Some(0.5), Some(2.0), None, Some(0.0)])),
            ("s", Column::from_utf8(vec![Some("x"), Some("y"), None, Some("x")])),
            ("flag", Column::from_bool(vec![Some(true), Some(false), None, Some(true)])),
        ])
        .unwrap()
    }

    fn values(expr: Expr) -> Vec<Value> {
        expr.evaluate(&table()).unwrap().to_values()
    }

    #[test]
    fn test_arithmetic_null_propagation() {
        assert_eq!(
            values(col("a").add(col("b"))),
            vec![Value::Float64(1.5), Value::Null, Value::Null, Value::Float64(4.0)]
        );
        let out = col("a").mul(lit(2)).evaluate(&table()).unwrap();
        assert_eq!(out.data_type(), DataType::Int32);
        assert_eq!(out.get(3).unwrap(), Value::Int32(8));
    }

    #[test]
    fn test_int_overflow_promotes() {
        let t = Table::from_columns(vec![("x", Column::from_i32_slice(&[i32::MAX, 1]))]).unwrap();
        let out = col("x").add(lit(1)).evaluate(&t).unwrap();
        assert_eq!(out.data_type(), DataType::Float64);
        assert_eq!(out.get(0).unwrap(), Value::Float64(i32::MAX as f64 + 1.0));
        assert_eq!(out.get(1).unwrap(), Value::Float64(2.0));
    }

    #[test]
    fn test_date_arithmetic_overflow_is_an_error() {
        let t = Table::from_columns(vec![
            ("d", Column::from_dates(vec![Some(i64::MAX), None])),
            ("e", Column::from_dates(vec![Some(i64::MIN), Some(0)])),
        ])
        .unwrap();
        let err = col("d").add(lit(1000)).evaluate(&t).unwrap_err();
        assert!(matches!(err, Error::InvalidOperation(ref m) if m.contains("row 0")));
        assert!(lit(1000).add(col("d")).evaluate(&t).is_err());
        assert!(col("e").sub(lit(1)).evaluate(&t).is_err());
        assert!(col("d").sub(col("e")).evaluate(&t).is_err());

        let shifted = col("e").add(lit(86_400_000)).evaluate(&t).unwrap();
        assert_eq!(shifted.data_type(), DataType::Date);
        assert_eq!(shifted.get(1).unwrap(), Value::Date(86_400_000));
    }

    #[test]
    fn test_division() {
        assert_eq!(
            values(col("a").div(col("b"))),
            vec![Value::Float64(2.0), Value::Null, Value::Null, Value::Null]
        );
        assert_eq!(values(col("a").rem(lit(0)))[0], Value::Null);
    }

    #[test]
    fn test_all_null_operand() {
        let out = values(col("a").add(lit(Value::Null)));
        assert!(out.iter().all(Value::is_null));
    }

    #[test]
    fn test_string_concat_and_mismatch() {
        assert_eq!(values(col("s").add(lit("!")))[0], Value::from("x!"));
        let err = col("s").add(lit(1)).evaluate(&table()).unwrap_err();
        assert!(matches!(err, Error::TypeMismatch(_)));
    }

    #[test]
    fn test_comparison_fast_path_and_flip() {
        assert_eq!(
            values(col("a").gt(lit(2))),
            vec![Value::Boolean(false), Value::Null, Value::Boolean(true), Value::Boolean(true)]
        );
        assert_eq!(values(lit(2).lt(col("a"))), values(col("a").gt(lit(2))));
        assert_eq!(values(col("s").eq(lit("x")))[3], Value::Boolean(true));
        let err = col("s").gt(lit(1)).evaluate(&table()).unwrap_err();
        assert!(matches!(err, Error::TypeMismatch(_)));
    }

    #[test]
    fn test_column_comparison_mixed_numeric() {
        assert_eq!(
            values(col("a").gt(col("b"))),
            vec![Value::Boolean(true), Value::Null, Value::Null, Value::Boolean(true)]
        );
    }

    #[test]
    fn test_logical_and_not() {
        let expr = col("flag").and(col("a").gt(lit(0)));
        assert_eq!(
            values(expr),
            vec![Value::Boolean(true), Value::Null, Value::Null, Value::Boolean(true)]
        );
        assert_eq!(
            values(col("flag").not()),
            vec![Value::Boolean(false), Value::Boolean(true), Value::Null, Value::Boolean(false)]
        );
        assert_eq!(
            values(col("flag").or(lit(true))),
            vec![Value::Boolean(true), Value::Boolean(true), Value::Null, Value::Boolean(true)]
        );
        assert!(col("a").and(lit(true)).evaluate(&table()).is_err());
    }

    #[test]
    fn test_null_handling() {
        assert_eq!(
            values(col("a").is_null()),
            vec![Value::Boolean(false), Value::Boolean(true), Value::Boolean(false), Value::Boolean(false)]
        );
        assert_eq!(values(col("a").fill_null(0))[1], Value::Int32(0));
        assert_eq!(
            values(coalesce(vec![col("s"), lit("none")])),
            vec![Value::from("x"), Value::from("y"), Value::from("none"), Value::from("x")]
        );
    }

    #[test]
    fn test_literal_broadcast() {
        let out = lit(7).evaluate(&table()).unwrap();
        assert_eq!(out.len(), 4);
        assert_eq!(out.get(2).unwrap(), Value::Int32(7));
    }

    #[test]
    fn test_aggregate_single_row() {
        let out = col("a").sum().evaluate(&table()).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out.get(0).unwrap(), Value::Int32(8));
        assert_eq!(col("b").max().evaluate_scalar(&table()).unwrap(), Value::Float64(2.0));
        let centered = col("a").sub(col("a").mean()).evaluate(&table()).unwrap();
        assert_eq!(centered.len(), 4);
        assert!(col("a").evaluate_scalar(&table()).is_err());
    }

    #[test]
    fn test_missing_column_lists_available() {
        let err = col("salary").evaluate(&table()).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("'salary'"));
        assert!(msg.contains("a, b, s, flag"));
    }
}
