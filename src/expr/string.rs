//! String transforms.

use super::{Expr, StringOp};
use crate::column::{Column, ColumnData};
use crate::value::DataType;
use crate::{Error, Result};

/// String methods on expressions. Every method expects a utf8 operand and
/// keeps nulls as nulls.
pub trait StringExpr {
    fn upper(self) -> Expr;
    fn lower(self) -> Expr;
    fn trim(self) -> Expr;
    /// Length in characters.
    fn str_len(self) -> Expr;
    fn contains(self, pattern: impl Into<String>) -> Expr;
    fn starts_with(self, prefix: impl Into<String>) -> Expr;
    fn ends_with(self, suffix: impl Into<String>) -> Expr;
}

fn string_op(expr: Expr, op: StringOp) -> Expr {
    Expr::Str {
        op,
        expr: Box::new(expr),
    }
}

impl StringExpr for Expr {
    fn upper(self) -> Expr {
        string_op(self, StringOp::Upper)
    }

    fn lower(self) -> Expr {
        string_op(self, StringOp::Lower)
    }

    fn trim(self) -> Expr {
        string_op(self, StringOp::Trim)
    }

    fn str_len(self) -> Expr {
        string_op(self, StringOp::Len)
    }

    fn contains(self, pattern: impl Into<String>) -> Expr {
        string_op(self, StringOp::Contains(pattern.into()))
    }

    fn starts_with(self, prefix: impl Into<String>) -> Expr {
        string_op(self, StringOp::StartsWith(prefix.into()))
    }

    fn ends_with(self, suffix: impl Into<String>) -> Expr {
        string_op(self, StringOp::EndsWith(suffix.into()))
    }
}

pub(super) fn apply(op: &StringOp, column: &Column) -> Result<Column> {
    let result_type = match op {
        StringOp::Upper | StringOp::Lower | StringOp::Trim => DataType::Utf8,
        StringOp::Len => DataType::Int32,
        _ => DataType::Boolean,
    };
    if column.null_count() == column.len() {
        return Ok(Column::nulls(result_type, column.len()));
    }
    let ColumnData::Utf8(values) = column.data() else {
        return Err(Error::TypeMismatch(format!(
            "string operation {:?} requires a utf8 operand, found {}",
            op,
            column.data_type()
        )));
    };

    let valid = |i: usize| column.is_valid(i);
    let out = match op {
        StringOp::Upper => map_text(values, valid, |s| s.to_uppercase()),
        StringOp::Lower => map_text(values, valid, |s| s.to_lowercase()),
        StringOp::Trim => map_text(values, valid, |s| s.trim().to_string()),
        StringOp::Len => Column::from_i32(
            values
                .iter()
                .enumerate()
                .map(|(i, s)| valid(i).then(|| s.chars().count() as i32))
                .collect(),
        ),
        StringOp::Contains(p) => test_text(values, valid, |s| s.contains(p.as_str())),
        StringOp::StartsWith(p) => test_text(values, valid, |s| s.starts_with(p.as_str())),
        StringOp::EndsWith(p) => test_text(values, valid, |s| s.ends_with(p.as_str())),
    };
    Ok(out)
}

fn map_text(
    values: &[String],
    valid: impl Fn(usize) -> bool,
    f: impl Fn(&str) -> String,
) -> Column {
    Column::from_utf8(
        values
            .iter()
            .enumerate()
            .map(|(i, s)| valid(i).then(|| f(s.as_str())))
            .collect(),
    )
}

fn test_text(values: &[String], valid: impl Fn(usize) -> bool, f: impl Fn(&str) -> bool) -> Column {
    Column::from_bool(
        values
            .iter()
            .enumerate()
            .map(|(i, s)| valid(i).then(|| f(s.as_str())))
            .collect(),
    )
}
