//! Structural column operations: filter, slice, gather, concat, cast.

use super::{Buffer, Column, ColumnData};
use crate::bitmap::BitArray;
use crate::value::{DataType, Value};
use crate::{Error, Result};

fn gather<T: Clone + Default>(values: &[T], positions: &[Option<usize>]) -> Vec<T> {
    positions
        .iter()
        .map(|p| p.map(|i| values[i].clone()).unwrap_or_default())
        .collect()
}

impl Column {
    /// Keep rows where `mask` is set.
    pub fn filter(&self, mask: &BitArray) -> Result<Column> {
        if mask.len() != self.len() {
            return Err(Error::ShapeMismatch(format!(
                "filter mask has length {} but column has length {}",
                mask.len(),
                self.len()
            )));
        }
        let positions: Vec<usize> = mask.iter_ones().collect();
        Ok(self.gather_unchecked(&positions))
    }

    /// Rows `[start, end)`. Fixed-width storage is shared, text and object
    /// storage is copied.
    pub fn slice(&self, start: usize, end: usize) -> Result<Column> {
        if end > self.len() {
            return Err(Error::IndexOutOfBounds {
                index: end,
                len: self.len(),
            });
        }
        if start > end {
            return Err(Error::InvalidOperation(format!(
                "slice start {} is past its end {}",
                start, end
            )));
        }
        Ok(self.slice_unchecked(start, end))
    }

    /// `slice` without bounds checks; callers guarantee `start <= end <= len`.
    pub(crate) fn slice_unchecked(&self, start: usize, end: usize) -> Column {
        let data = match &self.data {
            ColumnData::Float64(b) => ColumnData::Float64(b.slice(start, end)),
            ColumnData::Int32(b) => ColumnData::Int32(b.slice(start, end)),
            ColumnData::Boolean(b) => ColumnData::Boolean(b.slice(start, end)),
            ColumnData::Date(b) => ColumnData::Date(b.slice(start, end)),
            ColumnData::Utf8(v) => ColumnData::Utf8(v[start..end].to_vec()),
            ColumnData::Object(v) => ColumnData::Object(v[start..end].to_vec()),
        };
        let validity = self.validity.as_ref().map(|bits| bits.slice(start, end));
        Column::from_parts(data, validity)
    }

    /// Gather rows by position. Positions may repeat.
    pub fn take(&self, indices: &[usize]) -> Result<Column> {
        if let Some(&bad) = indices.iter().find(|&&i| i >= self.len()) {
            return Err(Error::IndexOutOfBounds {
                index: bad,
                len: self.len(),
            });
        }
        Ok(self.gather_unchecked(indices))
    }

    /// Gather rows by position; `None` produces a null row.
    pub fn take_optional(&self, indices: &[Option<usize>]) -> Result<Column> {
        if let Some(bad) = indices.iter().flatten().find(|&&i| i >= self.len()) {
            return Err(Error::IndexOutOfBounds {
                index: *bad,
                len: self.len(),
            });
        }
        Ok(self.gather_optional_unchecked(indices))
    }

    pub(crate) fn gather_unchecked(&self, indices: &[usize]) -> Column {
        let positions: Vec<Option<usize>> = indices.iter().copied().map(Some).collect();
        self.gather_optional_unchecked(&positions)
    }

    fn gather_optional_unchecked(&self, positions: &[Option<usize>]) -> Column {
        let data = match &self.data {
            ColumnData::Float64(b) => ColumnData::Float64(Buffer::from_vec(gather(b, positions))),
            ColumnData::Int32(b) => ColumnData::Int32(Buffer::from_vec(gather(b, positions))),
            ColumnData::Boolean(b) => ColumnData::Boolean(Buffer::from_vec(gather(b, positions))),
            ColumnData::Date(b) => ColumnData::Date(Buffer::from_vec(gather(b, positions))),
            ColumnData::Utf8(v) => ColumnData::Utf8(gather(v, positions)),
            ColumnData::Object(v) => ColumnData::Object(
                positions
                    .iter()
                    .map(|p| p.map(|i| v[i].clone()).unwrap_or(Value::Null))
                    .collect(),
            ),
        };
        let needs_bitmap = self.validity.is_some() || positions.iter().any(Option::is_none);
        let validity = needs_bitmap.then(|| {
            positions
                .iter()
                .map(|p| p.map_or(false, |i| self.is_valid(i)))
                .collect()
        });
        Column::from_parts(data, validity)
    }

    /// Copy that shares no allocation with `self`.
    pub fn deep_clone(&self) -> Column {
        let data = match &self.data {
            ColumnData::Float64(b) => ColumnData::Float64(b.deep_clone()),
            ColumnData::Int32(b) => ColumnData::Int32(b.deep_clone()),
            ColumnData::Boolean(b) => ColumnData::Boolean(b.deep_clone()),
            ColumnData::Date(b) => ColumnData::Date(b.deep_clone()),
            ColumnData::Utf8(v) => ColumnData::Utf8(v.clone()),
            ColumnData::Object(v) => ColumnData::Object(v.clone()),
        };
        Column::from_parts(data, self.validity.clone())
    }

    /// Append `other` below `self`. Int32 and Float64 widen to Float64.
    pub fn concat(&self, other: &Column) -> Result<Column> {
        let (left, right) = match (self.data_type(), other.data_type()) {
            (a, b) if a == b => (self.clone(), other.clone()),
            (DataType::Int32, DataType::Float64) => (self.cast(DataType::Float64)?, other.clone()),
            (DataType::Float64, DataType::Int32) => (self.clone(), other.cast(DataType::Float64)?),
            (a, b) => {
                return Err(Error::ShapeMismatch(format!(
                    "cannot concatenate {} column with {} column",
                    a, b
                )))
            }
        };

        let validity = (left.validity.is_some() || right.validity.is_some()).then(|| {
            let mut bits = left
                .validity
                .clone()
                .unwrap_or_else(|| BitArray::all_set(left.len()));
            bits.extend(
                &right
                    .validity
                    .clone()
                    .unwrap_or_else(|| BitArray::all_set(right.len())),
            );
            bits
        });

        fn join<T: Clone>(a: &[T], b: &[T]) -> Vec<T> {
            let mut out = Vec::with_capacity(a.len() + b.len());
            out.extend_from_slice(a);
            out.extend_from_slice(b);
            out
        }

        let data = match (&left.data, &right.data) {
            (ColumnData::Float64(a), ColumnData::Float64(b)) => {
                ColumnData::Float64(Buffer::from_vec(join(a, b)))
            }
            (ColumnData::Int32(a), ColumnData::Int32(b)) => {
                ColumnData::Int32(Buffer::from_vec(join(a, b)))
            }
            (ColumnData::Boolean(a), ColumnData::Boolean(b)) => {
                ColumnData::Boolean(Buffer::from_vec(join(a, b)))
            }
            (ColumnData::Date(a), ColumnData::Date(b)) => {
                ColumnData::Date(Buffer::from_vec(join(a, b)))
            }
            (ColumnData::Utf8(a), ColumnData::Utf8(b)) => ColumnData::Utf8(join(a, b)),
            (ColumnData::Object(a), ColumnData::Object(b)) => ColumnData::Object(join(a, b)),
            _ => unreachable!("concat operands were unified to one type above"),
        };
        Ok(Column::from_parts(data, validity))
    }

    /// Convert to another logical type. Nulls stay null.
    pub fn cast(&self, dtype: DataType) -> Result<Column> {
        if dtype == self.data_type() {
            return Ok(self.clone());
        }
        let fail = || {
            Error::TypeMismatch(format!("cannot cast {} to {}", self.data_type(), dtype))
        };
        let values: Vec<Value> = match (self.data_type(), dtype) {
            (_, DataType::Object) => self.to_values(),
            (_, DataType::Utf8) => self
                .iter()
                .map(|v| match v {
                    Value::Null => Value::Null,
                    other => Value::Utf8(other.to_string()),
                })
                .collect(),
            (DataType::Int32, DataType::Float64) => self
                .iter()
                .map(|v| v.as_f64().map_or(Value::Null, Value::Float64))
                .collect(),
            (DataType::Float64, DataType::Int32) => self
                .iter()
                .map(|v| match v {
                    Value::Float64(x) if x.is_finite() => Value::Int32(x.trunc() as i32),
                    _ => Value::Null,
                })
                .collect(),
            (DataType::Boolean, DataType::Int32) => self
                .iter()
                .map(|v| v.as_bool().map_or(Value::Null, |b| Value::Int32(b as i32)))
                .collect(),
            (DataType::Boolean, DataType::Float64) => self
                .iter()
                .map(|v| {
                    v.as_bool()
                        .map_or(Value::Null, |b| Value::Float64(if b { 1.0 } else { 0.0 }))
                })
                .collect(),
            (DataType::Int32 | DataType::Float64, DataType::Boolean) => self
                .iter()
                .map(|v| v.as_f64().map_or(Value::Null, |x| Value::Boolean(x != 0.0)))
                .collect(),
            (DataType::Date, DataType::Float64) => self
                .iter()
                .map(|v| match v {
                    Value::Date(ms) => Value::Float64(ms as f64),
                    _ => Value::Null,
                })
                .collect(),
            (DataType::Float64 | DataType::Int32, DataType::Date) => self
                .iter()
                .map(|v| v.as_f64().map_or(Value::Null, |x| Value::Date(x as i64)))
                .collect(),
            _ => return Err(fail()),
        };
        Column::from_values_typed(dtype, values)
    }

    /// Overwrite one row in place. The backing buffer is copied first when
    /// it is shared with another column or view.
    pub fn set(&mut self, index: usize, value: Value) -> Result<()> {
        if index >= self.len() {
            return Err(Error::IndexOutOfBounds {
                index,
                len: self.len(),
            });
        }
        let dtype = self.data_type();
        let mismatch = |v: &Value| {
            Error::TypeMismatch(format!("cannot store '{}' in a {} column", v, dtype))
        };
        let is_null = value.is_null();
        match (&mut self.data, &value) {
            (_, Value::Null) => {}
            (ColumnData::Float64(b), v) => {
                b.make_mut()[index] = v.as_f64().ok_or_else(|| mismatch(v))?;
            }
            (ColumnData::Int32(b), Value::Int32(x)) => b.make_mut()[index] = *x,
            (ColumnData::Boolean(b), Value::Boolean(x)) => b.make_mut()[index] = *x,
            (ColumnData::Date(b), Value::Date(x)) => b.make_mut()[index] = *x,
            (ColumnData::Utf8(v), Value::Utf8(s)) => v[index] = s.clone(),
            (ColumnData::Object(v), other) => v[index] = other.clone(),
            (_, other) => return Err(mismatch(other)),
        }
        let mut bits = self
            .validity
            .take()
            .unwrap_or_else(|| BitArray::all_set(self.data.len()));
        bits.set(index, !is_null);
        if let (ColumnData::Object(v), true) = (&mut self.data, is_null) {
            v[index] = Value::Null;
        }
        let data = std::mem::replace(&mut self.data, ColumnData::Object(Vec::new()));
        *self = Column::from_parts(data, Some(bits));
        Ok(())
    }
}
