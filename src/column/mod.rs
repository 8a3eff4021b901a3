//! Typed, null-aware column storage.
//!
//! Every logical type has one storage representation in [`ColumnData`]. Null
//! slots keep a default placeholder in the typed buffer; the validity bitmap
//! is the single source of truth for nullness. A column without a bitmap has
//! no nulls.

mod aggregate;
mod buffer;
mod ops;

pub use aggregate::AggFunc;
pub use buffer::Buffer;

use crate::bitmap::BitArray;
use crate::value::{DataType, Value};
use crate::{Error, Result};

/// Backing storage, one variant per logical type.
#[derive(Debug, Clone)]
pub enum ColumnData {
    Float64(Buffer<f64>),
    Int32(Buffer<i32>),
    Utf8(Vec<String>),
    Boolean(Buffer<bool>),
    Date(Buffer<i64>),
    Object(Vec<Value>),
}

impl ColumnData {
    pub fn data_type(&self) -> DataType {
        match self {
            ColumnData::Float64(_) => DataType::Float64,
            ColumnData::Int32(_) => DataType::Int32,
            ColumnData::Utf8(_) => DataType::Utf8,
            ColumnData::Boolean(_) => DataType::Boolean,
            ColumnData::Date(_) => DataType::Date,
            ColumnData::Object(_) => DataType::Object,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            ColumnData::Float64(b) => b.len(),
            ColumnData::Int32(b) => b.len(),
            ColumnData::Utf8(v) => v.len(),
            ColumnData::Boolean(b) => b.len(),
            ColumnData::Date(b) => b.len(),
            ColumnData::Object(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A typed column with an optional validity bitmap.
///
/// `Clone` is shallow for fixed-width storage (the buffer allocation is
/// shared, never mutated without copying first). Use [`Column::deep_clone`]
/// for a copy that shares nothing.
#[derive(Debug, Clone)]
pub struct Column {
    data: ColumnData,
    validity: Option<BitArray>,
    null_count: usize,
}

impl Column {
    /// Assemble a column. A bitmap without unset bits is dropped.
    pub fn try_new(data: ColumnData, validity: Option<BitArray>) -> Result<Self> {
        if let Some(bits) = &validity {
            if bits.len() != data.len() {
                return Err(Error::ShapeMismatch(format!(
                    "validity bitmap has {} bits but column has {} values",
                    bits.len(),
                    data.len()
                )));
            }
        }
        Ok(Self::from_parts(data, validity))
    }

    /// Callers guarantee the bitmap length matches the data length.
    pub(crate) fn from_parts(data: ColumnData, validity: Option<BitArray>) -> Self {
        debug_assert!(validity.as_ref().map_or(true, |v| v.len() == data.len()));
        let validity = validity.filter(|bits| !bits.all());
        let null_count = validity.as_ref().map_or(0, BitArray::count_zeros);
        Self {
            data,
            validity,
            null_count,
        }
    }

    pub fn from_f64(values: Vec<Option<f64>>) -> Self {
        let validity = values.iter().map(Option::is_some).collect();
        let data = values.into_iter().map(|v| v.unwrap_or_default()).collect();
        Self::from_parts(ColumnData::Float64(Buffer::from_vec(data)), Some(validity))
    }

    pub fn from_i32(values: Vec<Option<i32>>) -> Self {
        let validity = values.iter().map(Option::is_some).collect();
        let data = values.into_iter().map(|v| v.unwrap_or_default()).collect();
        Self::from_parts(ColumnData::Int32(Buffer::from_vec(data)), Some(validity))
    }

    pub fn from_bool(values: Vec<Option<bool>>) -> Self {
        let validity = values.iter().map(Option::is_some).collect();
        let data = values.into_iter().map(|v| v.unwrap_or_default()).collect();
        Self::from_parts(ColumnData::Boolean(Buffer::from_vec(data)), Some(validity))
    }

    pub fn from_dates(values: Vec<Option<i64>>) -> Self {
        let validity = values.iter().map(Option::is_some).collect();
        let data = values.into_iter().map(|v| v.unwrap_or_default()).collect();
        Self::from_parts(ColumnData::Date(Buffer::from_vec(data)), Some(validity))
    }

    pub fn from_utf8<S: Into<String>>(values: Vec<Option<S>>) -> Self {
        let validity = values.iter().map(Option::is_some).collect();
        let data = values
            .into_iter()
            .map(|v| v.map(Into::into).unwrap_or_default())
            .collect();
        Self::from_parts(ColumnData::Utf8(data), Some(validity))
    }

    pub fn from_objects(values: Vec<Value>) -> Self {
        let validity = values.iter().map(|v| !v.is_null()).collect();
        Self::from_parts(ColumnData::Object(values), Some(validity))
    }

    /// Non-null slice of f64 values, no bitmap.
    pub fn from_f64_slice(values: &[f64]) -> Self {
        Self::from_parts(ColumnData::Float64(Buffer::from_vec(values.to_vec())), None)
    }

    pub fn from_i32_slice(values: &[i32]) -> Self {
        Self::from_parts(ColumnData::Int32(Buffer::from_vec(values.to_vec())), None)
    }

    /// Int32 sequence from `start` towards `end` (exclusive) by `step`.
    pub fn range(start: i32, end: i32, step: i32) -> Result<Self> {
        if step == 0 {
            return Err(Error::InvalidOperation("range step must not be zero".to_string()));
        }
        let stride = step.unsigned_abs() as usize;
        let values: Vec<i32> = if step > 0 {
            (start..end).step_by(stride).collect()
        } else {
            (end.saturating_add(1)..=start).rev().step_by(stride).collect()
        };
        if values.is_empty() {
            return Err(Error::InvalidOperation(format!(
                "empty range from {} to {} with step {}",
                start, end, step
            )));
        }
        Ok(Self::from_parts(ColumnData::Int32(Buffer::from_vec(values)), None))
    }

    /// An all-null column of the given type.
    pub fn nulls(dtype: DataType, len: usize) -> Self {
        let data = match dtype {
            DataType::Float64 => ColumnData::Float64(Buffer::from_vec(vec![0.0; len])),
            DataType::Int32 => ColumnData::Int32(Buffer::from_vec(vec![0; len])),
            DataType::Utf8 => ColumnData::Utf8(vec![String::new(); len]),
            DataType::Boolean => ColumnData::Boolean(Buffer::from_vec(vec![false; len])),
            DataType::Date => ColumnData::Date(Buffer::from_vec(vec![0; len])),
            DataType::Object => ColumnData::Object(vec![Value::Null; len]),
        };
        Self::from_parts(data, Some(BitArray::new(len)))
    }

    /// Broadcast a scalar to `len` rows. Null broadcasts as float64 nulls.
    pub fn full(value: &Value, len: usize) -> Self {
        match value {
            Value::Null => Self::nulls(DataType::Float64, len),
            Value::Float64(v) => {
                Self::from_parts(ColumnData::Float64(Buffer::from_vec(vec![*v; len])), None)
            }
            Value::Int32(v) => {
                Self::from_parts(ColumnData::Int32(Buffer::from_vec(vec![*v; len])), None)
            }
            Value::Utf8(s) => Self::from_parts(ColumnData::Utf8(vec![s.clone(); len]), None),
            Value::Boolean(b) => {
                Self::from_parts(ColumnData::Boolean(Buffer::from_vec(vec![*b; len])), None)
            }
            Value::Date(ms) => {
                Self::from_parts(ColumnData::Date(Buffer::from_vec(vec![*ms; len])), None)
            }
            other => Self::from_parts(ColumnData::Object(vec![other.clone(); len]), None),
        }
    }

    /// Infer the column type from the non-null values.
    ///
    /// Int32 mixed with Float64 widens to Float64; any other mix, lists and
    /// JSON values produce an object column. All-null input yields float64.
    pub fn from_values(values: Vec<Value>) -> Self {
        Self::from_values_with_hint(values, DataType::Float64)
    }

    /// Like [`Column::from_values`], using `hint` when every value is null.
    pub fn from_values_with_hint(values: Vec<Value>, hint: DataType) -> Self {
        let dtype = infer_type(&values).unwrap_or(hint);
        match Self::from_values_typed(dtype, values) {
            Ok(column) => column,
            // infer_type only returns types every value converts into.
            Err(_) => unreachable!("inferred column type rejected its own values"),
        }
    }

    /// Build a column of an explicit type. Int32 values widen into float64
    /// columns; every type converts into object.
    pub fn from_values_typed(dtype: DataType, values: Vec<Value>) -> Result<Self> {
        fn mismatch(dtype: DataType, value: &Value) -> Error {
            Error::TypeMismatch(format!(
                "cannot store {} value '{}' in a {} column",
                value.data_type().map_or("null", |t| t.name()),
                value,
                dtype
            ))
        }

        let column = match dtype {
            DataType::Float64 => {
                let mut out = Vec::with_capacity(values.len());
                for v in &values {
                    out.push(match v {
                        Value::Null => None,
                        Value::Float64(x) => Some(*x),
                        Value::Int32(x) => Some(*x as f64),
                        other => return Err(mismatch(dtype, other)),
                    });
                }
                Self::from_f64(out)
            }
            DataType::Int32 => {
                let mut out = Vec::with_capacity(values.len());
                for v in &values {
                    out.push(match v {
                        Value::Null => None,
                        Value::Int32(x) => Some(*x),
                        other => return Err(mismatch(dtype, other)),
                    });
                }
                Self::from_i32(out)
            }
            DataType::Boolean => {
                let mut out = Vec::with_capacity(values.len());
                for v in &values {
                    out.push(match v {
                        Value::Null => None,
                        Value::Boolean(x) => Some(*x),
                        other => return Err(mismatch(dtype, other)),
                    });
                }
                Self::from_bool(out)
            }
            DataType::Date => {
                let mut out = Vec::with_capacity(values.len());
                for v in &values {
                    out.push(match v {
                        Value::Null => None,
                        Value::Date(x) => Some(*x),
                        other => return Err(mismatch(dtype, other)),
                    });
                }
                Self::from_dates(out)
            }
            DataType::Utf8 => {
                let mut out = Vec::with_capacity(values.len());
                for v in values {
                    out.push(match v {
                        Value::Null => None,
                        Value::Utf8(s) => Some(s),
                        other => return Err(mismatch(dtype, &other)),
                    });
                }
                Self::from_utf8(out)
            }
            DataType::Object => Self::from_objects(values),
        };
        Ok(column)
    }

    pub fn data(&self) -> &ColumnData {
        &self.data
    }

    pub fn data_type(&self) -> DataType {
        self.data.data_type()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn null_count(&self) -> usize {
        self.null_count
    }

    pub fn validity(&self) -> Option<&BitArray> {
        self.validity.as_ref()
    }

    #[inline]
    pub fn is_valid(&self, index: usize) -> bool {
        self.validity.as_ref().map_or(true, |bits| bits.get(index))
    }

    #[inline]
    pub fn is_null(&self, index: usize) -> bool {
        !self.is_valid(index)
    }

    pub fn get(&self, index: usize) -> Result<Value> {
        if index >= self.len() {
            return Err(Error::IndexOutOfBounds {
                index,
                len: self.len(),
            });
        }
        Ok(self.value_at(index))
    }

    /// Read a value; `index` must be in bounds.
    pub(crate) fn value_at(&self, index: usize) -> Value {
        if !self.is_valid(index) {
            return Value::Null;
        }
        match &self.data {
            ColumnData::Float64(b) => Value::Float64(b[index]),
            ColumnData::Int32(b) => Value::Int32(b[index]),
            ColumnData::Utf8(v) => Value::Utf8(v[index].clone()),
            ColumnData::Boolean(b) => Value::Boolean(b[index]),
            ColumnData::Date(b) => Value::Date(b[index]),
            ColumnData::Object(v) => v[index].clone(),
        }
    }

    /// Numeric view of row `index`: `None` for nulls and non-numeric types.
    #[inline]
    pub(crate) fn f64_at(&self, index: usize) -> Option<f64> {
        if !self.is_valid(index) {
            return None;
        }
        match &self.data {
            ColumnData::Float64(b) => Some(b[index]),
            ColumnData::Int32(b) => Some(b[index] as f64),
            _ => None,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = Value> + '_ {
        (0..self.len()).map(move |i| self.value_at(i))
    }

    pub fn to_values(&self) -> Vec<Value> {
        self.iter().collect()
    }

    /// Non-null values as f64. Fails for non-numeric columns.
    pub fn f64_values(&self) -> Result<Vec<f64>> {
        match &self.data {
            ColumnData::Float64(b) => Ok(self.valid_indices().map(|i| b[i]).collect()),
            ColumnData::Int32(b) => Ok(self.valid_indices().map(|i| b[i] as f64).collect()),
            _ => Err(Error::TypeMismatch(format!(
                "expected a numeric column, found {}",
                self.data_type()
            ))),
        }
    }

    pub fn as_str_slice(&self) -> Result<&[String]> {
        match &self.data {
            ColumnData::Utf8(v) => Ok(v),
            _ => Err(Error::TypeMismatch(format!(
                "expected a utf8 column, found {}",
                self.data_type()
            ))),
        }
    }

    pub(crate) fn valid_indices(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.len()).filter(move |&i| self.is_valid(i))
    }

    /// Convert a boolean column into a selection mask; nulls select nothing.
    pub fn to_mask(&self) -> Result<BitArray> {
        match &self.data {
            ColumnData::Boolean(b) => Ok((0..b.len()).map(|i| b[i] && self.is_valid(i)).collect()),
            _ => Err(Error::TypeMismatch(format!(
                "filter predicate must be bool, found {}",
                self.data_type()
            ))),
        }
    }

    /// Whether both columns view the same fixed-width allocation.
    pub fn shares_buffer_with(&self, other: &Column) -> bool {
        match (&self.data, &other.data) {
            (ColumnData::Float64(a), ColumnData::Float64(b)) => a.shares_allocation(b),
            (ColumnData::Int32(a), ColumnData::Int32(b)) => a.shares_allocation(b),
            (ColumnData::Boolean(a), ColumnData::Boolean(b)) => a.shares_allocation(b),
            (ColumnData::Date(a), ColumnData::Date(b)) => a.shares_allocation(b),
            _ => false,
        }
    }
}

fn infer_type(values: &[Value]) -> Option<DataType> {
    let mut inferred: Option<DataType> = None;
    for value in values {
        let Some(dtype) = value.data_type() else {
            continue;
        };
        inferred = Some(match (inferred, dtype) {
            (None, t) => t,
            (Some(a), b) if a == b => a,
            (Some(DataType::Int32), DataType::Float64)
            | (Some(DataType::Float64), DataType::Int32) => DataType::Float64,
            _ => return Some(DataType::Object),
        });
    }
    inferred
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_count_matches_bitmap() {
        let col = Column::from_f64(vec![Some(1.0), None, Some(3.0), None]);
        assert_eq!(col.null_count(), 2);
        assert_eq!(col.validity().unwrap().count_zeros(), 2);
        assert_eq!(col.get(1).unwrap(), Value::Null);
        assert_eq!(col.get(2).unwrap(), Value::Float64(3.0));
    }

    #[test]
    fn test_no_nulls_drops_bitmap() {
        let col = Column::from_i32(vec![Some(1), Some(2)]);
        assert!(col.validity().is_none());
        assert_eq!(col.null_count(), 0);
    }

    #[test]
    fn test_get_out_of_range() {
        let col = Column::from_utf8(vec![Some("a")]);
        let err = col.get(1).unwrap_err();
        assert!(matches!(err, Error::IndexOutOfBounds { index: 1, len: 1 }));
    }

    #[test]
    fn test_infer_types() {
        let col = Column::from_values(vec![Value::Int32(1), Value::Float64(2.5), Value::Null]);
        assert_eq!(col.data_type(), DataType::Float64);
        assert_eq!(col.get(0).unwrap(), Value::Float64(1.0));

        let mixed = Column::from_values(vec![Value::Int32(1), Value::from("a")]);
        assert_eq!(mixed.data_type(), DataType::Object);

        let empty = Column::from_values_with_hint(vec![Value::Null], DataType::Utf8);
        assert_eq!(empty.data_type(), DataType::Utf8);
        assert_eq!(empty.null_count(), 1);
    }

    #[test]
    fn test_typed_rejects_mismatch() {
        let err = Column::from_values_typed(DataType::Int32, vec![Value::from("x")]).unwrap_err();
        assert!(matches!(err, Error::TypeMismatch(_)));
    }

    #[test]
    fn test_range() {
        let up = Column::range(0, 10, 3).unwrap();
        assert_eq!(up.to_values(), vec![Value::Int32(0), Value::Int32(3), Value::Int32(6), Value::Int32(9)]);
        let down = Column::range(10, 0, -4).unwrap();
        assert_eq!(down.to_values(), vec![Value::Int32(10), Value::Int32(6), Value::Int32(2)]);
        assert!(matches!(Column::range(0, 5, 0).unwrap_err(), Error::InvalidOperation(_)));
        assert!(matches!(Column::range(5, 5, 1).unwrap_err(), Error::InvalidOperation(_)));
        assert!(Column::range(0, 5, -1).is_err());
    }

    #[test]
    fn test_to_mask_treats_null_as_false() {
        let col = Column::from_bool(vec![Some(true), None, Some(false), Some(true)]);
        let mask = col.to_mask().unwrap();
        assert_eq!(mask.iter().collect::<Vec<_>>(), vec![true, false, false, true]);
        assert!(Column::from_i32_slice(&[1]).to_mask().is_err());
    }
}
