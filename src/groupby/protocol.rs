//! Messages exchanged between the aggregation coordinator and its workers.
//!
//! Columns cross the thread boundary as flat, type-tagged buffers plus
//! packed validity words, so workers never touch the coordinator's
//! reference-counted storage.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::bitmap::BitArray;
use crate::column::{AggFunc, Buffer, Column, ColumnData};
use crate::value::{DataType, Value};
use crate::{Error, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SerializedBuffer {
    Float64(Vec<f64>),
    Int32(Vec<i32>),
    Boolean(Vec<bool>),
    Date(Vec<i64>),
    Utf8(Vec<String>),
}

impl SerializedBuffer {
    fn len(&self) -> usize {
        match self {
            SerializedBuffer::Float64(v) => v.len(),
            SerializedBuffer::Int32(v) => v.len(),
            SerializedBuffer::Boolean(v) => v.len(),
            SerializedBuffer::Date(v) => v.len(),
            SerializedBuffer::Utf8(v) => v.len(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializedColumn {
    pub dtype: DataType,
    pub buffer: SerializedBuffer,
    pub validity: Option<Vec<u64>>,
    pub len: usize,
}

impl SerializedColumn {
    /// Flatten a column. Object columns have no flat form.
    pub fn from_column(column: &Column) -> Result<Self> {
        let buffer = match column.data() {
            ColumnData::Float64(b) => SerializedBuffer::Float64(b.to_vec()),
            ColumnData::Int32(b) => SerializedBuffer::Int32(b.to_vec()),
            ColumnData::Boolean(b) => SerializedBuffer::Boolean(b.to_vec()),
            ColumnData::Date(b) => SerializedBuffer::Date(b.to_vec()),
            ColumnData::Utf8(v) => SerializedBuffer::Utf8(v.clone()),
            ColumnData::Object(_) => {
                return Err(Error::TypeMismatch(
                    "object columns cannot be sent to aggregation workers".to_string(),
                ))
            }
        };
        Ok(Self {
            dtype: column.data_type(),
            buffer,
            validity: column.validity().map(|bits| bits.as_words().to_vec()),
            len: column.len(),
        })
    }

    fn check_shape(&self) -> Result<()> {
        if self.buffer.len() != self.len {
            return Err(Error::ShapeMismatch(format!(
                "serialized buffer holds {} values but declares {}",
                self.buffer.len(),
                self.len
            )));
        }
        let carried = match self.buffer {
            SerializedBuffer::Float64(_) => DataType::Float64,
            SerializedBuffer::Int32(_) => DataType::Int32,
            SerializedBuffer::Boolean(_) => DataType::Boolean,
            SerializedBuffer::Date(_) => DataType::Date,
            SerializedBuffer::Utf8(_) => DataType::Utf8,
        };
        if carried != self.dtype {
            return Err(Error::TypeMismatch(format!(
                "serialized column declares {} but carries {} values",
                self.dtype, carried
            )));
        }
        if let Some(words) = &self.validity {
            let needed = self.len.div_ceil(64);
            if words.len() < needed {
                return Err(Error::ShapeMismatch(format!(
                    "bitmap of {} bits needs {} words, got {}",
                    self.len,
                    needed,
                    words.len()
                )));
            }
        }
        Ok(())
    }

    fn is_valid(&self, index: usize) -> bool {
        match &self.validity {
            Some(words) => words[index / 64] & (1u64 << (index % 64)) != 0,
            None => true,
        }
    }

    /// Build a local column from just the rows at `indices`, reading the
    /// shared buffer in place.
    pub fn gather(&self, indices: &[usize]) -> Result<Column> {
        self.check_shape()?;
        if let Some(&bad) = indices.iter().find(|&&i| i >= self.len) {
            return Err(Error::IndexOutOfBounds {
                index: bad,
                len: self.len,
            });
        }
        let data = match &self.buffer {
            SerializedBuffer::Float64(v) => ColumnData::Float64(Buffer::from_vec(pick(v, indices))),
            SerializedBuffer::Int32(v) => ColumnData::Int32(Buffer::from_vec(pick(v, indices))),
            SerializedBuffer::Boolean(v) => ColumnData::Boolean(Buffer::from_vec(pick(v, indices))),
            SerializedBuffer::Date(v) => ColumnData::Date(Buffer::from_vec(pick(v, indices))),
            SerializedBuffer::Utf8(v) => ColumnData::Utf8(pick(v, indices)),
        };
        let validity = self
            .validity
            .as_ref()
            .map(|_| indices.iter().map(|&i| self.is_valid(i)).collect::<BitArray>());
        Column::try_new(data, validity)
    }
}

fn pick<T: Clone>(values: &[T], indices: &[usize]) -> Vec<T> {
    indices.iter().map(|&i| values[i].clone()).collect()
}

/// Aggregates a worker knows how to compute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerAgg {
    Sum,
    Mean,
    Count,
    CountDistinct,
    Min,
    Max,
    Std,
    First,
    Last,
}

impl WorkerAgg {
    pub fn from_func(func: AggFunc) -> Option<Self> {
        match func {
            AggFunc::Sum => Some(WorkerAgg::Sum),
            AggFunc::Mean => Some(WorkerAgg::Mean),
            AggFunc::Count => Some(WorkerAgg::Count),
            AggFunc::CountDistinct => Some(WorkerAgg::CountDistinct),
            AggFunc::Min => Some(WorkerAgg::Min),
            AggFunc::Max => Some(WorkerAgg::Max),
            AggFunc::Std => Some(WorkerAgg::Std),
            AggFunc::First => Some(WorkerAgg::First),
            AggFunc::Last => Some(WorkerAgg::Last),
            AggFunc::List | AggFunc::Mode => None,
        }
    }

    pub fn func(self) -> AggFunc {
        match self {
            WorkerAgg::Sum => AggFunc::Sum,
            WorkerAgg::Mean => AggFunc::Mean,
            WorkerAgg::Count => AggFunc::Count,
            WorkerAgg::CountDistinct => AggFunc::CountDistinct,
            WorkerAgg::Min => AggFunc::Min,
            WorkerAgg::Max => AggFunc::Max,
            WorkerAgg::Std => AggFunc::Std,
            WorkerAgg::First => AggFunc::First,
            WorkerAgg::Last => AggFunc::Last,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggTask {
    pub source: String,
    pub kind: WorkerAgg,
}

/// One worker's share of the groups. `columns` is shared read-only by every
/// worker of a call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchMessage {
    pub columns: Arc<HashMap<String, SerializedColumn>>,
    /// `(original group position, row indices)`.
    pub groups: Vec<(usize, Vec<usize>)>,
    pub aggregations: Vec<(String, AggTask)>,
    pub key_columns: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupResult {
    pub position: usize,
    pub key_values: Vec<Value>,
    pub values: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerResponse {
    pub groups: Vec<GroupResult>,
}

impl DispatchMessage {
    fn shared_column(&self, name: &str) -> Result<&SerializedColumn> {
        self.columns.get(name).ok_or_else(|| {
            let mut available: Vec<&String> = self.columns.keys().collect();
            available.sort();
            Error::column_not_found(name, &available)
        })
    }

    /// Compute this message's groups. Runs on a worker thread and only
    /// materializes the rows of its own groups.
    pub fn execute(&self) -> Result<WorkerResponse> {
        let keys = self
            .key_columns
            .iter()
            .map(|name| self.shared_column(name))
            .collect::<Result<Vec<_>>>()?;
        let sources = self
            .aggregations
            .iter()
            .map(|(_, task)| Ok((self.shared_column(&task.source)?, task.kind.func())))
            .collect::<Result<Vec<_>>>()?;

        let mut groups = Vec::with_capacity(self.groups.len());
        for (position, indices) in &self.groups {
            let first = *indices.first().ok_or_else(|| {
                Error::Worker(format!("group {} has no rows", position))
            })?;
            let key_values = keys
                .iter()
                .map(|k| k.gather(&[first])?.get(0))
                .collect::<Result<Vec<_>>>()?;
            let values = sources
                .iter()
                .map(|(column, func)| column.gather(indices)?.aggregate(*func))
                .collect::<Result<Vec<_>>>()?;
            groups.push(GroupResult {
                position: *position,
                key_values,
                values,
            });
        }
        Ok(WorkerResponse { groups })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialized_column_rebuilds() {
        let column = Column::from_f64(vec![Some(1.0), None, Some(3.0)]);
        let flat = SerializedColumn::from_column(&column).unwrap();
        assert_eq!(flat.len, 3);
        assert!(flat.validity.is_some());
        let rebuilt = flat.gather(&[0, 1, 2]).unwrap();
        assert_eq!(rebuilt.to_values(), column.to_values());
    }

    #[test]
    fn test_rejects_bad_shape() {
        let mut flat = SerializedColumn::from_column(&Column::from_i32_slice(&[1, 2])).unwrap();
        flat.len = 5;
        assert!(flat.gather(&[0]).is_err());
        let objects = Column::from_objects(vec![Value::List(vec![])]);
        assert!(SerializedColumn::from_column(&objects).is_err());
    }

    #[test]
    fn test_gather_reads_selected_rows() {
        let column = Column::from_utf8(vec![Some("a"), None, Some("c"), Some("d")]);
        let flat = SerializedColumn::from_column(&column).unwrap();
        let picked = flat.gather(&[3, 1, 3]).unwrap();
        assert_eq!(
            picked.to_values(),
            vec![Value::from("d"), Value::Null, Value::from("d")]
        );
        assert!(matches!(
            flat.gather(&[4]).unwrap_err(),
            Error::IndexOutOfBounds { index: 4, len: 4 }
        ));

        let mut short = flat.clone();
        short.validity = Some(vec![]);
        assert!(short.gather(&[0]).is_err());
    }

    #[test]
    fn test_worker_vocabulary() {
        assert_eq!(WorkerAgg::from_func(AggFunc::Std), Some(WorkerAgg::Std));
        assert_eq!(WorkerAgg::from_func(AggFunc::Mode), None);
        assert_eq!(WorkerAgg::Mean.func(), AggFunc::Mean);
    }

    #[test]
    fn test_execute_message() {
        let mut columns = HashMap::new();
        columns.insert(
            "k".to_string(),
            SerializedColumn::from_column(&Column::from_utf8(vec![Some("a"), Some("b"), Some("a")]))
                .unwrap(),
        );
        columns.insert(
            "v".to_string(),
            SerializedColumn::from_column(&Column::from_i32_slice(&[1, 2, 3])).unwrap(),
        );
        let message = DispatchMessage {
            columns: Arc::new(columns),
            groups: vec![(0, vec![0, 2]), (1, vec![1])],
            aggregations: vec![(
                "total".to_string(),
                AggTask {
                    source: "v".to_string(),
                    kind: WorkerAgg::Sum,
                },
            )],
            key_columns: vec!["k".to_string()],
        };
        let response = message.execute().unwrap();
        assert_eq!(response.groups.len(), 2);
        assert_eq!(response.groups[0].key_values, vec![Value::from("a")]);
        assert_eq!(response.groups[0].values, vec![Value::Int32(4)]);
        assert_eq!(response.groups[1].position, 1);

        let json = serde_json::to_string(&response).unwrap();
        let back: WorkerResponse = serde_json::from_str(&json).unwrap();
        assert_eq!(back, response);
    }
}
