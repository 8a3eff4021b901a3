//! Multi-key stable sorting.

use std::cmp::Ordering;

use super::Table;
use crate::column::{Column, ColumnData};
use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

/// One sort key. Null placement does not depend on the direction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortColumn {
    pub column: String,
    pub direction: SortDirection,
    pub nulls_first: bool,
}

impl SortColumn {
    pub fn ascending(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            direction: SortDirection::Ascending,
            nulls_first: false,
        }
    }

    pub fn descending(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            direction: SortDirection::Descending,
            nulls_first: false,
        }
    }

    pub fn nulls_first(mut self, nulls_first: bool) -> Self {
        self.nulls_first = nulls_first;
        self
    }
}

fn compare_valid(column: &Column, a: usize, b: usize) -> Ordering {
    match column.data() {
        ColumnData::Float64(v) => v[a].total_cmp(&v[b]),
        ColumnData::Int32(v) => v[a].cmp(&v[b]),
        ColumnData::Utf8(v) => v[a].cmp(&v[b]),
        ColumnData::Boolean(v) => v[a].cmp(&v[b]),
        ColumnData::Date(v) => v[a].cmp(&v[b]),
        ColumnData::Object(_) => Ordering::Equal,
    }
}

/// Row order that sorts `table` by `keys`. Ties keep their original order.
pub(crate) fn sort_indices(table: &Table, keys: &[SortColumn]) -> Result<Vec<usize>> {
    let mut columns = Vec::with_capacity(keys.len());
    for key in keys {
        let column = table.column_ref(&key.column)?;
        if column.data_type() == crate::value::DataType::Object {
            return Err(Error::TypeMismatch(format!(
                "cannot sort by object column '{}'",
                key.column
            )));
        }
        columns.push((column, key));
    }

    let mut indices: Vec<usize> = (0..table.len()).collect();
    indices.sort_by(|&a, &b| {
        for (column, key) in &columns {
            let ord = match (column.is_valid(a), column.is_valid(b)) {
                (false, false) => Ordering::Equal,
                (false, true) if key.nulls_first => Ordering::Less,
                (false, true) => Ordering::Greater,
                (true, false) if key.nulls_first => Ordering::Greater,
                (true, false) => Ordering::Less,
                (true, true) => {
                    let ord = compare_valid(column, a, b);
                    match key.direction {
                        SortDirection::Ascending => ord,
                        SortDirection::Descending => ord.reverse(),
                    }
                }
            };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    });
    Ok(indices)
}
