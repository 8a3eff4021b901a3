//! The table container.
//!
//! A [`Table`] is an ordered set of equally long, uniquely named columns.
//! Columns are held through `Rc`, so structural operations (`select`,
//! `rename`, `with_column`, `head` on fixed-width data) hand the same
//! storage to the new table instead of copying it. Nothing mutates a shared
//! column: [`Table::column_mut`] copies first when the column is shared.

mod row;
mod sort;

pub use row::Row;
pub use sort::{SortColumn, SortDirection};

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use tracing::trace;

use crate::bitmap::BitArray;
use crate::column::Column;
use crate::expr::Expr;
use crate::groupby::GroupBy;
use crate::join::{self, JoinConfig, JoinType};
use crate::series::Series;
use crate::value::{DataType, Value};
use crate::{Error, Result};

#[derive(Debug, Clone, Default)]
pub struct Table {
    names: Vec<String>,
    columns: HashMap<String, Rc<Column>>,
    len: usize,
}

impl Table {
    /// A table with no columns and no rows.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_columns<S: Into<String>>(columns: Vec<(S, Column)>) -> Result<Self> {
        Self::from_shared(
            columns
                .into_iter()
                .map(|(name, column)| (name.into(), Rc::new(column)))
                .collect(),
        )
    }

    pub fn from_series(series: Vec<Series>) -> Result<Self> {
        Self::from_shared(
            series
                .into_iter()
                .map(|s| (s.name().to_string(), s.shared_column()))
                .collect(),
        )
    }

    pub(crate) fn from_shared(columns: Vec<(String, Rc<Column>)>) -> Result<Self> {
        let mut table = Table::new();
        for (i, (name, column)) in columns.into_iter().enumerate() {
            if table.columns.contains_key(&name) {
                return Err(Error::InvalidOperation(format!(
                    "duplicate column name '{}'",
                    name
                )));
            }
            if i == 0 {
                table.len = column.len();
            } else if column.len() != table.len {
                return Err(Error::ShapeMismatch(format!(
                    "column '{}' has {} rows but the table has {}",
                    name,
                    column.len(),
                    table.len
                )));
            }
            table.names.push(name.clone());
            table.columns.insert(name, column);
        }
        Ok(table)
    }

    /// Build a table from records. Columns appear in first-seen field order,
    /// missing fields are null and each column's type is inferred.
    pub fn from_rows(rows: &[Row]) -> Self {
        let mut names: Vec<String> = Vec::new();
        let mut seen: HashMap<&str, usize> = HashMap::new();
        for row in rows {
            for name in row.names() {
                if !seen.contains_key(name) {
                    seen.insert(name, names.len());
                    names.push(name.to_string());
                }
            }
        }
        let mut values: Vec<Vec<Value>> = vec![Vec::with_capacity(rows.len()); names.len()];
        for row in rows {
            for (slot, name) in values.iter_mut().zip(&names) {
                slot.push(row.get(name).cloned().unwrap_or(Value::Null));
            }
        }
        let columns = names
            .into_iter()
            .zip(values)
            .map(|(name, vals)| (name, Rc::new(Column::from_values(vals))))
            .collect();
        Table::new().with_shared_columns(columns, rows.len())
    }

    /// Callers guarantee unique names and columns of length `len`.
    fn with_shared_columns(mut self, columns: Vec<(String, Rc<Column>)>, len: usize) -> Self {
        self.len = if columns.is_empty() { 0 } else { len };
        for (name, column) in columns {
            self.names.push(name.clone());
            self.columns.insert(name, column);
        }
        self
    }

    /// Column names in order.
    pub fn columns(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn width(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    pub fn dtypes(&self) -> Vec<(String, DataType)> {
        self.iter_columns()
            .map(|(name, column)| (name.to_string(), column.data_type()))
            .collect()
    }

    pub fn column(&self, name: &str) -> Result<Series> {
        Ok(Series::from_shared(name, self.shared_column(name)?))
    }

    pub(crate) fn shared_column(&self, name: &str) -> Result<Rc<Column>> {
        self.columns
            .get(name)
            .cloned()
            .ok_or_else(|| Error::column_not_found(name, &self.names))
    }

    pub(crate) fn column_ref(&self, name: &str) -> Result<&Column> {
        self.columns
            .get(name)
            .map(|c| &**c)
            .ok_or_else(|| Error::column_not_found(name, &self.names))
    }

    /// Columns in order with their names.
    pub fn iter_columns(&self) -> impl Iterator<Item = (&str, &Column)> + '_ {
        self.names
            .iter()
            .filter_map(move |name| self.columns.get(name).map(|c| (name.as_str(), &**c)))
    }

    fn shared_columns(&self) -> impl Iterator<Item = (&String, &Rc<Column>)> + '_ {
        self.names
            .iter()
            .filter_map(move |name| self.columns.get(name).map(|c| (name, c)))
    }

    pub(crate) fn into_columns(mut self) -> Vec<(String, Rc<Column>)> {
        let names = std::mem::take(&mut self.names);
        names
            .into_iter()
            .filter_map(|name| self.columns.remove(&name).map(|c| (name, c)))
            .collect()
    }

    /// Whether another table or series holds the same column.
    pub fn is_shared(&self, name: &str) -> Result<bool> {
        let column = self
            .columns
            .get(name)
            .ok_or_else(|| Error::column_not_found(name, &self.names))?;
        Ok(Rc::strong_count(column) > 1)
    }

    /// Mutable access to one column, copying it first if it is shared.
    /// Writers must keep the column's length.
    pub fn column_mut(&mut self, name: &str) -> Result<&mut Column> {
        match self.columns.get_mut(name) {
            Some(column) => {
                if Rc::strong_count(column) > 1 {
                    trace!(column = name, "copying shared column before write");
                }
                Ok(Rc::make_mut(column))
            }
            None => Err(Error::column_not_found(name, &self.names)),
        }
    }

    pub fn select<S: AsRef<str>>(&self, names: &[S]) -> Result<Table> {
        let columns = names
            .iter()
            .map(|name| {
                let name = name.as_ref();
                Ok((name.to_string(), self.shared_column(name)?))
            })
            .collect::<Result<Vec<_>>>()?;
        Table::from_shared(columns)
    }

    pub fn drop_columns<S: AsRef<str>>(&self, names: &[S]) -> Result<Table> {
        for name in names {
            self.column_ref(name.as_ref())?;
        }
        let keep: Vec<&str> = self
            .names
            .iter()
            .map(String::as_str)
            .filter(|n| !names.iter().any(|d| d.as_ref() == *n))
            .collect();
        self.select(&keep)
    }

    pub fn rename(&self, old: &str, new: &str) -> Result<Table> {
        self.column_ref(old)?;
        if old != new && self.has_column(new) {
            return Err(Error::InvalidOperation(format!(
                "cannot rename '{}' to '{}': column already exists",
                old, new
            )));
        }
        let columns = self
            .shared_columns()
            .map(|(name, column)| {
                let name = if name == old { new.to_string() } else { name.clone() };
                (name, Rc::clone(column))
            })
            .collect();
        Table::from_shared(columns)
    }

    /// Replace or append one column. A single-row column is broadcast to
    /// the table length; every other column stays shared.
    pub fn with_column(&self, name: impl Into<String>, column: Column) -> Result<Table> {
        self.with_shared_column(name.into(), Rc::new(column))
    }

    fn with_shared_column(&self, name: String, column: Rc<Column>) -> Result<Table> {
        let column = if self.width() > 0 && column.len() == 1 && self.len != 1 {
            Rc::new(Column::full(&column.value_at(0), self.len))
        } else {
            column
        };
        if self.width() > 0 && column.len() != self.len {
            return Err(Error::ShapeMismatch(format!(
                "column '{}' has {} rows but the table has {}",
                name,
                column.len(),
                self.len
            )));
        }
        let mut table = self.clone();
        if !table.columns.contains_key(&name) {
            table.names.push(name.clone());
        }
        table.len = column.len();
        table.columns.insert(name, column);
        Ok(table)
    }

    pub fn with_column_expr(&self, name: impl Into<String>, expr: &Expr) -> Result<Table> {
        let series = expr.evaluate(self)?;
        self.with_shared_column(name.into(), series.shared_column())
    }

    /// Add a column computed row by row.
    pub fn with_column_fn<F>(&self, name: impl Into<String>, f: F) -> Result<Table>
    where
        F: Fn(&Row) -> Value,
    {
        let values: Vec<Value> = self.rows().map(|row| f(&row)).collect();
        self.with_column(name, Column::from_values(values))
    }

    fn map_columns(&self, len: usize, f: impl Fn(&Column) -> Result<Column>) -> Result<Table> {
        let columns = self
            .shared_columns()
            .map(|(name, column)| Ok((name.clone(), Rc::new(f(column)?))))
            .collect::<Result<Vec<_>>>()?;
        Ok(Table::new().with_shared_columns(columns, len))
    }

    pub fn head(&self, n: usize) -> Table {
        self.slice_unchecked(0, n.min(self.len))
    }

    pub fn tail(&self, n: usize) -> Table {
        self.slice_unchecked(self.len - n.min(self.len), self.len)
    }

    /// Rows `[start, end)`.
    pub fn slice(&self, start: usize, end: usize) -> Result<Table> {
        if end > self.len {
            return Err(Error::IndexOutOfBounds {
                index: end,
                len: self.len,
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

    fn slice_unchecked(&self, start: usize, end: usize) -> Table {
        let columns = self
            .shared_columns()
            .map(|(name, column)| (name.clone(), Rc::new(column.slice_unchecked(start, end))))
            .collect();
        Table::new().with_shared_columns(columns, end - start)
    }

    /// A copy whose columns share nothing with any other table.
    pub fn reify(&self) -> Table {
        let columns = self
            .shared_columns()
            .map(|(name, column)| (name.clone(), Rc::new(column.deep_clone())))
            .collect();
        Table::new().with_shared_columns(columns, self.len)
    }

    pub fn row(&self, index: usize) -> Result<Row> {
        if index >= self.len {
            return Err(Error::IndexOutOfBounds {
                index,
                len: self.len,
            });
        }
        Ok(self.row_unchecked(index))
    }

    fn row_unchecked(&self, index: usize) -> Row {
        let mut row = Row::with_capacity(self.width());
        for (name, column) in self.iter_columns() {
            row.push(name, column.value_at(index));
        }
        row
    }

    /// Lazily materialize each row.
    pub fn rows(&self) -> impl Iterator<Item = Row> + '_ {
        (0..self.len).map(move |i| self.row_unchecked(i))
    }

    pub fn to_rows(&self) -> Vec<Row> {
        self.rows().collect()
    }

    /// Keep rows where `predicate` is true; null counts as false.
    pub fn filter(&self, predicate: &Expr) -> Result<Table> {
        let series = predicate.evaluate(self)?;
        if series.len() != self.len {
            return Err(Error::ShapeMismatch(format!(
                "filter predicate produced {} rows for a table of {}",
                series.len(),
                self.len
            )));
        }
        let mask = series.column().to_mask()?;
        self.filter_mask(&mask)
    }

    pub fn filter_mask(&self, mask: &BitArray) -> Result<Table> {
        if mask.len() != self.len {
            return Err(Error::ShapeMismatch(format!(
                "filter mask has length {} but table has {} rows",
                mask.len(),
                self.len
            )));
        }
        self.map_columns(mask.count_ones(), |c| c.filter(mask))
    }

    pub fn take(&self, indices: &[usize]) -> Result<Table> {
        self.map_columns(indices.len(), |c| c.take(indices))
    }

    pub(crate) fn take_optional(&self, indices: &[Option<usize>]) -> Result<Table> {
        self.map_columns(indices.len(), |c| c.take_optional(indices))
    }

    /// Append the rows of `other`, which must have the same column names.
    pub fn concat(&self, other: &Table) -> Result<Table> {
        let same_names = self.width() == other.width()
            && self.names.iter().all(|n| other.has_column(n));
        if !same_names {
            return Err(Error::ShapeMismatch(format!(
                "cannot concatenate tables with columns [{}] and [{}]",
                self.names.join(", "),
                other.names.join(", ")
            )));
        }
        let columns = self
            .shared_columns()
            .map(|(name, column)| {
                let below = other.column_ref(name)?;
                Ok((name.clone(), Rc::new(column.concat(below)?)))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Table::new().with_shared_columns(columns, self.len + other.len))
    }

    pub fn sort_by(&self, keys: &[SortColumn]) -> Result<Table> {
        let order = sort::sort_indices(self, keys)?;
        self.take(&order)
    }

    pub fn join<S: AsRef<str>>(&self, right: &Table, keys: &[S], how: JoinType) -> Result<Table> {
        let config = JoinConfig {
            how,
            ..JoinConfig::default()
        };
        self.join_with(right, keys, &config)
    }

    pub fn join_with<S: AsRef<str>>(
        &self,
        right: &Table,
        keys: &[S],
        config: &JoinConfig,
    ) -> Result<Table> {
        let keys: Vec<&str> = keys.iter().map(AsRef::as_ref).collect();
        join::hash_join(self, right, &keys, config)
    }

    pub fn group_by<S: AsRef<str>>(&self, keys: &[S]) -> Result<GroupBy<'_>> {
        GroupBy::new(self, keys)
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.names.join(" | "))?;
        for row in self.rows() {
            let cells: Vec<String> = row.values().map(Value::to_string).collect();
            writeln!(f, "{}", cells.join(" | "))?;
        }
        write!(f, "[{} rows x {} columns]", self.len, self.width())
    }
}
