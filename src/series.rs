//! A named column handle.

use std::fmt;
use std::rc::Rc;

use crate::column::Column;
use crate::value::{DataType, Value};
use crate::Result;

/// A column paired with a display name. The column is reference counted so
/// a series taken from a table shares storage with it.
#[derive(Debug, Clone)]
pub struct Series {
    name: String,
    column: Rc<Column>,
}

impl Series {
    pub fn new(name: impl Into<String>, column: Column) -> Self {
        Self {
            name: name.into(),
            column: Rc::new(column),
        }
    }

    pub(crate) fn from_shared(name: impl Into<String>, column: Rc<Column>) -> Self {
        Self {
            name: name.into(),
            column,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn column(&self) -> &Column {
        &self.column
    }

    pub(crate) fn shared_column(&self) -> Rc<Column> {
        Rc::clone(&self.column)
    }

    /// Take the column out, copying only if something else still holds it.
    pub fn into_column(self) -> Column {
        Rc::try_unwrap(self.column).unwrap_or_else(|shared| (*shared).clone())
    }

    pub fn len(&self) -> usize {
        self.column.len()
    }

    pub fn is_empty(&self) -> bool {
        self.column.is_empty()
    }

    pub fn data_type(&self) -> DataType {
        self.column.data_type()
    }

    pub fn null_count(&self) -> usize {
        self.column.null_count()
    }

    pub fn get(&self, index: usize) -> Result<Value> {
        self.column.get(index)
    }

    pub fn to_values(&self) -> Vec<Value> {
        self.column.to_values()
    }
}

impl fmt::Display for Series {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} ({}, {} rows)", self.name, self.data_type(), self.len())?;
        for value in self.column.iter() {
            writeln!(f, "  {}", value)?;
        }
        Ok(())
    }
}
