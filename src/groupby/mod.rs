//! Hash group-by.
//!
//! Rows are bucketed by the canonical encoding of their key values (see
//! [`key`]). Groups keep the order in which their first row appears, and
//! aggregate output lists one row per group in that order: the key columns
//! first, then one column per aggregation.

pub(crate) mod key;
pub mod parallel;
pub mod protocol;

use std::collections::HashMap;
use std::rc::Rc;

use tracing::debug;

use crate::column::{AggFunc, Column};
use crate::config::ParallelConfig;
use crate::expr::{col, Expr};
use crate::table::Table;
use crate::value::DataType;
use crate::{Error, Result};

/// A table partitioned by one or more key columns.
#[derive(Debug)]
pub struct GroupBy<'a> {
    table: &'a Table,
    keys: Vec<String>,
    groups: Vec<Vec<usize>>,
}

impl<'a> GroupBy<'a> {
    pub(crate) fn new<S: AsRef<str>>(table: &'a Table, keys: &[S]) -> Result<Self> {
        if keys.is_empty() {
            return Err(Error::InvalidOperation(
                "group_by needs at least one key column".to_string(),
            ));
        }
        let keys: Vec<String> = keys.iter().map(|k| k.as_ref().to_string()).collect();
        let columns = keys
            .iter()
            .map(|k| table.column_ref(k))
            .collect::<Result<Vec<_>>>()?;

        let mut lookup: HashMap<String, usize> = HashMap::new();
        let mut groups: Vec<Vec<usize>> = Vec::new();
        let mut buf = String::new();
        for row in 0..table.len() {
            key::row_key(&columns, row, &mut buf);
            match lookup.get(buf.as_str()) {
                Some(&group) => groups[group].push(row),
                None => {
                    lookup.insert(buf.clone(), groups.len());
                    groups.push(vec![row]);
                }
            }
        }
        debug!(rows = table.len(), keys = ?keys, groups = groups.len(), "grouped table");
        Ok(Self {
            table,
            keys,
            groups,
        })
    }

    pub fn table(&self) -> &Table {
        self.table
    }

    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    /// Row indices of each group, in first-seen group order.
    pub fn groups(&self) -> &[Vec<usize>] {
        &self.groups
    }

    pub fn num_groups(&self) -> usize {
        self.groups.len()
    }

    /// Key columns of the output: one row per group, original types.
    pub(crate) fn key_columns(&self) -> Result<Vec<(String, Rc<Column>)>> {
        let first_rows: Vec<usize> = self.groups.iter().map(|g| g[0]).collect();
        self.keys
            .iter()
            .map(|k| Ok((k.clone(), Rc::new(self.table.column_ref(k)?.take(&first_rows)?))))
            .collect()
    }

    /// Evaluate aggregate expressions once per group.
    pub fn agg<S: AsRef<str>>(&self, aggregations: &[(S, Expr)]) -> Result<Table> {
        let mut out = self.key_columns()?;
        for (name, expr) in aggregations {
            let column = self.aggregate_expr(expr)?;
            out.push((name.as_ref().to_string(), Rc::new(column)));
        }
        Table::from_shared(out)
    }

    /// `(column, method)` pairs, e.g. `("sales", "sum")`. Output columns are
    /// named after their source column.
    pub fn agg_shorthand<S: AsRef<str>, M: AsRef<str>>(
        &self,
        aggregations: &[(S, M)],
    ) -> Result<Table> {
        let exprs = aggregations
            .iter()
            .map(|(column, method)| {
                let func = AggFunc::from_shorthand(method.as_ref())?;
                Ok((column.as_ref().to_string(), col(column.as_ref()).agg(func)))
            })
            .collect::<Result<Vec<_>>>()?;
        self.agg(&exprs)
    }

    /// Key columns plus a `count` column with each group's size.
    pub fn count(&self) -> Result<Table> {
        let mut out = self.key_columns()?;
        let sizes = self
            .groups
            .iter()
            .map(|g| i32::try_from(g.len()).ok())
            .collect();
        out.push(("count".to_string(), Rc::new(Column::from_i32(sizes))));
        Table::from_shared(out)
    }

    /// Like [`GroupBy::agg`], spreading groups over worker threads when the
    /// table is large enough. Results are identical to the synchronous path.
    pub fn agg_parallel<S: AsRef<str>>(
        &self,
        aggregations: &[(S, Expr)],
        config: &ParallelConfig,
    ) -> Result<Table> {
        parallel::aggregate(self, aggregations, config)
    }

    fn aggregate_expr(&self, expr: &Expr) -> Result<Column> {
        if !expr.contains_aggregate() {
            return Err(Error::InvalidOperation(format!(
                "group aggregation {} does not reduce rows",
                expr
            )));
        }
        let dependencies = expr.dependencies();
        for name in &dependencies {
            self.table.column_ref(name)?;
        }

        if let Some((func, source)) = expr.as_column_aggregate() {
            let column = self.table.column_ref(source)?;
            let values = aggregate_groups(column, &self.groups, func)?;
            return Ok(Column::from_values_with_hint(
                values,
                func.output_type(column.data_type()),
            ));
        }

        // A key column keeps each group's row count when nothing else is read.
        let source = if dependencies.is_empty() {
            self.table.select(&self.keys[..1])?
        } else {
            self.table.select(&dependencies)?
        };
        let values = self
            .groups
            .iter()
            .map(|indices| expr.evaluate_scalar(&source.take(indices)?))
            .collect::<Result<Vec<_>>>()?;
        Ok(Column::from_values_with_hint(values, DataType::Float64))
    }
}

/// Apply one aggregate to each group of rows of `column`.
pub(crate) fn aggregate_groups(
    column: &Column,
    groups: &[Vec<usize>],
    func: AggFunc,
) -> Result<Vec<crate::value::Value>> {
    groups
        .iter()
        .map(|indices| column.take(indices)?.aggregate(func))
        .collect()
}
