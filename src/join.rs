//! Hash join.
//!
//! The index is built over the right table's composite key and probed once
//! per left row. Key components compare by value: int32 and float64 keys
//! match when numerically equal, and a null component never matches.

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use tracing::debug;

use crate::column::{Column, ColumnData};
use crate::config::{JoinDefaults, DEFAULT_JOIN_SUFFIX};
use crate::table::Table;
use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JoinType {
    Inner,
    Left,
    Right,
    Outer,
}

impl FromStr for JoinType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "inner" => Ok(JoinType::Inner),
            "left" => Ok(JoinType::Left),
            "right" => Ok(JoinType::Right),
            "outer" | "full" => Ok(JoinType::Outer),
            other => Err(Error::InvalidOperation(format!(
                "unknown join type '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for JoinType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            JoinType::Inner => "inner",
            JoinType::Left => "left",
            JoinType::Right => "right",
            JoinType::Outer => "outer",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinConfig {
    pub how: JoinType,
    /// Appended to right-hand non-key columns whose name exists on the left.
    pub suffix: String,
}

impl Default for JoinConfig {
    fn default() -> Self {
        Self {
            how: JoinType::Inner,
            suffix: DEFAULT_JOIN_SUFFIX.to_string(),
        }
    }
}

impl JoinConfig {
    pub fn new(how: JoinType, defaults: &JoinDefaults) -> Self {
        Self {
            how,
            suffix: defaults.suffix.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum KeyPart {
    /// Numeric keys as normalized f64 bits.
    Number(u64),
    Text(String),
    Bool(bool),
    Date(i64),
    Other(String),
}

type CompositeKey = SmallVec<[KeyPart; 4]>;

fn number_bits(v: f64) -> u64 {
    if v == 0.0 {
        0.0f64.to_bits()
    } else if v.is_nan() {
        f64::NAN.to_bits()
    } else {
        v.to_bits()
    }
}

fn key_part(column: &Column, row: usize) -> Option<KeyPart> {
    if !column.is_valid(row) {
        return None;
    }
    Some(match column.data() {
        ColumnData::Float64(b) => KeyPart::Number(number_bits(b[row])),
        ColumnData::Int32(b) => KeyPart::Number(number_bits(b[row] as f64)),
        ColumnData::Utf8(v) => KeyPart::Text(v[row].clone()),
        ColumnData::Boolean(b) => KeyPart::Bool(b[row]),
        ColumnData::Date(b) => KeyPart::Date(b[row]),
        ColumnData::Object(v) => KeyPart::Other(v[row].to_json().to_string()),
    })
}

/// `None` when any component is null.
fn composite_key(columns: &[&Column], row: usize) -> Option<CompositeKey> {
    columns.iter().map(|c| key_part(c, row)).collect()
}

fn key_columns<'t>(table: &'t Table, keys: &[&str], side: &'static str) -> Result<Vec<&'t Column>> {
    keys.iter()
        .map(|&name| {
            table.column_ref(name).map_err(|_| Error::JoinKeyNotFound {
                name: name.to_string(),
                side,
                available: table.columns().to_vec(),
            })
        })
        .collect()
}

/// Row pairs `(left, right)` in output order.
fn match_rows(
    left_keys: &[&Column],
    right_keys: &[&Column],
    left_len: usize,
    right_len: usize,
    how: JoinType,
) -> Vec<(Option<usize>, Option<usize>)> {
    let mut index: HashMap<CompositeKey, Vec<usize>> = HashMap::new();
    for row in 0..right_len {
        if let Some(key) = composite_key(right_keys, row) {
            index.entry(key).or_default().push(row);
        }
    }

    let keep_unmatched_left = matches!(how, JoinType::Left | JoinType::Outer);
    let mut matched_right = vec![false; right_len];
    let mut pairs = Vec::with_capacity(left_len);
    for row in 0..left_len {
        let matches = composite_key(left_keys, row).and_then(|key| index.get(&key));
        match matches {
            Some(rows) => {
                for &r in rows {
                    pairs.push((Some(row), Some(r)));
                    matched_right[r] = true;
                }
            }
            None if keep_unmatched_left => pairs.push((Some(row), None)),
            None => {}
        }
    }

    if matches!(how, JoinType::Right | JoinType::Outer) {
        pairs.extend(
            matched_right
                .iter()
                .enumerate()
                .filter(|&(_, &m)| !m)
                .map(|(r, _)| (None, Some(r))),
        );
    }
    if how == JoinType::Right {
        pairs.sort_by_key(|&(_, r)| r);
    }
    pairs
}

/// Per row, the left value unless the row has no left side.
fn fill_from_right(left: &Column, right: &Column, pairs: &[(Option<usize>, Option<usize>)]) -> Column {
    let values = pairs
        .iter()
        .enumerate()
        .map(|(i, (l, _))| match l {
            Some(_) => left.value_at(i),
            None => right.value_at(i),
        })
        .collect();
    Column::from_values_with_hint(values, left.data_type())
}

pub(crate) fn hash_join(left: &Table, right: &Table, keys: &[&str], config: &JoinConfig) -> Result<Table> {
    if keys.is_empty() {
        return Err(Error::InvalidOperation(
            "join needs at least one key column".to_string(),
        ));
    }
    if config.suffix.is_empty() {
        return Err(Error::InvalidOperation(
            "join suffix must not be empty".to_string(),
        ));
    }
    let left_keys = key_columns(left, keys, "left")?;
    let right_keys = key_columns(right, keys, "right")?;

    let pairs = match_rows(&left_keys, &right_keys, left.len(), right.len(), config.how);
    let left_rows: Vec<Option<usize>> = pairs.iter().map(|(l, _)| *l).collect();
    let right_rows: Vec<Option<usize>> = pairs.iter().map(|(_, r)| *r).collect();

    let mut columns = left.take_optional(&left_rows)?.into_columns();
    if matches!(config.how, JoinType::Right | JoinType::Outer) {
        for (name, column) in columns.iter_mut() {
            if keys.contains(&name.as_str()) {
                let right_side = right.column_ref(name)?.take_optional(&right_rows)?;
                *column = Rc::new(fill_from_right(column, &right_side, &pairs));
            }
        }
    }

    let right_rest = right.drop_columns(keys)?.take_optional(&right_rows)?;
    for (name, column) in right_rest.into_columns() {
        let mut name = name;
        while columns.iter().any(|(taken, _)| *taken == name) {
            name.push_str(&config.suffix);
        }
        columns.push((name, column));
    }

    debug!(
        how = %config.how,
        left_rows = left.len(),
        right_rows = right.len(),
        output_rows = pairs.len(),
        "hash join"
    );
    Table::from_shared(columns)
}
