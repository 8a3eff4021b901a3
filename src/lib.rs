//! In-memory columnar data frames: null-aware typed columns, an expression
//! language, hash group-by with an optional parallel path, and hash joins.

pub mod bitmap;
pub mod column;
pub mod config;
pub mod error;
pub mod expr;
pub mod groupby;
pub mod join;
pub mod logging;
pub mod series;
pub mod table;
pub mod value;

pub use bitmap::BitArray;
pub use column::{AggFunc, Column, ColumnData};
pub use config::{FrameConfig, JoinDefaults, ParallelConfig};
pub use error::{Error, ErrorKind, Result};
pub use expr::{coalesce, col, lit, Expr, StringExpr, TemporalExpr};
pub use groupby::GroupBy;
pub use join::{JoinConfig, JoinType};
pub use series::Series;
pub use table::{Row, SortColumn, SortDirection, Table};
pub use value::{DataType, Value};
