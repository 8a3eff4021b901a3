//! Expression trees.
//!
//! An [`Expr`] is an immutable description of a computation over the columns
//! of a table. Build one with [`col`], [`lit`] and the combinator methods,
//! then evaluate it against any table that has the referenced columns.
//!
//! ```ignore
//! use lightning_frame::expr::{col, lit};
//!
//! let adults = col("age").gt_eq(lit(18)).and(col("active"));
//! let filtered = table.filter(&adults)?;
//! ```

mod eval;
mod string;
mod temporal;

pub use string::StringExpr;
pub use temporal::TemporalExpr;

use std::fmt;

use crate::column::AggFunc;
use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

impl ArithOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            ArithOp::Add => "+",
            ArithOp::Sub => "-",
            ArithOp::Mul => "*",
            ArithOp::Div => "/",
            ArithOp::Rem => "%",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CmpOp {
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
}

impl CmpOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            CmpOp::Eq => "==",
            CmpOp::NotEq => "!=",
            CmpOp::Lt => "<",
            CmpOp::LtEq => "<=",
            CmpOp::Gt => ">",
            CmpOp::GtEq => ">=",
        }
    }

    /// The operator that gives the same answer with operands swapped.
    pub fn flip(&self) -> CmpOp {
        match self {
            CmpOp::Eq => CmpOp::Eq,
            CmpOp::NotEq => CmpOp::NotEq,
            CmpOp::Lt => CmpOp::Gt,
            CmpOp::LtEq => CmpOp::GtEq,
            CmpOp::Gt => CmpOp::Lt,
            CmpOp::GtEq => CmpOp::LtEq,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogicalOp {
    And,
    Or,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StringOp {
    Upper,
    Lower,
    Trim,
    Len,
    Contains(String),
    StartsWith(String),
    EndsWith(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DatePart {
    Year,
    Month,
    Day,
    /// 0 = Sunday through 6 = Saturday.
    Weekday,
    Hour,
    Minute,
    Second,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Column(String),
    Literal(Value),
    Binary {
        op: ArithOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Compare {
        op: CmpOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Logical {
        op: LogicalOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Not(Box<Expr>),
    IsNull(Box<Expr>),
    IsNotNull(Box<Expr>),
    FillNull {
        expr: Box<Expr>,
        value: Value,
    },
    Coalesce(Vec<Expr>),
    Str {
        op: StringOp,
        expr: Box<Expr>,
    },
    Temporal {
        part: DatePart,
        expr: Box<Expr>,
    },
    Agg {
        func: AggFunc,
        expr: Box<Expr>,
    },
    Alias {
        expr: Box<Expr>,
        name: String,
    },
}

pub fn col(name: impl Into<String>) -> Expr {
    Expr::Column(name.into())
}

pub fn lit(value: impl Into<Value>) -> Expr {
    Expr::Literal(value.into())
}

/// First non-null operand per row.
pub fn coalesce(exprs: Vec<Expr>) -> Expr {
    Expr::Coalesce(exprs)
}

macro_rules! binary_builders {
    ($variant:ident, $op_ty:ident, $($method:ident => $op:ident),+ $(,)?) => {
        $(
            pub fn $method(self, other: Expr) -> Expr {
                Expr::$variant {
                    op: $op_ty::$op,
                    left: Box::new(self),
                    right: Box::new(other),
                }
            }
        )+
    };
}

macro_rules! agg_builders {
    ($($method:ident => $func:ident),+ $(,)?) => {
        $(
            pub fn $method(self) -> Expr {
                Expr::Agg {
                    func: AggFunc::$func,
                    expr: Box::new(self),
                }
            }
        )+
    };
}

#[allow(clippy::should_implement_trait)]
impl Expr {
    binary_builders!(Binary, ArithOp,
        add => Add,
        sub => Sub,
        mul => Mul,
        div => Div,
        rem => Rem,
    );

    binary_builders!(Compare, CmpOp,
        eq => Eq,
        neq => NotEq,
        lt => Lt,
        lt_eq => LtEq,
        gt => Gt,
        gt_eq => GtEq,
    );

    binary_builders!(Logical, LogicalOp,
        and => And,
        or => Or,
    );

    agg_builders!(
        sum => Sum,
        mean => Mean,
        count => Count,
        count_distinct => CountDistinct,
        min => Min,
        max => Max,
        std => Std,
        first => First,
        last => Last,
        list => List,
        mode => Mode,
    );

    pub fn not(self) -> Expr {
        Expr::Not(Box::new(self))
    }

    pub fn is_null(self) -> Expr {
        Expr::IsNull(Box::new(self))
    }

    pub fn is_not_null(self) -> Expr {
        Expr::IsNotNull(Box::new(self))
    }

    pub fn fill_null(self, value: impl Into<Value>) -> Expr {
        Expr::FillNull {
            expr: Box::new(self),
            value: value.into(),
        }
    }

    pub fn agg(self, func: AggFunc) -> Expr {
        Expr::Agg {
            func,
            expr: Box::new(self),
        }
    }

    pub fn alias(self, name: impl Into<String>) -> Expr {
        Expr::Alias {
            expr: Box::new(self),
            name: name.into(),
        }
    }

    /// Name given to the evaluated series.
    pub fn output_name(&self) -> String {
        match self {
            Expr::Column(name) => name.clone(),
            Expr::Alias { name, .. } => name.clone(),
            Expr::Literal(_) => "literal".to_string(),
            Expr::Binary { left, .. }
            | Expr::Compare { left, .. }
            | Expr::Logical { left, .. } => left.output_name(),
            Expr::Not(expr)
            | Expr::IsNull(expr)
            | Expr::IsNotNull(expr)
            | Expr::FillNull { expr, .. }
            | Expr::Str { expr, .. }
            | Expr::Temporal { expr, .. }
            | Expr::Agg { expr, .. } => expr.output_name(),
            Expr::Coalesce(exprs) => exprs
                .first()
                .map_or_else(|| "coalesce".to_string(), Expr::output_name),
        }
    }

    /// Referenced column names, each once, in first-seen order.
    pub fn dependencies(&self) -> Vec<String> {
        let mut out = Vec::new();
        self.collect_dependencies(&mut out);
        out
    }

    fn collect_dependencies(&self, out: &mut Vec<String>) {
        match self {
            Expr::Column(name) => {
                if !out.iter().any(|seen| seen == name) {
                    out.push(name.clone());
                }
            }
            Expr::Literal(_) => {}
            Expr::Binary { left, right, .. }
            | Expr::Compare { left, right, .. }
            | Expr::Logical { left, right, .. } => {
                left.collect_dependencies(out);
                right.collect_dependencies(out);
            }
            Expr::Not(expr)
            | Expr::IsNull(expr)
            | Expr::IsNotNull(expr)
            | Expr::FillNull { expr, .. }
            | Expr::Str { expr, .. }
            | Expr::Temporal { expr, .. }
            | Expr::Agg { expr, .. }
            | Expr::Alias { expr, .. } => expr.collect_dependencies(out),
            Expr::Coalesce(exprs) => {
                for expr in exprs {
                    expr.collect_dependencies(out);
                }
            }
        }
    }

    /// Whether the tree reduces rows anywhere.
    pub fn contains_aggregate(&self) -> bool {
        match self {
            Expr::Agg { .. } => true,
            Expr::Column(_) | Expr::Literal(_) => false,
            Expr::Binary { left, right, .. }
            | Expr::Compare { left, right, .. }
            | Expr::Logical { left, right, .. } => {
                left.contains_aggregate() || right.contains_aggregate()
            }
            Expr::Not(expr)
            | Expr::IsNull(expr)
            | Expr::IsNotNull(expr)
            | Expr::FillNull { expr, .. }
            | Expr::Str { expr, .. }
            | Expr::Temporal { expr, .. }
            | Expr::Alias { expr, .. } => expr.contains_aggregate(),
            Expr::Coalesce(exprs) => exprs.iter().any(Expr::contains_aggregate),
        }
    }

    /// `Agg` over a plain column reference, looking through an alias.
    pub(crate) fn as_column_aggregate(&self) -> Option<(AggFunc, &str)> {
        match self {
            Expr::Alias { expr, .. } => expr.as_column_aggregate(),
            Expr::Agg { func, expr } => match expr.as_ref() {
                Expr::Column(name) => Some((*func, name.as_str())),
                _ => None,
            },
            _ => None,
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Column(name) => write!(f, "col({})", name),
            Expr::Literal(Value::Utf8(s)) => write!(f, "'{}'", s),
            Expr::Literal(v) => write!(f, "{}", v),
            Expr::Binary { op, left, right } => write!(f, "({} {} {})", left, op.symbol(), right),
            Expr::Compare { op, left, right } => write!(f, "({} {} {})", left, op.symbol(), right),
            Expr::Logical { op, left, right } => {
                let word = match op {
                    LogicalOp::And => "AND",
                    LogicalOp::Or => "OR",
                };
                write!(f, "({} {} {})", left, word, right)
            }
            Expr::Not(expr) => write!(f, "NOT {}", expr),
            Expr::IsNull(expr) => write!(f, "{}.is_null()", expr),
            Expr::IsNotNull(expr) => write!(f, "{}.is_not_null()", expr),
            Expr::FillNull { expr, value } => write!(f, "{}.fill_null({})", expr, value),
            Expr::Coalesce(exprs) => {
                f.write_str("coalesce(")?;
                for (i, expr) in exprs.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", expr)?;
                }
                f.write_str(")")
            }
            Expr::Str { op, expr } => write!(f, "{}.str.{:?}", expr, op),
            Expr::Temporal { part, expr } => write!(f, "{}.dt.{:?}", expr, part),
            Expr::Agg { func, expr } => write!(f, "{}({})", func.name(), expr),
            Expr::Alias { expr, name } => write!(f, "{} AS {}", expr, name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dependencies_dedup_in_order() {
        let expr = col("b").add(col("a")).mul(col("b")).gt(lit(1)).and(col("c").is_null());
        assert_eq!(expr.dependencies(), vec!["b", "a", "c"]);
        assert!(lit(1).dependencies().is_empty());
    }

    #[test]
    fn test_output_names() {
        assert_eq!(col("x").add(lit(1)).output_name(), "x");
        assert_eq!(col("x").sum().alias("total").output_name(), "total");
        assert_eq!(lit(1).output_name(), "literal");
    }

    #[test]
    fn test_column_aggregate_detection() {
        let expr = col("v").mean().alias("avg");
        assert_eq!(expr.as_column_aggregate(), Some((AggFunc::Mean, "v")));
        assert!(col("v").add(lit(1)).sum().as_column_aggregate().is_none());
        assert!(col("v").sum().add(lit(1)).contains_aggregate());
        assert!(!col("v").add(lit(1)).contains_aggregate());
    }

    #[test]
    fn test_display() {
        let expr = col("age").gt_eq(lit(18)).and(col("name").eq(lit("x")));
        assert_eq!(expr.to_string(), "((col(age) >= 18) AND (col(name) == 'x'))");
        assert_eq!(flip_roundtrip(CmpOp::Lt), CmpOp::Lt);
    }

    fn flip_roundtrip(op: CmpOp) -> CmpOp {
        op.flip().flip()
    }
}
