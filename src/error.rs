use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Column '{name}' not found. Available columns: [{}]", available.join(", "))]
    ColumnNotFound { name: String, available: Vec<String> },

    #[error("Join key '{name}' not found in {side} table. Available columns: [{}]", available.join(", "))]
    JoinKeyNotFound {
        name: String,
        side: &'static str,
        available: Vec<String>,
    },

    #[error("Type mismatch: {0}")]
    TypeMismatch(String),

    #[error("Shape mismatch: {0}")]
    ShapeMismatch(String),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Row index {index} out of bounds: valid range is [0, {len})")]
    IndexOutOfBounds { index: usize, len: usize },

    #[error("Aggregation worker failed: {0}")]
    Worker(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Coarse error taxonomy shared by all variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    ColumnNotFound,
    TypeMismatch,
    ShapeMismatch,
    InvalidOperation,
    IndexOutOfBounds,
    Worker,
    Config,
}

impl Error {
    pub(crate) fn column_not_found<S: AsRef<str>>(name: &str, available: &[S]) -> Self {
        Error::ColumnNotFound {
            name: name.to_string(),
            available: available.iter().map(|s| s.as_ref().to_string()).collect(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::ColumnNotFound { .. } | Error::JoinKeyNotFound { .. } => {
                ErrorKind::ColumnNotFound
            }
            Error::TypeMismatch(_) => ErrorKind::TypeMismatch,
            Error::ShapeMismatch(_) => ErrorKind::ShapeMismatch,
            Error::InvalidOperation(_) => ErrorKind::InvalidOperation,
            Error::IndexOutOfBounds { .. } => ErrorKind::IndexOutOfBounds,
            Error::Worker(_) => ErrorKind::Worker,
            Error::Config(_) | Error::Io(_) => ErrorKind::Config,
        }
    }

    pub fn error_code(&self) -> i32 {
        match self {
            Error::ColumnNotFound { .. } => -1,
            Error::JoinKeyNotFound { .. } => -2,
            Error::TypeMismatch(_) => -3,
            Error::ShapeMismatch(_) => -4,
            Error::InvalidOperation(_) => -5,
            Error::IndexOutOfBounds { .. } => -6,
            Error::Worker(_) => -7,
            Error::Config(_) => -8,
            Error::Io(_) => -9,
        }
    }
}
