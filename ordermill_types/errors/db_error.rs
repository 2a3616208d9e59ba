use serde::Serialize;
use thiserror::Error;

/// Kind of integrity constraint rejected by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ConstraintKind {
    Unique,
    ForeignKey,
    NotNull,
    Check,
}

/// Errors for db stuff.
#[derive(Debug, Error)]
pub enum DbError {
    #[error("{kind:?} constraint '{constraint}' violated: {detail}")]
    ConstraintViolation {
        constraint: String,
        kind: ConstraintKind,
        detail: String,
    },

    #[error("Column '{column}' expected {expected}, found {found}")]
    ColumnDecode {
        column: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("Column '{column}' has unsupported type {type_name}")]
    UnsupportedColumnType { column: String, type_name: String },

    #[error("Unknown table '{0}'")]
    UnknownTable(String),

    #[error("{0} must be set")]
    MissingDatabaseUrl(&'static str),

    #[error("Invalid statement: {0}")]
    InvalidStatement(String),

    #[error(transparent)]
    Database(#[from] sqlx::Error),

    #[error("Transaction error: {0}")]
    Transaction(String),
}
