//! Errors shared by the expression, table and partition layers.

use thiserror::Error;

use crate::datum::Handle;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum CompileError {
    #[error("Failed to parse expression `{text}`: {reason}")]
    Parse { text: String, reason: String },

    #[error("Unknown column `{0}`")]
    UnknownColumn(String),

    #[error("Type mismatch: {0}")]
    TypeMismatch(String),

    #[error("Unsupported expression `{0}`")]
    Unsupported(String),

    #[error("Integer literal `{0}` is out of range")]
    IntegerOverflow(String),

    #[error("Expression `{0}` is not a constant")]
    NotConstant(String),

    #[error("Failed to fold constant expression `{text}`")]
    Fold {
        text: String,
        #[source]
        source: EvalError,
    },
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum EvalError {
    #[error("Truncated incorrect INTEGER value: `{0}`")]
    Coercion(String),

    #[error("Integer value is out of range in `{0}`")]
    Overflow(String),

    #[error("Division by zero")]
    DivisionByZero,

    #[error("Column offset `{offset}` is beyond row of width `{width}`")]
    ColumnOutOfRow { offset: usize, width: usize },
}

/// Errors of the generic table capability.
#[derive(Debug, Error)]
pub enum TableError {
    #[error("Duplicate entry `{entry}` for key `{key}`")]
    DuplicateKey { key: String, entry: String },

    #[error("Record with handle `{0}` is not found")]
    RecordNotFound(Handle),

    #[error("Row has `{actual}` columns, `{expected}` expected")]
    ColumnCountMismatch { expected: usize, actual: usize },

    #[error("Failed to initialize index `{0}`")]
    IndexInit(String),

    #[error("Failed to evaluate partition expression")]
    Evaluation(#[from] EvalError),

    #[error("Table has no partition for row {row}")]
    NoMatchingPartition { row: String },

    #[error("Record `{handle}` moved from partition `{from}` to `{to}` but failed to be removed from `{from}`")]
    CrossPartitionMigration {
        handle: Handle,
        from: i64,
        to: i64,
        #[source]
        source: Box<TableError>,
    },

    #[error("Internal error: `{0}`")]
    Internal(String),
}

/// Errors raised while loading a partitioned table.
#[derive(Debug, Error)]
pub enum PartitionError {
    #[error("Table `{0}` is not partitioned")]
    NotPartitioned(String),

    #[error("Table `{0}` has no partition definition")]
    EmptyDefinitions(String),

    #[error("Wrong table partition expression `{expr}`")]
    Compile {
        expr: String,
        #[source]
        source: CompileError,
    },

    #[error("VALUES LESS THAN value of partition `{partition}` must be strictly increasing")]
    NonMonotonicBoundary { partition: String },

    #[error("MAXVALUE can only be used in the last partition, found in `{partition}`")]
    MaxValueNotLast { partition: String },

    #[error("Failed to build partition")]
    Registry(#[from] TableError),
}
