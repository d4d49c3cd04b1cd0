use thiserror::Error;

use crate::{sample::ShapeMismatch, statements::StatementKind};

/// Input that is not shaped like what the caller claimed it is. Nothing is
/// produced from it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StructuralError {
    #[error("Malformed document at byte {offset}: {reason}")]
    Codec { offset: usize, reason: &'static str },

    #[error("Sampled lines do not share the separator count of the first line")]
    ShapeSample,

    #[error("Line {line_number} has {found} separator(s), expected {expected}")]
    Shape {
        line_number: usize,
        expected: usize,
        found: usize,
    },
}

impl From<ShapeMismatch> for StructuralError {
    fn from(mismatch: ShapeMismatch) -> Self {
        StructuralError::Shape {
            line_number: mismatch.line + 1,
            expected: mismatch.expected,
            found: mismatch.found,
        }
    }
}

/// A well-formed request that cannot be honoured as asked.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Content is empty")]
    EmptyContent,

    #[error("Table name is empty")]
    EmptyTableName,

    #[error("First line does not describe any column")]
    NoColumns,

    #[error("Column '{0}' is declared more than once")]
    DuplicateColumn(String),

    #[error("Parameter '{param}' must be a non-negative integer, got '{value}'")]
    NotAnInteger { param: String, value: String },

    #[error("Missing parameter '{0}'")]
    MissingParam(String),

    #[error("Column index {index} is out of bounds for {count} column(s)")]
    ColumnOutOfRange { index: u32, count: usize },

    #[error("Table '{0}' not found")]
    UnknownTable(String),

    #[error("Column '{column}' not found in table '{table}'")]
    UnknownColumn { table: String, column: String },

    #[error("Row body does not name any column")]
    EmptyRow,

    #[error("Line {line_number} has {found} field(s), expected {expected}")]
    RowWidth {
        line_number: usize,
        expected: usize,
        found: usize,
    },
}

/// Failure reported by the storage collaborator for one statement.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct StorageError {
    message: String,
}

impl StorageError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        StorageError::new(err.to_string())
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Structural(#[from] StructuralError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The statement at `position` (0-based within the plan) failed; the
    /// statements after it were not executed.
    #[error("Statement {position} ({kind}) failed: {source}")]
    Storage {
        position: usize,
        kind: StatementKind,
        #[source]
        source: StorageError,
    },
}

impl Error {
    pub fn is_structural(&self) -> bool {
        matches!(self, Error::Structural(_))
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Error::Validation(_))
    }

    pub fn is_storage(&self) -> bool {
        matches!(self, Error::Storage { .. })
    }
}
