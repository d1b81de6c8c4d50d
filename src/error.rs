use std::path::PathBuf;

use thiserror::Error;

/// Every failure a single analysis run can surface.
///
/// Each variant maps to a process exit code so the binary can report which
/// stage aborted without parsing the message.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("configuration error: {message}")]
    Config { message: String },

    #[error("failed to read '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed CSV '{}': {message}", path.display())]
    Csv { path: PathBuf, message: String },

    #[error("column not found: `{column}`")]
    ColumnNotFound { column: String },

    #[error("dimension mismatch in {context}: expected {expected}, found {found}")]
    DimensionMismatch {
        context: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("column `{column}` has zero range (min == max)")]
    DegenerateColumn { column: String },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("{model} fit did not converge: {reason}")]
    FitDidNotConverge { model: &'static str, reason: String },

    #[error("clustering hit the iteration cap ({iterations}) without converging")]
    IterationCapReached { iterations: usize },

    #[error("export failed: {0}")]
    Export(String),
}

impl AppError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn column_not_found(column: impl Into<String>) -> Self {
        Self::ColumnNotFound {
            column: column.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        match self {
            AppError::Config { .. } | AppError::Io { .. } | AppError::Csv { .. } => 2,
            AppError::ColumnNotFound { .. } => 3,
            AppError::DimensionMismatch { .. }
            | AppError::DegenerateColumn { .. }
            | AppError::InvalidInput(_) => 4,
            AppError::FitDidNotConverge { .. } | AppError::IterationCapReached { .. } => 5,
            AppError::Export(_) => 6,
        }
    }
}
