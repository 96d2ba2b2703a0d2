//! Batch import error types.

use sea_orm::DbErr;
use thiserror::Error;

/// Errors that abort a CSV import. Every variant leaves the store untouched.
#[derive(Error, Debug)]
pub enum ImportError {
    /// Upload buffer is empty or only whitespace.
    #[error("CSV file is empty")]
    EmptyInput,

    /// CSV reader rejected the payload.
    #[error("Failed to parse CSV: {0}")]
    Parse(String),

    /// Header present but no data rows.
    #[error("No valid records found in CSV")]
    NoRecords,

    /// A row failed hard validation.
    #[error("Row {row}: {reason}")]
    Validation { row: usize, reason: String },

    /// E-mails in the batch already belong to stored employees.
    #[error("The following emails already exist: {}", .0.join(", "))]
    Conflict(Vec<String>),

    /// Insert of a single row failed inside the transaction.
    #[error("Failed to create employee {email}: {source}")]
    Row {
        email: String,
        #[source]
        source: DbErr,
    },

    /// Upload rejected before parsing (name or content type).
    #[error("Invalid upload: {0}")]
    InvalidUpload(String),

    /// Upload exceeds the configured size limit.
    #[error("File too large: {size} bytes exceeds limit of {limit} bytes")]
    FileTooLarge { size: usize, limit: usize },

    /// Store failure outside a specific row (transaction, precheck, linking).
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

/// Result type for import operations.
pub type Result<T> = std::result::Result<T, ImportError>;

impl ImportError {
    /// Create a row validation error.
    pub fn validation(row: usize, reason: impl Into<String>) -> Self {
        Self::Validation {
            row,
            reason: reason.into(),
        }
    }
}
