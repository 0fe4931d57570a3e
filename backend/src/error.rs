//! Error types for the campaign import pipeline.
//!
//! This module defines one error type per layer:
//!
//! - [`CsvError`] - tabular parsing errors
//! - [`StoreError`] - persisted store errors
//! - [`ArchiveError`] - bundle (zip) errors
//! - [`ImportError`] - structural errors that abort a whole import pass
//! - [`ServerError`] - HTTP layer errors
//!
//! Error conversion is automatic via `From` implementations,
//! allowing `?` to work across error boundaries.
//!
//! Row-level problems are not errors in this sense: they are collected as
//! [`crate::import::ImportIssue`] values and never abort a pass.

use thiserror::Error;

// =============================================================================
// CSV Parsing Errors
// =============================================================================

/// Errors during tabular parsing.
#[derive(Debug, Error)]
pub enum CsvError {
    /// Failed to read file.
    #[error("Failed to read file: {0}")]
    IoError(#[from] std::io::Error),

    /// Failed to decode the input bytes.
    #[error("Failed to decode content: {0}")]
    EncodingError(String),

    /// Invalid CSV format.
    #[error("Invalid CSV format at line {line}: {message}")]
    ParseError { line: usize, message: String },

    /// Empty file.
    #[error("CSV file is empty")]
    EmptyFile,

    /// No headers found.
    #[error("No headers found in CSV")]
    NoHeaders,
}

// =============================================================================
// Store Errors
// =============================================================================

/// Errors from the persisted campaign store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// SQLite failure (constraint, I/O, aborted statement...).
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// A looked-up entity does not exist.
    #[error("{entity} not found: {key}")]
    NotFound { entity: &'static str, key: String },

    /// A JSON column could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The store cannot be reached (poisoned lock, unopenable file).
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    pub fn not_found(entity: &'static str, key: impl Into<String>) -> Self {
        StoreError::NotFound {
            entity,
            key: key.into(),
        }
    }
}

// =============================================================================
// Archive Errors
// =============================================================================

/// Errors while expanding a bundle of tabular files.
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// The bundle is not a readable zip archive.
    #[error("Invalid archive: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// The bundle holds no entry with a tabular extension.
    #[error("Archive contains no tabular files")]
    NoTabularEntries,

    /// An entry decompresses past the configured size limit.
    #[error("Archive entry '{name}' exceeds {limit} bytes")]
    EntryTooLarge { name: String, limit: u64 },

    /// An entry could not be read.
    #[error("Failed to read archive entry: {0}")]
    Io(#[from] std::io::Error),
}

// =============================================================================
// Import Errors (structural / fatal)
// =============================================================================

/// Errors that abort an entire import pass.
///
/// Everything already written in the pass is rolled back when one of these
/// is raised inside the transaction.
#[derive(Debug, Error)]
pub enum ImportError {
    /// Tabular parsing failed.
    #[error("CSV error: {0}")]
    Csv(#[from] CsvError),

    /// The store failed or could not commit.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// The bundle could not be expanded.
    #[error("Archive error: {0}")]
    Archive(#[from] ArchiveError),

    /// The input has a header but no data rows.
    #[error("No rows to import")]
    EmptyInput,

    /// Required columns are absent from the header row.
    #[error("Missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),
}

// =============================================================================
// Server Errors
// =============================================================================

/// HTTP server errors.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Import error.
    #[error("Import error: {0}")]
    Import(#[from] ImportError),

    /// Store error outside of an import.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Invalid request.
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Server internal error.
    #[error("Internal server error: {0}")]
    Internal(String),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for CSV operations.
pub type CsvResult<T> = Result<T, CsvError>;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Result type for archive operations.
pub type ArchiveResult<T> = Result<T, ArchiveError>;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, ImportError>;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_conversion_chain() {
        // CsvError -> ImportError
        let csv_err = CsvError::EmptyFile;
        let import_err: ImportError = csv_err.into();
        assert!(import_err.to_string().contains("empty"));

        // StoreError -> ImportError
        let store_err = StoreError::not_found("Campaign", "c-1");
        let import_err: ImportError = store_err.into();
        assert!(import_err.to_string().contains("c-1"));

        // ImportError -> ServerError
        let server_err: ServerError = ImportError::EmptyInput.into();
        assert!(server_err.to_string().contains("No rows"));
    }

    #[test]
    fn test_missing_columns_format() {
        let err = ImportError::MissingColumns(vec!["campaign".into(), "ad group".into()]);
        let msg = err.to_string();
        assert!(msg.contains("campaign, ad group"));
    }

    #[test]
    fn test_parse_error_format() {
        let err = CsvError::ParseError {
            line: 5,
            message: "unterminated quote".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("line 5"));
        assert!(msg.contains("unterminated quote"));
    }
}
