//! Error types for snapview.
//!
//! This module defines the error taxonomy using `thiserror`. Errors compose via
//! `?` and `From` conversions into [`AppError`] at the binary boundary.
//!
//! # Error Hierarchy
//!
//! - [`AppError`] - Top-level error of the diagnostic binary
//!   - [`SnapshotError`] - Snapshot dump loading failures
//!   - [`TableError`] - Structural inconsistencies of tables and filter references
//!   - [`DiffError`] - A diff could not be produced
//!   - [`SpecError`] - A persisted filter tree could not be restored
//!
//! # Recovery Strategy
//!
//! Lookup misses (unknown column names, unresolved links) are **not** errors:
//! they are `Option`s and the caller picks a fallback. Structural
//! inconsistencies are fatal for the table in question: a table with an
//! indeterminate row count must not be rendered. A view that fails to build its
//! display table shows zero rows together with a "no data" reason instead of
//! propagating the error.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error of the diagnostic binary.
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    /// Logging could not be initialized.
    #[error("Logging error: {0}")]
    Logging(#[from] crate::logging::LoggingError),

    /// A snapshot dump could not be loaded.
    #[error("Snapshot error: {0}")]
    Snapshot(#[from] SnapshotError),

    /// A table or filter is structurally inconsistent.
    #[error("Table error: {0}")]
    Table(#[from] TableError),

    /// A diff could not be produced.
    #[error("Diff error: {0}")]
    Diff(#[from] DiffError),

    /// A column named on the command line does not exist.
    ///
    /// **Recovery**: Display the available column names and exit.
    #[error("Unknown column '{column}' in table '{table}'")]
    UnknownColumn {
        /// Table that was searched.
        table: String,
        /// Column name that was not found.
        column: String,
    },

    /// A table named on the command line does not exist in the snapshot.
    #[error("Unknown table '{0}'")]
    UnknownTable(String),
}

/// Structural inconsistency of a table or of a filter's column references.
///
/// These are precondition violations: callers should not continue rendering a
/// table that produced one of them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TableError {
    /// A column's value count differs from the table's declared row count.
    ///
    /// **When this occurs**: While building a base table from loader output.
    #[error("Column '{column}' of table '{table}' has {actual} rows, expected {expected}")]
    RowCountMismatch {
        /// Table name.
        table: String,
        /// Offending column.
        column: String,
        /// Declared row count of the table.
        expected: usize,
        /// Number of values in the column.
        actual: usize,
    },

    /// Two columns of one table share a name.
    #[error("Duplicate column '{column}' in table '{table}'")]
    DuplicateColumn {
        /// Table name.
        table: String,
        /// Repeated column name.
        column: String,
    },

    /// A column's storage does not hold its declared value type.
    #[error("Column '{column}' of table '{table}' does not match its declared type")]
    TypeMismatch {
        /// Table name.
        table: String,
        /// Offending column.
        column: String,
    },

    /// A filter or sort level names a column the source table does not have.
    ///
    /// **When this occurs**: A persisted filter tree is applied to a table with a
    /// different schema, or a group filter lost its grouping column.
    #[error("Column {column} does not exist (table has {column_count} columns)")]
    ColumnOutOfRange {
        /// Requested column index.
        column: usize,
        /// Number of columns of the source table.
        column_count: usize,
    },
}

/// A diff between two tables could not be produced.
///
/// The engine never diffs partially: it either has two valid tables or
/// produces nothing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DiffError {
    /// One side of the diff is not open.
    ///
    /// **Recovery**: Show "diff unavailable" until both snapshots are open.
    #[error("Diff unavailable: {0}")]
    Unavailable(String),

    /// The named table is missing from one of the snapshots.
    #[error("Table '{table}' is missing from the {side} snapshot")]
    MissingTable {
        /// Requested table name.
        table: String,
        /// "first" or "second".
        side: &'static str,
    },

    /// The two tables share no column usable as a matching key.
    ///
    /// Cross-session diffs require structural `Key` columns; same-session diffs
    /// may also use `Identity` columns.
    #[error("Tables '{table}' share no key column to match rows on")]
    NoKeyColumns {
        /// Table name.
        table: String,
    },
}

/// A persisted filter tree could not be restored.
#[derive(Debug, Error)]
pub enum SpecError {
    /// A node references a sort that is not in its sort table.
    #[error("Filter spec references unknown sort #{0}")]
    UnknownSort(usize),

    /// The text is not valid JSON for a filter tree.
    #[error("Invalid filter spec: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors encountered while loading a snapshot dump.
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// The dump file could not be read.
    #[error("Failed to read snapshot at {path}: {source}")]
    Io {
        /// Path that failed to read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The dump is not valid JSON for a snapshot.
    #[error("Invalid snapshot JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// A cell does not fit its column's declared type.
    #[error("Value at row {row} of column '{column}' in table '{table}' does not fit its type")]
    InvalidValue {
        /// Table name.
        table: String,
        /// Column name.
        column: String,
        /// Row index.
        row: usize,
    },

    /// A table's default sort names a column it does not have.
    #[error("Default sort of table '{table}' names unknown column '{column}'")]
    UnknownSortColumn {
        /// Table name.
        table: String,
        /// Column name that was not found.
        column: String,
    },

    /// A loaded table violates a structural invariant.
    #[error(transparent)]
    Table(#[from] TableError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_count_mismatch_names_table_and_column() {
        let err = TableError::RowCountMismatch {
            table: "objects".into(),
            column: "Size".into(),
            expected: 3,
            actual: 2,
        };
        let msg = err.to_string();
        assert!(msg.contains("objects") && msg.contains("Size"));
    }

    #[test]
    fn table_error_converts_into_app_error() {
        fn build() -> Result<(), AppError> {
            Err(TableError::ColumnOutOfRange {
                column: 4,
                column_count: 2,
            })?;
            Ok(())
        }
        assert!(matches!(build(), Err(AppError::Table(_))));
    }

    #[test]
    fn diff_unavailable_message() {
        let err = DiffError::Unavailable("second snapshot is not open".into());
        assert_eq!(
            err.to_string(),
            "Diff unavailable: second snapshot is not open"
        );
    }
}
