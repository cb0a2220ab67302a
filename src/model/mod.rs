//! Domain model types.
//!
//! Values, columns, the [`Table`] trait, row links, base tables and loaded
//! snapshots. Everything here is immutable once constructed; derived tables
//! live in [`crate::filter`] and [`crate::diff`].

pub mod column;
pub mod data_table;
pub mod error;
pub mod link;
pub mod ordering;
pub mod snapshot;
pub mod table;
pub mod value;

// Re-export for convenience
pub use column::{
    format_bytes, Column, ColumnData, ColumnInfo, ColumnRole, PlainFormatter, SizeFormatter,
    ValueFormatter,
};
pub use data_table::DataTable;
pub use error::{AppError, DiffError, SnapshotError, SpecError, TableError};
pub use link::RowLink;
pub use ordering::{SortDirection, SortLevel};
pub use snapshot::{Snapshot, SnapshotPair};
pub use table::{CellExpandState, Table, TableRef, TableUid};
pub use value::{NumericWidth, Value, ValueType};
