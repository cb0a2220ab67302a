//! Base tables produced by the snapshot loader.

use super::column::{ColumnData, ColumnInfo};
use super::error::TableError;
use super::link::RowLink;
use super::ordering::SortLevel;
use super::table::{Table, TableUid};
use super::value::{Value, ValueType};
use std::collections::HashSet;

/// Immutable, column-oriented base table.
///
/// # Invariants
///
/// - Every column holds exactly `row_count` values
/// - Column names are unique
/// - Declared value types match the storage of each column
#[derive(Debug)]
pub struct DataTable {
    uid: TableUid,
    name: String,
    row_count: usize,
    columns: Vec<ColumnInfo>,
    data: Vec<ColumnData>,
    default_sort: Vec<SortLevel>,
}

impl DataTable {
    /// Build a table, validating the structural invariants.
    ///
    /// # Errors
    ///
    /// - [`TableError::RowCountMismatch`] if a column's length is not `row_count`
    /// - [`TableError::DuplicateColumn`] if two columns share a name
    /// - [`TableError::TypeMismatch`] if a column's storage disagrees with its declared type
    pub fn new(
        name: impl Into<String>,
        row_count: usize,
        columns: Vec<(ColumnInfo, ColumnData)>,
    ) -> Result<Self, TableError> {
        let name = name.into();
        let mut seen = HashSet::new();
        for (info, data) in &columns {
            if !seen.insert(info.name().to_string()) {
                return Err(TableError::DuplicateColumn {
                    table: name,
                    column: info.name().to_string(),
                });
            }
            if data.value_type() != info.value_type() {
                return Err(TableError::TypeMismatch {
                    table: name,
                    column: info.name().to_string(),
                });
            }
            if data.len() != row_count {
                return Err(TableError::RowCountMismatch {
                    table: name,
                    column: info.name().to_string(),
                    expected: row_count,
                    actual: data.len(),
                });
            }
        }
        let (columns, data) = columns.into_iter().unzip();
        Ok(Self {
            uid: TableUid::next(),
            name,
            row_count,
            columns,
            data,
            default_sort: Vec::new(),
        })
    }

    /// Table with the given columns and no rows.
    pub fn empty(name: impl Into<String>, columns: &[ColumnInfo]) -> Self {
        let data = columns
            .iter()
            .map(|c| match c.value_type() {
                ValueType::I32 => ColumnData::I32(Vec::new()),
                ValueType::I64 => ColumnData::I64(Vec::new()),
                ValueType::U32 => ColumnData::U32(Vec::new()),
                ValueType::U64 => ColumnData::U64(Vec::new()),
                ValueType::Str => ColumnData::Str(Vec::new()),
            })
            .collect();
        Self {
            uid: TableUid::next(),
            name: name.into(),
            row_count: 0,
            columns: columns.to_vec(),
            data,
            default_sort: Vec::new(),
        }
    }

    /// Attach the schema's suggested initial ordering.
    ///
    /// # Errors
    ///
    /// Returns [`TableError::ColumnOutOfRange`] if a level names a missing column.
    pub fn with_default_sort(mut self, levels: Vec<SortLevel>) -> Result<Self, TableError> {
        if let Some(level) = levels.iter().find(|l| l.column >= self.columns.len()) {
            return Err(TableError::ColumnOutOfRange {
                column: level.column,
                column_count: self.columns.len(),
            });
        }
        self.default_sort = levels;
        Ok(self)
    }
}

impl Table for DataTable {
    fn origin(&self) -> TableUid {
        self.uid
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn columns(&self) -> &[ColumnInfo] {
        &self.columns
    }

    fn row_count(&self) -> usize {
        self.row_count
    }

    fn cell(&self, row: usize, col: usize) -> Value {
        self.data[col].value(row)
    }

    fn default_sort(&self) -> &[SortLevel] {
        &self.default_sort
    }

    fn link_to(&self, row: usize) -> Option<RowLink> {
        (row < self.row_count).then_some(RowLink::Row {
            origin: self.uid,
            row,
        })
    }

    fn find_link(&self, link: &RowLink) -> Option<usize> {
        match *link {
            RowLink::Row { origin, row } if origin == self.uid && row < self.row_count => Some(row),
            _ => None,
        }
    }
}
