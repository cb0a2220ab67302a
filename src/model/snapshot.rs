//! Loaded snapshots and the registry that owns them.
//!
//! The on-disk capture format belongs to the capture tooling; this module only
//! reads a JSON dump of already-crunched columns:
//!
//! ```json
//! {
//!   "session_id": "editor-1",
//!   "captured_at": "2025-01-01T10:00:00Z",
//!   "tables": [{
//!     "name": "objects",
//!     "default_sort": [{ "column": "Size", "direction": "descending" }],
//!     "columns": [
//!       { "name": "Type", "type": "str", "role": "key", "values": ["Texture2D"] },
//!       { "name": "Size", "type": "u64", "role": "size", "values": [1024] }
//!     ]
//!   }]
//! }
//! ```

use super::column::{ColumnData, ColumnInfo, ColumnRole};
use super::data_table::DataTable;
use super::error::{DiffError, SnapshotError};
use super::ordering::{SortDirection, SortLevel};
use super::table::{Table, TableRef};
use super::value::ValueType;
use crate::diff::{DiffSchema, DiffTable};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::rc::Rc;
use tracing::{debug, info};

#[derive(Debug, Deserialize)]
struct SnapshotDump {
    session_id: String,
    captured_at: DateTime<Utc>,
    tables: Vec<TableDump>,
}

#[derive(Debug, Deserialize)]
struct TableDump {
    name: String,
    #[serde(default)]
    default_sort: Vec<SortLevelDump>,
    columns: Vec<ColumnDump>,
}

#[derive(Debug, Deserialize)]
struct SortLevelDump {
    column: String,
    direction: SortDirection,
}

#[derive(Debug, Deserialize)]
struct ColumnDump {
    name: String,
    #[serde(rename = "type")]
    value_type: ValueType,
    #[serde(default)]
    role: ColumnRole,
    values: Vec<serde_json::Value>,
}

/// One captured snapshot: a set of named, immutable base tables.
#[derive(Debug, Clone)]
pub struct Snapshot {
    session_id: String,
    captured_at: DateTime<Utc>,
    tables: BTreeMap<String, TableRef>,
}

impl Snapshot {
    /// Create a snapshot from already-built tables.
    pub fn new(
        session_id: impl Into<String>,
        captured_at: DateTime<Utc>,
        tables: impl IntoIterator<Item = TableRef>,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            captured_at,
            tables: tables
                .into_iter()
                .map(|t| (t.name().to_string(), t))
                .collect(),
        }
    }

    /// Load a snapshot dump from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError`] if the file cannot be read or holds an invalid dump.
    pub fn load(path: &Path) -> Result<Self, SnapshotError> {
        let contents = std::fs::read_to_string(path).map_err(|source| SnapshotError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let snapshot = Self::from_json_str(&contents)?;
        info!(
            path = %path.display(),
            session = %snapshot.session_id,
            tables = snapshot.tables.len(),
            "Snapshot loaded"
        );
        Ok(snapshot)
    }

    /// Parse a snapshot dump.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError`] on malformed JSON, values that do not fit
    /// their column type, or structurally inconsistent tables.
    pub fn from_json_str(json: &str) -> Result<Self, SnapshotError> {
        let dump: SnapshotDump = serde_json::from_str(json)?;
        let tables = dump
            .tables
            .into_iter()
            .map(build_table)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(dump.session_id, dump.captured_at, tables))
    }

    /// Capture session identifier.
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Capture time.
    pub fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }

    /// Table named `name`, `None` if absent.
    pub fn table(&self, name: &str) -> Option<TableRef> {
        self.tables.get(name).cloned()
    }

    /// Names of all tables, sorted.
    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }
}

fn build_table(dump: TableDump) -> Result<TableRef, SnapshotError> {
    let row_count = dump.columns.first().map_or(0, |c| c.values.len());
    let mut columns = Vec::with_capacity(dump.columns.len());
    for column in &dump.columns {
        let data = convert_values(&dump.name, column)?;
        let info = ColumnInfo::new(column.name.clone(), column.value_type).with_role(column.role);
        columns.push((info, data));
    }
    let mut levels = Vec::with_capacity(dump.default_sort.len());
    for level in &dump.default_sort {
        let column = dump
            .columns
            .iter()
            .position(|c| c.name == level.column)
            .ok_or_else(|| SnapshotError::UnknownSortColumn {
                table: dump.name.clone(),
                column: level.column.clone(),
            })?;
        levels.push(SortLevel::new(column, level.direction));
    }
    let table = DataTable::new(dump.name, row_count, columns)?.with_default_sort(levels)?;
    debug!(table = %table.name(), rows = row_count, "Table built");
    Ok(Rc::new(table))
}

fn convert_values(table: &str, column: &ColumnDump) -> Result<ColumnData, SnapshotError> {
    let invalid = |row: usize| SnapshotError::InvalidValue {
        table: table.to_string(),
        column: column.name.clone(),
        row,
    };
    let values = column.values.iter().enumerate();
    let data = match column.value_type {
        ValueType::I32 => ColumnData::I32(
            values
                .map(|(row, v)| {
                    v.as_i64()
                        .and_then(|n| i32::try_from(n).ok())
                        .ok_or_else(|| invalid(row))
                })
                .collect::<Result<_, _>>()?,
        ),
        ValueType::I64 => ColumnData::I64(
            values
                .map(|(row, v)| v.as_i64().ok_or_else(|| invalid(row)))
                .collect::<Result<_, _>>()?,
        ),
        ValueType::U32 => ColumnData::U32(
            values
                .map(|(row, v)| {
                    v.as_u64()
                        .and_then(|n| u32::try_from(n).ok())
                        .ok_or_else(|| invalid(row))
                })
                .collect::<Result<_, _>>()?,
        ),
        ValueType::U64 => ColumnData::U64(
            values
                .map(|(row, v)| v.as_u64().ok_or_else(|| invalid(row)))
                .collect::<Result<_, _>>()?,
        ),
        ValueType::Str => ColumnData::Str(
            values
                .map(|(row, v)| match v {
                    serde_json::Value::String(s) => Ok(Rc::from(s.as_str())),
                    serde_json::Value::Null => Ok(Rc::from("")),
                    _ => Err(invalid(row)),
                })
                .collect::<Result<_, _>>()?,
        ),
    };
    Ok(data)
}

/// Registry of the (at most two) snapshots open in one analysis session.
///
/// Owns every base table of both snapshots; closing a side releases its
/// tables once no view or derived table references them anymore.
#[derive(Debug, Default)]
pub struct SnapshotPair {
    first: Option<Snapshot>,
    second: Option<Snapshot>,
}

impl SnapshotPair {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Open `snapshot` as the first side, replacing any previous one.
    pub fn open_first(&mut self, snapshot: Snapshot) {
        self.first = Some(snapshot);
    }

    /// Open `snapshot` as the second side, replacing any previous one.
    pub fn open_second(&mut self, snapshot: Snapshot) {
        self.second = Some(snapshot);
    }

    /// First snapshot, if open.
    pub fn first(&self) -> Option<&Snapshot> {
        self.first.as_ref()
    }

    /// Second snapshot, if open.
    pub fn second(&self) -> Option<&Snapshot> {
        self.second.as_ref()
    }

    /// Close the first side.
    pub fn close_first(&mut self) -> Option<Snapshot> {
        self.first.take()
    }

    /// Close the second side.
    pub fn close_second(&mut self) -> Option<Snapshot> {
        self.second.take()
    }

    /// Swap the two sides.
    pub fn swap(&mut self) {
        std::mem::swap(&mut self.first, &mut self.second);
    }

    /// Close both sides.
    pub fn clear(&mut self) {
        self.first = None;
        self.second = None;
    }

    /// Diff the table named `table` across both snapshots.
    ///
    /// Orientation follows capture time (the earlier capture is older) and
    /// matching uses identities only when both snapshots come from the same
    /// session.
    ///
    /// # Errors
    ///
    /// [`DiffError::Unavailable`] unless both sides are open,
    /// [`DiffError::MissingTable`] if either lacks the table, and any error of
    /// [`DiffSchema::new`].
    pub fn diff(&self, table: &str) -> Result<DiffTable, DiffError> {
        let (Some(first), Some(second)) = (&self.first, &self.second) else {
            return Err(DiffError::Unavailable(
                "both snapshots must be open".to_string(),
            ));
        };
        let a = first.table(table).ok_or_else(|| DiffError::MissingTable {
            table: table.to_string(),
            side: "first",
        })?;
        let b = second.table(table).ok_or_else(|| DiffError::MissingTable {
            table: table.to_string(),
            side: "second",
        })?;
        let first_is_older = first.captured_at <= second.captured_at;
        let same_session = first.session_id == second.session_id;
        Ok(DiffSchema::new(a, b, first_is_older, same_session)?.build())
    }
}
