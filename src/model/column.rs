//! Columns: declared metadata, backing storage and read views.

use super::table::Table;
use super::value::{NumericWidth, Value, ValueType};
use serde::Deserialize;
use std::rc::Rc;

/// What a column means to the engine, beyond its value type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnRole {
    /// Ordinary attribute.
    #[default]
    Plain,
    /// Byte size; summed by group headers and diff aggregation.
    Size,
    /// Low-level identity (e.g. an address). Only comparable within one session.
    Identity,
    /// Structural key (type, label). Comparable across sessions.
    Key,
}

/// Declared metadata of one column: its identity is (name, value type).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ColumnInfo {
    name: String,
    value_type: ValueType,
    role: ColumnRole,
}

impl ColumnInfo {
    /// Create a plain column description.
    pub fn new(name: impl Into<String>, value_type: ValueType) -> Self {
        Self {
            name: name.into(),
            value_type,
            role: ColumnRole::Plain,
        }
    }

    /// Set the role of this column.
    pub fn with_role(mut self, role: ColumnRole) -> Self {
        self.role = role;
        self
    }

    /// Column name. Unique within a table; lookups are case-sensitive.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared value type.
    pub fn value_type(&self) -> ValueType {
        self.value_type
    }

    /// Column role.
    pub fn role(&self) -> ColumnRole {
        self.role
    }
}

/// Typed backing storage of a base table column.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    /// `i32` values.
    I32(Vec<i32>),
    /// `i64` values.
    I64(Vec<i64>),
    /// `u32` values.
    U32(Vec<u32>),
    /// `u64` values.
    U64(Vec<u64>),
    /// String values.
    Str(Vec<Rc<str>>),
}

impl ColumnData {
    /// Number of stored values.
    pub fn len(&self) -> usize {
        match self {
            ColumnData::I32(v) => v.len(),
            ColumnData::I64(v) => v.len(),
            ColumnData::U32(v) => v.len(),
            ColumnData::U64(v) => v.len(),
            ColumnData::Str(v) => v.len(),
        }
    }

    /// Whether no values are stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Value type of the stored values.
    pub fn value_type(&self) -> ValueType {
        match self {
            ColumnData::I32(_) => ValueType::I32,
            ColumnData::I64(_) => ValueType::I64,
            ColumnData::U32(_) => ValueType::U32,
            ColumnData::U64(_) => ValueType::U64,
            ColumnData::Str(_) => ValueType::Str,
        }
    }

    /// Value at `row`.
    ///
    /// # Panics
    ///
    /// Panics if `row >= len()`.
    pub fn value(&self, row: usize) -> Value {
        match self {
            ColumnData::I32(v) => Value::I32(v[row]),
            ColumnData::I64(v) => Value::I64(v[row]),
            ColumnData::U32(v) => Value::U32(v[row]),
            ColumnData::U64(v) => Value::U64(v[row]),
            ColumnData::Str(v) => Value::Str(Rc::clone(&v[row])),
        }
    }

    /// Convenience constructor for string columns.
    pub fn strings<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        ColumnData::Str(values.into_iter().map(|s| Rc::from(s.as_ref())).collect())
    }
}

/// Renders cell values to display strings.
pub trait ValueFormatter {
    /// Format `value`, a cell of the column described by `column`.
    fn format(&self, column: &ColumnInfo, value: &Value) -> String;
}

/// Formats every value with its `Display` implementation.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainFormatter;

impl ValueFormatter for PlainFormatter {
    fn format(&self, _column: &ColumnInfo, value: &Value) -> String {
        value.to_string()
    }
}

/// Formats `Size` columns as human readable byte counts.
#[derive(Debug, Clone, Copy, Default)]
pub struct SizeFormatter;

impl ValueFormatter for SizeFormatter {
    fn format(&self, column: &ColumnInfo, value: &Value) -> String {
        match (column.role(), value.as_i64()) {
            (ColumnRole::Size, Some(bytes)) => format_bytes(bytes),
            _ => value.to_string(),
        }
    }
}

/// Format a byte count with a binary unit suffix, e.g. `1.5 KB`.
pub fn format_bytes(bytes: i64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
    let magnitude = bytes.unsigned_abs();
    if magnitude < 1024 {
        return format!("{bytes} B");
    }
    let mut scaled = magnitude as f64;
    let mut unit = 0;
    while scaled >= 1024.0 && unit < UNITS.len() - 1 {
        scaled /= 1024.0;
        unit += 1;
    }
    let sign = if bytes < 0 { "-" } else { "" };
    format!("{sign}{scaled:.1} {}", UNITS[unit])
}

/// Read-only view of one column of a table.
///
/// A `Column` borrows its table, so it can never outlive the data it reads.
#[derive(Clone, Copy)]
pub struct Column<'a> {
    table: &'a dyn Table,
    index: usize,
}

impl<'a> Column<'a> {
    pub(crate) fn new(table: &'a dyn Table, index: usize) -> Self {
        Self { table, index }
    }

    /// Position of this column in its table.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Declared metadata.
    pub fn info(&self) -> &'a ColumnInfo {
        &self.table.columns()[self.index]
    }

    /// Column name.
    pub fn name(&self) -> &'a str {
        self.info().name()
    }

    /// Declared value type.
    pub fn value_type(&self) -> ValueType {
        self.info().value_type()
    }

    /// Whether this is a size column.
    pub fn is_size(&self) -> bool {
        self.info().role() == ColumnRole::Size
    }

    /// Integer width of the column, `None` for strings.
    pub fn numeric_width(&self) -> Option<NumericWidth> {
        self.value_type().numeric_width()
    }

    /// Number of values; always the owning table's row count.
    pub fn len(&self) -> usize {
        self.table.row_count()
    }

    /// Whether the column has no values.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Raw value at `row`.
    pub fn value(&self, row: usize) -> Value {
        self.table.cell(row, self.index)
    }

    /// Formatted value at `row`.
    pub fn value_string(&self, row: usize, formatter: &dyn ValueFormatter) -> String {
        formatter.format(self.info(), &self.value(row))
    }
}

impl std::fmt::Debug for Column<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Column")
            .field("name", &self.name())
            .field("index", &self.index)
            .finish()
    }
}
