//! The merged table produced by a diff.

use super::{sum_by_class, DiffClass, DiffSums};
use crate::model::{ColumnInfo, RowLink, SortLevel, Table, TableRef, TableUid, Value};
use std::cell::Cell;

/// Where a merged column reads its values from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MergedColumn {
    /// The classification label.
    Class,
    /// A column both sides share.
    Shared { first: usize, second: usize },
    /// Newer minus older value of a shared size column.
    Delta { first: usize, second: usize },
}

/// Source rows behind one merged row. At least one side is present.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct MergedRow {
    first: Option<usize>,
    second: Option<usize>,
}

impl MergedRow {
    pub(crate) fn both(first: usize, second: usize) -> Self {
        Self {
            first: Some(first),
            second: Some(second),
        }
    }

    pub(crate) fn first_only(first: usize) -> Self {
        Self {
            first: Some(first),
            second: None,
        }
    }

    pub(crate) fn second_only(second: usize) -> Self {
        Self {
            first: None,
            second: Some(second),
        }
    }
}

/// Rows of two tables merged by key and tagged with a [`DiffClass`].
///
/// Paired rows show the newer side's values. Which side is newer is a flag,
/// so [`DiffTable::on_snapshots_swapped`] flips classifications and values
/// without pairing rows again.
///
/// The diff table is a base table for everything derived from it: its links
/// name merged rows and its `origin` is its own uid.
#[derive(Debug)]
pub struct DiffTable {
    uid: TableUid,
    first: TableRef,
    second: TableRef,
    first_is_older: Cell<bool>,
    columns: Vec<ColumnInfo>,
    sources: Vec<MergedColumn>,
    rows: Vec<MergedRow>,
    default_sort: Vec<SortLevel>,
}

impl DiffTable {
    pub(crate) fn new(
        first: TableRef,
        second: TableRef,
        first_is_older: bool,
        columns: Vec<ColumnInfo>,
        sources: Vec<MergedColumn>,
        rows: Vec<MergedRow>,
        default_sort: Vec<SortLevel>,
    ) -> Self {
        Self {
            uid: TableUid::next(),
            first,
            second,
            first_is_older: Cell::new(first_is_older),
            columns,
            sources,
            rows,
            default_sort,
        }
    }

    /// First source table.
    pub fn first(&self) -> &TableRef {
        &self.first
    }

    /// Second source table.
    pub fn second(&self) -> &TableRef {
        &self.second
    }

    /// Whether the first table is the older snapshot.
    pub fn first_is_older(&self) -> bool {
        self.first_is_older.get()
    }

    /// Flip the older/newer orientation.
    pub fn on_snapshots_swapped(&self) {
        self.first_is_older.set(!self.first_is_older.get());
    }

    /// Classification of `row`.
    pub fn class_of(&self, row: usize) -> DiffClass {
        let merged = self.rows[row];
        let class = match (merged.first, merged.second) {
            (Some(_), Some(_)) => DiffClass::Same,
            (Some(_), None) => DiffClass::Deleted,
            (None, _) => DiffClass::New,
        };
        if self.first_is_older() {
            class
        } else {
            class.swapped()
        }
    }

    /// Row of the first table behind `row`, if any.
    pub fn first_row(&self, row: usize) -> Option<usize> {
        self.rows[row].first
    }

    /// Row of the second table behind `row`, if any.
    pub fn second_row(&self, row: usize) -> Option<usize> {
        self.rows[row].second
    }

    /// Size totals over every row.
    pub fn sums(&self) -> DiffSums {
        sum_by_class(self).unwrap_or_default()
    }

    /// (older, newer) source cells of `row`; missing sides are `None`.
    fn sides(&self, row: usize, first: usize, second: usize) -> (Option<Value>, Option<Value>) {
        let merged = self.rows[row];
        let a = merged.first.map(|r| self.first.cell(r, first));
        let b = merged.second.map(|r| self.second.cell(r, second));
        if self.first_is_older() {
            (a, b)
        } else {
            (b, a)
        }
    }
}

impl Table for DiffTable {
    fn origin(&self) -> TableUid {
        self.uid
    }

    fn name(&self) -> &str {
        self.first.name()
    }

    fn columns(&self) -> &[ColumnInfo] {
        &self.columns
    }

    fn row_count(&self) -> usize {
        self.rows.len()
    }

    fn cell(&self, row: usize, col: usize) -> Value {
        match self.sources[col] {
            MergedColumn::Class => Value::str(self.class_of(row).label()),
            MergedColumn::Shared { first, second } => {
                let (older, newer) = self.sides(row, first, second);
                newer.or(older).unwrap_or_default()
            }
            MergedColumn::Delta { first, second } => {
                let (older, newer) = self.sides(row, first, second);
                let older = older.and_then(|v| v.as_i64()).unwrap_or(0);
                let newer = newer.and_then(|v| v.as_i64()).unwrap_or(0);
                Value::I64(newer.saturating_sub(older))
            }
        }
    }

    fn default_sort(&self) -> &[SortLevel] {
        &self.default_sort
    }

    fn link_to(&self, row: usize) -> Option<RowLink> {
        (row < self.rows.len()).then_some(RowLink::Row {
            origin: self.uid,
            row,
        })
    }

    fn find_link(&self, link: &RowLink) -> Option<usize> {
        match *link {
            RowLink::Row { origin, row } if origin == self.uid && row < self.rows.len() => {
                Some(row)
            }
            _ => None,
        }
    }
}
