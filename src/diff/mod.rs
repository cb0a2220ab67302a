//! Two-snapshot diff.
//!
//! [`DiffSchema`] decides which columns two tables share and which of them
//! identify a row; [`DiffSchema::build`] pairs rows with equal keys and
//! produces a [`DiffTable`] whose first column classifies every row.
//!
//! Size deltas of paired rows are not a separate classification. They show up
//! in the `"<size> Delta"` column and in the [`DiffSums`] totals.

mod schema;
mod table;

pub use schema::{diff_tables, DiffSchema};
pub use table::DiffTable;

use crate::model::Table;
use std::fmt;

/// Name of the classification column of a diff table.
pub const DIFF_COLUMN: &str = "Diff";

/// Suffix of the size delta column name.
pub const DELTA_SUFFIX: &str = " Delta";

/// Classification of one row of a diff table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DiffClass {
    /// Not a diff row (e.g. a group header).
    #[default]
    None,
    /// Present on both sides.
    Same,
    /// Present only in the newer snapshot.
    New,
    /// Present only in the older snapshot.
    Deleted,
}

impl DiffClass {
    /// Display label, as stored in the [`DIFF_COLUMN`].
    pub fn label(self) -> &'static str {
        match self {
            DiffClass::None => "",
            DiffClass::Same => "Same",
            DiffClass::New => "New",
            DiffClass::Deleted => "Deleted",
        }
    }

    /// Parse a label written by [`DiffClass::label`].
    pub fn from_label(label: &str) -> Self {
        match label {
            "Same" => DiffClass::Same,
            "New" => DiffClass::New,
            "Deleted" => DiffClass::Deleted,
            _ => DiffClass::None,
        }
    }

    /// Classification after the older/newer orientation flipped.
    pub fn swapped(self) -> Self {
        match self {
            DiffClass::New => DiffClass::Deleted,
            DiffClass::Deleted => DiffClass::New,
            other => other,
        }
    }
}

impl fmt::Display for DiffClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Size totals per classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DiffSums {
    /// Paired rows, measured on the older side.
    pub same_older: i64,
    /// Paired rows, measured on the newer side.
    pub same_newer: i64,
    /// Rows only in the newer snapshot.
    pub new: i64,
    /// Rows only in the older snapshot.
    pub deleted: i64,
}

impl DiffSums {
    /// Total size of the older snapshot's rows.
    pub fn older_total(&self) -> i64 {
        self.same_older.saturating_add(self.deleted)
    }

    /// Total size of the newer snapshot's rows.
    pub fn newer_total(&self) -> i64 {
        self.same_newer.saturating_add(self.new)
    }

    /// Net growth from older to newer.
    pub fn growth(&self) -> i64 {
        self.newer_total().saturating_sub(self.older_total())
    }
}

/// Name of the delta column for the size column `size_name`.
pub fn delta_column_name(size_name: &str) -> String {
    format!("{size_name}{DELTA_SUFFIX}")
}

/// Sum the size column of `table` per classification in one pass.
///
/// Works on a diff table and on any table derived from one, as long as the
/// [`DIFF_COLUMN`] and a size column survived. Rows with nested rows (group
/// headers) are skipped so nothing is counted twice. Returns `None` when
/// either column is missing.
pub fn sum_by_class(table: &dyn Table) -> Option<DiffSums> {
    let diff = table.column_index(DIFF_COLUMN)?;
    let size = table.size_column()?;
    let size_index = size.index();
    let delta = table.column_index(&delta_column_name(size.name()));

    let mut sums = DiffSums::default();
    let mut same_delta = 0i64;
    for row in 0..table.row_count() {
        if table.subtree_len(row) > 0 {
            continue;
        }
        let value = table.cell(row, size_index).as_i64().unwrap_or(0);
        let class = table.cell(row, diff);
        match DiffClass::from_label(class.as_str().unwrap_or("")) {
            DiffClass::Same => {
                sums.same_newer = sums.same_newer.saturating_add(value);
                let d = delta
                    .and_then(|col| table.cell(row, col).as_i64())
                    .unwrap_or(0);
                same_delta = same_delta.saturating_add(d);
            }
            DiffClass::New => sums.new = sums.new.saturating_add(value),
            DiffClass::Deleted => sums.deleted = sums.deleted.saturating_add(value),
            DiffClass::None => {}
        }
    }
    sums.same_older = sums.same_newer.saturating_sub(same_delta);
    Some(sums)
}
