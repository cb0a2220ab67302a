//! Position-independent row handles.

use super::table::{Table, TableUid};
use super::value::Value;

/// Stable handle to a logical row.
///
/// Filters reorder, exclude and group rows, so a row index is only meaningful
/// for one table instance. A link names the row by what it is instead: a data
/// row of a base table, or a group header by its grouping path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RowLink {
    /// Data row `row` of the base table `origin`.
    Row {
        /// Base table uid.
        origin: TableUid,
        /// Row index in the base table.
        row: usize,
    },
    /// Group header reached by following `(column, key)` pairs from the
    /// outermost grouping level.
    Group {
        /// Base table uid.
        origin: TableUid,
        /// Grouping path, outermost first.
        path: Vec<(usize, Value)>,
    },
}

impl RowLink {
    /// Base table uid this link refers to.
    pub fn origin(&self) -> TableUid {
        match self {
            RowLink::Row { origin, .. } | RowLink::Group { origin, .. } => *origin,
        }
    }

    /// Resolve the link against `table`; `None` if the row is not present.
    pub fn apply(&self, table: &dyn Table) -> Option<usize> {
        if table.origin() != self.origin() {
            return None;
        }
        table.find_link(self)
    }
}
