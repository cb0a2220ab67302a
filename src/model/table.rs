//! The `Table` abstraction every view, filter and diff works through.
//!
//! A table is an ordered set of columns plus a row count. Derived tables
//! (produced by filters) hold an `Rc` to their source and narrow, reorder or
//! group its rows, so a source can never be dropped while a derived table
//! still reads through it.
//!
//! # Tree shape
//!
//! Grouped tables contain nested rows. Rows are stored in pre-order: a header
//! row is followed by its `subtree_len` descendants. `row_count` counts every
//! row of this data model, including rows hidden under collapsed headers; use
//! [`Table::next_visible_row`] to walk what a renderer would show.

use super::column::{Column, ColumnInfo, ValueFormatter};
use super::link::RowLink;
use super::ordering::SortLevel;
use super::value::Value;
use std::fmt;
use std::ops::Range;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Shared handle to a table.
pub type TableRef = Rc<dyn Table>;

/// Identity of a base table's data. Derived tables report their source's uid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TableUid(u64);

impl TableUid {
    /// Allocate a fresh, process-unique uid.
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw value.
    pub fn get(&self) -> u64 {
        self.0
    }
}

/// Expand state of one cell, as seen by a renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CellExpandState {
    /// The column can hold expand controls in some row.
    pub is_column_expandable: bool,
    /// This cell has nested rows.
    pub is_expandable: bool,
    /// The nested rows are currently visible.
    pub is_expanded: bool,
    /// Nesting depth of the row; drives indentation.
    pub expand_depth: u16,
}

/// Read-only tabular data with optional tree shape.
pub trait Table: fmt::Debug {
    /// Uid of the base data this table reads.
    fn origin(&self) -> TableUid;

    /// Table name.
    fn name(&self) -> &str;

    /// Column metadata, in display order.
    fn columns(&self) -> &[ColumnInfo];

    /// Total number of rows in the data model.
    fn row_count(&self) -> usize;

    /// Raw value of a cell. Out-of-range arguments are a programmer error.
    fn cell(&self, row: usize, col: usize) -> Value;

    /// Suggested initial ordering supplied by the table's schema.
    fn default_sort(&self) -> &[SortLevel] {
        &[]
    }

    /// Stable handle to `row`, usable after the table was rebuilt.
    fn link_to(&self, row: usize) -> Option<RowLink>;

    /// Position of the row identified by `link`, `None` if it is not present.
    fn find_link(&self, link: &RowLink) -> Option<usize>;

    /// Whether any row may have nested rows.
    fn is_tree(&self) -> bool {
        false
    }

    /// Nesting depth of `row` (0 for top-level rows).
    fn depth(&self, _row: usize) -> u16 {
        0
    }

    /// Number of rows nested below `row`, at any depth.
    fn subtree_len(&self, _row: usize) -> usize {
        0
    }

    /// Whether the nested rows of `row` are visible.
    fn is_expanded(&self, _row: usize) -> bool {
        false
    }

    /// Whether `col` can hold expand controls.
    fn is_column_expandable(&self, _col: usize) -> bool {
        false
    }

    /// Column holding the expand control of header row `row`.
    fn expand_column(&self, _row: usize) -> Option<usize> {
        None
    }

    /// Expand or collapse the cell at (`row`, `col`).
    ///
    /// Returns `None` if the cell is not expandable, otherwise the contiguous
    /// row range whose visibility may have changed (empty if the state was
    /// already `expand`).
    fn expand_cell(&self, _row: usize, _col: usize, _expand: bool) -> Option<Range<usize>> {
        None
    }

    /// Number of columns.
    fn column_count(&self) -> usize {
        self.columns().len()
    }

    /// Position of the column named `name` (case-sensitive).
    fn column_index(&self, name: &str) -> Option<usize> {
        self.columns().iter().position(|c| c.name() == name)
    }

    /// Expand state of one cell.
    fn cell_expand_state(&self, row: usize, col: usize) -> CellExpandState {
        let is_expandable = self.subtree_len(row) > 0 && self.expand_column(row) == Some(col);
        CellExpandState {
            is_column_expandable: self.is_column_expandable(col),
            is_expandable,
            is_expanded: is_expandable && self.is_expanded(row),
            expand_depth: self.depth(row),
        }
    }

    /// Formatted value of a cell.
    fn row_value_string(&self, row: usize, col: usize, formatter: &dyn ValueFormatter) -> String {
        formatter.format(&self.columns()[col], &self.cell(row, col))
    }

    /// Next visible row after the visible row `row`; `>= row_count()` at the end.
    ///
    /// Skips the whole subtree of a collapsed row in one step.
    fn next_visible_row(&self, row: usize) -> usize {
        if self.is_expanded(row) {
            row + 1
        } else {
            row + 1 + self.subtree_len(row)
        }
    }

    /// Closest row above `row` with a smaller depth.
    fn parent_row(&self, row: usize) -> Option<usize> {
        let depth = self.depth(row);
        if depth == 0 {
            return None;
        }
        (0..row).rev().find(|&r| self.depth(r) < depth)
    }

    /// Whether every ancestor of `row` is expanded.
    fn is_row_visible(&self, row: usize) -> bool {
        let mut current = row;
        while let Some(parent) = self.parent_row(current) {
            if !self.is_expanded(parent) {
                return false;
            }
            current = parent;
        }
        row < self.row_count()
    }

    /// Closest visible row among `row` and its ancestors.
    fn visible_ancestor(&self, row: usize) -> usize {
        let mut candidate = row;
        let mut current = row;
        while let Some(parent) = self.parent_row(current) {
            if !self.is_expanded(parent) {
                candidate = parent;
            }
            current = parent;
        }
        candidate
    }

    /// Number of rows directly nested under `row`.
    fn direct_child_count(&self, row: usize) -> usize {
        let end = row + 1 + self.subtree_len(row);
        let mut count = 0;
        let mut r = row + 1;
        while r < end {
            count += 1;
            r += 1 + self.subtree_len(r);
        }
        count
    }

    /// Number of rows a renderer would currently show.
    fn visible_row_count(&self) -> usize {
        let mut count = 0;
        let mut r = 0;
        while r < self.row_count() {
            count += 1;
            r = self.next_visible_row(r);
        }
        count
    }
}

impl dyn Table + '_ {
    /// Column at `index`, `None` if out of range.
    pub fn column_by_index(&self, index: usize) -> Option<Column<'_>> {
        (index < self.column_count()).then(|| Column::new(self, index))
    }

    /// Column named `name`, `None` if absent. Callers treat `None` as
    /// "feature unavailable".
    pub fn column_by_name(&self, name: &str) -> Option<Column<'_>> {
        self.column_index(name).map(|index| Column::new(self, index))
    }

    /// First column with the `Size` role.
    pub fn size_column(&self) -> Option<Column<'_>> {
        (0..self.column_count())
            .map(|index| Column::new(self, index))
            .find(|c| c.is_size())
    }
}
