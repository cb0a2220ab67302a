//! Derived table that selects and reorders rows of a source table.

use crate::model::{ColumnInfo, RowLink, SortLevel, Table, TableRef, TableUid, Value};
use std::ops::Range;

/// Row ranges of the top-level blocks of `table`.
///
/// A block is a depth-0 row together with every row nested below it. In a
/// flat table each row is its own block.
pub(crate) fn top_level_blocks(table: &dyn Table) -> Vec<Range<usize>> {
    let mut blocks = Vec::new();
    let mut row = 0;
    let row_count = table.row_count();
    while row < row_count {
        let end = row + 1 + table.subtree_len(row);
        blocks.push(row..end);
        row = end;
    }
    blocks
}

/// Rows of a source table, narrowed and reordered.
///
/// Whole blocks are kept together, so a tree-shaped source stays a valid
/// pre-order tree. Tree shape and expand state are read from the source.
///
/// # Invariants
///
/// - `rows` holds distinct source rows
/// - `reverse[rows[i]] == Some(i)` for every `i`
#[derive(Debug)]
pub struct IndexedTable {
    source: TableRef,
    rows: Vec<usize>,
    reverse: Vec<Option<usize>>,
}

impl IndexedTable {
    /// Table over the given source rows, in the given order.
    pub fn new(source: TableRef, rows: Vec<usize>) -> Self {
        let mut reverse = vec![None; source.row_count()];
        for (i, &row) in rows.iter().enumerate() {
            reverse[row] = Some(i);
        }
        Self {
            source,
            rows,
            reverse,
        }
    }

    /// Table over whole source blocks, in the given order.
    pub(crate) fn from_blocks(source: TableRef, blocks: &[Range<usize>]) -> Self {
        let rows = blocks.iter().flat_map(|b| b.clone()).collect();
        Self::new(source, rows)
    }

    /// Source row displayed at `row`.
    pub fn source_row(&self, row: usize) -> usize {
        self.rows[row]
    }

    /// Source table.
    pub fn source(&self) -> &TableRef {
        &self.source
    }
}

impl Table for IndexedTable {
    fn origin(&self) -> TableUid {
        self.source.origin()
    }

    fn name(&self) -> &str {
        self.source.name()
    }

    fn columns(&self) -> &[ColumnInfo] {
        self.source.columns()
    }

    fn row_count(&self) -> usize {
        self.rows.len()
    }

    fn cell(&self, row: usize, col: usize) -> Value {
        self.source.cell(self.rows[row], col)
    }

    fn default_sort(&self) -> &[SortLevel] {
        self.source.default_sort()
    }

    fn link_to(&self, row: usize) -> Option<RowLink> {
        self.rows.get(row).and_then(|&r| self.source.link_to(r))
    }

    fn find_link(&self, link: &RowLink) -> Option<usize> {
        let source_row = self.source.find_link(link)?;
        self.reverse.get(source_row).copied().flatten()
    }

    fn is_tree(&self) -> bool {
        self.source.is_tree()
    }

    fn depth(&self, row: usize) -> u16 {
        self.source.depth(self.rows[row])
    }

    fn subtree_len(&self, row: usize) -> usize {
        self.source.subtree_len(self.rows[row])
    }

    fn is_expanded(&self, row: usize) -> bool {
        self.source.is_expanded(self.rows[row])
    }

    fn is_column_expandable(&self, col: usize) -> bool {
        self.source.is_column_expandable(col)
    }

    fn expand_column(&self, row: usize) -> Option<usize> {
        self.source.expand_column(self.rows[row])
    }

    fn expand_cell(&self, row: usize, col: usize, expand: bool) -> Option<Range<usize>> {
        let dirty = self.source.expand_cell(self.rows[row], col, expand)?;
        // Blocks are contiguous, so the subtree sits right below `row` here too.
        Some(row + 1..row + 1 + dirty.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ColumnData, DataTable, ValueType};
    use std::rc::Rc;

    fn base() -> TableRef {
        Rc::new(
            DataTable::new(
                "t",
                4,
                vec![(
                    ColumnInfo::new("N", ValueType::I32),
                    ColumnData::I32(vec![0, 1, 2, 3]),
                )],
            )
            .expect("valid table"),
        )
    }

    #[test]
    fn maps_rows_and_links_through_the_source() {
        let source = base();
        let table = IndexedTable::new(source.clone(), vec![3, 1]);
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.cell(0, 0), Value::I32(3));

        let link = source.link_to(1).expect("row exists");
        assert_eq!(link.apply(&table), Some(1));
        let excluded = source.link_to(2).expect("row exists");
        assert_eq!(excluded.apply(&table), None);
    }

    #[test]
    fn flat_tables_have_one_block_per_row() {
        let blocks = top_level_blocks(base().as_ref());
        assert_eq!(blocks, vec![0..1, 1..2, 2..3, 3..4]);
    }
}
