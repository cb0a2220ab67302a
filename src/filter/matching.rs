//! Text search on one column.

use super::indexed::{top_level_blocks, IndexedTable};
use super::FilterId;
use crate::model::{PlainFormatter, Table, TableError, TableRef};
use std::rc::Rc;

/// Keeps rows whose text in `column` matches `pattern`.
///
/// Comparison is case-insensitive on the plain-formatted cell text. On a
/// tree-shaped source the root row of each top-level block decides and the
/// block is kept or dropped as a whole.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchFilter {
    id: FilterId,
    column: usize,
    pattern: String,
    exact: bool,
    force_focus: bool,
}

impl MatchFilter {
    /// Match on `column`; `exact` requires full equality instead of containment.
    pub fn new(column: usize, pattern: impl Into<String>, exact: bool) -> Self {
        Self {
            id: FilterId::next(),
            column,
            pattern: pattern.into(),
            exact,
            force_focus: false,
        }
    }

    /// Ask the host to focus the search field when this filter is shown.
    pub fn with_force_focus(mut self, force_focus: bool) -> Self {
        self.force_focus = force_focus;
        self
    }

    /// Identity of this filter.
    pub fn id(&self) -> FilterId {
        self.id
    }

    /// Matched column.
    pub fn column(&self) -> usize {
        self.column
    }

    /// Search text.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Whether the whole cell must equal the pattern.
    pub fn exact(&self) -> bool {
        self.exact
    }

    /// Focus hint for the host's search field.
    pub fn force_focus(&self) -> bool {
        self.force_focus
    }

    /// Update pattern and mode; returns whether anything changed.
    pub(crate) fn update(&mut self, pattern: &str, exact: bool) -> bool {
        if self.pattern == pattern && self.exact == exact {
            return false;
        }
        self.pattern = pattern.to_string();
        self.exact = exact;
        true
    }

    /// An empty pattern matches everything.
    pub fn is_noop(&self) -> bool {
        self.pattern.is_empty()
    }

    pub(crate) fn fresh_clone(&self) -> Self {
        Self {
            id: FilterId::next(),
            ..self.clone()
        }
    }

    /// Whether `text` satisfies this filter.
    pub fn matches(&self, text: &str) -> bool {
        self.matches_lowered(text, &self.pattern.to_lowercase())
    }

    fn matches_lowered(&self, text: &str, pattern: &str) -> bool {
        let text = text.to_lowercase();
        if self.exact {
            text == pattern
        } else {
            text.contains(pattern)
        }
    }

    /// Rows of `source` that match, in source order.
    ///
    /// # Errors
    ///
    /// Returns [`TableError::ColumnOutOfRange`] if the column does not exist.
    pub fn create_filter(&self, source: &TableRef) -> Result<TableRef, TableError> {
        if self.is_noop() {
            return Ok(source.clone());
        }
        let column_count = source.column_count();
        if self.column >= column_count {
            return Err(TableError::ColumnOutOfRange {
                column: self.column,
                column_count,
            });
        }
        let pattern = self.pattern.to_lowercase();
        let keep = |row: usize| {
            let text = source.row_value_string(row, self.column, &PlainFormatter);
            self.matches_lowered(&text, &pattern)
        };
        let blocks: Vec<_> = top_level_blocks(source.as_ref())
            .into_iter()
            .filter(|block| keep(block.start))
            .collect();
        Ok(Rc::new(IndexedTable::from_blocks(source.clone(), &blocks)))
    }
}
