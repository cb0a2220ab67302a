//! Selection and scroll position that survive table rebuilds.
//!
//! A filter edit replaces the displayed table. [`ViewState::rebuild`] maps the
//! old selection and first visible row onto the new table through
//! [`TableUpdate`], then recomputes every row height with a single
//! next-visible-row walk.

use super::height_index::HeightIndex;
use crate::model::{Table, TableRef};
use std::ops::Range;
use tracing::{debug, info};

/// Pixel heights of table rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowMetrics {
    /// Height of a leaf row.
    pub row_height: usize,
    /// Height of a row with nested rows.
    pub header_row_height: usize,
}

impl Default for RowMetrics {
    fn default() -> Self {
        Self {
            row_height: 20,
            header_row_height: 24,
        }
    }
}

impl RowMetrics {
    /// Height of `row` when it is visible.
    pub fn height_of(&self, table: &dyn Table, row: usize) -> usize {
        if table.subtree_len(row) > 0 {
            self.header_row_height
        } else {
            self.row_height
        }
    }
}

/// Translation of row positions from a table to its rebuilt replacement.
///
/// Only exists while both tables read the same base data; a rebuild over a
/// different origin cannot be remapped.
#[derive(Debug, Clone)]
pub struct TableUpdate {
    old: TableRef,
    new: TableRef,
}

impl TableUpdate {
    /// Start an update from `old` to `new`. `None` if their origins differ.
    pub fn begin(old: &TableRef, new: &TableRef) -> Option<Self> {
        (old.origin() == new.origin()).then(|| Self {
            old: old.clone(),
            new: new.clone(),
        })
    }

    /// Table being replaced.
    pub fn old(&self) -> &TableRef {
        &self.old
    }

    /// Replacement table.
    pub fn new_table(&self) -> &TableRef {
        &self.new
    }

    /// Position in the new table of the row at `old_row`, `None` if it is gone.
    pub fn old_to_new_row(&self, old_row: usize) -> Option<usize> {
        self.old.link_to(old_row)?.apply(self.new.as_ref())
    }
}

/// Phase of the remap state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RemapState {
    /// Nothing in progress.
    #[default]
    Stable,
    /// Old positions captured, new table being measured.
    Rebuilding,
    /// New positions computed, not yet published.
    Remapped,
}

/// Result of one rebuild.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemapOutcome {
    /// Selected row in the new table.
    pub selected: Option<usize>,
    /// First visible row in the new table.
    pub first_visible: usize,
    /// Pixel scroll offset.
    pub scroll_offset: usize,
    /// Height of every visible row.
    pub total_height: usize,
    /// Whether old positions were carried over (false means reset).
    pub remapped: bool,
}

/// Selection and scroll position over one displayed table.
///
/// Row heights live in a [`HeightIndex`] indexed by data-model row; rows
/// hidden under collapsed headers have height 0. A second index holds 1 per
/// visible row and yields sequential visible positions.
#[derive(Debug, Clone, Default)]
pub struct ViewState {
    heights: HeightIndex,
    visible: HeightIndex,
    selected: Option<usize>,
    first_visible: usize,
    scroll_offset: usize,
    state: RemapState,
}

impl ViewState {
    /// View state over `table`, scrolled to the top with nothing selected.
    pub fn new(table: &dyn Table, metrics: RowMetrics) -> Self {
        let mut view = Self::default();
        view.measure(table, metrics);
        view
    }

    /// Current machine phase. `Stable` between rebuilds.
    pub fn state(&self) -> RemapState {
        self.state
    }

    /// Selected row.
    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    /// Row at the top of the viewport.
    pub fn first_visible(&self) -> usize {
        self.first_visible
    }

    /// Pixel offset of the top of the viewport.
    pub fn scroll_offset(&self) -> usize {
        self.scroll_offset
    }

    /// Height of the whole scroll region.
    pub fn total_height(&self) -> usize {
        self.heights.total()
    }

    /// Number of rows currently shown.
    pub fn visible_row_count(&self) -> usize {
        self.visible.total()
    }

    /// Number of rows in the data model.
    pub fn row_count(&self) -> usize {
        self.heights.len()
    }

    /// Pixel offset of the top of `row`.
    pub fn offset_of(&self, row: usize) -> usize {
        self.heights.offset_of(row.min(self.heights.len()))
    }

    /// Carry selection and scroll position over to `new_table`.
    ///
    /// With an update the selected row follows its link. The first visible row
    /// follows its link too, or else the nearest row above it that survived,
    /// or else the selection. Without an update, or when nothing resolves, the
    /// view resets to row 0 at offset 0. The intra-row scroll offset is kept
    /// only when the first visible row itself survived.
    pub fn rebuild(
        &mut self,
        update: Option<&TableUpdate>,
        new_table: &dyn Table,
        metrics: RowMetrics,
    ) -> RemapOutcome {
        self.state = RemapState::Rebuilding;
        let old_selected = self.selected;
        let old_first = self.first_visible;
        let intra_offset = self.scroll_offset.saturating_sub(self.offset_of(old_first));

        let (selected, first, exact) = match update {
            Some(update) => {
                let selected = old_selected.and_then(|row| update.old_to_new_row(row));
                let (first, exact) = match update.old_to_new_row(old_first) {
                    Some(row) => (Some(row), true),
                    None => (
                        (0..old_first)
                            .rev()
                            .find_map(|row| update.old_to_new_row(row)),
                        false,
                    ),
                };
                (selected, first.or(selected), exact)
            }
            None => (None, None, false),
        };

        self.measure(new_table, metrics);
        let row_count = new_table.row_count();
        self.selected = selected
            .filter(|&row| row < row_count)
            .map(|row| new_table.visible_ancestor(row));
        let first = first.filter(|&row| row < row_count);
        let remapped = first.is_some();
        self.first_visible = first.map_or(0, |row| new_table.visible_ancestor(row));
        let intra = if exact && remapped && self.heights.len() > self.first_visible {
            intra_offset.min(self.heights.height(self.first_visible).saturating_sub(1))
        } else {
            0
        };
        self.scroll_offset = self.offset_of(self.first_visible) + intra;
        self.state = RemapState::Remapped;

        let outcome = RemapOutcome {
            selected: self.selected,
            first_visible: self.first_visible,
            scroll_offset: self.scroll_offset,
            total_height: self.total_height(),
            remapped,
        };
        if remapped {
            debug!(
                old_first,
                first_visible = outcome.first_visible,
                exact,
                selected = ?outcome.selected,
                "View state remapped"
            );
        } else {
            info!(rows = row_count, "View state reset");
        }
        self.state = RemapState::Stable;
        outcome
    }

    /// Patch heights after `table.expand_cell` reported `range` as dirty.
    pub fn on_cell_expanded(&mut self, table: &dyn Table, range: Range<usize>, metrics: RowMetrics) {
        if range.is_empty() || range.end > self.heights.len() {
            return;
        }
        for row in range.clone() {
            self.hide(row);
        }
        let header_shown = match range.start.checked_sub(1) {
            Some(header) => self.is_visible(header) && table.is_expanded(header),
            None => true,
        };
        if header_shown {
            let mut row = range.start;
            while row < range.end {
                self.show(row, metrics.height_of(table, row));
                row = table.next_visible_row(row);
            }
        }

        if let Some(row) = self.selected {
            if !self.is_visible(row) {
                self.selected = Some(table.visible_ancestor(row));
            }
        }
        self.scroll_to(self.scroll_offset);
        debug!(
            start = range.start,
            end = range.end,
            total_height = self.total_height(),
            "Expand state patched"
        );
    }

    /// Scroll so the viewport starts at pixel `offset`, clamped to the last row.
    pub fn scroll_to(&mut self, offset: usize) {
        let max = self.total_height().saturating_sub(1);
        self.scroll_offset = offset.min(max);
        self.first_visible = self.heights.row_at(self.scroll_offset).unwrap_or(0);
    }

    /// Scroll by `delta` pixels.
    pub fn scroll_by(&mut self, delta: isize) {
        self.scroll_to(self.scroll_offset.saturating_add_signed(delta));
    }

    /// Select `row`, or clear the selection. Hidden and out-of-range rows are
    /// rejected.
    pub fn select(&mut self, row: Option<usize>) -> bool {
        match row {
            Some(row) if !self.is_visible(row) => false,
            row => {
                self.selected = row;
                true
            }
        }
    }

    /// Select the row at sequential visible position `index`.
    pub fn select_visible_index(&mut self, index: usize) -> bool {
        match self.visible.row_at(index) {
            Some(row) => self.select(Some(row)),
            None => false,
        }
    }

    /// Sequential position of `row` among the visible rows.
    pub fn visible_index(&self, row: usize) -> Option<usize> {
        self.is_visible(row)
            .then(|| self.visible.offset_of(row))
    }

    /// Scroll the least amount that brings the selected row fully into a
    /// viewport `viewport` pixels high.
    pub fn ensure_selected_visible(&mut self, viewport: usize) {
        let Some(row) = self.selected else { return };
        let top = self.offset_of(row);
        let bottom = top + self.heights.height(row);
        if top < self.scroll_offset {
            self.scroll_to(top);
        } else if bottom > self.scroll_offset + viewport {
            self.scroll_to(bottom.saturating_sub(viewport));
        }
    }

    /// Rows intersecting a viewport `viewport` pixels high, top to bottom.
    pub fn visible_rows(&self, viewport: usize) -> Vec<usize> {
        let end = self.scroll_offset + viewport;
        let mut rows = Vec::new();
        let mut offset = self.offset_of(self.first_visible);
        while offset < end {
            let Some(row) = self.heights.row_at(offset) else {
                break;
            };
            rows.push(row);
            offset = self.heights.prefix_sum(row);
        }
        rows
    }

    /// Forget everything and measure `table` from scratch.
    pub fn reset(&mut self, table: &dyn Table, metrics: RowMetrics) {
        self.selected = None;
        self.first_visible = 0;
        self.scroll_offset = 0;
        self.state = RemapState::Stable;
        self.measure(table, metrics);
    }

    fn is_visible(&self, row: usize) -> bool {
        row < self.visible.len() && self.visible.height(row) > 0
    }

    fn hide(&mut self, row: usize) {
        self.heights.set(row, 0);
        self.visible.set(row, 0);
    }

    fn show(&mut self, row: usize, height: usize) {
        self.heights.set(row, height);
        self.visible.set(row, 1);
    }

    /// One pass over the visible rows of `table`.
    fn measure(&mut self, table: &dyn Table, metrics: RowMetrics) {
        let row_count = table.row_count();
        let mut heights = vec![0; row_count];
        let mut visible = vec![0; row_count];
        let mut row = 0;
        while row < row_count {
            heights[row] = metrics.height_of(table, row);
            visible[row] = 1;
            row = table.next_visible_row(row);
        }
        self.heights = HeightIndex::from_heights(heights);
        self.visible = HeightIndex::from_heights(visible);
    }
}

#[cfg(test)]
#[path = "remap_tests.rs"]
mod tests;
