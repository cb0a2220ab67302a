//! One spreadsheet view: a source table, its filters and what is on screen.

use super::debounce::FilterDebounce;
use super::remap::{RemapOutcome, RowMetrics, TableUpdate, ViewState};
use crate::filter::{ColumnState, TableFilters};
use crate::model::{DataTable, RowLink, Table, TableRef};
use std::rc::Rc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Reason shown when no snapshot table is attached.
pub const NO_SOURCE_REASON: &str = "No snapshot open";
/// Reason shown when the source has rows but the filters removed all of them.
pub const NO_MATCH_REASON: &str = "No rows match the current filters";
/// Reason shown when the source itself has no rows.
pub const EMPTY_TABLE_REASON: &str = "Table is empty";

/// A source table seen through a [`TableFilters`] pipeline.
///
/// Filter edits are applied by [`TableView::rebuild`], which keeps the
/// selection, scroll position and expanded group headers of the previous
/// display table wherever the rows still exist.
#[derive(Debug)]
pub struct TableView {
    source: Option<TableRef>,
    filters: TableFilters,
    display: TableRef,
    view: ViewState,
    metrics: RowMetrics,
    no_data_reason: Option<String>,
    debounce: FilterDebounce,
}

impl TableView {
    /// View over `source` with an empty pipeline, built immediately.
    pub fn new(source: TableRef, metrics: RowMetrics, debounce: Duration) -> Self {
        let filters = TableFilters::for_table(source.as_ref());
        let mut view = Self {
            display: source.clone(),
            view: ViewState::default(),
            source: Some(source),
            filters,
            metrics,
            no_data_reason: None,
            debounce: FilterDebounce::new(debounce),
        };
        view.rebuild();
        view
    }

    /// View with nothing attached.
    pub fn detached(metrics: RowMetrics, debounce: Duration) -> Self {
        let display: TableRef = Rc::new(DataTable::empty("", &[]));
        Self {
            view: ViewState::new(display.as_ref(), metrics),
            display,
            source: None,
            filters: TableFilters::new(Vec::new()),
            metrics,
            no_data_reason: Some(NO_SOURCE_REASON.to_string()),
            debounce: FilterDebounce::new(debounce),
        }
    }

    /// Attached source table.
    pub fn source(&self) -> Option<&TableRef> {
        self.source.as_ref()
    }

    /// Filter pipeline.
    pub fn filters(&self) -> &TableFilters {
        &self.filters
    }

    /// Filter pipeline for direct edits; call [`TableView::rebuild`] or
    /// [`TableView::request_rebuild`] afterwards.
    pub fn filters_mut(&mut self) -> &mut TableFilters {
        &mut self.filters
    }

    /// Table currently displayed.
    pub fn display(&self) -> &TableRef {
        &self.display
    }

    /// Selection and scroll state.
    pub fn view(&self) -> &ViewState {
        &self.view
    }

    /// Selection and scroll state, mutable.
    pub fn view_mut(&mut self) -> &mut ViewState {
        &mut self.view
    }

    /// Row height function.
    pub fn metrics(&self) -> RowMetrics {
        self.metrics
    }

    /// Why the display table has no rows, if it has none.
    pub fn no_data_reason(&self) -> Option<&str> {
        self.no_data_reason.as_deref()
    }

    /// Header affordances of the source's columns.
    pub fn column_states(&self) -> Vec<ColumnState> {
        match &self.source {
            Some(source) => self.filters.column_states(source.as_ref()),
            None => Vec::new(),
        }
    }

    /// Start replacing the display table with `new_table`.
    ///
    /// `None` when nothing is displayed or the tables read different base
    /// data; the caller then resets the view instead of remapping it.
    pub fn begin_update(&self, new_table: &TableRef) -> Option<TableUpdate> {
        if self.display.row_count() == 0 {
            return None;
        }
        TableUpdate::begin(&self.display, new_table)
    }

    /// Commit `new_table` as the display table, ending `update`.
    pub fn end_update(&mut self, update: Option<TableUpdate>, new_table: TableRef) {
        drop(update);
        self.display = new_table;
    }

    /// Apply an edit to the filters and schedule a rebuild if it changed
    /// anything.
    pub fn edit(&mut self, now: Instant, edit: impl FnOnce(&mut TableFilters) -> bool) -> bool {
        let changed = edit(&mut self.filters);
        if changed {
            self.debounce.request(now);
        }
        changed
    }

    /// Schedule a rebuild after the debounce interval.
    pub fn request_rebuild(&mut self, now: Instant) {
        self.debounce.request(now);
    }

    /// Whether a scheduled rebuild has not run yet.
    pub fn is_rebuild_pending(&self) -> bool {
        self.debounce.is_pending()
    }

    /// Run the scheduled rebuild if it is due at `now`.
    pub fn poll(&mut self, now: Instant) -> Option<RemapOutcome> {
        self.debounce.take_ready(now).then(|| self.rebuild())
    }

    /// Rebuild the display table from the source and remap the view onto it.
    pub fn rebuild(&mut self) -> RemapOutcome {
        self.debounce.cancel();
        let (new_table, reason) = self.build_display();
        self.restore_expanded(&new_table);

        let update = self.begin_update(&new_table);
        let outcome = self
            .view
            .rebuild(update.as_ref(), new_table.as_ref(), self.metrics);
        self.end_update(update, new_table);
        self.no_data_reason = reason;
        debug!(
            rows = self.display.row_count(),
            visible = self.view.visible_row_count(),
            remapped = outcome.remapped,
            "Display table rebuilt"
        );
        outcome
    }

    /// Attach a different source, keeping the filters when the new source
    /// has the same columns.
    pub fn replace_source(&mut self, source: Option<TableRef>) -> RemapOutcome {
        let keep_filters = match (&self.source, &source) {
            (Some(old), Some(new)) => old.columns() == new.columns(),
            _ => false,
        };
        if !keep_filters {
            self.filters = match &source {
                Some(table) => TableFilters::for_table(table.as_ref()),
                None => TableFilters::new(Vec::new()),
            };
        }
        self.source = source;
        self.rebuild()
    }

    /// Expand or collapse a cell of the display table.
    ///
    /// Returns `false` if the cell holds no expand control.
    pub fn expand_cell(&mut self, row: usize, col: usize, expand: bool) -> bool {
        match self.display.expand_cell(row, col, expand) {
            Some(range) => {
                self.view
                    .on_cell_expanded(self.display.as_ref(), range, self.metrics);
                true
            }
            None => false,
        }
    }

    /// Expand every header row.
    pub fn expand_all(&mut self) {
        for row in 0..self.display.row_count() {
            if let Some(col) = self.display.expand_column(row) {
                self.display.expand_cell(row, col, true);
            }
        }
        self.view.reset(self.display.as_ref(), self.metrics);
    }

    fn build_display(&self) -> (TableRef, Option<String>) {
        let Some(source) = &self.source else {
            let empty: TableRef = Rc::new(DataTable::empty("", &[]));
            return (empty, Some(NO_SOURCE_REASON.to_string()));
        };
        match self.filters.create_display_table(source) {
            Ok(table) if table.row_count() > 0 => (table, None),
            Ok(table) => {
                let reason = if source.row_count() == 0 {
                    EMPTY_TABLE_REASON
                } else {
                    NO_MATCH_REASON
                };
                (table, Some(reason.to_string()))
            }
            Err(err) => {
                warn!(table = source.name(), error = %err, "Filters could not be applied");
                let empty: TableRef = Rc::new(DataTable::empty(source.name(), source.columns()));
                (empty, Some(err.to_string()))
            }
        }
    }

    /// Expand the headers of `new_table` that were expanded on screen.
    fn restore_expanded(&self, new_table: &TableRef) {
        if !self.display.is_tree() || !new_table.is_tree() {
            return;
        }
        let expanded: Vec<RowLink> = (0..self.display.row_count())
            .filter(|&row| self.display.subtree_len(row) > 0 && self.display.is_expanded(row))
            .filter_map(|row| self.display.link_to(row))
            .collect();
        for link in &expanded {
            if let Some(row) = link.apply(new_table.as_ref()) {
                if let Some(col) = new_table.expand_column(row) {
                    new_table.expand_cell(row, col, true);
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "table_view_tests.rs"]
mod tests;
