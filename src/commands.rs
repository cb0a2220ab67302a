//! The operations behind the `snapview` subcommands.
//!
//! Each command loads nothing itself: it receives already-loaded snapshots,
//! builds a [`TableView`], applies the requested filters and renders the
//! result to a string.

use crate::config::ResolvedConfig;
use crate::diff::sum_by_class;
use crate::model::{AppError, Snapshot, SnapshotPair, SortDirection, Table, TableRef};
use crate::render::{render_sums, render_view, RenderOptions};
use crate::view_state::TableView;
use std::rc::Rc;
use tracing::info;

/// Filters to apply before printing, with columns given by name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewRequest {
    /// Sort keys, most significant first, as `COLUMN` or `COLUMN:asc|desc`.
    pub sort: Vec<String>,
    /// Grouping columns, outermost first.
    pub group: Vec<String>,
    /// `(column, pattern)` searches.
    pub matches: Vec<(String, String)>,
    /// Searches compare whole values.
    pub exact: bool,
    /// Expand every group header.
    pub expand_all: bool,
}

/// Split `COLUMN[:asc|desc]` into its column name and direction.
///
/// Anything after the last `:` that is not a direction stays part of the name.
pub fn parse_sort_key(key: &str) -> (&str, SortDirection) {
    match key.rsplit_once(':') {
        Some((name, dir)) if dir.eq_ignore_ascii_case("desc") => (name, SortDirection::Descending),
        Some((name, dir)) if dir.eq_ignore_ascii_case("asc") => (name, SortDirection::Ascending),
        _ => (key, SortDirection::Ascending),
    }
}

/// Split `COLUMN=PATTERN`.
pub fn parse_match(arg: &str) -> Option<(String, String)> {
    let (column, pattern) = arg.split_once('=')?;
    Some((column.to_string(), pattern.to_string()))
}

fn column(table: &dyn Table, name: &str) -> Result<usize, AppError> {
    table
        .column_index(name)
        .ok_or_else(|| AppError::UnknownColumn {
            table: table.name().to_string(),
            column: name.to_string(),
        })
}

fn render_options(config: &ResolvedConfig) -> RenderOptions {
    RenderOptions {
        human_readable_sizes: config.human_readable_sizes,
        max_rows: config.max_rows,
    }
}

/// Build a view over `source` with the requested filters applied.
///
/// # Errors
///
/// Returns [`AppError::UnknownColumn`] for a column name `source` lacks.
pub fn build_view(
    source: TableRef,
    request: &ViewRequest,
    config: &ResolvedConfig,
) -> Result<TableView, AppError> {
    let mut view = TableView::new(source.clone(), config.row_metrics(), config.filter_debounce());
    let filters = view.filters_mut();
    for (column_name, pattern) in &request.matches {
        filters.set_match(column(source.as_ref(), column_name)?, pattern, request.exact);
    }
    for name in &request.group {
        filters.add_group(column(source.as_ref(), name)?, SortDirection::Ascending);
    }
    for (i, key) in request.sort.iter().enumerate() {
        let (name, direction) = parse_sort_key(key);
        let index = column(source.as_ref(), name)?;
        if i == 0 {
            filters.set_sort(index, direction);
        } else {
            filters.add_sub_sort(index, direction);
        }
    }
    view.rebuild();
    if request.expand_all {
        view.expand_all();
    }
    Ok(view)
}

/// `snapview show`: one table of one snapshot.
///
/// # Errors
///
/// Fails on an unknown table or column name.
pub fn show(
    snapshot: &Snapshot,
    table: &str,
    request: &ViewRequest,
    config: &ResolvedConfig,
) -> Result<String, AppError> {
    let source = snapshot
        .table(table)
        .ok_or_else(|| AppError::UnknownTable(table.to_string()))?;
    let view = build_view(source, request, config)?;
    info!(
        table,
        rows = view.display().row_count(),
        "Rendering table"
    );
    Ok(render_view(&view, &render_options(config)))
}

/// `snapview diff`: one table of two snapshots, merged and classified.
///
/// Prints the merged rows followed by the size totals of the rows that
/// survived the filters.
///
/// # Errors
///
/// Fails if the table is missing on either side, the sides share no key
/// column, or a column name is unknown.
pub fn diff(
    first: Snapshot,
    second: Snapshot,
    table: &str,
    request: &ViewRequest,
    config: &ResolvedConfig,
) -> Result<String, AppError> {
    let mut pair = SnapshotPair::new();
    pair.open_first(first);
    pair.open_second(second);
    let merged: TableRef = Rc::new(pair.diff(table)?);
    let view = build_view(merged, request, config)?;

    let options = render_options(config);
    let mut out = render_view(&view, &options);
    if let Some(sums) = sum_by_class(view.display().as_ref()) {
        out.push_str("\n\n");
        out.push_str(&render_sums(&sums, &options));
    }
    Ok(out)
}

/// `snapview tables`: table names with row and column counts.
pub fn list_tables(snapshot: &Snapshot) -> String {
    let mut lines = vec![format!(
        "Session {} captured {}",
        snapshot.session_id(),
        snapshot.captured_at().to_rfc3339()
    )];
    for name in snapshot.table_names() {
        if let Some(table) = snapshot.table(name) {
            lines.push(format!(
                "{name}: {} rows, {} columns",
                table.row_count(),
                table.column_count()
            ));
        }
    }
    lines.join("\n")
}
