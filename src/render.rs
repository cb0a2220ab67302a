//! Plain-text rendering of tables for the terminal.
//!
//! Columns are padded to their widest cell, measured in terminal cells, and
//! numeric columns are right-aligned. Cells of expandable columns carry the
//! row's indentation and an expand marker.

use crate::diff::DiffSums;
use crate::model::{format_bytes, PlainFormatter, SizeFormatter, Table, ValueFormatter};
use crate::view_state::TableView;
use unicode_width::UnicodeWidthStr;

/// Marker of a collapsed header cell.
pub const COLLAPSED_MARKER: &str = "▸ ";
/// Marker of an expanded header cell.
pub const EXPANDED_MARKER: &str = "▾ ";

const COLUMN_GAP: &str = "  ";
const INDENT: &str = "  ";

/// Output settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderOptions {
    /// Show sizes as KB/MB/GB.
    pub human_readable_sizes: bool,
    /// Maximum number of rows printed.
    pub max_rows: usize,
}

impl RenderOptions {
    fn formatter(&self) -> &'static dyn ValueFormatter {
        if self.human_readable_sizes {
            &SizeFormatter
        } else {
            &PlainFormatter
        }
    }

    fn size(&self, bytes: i64) -> String {
        if self.human_readable_sizes {
            format_bytes(bytes)
        } else {
            bytes.to_string()
        }
    }
}

/// Text of one cell, including indentation and expand marker.
pub fn cell_text(table: &dyn Table, row: usize, col: usize, formatter: &dyn ValueFormatter) -> String {
    let value = table.row_value_string(row, col, formatter);
    let state = table.cell_expand_state(row, col);
    if !state.is_column_expandable {
        return value;
    }
    let marker = match (state.is_expandable, state.is_expanded) {
        (true, true) => EXPANDED_MARKER,
        (true, false) => COLLAPSED_MARKER,
        (false, _) => INDENT,
    };
    format!("{}{marker}{value}", INDENT.repeat(usize::from(state.expand_depth)))
}

/// Render `rows` of `table` under a header line.
pub fn render_rows(table: &dyn Table, rows: &[usize], formatter: &dyn ValueFormatter) -> String {
    let columns = table.columns();
    let cells: Vec<Vec<String>> = rows
        .iter()
        .map(|&row| {
            (0..columns.len())
                .map(|col| cell_text(table, row, col, formatter))
                .collect()
        })
        .collect();
    let widths: Vec<usize> = columns
        .iter()
        .enumerate()
        .map(|(col, info)| {
            cells
                .iter()
                .map(|line| line[col].width())
                .fold(info.name().width(), usize::max)
        })
        .collect();
    let right_aligned: Vec<bool> = columns
        .iter()
        .map(|info| info.value_type().is_numeric())
        .collect();

    let format_line = |texts: &mut dyn Iterator<Item = &str>| -> String {
        let padded: Vec<String> = texts
            .enumerate()
            .map(|(col, text)| pad(text, widths[col], right_aligned[col]))
            .collect();
        padded.join(COLUMN_GAP).trim_end().to_string()
    };

    let mut lines = Vec::with_capacity(rows.len() + 2);
    lines.push(format_line(&mut columns.iter().map(|c| c.name())));
    lines.push(
        widths
            .iter()
            .map(|&w| "-".repeat(w))
            .collect::<Vec<_>>()
            .join(COLUMN_GAP),
    );
    for line in &cells {
        lines.push(format_line(&mut line.iter().map(String::as_str)));
    }
    lines.join("\n")
}

fn pad(text: &str, width: usize, right: bool) -> String {
    let fill = " ".repeat(width.saturating_sub(text.width()));
    if right {
        format!("{fill}{text}")
    } else {
        format!("{text}{fill}")
    }
}

/// Render the visible rows of `view` from its first visible row down.
///
/// Ends with a line counting the rows left out, or the view's no-data reason
/// when nothing is displayed.
pub fn render_view(view: &TableView, options: &RenderOptions) -> String {
    let table = view.display();
    let state = view.view();
    let mut rows = Vec::new();
    let mut row = state.first_visible();
    while row < table.row_count() && rows.len() < options.max_rows {
        rows.push(row);
        row = table.next_visible_row(row);
    }

    let mut out = render_rows(table.as_ref(), &rows, options.formatter());
    if let Some(reason) = view.no_data_reason() {
        out.push_str(&format!("\n({reason})"));
    } else {
        let shown_before = state.visible_index(state.first_visible()).unwrap_or(0);
        let remaining = state
            .visible_row_count()
            .saturating_sub(shown_before + rows.len());
        if remaining > 0 {
            out.push_str(&format!("\n… {remaining} more rows"));
        }
    }
    out
}

/// Render diff totals, one per line.
pub fn render_sums(sums: &DiffSums, options: &RenderOptions) -> String {
    let growth = sums.growth();
    let sign = if growth > 0 { "+" } else { "" };
    [
        format!("Older total: {}", options.size(sums.older_total())),
        format!("Newer total: {}", options.size(sums.newer_total())),
        format!(
            "Same: {} -> {}",
            options.size(sums.same_older),
            options.size(sums.same_newer)
        ),
        format!("New: {}", options.size(sums.new)),
        format!("Deleted: {}", options.size(sums.deleted)),
        format!("Growth: {sign}{}", options.size(growth)),
    ]
    .join("\n")
}
