//! Tests for the table view rebuild cycle.

use super::*;
use crate::model::{
    ColumnData, ColumnInfo, ColumnRole, SortDirection, Value, ValueType,
};

const TYPE: usize = 0;
const SIZE: usize = 1;
const NAME: usize = 2;
const DEBOUNCE: Duration = Duration::from_millis(150);

fn objects() -> TableRef {
    Rc::new(
        DataTable::new(
            "objects",
            5,
            vec![
                (
                    ColumnInfo::new("Type", ValueType::Str),
                    ColumnData::strings(["A", "B", "A", "B", "A"]),
                ),
                (
                    ColumnInfo::new("Size", ValueType::I64).with_role(ColumnRole::Size),
                    ColumnData::I64(vec![10, 20, 30, 40, 50]),
                ),
                (
                    ColumnInfo::new("Name", ValueType::Str),
                    ColumnData::strings(["foo", "bar", "food", "baz", "qux"]),
                ),
            ],
        )
        .expect("valid table"),
    )
}

fn view() -> TableView {
    TableView::new(objects(), RowMetrics::default(), DEBOUNCE)
}

#[test]
fn new_view_shows_the_source() {
    let view = view();
    assert_eq!(view.display().row_count(), 5);
    assert_eq!(view.no_data_reason(), None);
    assert_eq!(view.view().total_height(), 100);
}

#[test]
fn selection_survives_a_sort_rebuild() {
    let mut view = view();
    view.view_mut().select(Some(1));
    view.filters_mut().set_sort(SIZE, SortDirection::Descending);
    let outcome = view.rebuild();

    let selected = outcome.selected.expect("row kept");
    assert_eq!(view.display().cell(selected, SIZE), Value::I64(20));
}

#[test]
fn filtering_everything_out_sets_a_reason() {
    let mut view = view();
    view.filters_mut().set_match(NAME, "nothing", false);
    let outcome = view.rebuild();

    assert_eq!(view.display().row_count(), 0);
    assert_eq!(view.no_data_reason(), Some(NO_MATCH_REASON));
    assert!(!outcome.remapped);

    view.filters_mut().remove_match(NAME);
    view.rebuild();
    assert_eq!(view.no_data_reason(), None);
    assert_eq!(view.display().row_count(), 5);
}

#[test]
fn filter_errors_become_an_empty_table_with_a_reason() {
    let mut view = view();
    view.filters_mut().add_group(17, SortDirection::Ascending);
    view.rebuild();

    assert_eq!(view.display().row_count(), 0);
    assert_eq!(view.display().column_count(), 3);
    assert!(view.no_data_reason().is_some_and(|r| r.contains("17")));
}

#[test]
fn begin_update_requires_a_shared_origin() {
    let view = view();
    let same = view.display().clone();
    assert!(view.begin_update(&same).is_some());
    assert!(view.begin_update(&objects()).is_none());
}

#[test]
fn detached_view_explains_itself() {
    let mut view = TableView::detached(RowMetrics::default(), DEBOUNCE);
    assert_eq!(view.no_data_reason(), Some(NO_SOURCE_REASON));

    view.replace_source(Some(objects()));
    assert_eq!(view.display().row_count(), 5);
    assert_eq!(view.no_data_reason(), None);

    view.replace_source(None);
    assert_eq!(view.no_data_reason(), Some(NO_SOURCE_REASON));
}

#[test]
fn replacing_with_a_compatible_source_keeps_filters() {
    let mut view = view();
    view.filters_mut().set_match(TYPE, "b", true);
    view.rebuild();
    assert_eq!(view.display().row_count(), 2);

    let outcome = view.replace_source(Some(objects()));
    assert_eq!(view.display().row_count(), 2);
    assert!(!outcome.remapped);
}

#[test]
fn expanded_headers_stay_expanded_across_rebuilds() {
    let mut view = view();
    view.filters_mut().add_group(TYPE, SortDirection::Ascending);
    view.rebuild();
    assert_eq!(view.view().visible_row_count(), 2);

    assert!(view.expand_cell(0, TYPE, true));
    assert_eq!(view.view().visible_row_count(), 5);
    assert!(!view.expand_cell(1, TYPE, true));

    view.filters_mut().set_sort(SIZE, SortDirection::Descending);
    view.rebuild();
    let display = view.display();
    assert!(display.is_expanded(0));
    assert!(!display.is_expanded(4));
    assert_eq!(display.cell(1, SIZE), Value::I64(50));
    assert_eq!(view.view().visible_row_count(), 5);
}

#[test]
fn edits_wait_for_the_debounce_interval() {
    let start = Instant::now();
    let mut view = view();
    assert!(view.edit(start, |f| f.set_sort(SIZE, SortDirection::Descending)));
    assert!(!view.edit(start, |f| f.set_sort(SIZE, SortDirection::Descending)));
    assert!(view.is_rebuild_pending());

    assert!(view.poll(start + Duration::from_millis(10)).is_none());
    assert_eq!(view.display().cell(0, SIZE), Value::I64(10));

    assert!(view.poll(start + DEBOUNCE).is_some());
    assert_eq!(view.display().cell(0, SIZE), Value::I64(50));
    assert!(!view.is_rebuild_pending());
}

#[test]
fn expand_all_opens_every_header() {
    let mut view = view();
    view.filters_mut().add_group(TYPE, SortDirection::Ascending);
    view.rebuild();
    view.expand_all();
    assert_eq!(view.view().visible_row_count(), 7);
    assert_eq!(view.view().total_height(), 2 * 24 + 5 * 20);
}
