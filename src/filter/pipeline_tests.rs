//! Tests for the editable filter pipeline.

use super::*;
use crate::model::{ColumnData, ColumnInfo, ColumnRole, DataTable, Value, ValueType};
use std::cell::Cell;
use std::rc::Rc;

const TYPE: usize = 0;
const SIZE: usize = 1;
const NAME: usize = 2;

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

fn column(table: &TableRef, col: usize) -> Vec<Value> {
    (0..table.row_count()).map(|r| table.cell(r, col)).collect()
}

fn expand_all(table: &TableRef) {
    for row in 0..table.row_count() {
        if let Some(col) = table.expand_column(row) {
            table.expand_cell(row, col, true);
        }
    }
}

#[test]
fn new_pipeline_holds_only_the_default_sort() {
    let filters = TableFilters::new(Vec::new());
    assert!(filters.is_empty());
    assert_eq!(filters.root().filters().len(), 1);
    assert!(matches!(filters.root().filters()[0], Filter::DefaultSort(_)));
}

#[test]
fn set_sort_is_idempotent_and_notifies_once() {
    let calls = Rc::new(Cell::new(0));
    let mut filters = TableFilters::new(Vec::new());
    let counter = calls.clone();
    filters.on_changed(move || counter.set(counter.get() + 1));

    assert!(filters.set_sort(SIZE, SortDirection::Ascending));
    assert!(!filters.set_sort(SIZE, SortDirection::Ascending));
    assert_eq!(calls.get(), 1);
    assert!(!filters.is_empty());
}

#[test]
fn set_sort_replaces_and_add_sub_sort_appends() {
    let mut filters = TableFilters::new(Vec::new());
    filters.set_sort(TYPE, SortDirection::Ascending);
    filters.add_sub_sort(SIZE, SortDirection::Descending);
    assert_eq!(
        filters.sort_levels(),
        vec![
            SortLevel::new(TYPE, SortDirection::Ascending),
            SortLevel::new(SIZE, SortDirection::Descending),
        ]
    );

    let table = filters
        .create_display_table(&objects())
        .expect("valid filters");
    assert_eq!(
        column(&table, SIZE),
        vec![
            Value::I64(50),
            Value::I64(30),
            Value::I64(10),
            Value::I64(40),
            Value::I64(20),
        ]
    );

    filters.set_sort(NAME, SortDirection::Ascending);
    assert_eq!(
        filters.sort_levels(),
        vec![SortLevel::new(NAME, SortDirection::Ascending)]
    );
}

#[test]
fn matches_go_first_and_replace_in_place() {
    let mut filters = TableFilters::new(Vec::new());
    filters.set_sort(SIZE, SortDirection::Descending);
    assert!(filters.set_match(NAME, "fo", false));
    assert!(matches!(filters.root().filters()[0], Filter::Match(_)));

    assert!(filters.set_match(NAME, "foo", true));
    assert!(!filters.set_match(NAME, "foo", true));
    assert_eq!(filters.matches().count(), 1);

    let table = filters
        .create_display_table(&objects())
        .expect("valid filters");
    assert_eq!(column(&table, NAME), vec![Value::str("foo")]);

    assert!(filters.set_match(NAME, "", false));
    assert_eq!(filters.matches().count(), 0);
}

#[test]
fn matches_on_different_columns_combine() {
    let mut filters = TableFilters::new(Vec::new());
    filters.set_match(NAME, "fo", false);
    filters.set_match(TYPE, "a", true);
    let table = filters
        .create_display_table(&objects())
        .expect("valid filters");
    assert_eq!(column(&table, SIZE), vec![Value::I64(10), Value::I64(30)]);
}

#[test]
fn add_group_nests_below_the_deepest_group() {
    let mut filters = TableFilters::new(Vec::new());
    assert!(filters.add_group(TYPE, SortDirection::Ascending));
    assert!(filters.add_group(NAME, SortDirection::Ascending));
    assert!(!filters.add_group(TYPE, SortDirection::Ascending));
    assert_eq!(filters.grouped_columns(), vec![TYPE, NAME]);

    let outer = match &filters.root().filters()[1] {
        Filter::Group(group) => group,
        other => panic!("expected group, got {other:?}"),
    };
    let inner = match outer.sub() {
        Some(Filter::Group(group)) => group,
        other => panic!("expected nested group, got {other:?}"),
    };
    assert!(matches!(inner.sub(), Some(Filter::DefaultSort(_))));
}

#[test]
fn grouped_members_follow_the_user_sort() {
    let mut filters = TableFilters::new(Vec::new());
    filters.add_group(TYPE, SortDirection::Ascending);
    filters.set_sort(SIZE, SortDirection::Descending);

    let table = filters
        .create_display_table(&objects())
        .expect("valid filters");
    expand_all(&table);
    // A, 50, 30, 10, B, 40, 20
    assert_eq!(table.cell(1, SIZE), Value::I64(50));
    assert_eq!(table.cell(3, SIZE), Value::I64(10));
    assert_eq!(table.cell(5, SIZE), Value::I64(40));
    assert_eq!(table.cell(0, SIZE), Value::I64(90));
}

#[test]
fn removing_the_outer_group_promotes_the_inner_one() {
    let mut filters = TableFilters::new(Vec::new());
    filters.add_group(TYPE, SortDirection::Ascending);
    filters.add_group(NAME, SortDirection::Ascending);

    assert!(filters.remove_group(TYPE));
    assert_eq!(filters.grouped_columns(), vec![NAME]);
    assert!(!filters.remove_group(TYPE));

    assert!(filters.remove_group(NAME));
    assert!(filters.grouped_columns().is_empty());
    assert!(filters.is_empty());
}

#[test]
fn removing_the_inner_group_keeps_the_outer_one() {
    let mut filters = TableFilters::new(Vec::new());
    filters.add_group(TYPE, SortDirection::Ascending);
    filters.add_group(NAME, SortDirection::Ascending);
    filters.set_sort(SIZE, SortDirection::Ascending);

    assert!(filters.remove_group(NAME));
    assert_eq!(filters.grouped_columns(), vec![TYPE]);
    let table = filters
        .create_display_table(&objects())
        .expect("valid filters");
    expand_all(&table);
    assert_eq!(table.cell(1, SIZE), Value::I64(10));
}

#[test]
fn simplify_without_fallback_empties_the_root() {
    let mut filters = TableFilters::new(Vec::new());
    assert!(filters.simplify());
    assert!(filters.root().filters().is_empty());
    assert!(filters.is_empty());
}

#[test]
fn simplify_with_fallback_keeps_one_filter() {
    let mut filters = TableFilters::new(vec![SortLevel::new(SIZE, SortDirection::Descending)]);
    assert!(!filters.simplify());
    assert_eq!(filters.root().filters().len(), 1);
    assert!(filters.is_empty());

    let table = filters
        .create_display_table(&objects())
        .expect("valid filters");
    assert_eq!(table.cell(0, SIZE), Value::I64(50));
}

#[test]
fn sorting_after_simplify_restores_the_sort_slots() {
    let mut filters = TableFilters::new(Vec::new());
    filters.add_group(TYPE, SortDirection::Ascending);
    filters.simplify();
    assert!(filters.set_sort(SIZE, SortDirection::Descending));

    let table = filters
        .create_display_table(&objects())
        .expect("valid filters");
    expand_all(&table);
    assert_eq!(table.cell(1, SIZE), Value::I64(50));
}

#[test]
fn column_states_reflect_the_tree() {
    let mut filters = TableFilters::new(vec![SortLevel::new(NAME, SortDirection::Ascending)]);
    filters.add_group(TYPE, SortDirection::Ascending);
    filters.set_sort(SIZE, SortDirection::Descending);

    let source = objects();
    let states = filters.column_states(source.as_ref());
    assert!(states[TYPE].grouped);
    assert_eq!(states[SIZE].sorted, SortDirection::Descending);
    assert_eq!(states[NAME].default_sorted, SortDirection::Ascending);
    assert_eq!(states[NAME].sorted, SortDirection::None);
}

#[test]
fn clear_resets_everything() {
    let mut filters = TableFilters::new(Vec::new());
    filters.set_match(NAME, "a", false);
    filters.add_group(TYPE, SortDirection::None);
    filters.set_sort(SIZE, SortDirection::Ascending);
    assert!(filters.clear());
    assert!(filters.is_empty());
    assert!(!filters.clear());
}

#[test]
fn snapshot_is_independent_and_equivalent() {
    let mut filters = TableFilters::new(Vec::new());
    filters.add_group(TYPE, SortDirection::Descending);
    filters.set_sort(SIZE, SortDirection::Ascending);
    let copy = filters.snapshot();

    let source = objects();
    let a = filters.create_display_table(&source).expect("valid filters");
    let b = copy.create_display_table(&source).expect("valid filters");
    expand_all(&a);
    expand_all(&b);
    assert_eq!(column(&a, SIZE), column(&b, SIZE));

    filters.set_sort(SIZE, SortDirection::Descending);
    assert_eq!(
        copy.sort_levels(),
        vec![SortLevel::new(SIZE, SortDirection::Ascending)]
    );
    let unique = copy.root().filters()[1].unique_sorts();
    assert!(Rc::ptr_eq(&unique[0], copy.user_sort()));
}

#[test]
fn spec_round_trip_preserves_rows_and_aliasing() {
    let mut filters = TableFilters::new(vec![SortLevel::new(NAME, SortDirection::Ascending)]);
    filters.set_match(NAME, "a", false);
    filters.add_group(TYPE, SortDirection::Ascending);
    filters.set_sort(SIZE, SortDirection::Descending);

    let json = filters.to_spec().to_json().expect("serializable");
    let spec = FilterTreeSpec::from_json(&json).expect("parsable");
    assert_eq!(spec.sorts.len(), 2);
    let mut restored = TableFilters::from_spec(&spec).expect("valid spec");

    let source = objects();
    let a = filters.create_display_table(&source).expect("valid filters");
    let b = restored
        .create_display_table(&source)
        .expect("valid filters");
    expand_all(&a);
    expand_all(&b);
    assert_eq!(column(&a, NAME), column(&b, NAME));

    restored.set_sort(SIZE, SortDirection::Ascending);
    let b = restored
        .create_display_table(&source)
        .expect("valid filters");
    expand_all(&b);
    assert_eq!(b.cell(1, SIZE), Value::I64(20));
}
