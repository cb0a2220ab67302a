//! Property-based tests for filter, diff and remap invariants.
//!
//! Tests validate:
//! 1. A copied filter tree derives the same table as the original
//! 2. Setting the same sort twice reports no change the second time
//! 3. Diff totals add up to each side's size column
//! 4. A selected row that survives a rebuild keeps its link

use proptest::prelude::*;
use snapview::diff::diff_tables;
use snapview::filter::{FilterTreeSpec, TableFilters};
use snapview::model::{
    ColumnData, ColumnInfo, ColumnRole, DataTable, SortDirection, Table, TableRef, Value,
    ValueType,
};
use snapview::view_state::{RowMetrics, TableView};
use std::collections::BTreeMap;
use std::rc::Rc;
use std::time::Duration;

const COLUMNS: usize = 3;

fn build_table(rows: &[(usize, u64, String)]) -> TableRef {
    let types: Vec<&str> = rows.iter().map(|(t, _, _)| ["A", "B", "C"][*t]).collect();
    Rc::new(
        DataTable::new(
            "objects",
            rows.len(),
            vec![
                (
                    ColumnInfo::new("Type", ValueType::Str),
                    ColumnData::strings(types),
                ),
                (
                    ColumnInfo::new("Size", ValueType::U64).with_role(ColumnRole::Size),
                    ColumnData::U64(rows.iter().map(|(_, s, _)| *s).collect()),
                ),
                (
                    ColumnInfo::new("Name", ValueType::Str),
                    ColumnData::strings(rows.iter().map(|(_, _, n)| n.as_str())),
                ),
            ],
        )
        .expect("valid table"),
    )
}

fn rows() -> impl Strategy<Value = Vec<(usize, u64, String)>> {
    prop::collection::vec((0usize..3, 0u64..1000, "[a-c]{0,3}"), 0..40)
}

fn direction(descending: bool) -> SortDirection {
    if descending {
        SortDirection::Descending
    } else {
        SortDirection::Ascending
    }
}

#[derive(Debug, Clone)]
enum Edit {
    Sort(usize, bool),
    SubSort(usize, bool),
    Group(usize),
    Ungroup(usize),
    Match(usize, String, bool),
    Clear,
    Simplify,
}

fn edit(grouping: bool) -> BoxedStrategy<Edit> {
    let ordering = prop_oneof![
        (0..COLUMNS, any::<bool>()).prop_map(|(c, d)| Edit::Sort(c, d)),
        (0..COLUMNS, any::<bool>()).prop_map(|(c, d)| Edit::SubSort(c, d)),
        (0..COLUMNS, "[a-c]{0,2}", any::<bool>()).prop_map(|(c, p, e)| Edit::Match(c, p, e)),
        Just(Edit::Clear),
        Just(Edit::Simplify),
    ];
    if grouping {
        prop_oneof![
            4 => ordering,
            1 => (0..COLUMNS).prop_map(Edit::Group),
            1 => (0..COLUMNS).prop_map(Edit::Ungroup),
        ]
        .boxed()
    } else {
        ordering.boxed()
    }
}

fn apply(filters: &mut TableFilters, edit: &Edit) {
    match edit {
        Edit::Sort(c, d) => {
            filters.set_sort(*c, direction(*d));
        }
        Edit::SubSort(c, d) => {
            filters.add_sub_sort(*c, direction(*d));
        }
        Edit::Group(c) => {
            filters.add_group(*c, SortDirection::Ascending);
        }
        Edit::Ungroup(c) => {
            filters.remove_group(*c);
        }
        Edit::Match(c, p, e) => {
            filters.set_match(*c, p, *e);
        }
        Edit::Clear => {
            filters.clear();
        }
        Edit::Simplify => {
            filters.simplify();
        }
    }
}

fn all_cells(table: &dyn Table) -> Vec<Vec<Value>> {
    (0..table.row_count())
        .map(|r| (0..table.column_count()).map(|c| table.cell(r, c)).collect())
        .collect()
}

// ===== Property 1: Copy Determinism =====

proptest! {
    #[test]
    fn copied_filters_derive_identical_tables(
        rows in rows(),
        edits in prop::collection::vec(edit(true), 0..8),
    ) {
        let source = build_table(&rows);
        let mut filters = TableFilters::new(Vec::new());
        for e in &edits {
            apply(&mut filters, e);
        }

        let original = filters.create_display_table(&source).expect("valid filters");
        let copy = filters.snapshot().create_display_table(&source).expect("valid filters");
        prop_assert_eq!(all_cells(original.as_ref()), all_cells(copy.as_ref()));

        let json = filters.to_spec().to_json().expect("serializable");
        let spec = FilterTreeSpec::from_json(&json).expect("parsable");
        let restored = TableFilters::from_spec(&spec).expect("valid spec");
        let restored = restored.create_display_table(&source).expect("valid filters");
        prop_assert_eq!(all_cells(original.as_ref()), all_cells(restored.as_ref()));
    }
}

// ===== Property 2: Sort Idempotence =====

proptest! {
    #[test]
    fn repeating_a_sort_changes_nothing(
        edits in prop::collection::vec(edit(true), 0..6),
        column in 0..COLUMNS,
        descending in any::<bool>(),
    ) {
        let mut filters = TableFilters::new(Vec::new());
        for e in &edits {
            apply(&mut filters, e);
        }
        filters.set_sort(column, direction(descending));
        prop_assert!(!filters.set_sort(column, direction(descending)));
    }
}

// ===== Property 3: Diff Totals =====

fn keyed(entries: &BTreeMap<String, u64>) -> TableRef {
    Rc::new(
        DataTable::new(
            "objects",
            entries.len(),
            vec![
                (
                    ColumnInfo::new("Label", ValueType::Str).with_role(ColumnRole::Key),
                    ColumnData::strings(entries.keys()),
                ),
                (
                    ColumnInfo::new("Size", ValueType::U64).with_role(ColumnRole::Size),
                    ColumnData::U64(entries.values().copied().collect()),
                ),
            ],
        )
        .expect("valid table"),
    )
}

proptest! {
    #[test]
    fn diff_totals_match_each_side(
        a in prop::collection::btree_map("[a-e]{1,2}", 0u64..1000, 0..12),
        b in prop::collection::btree_map("[a-e]{1,2}", 0u64..1000, 0..12),
        first_is_older in any::<bool>(),
    ) {
        let diff = diff_tables(keyed(&a), keyed(&b), first_is_older, false).expect("diffable");
        let sums = diff.sums();
        let (older, newer) = if first_is_older { (&a, &b) } else { (&b, &a) };
        let total = |m: &BTreeMap<String, u64>| m.values().map(|&v| v as i64).sum::<i64>();

        prop_assert_eq!(sums.older_total(), total(older));
        prop_assert_eq!(sums.newer_total(), total(newer));

        diff.on_snapshots_swapped();
        let swapped = diff.sums();
        prop_assert_eq!(swapped.older_total(), total(newer));
        prop_assert_eq!(swapped.newer_total(), total(older));
    }
}

// ===== Property 4: Remap Keeps Links =====

proptest! {
    #[test]
    fn surviving_selection_keeps_its_link(
        rows in rows(),
        selected in any::<prop::sample::Index>(),
        edits in prop::collection::vec(edit(false), 1..5),
    ) {
        prop_assume!(!rows.is_empty());
        let source = build_table(&rows);
        let mut view = TableView::new(source, RowMetrics::default(), Duration::ZERO);
        let old_row = selected.index(rows.len());
        view.view_mut().select(Some(old_row));
        let link = view.display().link_to(old_row).expect("row exists");

        for e in &edits {
            apply(view.filters_mut(), e);
        }
        let outcome = view.rebuild();

        let survived = link.apply(view.display().as_ref());
        prop_assert_eq!(outcome.selected, survived);
        if let Some(row) = outcome.selected {
            prop_assert_eq!(view.display().link_to(row), Some(link));
        }
    }
}
