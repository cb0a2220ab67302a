//! Column matching and row pairing between two tables.

use super::table::{DiffTable, MergedColumn, MergedRow};
use super::{delta_column_name, DIFF_COLUMN};
use crate::model::value::cmp_value_slices;
use crate::model::{
    ColumnInfo, ColumnRole, DiffError, SortLevel, Table, TableRef, Value, ValueType,
};
use std::cmp::Ordering;
use tracing::{debug, info};

/// A column present in both tables with the same name and type.
#[derive(Debug, Clone)]
struct SharedColumn {
    info: ColumnInfo,
    first: usize,
    second: usize,
}

/// How two tables are compared.
///
/// Rows are identified by the values of the key columns: every shared
/// [`ColumnRole::Key`] column, plus shared [`ColumnRole::Identity`] columns
/// when both snapshots come from the same session (addresses are meaningless
/// across sessions).
#[derive(Debug)]
pub struct DiffSchema {
    first: TableRef,
    second: TableRef,
    first_is_older: bool,
    same_session: bool,
    shared: Vec<SharedColumn>,
    key: Vec<usize>,
}

impl DiffSchema {
    /// Match the columns of `first` and `second`.
    ///
    /// # Errors
    ///
    /// Returns [`DiffError::NoKeyColumns`] if the tables share no column usable
    /// as a row key.
    pub fn new(
        first: TableRef,
        second: TableRef,
        first_is_older: bool,
        same_session: bool,
    ) -> Result<Self, DiffError> {
        let shared: Vec<SharedColumn> = first
            .columns()
            .iter()
            .enumerate()
            .filter_map(|(index, info)| {
                let other = second.column_index(info.name())?;
                (second.columns()[other].value_type() == info.value_type()).then(|| {
                    SharedColumn {
                        info: info.clone(),
                        first: index,
                        second: other,
                    }
                })
            })
            .collect();
        let key: Vec<usize> = shared
            .iter()
            .enumerate()
            .filter(|(_, c)| match c.info.role() {
                ColumnRole::Key => true,
                ColumnRole::Identity => same_session,
                ColumnRole::Plain | ColumnRole::Size => false,
            })
            .map(|(i, _)| i)
            .collect();
        if key.is_empty() {
            return Err(DiffError::NoKeyColumns {
                table: first.name().to_string(),
            });
        }
        debug!(
            table = first.name(),
            shared = shared.len(),
            keys = key.len(),
            same_session,
            "Diff schema matched"
        );
        Ok(Self {
            first,
            second,
            first_is_older,
            same_session,
            shared,
            key,
        })
    }

    /// Whether identities take part in matching.
    pub fn same_session(&self) -> bool {
        self.same_session
    }

    /// Names of the key columns.
    pub fn key_columns(&self) -> Vec<&str> {
        self.key.iter().map(|&i| self.shared[i].info.name()).collect()
    }

    /// Names of the columns both tables share.
    pub fn shared_columns(&self) -> Vec<&str> {
        self.shared.iter().map(|c| c.info.name()).collect()
    }

    /// Pair rows and build the merged table.
    pub fn build(&self) -> DiffTable {
        let first = self.sorted_rows(&self.first, |c| c.first);
        let second = self.sorted_rows(&self.second, |c| c.second);
        let rows = self.pair(&first, &second);

        let mut columns = vec![ColumnInfo::new(DIFF_COLUMN, ValueType::Str)];
        let mut sources = vec![MergedColumn::Class];
        for c in &self.shared {
            columns.push(c.info.clone());
            sources.push(MergedColumn::Shared {
                first: c.first,
                second: c.second,
            });
        }
        if let Some(size) = self
            .shared
            .iter()
            .find(|c| c.info.role() == ColumnRole::Size)
        {
            let name = delta_column_name(size.info.name());
            if !self.shared.iter().any(|c| c.info.name() == name) {
                columns.push(ColumnInfo::new(name, ValueType::I64));
                sources.push(MergedColumn::Delta {
                    first: size.first,
                    second: size.second,
                });
            }
        }
        let default_sort = self.merged_default_sort();

        let table = DiffTable::new(
            self.first.clone(),
            self.second.clone(),
            self.first_is_older,
            columns,
            sources,
            rows,
            default_sort,
        );
        info!(
            table = table.name(),
            rows = table.row_count(),
            first_rows = self.first.row_count(),
            second_rows = self.second.row_count(),
            "Diff built"
        );
        table
    }

    /// Rows of `table` with their key and remaining values, ordered by key
    /// and then by the remaining values.
    fn sorted_rows(
        &self,
        table: &TableRef,
        index: impl Fn(&SharedColumn) -> usize,
    ) -> Vec<KeyedRow> {
        let key_columns: Vec<usize> =
            self.key.iter().map(|&i| index(&self.shared[i])).collect();
        let rest_columns: Vec<usize> = (0..self.shared.len())
            .filter(|i| !self.key.contains(i))
            .map(|i| index(&self.shared[i]))
            .collect();
        let mut rows: Vec<KeyedRow> = (0..table.row_count())
            .map(|row| KeyedRow {
                row,
                key: key_columns.iter().map(|&c| table.cell(row, c)).collect(),
                rest: rest_columns.iter().map(|&c| table.cell(row, c)).collect(),
            })
            .collect();
        rows.sort_by(|a, b| {
            cmp_value_slices(&a.key, &b.key).then_with(|| cmp_value_slices(&a.rest, &b.rest))
        });
        rows
    }

    /// Merge two key-ordered row lists.
    ///
    /// Within one key, rows with identical remaining values pair first; the
    /// rest pair up in order of their remaining values and the leftovers of
    /// the longer side stay unpaired.
    fn pair(&self, first: &[KeyedRow], second: &[KeyedRow]) -> Vec<MergedRow> {
        let mut merged = Vec::with_capacity(first.len().max(second.len()));
        let (mut i, mut j) = (0, 0);
        while i < first.len() || j < second.len() {
            let ord = match (first.get(i), second.get(j)) {
                (Some(a), Some(b)) => cmp_value_slices(&a.key, &b.key),
                (Some(_), None) => Ordering::Less,
                (None, _) => Ordering::Greater,
            };
            match ord {
                Ordering::Less => {
                    merged.push(MergedRow::first_only(first[i].row));
                    i += 1;
                }
                Ordering::Greater => {
                    merged.push(MergedRow::second_only(second[j].row));
                    j += 1;
                }
                Ordering::Equal => {
                    let a_end = run_end(first, i);
                    let b_end = run_end(second, j);
                    pair_run(&first[i..a_end], &second[j..b_end], &mut merged);
                    i = a_end;
                    j = b_end;
                }
            }
        }
        merged
    }

    /// The first table's default sort, re-indexed into the merged columns.
    fn merged_default_sort(&self) -> Vec<SortLevel> {
        self.first
            .default_sort()
            .iter()
            .filter_map(|level| {
                let position = self.shared.iter().position(|c| c.first == level.column)?;
                Some(SortLevel::new(position + 1, level.direction))
            })
            .collect()
    }
}

#[derive(Debug)]
struct KeyedRow {
    row: usize,
    key: Vec<Value>,
    rest: Vec<Value>,
}

fn run_end(rows: &[KeyedRow], start: usize) -> usize {
    let key = &rows[start].key;
    start
        + rows[start..]
            .iter()
            .take_while(|r| cmp_value_slices(&r.key, key) == Ordering::Equal)
            .count()
}

/// Pair the rows of one key. Both slices are ordered by their remaining
/// values.
fn pair_run(first: &[KeyedRow], second: &[KeyedRow], merged: &mut Vec<MergedRow>) {
    let mut first_left = Vec::new();
    let mut second_left = Vec::new();
    let (mut i, mut j) = (0, 0);
    while i < first.len() && j < second.len() {
        match cmp_value_slices(&first[i].rest, &second[j].rest) {
            Ordering::Equal => {
                merged.push(MergedRow::both(first[i].row, second[j].row));
                i += 1;
                j += 1;
            }
            Ordering::Less => {
                first_left.push(first[i].row);
                i += 1;
            }
            Ordering::Greater => {
                second_left.push(second[j].row);
                j += 1;
            }
        }
    }
    first_left.extend(first[i..].iter().map(|r| r.row));
    second_left.extend(second[j..].iter().map(|r| r.row));

    let paired = first_left.len().min(second_left.len());
    merged.extend(
        first_left
            .iter()
            .zip(&second_left)
            .map(|(&a, &b)| MergedRow::both(a, b)),
    );
    merged.extend(first_left[paired..].iter().map(|&r| MergedRow::first_only(r)));
    merged.extend(second_left[paired..].iter().map(|&r| MergedRow::second_only(r)));
}

/// Diff two tables in one step.
///
/// # Errors
///
/// See [`DiffSchema::new`].
pub fn diff_tables(
    first: TableRef,
    second: TableRef,
    first_is_older: bool,
    same_session: bool,
) -> Result<DiffTable, DiffError> {
    Ok(DiffSchema::new(first, second, first_is_older, same_session)?.build())
}
