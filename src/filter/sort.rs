//! Multi-level sorting and the user/schema sort precedence wrapper.

use super::indexed::{top_level_blocks, IndexedTable};
use super::{CloneContext, FilterId};
use crate::model::ordering::{compare_keys, sort_key};
use crate::model::{SortDirection, SortLevel, TableError, TableRef};
use std::cell::RefCell;
use std::rc::Rc;

/// A sort filter that may be referenced from several places of one tree.
pub type SharedSort = Rc<RefCell<SortFilter>>;

/// Stable multi-level sort.
///
/// Levels are compared in order; ties at level `k` fall through to level
/// `k + 1` and rows equal on every level keep their source order. Levels with
/// [`SortDirection::None`] are skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortFilter {
    id: FilterId,
    levels: Vec<SortLevel>,
}

impl SortFilter {
    /// Sort with the given levels.
    pub fn new(levels: Vec<SortLevel>) -> Self {
        Self {
            id: FilterId::next(),
            levels,
        }
    }

    /// Sort wrapped for sharing.
    pub fn shared(levels: Vec<SortLevel>) -> SharedSort {
        Rc::new(RefCell::new(Self::new(levels)))
    }

    /// Identity of this sort instance.
    pub fn id(&self) -> FilterId {
        self.id
    }

    /// All levels, including `None` ones.
    pub fn levels(&self) -> &[SortLevel] {
        &self.levels
    }

    /// Levels that actually order rows.
    pub fn effective_levels(&self) -> Vec<SortLevel> {
        self.levels
            .iter()
            .copied()
            .filter(SortLevel::is_effective)
            .collect()
    }

    /// Whether at least one level orders rows.
    pub fn is_effective(&self) -> bool {
        self.levels.iter().any(SortLevel::is_effective)
    }

    /// Direction of the first level naming `column`.
    pub fn direction_of(&self, column: usize) -> SortDirection {
        self.levels
            .iter()
            .find(|l| l.column == column)
            .map_or(SortDirection::None, |l| l.direction)
    }

    /// Replace every level with a single one.
    ///
    /// Returns `false` if the sort already consisted of exactly that level.
    pub fn set_sort(&mut self, column: usize, direction: SortDirection) -> bool {
        let level = SortLevel::new(column, direction);
        if self.levels == [level] {
            return false;
        }
        self.levels = vec![level];
        true
    }

    /// Append a tie-breaking level, or update the direction of the existing
    /// level for `column`.
    pub fn add_sub_sort(&mut self, column: usize, direction: SortDirection) -> bool {
        match self.levels.iter_mut().find(|l| l.column == column) {
            Some(level) if level.direction == direction => false,
            Some(level) => {
                level.direction = direction;
                true
            }
            None => {
                self.levels.push(SortLevel::new(column, direction));
                true
            }
        }
    }

    /// Remove every level.
    pub fn clear(&mut self) -> bool {
        let changed = !self.levels.is_empty();
        self.levels.clear();
        changed
    }

    /// Copy with a fresh identity.
    pub(crate) fn fresh_clone(&self) -> Self {
        Self::new(self.levels.clone())
    }

    /// Sorted view of `source`; `source` itself if no level is effective.
    ///
    /// # Errors
    ///
    /// Returns [`TableError::ColumnOutOfRange`] if a level names a missing column.
    pub fn create_filter(&self, source: &TableRef) -> Result<TableRef, TableError> {
        sort_table(source, &self.effective_levels())
    }
}

/// Stable sort of the top-level blocks of `source` by their root rows.
pub(crate) fn sort_table(source: &TableRef, levels: &[SortLevel]) -> Result<TableRef, TableError> {
    if levels.is_empty() {
        return Ok(source.clone());
    }
    let column_count = source.column_count();
    if let Some(level) = levels.iter().find(|l| l.column >= column_count) {
        return Err(TableError::ColumnOutOfRange {
            column: level.column,
            column_count,
        });
    }
    let mut keyed: Vec<_> = top_level_blocks(source.as_ref())
        .into_iter()
        .map(|block| (sort_key(source.as_ref(), levels, block.start), block))
        .collect();
    keyed.sort_by(|(a, _), (b, _)| compare_keys(levels, a, b));
    let blocks: Vec<_> = keyed.into_iter().map(|(_, block)| block).collect();
    Ok(Rc::new(IndexedTable::from_blocks(source.clone(), &blocks)))
}

/// Resolves to the user sort when it has an effective level, otherwise to the
/// schema's fallback sort.
#[derive(Debug, Clone)]
pub struct DefaultSortFilter {
    id: FilterId,
    sort_override: Option<SharedSort>,
    sort_default: Option<SharedSort>,
}

impl DefaultSortFilter {
    /// Wrapper over an optional user sort and an optional fallback.
    pub fn new(sort_override: Option<SharedSort>, sort_default: Option<SharedSort>) -> Self {
        Self {
            id: FilterId::next(),
            sort_override,
            sort_default,
        }
    }

    /// Identity of this filter.
    pub fn id(&self) -> FilterId {
        self.id
    }

    /// User-driven sort.
    pub fn sort_override(&self) -> Option<&SharedSort> {
        self.sort_override.as_ref()
    }

    /// Schema-provided fallback sort.
    pub fn sort_default(&self) -> Option<&SharedSort> {
        self.sort_default.as_ref()
    }

    /// The sort that currently applies, if any.
    pub fn resolve(&self) -> Option<&SharedSort> {
        [&self.sort_override, &self.sort_default]
            .into_iter()
            .flatten()
            .find(|sort| sort.borrow().is_effective())
    }

    /// Whether neither sort orders anything.
    pub fn is_noop(&self) -> bool {
        self.resolve().is_none()
    }

    /// Sorted view of `source` per [`DefaultSortFilter::resolve`].
    ///
    /// # Errors
    ///
    /// Propagates [`SortFilter::create_filter`] errors.
    pub fn create_filter(&self, source: &TableRef) -> Result<TableRef, TableError> {
        match self.resolve() {
            Some(sort) => sort.borrow().create_filter(source),
            None => Ok(source.clone()),
        }
    }

    pub(crate) fn deep_clone(&self, ctx: &mut CloneContext) -> Self {
        Self::new(
            self.sort_override.as_ref().map(|s| ctx.clone_sort(s)),
            self.sort_default.as_ref().map(|s| ctx.clone_sort(s)),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ColumnData, ColumnInfo, DataTable, Table, Value, ValueType};

    fn sizes(values: Vec<i64>) -> TableRef {
        let n = values.len();
        Rc::new(
            DataTable::new(
                "t",
                n,
                vec![
                    (ColumnInfo::new("Size", ValueType::I64), ColumnData::I64(values)),
                    (
                        ColumnInfo::new("Pos", ValueType::U32),
                        ColumnData::U32((0..n as u32).collect()),
                    ),
                ],
            )
            .expect("valid table"),
        )
    }

    fn column(table: &TableRef, col: usize) -> Vec<Value> {
        (0..table.row_count()).map(|r| table.cell(r, col)).collect()
    }

    #[test]
    fn set_sort_twice_reports_no_change() {
        let mut sort = SortFilter::new(Vec::new());
        assert!(sort.set_sort(0, SortDirection::Ascending));
        assert!(!sort.set_sort(0, SortDirection::Ascending));
        assert!(sort.set_sort(0, SortDirection::Descending));
    }

    #[test]
    fn set_sort_replaces_all_levels() {
        let mut sort = SortFilter::new(vec![
            SortLevel::new(0, SortDirection::Ascending),
            SortLevel::new(1, SortDirection::Ascending),
        ]);
        sort.set_sort(1, SortDirection::Descending);
        assert_eq!(sort.levels(), &[SortLevel::new(1, SortDirection::Descending)]);
    }

    #[test]
    fn add_sub_sort_updates_existing_level() {
        let mut sort = SortFilter::new(vec![SortLevel::new(0, SortDirection::Ascending)]);
        assert!(sort.add_sub_sort(1, SortDirection::Ascending));
        assert!(!sort.add_sub_sort(1, SortDirection::Ascending));
        assert!(sort.add_sub_sort(1, SortDirection::Descending));
        assert_eq!(sort.levels().len(), 2);
        assert_eq!(sort.direction_of(1), SortDirection::Descending);
    }

    #[test]
    fn sort_is_stable_for_ties() {
        let table = sizes(vec![2, 1, 2, 1]);
        let sort = SortFilter::new(vec![SortLevel::new(0, SortDirection::Ascending)]);
        let sorted = sort.create_filter(&table).expect("valid sort");
        assert_eq!(
            column(&sorted, 1),
            vec![Value::U32(1), Value::U32(3), Value::U32(0), Value::U32(2)]
        );
    }

    #[test]
    fn none_levels_are_skipped() {
        let table = sizes(vec![3, 1, 2]);
        let sort = SortFilter::new(vec![SortLevel::new(0, SortDirection::None)]);
        let result = sort.create_filter(&table).expect("valid sort");
        assert!(Rc::ptr_eq(&result, &table));
    }

    #[test]
    fn missing_column_is_an_error() {
        let table = sizes(vec![1]);
        let sort = SortFilter::new(vec![SortLevel::new(9, SortDirection::Ascending)]);
        assert!(matches!(
            sort.create_filter(&table),
            Err(TableError::ColumnOutOfRange { column: 9, .. })
        ));
    }

    #[test]
    fn user_sort_takes_precedence_over_fallback() {
        let user = SortFilter::shared(Vec::new());
        let fallback = SortFilter::shared(vec![SortLevel::new(0, SortDirection::Descending)]);
        let filter = DefaultSortFilter::new(Some(user.clone()), Some(fallback.clone()));
        assert!(Rc::ptr_eq(filter.resolve().expect("fallback applies"), &fallback));

        user.borrow_mut().set_sort(0, SortDirection::Ascending);
        assert!(Rc::ptr_eq(filter.resolve().expect("user sort applies"), &user));

        user.borrow_mut().set_sort(0, SortDirection::None);
        assert!(Rc::ptr_eq(filter.resolve().expect("fallback applies"), &fallback));
    }
}
