//! The composable filter pipeline.
//!
//! A [`Filter`] turns a source table into a derived table without touching
//! the source. Filters form a tree: a [`MultiFilter`] applies its children in
//! order and a [`GroupFilter`] applies its sub-filter to each group. Sort
//! filters are shared ([`SharedSort`]) because one user sort is referenced
//! from the root and from below every group level.
//!
//! # Cloning
//!
//! [`Filter::deep_clone`] copies a tree through a [`CloneContext`] so a sort
//! referenced from two places in the original is referenced from the same two
//! places in the copy.

pub mod group;
pub mod indexed;
pub mod matching;
pub mod pipeline;
pub mod sort;
pub mod spec;

pub use group::{GroupFilter, GroupedTable};
pub use indexed::IndexedTable;
pub use matching::MatchFilter;
pub use pipeline::TableFilters;
pub use sort::{DefaultSortFilter, SharedSort, SortFilter};
pub use spec::{FilterSpec, FilterTreeSpec};

use crate::model::{SortDirection, Table, TableError, TableRef};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Identity of one filter instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FilterId(u64);

impl FilterId {
    /// Allocate a fresh, process-unique id.
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// Maps original sort instances to their clones during [`Filter::deep_clone`].
#[derive(Debug, Default)]
pub struct CloneContext {
    sorts: HashMap<FilterId, SharedSort>,
}

impl CloneContext {
    /// Empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Clone of `sort`; the same clone every time the same original is passed.
    pub fn clone_sort(&mut self, sort: &SharedSort) -> SharedSort {
        let id = sort.borrow().id();
        self.sorts
            .entry(id)
            .or_insert_with(|| Rc::new(RefCell::new(sort.borrow().fresh_clone())))
            .clone()
    }
}

/// Header affordances of one source column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ColumnState {
    /// Some group level groups by this column.
    pub grouped: bool,
    /// Direction of the highest-precedence user sort level on this column.
    pub sorted: SortDirection,
    /// Direction of the schema fallback sort level on this column.
    pub default_sorted: SortDirection,
}

/// Ordered list of filters, each consuming the previous one's output.
#[derive(Debug, Default)]
pub struct MultiFilter {
    filters: Vec<Filter>,
}

impl MultiFilter {
    /// Multi over `filters`.
    pub fn new(filters: Vec<Filter>) -> Self {
        Self { filters }
    }

    /// Children in application order.
    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    /// Mutable children.
    pub fn filters_mut(&mut self) -> &mut Vec<Filter> {
        &mut self.filters
    }

    /// Apply every child in order.
    ///
    /// # Errors
    ///
    /// Propagates the first child error.
    pub fn create_filter(&self, source: &TableRef) -> Result<TableRef, TableError> {
        self.filters
            .iter()
            .try_fold(source.clone(), |table, filter| filter.create_filter(&table))
    }

    /// Flatten nested multis and drop children that do nothing.
    pub fn simplify(&mut self, dirty: &mut bool) {
        let mut flattened = Vec::with_capacity(self.filters.len());
        for mut filter in self.filters.drain(..) {
            filter.simplify(dirty);
            match filter {
                Filter::Multi(inner) => {
                    *dirty = true;
                    flattened.extend(inner.filters);
                }
                f if f.is_noop() => *dirty = true,
                f => flattened.push(f),
            }
        }
        self.filters = flattened;
    }

    fn deep_clone(&self, ctx: &mut CloneContext) -> Self {
        Self::new(self.filters.iter().map(|f| f.deep_clone(ctx)).collect())
    }
}

/// One node of a filter tree.
#[derive(Debug)]
pub enum Filter {
    /// Ordered sequence of filters.
    Multi(MultiFilter),
    /// Multi-level sort, possibly shared with other nodes.
    Sort(SharedSort),
    /// User sort with schema fallback.
    DefaultSort(DefaultSortFilter),
    /// Group-by with an optional per-group sub-filter.
    Group(GroupFilter),
    /// Text search on one column.
    Match(MatchFilter),
}

impl Filter {
    /// Identity of this node.
    pub fn id(&self) -> Option<FilterId> {
        match self {
            Filter::Multi(_) => None,
            Filter::Sort(sort) => Some(sort.borrow().id()),
            Filter::DefaultSort(f) => Some(f.id()),
            Filter::Group(f) => Some(f.id()),
            Filter::Match(f) => Some(f.id()),
        }
    }

    /// Derived table for `source`.
    ///
    /// Filters that do nothing return `source` itself.
    ///
    /// # Errors
    ///
    /// Returns [`TableError::ColumnOutOfRange`] when a node names a column the
    /// table it is applied to does not have.
    pub fn create_filter(&self, source: &TableRef) -> Result<TableRef, TableError> {
        match self {
            Filter::Multi(f) => f.create_filter(source),
            Filter::Sort(sort) => sort.borrow().create_filter(source),
            Filter::DefaultSort(f) => f.create_filter(source),
            Filter::Group(f) => f.create_filter(source),
            Filter::Match(f) => f.create_filter(source),
        }
    }

    /// Deep copy that preserves sort aliasing through `ctx`.
    pub fn deep_clone(&self, ctx: &mut CloneContext) -> Filter {
        match self {
            Filter::Multi(f) => Filter::Multi(f.deep_clone(ctx)),
            Filter::Sort(sort) => Filter::Sort(ctx.clone_sort(sort)),
            Filter::DefaultSort(f) => Filter::DefaultSort(f.deep_clone(ctx)),
            Filter::Group(f) => Filter::Group(f.deep_clone(ctx)),
            Filter::Match(f) => Filter::Match(f.fresh_clone()),
        }
    }

    /// Whether applying this node changes nothing.
    ///
    /// A group always changes the table shape, even when its sub-filter is gone.
    pub fn is_noop(&self) -> bool {
        match self {
            Filter::Multi(f) => f.filters.iter().all(Filter::is_noop),
            Filter::Sort(sort) => !sort.borrow().is_effective(),
            Filter::DefaultSort(f) => f.is_noop(),
            Filter::Group(_) => false,
            Filter::Match(f) => f.is_noop(),
        }
    }

    /// Remove no-op descendants; sets `dirty` if anything changed.
    ///
    /// Removing one node can make its parent a no-op, so callers repeat until
    /// `dirty` stays false (see [`Filter::simplify_fully`]).
    pub fn simplify(&mut self, dirty: &mut bool) {
        match self {
            Filter::Multi(f) => f.simplify(dirty),
            Filter::Group(f) => f.simplify(dirty),
            Filter::Sort(_) | Filter::DefaultSort(_) | Filter::Match(_) => {}
        }
    }

    /// Simplify until a fixed point; returns whether anything changed.
    pub fn simplify_fully(&mut self) -> bool {
        let mut changed = false;
        loop {
            let mut dirty = false;
            self.simplify(&mut dirty);
            if !dirty {
                return changed;
            }
            changed = true;
        }
    }

    /// Direct children, for generic tree walks.
    pub fn sub_filters(&self) -> &[Filter] {
        match self {
            Filter::Multi(f) => f.filters.as_slice(),
            Filter::Group(f) => f.sub_slot(),
            Filter::Sort(_) | Filter::DefaultSort(_) | Filter::Match(_) => &[],
        }
    }

    /// Mutable direct children.
    pub fn sub_filters_mut(&mut self) -> &mut [Filter] {
        match self {
            Filter::Multi(f) => f.filters.as_mut_slice(),
            Filter::Group(f) => f.sub_slot_mut(),
            Filter::Sort(_) | Filter::DefaultSort(_) | Filter::Match(_) => &mut [],
        }
    }

    /// Annotate `states` (one per source column) with this subtree's sorts and
    /// groupings. Earlier nodes take precedence over later ones.
    pub fn update_column_state(&self, source: &dyn Table, states: &mut [ColumnState]) {
        let column_count = source.column_count().min(states.len());
        match self {
            Filter::Multi(f) => {
                for filter in &f.filters {
                    filter.update_column_state(source, states);
                }
            }
            Filter::Sort(sort) => {
                mark_sorted(&sort.borrow(), column_count, states, |s| &mut s.sorted);
            }
            Filter::DefaultSort(f) => {
                if let Some(sort) = f.sort_override() {
                    mark_sorted(&sort.borrow(), column_count, states, |s| &mut s.sorted);
                }
                if let Some(sort) = f.sort_default() {
                    mark_sorted(&sort.borrow(), column_count, states, |s| {
                        &mut s.default_sorted
                    });
                }
            }
            Filter::Group(f) => {
                if f.column() < column_count {
                    states[f.column()].grouped = true;
                }
                if let Some(sub) = f.sub() {
                    sub.update_column_state(source, states);
                }
            }
            Filter::Match(_) => {}
        }
    }

    /// Whether any node of this subtree is a group.
    pub fn contains_group(&self) -> bool {
        matches!(self, Filter::Group(_)) || self.sub_filters().iter().any(Filter::contains_group)
    }

    /// Every distinct sort instance of this subtree, in depth-first order.
    pub fn unique_sorts(&self) -> Vec<SharedSort> {
        let mut sorts: Vec<SharedSort> = Vec::new();
        self.collect_sorts(&mut sorts);
        sorts
    }

    fn collect_sorts(&self, sorts: &mut Vec<SharedSort>) {
        let mut push = |sort: &SharedSort| {
            if !sorts.iter().any(|s| Rc::ptr_eq(s, sort)) {
                sorts.push(sort.clone());
            }
        };
        match self {
            Filter::Sort(sort) => push(sort),
            Filter::DefaultSort(f) => {
                f.sort_override().into_iter().for_each(&mut push);
                f.sort_default().into_iter().for_each(&mut push);
            }
            _ => {}
        }
        for child in self.sub_filters() {
            child.collect_sorts(sorts);
        }
    }
}

fn mark_sorted(
    sort: &SortFilter,
    column_count: usize,
    states: &mut [ColumnState],
    field: impl Fn(&mut ColumnState) -> &mut SortDirection,
) {
    for level in sort.levels() {
        if level.is_effective() && level.column < column_count {
            let slot = field(&mut states[level.column]);
            if *slot == SortDirection::None {
                *slot = level.direction;
            }
        }
    }
}
