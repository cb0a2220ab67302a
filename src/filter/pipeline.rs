//! The editable filter tree of one table view.
//!
//! # Layout
//!
//! The root is a [`MultiFilter`] kept in this shape:
//!
//! ```text
//! [Match*, DefaultSort(user, fallback), Group(col, sub: Group(... sub: DefaultSort(user, fallback)))]
//! ```
//!
//! Matches come first so they narrow the row set before anything is ordered
//! or grouped. The user sort is a single [`SharedSort`] referenced by the root
//! `DefaultSort` and by the `DefaultSort` under the deepest group, so one
//! "sort by column" action orders both ungrouped rows and every group's
//! members.

use super::spec::{instantiate_sorts, lookup_sort, SortTable};
use super::{
    CloneContext, ColumnState, DefaultSortFilter, Filter, FilterSpec, FilterTreeSpec,
    GroupFilter, MatchFilter, MultiFilter, SharedSort, SortFilter,
};
use crate::model::{SortDirection, SortLevel, SpecError, Table, TableError, TableRef};
use std::fmt;
use tracing::debug;

/// Filter tree plus the sort instances a view edits through it.
pub struct TableFilters {
    root: MultiFilter,
    user_sort: SharedSort,
    default_sort: Option<SharedSort>,
    listeners: Vec<Box<dyn FnMut()>>,
}

impl fmt::Debug for TableFilters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TableFilters")
            .field("root", &self.root)
            .field("user_sort", &self.user_sort)
            .field("default_sort", &self.default_sort)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl TableFilters {
    /// Empty pipeline with the given schema fallback sort.
    pub fn new(default_levels: Vec<SortLevel>) -> Self {
        let default_sort =
            (!default_levels.is_empty()).then(|| SortFilter::shared(default_levels));
        let user_sort = SortFilter::shared(Vec::new());
        let mut filters = Self {
            root: MultiFilter::default(),
            user_sort,
            default_sort,
            listeners: Vec::new(),
        };
        let sort = filters.new_default_sort();
        filters.root.filters_mut().push(sort);
        filters
    }

    /// Empty pipeline using `table`'s schema default sort as fallback.
    pub fn for_table(table: &dyn Table) -> Self {
        Self::new(table.default_sort().to_vec())
    }

    /// Root of the filter tree.
    pub fn root(&self) -> &MultiFilter {
        &self.root
    }

    /// The user-driven sort.
    pub fn user_sort(&self) -> &SharedSort {
        &self.user_sort
    }

    /// The schema fallback sort.
    pub fn default_sort(&self) -> Option<&SharedSort> {
        self.default_sort.as_ref()
    }

    /// Apply the whole tree to `source`.
    ///
    /// # Errors
    ///
    /// Propagates [`Filter::create_filter`] errors.
    pub fn create_display_table(&self, source: &TableRef) -> Result<TableRef, TableError> {
        self.root.create_filter(source)
    }

    /// Register a callback run after every change.
    pub fn on_changed(&mut self, callback: impl FnMut() + 'static) {
        self.listeners.push(Box::new(callback));
    }

    fn notify(&mut self, what: &str) {
        debug!(change = what, filters = self.root.filters().len(), "Filters changed");
        for listener in &mut self.listeners {
            listener();
        }
    }

    fn new_default_sort(&self) -> Filter {
        Filter::DefaultSort(DefaultSortFilter::new(
            Some(self.user_sort.clone()),
            self.default_sort.clone(),
        ))
    }

    /// Sort by one column only, replacing every previous level.
    ///
    /// Returns `false` if the sort was already exactly that.
    pub fn set_sort(&mut self, column: usize, direction: SortDirection) -> bool {
        let changed = self.user_sort.borrow_mut().set_sort(column, direction);
        self.finish_sort_edit(changed, "set_sort")
    }

    /// Add a tie-breaking sort level, or change the direction of an existing one.
    pub fn add_sub_sort(&mut self, column: usize, direction: SortDirection) -> bool {
        let changed = self.user_sort.borrow_mut().add_sub_sort(column, direction);
        self.finish_sort_edit(changed, "add_sub_sort")
    }

    /// Drop every user sort level; the schema fallback applies again.
    pub fn clear_sort(&mut self) -> bool {
        let changed = self.user_sort.borrow_mut().clear();
        self.finish_sort_edit(changed, "clear_sort")
    }

    fn finish_sort_edit(&mut self, changed: bool, what: &str) -> bool {
        if changed {
            self.ensure_sort_slots();
            self.notify(what);
        }
        changed
    }

    /// Current user sort levels.
    pub fn sort_levels(&self) -> Vec<SortLevel> {
        self.user_sort.borrow().levels().to_vec()
    }

    /// Re-attach the default sorts that simplification removed.
    fn ensure_sort_slots(&mut self) {
        let filters = self.root.filters();
        if !filters.iter().any(|f| matches!(f, Filter::DefaultSort(_))) {
            let at = filters
                .iter()
                .take_while(|f| matches!(f, Filter::Match(_)))
                .count();
            let sort = self.new_default_sort();
            self.root.filters_mut().insert(at, sort);
        }
        let sort = self.new_default_sort();
        if let Some(group) = self.deepest_group_mut() {
            if group.sub().is_none() {
                group.replace_sub(Some(sort));
            }
        }
    }

    /// Search `column` for `pattern`, replacing any search already on it.
    ///
    /// An empty pattern removes the search.
    pub fn set_match(&mut self, column: usize, pattern: &str, exact: bool) -> bool {
        if pattern.is_empty() {
            return self.remove_match(column);
        }
        let existing = self.root.filters_mut().iter_mut().find_map(|f| match f {
            Filter::Match(m) if m.column() == column => Some(m),
            _ => None,
        });
        let changed = match existing {
            Some(m) => m.update(pattern, exact),
            None => {
                let filter = Filter::Match(MatchFilter::new(column, pattern, exact));
                self.root.filters_mut().insert(0, filter);
                true
            }
        };
        if changed {
            self.notify("set_match");
        }
        changed
    }

    /// Remove the search on `column`.
    pub fn remove_match(&mut self, column: usize) -> bool {
        let filters = self.root.filters_mut();
        let before = filters.len();
        filters.retain(|f| !matches!(f, Filter::Match(m) if m.column() == column));
        let changed = filters.len() != before;
        if changed {
            self.notify("remove_match");
        }
        changed
    }

    /// Active searches, in evaluation order.
    pub fn matches(&self) -> impl Iterator<Item = &MatchFilter> {
        self.root.filters().iter().filter_map(|f| match f {
            Filter::Match(m) => Some(m),
            _ => None,
        })
    }

    /// Group by `column` below the currently deepest group.
    ///
    /// The new group takes over the deepest group's sub-filter (the default
    /// sort of its members), or gets a fresh default sort. Returns `false` if
    /// `column` is already grouped.
    pub fn add_group(&mut self, column: usize, direction: SortDirection) -> bool {
        if self.grouped_columns().contains(&column) {
            return false;
        }
        let fresh_sort = self.new_default_sort();
        if let Some(deepest) = self.deepest_group_mut() {
            let sub = deepest.replace_sub(None).unwrap_or(fresh_sort);
            let group = GroupFilter::new(column, direction, Some(sub));
            deepest.replace_sub(Some(Filter::Group(group)));
        } else {
            let group = GroupFilter::new(column, direction, Some(fresh_sort));
            self.root.filters_mut().push(Filter::Group(group));
        }
        self.ensure_sort_slots();
        self.notify("add_group");
        true
    }

    /// Remove the group level on `column`; its sub-filter moves up one level.
    pub fn remove_group(&mut self, column: usize) -> bool {
        let filters = self.root.filters_mut();
        let removed = match filters
            .iter()
            .position(|f| matches!(f, Filter::Group(g) if g.column() == column))
        {
            Some(index) => {
                if let Filter::Group(mut group) = filters.remove(index) {
                    // A default sort below a root group duplicates the root one.
                    if let Some(sub @ Filter::Group(_)) = group.replace_sub(None) {
                        filters.insert(index, sub);
                    }
                }
                true
            }
            None => filters.iter_mut().any(|f| remove_nested_group(f, column)),
        };
        if removed {
            self.simplify();
            self.notify("remove_group");
        }
        removed
    }

    /// Grouping columns, outermost first.
    pub fn grouped_columns(&self) -> Vec<usize> {
        fn walk(filter: &Filter, out: &mut Vec<usize>) {
            if let Filter::Group(group) = filter {
                out.push(group.column());
            }
            for child in filter.sub_filters() {
                walk(child, out);
            }
        }
        let mut columns = Vec::new();
        for filter in self.root.filters() {
            walk(filter, &mut columns);
        }
        columns
    }

    /// Remove every search, grouping and user sort level.
    pub fn clear(&mut self) -> bool {
        if self.is_empty() {
            return false;
        }
        self.user_sort.borrow_mut().clear();
        let sort = self.new_default_sort();
        self.root = MultiFilter::new(vec![sort]);
        self.notify("clear");
        true
    }

    /// Whether the user configured nothing: no search, no grouping and no
    /// user sort. The schema fallback sort does not count.
    pub fn is_empty(&self) -> bool {
        fn configured(filter: &Filter) -> bool {
            match filter {
                Filter::Group(_) => true,
                Filter::Match(m) => !m.is_noop(),
                _ => filter.sub_filters().iter().any(configured),
            }
        }
        !self.user_sort.borrow().is_effective() && !self.root.filters().iter().any(configured)
    }

    /// Remove no-op nodes until nothing changes; returns whether anything did.
    pub fn simplify(&mut self) -> bool {
        let mut changed = false;
        loop {
            let mut dirty = false;
            self.root.simplify(&mut dirty);
            if !dirty {
                break;
            }
            changed = true;
        }
        changed
    }

    /// Header affordances for each column of `source`.
    pub fn column_states(&self, source: &dyn Table) -> Vec<ColumnState> {
        let mut states = vec![ColumnState::default(); source.column_count()];
        for filter in self.root.filters() {
            filter.update_column_state(source, &mut states);
        }
        states
    }

    /// Independent deep copy; callbacks are not copied.
    pub fn snapshot(&self) -> TableFilters {
        let mut ctx = CloneContext::new();
        let root = self.root.deep_clone(&mut ctx);
        TableFilters {
            root,
            user_sort: ctx.clone_sort(&self.user_sort),
            default_sort: self.default_sort.as_ref().map(|s| ctx.clone_sort(s)),
            listeners: Vec::new(),
        }
    }

    /// Serializable form of the tree.
    pub fn to_spec(&self) -> FilterTreeSpec {
        let mut sorts = SortTable::default();
        let root = self
            .root
            .filters()
            .iter()
            .map(|f| FilterSpec::encode(f, &mut sorts))
            .collect();
        let user_sort = sorts.index_of(&self.user_sort);
        let default_sort = self.default_sort.as_ref().map(|s| sorts.index_of(s));
        FilterTreeSpec {
            sorts: sorts.into_levels(),
            root,
            user_sort,
            default_sort,
        }
    }

    /// Rebuild a pipeline from its serialized form.
    ///
    /// # Errors
    ///
    /// Returns [`SpecError::UnknownSort`] if a node references a sort index
    /// outside the serialized sort table.
    pub fn from_spec(spec: &FilterTreeSpec) -> Result<Self, SpecError> {
        let sorts = instantiate_sorts(&spec.sorts);
        let root = spec
            .root
            .iter()
            .map(|f| f.decode(&sorts))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            root: MultiFilter::new(root),
            user_sort: lookup_sort(&sorts, spec.user_sort)?,
            default_sort: spec
                .default_sort
                .map(|i| lookup_sort(&sorts, i))
                .transpose()?,
            listeners: Vec::new(),
        })
    }

    fn deepest_group_mut(&mut self) -> Option<&mut GroupFilter> {
        let path = deepest_group_path(self.root.filters())?;
        match filter_at_mut(self.root.filters_mut(), &path)? {
            Filter::Group(group) => Some(group),
            _ => None,
        }
    }
}

/// Index path to the last group reached by a depth-first walk of `filters`.
fn deepest_group_path(filters: &[Filter]) -> Option<Vec<usize>> {
    let mut found = None;
    for (index, filter) in filters.iter().enumerate() {
        let mut below = deepest_group_path(filter.sub_filters());
        if below.is_none() && matches!(filter, Filter::Group(_)) {
            below = Some(Vec::new());
        }
        if let Some(mut path) = below {
            path.insert(0, index);
            found = Some(path);
        }
    }
    found
}

fn filter_at_mut<'a>(filters: &'a mut [Filter], path: &[usize]) -> Option<&'a mut Filter> {
    let (&first, rest) = path.split_first()?;
    let mut current = filters.get_mut(first)?;
    for &index in rest {
        current = current.sub_filters_mut().get_mut(index)?;
    }
    Some(current)
}

/// Remove a group nested below `filter`, splicing its sub-filter into its parent.
fn remove_nested_group(filter: &mut Filter, column: usize) -> bool {
    match filter {
        Filter::Group(group) => {
            if matches!(group.sub(), Some(Filter::Group(child)) if child.column() == column) {
                if let Some(Filter::Group(mut child)) = group.replace_sub(None) {
                    group.replace_sub(child.replace_sub(None));
                }
                return true;
            }
            group
                .sub_slot_mut()
                .iter_mut()
                .any(|f| remove_nested_group(f, column))
        }
        Filter::Multi(multi) => multi
            .filters_mut()
            .iter_mut()
            .any(|f| remove_nested_group(f, column)),
        Filter::Sort(_) | Filter::DefaultSort(_) | Filter::Match(_) => false,
    }
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
