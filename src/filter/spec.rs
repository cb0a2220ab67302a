//! Serializable form of a filter tree.
//!
//! The history subsystem stores filter trees as JSON and restores them in a
//! later session. Sorts are written once to a side table and referenced by
//! index, so a sort shared by several nodes is shared again after loading.

use super::{
    DefaultSortFilter, Filter, FilterId, GroupFilter, MatchFilter, MultiFilter, SharedSort,
    SortFilter,
};
use crate::model::{SortDirection, SortLevel, SpecError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One serialized filter node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FilterSpec {
    /// See [`MultiFilter`].
    Multi {
        /// Children in application order.
        filters: Vec<FilterSpec>,
    },
    /// See [`SortFilter`].
    Sort {
        /// Index into [`FilterTreeSpec::sorts`].
        sort: usize,
    },
    /// See [`DefaultSortFilter`].
    DefaultSort {
        /// Index of the user sort.
        #[serde(default)]
        sort_override: Option<usize>,
        /// Index of the schema fallback sort.
        #[serde(default)]
        sort_default: Option<usize>,
    },
    /// See [`GroupFilter`].
    Group {
        /// Grouping column.
        column: usize,
        /// Order of the groups.
        direction: SortDirection,
        /// Per-group sub-filter.
        #[serde(default)]
        sub: Option<Box<FilterSpec>>,
    },
    /// See [`MatchFilter`].
    Match {
        /// Matched column.
        column: usize,
        /// Search text.
        pattern: String,
        /// Full equality instead of containment.
        exact: bool,
        /// Focus hint.
        #[serde(default)]
        force_focus: bool,
    },
}

/// A whole filter tree of one view, as persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterTreeSpec {
    /// Levels of every distinct sort instance.
    pub sorts: Vec<Vec<SortLevel>>,
    /// Children of the root multi filter.
    pub root: Vec<FilterSpec>,
    /// Index of the user sort.
    pub user_sort: usize,
    /// Index of the schema fallback sort.
    #[serde(default)]
    pub default_sort: Option<usize>,
}

impl FilterTreeSpec {
    /// Serialize to JSON.
    ///
    /// # Errors
    ///
    /// Returns [`SpecError::Json`] if serialization fails.
    pub fn to_json(&self) -> Result<String, SpecError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse from JSON.
    ///
    /// # Errors
    ///
    /// Returns [`SpecError::Json`] on malformed input.
    pub fn from_json(json: &str) -> Result<Self, SpecError> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Assigns indices to distinct sort instances while encoding.
#[derive(Debug, Default)]
pub(crate) struct SortTable {
    index: HashMap<FilterId, usize>,
    levels: Vec<Vec<SortLevel>>,
}

impl SortTable {
    pub(crate) fn index_of(&mut self, sort: &SharedSort) -> usize {
        let sort = sort.borrow();
        *self.index.entry(sort.id()).or_insert_with(|| {
            self.levels.push(sort.levels().to_vec());
            self.levels.len() - 1
        })
    }

    pub(crate) fn into_levels(self) -> Vec<Vec<SortLevel>> {
        self.levels
    }
}

/// Instantiate one sort per entry of `levels`.
pub(crate) fn instantiate_sorts(levels: &[Vec<SortLevel>]) -> Vec<SharedSort> {
    levels.iter().map(|l| SortFilter::shared(l.clone())).collect()
}

pub(crate) fn lookup_sort(sorts: &[SharedSort], index: usize) -> Result<SharedSort, SpecError> {
    sorts.get(index).cloned().ok_or(SpecError::UnknownSort(index))
}

impl FilterSpec {
    pub(crate) fn encode(filter: &Filter, sorts: &mut SortTable) -> Self {
        match filter {
            Filter::Multi(f) => FilterSpec::Multi {
                filters: f.filters().iter().map(|c| Self::encode(c, sorts)).collect(),
            },
            Filter::Sort(sort) => FilterSpec::Sort {
                sort: sorts.index_of(sort),
            },
            Filter::DefaultSort(f) => FilterSpec::DefaultSort {
                sort_override: f.sort_override().map(|s| sorts.index_of(s)),
                sort_default: f.sort_default().map(|s| sorts.index_of(s)),
            },
            Filter::Group(f) => FilterSpec::Group {
                column: f.column(),
                direction: f.direction(),
                sub: f.sub().map(|s| Box::new(Self::encode(s, sorts))),
            },
            Filter::Match(f) => FilterSpec::Match {
                column: f.column(),
                pattern: f.pattern().to_string(),
                exact: f.exact(),
                force_focus: f.force_focus(),
            },
        }
    }

    pub(crate) fn decode(&self, sorts: &[SharedSort]) -> Result<Filter, SpecError> {
        let filter = match self {
            FilterSpec::Multi { filters } => Filter::Multi(MultiFilter::new(
                filters
                    .iter()
                    .map(|f| f.decode(sorts))
                    .collect::<Result<_, _>>()?,
            )),
            FilterSpec::Sort { sort } => Filter::Sort(lookup_sort(sorts, *sort)?),
            FilterSpec::DefaultSort {
                sort_override,
                sort_default,
            } => Filter::DefaultSort(DefaultSortFilter::new(
                sort_override.map(|i| lookup_sort(sorts, i)).transpose()?,
                sort_default.map(|i| lookup_sort(sorts, i)).transpose()?,
            )),
            FilterSpec::Group {
                column,
                direction,
                sub,
            } => Filter::Group(GroupFilter::new(
                *column,
                *direction,
                sub.as_ref().map(|s| s.decode(sorts)).transpose()?,
            )),
            FilterSpec::Match {
                column,
                pattern,
                exact,
                force_focus,
            } => Filter::Match(
                MatchFilter::new(*column, pattern.clone(), *exact).with_force_focus(*force_focus),
            ),
        };
        Ok(filter)
    }
}
