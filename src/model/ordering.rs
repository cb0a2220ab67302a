//! Sort levels shared by table schemas and sort filters.

use super::table::Table;
use super::value::Value;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Direction of one sort level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    /// Level is present but does not order anything.
    #[default]
    None,
    /// Smallest first.
    Ascending,
    /// Largest first.
    Descending,
}

impl SortDirection {
    /// Apply this direction to an ascending comparison result.
    pub fn apply(self, ord: Ordering) -> Ordering {
        match self {
            SortDirection::Descending => ord.reverse(),
            SortDirection::Ascending | SortDirection::None => ord,
        }
    }
}

/// One level of a multi-level sort: a column and its direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SortLevel {
    /// Column index in the sorted table.
    pub column: usize,
    /// Sort direction.
    pub direction: SortDirection,
}

impl SortLevel {
    /// Create a sort level.
    pub fn new(column: usize, direction: SortDirection) -> Self {
        Self { column, direction }
    }

    /// Whether this level orders rows at all.
    pub fn is_effective(&self) -> bool {
        self.direction != SortDirection::None
    }
}

/// Extract the sort key of `row` for the given levels.
pub(crate) fn sort_key(table: &dyn Table, levels: &[SortLevel], row: usize) -> Vec<Value> {
    levels.iter().map(|level| table.cell(row, level.column)).collect()
}

/// Compare two precomputed sort keys level by level.
///
/// Ties at level `k` fall through to level `k + 1`.
pub(crate) fn compare_keys(levels: &[SortLevel], a: &[Value], b: &[Value]) -> Ordering {
    for (level, (x, y)) in levels.iter().zip(a.iter().zip(b)) {
        let ord = level.direction.apply(x.cmp_value(y));
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn descending_reverses_order() {
        assert_eq!(
            SortDirection::Descending.apply(Ordering::Less),
            Ordering::Greater
        );
        assert_eq!(SortDirection::Ascending.apply(Ordering::Less), Ordering::Less);
    }

    #[test]
    fn ties_fall_through_to_next_level() {
        let levels = [
            SortLevel::new(0, SortDirection::Ascending),
            SortLevel::new(1, SortDirection::Descending),
        ];
        let a = [Value::str("a"), Value::I32(1)];
        let b = [Value::str("a"), Value::I32(2)];
        assert_eq!(compare_keys(&levels, &a, &b), Ordering::Greater);
    }

    #[test]
    fn none_level_is_not_effective() {
        assert!(!SortLevel::new(0, SortDirection::None).is_effective());
    }
}
