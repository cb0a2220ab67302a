//! Per-row pixel heights with O(log n) offset queries.
//!
//! Backed by a Fenwick tree. Rows hidden under collapsed headers are stored
//! with height 0, so row indices of the table and of the index coincide and
//! offset lookups never land on a hidden row.
//!
//! # Complexity
//!
//! - `height`: O(1)
//! - `set`, `push`, `offset_of`, `prefix_sum`: O(log n)
//! - `row_at`: O(log² n)

/// Cumulative heights of a sequence of rows.
///
/// # Invariants
///
/// - `heights.len()` is the number of rows
/// - `prefix_sum(i) == heights[0..=i].iter().sum()`
#[derive(Debug, Clone, Default)]
pub struct HeightIndex {
    /// Fenwick tree storage, possibly longer than `heights`.
    tree: Vec<isize>,
    heights: Vec<usize>,
}

impl HeightIndex {
    /// Empty index with room for `capacity` rows.
    pub fn new(capacity: usize) -> Self {
        Self {
            tree: vec![0; capacity],
            heights: Vec::with_capacity(capacity),
        }
    }

    /// Index over the given heights.
    ///
    /// ```
    /// # use snapview::view_state::height_index::HeightIndex;
    /// let index = HeightIndex::from_heights([20, 0, 24]);
    /// assert_eq!(index.total(), 44);
    /// assert_eq!(index.offset_of(2), 20);
    /// ```
    pub fn from_heights(heights: impl IntoIterator<Item = usize>) -> Self {
        let heights = heights.into_iter();
        let mut index = Self::new(heights.size_hint().0);
        for height in heights {
            index.push(height);
        }
        index
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.heights.len()
    }

    /// Whether the index holds no rows.
    pub fn is_empty(&self) -> bool {
        self.heights.is_empty()
    }

    /// Height of `row`.
    ///
    /// # Panics
    ///
    /// Panics if `row >= len()`.
    pub fn height(&self, row: usize) -> usize {
        self.heights[row]
    }

    /// Change the height of `row`.
    ///
    /// # Panics
    ///
    /// Panics if `row >= len()`.
    pub fn set(&mut self, row: usize, height: usize) {
        let delta = height as isize - self.heights[row] as isize;
        if delta != 0 {
            fenwick::array::update(&mut self.tree, row, delta);
            self.heights[row] = height;
        }
    }

    /// Append a row.
    pub fn push(&mut self, height: usize) {
        if self.heights.len() >= self.tree.len() {
            self.grow(self.tree.len().max(1) * 2);
        }
        let row = self.heights.len();
        self.heights.push(height);
        fenwick::array::update(&mut self.tree, row, height as isize);
    }

    /// Reallocate the tree with `capacity` slots and re-insert every row.
    ///
    /// Nodes past the old length cover rows already stored.
    fn grow(&mut self, capacity: usize) {
        self.tree = vec![0; capacity];
        for (row, &height) in self.heights.iter().enumerate() {
            fenwick::array::update(&mut self.tree, row, height as isize);
        }
    }

    /// Sum of the heights of rows `0..=row`.
    ///
    /// # Panics
    ///
    /// Panics if `row >= len()`.
    pub fn prefix_sum(&self, row: usize) -> usize {
        assert!(
            row < self.len(),
            "row {} out of bounds (len: {})",
            row,
            self.len()
        );
        fenwick::array::prefix_sum(&self.tree, row).max(0) as usize
    }

    /// Pixel offset of the top of `row`; `total()` for `row == len()`.
    pub fn offset_of(&self, row: usize) -> usize {
        match row {
            0 => 0,
            _ => self.prefix_sum(row - 1),
        }
    }

    /// Row covering pixel offset `offset`, `None` at or past the end.
    ///
    /// Zero-height rows never cover an offset.
    pub fn row_at(&self, offset: usize) -> Option<usize> {
        let (mut left, mut right) = (0, self.len());
        while left < right {
            let mid = left + (right - left) / 2;
            if self.prefix_sum(mid) > offset {
                right = mid;
            } else {
                left = mid + 1;
            }
        }
        (left < self.len()).then_some(left)
    }

    /// Sum of every height.
    pub fn total(&self) -> usize {
        self.offset_of(self.len())
    }

    /// Drop every row, keeping the allocation.
    pub fn clear(&mut self) {
        self.tree.iter_mut().for_each(|v| *v = 0);
        self.heights.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn empty_index_has_no_rows() {
        let index = HeightIndex::new(4);
        assert!(index.is_empty());
        assert_eq!(index.total(), 0);
        assert_eq!(index.row_at(0), None);
    }

    #[test]
    fn offsets_skip_hidden_rows() {
        let index = HeightIndex::from_heights([24, 0, 0, 20, 20]);
        assert_eq!(index.offset_of(3), 24);
        assert_eq!(index.row_at(0), Some(0));
        assert_eq!(index.row_at(23), Some(0));
        assert_eq!(index.row_at(24), Some(3));
        assert_eq!(index.row_at(63), Some(4));
        assert_eq!(index.row_at(64), None);
    }

    #[test]
    fn push_past_capacity_keeps_sums() {
        let mut index = HeightIndex::new(0);
        for _ in 0..4 {
            index.push(10);
        }
        assert_eq!(index.total(), 40);
        assert_eq!(index.offset_of(3), 30);

        for height in [5, 0, 7, 24, 20, 20, 20, 20, 20, 1] {
            index.push(height);
        }
        let expected: Vec<usize> = [10, 10, 10, 10, 5, 0, 7, 24, 20, 20, 20, 20, 20, 1]
            .iter()
            .scan(0, |sum, h| {
                *sum += h;
                Some(*sum)
            })
            .collect();
        for (row, &sum) in expected.iter().enumerate() {
            assert_eq!(index.prefix_sum(row), sum, "row {row}");
        }
        assert_eq!(index.total(), 177);
        assert_eq!(index.row_at(44), Some(4));
        assert_eq!(index.row_at(45), Some(6));
        assert_eq!(index.row_at(176), Some(13));
        assert_eq!(index.row_at(177), None);
    }

    #[test]
    fn set_patches_one_row() {
        let mut index = HeightIndex::from_heights([20, 0, 20]);
        index.set(1, 20);
        assert_eq!(index.height(1), 20);
        assert_eq!(index.offset_of(2), 40);
        assert_eq!(index.total(), 60);
    }

    #[test]
    fn clear_allows_reuse() {
        let mut index = HeightIndex::from_heights([5, 6]);
        index.clear();
        index.push(7);
        assert_eq!(index.len(), 1);
        assert_eq!(index.total(), 7);
    }

    proptest! {
        #[test]
        fn prefix_sums_match_naive_sums(heights in prop::collection::vec(0usize..=64, 1..80)) {
            let index = HeightIndex::from_heights(heights.iter().copied());
            let mut sum = 0;
            for (row, &h) in heights.iter().enumerate() {
                prop_assert_eq!(index.offset_of(row), sum);
                sum += h;
                prop_assert_eq!(index.prefix_sum(row), sum);
            }
            prop_assert_eq!(index.total(), sum);
        }

        #[test]
        fn pushing_from_empty_matches_naive_sums(heights in prop::collection::vec(0usize..=64, 1..80)) {
            let mut index = HeightIndex::new(0);
            let mut sum = 0;
            for (row, &h) in heights.iter().enumerate() {
                index.push(h);
                sum += h;
                prop_assert_eq!(index.prefix_sum(row), sum);
                prop_assert_eq!(index.total(), sum);
            }
        }

        #[test]
        fn row_at_lands_on_a_row_covering_the_offset(
            heights in prop::collection::vec(0usize..=64, 1..80),
            probe in 0usize..5000,
        ) {
            let index = HeightIndex::from_heights(heights.iter().copied());
            match index.row_at(probe) {
                Some(row) => {
                    prop_assert!(index.height(row) > 0);
                    prop_assert!(index.offset_of(row) <= probe);
                    prop_assert!(probe < index.prefix_sum(row));
                }
                None => prop_assert!(probe >= index.total()),
            }
        }

        #[test]
        fn set_then_read_back(
            heights in prop::collection::vec(0usize..=64, 1..50),
            row in 0usize..50,
            height in 0usize..=64,
        ) {
            let mut index = HeightIndex::from_heights(heights.iter().copied());
            if row < index.len() {
                index.set(row, height);
                prop_assert_eq!(index.offset_of(row) + height, index.prefix_sum(row));
            }
        }
    }
}
