//! Group-by on one column with an optional nested filter per group.

use super::indexed::{top_level_blocks, IndexedTable};
use super::{CloneContext, Filter, FilterId};
use crate::model::{
    ColumnInfo, ColumnRole, RowLink, SortDirection, SortLevel, Table, TableError, TableRef,
    TableUid, Value,
};
use std::cell::{OnceCell, RefCell};
use std::collections::HashMap;
use std::ops::Range;
use std::rc::Rc;

/// Groups rows by the value of `column`.
///
/// Each group becomes a header row followed by the group's member rows. The
/// optional sub-filter is applied to every group's members independently,
/// which is how nested groupings and per-group sorting are expressed.
#[derive(Debug)]
pub struct GroupFilter {
    id: FilterId,
    column: usize,
    direction: SortDirection,
    sub: Option<Box<Filter>>,
}

impl GroupFilter {
    /// Group by `column`, ordering groups by key in `direction`.
    ///
    /// [`SortDirection::None`] keeps groups in order of first occurrence.
    pub fn new(column: usize, direction: SortDirection, sub: Option<Filter>) -> Self {
        Self {
            id: FilterId::next(),
            column,
            direction,
            sub: sub.map(Box::new),
        }
    }

    /// Identity of this filter.
    pub fn id(&self) -> FilterId {
        self.id
    }

    /// Grouping column.
    pub fn column(&self) -> usize {
        self.column
    }

    /// Order of the groups.
    pub fn direction(&self) -> SortDirection {
        self.direction
    }

    /// Filter applied to each group's members.
    pub fn sub(&self) -> Option<&Filter> {
        self.sub.as_deref()
    }

    /// Replace the sub-filter, returning the previous one.
    pub fn replace_sub(&mut self, sub: Option<Filter>) -> Option<Filter> {
        std::mem::replace(&mut self.sub, sub.map(Box::new)).map(|b| *b)
    }

    pub(crate) fn sub_slot(&self) -> &[Filter] {
        self.sub.as_deref().map(std::slice::from_ref).unwrap_or(&[])
    }

    pub(crate) fn sub_slot_mut(&mut self) -> &mut [Filter] {
        self.sub
            .as_deref_mut()
            .map(std::slice::from_mut)
            .unwrap_or_default()
    }

    pub(crate) fn deep_clone(&self, ctx: &mut CloneContext) -> Self {
        Self {
            id: FilterId::next(),
            column: self.column,
            direction: self.direction,
            sub: self.sub.as_ref().map(|f| Box::new(f.deep_clone(ctx))),
        }
    }

    /// Drop the sub-filter once it no longer does anything.
    pub(crate) fn simplify(&mut self, dirty: &mut bool) {
        if let Some(sub) = self.sub.as_deref_mut() {
            sub.simplify(dirty);
            if sub.is_noop() {
                self.sub = None;
                *dirty = true;
            }
        }
    }

    /// Grouped view of `source`.
    ///
    /// # Errors
    ///
    /// Returns [`TableError::ColumnOutOfRange`] if the grouping column does not
    /// exist, and propagates sub-filter errors.
    pub fn create_filter(&self, source: &TableRef) -> Result<TableRef, TableError> {
        let table = GroupedTable::build(source, self.column, self.direction, self.sub())?;
        Ok(Rc::new(table))
    }
}

#[derive(Debug)]
struct Group {
    key: Value,
    members: TableRef,
    header_cells: OnceCell<Vec<Value>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Position {
    Header(usize),
    Member(usize, usize),
}

/// Result of a [`GroupFilter`]: one header row per distinct key, each followed
/// by its (sub-filtered) members.
///
/// Header rows sit at depth 0 and start collapsed. Their cells hold the key in
/// the grouping column, the sum of the members' leaf values in numeric
/// columns, and nothing elsewhere.
///
/// # Invariants
///
/// - `header_rows[g + 1] == header_rows[g] + 1 + groups[g].members.row_count()`
/// - `expanded.len() == groups.len()`
#[derive(Debug)]
pub struct GroupedTable {
    source: TableRef,
    column: usize,
    groups: Vec<Group>,
    header_rows: Vec<usize>,
    row_count: usize,
    expanded: RefCell<Vec<bool>>,
    by_key: HashMap<Value, usize>,
    group_of_source: Vec<Option<usize>>,
    expandable_columns: Vec<bool>,
}

impl GroupedTable {
    /// Group the top-level blocks of `source` by their root's value in `column`.
    ///
    /// # Errors
    ///
    /// See [`GroupFilter::create_filter`].
    pub fn build(
        source: &TableRef,
        column: usize,
        direction: SortDirection,
        sub: Option<&Filter>,
    ) -> Result<Self, TableError> {
        let column_count = source.column_count();
        if column >= column_count {
            return Err(TableError::ColumnOutOfRange {
                column,
                column_count,
            });
        }

        let mut first_seen: HashMap<Value, usize> = HashMap::new();
        let mut buckets: Vec<(Value, Vec<Range<usize>>)> = Vec::new();
        for block in top_level_blocks(source.as_ref()) {
            let key = source.cell(block.start, column);
            let index = *first_seen.entry(key.clone()).or_insert_with(|| {
                buckets.push((key, Vec::new()));
                buckets.len() - 1
            });
            buckets[index].1.push(block);
        }
        if direction != SortDirection::None {
            buckets.sort_by(|(a, _), (b, _)| direction.apply(a.cmp_value(b)));
        }

        let mut groups = Vec::with_capacity(buckets.len());
        let mut header_rows = Vec::with_capacity(buckets.len());
        let mut by_key = HashMap::with_capacity(buckets.len());
        let mut group_of_source = vec![None; source.row_count()];
        let mut row_count = 0;
        for (g, (key, blocks)) in buckets.into_iter().enumerate() {
            for row in blocks.iter().flat_map(|b| b.clone()) {
                group_of_source[row] = Some(g);
            }
            let subset: TableRef = Rc::new(IndexedTable::from_blocks(source.clone(), &blocks));
            let members = match sub {
                Some(filter) => filter.create_filter(&subset)?,
                None => subset,
            };
            header_rows.push(row_count);
            row_count += 1 + members.row_count();
            by_key.insert(key.clone(), g);
            groups.push(Group {
                key,
                members,
                header_cells: OnceCell::new(),
            });
        }

        let expandable_columns = (0..column_count)
            .map(|c| c == column || groups.iter().any(|g| g.members.is_column_expandable(c)))
            .collect();

        Ok(Self {
            source: source.clone(),
            column,
            expanded: RefCell::new(vec![false; groups.len()]),
            groups,
            header_rows,
            row_count,
            by_key,
            group_of_source,
            expandable_columns,
        })
    }

    /// Grouping column.
    pub fn group_column(&self) -> usize {
        self.column
    }

    /// Number of groups.
    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    /// Key of group `g`.
    pub fn group_key(&self, g: usize) -> &Value {
        &self.groups[g].key
    }

    /// Row of the header of group `g`.
    pub fn header_row(&self, g: usize) -> usize {
        self.header_rows[g]
    }

    fn locate(&self, row: usize) -> Position {
        let g = self.header_rows.partition_point(|&h| h <= row) - 1;
        match row - self.header_rows[g] {
            0 => Position::Header(g),
            offset => Position::Member(g, offset - 1),
        }
    }

    fn header_cells(&self, g: usize) -> &[Value] {
        let group = &self.groups[g];
        group.header_cells.get_or_init(|| {
            let members = group.members.as_ref();
            let leaves: Vec<usize> = (0..members.row_count())
                .filter(|&r| members.subtree_len(r) == 0)
                .collect();
            self.columns()
                .iter()
                .enumerate()
                .map(|(c, info)| {
                    if c == self.column {
                        group.key.clone()
                    } else if is_summable(info) {
                        let sum = leaves
                            .iter()
                            .filter_map(|&r| members.cell(r, c).as_i64())
                            .fold(0i64, i64::saturating_add);
                        Value::I64(sum)
                    } else {
                        Value::Empty
                    }
                })
                .collect()
        })
    }
}

fn is_summable(info: &ColumnInfo) -> bool {
    info.value_type().is_numeric() && matches!(info.role(), ColumnRole::Plain | ColumnRole::Size)
}

impl Table for GroupedTable {
    fn origin(&self) -> TableUid {
        self.source.origin()
    }

    fn name(&self) -> &str {
        self.source.name()
    }

    fn columns(&self) -> &[ColumnInfo] {
        self.source.columns()
    }

    fn row_count(&self) -> usize {
        self.row_count
    }

    fn cell(&self, row: usize, col: usize) -> Value {
        match self.locate(row) {
            Position::Header(g) => self.header_cells(g)[col].clone(),
            Position::Member(g, m) => self.groups[g].members.cell(m, col),
        }
    }

    fn default_sort(&self) -> &[SortLevel] {
        self.source.default_sort()
    }

    fn link_to(&self, row: usize) -> Option<RowLink> {
        if row >= self.row_count {
            return None;
        }
        match self.locate(row) {
            Position::Header(g) => Some(RowLink::Group {
                origin: self.origin(),
                path: vec![(self.column, self.groups[g].key.clone())],
            }),
            Position::Member(g, m) => match self.groups[g].members.link_to(m)? {
                RowLink::Group { origin, mut path } => {
                    path.insert(0, (self.column, self.groups[g].key.clone()));
                    Some(RowLink::Group { origin, path })
                }
                link @ RowLink::Row { .. } => Some(link),
            },
        }
    }

    fn find_link(&self, link: &RowLink) -> Option<usize> {
        match link {
            RowLink::Row { .. } => {
                let source_row = self.source.find_link(link)?;
                let g = self.group_of_source.get(source_row).copied().flatten()?;
                let m = self.groups[g].members.find_link(link)?;
                Some(self.header_rows[g] + 1 + m)
            }
            RowLink::Group { origin, path } => {
                let ((column, key), rest) = path.split_first()?;
                if *column != self.column {
                    return None;
                }
                let g = *self.by_key.get(key)?;
                if rest.is_empty() {
                    return Some(self.header_rows[g]);
                }
                let nested = RowLink::Group {
                    origin: *origin,
                    path: rest.to_vec(),
                };
                let m = self.groups[g].members.find_link(&nested)?;
                Some(self.header_rows[g] + 1 + m)
            }
        }
    }

    fn is_tree(&self) -> bool {
        true
    }

    fn depth(&self, row: usize) -> u16 {
        match self.locate(row) {
            Position::Header(_) => 0,
            Position::Member(g, m) => self.groups[g].members.depth(m) + 1,
        }
    }

    fn subtree_len(&self, row: usize) -> usize {
        match self.locate(row) {
            Position::Header(g) => self.groups[g].members.row_count(),
            Position::Member(g, m) => self.groups[g].members.subtree_len(m),
        }
    }

    fn parent_row(&self, row: usize) -> Option<usize> {
        match self.locate(row) {
            Position::Header(_) => None,
            Position::Member(g, m) => {
                let header = self.header_rows[g];
                Some(match self.groups[g].members.parent_row(m) {
                    Some(parent) => header + 1 + parent,
                    None => header,
                })
            }
        }
    }

    fn is_expanded(&self, row: usize) -> bool {
        match self.locate(row) {
            Position::Header(g) => self.expanded.borrow()[g],
            Position::Member(g, m) => self.groups[g].members.is_expanded(m),
        }
    }

    fn is_column_expandable(&self, col: usize) -> bool {
        self.expandable_columns.get(col).copied().unwrap_or(false)
    }

    fn expand_column(&self, row: usize) -> Option<usize> {
        match self.locate(row) {
            Position::Header(_) => Some(self.column),
            Position::Member(g, m) => self.groups[g].members.expand_column(m),
        }
    }

    fn expand_cell(&self, row: usize, col: usize, expand: bool) -> Option<Range<usize>> {
        match self.locate(row) {
            Position::Header(g) if col == self.column => {
                let start = row + 1;
                let mut expanded = self.expanded.borrow_mut();
                if expanded[g] == expand {
                    return Some(start..start);
                }
                expanded[g] = expand;
                Some(start..start + self.groups[g].members.row_count())
            }
            Position::Header(_) => None,
            Position::Member(g, m) => {
                let dirty = self.groups[g].members.expand_cell(m, col, expand)?;
                let offset = self.header_rows[g] + 1;
                Some(dirty.start + offset..dirty.end + offset)
            }
        }
    }
}
