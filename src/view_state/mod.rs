//! View-state layer: what part of a table is on screen and which row is
//! selected, kept stable while filters rebuild the table underneath.
//!
//! # Module Structure
//!
//! - `height_index`: HeightIndex - O(log n) prefix sums via Fenwick tree
//! - `remap`: ViewState - selection, scroll position and the remap state machine
//! - `table_view`: TableView - source table, filters and display table of one view
//! - `debounce`: FilterDebounce - delay before a filter edit is applied

pub mod debounce;
pub mod height_index;
pub mod remap;
pub mod table_view;

pub use debounce::FilterDebounce;
pub use height_index::HeightIndex;
pub use remap::{RemapOutcome, RemapState, RowMetrics, TableUpdate, ViewState};
pub use table_view::TableView;
