//! snapview
//!
//! Filtered, diffable table views over captured memory snapshots.
//!
//! Snapshot loaders supply immutable base [`model::Table`]s. A
//! [`filter::TableFilters`] pipeline derives the displayed table (search,
//! sort, group), [`diff`] merges the same table of two snapshots, and
//! [`view_state`] keeps selection and scroll position stable while the
//! displayed table is rebuilt.

pub mod commands;
pub mod config;
pub mod diff;
pub mod filter;
pub mod logging;
pub mod model;
pub mod render;
pub mod view_state;
