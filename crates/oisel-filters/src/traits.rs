//! Filter trait + common interfaces.
//!
//! Per table, a battery calls `prepare(table)` once, then `accept(row, col)`
//! for every row (and channel) only if `prepare` returned `Mask`, then
//! `reset()`. `prepare` and `reset` take `&mut self`, so one filter instance
//! cannot be evaluating two tables at once.

use oisel_core::model::DataTable;
use serde::{Deserialize, Serialize};

/// Table-level verdict of `prepare()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FilterState {
    /// No row of the table can pass.
    Invalid,
    /// Some rows (or cells) pass; ask `accept`.
    Mask,
    /// Every row passes.
    Full,
}

impl FilterState {
    /// Verdict for "the filter values match everything in the table".
    pub fn all_match(include: bool) -> Self {
        if include {
            FilterState::Full
        } else {
            FilterState::Invalid
        }
    }

    /// Verdict for "the filter values match nothing in the table".
    pub fn none_match(include: bool) -> Self {
        if include {
            FilterState::Invalid
        } else {
            FilterState::Full
        }
    }
}

/// Accepted values of one column with an include/exclude polarity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterSpec<K> {
    pub column: String,
    pub values: Vec<K>,
    pub include: bool,
}

impl<K> FilterSpec<K> {
    pub fn new(column: impl Into<String>, values: Vec<K>, include: bool) -> Self {
        Self {
            column: column.into(),
            values,
            include,
        }
    }
}

/// Trait that all table filters implement.
///
/// Invariants:
/// - `prepare` is called exactly once per table before any `accept`.
/// - `accept` is only meaningful after `prepare` returned `Mask`.
/// - After `reset`, the filter behaves like a freshly constructed one.
pub trait TableFilter: Send {
    /// Human-readable filter name (stable).
    fn name(&self) -> &'static str;

    /// Column (stored or derived) the filter reads.
    fn column_name(&self) -> &str;

    fn is_include(&self) -> bool;

    /// Row×channel filter.
    fn is_2d(&self) -> bool {
        false
    }

    fn prepare(&mut self, table: &dyn DataTable) -> FilterState;

    /// Row (1D filters ignore `col`) or cell acceptance.
    fn accept(&self, row: usize, col: usize) -> bool;

    /// Drop per-table state (resolved columns, matched values).
    fn reset(&mut self);

    /// `name(column)`, used when reporting triggered filters.
    fn describe(&self) -> String {
        format!("{}({})", self.name(), self.column_name())
    }
}

/// Reset a whole battery between tables.
pub fn reset_filters(filters: &mut [Box<dyn TableFilter>]) {
    for f in filters.iter_mut() {
        f.reset();
    }
}
