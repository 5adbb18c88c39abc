#![forbid(unsafe_code)]
//! oisel-mem: bounded range allocation for per-row loops.
//!
//! The selection core asks a [`oisel_core::factory::RangeFactory`] for every
//! range list it builds while scanning tables. [`PooledRangeFactory`] recycles
//! those lists across tables of one pass and reports how many were live at
//! once through a [`PeakTracker`].
//!
//! The pool is not synchronized: one instance per query or merge pass.

pub mod error;
pub mod pool;
pub mod tracking;

pub use pool::PooledRangeFactory;
pub use tracking::PeakTracker;
