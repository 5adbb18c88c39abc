#![forbid(unsafe_code)]
//! oisel-filters: column filters with a three-state short-circuit protocol.
//!
//! Design intent:
//! - `prepare()` decides per table from coarse summaries (min/max, distinct
//!   sets) whenever it can; only a `Mask` verdict resolves the full column.
//! - Filters never fail: a missing column or a non-finite summary makes the
//!   filter accept everything (`Full`) and logs a warning.
//! - A battery combines several filters over one table into an `IndexMask`.

pub mod battery;
pub mod double;
pub mod night;
pub mod station;
pub mod target;
pub mod traits;

#[cfg(test)]
mod test_support;

pub use battery::{BatteryVerdict, FilterBattery};
pub use double::{Double1DFilter, Double2DFilter};
pub use night::NightIdFilter;
pub use station::{StationColumn, StationFilter};
pub use target::TargetUidFilter;
pub use traits::{reset_filters, FilterSpec, FilterState, TableFilter};
