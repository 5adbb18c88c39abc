#![forbid(unsafe_code)]
//! oisel-select: what to select, and what was selected.
//!
//! - [`Selector`]: declarative criteria (target, instrument mode, night,
//!   extensions, baselines, MJD / wavelength / column ranges). Pure data.
//! - [`SelectorMatcher`]: coarse per-table accept/reject, used by the merger.
//! - [`SelectorResult`]: matched granules and tables, memoized views over
//!   them, the filter batteries and the per-table masks they produced.
//! - `dsl::yaml`: selectors written as YAML documents.

pub mod dsl;
pub mod error;
pub mod matcher;
pub mod result;
pub mod selector;

pub use dsl::yaml::parse_yaml_selector;
pub use error::{Error, Result};
pub use matcher::SelectorMatcher;
pub use result::{BaseSelectorResult, SelectorResult};
pub use selector::{ColumnFilter, Selector};
