#![forbid(unsafe_code)]
//! oisel-exec: runs selectors over a collection and merges files.
//!
//! - [`Engine::find`]: granule pass, then filter batteries per wavelength and
//!   data table, producing a `SelectorResult` with its masks.
//! - [`Merger::process`]: consolidates several files into one, renaming
//!   colliding metadata tables and emitting a `MergeManifest`.

pub mod merge;
pub mod metrics;
pub mod runtime;

pub use merge::{Merged, Merger};
pub use runtime::{Engine, ExecError};
