#![forbid(unsafe_code)]
//! oisel-core: shared types for the OIFITS selection engine.
//!
//! - `range`: closed real intervals, interval-set algebra and the sweep-line
//!   multi-range intersection.
//! - `factory`: allocation interface for ranges (pooled impl lives in `oisel-mem`).
//! - `mask`: row / row×channel index masks with `Full`/`None` variants.
//! - `model`: in-memory OIFITS tables, files, views and the granule index.
//!
//! No IO in core: the binary codec is expected to build `model::OiFile`s.

pub mod config;
pub mod error;
pub mod factory;
pub mod hash;
pub mod id;
pub mod manifest;
pub mod mask;
pub mod model;
pub mod prelude;
pub mod range;
pub mod schema;
pub mod types;

/// Engine version recorded in manifests.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
