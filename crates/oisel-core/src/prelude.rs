//! Convenient re-exports for downstream crates.

pub use crate::config::EngineConfig;
pub use crate::error::{Error, Result};
pub use crate::factory::{FactoryStats, RangeFactory, StandardRangeFactory};
pub use crate::id::{FileId, TableId, TableRef};
pub use crate::manifest::{ManifestId, MergeManifest};
pub use crate::mask::{is_not_full, IndexMask, MaskBuilder};
pub use crate::model::{
    DataTable, DataView, Granule, InstrumentMode, NightId, OiFile, OiFitsCollection, OiTable,
    Target, TargetManager,
};
pub use crate::range::Range;
pub use crate::schema::{columns, OiStandard, TableKind};
pub use crate::types::StaTuple;
