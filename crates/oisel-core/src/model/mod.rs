//! In-memory OIFITS model.
//!
//! ```text
//!  OiFitsCollection ── files: Vec<OiFile> ── tables: Vec<OiTable>
//!        │                     (FileId)              (TableId)
//!        └── granules: (target, ins_mode, night) → {TableRef}
//! ```
//!
//! Tables never point back to their file: a [`DataView`] pairs a file with one
//! of its tables and resolves ARRNAME/INSNAME references by name.

pub mod build;
pub mod collection;
pub mod file;
pub mod identity;
pub mod table;
pub mod view;

pub use build::{DataRow, DataTableBuilder};
pub use collection::{Granule, OiFitsCollection};
pub use file::OiFile;
pub use identity::{
    designates_ins_mode, ins_mode_uid, normalize_name, InstrumentMode, InstrumentModeManager,
    NightId, Target, TargetIdMatcher, TargetManager,
};
pub use table::OiTable;
pub use view::{DataTable, DataView};
