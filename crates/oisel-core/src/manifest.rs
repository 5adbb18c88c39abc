//! Merge manifest for provenance.
//!
//! The merger emits one after every successful `process()`: which inputs were
//! consumed, which tables made it into the result, which were skipped and why,
//! and how metadata tables were renamed to avoid collisions.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::hash::Hash256;
use crate::schema::{OiStandard, TableKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ManifestId(pub Uuid);

/// One table copied into the merged file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergedTable {
    pub source: String,
    pub kind: TableKind,
    pub source_ext_nb: usize,
    pub ext_nb: usize,
}

/// A data table left out of the merged file (soft failure).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedTable {
    pub source: String,
    pub kind: TableKind,
    pub ext_nb: usize,
    pub reason: String,
}

/// Metadata table copied under a new name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rename {
    pub source: String,
    pub kind: TableKind,
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergeManifest {
    pub id: ManifestId,

    /// Engine version string for provenance.
    pub engine_version: String,

    pub output_standard: OiStandard,

    /// Input paths, in processing order.
    pub inputs: Vec<String>,

    pub merged: Vec<MergedTable>,
    pub skipped: Vec<SkippedTable>,
    pub renames: Vec<Rename>,

    /// Stable hash of the merged file layout (kinds, names, row counts).
    pub outputs_digest: Option<Hash256>,

    /// Milliseconds since Unix epoch (UTC).
    pub started_ms: u64,
    pub finished_ms: u64,
}

impl MergeManifest {
    pub fn new(output_standard: OiStandard, started_ms: u64) -> Self {
        Self {
            id: ManifestId(Uuid::new_v4()),
            engine_version: crate::VERSION.to_string(),
            output_standard,
            inputs: Vec::new(),
            merged: Vec::new(),
            skipped: Vec::new(),
            renames: Vec::new(),
            outputs_digest: None,
            started_ms,
            finished_ms: started_ms,
        }
    }

    pub fn finish(mut self, finished_ms: u64, outputs_digest: Option<Hash256>) -> Self {
        self.finished_ms = finished_ms;
        self.outputs_digest = outputs_digest;
        self
    }

    /// Data tables copied into the result.
    pub fn nb_merged_data(&self) -> usize {
        self.merged.iter().filter(|t| t.kind.is_data()).count()
    }
}
