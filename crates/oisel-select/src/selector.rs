//! Selection criteria. Owned by the caller, read-only to the engine.

use std::collections::BTreeMap;

use oisel_core::model::NightId;
use oisel_core::range::Range;
use serde::{Deserialize, Serialize};

/// Range filter on any stored or derived column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnFilter {
    pub column: String,
    pub ranges: Vec<Range>,
    #[serde(default = "default_include")]
    pub include: bool,
}

fn default_include() -> bool {
    true
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Selector {
    pub target_uid: Option<String>,
    pub ins_mode_uid: Option<String>,
    pub night_id: Option<NightId>,
    /// File path → accepted extension numbers (empty list: the whole file).
    pub extensions: BTreeMap<String, Vec<usize>>,
    pub baselines: Option<Vec<String>>,
    pub mjd_ranges: Option<Vec<Range>>,
    pub wavelength_ranges: Option<Vec<Range>>,
    pub column_filters: Vec<ColumnFilter>,
}

impl Selector {
    pub fn new() -> Self {
        Self::default()
    }

    /// No criterion set.
    pub fn is_empty(&self) -> bool {
        self.target_uid.is_none()
            && self.ins_mode_uid.is_none()
            && self.night_id.is_none()
            && self.extensions.is_empty()
            && self.baselines.is_none()
            && self.mjd_ranges.is_none()
            && self.wavelength_ranges.is_none()
            && self.column_filters.is_empty()
    }

    pub fn with_target(mut self, uid: impl Into<String>) -> Self {
        self.target_uid = Some(uid.into());
        self
    }

    pub fn with_ins_mode(mut self, uid: impl Into<String>) -> Self {
        self.ins_mode_uid = Some(uid.into());
        self
    }

    pub fn with_night(mut self, night: NightId) -> Self {
        self.night_id = Some(night);
        self
    }

    pub fn with_baselines(mut self, names: Vec<String>) -> Self {
        self.baselines = Some(names);
        self
    }

    pub fn with_mjd_ranges(mut self, ranges: Vec<Range>) -> Self {
        self.mjd_ranges = Some(ranges);
        self
    }

    pub fn with_wavelength_ranges(mut self, ranges: Vec<Range>) -> Self {
        self.wavelength_ranges = Some(ranges);
        self
    }

    pub fn with_column_filter(mut self, column: &str, ranges: Vec<Range>, include: bool) -> Self {
        self.column_filters.push(ColumnFilter {
            column: column.to_string(),
            ranges,
            include,
        });
        self
    }

    /// Restrict `path` to the given extension numbers; an empty list keeps the
    /// whole file. Repeated calls for one path accumulate.
    pub fn add_extensions(&mut self, path: &str, ext_nbs: &[usize]) {
        let entry = self.extensions.entry(path.to_string()).or_default();
        for e in ext_nbs {
            if !entry.contains(e) {
                entry.push(*e);
            }
        }
    }

    /// Extension filter. Without any entry every table passes; otherwise only
    /// tables of listed files, and of listed extensions when the list is not empty.
    pub fn accepts_extension(&self, path: &str, ext_nb: usize) -> bool {
        if self.extensions.is_empty() {
            return true;
        }
        match self.extensions.get(path) {
            Some(list) => list.is_empty() || list.contains(&ext_nb),
            None => false,
        }
    }
}
