//! YAML → Selector.
//!
//! Example:
//! ```yaml
//! target: "HD 1234"
//! ins_mode: PIONIER_Pnat
//! night: 58000
//! extensions:
//!   data/2019-05-01.fits: [4, 5]
//!   data/2019-05-02.fits: []
//! baselines: [A0-K0, K0-G1]
//! mjd: [[58000.0, 58000.5]]
//! wavelength: [[1.5e-6, 1.8e-6]]
//! columns:
//!   - { column: VIS2DATA, ranges: [[0.0, 1.0]] }
//!   - { column: SPATIAL_FREQ, ranges: [[0.0, 1.0e7]], include: false }
//! ```
//!
//! Every key is optional; an empty document is the empty selector.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use oisel_core::model::NightId;
use oisel_core::range::Range;

use crate::error::{Error, Result};
use crate::selector::{ColumnFilter, Selector};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SelectorDoc {
    pub target: Option<String>,
    pub ins_mode: Option<String>,
    pub night: Option<i32>,
    pub extensions: BTreeMap<String, Vec<usize>>,
    pub baselines: Option<Vec<String>>,
    pub mjd: Option<Vec<[f64; 2]>>,
    pub wavelength: Option<Vec<[f64; 2]>>,
    pub columns: Vec<ColumnDef>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ColumnDef {
    pub column: String,
    pub ranges: Vec<[f64; 2]>,
    #[serde(default = "yes")]
    pub include: bool,
}

fn yes() -> bool {
    true
}

fn to_ranges(field: &str, pairs: &[[f64; 2]]) -> Result<Vec<Range>> {
    pairs
        .iter()
        .map(|[min, max]| {
            if min.is_nan() || max.is_nan() || min > max {
                Err(Error::InvalidRange {
                    field: field.to_string(),
                    min: *min,
                    max: *max,
                })
            } else {
                Ok(Range::new(*min, *max))
            }
        })
        .collect()
}

pub fn parse_yaml_selector(yaml_src: &str) -> Result<Selector> {
    // an empty document deserializes to unit, not to a map
    if yaml_src.trim().is_empty() {
        return Ok(Selector::new());
    }
    let doc: SelectorDoc = serde_yaml::from_str(yaml_src)?;
    selector_from_doc(doc)
}

pub fn selector_from_doc(doc: SelectorDoc) -> Result<Selector> {
    let mut selector = Selector::new();
    selector.target_uid = doc.target.filter(|s| !s.trim().is_empty());
    selector.ins_mode_uid = doc.ins_mode.filter(|s| !s.trim().is_empty());
    selector.night_id = doc.night.map(NightId);
    for (path, exts) in &doc.extensions {
        selector.add_extensions(path, exts);
    }
    if let Some(baselines) = doc.baselines {
        if baselines.iter().any(|b| b.trim().is_empty()) {
            return Err(Error::Invalid("empty baseline name".into()));
        }
        selector.baselines = Some(baselines);
    }
    if let Some(mjd) = &doc.mjd {
        selector.mjd_ranges = Some(to_ranges("mjd", mjd)?);
    }
    if let Some(wl) = &doc.wavelength {
        selector.wavelength_ranges = Some(to_ranges("wavelength", wl)?);
    }
    for c in &doc.columns {
        selector.column_filters.push(ColumnFilter {
            column: c.column.clone(),
            ranges: to_ranges(&c.column, &c.ranges)?,
            include: c.include,
        });
    }
    Ok(selector)
}
