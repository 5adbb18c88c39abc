//! Runtime: evaluate a selector over a collection.
//!
//! Flow of `find`:
//! - Granule pass: granules matching target / instrument mode / night, and
//!   their tables passing the extension filter.
//! - Build the three batteries from the selector.
//! - Each distinct OI_WAVELENGTH table referenced by a candidate is evaluated
//!   once into a channel mask; `Invalid` drops every table using it.
//! - Each candidate data table gets a row mask, then a row×channel mask when
//!   channels are restricted, 2D filters exist or flagged cells are skipped.
//! - Surviving `(granule, table)` pairs go into the `SelectorResult`.

use std::collections::BTreeMap;

use thiserror::Error;

use oisel_core::config::EngineConfig;
use oisel_core::factory::{FactoryStats, RangeFactory};
use oisel_core::id::TableRef;
use oisel_core::mask::{is_not_full, IndexMask};
use oisel_core::model::{DataTable, DataView, Granule, OiFitsCollection};
use oisel_core::range::{self, intersect_ranges, Range};
use oisel_core::schema::{columns, is_2d_column};
use oisel_filters::{
    BatteryVerdict, Double1DFilter, Double2DFilter, FilterBattery, NightIdFilter, StationFilter,
    TargetUidFilter,
};
use oisel_mem::PooledRangeFactory;
use oisel_select::{BaseSelectorResult, Selector, SelectorResult};

use crate::metrics::emit_span;

#[derive(Debug, Error)]
pub enum ExecError {
    #[error("no input file to merge")]
    NoInput,
    #[error("{file}: expected exactly one OI_TARGET row, found {count}")]
    TargetCount { file: String, count: usize },
    #[error("{file}: empty target name")]
    EmptyTargetName { file: String },
    #[error("{file}: target mismatch, expected '{expected}' but found '{found}'")]
    TargetMismatch {
        expected: String,
        found: String,
        file: String,
    },
    #[error("model error: {0}")]
    Model(String),
    #[error("hashing error: {0}")]
    Hash(String),
    #[error("configuration error: {0}")]
    Config(String),
}

impl From<oisel_core::error::Error> for ExecError {
    fn from(e: oisel_core::error::Error) -> Self {
        match e {
            oisel_core::error::Error::Hash(m) => ExecError::Hash(m),
            oisel_core::error::Error::Config(m) => ExecError::Config(m),
            other => ExecError::Model(other.to_string()),
        }
    }
}

impl From<oisel_mem::error::Error> for ExecError {
    fn from(e: oisel_mem::error::Error) -> Self {
        ExecError::Config(e.to_string())
    }
}

/// Verdict of one data table, cached across the granules sharing it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TableOutcome {
    Kept,
    Dropped,
}

/// Engine owns the configuration and the range pool of its passes.
pub struct Engine {
    cfg: EngineConfig,
    factory: PooledRangeFactory,
}

impl Engine {
    pub fn new(cfg: EngineConfig) -> Result<Self, ExecError> {
        let factory = PooledRangeFactory::from_config(&cfg)?;
        Ok(Self { cfg, factory })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.cfg
    }

    pub fn factory_stats(&self) -> FactoryStats {
        self.factory.stats()
    }

    /// Select data of `collection`; `None` when nothing matches.
    pub fn find<'c>(
        &mut self,
        collection: &'c OiFitsCollection,
        selector: Option<&Selector>,
    ) -> Option<SelectorResult<'c>> {
        self.factory.reset();

        let candidates = granule_pass(collection, selector);
        if candidates.is_empty() {
            tracing::debug!("no granule matches the selector");
            return None;
        }

        let (wl, d1, d2) = build_batteries(collection, selector);
        let base = BaseSelectorResult::new(collection, selector.cloned());
        let mut result = SelectorResult::new(base, wl, d1, d2);
        let skip_flagged = self.cfg.skip_flagged;

        // channel masks, once per wavelength table
        let mut wavelength_ok: BTreeMap<TableRef, bool> = BTreeMap::new();
        for (_, tref) in &candidates {
            let Some(wref) = wavelength_ref(collection, *tref) else {
                continue;
            };
            if wavelength_ok.contains_key(&wref) {
                continue;
            }
            let Some(view) = collection.view(wref) else {
                continue;
            };
            let verdict = result.batteries_mut().0.evaluate_rows(&view);
            tracing::trace!(table = %wref, ?verdict, "wavelength table");
            let ok = put_verdict(verdict, |m| result.put_wavelength_mask(wref, m));
            wavelength_ok.insert(wref, ok);
        }

        let mut outcomes: BTreeMap<TableRef, TableOutcome> = BTreeMap::new();
        let mut kept: Vec<(Granule, TableRef)> = Vec::new();
        for (granule, tref) in candidates {
            let outcome = match outcomes.get(&tref) {
                Some(o) => *o,
                None => {
                    let o = evaluate_table(
                        collection,
                        &mut result,
                        &wavelength_ok,
                        tref,
                        skip_flagged,
                    );
                    outcomes.insert(tref, o);
                    o
                }
            };
            if outcome == TableOutcome::Kept {
                kept.push((granule, tref));
            }
        }

        result.record_triggered();
        let nb_kept = kept.len();
        for (granule, tref) in kept {
            result.add(granule, tref);
        }
        let dropped = outcomes
            .values()
            .filter(|o| **o == TableOutcome::Dropped)
            .count();
        tracing::debug!(
            tables = outcomes.len(),
            dropped,
            granules = result.granules().len(),
            triggered = ?result.triggered_filters(),
            "selection done"
        );
        emit_span(
            "find",
            &[
                ("tables", outcomes.len().to_string()),
                ("dropped", dropped.to_string()),
            ],
        );

        if nb_kept == 0 {
            None
        } else {
            Some(result)
        }
    }

    /// Wavelength intervals covered by every instrument mode of `result`,
    /// clipped to the selector's wavelength ranges when it has some.
    pub fn common_wavelength_ranges(&mut self, result: &SelectorResult<'_>) -> Vec<Range> {
        let modes: Vec<Range> = result
            .distinct_ins_modes()
            .iter()
            .map(|m| m.wavelength)
            .filter(|r| r.is_finite())
            .collect();
        let common = intersect_ranges(&modes, modes.len(), &mut self.factory);

        let Some(limits) = result.selector().and_then(|s| s.wavelength_ranges.as_ref()) else {
            return common;
        };
        let mut out = self.factory.create_list();
        for limit in limits {
            let mut clipped = common.clone();
            range::restrict_range(&mut clipped, limit.min, limit.max);
            out.extend(clipped);
        }
        self.factory.dispose_list(common);
        range::sort(&mut out);
        range::union(&mut out);
        out
    }
}

fn granule_pass(
    collection: &OiFitsCollection,
    selector: Option<&Selector>,
) -> Vec<(Granule, TableRef)> {
    let targets = collection.target_manager();
    let mut out = Vec::new();
    for (granule, tables) in collection.granules() {
        if let Some(s) = selector {
            if let Some(uid) = &s.target_uid {
                if !targets.matches(&granule.target.uid, uid) {
                    continue;
                }
            }
            if let Some(name) = &s.ins_mode_uid {
                if !granule.ins_mode.designated_by(name) {
                    continue;
                }
            }
            if let Some(night) = s.night_id {
                if granule.night != night {
                    continue;
                }
            }
        }
        for tref in tables {
            let accepted = match (selector, collection.view(*tref)) {
                (Some(s), Some(view)) => s.accepts_extension(view.file_path(), view.ext_nb()),
                (None, Some(_)) => true,
                (_, None) => false,
            };
            if accepted {
                out.push((granule.clone(), *tref));
            }
        }
    }
    out
}

/// Wavelength, data 1D and data 2D batteries for `selector`.
fn build_batteries(
    collection: &OiFitsCollection,
    selector: Option<&Selector>,
) -> (FilterBattery, FilterBattery, FilterBattery) {
    let mut wl = FilterBattery::new();
    let mut d1 = FilterBattery::new();
    let mut d2 = FilterBattery::new();
    let Some(s) = selector else {
        return (wl, d1, d2);
    };
    if let Some(ranges) = &s.wavelength_ranges {
        wl.push(Box::new(Double1DFilter::new(columns::EFF_WAVE, ranges.clone(), true)));
    }
    // tables of a granule may still mix targets row-wise
    if let Some(uid) = &s.target_uid {
        d1.push(Box::new(TargetUidFilter::new(
            collection.target_manager().clone(),
            uid.clone(),
            true,
        )));
    }
    if let Some(night) = s.night_id {
        d1.push(Box::new(NightIdFilter::new(vec![night], true)));
    }
    if let Some(names) = &s.baselines {
        d1.push(Box::new(StationFilter::sta_index(names.clone(), true)));
    }
    if let Some(ranges) = &s.mjd_ranges {
        d1.push(Box::new(Double1DFilter::new(columns::MJD, ranges.clone(), true)));
    }
    for f in &s.column_filters {
        if is_2d_column(&f.column) {
            d2.push(Box::new(Double2DFilter::new(f.column.clone(), f.ranges.clone(), f.include)));
        } else {
            d1.push(Box::new(Double1DFilter::new(f.column.clone(), f.ranges.clone(), f.include)));
        }
    }
    (wl, d1, d2)
}

fn wavelength_ref(collection: &OiFitsCollection, tref: TableRef) -> Option<TableRef> {
    let view = collection.view(tref)?;
    let (id, _) = view.wavelength_table()?;
    Some(TableRef::new(tref.file, id))
}

/// Register a battery verdict; false when the table is rejected.
fn put_verdict(verdict: BatteryVerdict, put: impl FnOnce(IndexMask)) -> bool {
    match verdict {
        BatteryVerdict::Invalid => false,
        BatteryVerdict::Full => {
            put(IndexMask::Full);
            true
        }
        BatteryVerdict::Mask(m) => {
            put(m);
            true
        }
    }
}

fn evaluate_table(
    collection: &OiFitsCollection,
    result: &mut SelectorResult<'_>,
    wavelength_ok: &BTreeMap<TableRef, bool>,
    tref: TableRef,
    skip_flagged: bool,
) -> TableOutcome {
    let Some(view): Option<DataView<'_>> = collection.view(tref) else {
        return TableOutcome::Dropped;
    };
    let wref = wavelength_ref(collection, tref);
    if let Some(w) = wref {
        if wavelength_ok.get(&w) == Some(&false) {
            tracing::trace!(table = %tref, "no selected channel");
            return TableOutcome::Dropped;
        }
    }

    let rows = result.batteries_mut().1.evaluate_rows(&view);
    if !put_verdict(rows, |m| result.put_data_1d_mask(tref, m)) {
        tracing::trace!(table = %tref, "no selected row");
        return TableOutcome::Dropped;
    }

    let channel_partial = wref.is_some_and(|w| is_not_full(result.get_wavelength_mask(w)));
    if channel_partial || !result.data_2d_filters().is_empty() || skip_flagged {
        let row_mask = result.get_data_1d_mask(tref).cloned();
        let channel_mask = wref.and_then(|w| result.get_wavelength_mask(w).cloned());
        let cells = result.batteries_mut().2.evaluate_cells(
            &view,
            row_mask.as_ref(),
            channel_mask.as_ref(),
            skip_flagged,
        );
        if !put_verdict(cells, |m| result.put_data_2d_mask(tref, m)) {
            tracing::trace!(table = %tref, "no selected cell");
            return TableOutcome::Dropped;
        }
    }
    TableOutcome::Kept
}
