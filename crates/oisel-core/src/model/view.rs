//! Read-only data-table contract consumed by filters, selectors and the merger.
//!
//! [`DataView`] implements it over one table of an [`OiFile`]: the ARRNAME /
//! INSNAME references are resolved by name in the file arena, and derived
//! columns (NIGHT_ID, STA_CONF, BASELINE, SPATIAL_FREQ) are computed on first
//! access and cached for the lifetime of the view.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use once_cell::unsync::OnceCell;

use crate::id::{FileId, TableId, TableRef};
use crate::range::Range;
use crate::schema::{columns, TableKind};
use crate::types::{Array2, ColumnData, StaTuple};

use super::file::OiFile;
use super::identity::{NightId, TargetIdMatcher, TargetManager};
use super::table::OiTable;

/// Everything the selection core needs to know about one data table.
pub trait DataTable {
    fn table_ref(&self) -> TableRef;
    fn kind(&self) -> TableKind;
    fn ext_nb(&self) -> usize;
    fn file_path(&self) -> &str;
    fn nb_rows(&self) -> usize;
    /// Spectral channels (width of the per-channel columns).
    fn nb_channels(&self) -> usize;

    /// Coarse min/max; never finite when the column is absent or empty.
    fn column_range(&self, name: &str) -> Range;
    fn column_f64(&self, name: &str) -> Option<Arc<[f64]>>;
    fn column_f64_2d(&self, name: &str) -> Option<Arc<Array2<f64>>>;
    fn column_i16(&self, name: &str) -> Option<Arc<[i16]>>;
    fn column_i16_2d(&self, name: &str) -> Option<Arc<Array2<i16>>>;
    /// Per-row station tuple for `STA_INDEX` or the derived `STA_CONF`.
    fn sta_tuples(&self, name: &str) -> Option<Arc<[StaTuple]>>;
    fn flag(&self) -> Option<Arc<Array2<bool>>>;

    fn target_id(&self) -> Option<Arc<[i16]>> {
        self.column_i16(columns::TARGET_ID)
    }
    fn night_id(&self) -> Option<Arc<[NightId]>>;
    fn mjd(&self) -> Option<Arc<[f64]>> {
        self.column_f64(columns::MJD)
    }
    fn int_time(&self) -> Option<Arc<[f64]>> {
        self.column_f64(columns::INT_TIME)
    }

    fn arr_name(&self) -> Option<&str>;
    fn ins_name(&self) -> Option<&str>;
    fn corr_name(&self) -> Option<&str>;

    fn distinct_target_id(&self) -> &BTreeSet<i16>;
    fn distinct_night_id(&self) -> &BTreeSet<NightId>;
    fn distinct_sta_conf(&self) -> &BTreeSet<StaTuple>;
    fn distinct_sta_index(&self) -> &BTreeSet<StaTuple>;

    fn has_single_target(&self) -> bool {
        self.distinct_target_id().len() == 1
    }
    fn has_single_night(&self) -> bool {
        self.distinct_night_id().len() == 1
    }

    /// File-local TARGET_ID values designating `uid`; `None` when no row of
    /// OI_TARGET resolves to it.
    fn target_id_matcher(&self, manager: &TargetManager, uid: &str) -> Option<TargetIdMatcher>;
    /// Station configurations of this table named by `names` ("A0-B2-C1-D0").
    fn matching_sta_confs(&self, names: &[String], out: &mut BTreeSet<StaTuple>);
    /// Station tuples of this table named by `names` ("A0-K0"); station order is irrelevant.
    fn matching_sta_indexes(&self, names: &[String], out: &mut BTreeSet<StaTuple>);
}

pub struct DataView<'a> {
    file_id: FileId,
    file: &'a OiFile,
    id: TableId,
    table: &'a OiTable,
    night_id: OnceCell<Option<Arc<[NightId]>>>,
    distinct_targets: OnceCell<BTreeSet<i16>>,
    distinct_nights: OnceCell<BTreeSet<NightId>>,
    sta_index: OnceCell<Option<Arc<[StaTuple]>>>,
    sta_conf: OnceCell<Option<Arc<[StaTuple]>>>,
    distinct_sta_index: OnceCell<BTreeSet<StaTuple>>,
    distinct_sta_conf: OnceCell<BTreeSet<StaTuple>>,
    baseline: OnceCell<Option<Arc<[f64]>>>,
    spatial_freq: OnceCell<Option<Arc<Array2<f64>>>>,
}

impl<'a> DataView<'a> {
    pub fn new(file_id: FileId, file: &'a OiFile, id: TableId) -> Option<Self> {
        let table = file.table(id)?;
        Some(Self {
            file_id,
            file,
            id,
            table,
            night_id: OnceCell::new(),
            distinct_targets: OnceCell::new(),
            distinct_nights: OnceCell::new(),
            sta_index: OnceCell::new(),
            sta_conf: OnceCell::new(),
            distinct_sta_index: OnceCell::new(),
            distinct_sta_conf: OnceCell::new(),
            baseline: OnceCell::new(),
            spatial_freq: OnceCell::new(),
        })
    }

    pub fn file(&self) -> &'a OiFile {
        self.file
    }

    pub fn table(&self) -> &'a OiTable {
        self.table
    }

    pub fn table_id(&self) -> TableId {
        self.id
    }

    /// OI_WAVELENGTH table named by INSNAME.
    pub fn wavelength_table(&self) -> Option<(TableId, &'a OiTable)> {
        let ins = self.table.ins_name()?;
        self.file.find(TableKind::Wavelength, ins)
    }

    pub fn array_table(&self) -> Option<&'a OiTable> {
        self.table.arr_name().and_then(|n| self.file.array(n))
    }

    fn eff_wave(&self) -> Option<Arc<[f64]>> {
        match self.wavelength_table()?.1.column(columns::EFF_WAVE)? {
            ColumnData::F64(v) => Some(v.clone()),
            _ => None,
        }
    }

    fn baseline(&self) -> Option<Arc<[f64]>> {
        self.baseline
            .get_or_init(|| {
                let u = self.column_f64(columns::UCOORD)?;
                let v = self.column_f64(columns::VCOORD)?;
                let b: Vec<f64> = u.iter().zip(v.iter()).map(|(u, v)| u.hypot(*v)).collect();
                Some(Arc::from(b))
            })
            .clone()
    }

    fn spatial_freq(&self) -> Option<Arc<Array2<f64>>> {
        self.spatial_freq
            .get_or_init(|| {
                let baseline = self.baseline()?;
                let waves = self.eff_wave()?;
                let mut out = Array2::filled(baseline.len(), waves.len(), f64::NAN);
                for (r, b) in baseline.iter().enumerate() {
                    for (c, w) in waves.iter().enumerate() {
                        out.set(r, c, b / w);
                    }
                }
                Some(Arc::new(out))
            })
            .clone()
    }

    fn sta_index(&self) -> Option<Arc<[StaTuple]>> {
        self.sta_index
            .get_or_init(|| {
                let tuples: Vec<StaTuple> = match self.table.column(columns::STA_INDEX)? {
                    ColumnData::I16Array(a) => (0..a.rows())
                        .map(|r| StaTuple::new(a.row(r).to_vec()))
                        .collect(),
                    ColumnData::I16(v) => v.iter().map(|s| StaTuple::new(vec![*s])).collect(),
                    _ => return None,
                };
                Some(Arc::from(tuples))
            })
            .clone()
    }

    fn sta_conf(&self) -> Option<Arc<[StaTuple]>> {
        self.sta_conf
            .get_or_init(|| {
                let sta = self.sta_index()?;
                let mjd = self.mjd()?;
                let target = self.target_id();
                let key = |row: usize| {
                    let t = target.as_ref().and_then(|t| t.get(row).copied()).unwrap_or(0);
                    let m = mjd.get(row).copied().unwrap_or(f64::NAN);
                    (t, m.to_bits())
                };
                let mut groups: BTreeMap<(i16, u64), Vec<i16>> = BTreeMap::new();
                for (row, tuple) in sta.iter().enumerate() {
                    groups
                        .entry(key(row))
                        .or_default()
                        .extend_from_slice(tuple.stations());
                }
                let confs: BTreeMap<(i16, u64), StaTuple> = groups
                    .into_iter()
                    .map(|(k, stations)| (k, StaTuple::new(stations)))
                    .collect();
                let per_row: Vec<StaTuple> = (0..sta.len())
                    .map(|row| confs.get(&key(row)).cloned().unwrap_or_default())
                    .collect();
                Some(Arc::from(per_row))
            })
            .clone()
    }

    /// Station-name → STA_INDEX of the referenced OI_ARRAY.
    fn station_indexes(&self) -> BTreeMap<String, i16> {
        let mut out = BTreeMap::new();
        let Some(array) = self.array_table() else {
            return out;
        };
        if let (Some(ColumnData::I16(idx)), Some(ColumnData::Str(names))) = (
            array.column(columns::STA_INDEX),
            array.column(columns::STA_NAME),
        ) {
            for (i, n) in idx.iter().zip(names.iter()) {
                out.insert(n.trim().to_string(), *i);
            }
        }
        out
    }

    /// "A0-K0" → tuple of station indexes; numeric parts are taken as indexes.
    fn parse_stations(&self, names: &[String]) -> Vec<StaTuple> {
        let lookup = self.station_indexes();
        names
            .iter()
            .filter_map(|name| {
                let stations: Option<Vec<i16>> = name
                    .split('-')
                    .map(|s| {
                        let s = s.trim();
                        lookup.get(s).copied().or_else(|| s.parse().ok())
                    })
                    .collect();
                stations.map(StaTuple::new)
            })
            .collect()
    }
}

impl DataTable for DataView<'_> {
    fn table_ref(&self) -> TableRef {
        TableRef::new(self.file_id, self.id)
    }

    fn kind(&self) -> TableKind {
        self.table.kind()
    }

    fn ext_nb(&self) -> usize {
        self.table.ext_nb()
    }

    fn file_path(&self) -> &str {
        self.file.path()
    }

    fn nb_rows(&self) -> usize {
        self.table.nb_rows()
    }

    fn nb_channels(&self) -> usize {
        match self.wavelength_table() {
            Some((_, w)) => w.nb_rows(),
            None => self.table.array_width(),
        }
    }

    fn column_range(&self, name: &str) -> Range {
        if self.table.column(name).is_some() {
            return self.table.column_range(name);
        }
        match name {
            columns::EFF_WAVE => self
                .wavelength_table()
                .map(|(_, w)| w.column_range(columns::EFF_WAVE))
                .unwrap_or(Range::UNDEFINED),
            columns::NIGHT_ID => {
                let nights = self.distinct_night_id();
                match (nights.first(), nights.last()) {
                    (Some(lo), Some(hi)) => Range::new(f64::from(lo.0), f64::from(hi.0)),
                    _ => Range::UNDEFINED,
                }
            }
            columns::BASELINE => self
                .baseline()
                .map(|b| finite_range(&b))
                .unwrap_or(Range::UNDEFINED),
            columns::SPATIAL_FREQ => self
                .spatial_freq()
                .map(|a| finite_range(a.values()))
                .unwrap_or(Range::UNDEFINED),
            _ => Range::UNDEFINED,
        }
    }

    fn column_f64(&self, name: &str) -> Option<Arc<[f64]>> {
        match self.table.column(name) {
            Some(ColumnData::F64(v)) => Some(v.clone()),
            Some(ColumnData::I16(v)) => Some(v.iter().map(|x| f64::from(*x)).collect()),
            Some(ColumnData::I32(v)) => Some(v.iter().map(|x| f64::from(*x)).collect()),
            Some(_) => None,
            None => match name {
                columns::BASELINE => self.baseline(),
                columns::NIGHT_ID => self
                    .night_id()
                    .map(|n| n.iter().map(|n| f64::from(n.0)).collect()),
                _ => None,
            },
        }
    }

    fn column_f64_2d(&self, name: &str) -> Option<Arc<Array2<f64>>> {
        match self.table.column(name) {
            Some(ColumnData::F64Array(a)) => Some(a.clone()),
            Some(_) => None,
            None if name == columns::SPATIAL_FREQ => self.spatial_freq(),
            None => None,
        }
    }

    fn column_i16(&self, name: &str) -> Option<Arc<[i16]>> {
        match self.table.column(name)? {
            ColumnData::I16(v) => Some(v.clone()),
            _ => None,
        }
    }

    fn column_i16_2d(&self, name: &str) -> Option<Arc<Array2<i16>>> {
        match self.table.column(name)? {
            ColumnData::I16Array(a) => Some(a.clone()),
            _ => None,
        }
    }

    fn sta_tuples(&self, name: &str) -> Option<Arc<[StaTuple]>> {
        match name {
            columns::STA_INDEX => self.sta_index(),
            columns::STA_CONF => self.sta_conf(),
            _ => None,
        }
    }

    fn flag(&self) -> Option<Arc<Array2<bool>>> {
        match self.table.column(columns::FLAG)? {
            ColumnData::BoolArray(a) => Some(a.clone()),
            _ => None,
        }
    }

    fn night_id(&self) -> Option<Arc<[NightId]>> {
        self.night_id
            .get_or_init(|| {
                let mjd = self.mjd()?;
                Some(mjd.iter().map(|m| NightId::from_mjd(*m)).collect())
            })
            .clone()
    }

    fn arr_name(&self) -> Option<&str> {
        self.table.arr_name()
    }

    fn ins_name(&self) -> Option<&str> {
        self.table.ins_name()
    }

    fn corr_name(&self) -> Option<&str> {
        self.table.corr_name()
    }

    fn distinct_target_id(&self) -> &BTreeSet<i16> {
        self.distinct_targets.get_or_init(|| {
            self.target_id()
                .map(|ids| ids.iter().copied().collect())
                .unwrap_or_default()
        })
    }

    fn distinct_night_id(&self) -> &BTreeSet<NightId> {
        self.distinct_nights.get_or_init(|| {
            self.night_id()
                .map(|n| n.iter().copied().collect())
                .unwrap_or_default()
        })
    }

    fn distinct_sta_conf(&self) -> &BTreeSet<StaTuple> {
        self.distinct_sta_conf.get_or_init(|| {
            self.sta_conf()
                .map(|s| s.iter().cloned().collect())
                .unwrap_or_default()
        })
    }

    fn distinct_sta_index(&self) -> &BTreeSet<StaTuple> {
        self.distinct_sta_index.get_or_init(|| {
            self.sta_index()
                .map(|s| s.iter().cloned().collect())
                .unwrap_or_default()
        })
    }

    fn target_id_matcher(&self, manager: &TargetManager, uid: &str) -> Option<TargetIdMatcher> {
        let target = self.file.target()?;
        let (Some(ColumnData::I16(ids)), Some(ColumnData::Str(names))) = (
            target.column(columns::TARGET_ID),
            target.column(columns::TARGET),
        ) else {
            return None;
        };
        let matched: BTreeSet<i16> = ids
            .iter()
            .zip(names.iter())
            .filter(|(_, name)| manager.matches(uid, name))
            .map(|(id, _)| *id)
            .collect();
        if matched.is_empty() {
            None
        } else {
            Some(TargetIdMatcher::new(matched))
        }
    }

    fn matching_sta_confs(&self, names: &[String], out: &mut BTreeSet<StaTuple>) {
        let distinct = self.distinct_sta_conf();
        out.extend(
            self.parse_stations(names)
                .into_iter()
                .filter(|t| distinct.contains(t)),
        );
    }

    fn matching_sta_indexes(&self, names: &[String], out: &mut BTreeSet<StaTuple>) {
        let distinct = self.distinct_sta_index();
        out.extend(
            self.parse_stations(names)
                .into_iter()
                .filter(|t| distinct.contains(t)),
        );
    }
}

fn finite_range(values: &[f64]) -> Range {
    let mut out = Range::UNDEFINED;
    for v in values.iter().filter(|v| v.is_finite()) {
        out.include(*v);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::build::{DataRow, DataTableBuilder};
    use crate::schema::OiStandard;

    fn sample_file() -> (OiFile, TableId) {
        let mut f = OiFile::new("night.fits", OiStandard::V2);
        f.add_table(OiTable::target(&[(1, "HD 1"), (2, "HD 2")]).unwrap());
        f.add_table(OiTable::array("VLTI", &[(1, "A0"), (2, "K0"), (3, "G1")]).unwrap());
        f.add_table(OiTable::wavelength("INS", &[2.0e-6, 2.5e-6]).unwrap());
        let table = DataTableBuilder::new(TableKind::Vis2, "INS", 2)
            .arr_name("VLTI")
            .row(DataRow::new(1, 58000.7, &[1, 2], &[0.5, 0.6]).with_uv(3.0, 4.0))
            .row(DataRow::new(1, 58000.7, &[2, 3], &[0.4, 0.3]).with_uv(6.0, 8.0))
            .row(DataRow::new(2, 58001.8, &[1, 3], &[0.2, 0.1]).with_uv(0.0, 1.0))
            .build()
            .unwrap();
        let id = f.add_table(table);
        (f, id)
    }

    #[test]
    fn test_nights_and_targets() {
        let (f, id) = sample_file();
        let v = f.view(id).unwrap();
        assert_eq!(v.nb_channels(), 2);
        assert_eq!(
            v.distinct_night_id().iter().copied().collect::<Vec<_>>(),
            vec![NightId(58000), NightId(58001)]
        );
        assert!(!v.has_single_night());
        assert_eq!(v.distinct_target_id().len(), 2);
        assert_eq!(v.column_range(columns::NIGHT_ID), Range::new(58000.0, 58001.0));
    }

    #[test]
    fn test_sta_conf_groups_rows_by_target_and_mjd() {
        let (f, id) = sample_file();
        let v = f.view(id).unwrap();
        let conf = v.sta_tuples(columns::STA_CONF).unwrap();
        assert_eq!(conf[0], StaTuple::new(vec![1, 2, 3]));
        assert_eq!(conf[1], StaTuple::new(vec![1, 2, 3]));
        assert_eq!(conf[2], StaTuple::new(vec![1, 3]));
        assert_eq!(v.distinct_sta_conf().len(), 2);
    }

    #[test]
    fn test_derived_baseline_and_spatial_freq() {
        let (f, id) = sample_file();
        let v = f.view(id).unwrap();
        assert_eq!(v.column_range(columns::BASELINE), Range::new(1.0, 10.0));
        let sf = v.column_f64_2d(columns::SPATIAL_FREQ).unwrap();
        assert_eq!(sf.get(0, 0).copied(), Some(5.0 / 2.0e-6));
        assert_eq!(v.column_range(columns::EFF_WAVE), Range::new(2.0e-6, 2.5e-6));
    }

    #[test]
    fn test_matching_stations_by_name() {
        let (f, id) = sample_file();
        let v = f.view(id).unwrap();
        let mut out = BTreeSet::new();
        v.matching_sta_indexes(&["K0-A0".to_string(), "A0-Z9".to_string()], &mut out);
        assert_eq!(out.into_iter().collect::<Vec<_>>(), vec![StaTuple::new(vec![1, 2])]);
        let mut confs = BTreeSet::new();
        v.matching_sta_confs(&["A0-G1".to_string()], &mut confs);
        assert_eq!(confs.len(), 1);
    }

    #[test]
    fn test_target_id_matcher() {
        let (f, id) = sample_file();
        let v = f.view(id).unwrap();
        let mut manager = TargetManager::new();
        manager.register("HD 1");
        manager.register("HD 2");
        let m = v.target_id_matcher(&manager, "HD 2").unwrap();
        assert!(m.matches(2));
        assert!(!m.matches(1));
        assert!(v.target_id_matcher(&manager, "HD 3").is_none());
    }
}
