//! Selection results.
//!
//! A result is filled once (`add`) and then only read: every derived view is
//! computed on first access and never recomputed, so `add` after a read is a
//! caller error (logged, the stale cache stays).

use std::collections::{BTreeMap, BTreeSet};
use std::ops::Deref;

use once_cell::unsync::OnceCell;

use oisel_core::id::TableRef;
use oisel_core::mask::{is_not_full, IndexMask};
use oisel_core::model::{
    DataTable, Granule, InstrumentMode, NightId, OiFitsCollection, Target,
};
use oisel_core::range::Range;
use oisel_core::schema::columns;
use oisel_core::types::{ColumnData, StaTuple};
use oisel_filters::FilterBattery;

use crate::selector::Selector;

pub struct BaseSelectorResult<'c> {
    collection: &'c OiFitsCollection,
    selector: Option<Selector>,
    granules: BTreeSet<Granule>,
    tables: BTreeSet<TableRef>,

    tables_by_file: OnceCell<BTreeMap<String, Vec<TableRef>>>,
    targets: OnceCell<Vec<Target>>,
    ins_modes: OnceCell<Vec<InstrumentMode>>,
    nights: OnceCell<Vec<NightId>>,
    sta_names: OnceCell<BTreeSet<String>>,
    sta_confs: OnceCell<BTreeSet<StaTuple>>,
    wavelength_range: OnceCell<Range>,
    target_aliases: OnceCell<BTreeMap<String, BTreeSet<String>>>,
}

impl<'c> BaseSelectorResult<'c> {
    pub fn new(collection: &'c OiFitsCollection, selector: Option<Selector>) -> Self {
        Self {
            collection,
            selector,
            granules: BTreeSet::new(),
            tables: BTreeSet::new(),
            tables_by_file: OnceCell::new(),
            targets: OnceCell::new(),
            ins_modes: OnceCell::new(),
            nights: OnceCell::new(),
            sta_names: OnceCell::new(),
            sta_confs: OnceCell::new(),
            wavelength_range: OnceCell::new(),
            target_aliases: OnceCell::new(),
        }
    }

    fn is_frozen(&self) -> bool {
        self.tables_by_file.get().is_some()
            || self.targets.get().is_some()
            || self.ins_modes.get().is_some()
            || self.nights.get().is_some()
            || self.sta_names.get().is_some()
            || self.sta_confs.get().is_some()
            || self.wavelength_range.get().is_some()
            || self.target_aliases.get().is_some()
    }

    pub fn add(&mut self, granule: Granule, table: TableRef) {
        if self.is_frozen() {
            tracing::warn!(%table, "selector result already read, derived views will not include it");
        }
        self.granules.insert(granule);
        self.tables.insert(table);
    }

    pub fn collection(&self) -> &'c OiFitsCollection {
        self.collection
    }

    pub fn selector(&self) -> Option<&Selector> {
        self.selector.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    pub fn granules(&self) -> &BTreeSet<Granule> {
        &self.granules
    }

    pub fn table_refs(&self) -> &BTreeSet<TableRef> {
        &self.tables
    }

    /// Selected tables grouped by file path, each group in extension order.
    pub fn sorted_tables_by_file(&self) -> &BTreeMap<String, Vec<TableRef>> {
        self.tables_by_file.get_or_init(|| {
            let mut out: BTreeMap<String, Vec<(usize, TableRef)>> = BTreeMap::new();
            for tref in &self.tables {
                if let Some(view) = self.collection.view(*tref) {
                    out.entry(view.file_path().to_string())
                        .or_default()
                        .push((view.ext_nb(), *tref));
                }
            }
            out.into_iter()
                .map(|(path, mut v)| {
                    v.sort();
                    (path, v.into_iter().map(|(_, t)| t).collect())
                })
                .collect()
        })
    }

    pub fn distinct_targets(&self) -> &[Target] {
        self.targets.get_or_init(|| {
            let set: BTreeSet<&Target> = self.granules.iter().map(|g| &g.target).collect();
            set.into_iter().cloned().collect()
        })
    }

    pub fn distinct_ins_modes(&self) -> &[InstrumentMode] {
        self.ins_modes.get_or_init(|| {
            let set: BTreeSet<&InstrumentMode> =
                self.granules.iter().map(|g| &g.ins_mode).collect();
            set.into_iter().cloned().collect()
        })
    }

    pub fn distinct_nights(&self) -> &[NightId] {
        self.nights.get_or_init(|| {
            let set: BTreeSet<NightId> = self.granules.iter().map(|g| g.night).collect();
            set.into_iter().collect()
        })
    }

    /// Baseline / triangle names ("A0-K0") of the selected tables.
    pub fn distinct_sta_names(&self) -> &BTreeSet<String> {
        self.sta_names.get_or_init(|| {
            let mut out = BTreeSet::new();
            for tref in &self.tables {
                let Some(view) = self.collection.view(*tref) else {
                    continue;
                };
                let names = station_names(&view);
                for tuple in view.distinct_sta_index() {
                    out.insert(tuple_name(tuple, &names));
                }
            }
            out
        })
    }

    pub fn distinct_sta_confs(&self) -> &BTreeSet<StaTuple> {
        self.sta_confs.get_or_init(|| {
            let mut out = BTreeSet::new();
            for tref in &self.tables {
                if let Some(view) = self.collection.view(*tref) {
                    out.extend(view.distinct_sta_conf().iter().cloned());
                }
            }
            out
        })
    }

    /// Wavelength span of the selected tables.
    pub fn wavelength_range(&self) -> Range {
        *self.wavelength_range.get_or_init(|| {
            let mut out = Range::UNDEFINED;
            for tref in &self.tables {
                if let Some(view) = self.collection.view(*tref) {
                    let r = view.column_range(columns::EFF_WAVE);
                    if r.is_finite() {
                        out.include(r.min);
                        out.include(r.max);
                    }
                }
            }
            out
        })
    }

    /// Target UID → every name seen for it in the collection.
    pub fn target_aliases(&self) -> &BTreeMap<String, BTreeSet<String>> {
        self.target_aliases.get_or_init(|| {
            let manager = self.collection.target_manager();
            self.distinct_targets()
                .iter()
                .map(|t| {
                    let names = manager.names_of(&t.uid).cloned().unwrap_or_default();
                    (t.uid.clone(), names)
                })
                .collect()
        })
    }
}

fn station_names(view: &oisel_core::model::DataView<'_>) -> BTreeMap<i16, String> {
    let mut out = BTreeMap::new();
    if let Some(array) = view.array_table() {
        if let (Some(ColumnData::I16(idx)), Some(ColumnData::Str(names))) = (
            array.column(columns::STA_INDEX),
            array.column(columns::STA_NAME),
        ) {
            for (i, n) in idx.iter().zip(names.iter()) {
                out.insert(*i, n.trim().to_string());
            }
        }
    }
    out
}

fn tuple_name(tuple: &StaTuple, names: &BTreeMap<i16, String>) -> String {
    let parts: Vec<String> = tuple
        .stations()
        .iter()
        .map(|s| names.get(s).cloned().unwrap_or_else(|| s.to_string()))
        .collect();
    parts.join("-")
}

/// Selection result with the filter batteries and the masks they produced.
pub struct SelectorResult<'c> {
    base: BaseSelectorResult<'c>,
    wavelength_filters: FilterBattery,
    data_1d_filters: FilterBattery,
    data_2d_filters: FilterBattery,
    triggered: BTreeSet<String>,
    /// OI_WAVELENGTH table → channel mask.
    wavelength_masks: BTreeMap<TableRef, IndexMask>,
    /// data table → row mask.
    data_1d_masks: BTreeMap<TableRef, IndexMask>,
    /// data table → row×channel mask.
    data_2d_masks: BTreeMap<TableRef, IndexMask>,
}

impl<'c> SelectorResult<'c> {
    pub fn new(
        base: BaseSelectorResult<'c>,
        wavelength_filters: FilterBattery,
        data_1d_filters: FilterBattery,
        data_2d_filters: FilterBattery,
    ) -> Self {
        Self {
            base,
            wavelength_filters,
            data_1d_filters,
            data_2d_filters,
            triggered: BTreeSet::new(),
            wavelength_masks: BTreeMap::new(),
            data_1d_masks: BTreeMap::new(),
            data_2d_masks: BTreeMap::new(),
        }
    }

    pub fn base(&self) -> &BaseSelectorResult<'c> {
        &self.base
    }

    pub fn add(&mut self, granule: Granule, table: TableRef) {
        self.base.add(granule, table);
    }

    /// The three batteries: wavelength, data 1D, data 2D.
    pub fn batteries_mut(&mut self) -> (&mut FilterBattery, &mut FilterBattery, &mut FilterBattery) {
        (
            &mut self.wavelength_filters,
            &mut self.data_1d_filters,
            &mut self.data_2d_filters,
        )
    }

    pub fn wavelength_filters(&self) -> &FilterBattery {
        &self.wavelength_filters
    }

    pub fn data_1d_filters(&self) -> &FilterBattery {
        &self.data_1d_filters
    }

    pub fn data_2d_filters(&self) -> &FilterBattery {
        &self.data_2d_filters
    }

    /// Collect the triggered filters of the three batteries.
    pub fn record_triggered(&mut self) {
        for b in [
            &self.wavelength_filters,
            &self.data_1d_filters,
            &self.data_2d_filters,
        ] {
            self.triggered.extend(b.triggered().iter().cloned());
        }
    }

    /// Filters that restricted at least one table.
    pub fn triggered_filters(&self) -> &BTreeSet<String> {
        &self.triggered
    }

    pub fn put_wavelength_mask(&mut self, table: TableRef, mask: IndexMask) {
        self.wavelength_masks.insert(table, mask);
    }

    pub fn get_wavelength_mask(&self, table: TableRef) -> Option<&IndexMask> {
        self.wavelength_masks.get(&table)
    }

    /// The channel mask, only when it restricts something.
    pub fn get_wavelength_mask_not_full(&self, table: TableRef) -> Option<&IndexMask> {
        not_full(self.wavelength_masks.get(&table))
    }

    pub fn put_data_1d_mask(&mut self, table: TableRef, mask: IndexMask) {
        self.data_1d_masks.insert(table, mask);
    }

    pub fn get_data_1d_mask(&self, table: TableRef) -> Option<&IndexMask> {
        self.data_1d_masks.get(&table)
    }

    pub fn get_data_1d_mask_not_full(&self, table: TableRef) -> Option<&IndexMask> {
        not_full(self.data_1d_masks.get(&table))
    }

    pub fn put_data_2d_mask(&mut self, table: TableRef, mask: IndexMask) {
        self.data_2d_masks.insert(table, mask);
    }

    pub fn get_data_2d_mask(&self, table: TableRef) -> Option<&IndexMask> {
        self.data_2d_masks.get(&table)
    }

    pub fn get_data_2d_mask_not_full(&self, table: TableRef) -> Option<&IndexMask> {
        not_full(self.data_2d_masks.get(&table))
    }
}

fn not_full(mask: Option<&IndexMask>) -> Option<&IndexMask> {
    if is_not_full(mask) {
        mask
    } else {
        None
    }
}

impl<'c> Deref for SelectorResult<'c> {
    type Target = BaseSelectorResult<'c>;

    fn deref(&self) -> &Self::Target {
        &self.base
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oisel_core::mask::MaskBuilder;
    use oisel_core::model::{DataRow, DataTableBuilder, OiFile, OiTable};
    use oisel_core::schema::{OiStandard, TableKind};

    fn collection() -> OiFitsCollection {
        let mut c = OiFitsCollection::new();
        for (path, mjd) in [("b.fits", 58001.7), ("a.fits", 58000.7)] {
            let mut f = OiFile::new(path, OiStandard::V2);
            f.add_table(OiTable::target(&[(1, "HD 1")]).unwrap());
            f.add_table(OiTable::array("VLTI", &[(1, "A0"), (2, "K0")]).unwrap());
            f.add_table(OiTable::wavelength("INS", &[1.5e-6, 1.8e-6]).unwrap());
            for _ in 0..2 {
                f.add_table(
                    DataTableBuilder::new(TableKind::Vis2, "INS", 2)
                        .arr_name("VLTI")
                        .row(DataRow::new(1, mjd, &[2, 1], &[0.5, 0.5]))
                        .build()
                        .unwrap(),
                );
            }
            c.add_file(f);
        }
        c
    }

    fn filled(c: &OiFitsCollection) -> BaseSelectorResult<'_> {
        let mut r = BaseSelectorResult::new(c, None);
        for (g, tables) in c.granules() {
            for t in tables {
                r.add(g.clone(), *t);
            }
        }
        r
    }

    #[test]
    fn test_derived_views() {
        let c = collection();
        let r = filled(&c);
        assert_eq!(r.table_refs().len(), 4);
        assert_eq!(r.distinct_targets().len(), 1);
        assert_eq!(r.distinct_ins_modes().len(), 1);
        assert_eq!(r.distinct_nights(), &[NightId(58000), NightId(58001)]);
        assert_eq!(
            r.distinct_sta_names().iter().cloned().collect::<Vec<_>>(),
            vec!["A0-K0".to_string()]
        );
        assert_eq!(r.wavelength_range(), Range::new(1.5e-6, 1.8e-6));
        let by_file = r.sorted_tables_by_file();
        assert_eq!(by_file.keys().cloned().collect::<Vec<_>>(), vec!["a.fits", "b.fits"]);
        assert_eq!(by_file["a.fits"].len(), 2);
        assert!(r.target_aliases()["HD 1"].contains("HD 1"));
    }

    #[test]
    fn test_views_are_memoized() {
        let c = collection();
        let mut r = filled(&c);
        let first = r.distinct_nights().to_vec();
        let (g, t) = c.granules().iter().next().map(|(g, t)| (g.clone(), t.clone())).unwrap();
        let extra = Granule { night: NightId(1), ..g };
        r.add(extra, *t.iter().next().unwrap());
        assert_eq!(r.distinct_nights(), first.as_slice());
    }

    #[test]
    fn test_mask_registries() {
        let c = collection();
        let base = filled(&c);
        let tref = *base.table_refs().iter().next().unwrap();
        let mut r = SelectorResult::new(
            base,
            FilterBattery::new(),
            FilterBattery::new(),
            FilterBattery::new(),
        );
        r.put_data_1d_mask(tref, IndexMask::Full);
        assert!(r.get_data_1d_mask(tref).is_some());
        assert!(r.get_data_1d_mask_not_full(tref).is_none());

        let mut b = MaskBuilder::rows(2);
        b.accept_row(1);
        r.put_wavelength_mask(tref, b.build());
        assert!(r.get_wavelength_mask_not_full(tref).is_some());
        assert!(r.get_data_2d_mask(tref).is_none());
        assert_eq!(r.distinct_targets().len(), 1);
    }
}
