//! Collection of OIFITS files and the granule index.
//!
//! A granule groups the data tables observing one target with one instrument
//! mode during one night. A table whose rows span several targets or nights
//! belongs to several granules.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use crate::id::{FileId, TableRef};
use crate::range::Range;
use crate::schema::columns;
use crate::types::ColumnData;

use super::file::OiFile;
use super::identity::{InstrumentMode, InstrumentModeManager, NightId, Target, TargetManager};
use super::view::{DataTable, DataView};

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Granule {
    pub target: Target,
    pub ins_mode: InstrumentMode,
    pub night: NightId,
}

impl std::fmt::Display for Granule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} / {} / {}", self.target, self.ins_mode, self.night)
    }
}

#[derive(Debug, Default)]
pub struct OiFitsCollection {
    files: Vec<OiFile>,
    targets: Arc<TargetManager>,
    ins_modes: InstrumentModeManager,
    granules: BTreeMap<Granule, BTreeSet<TableRef>>,
}

impl OiFitsCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_file(&mut self, file: OiFile) -> FileId {
        let id = FileId::new(self.files.len() as u32);
        self.files.push(file);
        self.index_file(id);
        id
    }

    /// Declare `alias` as another name of `uid` and rebuild the granule index.
    pub fn add_target_alias(&mut self, alias: &str, uid: &str) {
        Arc::make_mut(&mut self.targets).add_alias(alias, uid);
        self.analyze();
    }

    /// Rebuild identities and granules from every file.
    pub fn analyze(&mut self) {
        self.granules.clear();
        self.ins_modes = InstrumentModeManager::new();
        for i in 0..self.files.len() {
            self.index_file(FileId::new(i as u32));
        }
    }

    fn index_file(&mut self, id: FileId) {
        let Some(file) = self.files.get(id.index()) else {
            return;
        };
        let targets = Arc::make_mut(&mut self.targets);

        // file-local TARGET_ID -> target
        let mut local_targets: BTreeMap<i16, Target> = BTreeMap::new();
        if let Some(t) = file.target() {
            if let (Some(ColumnData::I16(ids)), Some(ColumnData::Str(names))) =
                (t.column(columns::TARGET_ID), t.column(columns::TARGET))
            {
                for (tid, name) in ids.iter().zip(names.iter()) {
                    local_targets.insert(*tid, targets.register(name));
                }
            }
        }

        for (_, w) in file.tables_of(crate::schema::TableKind::Wavelength) {
            if let Some(ins) = w.ins_name() {
                self.ins_modes
                    .register(ins, w.nb_rows(), w.column_range(columns::EFF_WAVE));
            }
        }

        for (table_id, _) in file.data_tables() {
            let Some(view) = DataView::new(id, file, table_id) else {
                continue;
            };
            let Some(ins) = view.ins_name() else {
                tracing::debug!(table = %view.table_ref(), "data table without INSNAME, not indexed");
                continue;
            };
            let ins_mode = match self.ins_modes.resolve(ins, view.nb_channels()) {
                Some(m) => m.clone(),
                None => self
                    .ins_modes
                    .register(ins, view.nb_channels(), Range::UNDEFINED),
            };
            let (Some(tids), Some(nights)) = (view.target_id(), view.night_id()) else {
                continue;
            };
            let pairs: BTreeSet<(i16, NightId)> =
                tids.iter().copied().zip(nights.iter().copied()).collect();
            for (tid, night) in pairs {
                let Some(target) = local_targets.get(&tid) else {
                    tracing::debug!(table = %view.table_ref(), target_id = tid, "TARGET_ID not in OI_TARGET");
                    continue;
                };
                self.granules
                    .entry(Granule {
                        target: target.clone(),
                        ins_mode: ins_mode.clone(),
                        night,
                    })
                    .or_default()
                    .insert(view.table_ref());
            }
        }
    }

    pub fn file(&self, id: FileId) -> Option<&OiFile> {
        self.files.get(id.index())
    }

    pub fn files(&self) -> impl Iterator<Item = (FileId, &OiFile)> {
        self.files
            .iter()
            .enumerate()
            .map(|(i, f)| (FileId::new(i as u32), f))
    }

    pub fn nb_files(&self) -> usize {
        self.files.len()
    }

    pub fn view(&self, tref: TableRef) -> Option<DataView<'_>> {
        DataView::new(tref.file, self.file(tref.file)?, tref.table)
    }

    /// Shared with target filters.
    pub fn target_manager(&self) -> &Arc<TargetManager> {
        &self.targets
    }

    pub fn ins_mode_manager(&self) -> &InstrumentModeManager {
        &self.ins_modes
    }

    pub fn granules(&self) -> &BTreeMap<Granule, BTreeSet<TableRef>> {
        &self.granules
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::build::{DataRow, DataTableBuilder};
    use crate::model::table::OiTable;
    use crate::schema::{OiStandard, TableKind};

    fn file(path: &str, target: &str, mjds: &[f64]) -> OiFile {
        let mut f = OiFile::new(path, OiStandard::V2);
        f.add_table(OiTable::target(&[(1, target)]).unwrap());
        f.add_table(OiTable::wavelength("INS", &[1.0e-6, 2.0e-6]).unwrap());
        let mut b = DataTableBuilder::new(TableKind::Vis2, "INS", 2);
        for m in mjds {
            b.push(DataRow::new(1, *m, &[1, 2], &[1.0, 1.0]));
        }
        f.add_table(b.build().unwrap());
        f
    }

    #[test]
    fn test_granules_span_nights() {
        let mut c = OiFitsCollection::new();
        c.add_file(file("a.fits", "HD 1", &[58000.7, 58001.7]));
        assert_eq!(c.granules().len(), 2);
        let nights: Vec<NightId> = c.granules().keys().map(|g| g.night).collect();
        assert_eq!(nights, vec![NightId(58000), NightId(58001)]);
    }

    #[test]
    fn test_same_target_across_files_shares_granule() {
        let mut c = OiFitsCollection::new();
        c.add_file(file("a.fits", "HD 1", &[58000.7]));
        c.add_file(file("b.fits", "hd_1", &[58000.8]));
        assert_eq!(c.granules().len(), 1);
        let tables = c.granules().values().next().unwrap();
        assert_eq!(tables.len(), 2);
        assert_eq!(c.ins_mode_manager().modes().count(), 1);
    }

    #[test]
    fn test_alias_merges_granules() {
        let mut c = OiFitsCollection::new();
        c.add_file(file("a.fits", "HD 1", &[58000.7]));
        c.add_file(file("b.fits", "GJ 9", &[58000.7]));
        assert_eq!(c.granules().len(), 2);
        c.add_target_alias("GJ 9", "HD 1");
        assert_eq!(c.granules().len(), 1);
    }
}
