//! One OIFITS file: an arena of tables addressed by `TableId`.

use crate::id::{FileId, TableId};
use crate::schema::{OiStandard, TableKind};

use super::table::OiTable;
use super::view::DataView;

#[derive(Debug, Clone)]
pub struct OiFile {
    path: String,
    standard: OiStandard,
    tables: Vec<OiTable>,
}

impl OiFile {
    pub fn new(path: impl Into<String>, standard: OiStandard) -> Self {
        Self {
            path: path.into(),
            standard,
            tables: Vec::new(),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn standard(&self) -> OiStandard {
        self.standard
    }

    pub fn set_standard(&mut self, standard: OiStandard) {
        self.standard = standard;
    }

    /// Append `table`; extension numbers start at 1 (HDU 0 is the primary header).
    pub fn add_table(&mut self, mut table: OiTable) -> TableId {
        let id = TableId::new(self.tables.len() as u32);
        table.set_ext_nb(self.tables.len() + 1);
        self.tables.push(table);
        id
    }

    /// Deep copy of a table owned by another file; the copy gets this file's
    /// next extension number.
    pub fn copy_table(&mut self, table: &OiTable) -> TableId {
        self.add_table(table.clone())
    }

    pub fn table(&self, id: TableId) -> Option<&OiTable> {
        self.tables.get(id.index())
    }

    pub fn table_mut(&mut self, id: TableId) -> Option<&mut OiTable> {
        self.tables.get_mut(id.index())
    }

    pub fn nb_tables(&self) -> usize {
        self.tables.len()
    }

    pub fn tables(&self) -> impl Iterator<Item = (TableId, &OiTable)> {
        self.tables
            .iter()
            .enumerate()
            .map(|(i, t)| (TableId::new(i as u32), t))
    }

    pub fn tables_of(&self, kind: TableKind) -> impl Iterator<Item = (TableId, &OiTable)> {
        self.tables().filter(move |(_, t)| t.kind() == kind)
    }

    pub fn data_tables(&self) -> impl Iterator<Item = (TableId, &OiTable)> {
        self.tables().filter(|(_, t)| t.kind().is_data())
    }

    pub fn find_by_ext_nb(&self, ext_nb: usize) -> Option<TableId> {
        self.tables()
            .find(|(_, t)| t.ext_nb() == ext_nb)
            .map(|(id, _)| id)
    }

    /// Metadata table of `kind` defining `name` (exact match, trailing blanks ignored).
    pub fn find(&self, kind: TableKind, name: &str) -> Option<(TableId, &OiTable)> {
        let name = name.trim_end();
        self.tables_of(kind)
            .find(|(_, t)| t.defined_name().map(str::trim_end) == Some(name))
    }

    pub fn target(&self) -> Option<&OiTable> {
        self.tables_of(TableKind::Target).map(|(_, t)| t).next()
    }

    pub fn wavelength(&self, ins_name: &str) -> Option<&OiTable> {
        self.find(TableKind::Wavelength, ins_name).map(|(_, t)| t)
    }

    pub fn array(&self, arr_name: &str) -> Option<&OiTable> {
        self.find(TableKind::Array, arr_name).map(|(_, t)| t)
    }

    pub fn corr(&self, corr_name: &str) -> Option<&OiTable> {
        self.find(TableKind::Corr, corr_name).map(|(_, t)| t)
    }

    pub fn has_name(&self, kind: TableKind, name: &str) -> bool {
        self.find(kind, name).is_some()
    }

    /// First of `name`, `name_1`, `name_2`, ... not yet defined by a `kind` table.
    pub fn unique_name(&self, kind: TableKind, name: &str) -> String {
        if !self.has_name(kind, name) {
            return name.to_string();
        }
        let mut i = 1usize;
        loop {
            let candidate = format!("{name}_{i}");
            if !self.has_name(kind, &candidate) {
                return candidate;
            }
            i += 1;
        }
    }

    /// View of a table of this file outside any collection (file id 0).
    pub fn view(&self, id: TableId) -> Option<DataView<'_>> {
        DataView::new(FileId::new(0), self, id)
    }
}
