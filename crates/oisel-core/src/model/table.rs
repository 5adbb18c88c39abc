//! One OIFITS binary table: keywords, named columns and coarse column ranges.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::range::Range;
use crate::schema::{columns, keywords, TableKind};
use crate::types::{ColumnData, KeywordValue};

#[derive(Debug, Clone)]
pub struct OiTable {
    kind: TableKind,
    /// HDU index inside the owning file (0 until added to a file).
    ext_nb: usize,
    nb_rows: usize,
    keywords: BTreeMap<String, KeywordValue>,
    columns: BTreeMap<String, ColumnData>,
    /// Coarse min/max per numeric column, computed when the column is set.
    ranges: BTreeMap<String, Range>,
}

impl OiTable {
    pub fn new(kind: TableKind, nb_rows: usize) -> Self {
        let mut keywords: BTreeMap<String, KeywordValue> = BTreeMap::new();
        keywords.insert(keywords::EXTNAME.to_string(), kind.extname().into());
        Self {
            kind,
            ext_nb: 0,
            nb_rows,
            keywords,
            columns: BTreeMap::new(),
            ranges: BTreeMap::new(),
        }
    }

    /// OI_TARGET with one row per `(id, name)`.
    pub fn target(targets: &[(i16, &str)]) -> Result<Self> {
        let ids: Vec<i16> = targets.iter().map(|(id, _)| *id).collect();
        let names: Vec<String> = targets.iter().map(|(_, n)| n.to_string()).collect();
        let mut t = Self::new(TableKind::Target, targets.len());
        t.set_column(columns::TARGET_ID, ColumnData::I16(Arc::from(ids)))?;
        t.set_column(columns::TARGET, ColumnData::Str(Arc::from(names)))?;
        Ok(t)
    }

    /// OI_ARRAY with one row per `(sta_index, sta_name)`.
    pub fn array(arr_name: &str, stations: &[(i16, &str)]) -> Result<Self> {
        let idx: Vec<i16> = stations.iter().map(|(i, _)| *i).collect();
        let names: Vec<String> = stations.iter().map(|(_, n)| n.to_string()).collect();
        let mut t = Self::new(TableKind::Array, stations.len());
        t.set_keyword(keywords::ARRNAME, arr_name);
        t.set_column(columns::STA_INDEX, ColumnData::I16(Arc::from(idx)))?;
        t.set_column(columns::STA_NAME, ColumnData::Str(Arc::from(names)))?;
        Ok(t)
    }

    /// OI_WAVELENGTH: one row per spectral channel.
    pub fn wavelength(ins_name: &str, eff_wave: &[f64]) -> Result<Self> {
        let band: Vec<f64> = band_from_waves(eff_wave);
        let mut t = Self::new(TableKind::Wavelength, eff_wave.len());
        t.set_keyword(keywords::INSNAME, ins_name);
        t.set_column(columns::EFF_WAVE, ColumnData::F64(Arc::from(eff_wave.to_vec())))?;
        t.set_column(columns::EFF_BAND, ColumnData::F64(Arc::from(band)))?;
        Ok(t)
    }

    /// OI_CORR (V2), correlation payload omitted.
    pub fn corr(corr_name: &str, ndata: usize) -> Self {
        let mut t = Self::new(TableKind::Corr, 0);
        t.set_keyword(keywords::CORRNAME, corr_name);
        t.set_keyword("NDATA", KeywordValue::Int(ndata as i64));
        t
    }

    pub fn kind(&self) -> TableKind {
        self.kind
    }

    pub fn ext_nb(&self) -> usize {
        self.ext_nb
    }

    pub(crate) fn set_ext_nb(&mut self, ext_nb: usize) {
        self.ext_nb = ext_nb;
    }

    pub fn nb_rows(&self) -> usize {
        self.nb_rows
    }

    pub fn keyword(&self, name: &str) -> Option<&KeywordValue> {
        self.keywords.get(name)
    }

    pub fn keyword_str(&self, name: &str) -> Option<&str> {
        self.keywords.get(name).and_then(|v| v.as_str())
    }

    pub fn set_keyword(&mut self, name: &str, value: impl Into<KeywordValue>) {
        self.keywords.insert(name.to_string(), value.into());
    }

    pub fn remove_keyword(&mut self, name: &str) -> Option<KeywordValue> {
        self.keywords.remove(name)
    }

    pub fn column(&self, name: &str) -> Option<&ColumnData> {
        self.columns.get(name)
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(|k| k.as_str())
    }

    /// Insert or replace a column. Its length must match the row count.
    pub fn set_column(&mut self, name: &str, data: ColumnData) -> Result<()> {
        if data.len() != self.nb_rows {
            return Err(Error::Model(format!(
                "{}: column {} has {} rows, table has {}",
                self.kind,
                name,
                data.len(),
                self.nb_rows
            )));
        }
        self.ranges.insert(name.to_string(), data.range());
        self.columns.insert(name.to_string(), data);
        Ok(())
    }

    /// Coarse summary; `UNDEFINED` when the column is absent or non-numeric.
    pub fn column_range(&self, name: &str) -> Range {
        self.ranges.get(name).copied().unwrap_or(Range::UNDEFINED)
    }

    /// Name this metadata table defines (ARRNAME / INSNAME / CORRNAME).
    pub fn defined_name(&self) -> Option<&str> {
        self.kind.name_keyword().and_then(|k| self.keyword_str(k))
    }

    pub fn arr_name(&self) -> Option<&str> {
        self.keyword_str(keywords::ARRNAME)
    }

    pub fn ins_name(&self) -> Option<&str> {
        self.keyword_str(keywords::INSNAME)
    }

    pub fn corr_name(&self) -> Option<&str> {
        self.keyword_str(keywords::CORRNAME)
    }

    /// Width of the per-channel columns (0 when the table has none).
    pub fn array_width(&self) -> usize {
        if let Some(ColumnData::BoolArray(a)) = self.columns.get(columns::FLAG) {
            return a.cols();
        }
        self.columns
            .values()
            .find_map(|c| match c {
                ColumnData::F64Array(a) => Some(a.cols()),
                _ => None,
            })
            .unwrap_or(0)
    }
}

fn band_from_waves(waves: &[f64]) -> Vec<f64> {
    if waves.len() < 2 {
        return vec![0.0; waves.len()];
    }
    (0..waves.len())
        .map(|i| {
            let j = if i + 1 < waves.len() { i + 1 } else { i - 1 };
            (waves[j] - waves[i]).abs()
        })
        .collect()
}
