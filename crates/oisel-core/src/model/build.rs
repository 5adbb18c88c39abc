//! Row-wise construction of data tables.
//!
//! Used by decoders that stream rows and by tests; the resulting [`OiTable`]
//! is column-oriented like everything else in the model.

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::schema::{columns, keywords, TableKind};
use crate::types::{Array2, ColumnData};

use super::table::OiTable;

/// One measurement row: station tuple plus one value per channel.
#[derive(Debug, Clone)]
pub struct DataRow {
    pub target_id: i16,
    pub mjd: f64,
    pub int_time: f64,
    pub sta_index: Vec<i16>,
    pub values: Vec<f64>,
    pub flags: Option<Vec<bool>>,
    pub uv: Option<(f64, f64)>,
}

impl DataRow {
    pub fn new(target_id: i16, mjd: f64, sta_index: &[i16], values: &[f64]) -> Self {
        Self {
            target_id,
            mjd,
            int_time: 0.0,
            sta_index: sta_index.to_vec(),
            values: values.to_vec(),
            flags: None,
            uv: None,
        }
    }

    pub fn with_uv(mut self, u: f64, v: f64) -> Self {
        self.uv = Some((u, v));
        self
    }

    pub fn with_flags(mut self, flags: &[bool]) -> Self {
        self.flags = Some(flags.to_vec());
        self
    }

    pub fn int_time(mut self, seconds: f64) -> Self {
        self.int_time = seconds;
        self
    }
}

#[derive(Debug, Clone)]
pub struct DataTableBuilder {
    kind: TableKind,
    ins_name: String,
    arr_name: Option<String>,
    corr_name: Option<String>,
    nb_channels: usize,
    rows: Vec<DataRow>,
}

impl DataTableBuilder {
    pub fn new(kind: TableKind, ins_name: &str, nb_channels: usize) -> Self {
        Self {
            kind,
            ins_name: ins_name.to_string(),
            arr_name: None,
            corr_name: None,
            nb_channels,
            rows: Vec::new(),
        }
    }

    pub fn arr_name(mut self, name: &str) -> Self {
        self.arr_name = Some(name.to_string());
        self
    }

    pub fn corr_name(mut self, name: &str) -> Self {
        self.corr_name = Some(name.to_string());
        self
    }

    pub fn row(mut self, row: DataRow) -> Self {
        self.rows.push(row);
        self
    }

    pub fn push(&mut self, row: DataRow) {
        self.rows.push(row);
    }

    fn value_column(&self) -> Result<&'static str> {
        Ok(match self.kind {
            TableKind::Vis => columns::VISAMP,
            TableKind::Vis2 => columns::VIS2DATA,
            TableKind::T3 => columns::T3PHI,
            TableKind::Flux => columns::FLUXDATA,
            other => return Err(Error::Model(format!("{other} is not a data table"))),
        })
    }

    pub fn build(self) -> Result<OiTable> {
        let value_column = self.value_column()?;
        let nb_rows = self.rows.len();
        let width = self.nb_channels;
        let nb_stations = self.kind.nb_stations();

        let mut values = Array2::filled(nb_rows, width, f64::NAN);
        let mut flags = Array2::filled(nb_rows, width, false);
        let mut sta = Array2::filled(nb_rows, nb_stations, -1i16);
        for (r, row) in self.rows.iter().enumerate() {
            if row.values.len() != width {
                return Err(Error::Model(format!(
                    "{}: row {r} has {} values, expected {width}",
                    self.kind,
                    row.values.len()
                )));
            }
            if row.sta_index.len() != nb_stations {
                return Err(Error::Model(format!(
                    "{}: row {r} has {} stations, expected {nb_stations}",
                    self.kind,
                    row.sta_index.len()
                )));
            }
            for (c, v) in row.values.iter().enumerate() {
                values.set(r, c, *v);
            }
            if let Some(f) = &row.flags {
                for (c, v) in f.iter().take(width).enumerate() {
                    flags.set(r, c, *v);
                }
            }
            for (s, idx) in row.sta_index.iter().enumerate() {
                sta.set(r, s, *idx);
            }
        }

        let mut table = OiTable::new(self.kind, nb_rows);
        table.set_keyword(keywords::INSNAME, self.ins_name.as_str());
        if let Some(arr) = &self.arr_name {
            table.set_keyword(keywords::ARRNAME, arr.as_str());
        }
        if let Some(corr) = &self.corr_name {
            table.set_keyword(keywords::CORRNAME, corr.as_str());
        }

        let target: Vec<i16> = self.rows.iter().map(|r| r.target_id).collect();
        let mjd: Vec<f64> = self.rows.iter().map(|r| r.mjd).collect();
        let int_time: Vec<f64> = self.rows.iter().map(|r| r.int_time).collect();
        table.set_column(columns::TARGET_ID, ColumnData::I16(Arc::from(target)))?;
        table.set_column(columns::MJD, ColumnData::F64(Arc::from(mjd)))?;
        table.set_column(columns::INT_TIME, ColumnData::F64(Arc::from(int_time)))?;
        table.set_column(columns::STA_INDEX, ColumnData::I16Array(Arc::new(sta)))?;
        table.set_column(value_column, ColumnData::F64Array(Arc::new(values)))?;
        table.set_column(columns::FLAG, ColumnData::BoolArray(Arc::new(flags)))?;

        if self.rows.iter().any(|r| r.uv.is_some()) {
            let (u, v): (Vec<f64>, Vec<f64>) = self
                .rows
                .iter()
                .map(|r| r.uv.unwrap_or((f64::NAN, f64::NAN)))
                .unzip();
            table.set_column(columns::UCOORD, ColumnData::F64(Arc::from(u)))?;
            table.set_column(columns::VCOORD, ColumnData::F64(Arc::from(v)))?;
        }
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_vis2() {
        let t = DataTableBuilder::new(TableKind::Vis2, "INS", 3)
            .arr_name("ARR")
            .row(DataRow::new(1, 58000.0, &[1, 2], &[0.1, 0.2, 0.3]).with_flags(&[false, true, false]))
            .build()
            .unwrap();
        assert_eq!(t.nb_rows(), 1);
        assert_eq!(t.array_width(), 3);
        assert_eq!(t.ins_name(), Some("INS"));
        assert_eq!(t.arr_name(), Some("ARR"));
        assert_eq!(t.column_range(columns::VIS2DATA).max, 0.3);
        assert!(t.column(columns::UCOORD).is_none());
    }

    #[test]
    fn test_build_rejects_bad_shapes() {
        let wrong_width = DataTableBuilder::new(TableKind::Vis2, "INS", 2)
            .row(DataRow::new(1, 58000.0, &[1, 2], &[0.1]))
            .build();
        assert!(wrong_width.is_err());
        let wrong_stations = DataTableBuilder::new(TableKind::T3, "INS", 1)
            .row(DataRow::new(1, 58000.0, &[1, 2], &[0.1]))
            .build();
        assert!(wrong_stations.is_err());
        assert!(DataTableBuilder::new(TableKind::Array, "INS", 1).build().is_err());
    }
}
