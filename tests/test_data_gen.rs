//! Synthetic OIFITS files shared by the integration tests.

#![allow(dead_code)]

use oisel_core::id::TableId;
use oisel_core::model::{DataRow, DataTableBuilder, OiFile, OiTable};
use oisel_core::schema::{OiStandard, TableKind};

/// Channels of the synthetic OI_WAVELENGTH tables (H band).
pub const H_BAND: [f64; 4] = [1.55e-6, 1.60e-6, 1.65e-6, 1.70e-6];

/// A file observing `target` with instrument `ins`: one OI_TARGET row
/// (TARGET_ID 1), OI_ARRAY "VLTI" (A0=1, K0=2, G1=3), OI_WAVELENGTH over
/// [`H_BAND`] and `nb_tables` OI_VIS2 tables of three rows each, on nights
/// starting at `first_mjd`, one night per table.
pub fn observation(path: &str, target: &str, ins: &str, first_mjd: f64, nb_tables: usize) -> OiFile {
    let mut f = OiFile::new(path, OiStandard::V2);
    f.add_table(OiTable::target(&[(1, target)]).expect("target table"));
    f.add_table(OiTable::array("VLTI", &[(1, "A0"), (2, "K0"), (3, "G1")]).expect("array table"));
    f.add_table(OiTable::wavelength(ins, &H_BAND).expect("wavelength table"));
    for i in 0..nb_tables {
        let mjd = first_mjd + i as f64;
        f.add_table(vis2_table(ins, mjd));
    }
    f
}

/// OI_VIS2 with rows on baselines A0-K0, K0-G1, A0-G1 at `mjd`, +0.01, +0.02.
pub fn vis2_table(ins: &str, mjd: f64) -> OiTable {
    DataTableBuilder::new(TableKind::Vis2, ins, H_BAND.len())
        .arr_name("VLTI")
        .row(DataRow::new(1, mjd, &[1, 2], &[0.9, 0.8, 0.7, 0.6]).with_uv(30.0, 40.0))
        .row(DataRow::new(1, mjd + 0.01, &[2, 3], &[0.5, 0.4, 0.3, 0.2]).with_uv(60.0, 80.0))
        .row(
            DataRow::new(1, mjd + 0.02, &[1, 3], &[0.1, 0.2, 0.3, 0.4])
                .with_uv(90.0, 120.0)
                .with_flags(&[true, false, false, false]),
        )
        .build()
        .expect("vis2 table")
}

/// First data table of `file`.
pub fn first_data_table(file: &OiFile) -> TableId {
    file.data_tables()
        .next()
        .map(|(id, _)| id)
        .expect("file has a data table")
}
