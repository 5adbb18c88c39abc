//! Small tables shared by the filter tests.

use oisel_core::id::TableId;
use oisel_core::model::{DataRow, DataTableBuilder, OiFile, OiTable};
use oisel_core::schema::{OiStandard, TableKind};

/// One OI_VIS2 table: target 1, three rows on night 58000, two channels.
///
/// | row | MJD     | STA_INDEX | VIS2DATA   |
/// |-----|---------|-----------|------------|
/// | 0   | 58000.6 | 1-2       | 0.1, 0.2   |
/// | 1   | 58000.7 | 2-3       | 0.3, 0.4   |
/// | 2   | 58000.8 | 1-3       | 0.5, 0.6   |
pub fn vis2_file() -> (OiFile, TableId) {
    let mut f = OiFile::new("sample.fits", OiStandard::V2);
    f.add_table(OiTable::target(&[(1, "HD 1"), (2, "HD 2")]).unwrap());
    f.add_table(OiTable::array("VLTI", &[(1, "A0"), (2, "K0"), (3, "G1")]).unwrap());
    f.add_table(OiTable::wavelength("INS", &[2.0e-6, 2.2e-6]).unwrap());
    let t = DataTableBuilder::new(TableKind::Vis2, "INS", 2)
        .arr_name("VLTI")
        .row(DataRow::new(1, 58000.6, &[1, 2], &[0.1, 0.2]))
        .row(DataRow::new(1, 58000.7, &[2, 3], &[0.3, 0.4]))
        .row(DataRow::new(1, 58000.8, &[1, 3], &[0.5, 0.6]))
        .build()
        .unwrap();
    let id = f.add_table(t);
    (f, id)
}

/// Two targets over two nights, for target and night filters.
///
/// | row | TARGET_ID | MJD     | night |
/// |-----|-----------|---------|-------|
/// | 0   | 1         | 58000.7 | 58000 |
/// | 1   | 2         | 58000.7 | 58000 |
/// | 2   | 1         | 58001.7 | 58001 |
pub fn mixed_file() -> (OiFile, TableId) {
    let mut f = OiFile::new("mixed.fits", OiStandard::V2);
    f.add_table(OiTable::target(&[(1, "HD 1"), (2, "HD 2")]).unwrap());
    f.add_table(OiTable::array("VLTI", &[(1, "A0"), (2, "K0"), (3, "G1")]).unwrap());
    f.add_table(OiTable::wavelength("INS", &[2.0e-6, 2.2e-6]).unwrap());
    let t = DataTableBuilder::new(TableKind::Vis2, "INS", 2)
        .arr_name("VLTI")
        .row(DataRow::new(1, 58000.7, &[1, 2], &[0.1, 0.2]))
        .row(DataRow::new(2, 58000.7, &[1, 2], &[0.3, 0.4]))
        .row(DataRow::new(1, 58001.7, &[1, 2], &[0.5, 0.6]))
        .build()
        .unwrap();
    let id = f.add_table(t);
    (f, id)
}
