//! Coarse per-table selector evaluation.
//!
//! Answers "can this data table contain selected data?" from table-level
//! summaries only: target ids, nights, station tuples and column ranges. Used
//! by the merger as an accept/reject gate; the engine refines with filters.

use std::collections::BTreeSet;

use oisel_core::model::{designates_ins_mode, DataTable, TargetManager};
use oisel_core::range::{self, Range};
use oisel_core::schema::columns;

use crate::selector::Selector;

pub struct SelectorMatcher<'a> {
    selector: &'a Selector,
    targets: &'a TargetManager,
}

impl<'a> SelectorMatcher<'a> {
    pub fn new(selector: &'a Selector, targets: &'a TargetManager) -> Self {
        Self { selector, targets }
    }

    /// Every criterion set on the selector may hold for some row of `table`.
    pub fn matches(&self, table: &dyn DataTable) -> bool {
        let s = self.selector;
        if !s.accepts_extension(table.file_path(), table.ext_nb()) {
            return false;
        }
        if let Some(uid) = &s.target_uid {
            let hit = table
                .target_id_matcher(self.targets, uid)
                .is_some_and(|m| m.match_any(table.distinct_target_id()));
            if !hit {
                return false;
            }
        }
        if let Some(name) = &s.ins_mode_uid {
            let hit = table
                .ins_name()
                .is_some_and(|ins| designates_ins_mode(name, ins, table.nb_channels()));
            if !hit {
                return false;
            }
        }
        if let Some(night) = s.night_id {
            if !table.distinct_night_id().contains(&night) {
                return false;
            }
        }
        if let Some(names) = &s.baselines {
            let mut found = BTreeSet::new();
            table.matching_sta_indexes(names, &mut found);
            if found.is_empty() {
                return false;
            }
        }
        if let Some(ranges) = &s.mjd_ranges {
            if !overlaps(ranges, table.column_range(columns::MJD)) {
                return false;
            }
        }
        if let Some(ranges) = &s.wavelength_ranges {
            if !overlaps(ranges, table.column_range(columns::EFF_WAVE)) {
                return false;
            }
        }
        s.column_filters.iter().all(|f| {
            let summary = table.column_range(&f.column);
            if f.include {
                overlaps(&f.ranges, summary)
            } else {
                !summary.is_finite() || !range::cover_fully(&f.ranges, &summary)
            }
        })
    }
}

/// A non-finite summary cannot reject the table.
fn overlaps(ranges: &[Range], summary: Range) -> bool {
    !summary.is_finite() || range::overlap_any(ranges, &summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use oisel_core::model::{DataRow, DataTableBuilder, NightId, OiFile, OiTable};
    use oisel_core::schema::{OiStandard, TableKind};

    fn file() -> OiFile {
        let mut f = OiFile::new("m.fits", OiStandard::V2);
        f.add_table(OiTable::target(&[(1, "HD 1")]).unwrap());
        f.add_table(OiTable::array("VLTI", &[(1, "A0"), (2, "K0")]).unwrap());
        f.add_table(OiTable::wavelength("PIONIER", &[1.6e-6, 1.7e-6]).unwrap());
        f.add_table(
            DataTableBuilder::new(TableKind::Vis2, "PIONIER", 2)
                .arr_name("VLTI")
                .row(DataRow::new(1, 58000.7, &[1, 2], &[0.2, 0.3]))
                .build()
                .unwrap(),
        );
        f
    }

    fn check(selector: &Selector) -> bool {
        let f = file();
        let (id, _) = f.data_tables().next().unwrap();
        let view = f.view(id).unwrap();
        let targets = TargetManager::new();
        SelectorMatcher::new(selector, &targets).matches(&view)
    }

    #[test]
    fn test_empty_selector_matches() {
        assert!(check(&Selector::new()));
    }

    #[test]
    fn test_each_criterion() {
        assert!(check(&Selector::new().with_target("hd_1")));
        assert!(!check(&Selector::new().with_target("HD 2")));
        assert!(check(&Selector::new().with_ins_mode("pionier")));
        assert!(!check(&Selector::new().with_ins_mode("GRAVITY")));
        assert!(check(&Selector::new().with_ins_mode("PIONIER_2")));
        assert!(!check(&Selector::new().with_ins_mode("PIONIER_3")));
        assert!(check(&Selector::new().with_night(NightId(58000))));
        assert!(!check(&Selector::new().with_night(NightId(58001))));
        assert!(check(&Selector::new().with_baselines(vec!["K0-A0".into()])));
        assert!(!check(&Selector::new().with_baselines(vec!["A0-G1".into()])));
        assert!(check(&Selector::new().with_mjd_ranges(vec![Range::new(58000.0, 58001.0)])));
        assert!(!check(&Selector::new().with_mjd_ranges(vec![Range::new(1.0, 2.0)])));
        assert!(check(&Selector::new().with_wavelength_ranges(vec![Range::new(1.65e-6, 2.0e-6)])));
        assert!(!check(&Selector::new().with_wavelength_ranges(vec![Range::new(2.0e-6, 2.5e-6)])));
    }

    #[test]
    fn test_column_filters() {
        let inc = Selector::new().with_column_filter(columns::VIS2DATA, vec![Range::new(0.25, 1.0)], true);
        assert!(check(&inc));
        let exc = Selector::new().with_column_filter(columns::VIS2DATA, vec![Range::new(0.0, 1.0)], false);
        assert!(!check(&exc));
        // unknown column: nothing to reject on
        let unknown = Selector::new().with_column_filter("NOPE", vec![Range::new(0.0, 1.0)], true);
        assert!(check(&unknown));
    }

    #[test]
    fn test_extension_gate() {
        let mut s = Selector::new();
        s.add_extensions("m.fits", &[4]);
        assert!(check(&s));
        let mut s = Selector::new();
        s.add_extensions("m.fits", &[3]);
        assert!(!check(&s));
    }
}
