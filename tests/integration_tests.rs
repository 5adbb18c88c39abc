//! End-to-end selection over a collection.

mod test_data_gen;

use oisel_core::config::EngineConfig;
use oisel_core::model::{NightId, OiFitsCollection};
use oisel_core::range::Range;
use oisel_core::schema::columns;
use oisel_exec::{Engine, Merger};
use oisel_select::{parse_yaml_selector, Selector};
use test_data_gen::observation;

fn collection() -> OiFitsCollection {
    let mut c = OiFitsCollection::new();
    c.add_file(observation("night1.fits", "HD 1", "PIONIER_Pnat", 58000.7, 2));
    c.add_file(observation("night2.fits", "hd_1", "GRAVITY_LR", 58005.7, 1));
    c.add_file(observation("other.fits", "HD 2", "PIONIER_Pnat", 58000.7, 1));
    c
}

fn engine() -> Engine {
    Engine::new(EngineConfig::default()).unwrap()
}

#[test]
fn test_granules_of_collection() {
    let c = collection();
    // HD 1: 2 nights with PIONIER, 1 with GRAVITY; HD 2: 1 night
    assert_eq!(c.granules().len(), 4);
    assert_eq!(c.ins_mode_manager().modes().count(), 2);
}

#[test]
fn test_select_target_by_alias() {
    let c = collection();
    let result = engine()
        .find(&c, Some(&Selector::new().with_target("HD_1")))
        .unwrap();
    assert_eq!(result.table_refs().len(), 3);
    assert_eq!(result.distinct_targets().len(), 1);
    assert_eq!(result.distinct_ins_modes().len(), 2);
    assert_eq!(
        result.distinct_nights(),
        &[NightId(58000), NightId(58001), NightId(58005)]
    );
    let files: Vec<&String> = result.sorted_tables_by_file().keys().collect();
    assert_eq!(files, vec!["night1.fits", "night2.fits"]);
}

#[test]
fn test_yaml_selection_with_masks() {
    let c = collection();
    let yaml = r#"
target: HD 1
ins_mode: pionier_pnat
baselines: [A0-K0, A0-G1]
wavelength: [[1.58e-6, 1.72e-6]]
"#;
    let selector = parse_yaml_selector(yaml).unwrap();
    let result = engine().find(&c, Some(&selector)).unwrap();
    assert_eq!(result.table_refs().len(), 2);

    for tref in result.table_refs() {
        let rows = result.get_data_1d_mask_not_full(*tref).unwrap();
        assert!(rows.accept(0));
        assert!(!rows.accept(1));
        assert!(rows.accept(2));

        let cells = result.get_data_2d_mask_not_full(*tref).unwrap();
        assert!(!cells.accept_cell(0, 0));
        assert!(cells.accept_cell(0, 1));
        assert!(!cells.accept_cell(1, 1));
        assert!(cells.accept_cell(2, 3));
    }
    let triggered = result.triggered_filters();
    assert!(triggered.iter().any(|f| f.starts_with("sta_index")));
    assert!(triggered.iter().any(|f| f.starts_with("double_1d")));
}

#[test]
fn test_skip_flagged_cells() {
    let c = collection();
    let cfg = EngineConfig {
        skip_flagged: true,
        ..EngineConfig::default()
    };
    let mut engine = Engine::new(cfg).unwrap();
    let s = Selector::new().with_target("HD 2");
    let result = engine.find(&c, Some(&s)).unwrap();
    let tref = *result.table_refs().iter().next().unwrap();
    let cells = result.get_data_2d_mask_not_full(tref).unwrap();
    // row 2 has its first channel flagged
    assert!(!cells.accept_cell(2, 0));
    assert!(cells.accept_cell(2, 1));
    assert!(cells.accept_cell(0, 0));
}

#[test]
fn test_two_dimensional_column_filter() {
    let c = collection();
    let s = Selector::new()
        .with_target("HD 2")
        .with_column_filter(columns::VIS2DATA, vec![Range::new(0.0, 0.45)], true);
    let result = engine().find(&c, Some(&s)).unwrap();
    let tref = *result.table_refs().iter().next().unwrap();
    assert!(result.get_data_1d_mask_not_full(tref).is_none());
    let cells = result.get_data_2d_mask_not_full(tref).unwrap();
    assert!(!cells.accept_cell(0, 0));
    assert!(cells.accept_cell(1, 1));
    assert!(cells.accept_cell(2, 3));
}

#[test]
fn test_nothing_matches() {
    let c = collection();
    let s = Selector::new().with_target("HD 1").with_night(NightId(57000));
    assert!(engine().find(&c, Some(&s)).is_none());
}

#[test]
fn test_extension_filter() {
    let c = collection();
    let mut s = Selector::new();
    s.add_extensions("night1.fits", &[5]);
    s.add_extensions("other.fits", &[]);
    let result = engine().find(&c, Some(&s)).unwrap();
    // second OI_VIS2 of night1 plus the whole of other.fits
    assert_eq!(result.table_refs().len(), 2);
}

#[test]
fn test_common_wavelength_of_selection() {
    let c = collection();
    let s = Selector::new()
        .with_target("HD 1")
        .with_wavelength_ranges(vec![Range::new(1.5e-6, 1.62e-6)]);
    let mut engine = engine();
    let result = engine.find(&c, Some(&s)).unwrap();
    let common = engine.common_wavelength_ranges(&result);
    assert_eq!(common, vec![Range::new(1.55e-6, 1.62e-6)]);
    assert!(engine.factory_stats().lists_created >= 1);
}

#[test]
fn test_select_then_merge() {
    let c = collection();
    let s = Selector::new().with_target("HD 1").with_ins_mode("PIONIER_Pnat");
    let result = engine().find(&c, Some(&s)).unwrap();
    let inputs: Vec<_> = result
        .sorted_tables_by_file()
        .values()
        .filter_map(|trefs| trefs.first())
        .filter_map(|tref| c.file(tref.file))
        .collect();
    let merged = Merger::process(Some(&s), None, &inputs).unwrap();
    assert_eq!(merged.file.data_tables().count(), 2);
    assert!(merged.manifest.skipped.is_empty());
}
