//! Three-state filter protocol over real tables: coarse verdicts, masks and
//! state isolation between tables.

mod test_data_gen;

use std::sync::Arc;

use oisel_core::model::{DataTable, NightId, OiFile, TargetManager};
use oisel_core::range::Range;
use oisel_core::schema::columns;
use oisel_filters::{
    Double1DFilter, Double2DFilter, FilterState, NightIdFilter, StationFilter, TableFilter,
    TargetUidFilter,
};
use test_data_gen::{first_data_table, observation};

/// Prepare verdict and per-cell answers of `filter` over `table`.
fn run(filter: &mut dyn TableFilter, table: &dyn DataTable) -> (FilterState, Vec<bool>) {
    let state = filter.prepare(table);
    let mut answers = Vec::new();
    if state == FilterState::Mask {
        let width = if filter.is_2d() { table.nb_channels() } else { 1 };
        for row in 0..table.nb_rows() {
            for col in 0..width {
                answers.push(filter.accept(row, col));
            }
        }
    }
    (state, answers)
}

fn file_a() -> OiFile {
    observation("a.fits", "HD 1", "PIONIER", 58000.7, 1)
}

fn file_b() -> OiFile {
    observation("b.fits", "HD 1", "PIONIER", 58010.7, 1)
}

#[test]
fn test_double_1d_no_overlap_is_invalid_for_both_polarities() {
    let f = file_a();
    let view = f.view(first_data_table(&f)).unwrap();
    let far = vec![Range::new(1.0, 2.0)];
    let mut include = Double1DFilter::new(columns::MJD, far.clone(), true);
    let mut exclude = Double1DFilter::new(columns::MJD, far, false);
    assert_eq!(include.prepare(&view), FilterState::Invalid);
    assert_eq!(exclude.prepare(&view), FilterState::Invalid);
}

#[test]
fn test_double_2d_no_overlap_depends_on_polarity() {
    let f = file_a();
    let view = f.view(first_data_table(&f)).unwrap();
    let far = vec![Range::new(5.0, 6.0)];
    let mut include = Double2DFilter::new(columns::VIS2DATA, far.clone(), true);
    let mut exclude = Double2DFilter::new(columns::VIS2DATA, far, false);
    assert_eq!(include.prepare(&view), FilterState::Invalid);
    assert_eq!(exclude.prepare(&view), FilterState::Full);
}

#[test]
fn test_full_coverage_depends_on_polarity() {
    let f = file_a();
    let view = f.view(first_data_table(&f)).unwrap();
    let all = vec![Range::new(0.0, 1.0)];
    let mut include = Double2DFilter::new(columns::VIS2DATA, all.clone(), true);
    let mut exclude = Double2DFilter::new(columns::VIS2DATA, all, false);
    assert_eq!(include.prepare(&view), FilterState::Full);
    assert_eq!(exclude.prepare(&view), FilterState::Invalid);
}

#[test]
fn test_missing_column_fails_open() {
    let f = file_a();
    let view = f.view(first_data_table(&f)).unwrap();
    let mut filter = Double1DFilter::new("NO_SUCH_COLUMN", vec![Range::new(0.0, 1.0)], true);
    assert_eq!(filter.prepare(&view), FilterState::Full);
}

const NB_KINDS: usize = 5;

fn make_filter(kind: usize, targets: &Arc<TargetManager>) -> Box<dyn TableFilter> {
    match kind {
        0 => Box::new(Double1DFilter::new(
            columns::MJD,
            vec![Range::new(58000.705, 58000.715), Range::new(58010.0, 58010.705)],
            true,
        )),
        1 => Box::new(Double2DFilter::new(columns::VIS2DATA, vec![Range::new(0.25, 0.65)], true)),
        2 => Box::new(NightIdFilter::new(vec![NightId(58000)], false)),
        3 => Box::new(StationFilter::sta_index(vec!["A0-K0".into(), "K0-G1".into()], true)),
        _ => Box::new(TargetUidFilter::new(targets.clone(), "HD 1", true)),
    }
}

#[test]
fn test_reset_matches_fresh_instance() {
    let a = file_a();
    let b = file_b();
    let view_a = a.view(first_data_table(&a)).unwrap();
    let view_b = b.view(first_data_table(&b)).unwrap();

    let targets = Arc::new({
        let mut m = TargetManager::new();
        m.register("HD 1");
        m
    });

    for kind in 0..NB_KINDS {
        let mut reused = make_filter(kind, &targets);
        let _ = run(reused.as_mut(), &view_a);
        reused.reset();
        let after_reset = run(reused.as_mut(), &view_b);

        let mut fresh = make_filter(kind, &targets);
        let isolated = run(fresh.as_mut(), &view_b);
        assert_eq!(after_reset, isolated, "{}", fresh.describe());
    }
}

#[test]
fn test_mask_answers_follow_rows() {
    let f = file_a();
    let view = f.view(first_data_table(&f)).unwrap();
    // rows at 58000.70, 58000.71, 58000.72
    let mut filter = Double1DFilter::new(columns::MJD, vec![Range::new(58000.705, 58000.715)], true);
    let (state, answers) = run(&mut filter, &view);
    assert_eq!(state, FilterState::Mask);
    assert_eq!(answers, vec![false, true, false]);

    let mut stations = StationFilter::sta_index(vec!["G1-K0".into()], true);
    let (state, answers) = run(&mut stations, &view);
    assert_eq!(state, FilterState::Mask);
    assert_eq!(answers, vec![false, true, false]);
}
