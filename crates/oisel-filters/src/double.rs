//! Numeric range filters over scalar (per row) or per-channel columns.

use std::sync::Arc;

use oisel_core::model::DataTable;
use oisel_core::range::{self, Range};
use oisel_core::types::Array2;

use crate::traits::{FilterSpec, FilterState, TableFilter};

/// Accepted ranges, sorted and merged so that coverage tests see adjacent
/// ranges as one. NaN bounds are kept: they leave that side open.
fn normalized(mut ranges: Vec<Range>) -> Vec<Range> {
    range::sort(&mut ranges);
    range::union(&mut ranges);
    ranges
}

enum Coarse {
    /// No accepted range overlaps the column summary.
    NoOverlap,
    /// One accepted range contains the whole column summary.
    Covered,
    NeedsMask(Vec<Range>),
}

/// Table-level check shared by both filters, from the coarse column summary
/// alone. `Err` carries an unusable (non-finite) summary.
fn coarse(spec: &FilterSpec<Range>, table: &dyn DataTable) -> Result<Coarse, Range> {
    let summary = table.column_range(&spec.column);
    if !summary.is_finite() {
        return Err(summary);
    }
    let matching: Vec<Range> = spec
        .values
        .iter()
        .filter(|r| r.overlap(&summary))
        .copied()
        .collect();
    if matching.is_empty() {
        return Ok(Coarse::NoOverlap);
    }
    if range::cover_fully(&matching, &summary) {
        return Ok(Coarse::Covered);
    }
    Ok(Coarse::NeedsMask(matching))
}

/// Range filter on a per-row column (MJD, BASELINE, NIGHT_ID...).
///
/// When no accepted range overlaps the table, the verdict is `Invalid`
/// whatever the polarity: an exclude filter drops such a table too.
/// [`Double2DFilter`] answers `Full` in that case.
#[derive(Debug, Clone)]
pub struct Double1DFilter {
    spec: FilterSpec<Range>,
    matching: Vec<Range>,
    column: Option<Arc<[f64]>>,
}

impl Double1DFilter {
    pub fn new(column: impl Into<String>, ranges: Vec<Range>, include: bool) -> Self {
        Self {
            spec: FilterSpec::new(column, normalized(ranges), include),
            matching: Vec::new(),
            column: None,
        }
    }

    pub fn spec(&self) -> &FilterSpec<Range> {
        &self.spec
    }
}

impl TableFilter for Double1DFilter {
    fn name(&self) -> &'static str {
        "double_1d"
    }

    fn column_name(&self) -> &str {
        &self.spec.column
    }

    fn is_include(&self) -> bool {
        self.spec.include
    }

    fn prepare(&mut self, table: &dyn DataTable) -> FilterState {
        let matching = match coarse(&self.spec, table) {
            Err(summary) => {
                tracing::warn!(
                    table = %table.table_ref(),
                    column = %self.spec.column,
                    %summary,
                    "no usable range for column, filter ignored"
                );
                return FilterState::Full;
            }
            Ok(Coarse::NoOverlap) => return FilterState::Invalid,
            Ok(Coarse::Covered) => return FilterState::all_match(self.spec.include),
            Ok(Coarse::NeedsMask(m)) => m,
        };
        match table.column_f64(&self.spec.column) {
            Some(col) => {
                self.matching = matching;
                self.column = Some(col);
                FilterState::Mask
            }
            None => {
                tracing::warn!(table = %table.table_ref(), column = %self.spec.column, "column missing, filter ignored");
                FilterState::Full
            }
        }
    }

    #[inline]
    fn accept(&self, row: usize, _col: usize) -> bool {
        let Some(col) = &self.column else {
            return false;
        };
        match col.get(row) {
            Some(v) => range::contains(&self.matching, *v) == self.spec.include,
            None => false,
        }
    }

    fn reset(&mut self) {
        self.matching.clear();
        self.column = None;
    }
}

/// Range filter on a row×channel column (VIS2DATA, SPATIAL_FREQ...).
#[derive(Debug, Clone)]
pub struct Double2DFilter {
    spec: FilterSpec<Range>,
    matching: Vec<Range>,
    column: Option<Arc<Array2<f64>>>,
}

impl Double2DFilter {
    pub fn new(column: impl Into<String>, ranges: Vec<Range>, include: bool) -> Self {
        Self {
            spec: FilterSpec::new(column, normalized(ranges), include),
            matching: Vec::new(),
            column: None,
        }
    }

    pub fn spec(&self) -> &FilterSpec<Range> {
        &self.spec
    }
}

impl TableFilter for Double2DFilter {
    fn name(&self) -> &'static str {
        "double_2d"
    }

    fn column_name(&self) -> &str {
        &self.spec.column
    }

    fn is_include(&self) -> bool {
        self.spec.include
    }

    fn is_2d(&self) -> bool {
        true
    }

    fn prepare(&mut self, table: &dyn DataTable) -> FilterState {
        let matching = match coarse(&self.spec, table) {
            Err(summary) => {
                tracing::warn!(
                    table = %table.table_ref(),
                    column = %self.spec.column,
                    %summary,
                    "no usable range for column, filter ignored"
                );
                return FilterState::Full;
            }
            Ok(Coarse::NoOverlap) => return FilterState::none_match(self.spec.include),
            Ok(Coarse::Covered) => return FilterState::all_match(self.spec.include),
            Ok(Coarse::NeedsMask(m)) => m,
        };
        match table.column_f64_2d(&self.spec.column) {
            Some(col) => {
                self.matching = matching;
                self.column = Some(col);
                FilterState::Mask
            }
            None => {
                tracing::warn!(table = %table.table_ref(), column = %self.spec.column, "column missing, filter ignored");
                FilterState::Full
            }
        }
    }

    #[inline]
    fn accept(&self, row: usize, col: usize) -> bool {
        let Some(data) = &self.column else {
            return false;
        };
        match data.get(row, col) {
            Some(v) => range::contains(&self.matching, *v) == self.spec.include,
            None => false,
        }
    }

    fn reset(&mut self) {
        self.matching.clear();
        self.column = None;
    }
}
