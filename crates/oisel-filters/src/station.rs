//! Station filters: baselines (STA_INDEX) and station configurations (STA_CONF).
//!
//! Accepted values are station-name strings ("A0-K0"); they are resolved per
//! table against its OI_ARRAY, so the same filter works across arrays.

use std::collections::BTreeSet;
use std::sync::Arc;

use oisel_core::model::DataTable;
use oisel_core::schema::columns;
use oisel_core::types::StaTuple;

use crate::traits::{FilterSpec, FilterState, TableFilter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StationColumn {
    /// Stations of each measurement.
    Index,
    /// Stations observing simultaneously with each measurement.
    Conf,
}

#[derive(Debug, Clone)]
pub struct StationFilter {
    spec: FilterSpec<String>,
    kind: StationColumn,
    matching: BTreeSet<StaTuple>,
    tuples: Option<Arc<[StaTuple]>>,
}

impl StationFilter {
    pub fn sta_index(names: Vec<String>, include: bool) -> Self {
        Self::new(StationColumn::Index, names, include)
    }

    pub fn sta_conf(names: Vec<String>, include: bool) -> Self {
        Self::new(StationColumn::Conf, names, include)
    }

    fn new(kind: StationColumn, names: Vec<String>, include: bool) -> Self {
        let column = match kind {
            StationColumn::Index => columns::STA_INDEX,
            StationColumn::Conf => columns::STA_CONF,
        };
        Self {
            spec: FilterSpec::new(column, names, include),
            kind,
            matching: BTreeSet::new(),
            tuples: None,
        }
    }

    pub fn kind(&self) -> StationColumn {
        self.kind
    }
}

impl TableFilter for StationFilter {
    fn name(&self) -> &'static str {
        match self.kind {
            StationColumn::Index => "sta_index",
            StationColumn::Conf => "sta_conf",
        }
    }

    fn column_name(&self) -> &str {
        &self.spec.column
    }

    fn is_include(&self) -> bool {
        self.spec.include
    }

    fn prepare(&mut self, table: &dyn DataTable) -> FilterState {
        let mut matching = BTreeSet::new();
        let nb_distinct = match self.kind {
            StationColumn::Index => {
                table.matching_sta_indexes(&self.spec.values, &mut matching);
                table.distinct_sta_index().len()
            }
            StationColumn::Conf => {
                table.matching_sta_confs(&self.spec.values, &mut matching);
                table.distinct_sta_conf().len()
            }
        };
        if nb_distinct == 0 {
            tracing::warn!(table = %table.table_ref(), column = %self.spec.column, "no station tuples, filter ignored");
            return FilterState::Full;
        }
        if matching.is_empty() {
            return FilterState::none_match(self.spec.include);
        }
        if matching.len() == nb_distinct {
            return FilterState::all_match(self.spec.include);
        }
        match table.sta_tuples(&self.spec.column) {
            Some(tuples) => {
                self.matching = matching;
                self.tuples = Some(tuples);
                FilterState::Mask
            }
            None => FilterState::Full,
        }
    }

    #[inline]
    fn accept(&self, row: usize, _col: usize) -> bool {
        match self.tuples.as_ref().and_then(|t| t.get(row)) {
            Some(tuple) => self.matching.contains(tuple) == self.spec.include,
            None => false,
        }
    }

    fn reset(&mut self) {
        self.matching.clear();
        self.tuples = None;
    }
}
