//! Night filter on the derived NIGHT_ID column.

use std::collections::BTreeSet;
use std::sync::Arc;

use oisel_core::model::{DataTable, NightId};
use oisel_core::schema::columns;

use crate::traits::{FilterSpec, FilterState, TableFilter};

#[derive(Debug, Clone)]
pub struct NightIdFilter {
    spec: FilterSpec<NightId>,
    matching: BTreeSet<NightId>,
    nights: Option<Arc<[NightId]>>,
}

impl NightIdFilter {
    pub fn new(nights: Vec<NightId>, include: bool) -> Self {
        Self {
            spec: FilterSpec::new(columns::NIGHT_ID, nights, include),
            matching: BTreeSet::new(),
            nights: None,
        }
    }
}

impl TableFilter for NightIdFilter {
    fn name(&self) -> &'static str {
        "night_id"
    }

    fn column_name(&self) -> &str {
        &self.spec.column
    }

    fn is_include(&self) -> bool {
        self.spec.include
    }

    fn prepare(&mut self, table: &dyn DataTable) -> FilterState {
        let distinct = table.distinct_night_id();
        if distinct.is_empty() {
            tracing::warn!(table = %table.table_ref(), "no MJD to derive nights, filter ignored");
            return FilterState::Full;
        }
        let matching: BTreeSet<NightId> = self
            .spec
            .values
            .iter()
            .filter(|n| distinct.contains(n))
            .copied()
            .collect();
        if matching.is_empty() {
            return FilterState::none_match(self.spec.include);
        }
        // a single night that matched, or every night of the table matched
        if table.has_single_night() || matching.len() == distinct.len() {
            return FilterState::all_match(self.spec.include);
        }
        match table.night_id() {
            Some(nights) => {
                self.matching = matching;
                self.nights = Some(nights);
                FilterState::Mask
            }
            None => FilterState::Full,
        }
    }

    #[inline]
    fn accept(&self, row: usize, _col: usize) -> bool {
        match self.nights.as_ref().and_then(|n| n.get(row)) {
            Some(night) => self.matching.contains(night) == self.spec.include,
            None => false,
        }
    }

    fn reset(&mut self) {
        self.matching.clear();
        self.nights = None;
    }
}
