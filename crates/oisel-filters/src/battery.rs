//! Filter batteries: several filters evaluated together over one table.
//!
//! `prepare` runs on every filter first; any `Invalid` short-circuits the
//! table, and when every filter says `Full` no mask is built at all. Only
//! filters in `Mask` state are asked per row (or cell).

use std::collections::BTreeSet;

use oisel_core::mask::{IndexMask, MaskBuilder};
use oisel_core::model::DataTable;

use crate::traits::{reset_filters, FilterState, TableFilter};

/// Outcome of a battery over one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatteryVerdict {
    /// Nothing passes.
    Invalid,
    /// Everything passes.
    Full,
    /// Partial acceptance; never `IndexMask::Full` nor `IndexMask::None`.
    Mask(IndexMask),
}

impl BatteryVerdict {
    fn from_mask(mask: IndexMask) -> Self {
        match mask {
            IndexMask::Full => BatteryVerdict::Full,
            IndexMask::None => BatteryVerdict::Invalid,
            m => BatteryVerdict::Mask(m),
        }
    }

    pub fn is_invalid(&self) -> bool {
        matches!(self, BatteryVerdict::Invalid)
    }

    pub fn mask(&self) -> Option<&IndexMask> {
        match self {
            BatteryVerdict::Mask(m) => Some(m),
            _ => None,
        }
    }
}

#[derive(Default)]
pub struct FilterBattery {
    filters: Vec<Box<dyn TableFilter>>,
    triggered: BTreeSet<String>,
}

impl FilterBattery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, filter: Box<dyn TableFilter>) {
        self.filters.push(filter);
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn filters(&self) -> &[Box<dyn TableFilter>] {
        &self.filters
    }

    /// Filters that returned a non-`Full` state at least once.
    pub fn triggered(&self) -> &BTreeSet<String> {
        &self.triggered
    }

    /// Prepare every filter; `None` when one of them invalidates the table,
    /// otherwise the indexes of filters needing a per-row pass.
    fn prepare_all(&mut self, table: &dyn DataTable) -> Option<Vec<usize>> {
        let mut masking = Vec::new();
        for (i, f) in self.filters.iter_mut().enumerate() {
            let state = f.prepare(table);
            tracing::trace!(table = %table.table_ref(), filter = %f.describe(), ?state, "prepare");
            if state != FilterState::Full {
                self.triggered.insert(f.describe());
            }
            match state {
                FilterState::Invalid => return None,
                FilterState::Mask => masking.push(i),
                FilterState::Full => {}
            }
        }
        Some(masking)
    }

    /// Row mask over `table` from 1D filters.
    pub fn evaluate_rows(&mut self, table: &dyn DataTable) -> BatteryVerdict {
        let verdict = match self.prepare_all(table) {
            None => BatteryVerdict::Invalid,
            Some(masking) if masking.is_empty() => BatteryVerdict::Full,
            Some(masking) => {
                let mut builder = MaskBuilder::rows(table.nb_rows());
                for row in 0..table.nb_rows() {
                    if masking.iter().all(|&i| self.filters[i].accept(row, 0)) {
                        builder.accept_row(row);
                    }
                }
                BatteryVerdict::from_mask(builder.build())
            }
        };
        reset_filters(&mut self.filters);
        verdict
    }

    /// Row×channel mask over a data table.
    ///
    /// A cell passes when its row passes `rows`, its channel passes
    /// `channels`, every 2D filter accepts it and, with `skip_flagged`, its
    /// FLAG is not set.
    pub fn evaluate_cells(
        &mut self,
        table: &dyn DataTable,
        rows: Option<&IndexMask>,
        channels: Option<&IndexMask>,
        skip_flagged: bool,
    ) -> BatteryVerdict {
        let nb_rows = table.nb_rows();
        let nb_channels = table.nb_channels();
        let masking = match self.prepare_all(table) {
            None => {
                reset_filters(&mut self.filters);
                return BatteryVerdict::Invalid;
            }
            Some(m) => m,
        };
        let flags = if skip_flagged { table.flag() } else { None };
        let row_mask = rows.filter(|m| !m.is_full());
        let channel_mask = channels.filter(|m| !m.is_full());

        let verdict = if masking.is_empty()
            && flags.is_none()
            && row_mask.is_none()
            && channel_mask.is_none()
        {
            BatteryVerdict::Full
        } else if nb_channels == 0 {
            // no cell to test: only the row mask can still drop rows
            row_mask.cloned().map_or(BatteryVerdict::Full, BatteryVerdict::from_mask)
        } else {
            let mut builder = MaskBuilder::cells(nb_rows, nb_channels);
            for row in 0..nb_rows {
                if row_mask.is_some_and(|m| !m.accept(row)) {
                    continue;
                }
                for col in 0..nb_channels {
                    if channel_mask.is_some_and(|m| !m.accept(col)) {
                        continue;
                    }
                    if flags
                        .as_ref()
                        .is_some_and(|f| f.get(row, col).copied().unwrap_or(false))
                    {
                        continue;
                    }
                    if masking.iter().all(|&i| self.filters[i].accept(row, col)) {
                        builder.accept_cell(row, col);
                    }
                }
            }
            BatteryVerdict::from_mask(builder.build())
        };
        reset_filters(&mut self.filters);
        verdict
    }
}

impl std::fmt::Debug for FilterBattery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<String> = self.filters.iter().map(|x| x.describe()).collect();
        f.debug_struct("FilterBattery")
            .field("filters", &names)
            .field("triggered", &self.triggered)
            .finish()
    }
}
