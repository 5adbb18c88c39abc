//! Range allocation interface.
//!
//! Hot per-row loops and the sweep-line intersection obtain their output
//! ranges and range lists from a `RangeFactory`. The pooled implementation
//! lives in `oisel-mem`; `StandardRangeFactory` simply allocates.
//!
//! A factory is created per query/merge pass, `reset()` between independent
//! passes and dropped at pass end. It is not synchronized: concurrent queries
//! need their own instance.

use serde::{Deserialize, Serialize};

use crate::range::Range;

/// Allocation counters reported by a factory.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactoryStats {
    pub ranges_created: u64,
    pub lists_created: u64,
    pub lists_reused: u64,
    pub lists_returned: u64,
    /// Highest number of lists handed out and not yet returned.
    pub peak_outstanding: u64,
}

pub trait RangeFactory {
    /// A range value. Ranges are `Copy`, so this only counts.
    fn create(&mut self, min: f64, max: f64) -> Range;

    /// An empty list, possibly recycled.
    fn create_list(&mut self) -> Vec<Range>;

    /// Hand a list back for reuse. Default drops it.
    fn dispose_list(&mut self, list: Vec<Range>) {
        drop(list);
    }

    /// Start a new pass: clears counters (pooled lists may be kept).
    fn reset(&mut self);

    fn stats(&self) -> FactoryStats;
}

/// Non-pooling factory.
#[derive(Debug, Default)]
pub struct StandardRangeFactory {
    stats: FactoryStats,
}

impl RangeFactory for StandardRangeFactory {
    fn create(&mut self, min: f64, max: f64) -> Range {
        self.stats.ranges_created += 1;
        Range::new(min, max)
    }

    fn create_list(&mut self) -> Vec<Range> {
        self.stats.lists_created += 1;
        Vec::new()
    }

    fn reset(&mut self) {
        self.stats = FactoryStats::default();
    }

    fn stats(&self) -> FactoryStats {
        self.stats
    }
}
