//! Pooled range factory.
//!
//! Lists handed back through `dispose_list` are cleared and kept for the next
//! `create_list`, up to `max_retained`. Ranges themselves are `Copy` values
//! and are only counted.

use oisel_core::config::EngineConfig;
use oisel_core::factory::{FactoryStats, RangeFactory};
use oisel_core::range::Range;

use crate::error::{Error, Result};
use crate::tracking::PeakTracker;

#[derive(Debug)]
pub struct PooledRangeFactory {
    free: Vec<Vec<Range>>,
    list_capacity: usize,
    max_retained: usize,
    tracker: PeakTracker,
    stats: FactoryStats,
}

impl PooledRangeFactory {
    pub fn new(list_capacity: usize, max_retained: usize) -> Self {
        Self {
            free: Vec::new(),
            list_capacity,
            max_retained,
            tracker: PeakTracker::new(),
            stats: FactoryStats::default(),
        }
    }

    pub fn from_config(cfg: &EngineConfig) -> Result<Self> {
        cfg.validate()?;
        if cfg.range_list_capacity == 0 && cfg.range_pool_max_retained > 0 {
            return Err(Error::Config(
                "range_list_capacity must be > 0 when lists are pooled".into(),
            ));
        }
        Ok(Self::new(cfg.range_list_capacity, cfg.range_pool_max_retained))
    }

    /// Lists currently waiting for reuse.
    pub fn retained(&self) -> usize {
        self.free.len()
    }

    /// Lists handed out and not returned.
    pub fn outstanding(&self) -> usize {
        self.tracker.current()
    }
}

impl RangeFactory for PooledRangeFactory {
    fn create(&mut self, min: f64, max: f64) -> Range {
        self.stats.ranges_created += 1;
        Range::new(min, max)
    }

    fn create_list(&mut self) -> Vec<Range> {
        self.tracker.acquire();
        match self.free.pop() {
            Some(list) => {
                self.stats.lists_reused += 1;
                list
            }
            None => {
                self.stats.lists_created += 1;
                Vec::with_capacity(self.list_capacity)
            }
        }
    }

    fn dispose_list(&mut self, mut list: Vec<Range>) {
        self.tracker.release();
        self.stats.lists_returned += 1;
        if self.free.len() < self.max_retained {
            list.clear();
            self.free.push(list);
        }
    }

    fn reset(&mut self) {
        #[cfg(feature = "tracing")]
        tracing::debug!(
            peak = self.tracker.peak(),
            created = self.stats.lists_created,
            reused = self.stats.lists_reused,
            "range pool reset"
        );
        self.free.truncate(self.max_retained);
        self.tracker.reset();
        self.stats = FactoryStats::default();
    }

    fn stats(&self) -> FactoryStats {
        FactoryStats {
            peak_outstanding: self.tracker.peak() as u64,
            ..self.stats
        }
    }
}
