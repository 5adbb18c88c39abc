//! Lightweight peak tracking hooks.
//!
//! Keep this optional and cheap. Downstream can wire to OpenTelemetry/Prom if desired.

use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Debug, Default)]
pub struct PeakTracker {
    current: AtomicUsize,
    peak: AtomicUsize,
}

impl PeakTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// One more item handed out; updates peak if higher.
    pub fn acquire(&self) {
        let used = self.current.fetch_add(1, Ordering::AcqRel) + 1;
        self.record_used(used);
    }

    /// One item handed back. Releasing more than was acquired saturates at 0.
    pub fn release(&self) {
        let _ = self
            .current
            .fetch_update(Ordering::AcqRel, Ordering::Relaxed, |c| Some(c.saturating_sub(1)));
    }

    /// Record a new "in use" value; updates peak if higher.
    pub fn record_used(&self, used: usize) {
        let mut cur = self.peak.load(Ordering::Relaxed);
        while used > cur {
            match self
                .peak
                .compare_exchange(cur, used, Ordering::AcqRel, Ordering::Relaxed)
            {
                Ok(_) => break,
                Err(observed) => cur = observed,
            }
        }
        #[cfg(feature = "tracing")]
        tracing::trace!(used, peak = self.peak.load(Ordering::Relaxed), "range lists in use");
    }

    pub fn current(&self) -> usize {
        self.current.load(Ordering::Relaxed)
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::Relaxed)
    }

    pub fn reset(&self) {
        self.current.store(0, Ordering::Relaxed);
        self.peak.store(0, Ordering::Relaxed);
    }
}
