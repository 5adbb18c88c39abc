//! Per-pass counters as tracing events.
//!
//! Selection and merge passes report a handful of key/value counters under
//! one TRACE span; subscribers decide whether they become metrics.

use std::time::{SystemTime, UNIX_EPOCH};

pub fn emit_span(event: &str, key_values: &[(&str, String)]) {
    let span = tracing::span!(tracing::Level::TRACE, "oisel", event);
    let _entered = span.enter();
    for (k, v) in key_values {
        tracing::trace!(%event, %k, %v, "metric");
    }
}

/// Milliseconds since Unix epoch (UTC); 0 if the clock is before 1970.
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
