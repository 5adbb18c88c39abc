//! Closed real intervals and interval-set algebra.
//!
//! Bounds follow the OIFITS convention of NaN meaning "unbounded on that side"
//! for overlap tests. A collection of ranges is a plain `[Range]` slice; the
//! set operations below (`union`, `restrict_range`, `intersect_ranges`) work on
//! it in place or through a [`RangeFactory`].

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::factory::RangeFactory;

/// Closed interval `[min, max]`.
///
/// Ordering (derived) is lexicographic on `(min, max)`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Range {
    pub min: f64,
    pub max: f64,
}

impl Range {
    /// Absent-summary sentinel: `[+inf, -inf]`, never finite.
    pub const UNDEFINED: Range = Range {
        min: f64::INFINITY,
        max: f64::NEG_INFINITY,
    };

    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Overwrite both bounds (pooled reuse).
    pub fn set(&mut self, min: f64, max: f64) {
        self.min = min;
        self.max = max;
    }

    /// True iff both bounds are finite and `min <= max`.
    pub fn is_finite(&self) -> bool {
        self.min.is_finite() && self.max.is_finite() && self.min <= self.max
    }

    pub fn length(&self) -> f64 {
        self.max - self.min
    }

    pub fn center(&self) -> f64 {
        0.5 * (self.min + self.max)
    }

    /// `value` lies in `[min, max]`. A NaN value is never contained.
    pub fn contains(&self, value: f64) -> bool {
        !value.is_nan() && !(value < self.min) && !(value > self.max)
    }

    /// `value ± err` intersects `[min, max]`.
    pub fn contains_with_err(&self, value: f64, err: f64) -> bool {
        !value.is_nan() && !(value + err < self.min) && !(value - err > self.max)
    }

    /// Both ranges share at least one point (NaN bounds are open-ended).
    pub fn overlap(&self, other: &Range) -> bool {
        overlap(self, other)
    }

    /// `self` contains `other` entirely.
    pub fn overlap_fully(&self, other: &Range) -> bool {
        overlap_fully(self, other)
    }

    /// Grow this range to include `value` (NaN ignored).
    pub fn include(&mut self, value: f64) {
        if value < self.min {
            self.min = value;
        }
        if value > self.max {
            self.max = value;
        }
    }
}

impl Default for Range {
    fn default() -> Self {
        Range::UNDEFINED
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.min, self.max)
    }
}

/// Free-function form of [`Range::is_finite`].
pub fn is_finite(r: &Range) -> bool {
    r.is_finite()
}

/// `a.min <= b.max && a.max >= b.min`, where comparisons against NaN pass.
pub fn overlap(a: &Range, b: &Range) -> bool {
    !(a.min > b.max) && !(a.max < b.min)
}

/// `a` contains `b` entirely (NaN bounds on `a` are open-ended).
pub fn overlap_fully(a: &Range, b: &Range) -> bool {
    !(b.min < a.min) && !(b.max > a.max)
}

/// True if any range of the set contains `value`.
pub fn contains(ranges: &[Range], value: f64) -> bool {
    ranges.iter().any(|r| r.contains(value))
}

/// True if any range of the set overlaps `range`.
pub fn overlap_any(ranges: &[Range], range: &Range) -> bool {
    ranges.iter().any(|r| overlap(r, range))
}

/// True if one range of the set contains `range` entirely.
///
/// Callers that want coverage by adjacent ranges must `union` the set first.
pub fn cover_fully(ranges: &[Range], range: &Range) -> bool {
    ranges.iter().any(|r| overlap_fully(r, range))
}

/// Bounding range of the set (`UNDEFINED` when empty).
pub fn bounds(ranges: &[Range]) -> Range {
    let mut out = Range::UNDEFINED;
    for r in ranges {
        out.include(r.min);
        out.include(r.max);
    }
    out
}

/// Sort ranges by `(min, max)`; NaN bounds sort last.
pub fn sort(ranges: &mut [Range]) {
    ranges.sort_by(|a, b| a.min.total_cmp(&b.min).then(a.max.total_cmp(&b.max)));
}

/// Merge overlapping or touching ranges in place.
///
/// Precondition: `ranges` is sorted by `min` (see [`sort`]). Walks right to
/// left: when a range starts before the end of its predecessor, the
/// predecessor absorbs it and is checked again against its new neighbour.
pub fn union(ranges: &mut Vec<Range>) {
    if ranges.len() < 2 {
        return;
    }
    let mut i = ranges.len() - 1;
    while i > 0 {
        let next = ranges[i];
        let prev = &mut ranges[i - 1];
        if next.min <= prev.max {
            if next.max > prev.max {
                prev.max = next.max;
            }
            ranges.remove(i);
            if i < ranges.len() {
                continue;
            }
        }
        i -= 1;
    }
}

/// Clip every range to `[lo, hi]`; ranges entirely outside are dropped.
pub fn restrict_range(ranges: &mut Vec<Range>, lo: f64, hi: f64) {
    ranges.retain_mut(|r| {
        if r.max < lo || r.min > hi {
            return false;
        }
        if r.min < lo {
            r.min = lo;
        }
        if r.max > hi {
            r.max = hi;
        }
        true
    });
}

/// Start (`+1`) or end (`-1`) event of a source range, used by the sweep.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RangeLimit {
    pub position: f64,
    pub flag: i32,
}

impl RangeLimit {
    pub const START: i32 = 1;
    pub const END: i32 = -1;

    pub const fn new(position: f64, flag: i32) -> Self {
        Self { position, flag }
    }
}

/// Intervals covered by exactly `n_valid` input ranges.
///
/// Builds `2 * len` limit events, sorts them by position and sweeps left to
/// right with a running sum of flags. Between events `i` and `i + 1`, an
/// interval is emitted when the sum after event `i` equals `n_valid` and the
/// positions differ. Points covered by more than `n_valid` ranges are not
/// emitted. Output ranges come from `factory`.
///
/// `n_valid == 0` yields no interval.
pub fn intersect_ranges<F>(ranges: &[Range], n_valid: usize, factory: &mut F) -> Vec<Range>
where
    F: RangeFactory + ?Sized,
{
    let mut out = factory.create_list();
    if n_valid == 0 || ranges.is_empty() {
        return out;
    }

    let mut limits: Vec<RangeLimit> = Vec::with_capacity(ranges.len() * 2);
    for r in ranges {
        limits.push(RangeLimit::new(r.min, RangeLimit::START));
        limits.push(RangeLimit::new(r.max, RangeLimit::END));
    }
    sort_limits(&mut limits);

    let target = n_valid as i64;
    let end = limits.len().saturating_sub(n_valid);
    let mut sum: i64 = 0;

    for i in 0..end {
        sum += i64::from(limits[i].flag);
        let start = limits[i].position;
        let stop = limits[i + 1].position;
        if sum == target && start != stop {
            out.push(factory.create(start, stop));
        }
    }
    out
}

// --- limit sort ---

const INSERTION_CUTOFF: usize = 16;

/// Introspective sort of limit events by position: quicksort with a
/// median-of-3 pivot, insertion sort below 16 elements and a heapsort
/// fallback once recursion gets too deep. Not stable.
pub fn sort_limits(limits: &mut [RangeLimit]) {
    let depth = 2 * (usize::BITS - limits.len().leading_zeros()) as usize;
    intro_sort(limits, depth);
}

fn cmp_limit(a: &RangeLimit, b: &RangeLimit) -> Ordering {
    a.position.total_cmp(&b.position)
}

fn intro_sort(v: &mut [RangeLimit], depth: usize) {
    let len = v.len();
    if len <= INSERTION_CUTOFF {
        insertion_sort(v);
        return;
    }
    if depth == 0 {
        heap_sort(v);
        return;
    }
    let p = partition(v);
    let (lo, hi) = v.split_at_mut(p);
    intro_sort(lo, depth - 1);
    intro_sort(&mut hi[1..], depth - 1);
}

fn insertion_sort(v: &mut [RangeLimit]) {
    for i in 1..v.len() {
        let mut j = i;
        while j > 0 && cmp_limit(&v[j - 1], &v[j]) == Ordering::Greater {
            v.swap(j - 1, j);
            j -= 1;
        }
    }
}

/// Lomuto partition around the median of first/middle/last; returns the
/// pivot's final index.
fn partition(v: &mut [RangeLimit]) -> usize {
    let last = v.len() - 1;
    let mid = last / 2;
    if cmp_limit(&v[mid], &v[0]) == Ordering::Less {
        v.swap(mid, 0);
    }
    if cmp_limit(&v[last], &v[0]) == Ordering::Less {
        v.swap(last, 0);
    }
    if cmp_limit(&v[last], &v[mid]) == Ordering::Less {
        v.swap(last, mid);
    }
    // median now at mid: park it at the end
    v.swap(mid, last);

    let mut store = 0;
    for i in 0..last {
        if cmp_limit(&v[i], &v[last]) == Ordering::Less {
            v.swap(i, store);
            store += 1;
        }
    }
    v.swap(store, last);
    store
}

fn heap_sort(v: &mut [RangeLimit]) {
    let len = v.len();
    for start in (0..len / 2).rev() {
        sift_down(v, start, len);
    }
    for end in (1..len).rev() {
        v.swap(0, end);
        sift_down(v, 0, end);
    }
}

fn sift_down(v: &mut [RangeLimit], mut root: usize, end: usize) {
    loop {
        let mut child = 2 * root + 1;
        if child >= end {
            return;
        }
        if child + 1 < end && cmp_limit(&v[child], &v[child + 1]) == Ordering::Less {
            child += 1;
        }
        if cmp_limit(&v[root], &v[child]) != Ordering::Less {
            return;
        }
        v.swap(root, child);
        root = child;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factory::StandardRangeFactory;

    fn r(min: f64, max: f64) -> Range {
        Range::new(min, max)
    }

    #[test]
    fn test_is_finite() {
        assert!(r(0.0, 1.0).is_finite());
        assert!(r(2.0, 2.0).is_finite());
        assert!(!r(2.0, 1.0).is_finite());
        assert!(!r(f64::NAN, 1.0).is_finite());
        assert!(!r(0.0, f64::INFINITY).is_finite());
        assert!(!Range::UNDEFINED.is_finite());
        assert!(!is_finite(&Range::default()));
    }

    #[test]
    fn test_overlap_with_nan_bounds() {
        assert!(overlap(&r(0.0, 1.0), &r(1.0, 2.0)));
        assert!(!overlap(&r(0.0, 1.0), &r(1.5, 2.0)));
        // NaN max on the left: unbounded above
        assert!(overlap(&r(0.0, f64::NAN), &r(100.0, 200.0)));
        assert!(overlap(&r(f64::NAN, 0.0), &r(-100.0, -50.0)));
        assert!(!overlap(&r(f64::NAN, 0.0), &r(1.0, 2.0)));
    }

    #[test]
    fn test_overlap_fully() {
        assert!(overlap_fully(&r(0.0, 10.0), &r(2.0, 3.0)));
        assert!(overlap_fully(&r(0.0, 10.0), &r(0.0, 10.0)));
        assert!(!overlap_fully(&r(0.0, 10.0), &r(5.0, 11.0)));
        assert!(!overlap_fully(&r(2.0, 3.0), &r(0.0, 10.0)));
    }

    #[test]
    fn test_contains_value() {
        let a = r(1.0, 2.0);
        assert!(a.contains(1.0));
        assert!(a.contains(2.0));
        assert!(!a.contains(2.1));
        assert!(!a.contains(f64::NAN));
        assert!(a.contains_with_err(2.1, 0.2));
        assert!(!a.contains_with_err(2.5, 0.2));
    }

    #[test]
    fn test_set_contains_matches_any() {
        let ranges = vec![r(0.0, 1.0), r(5.0, 6.0), r(5.5, 9.0)];
        for v in [-1.0, 0.0, 0.5, 1.0, 3.0, 5.0, 5.7, 8.9, 9.0, 9.5, f64::NAN] {
            assert_eq!(
                contains(&ranges, v),
                ranges.iter().any(|x| x.contains(v)),
                "value {v}"
            );
        }
    }

    #[test]
    fn test_union_sorted() {
        let mut ranges = vec![r(1.0, 3.0), r(2.0, 5.0), r(7.0, 9.0)];
        union(&mut ranges);
        assert_eq!(ranges, vec![r(1.0, 5.0), r(7.0, 9.0)]);
    }

    #[test]
    fn test_union_absorbs_nested_and_touching() {
        let mut ranges = vec![r(7.0, 9.0), r(0.0, 10.0), r(2.0, 3.0), r(10.0, 12.0)];
        sort(&mut ranges);
        union(&mut ranges);
        assert_eq!(ranges, vec![r(0.0, 12.0)]);
    }

    #[test]
    fn test_restrict_range() {
        let mut ranges = vec![r(0.0, 2.0), r(3.0, 4.0), r(5.0, 9.0), r(10.0, 11.0)];
        restrict_range(&mut ranges, 1.0, 6.0);
        assert_eq!(ranges, vec![r(1.0, 2.0), r(3.0, 4.0), r(5.0, 6.0)]);
    }

    #[test]
    fn test_intersect_ranges_exact_coverage() {
        let mut factory = StandardRangeFactory::default();
        let input = vec![r(0.0, 10.0), r(5.0, 15.0)];
        assert_eq!(
            intersect_ranges(&input, 1, &mut factory),
            vec![r(0.0, 5.0), r(10.0, 15.0)]
        );
        assert_eq!(intersect_ranges(&input, 2, &mut factory), vec![r(5.0, 10.0)]);
        assert!(intersect_ranges(&input, 3, &mut factory).is_empty());
        assert!(intersect_ranges(&input, 0, &mut factory).is_empty());
        assert!(intersect_ranges(&[], 1, &mut factory).is_empty());
    }

    #[test]
    fn test_intersect_ranges_is_not_at_least_n() {
        // [4,6] is covered three times: excluded for n_valid = 2.
        let mut factory = StandardRangeFactory::default();
        let input = vec![r(0.0, 10.0), r(2.0, 8.0), r(4.0, 6.0)];
        assert_eq!(
            intersect_ranges(&input, 2, &mut factory),
            vec![r(2.0, 4.0), r(6.0, 8.0)]
        );
        assert_eq!(intersect_ranges(&input, 3, &mut factory), vec![r(4.0, 6.0)]);
    }

    #[test]
    fn test_sort_limits_large_input() {
        let mut limits: Vec<RangeLimit> = (0..500)
            .map(|i| RangeLimit::new(((i * 7919) % 503) as f64, if i % 2 == 0 { 1 } else { -1 }))
            .collect();
        sort_limits(&mut limits);
        assert!(limits
            .windows(2)
            .all(|w| w[0].position <= w[1].position));
        assert_eq!(limits.len(), 500);
    }

    #[test]
    fn test_heap_sort_fallback() {
        let mut limits: Vec<RangeLimit> =
            (0..64).rev().map(|i| RangeLimit::new(i as f64, 1)).collect();
        heap_sort(&mut limits);
        assert!(limits
            .windows(2)
            .all(|w| w[0].position <= w[1].position));
    }

    #[test]
    fn test_bounds() {
        assert_eq!(bounds(&[r(3.0, 4.0), r(-1.0, 2.0)]), r(-1.0, 4.0));
        assert!(!bounds(&[]).is_finite());
    }
}
