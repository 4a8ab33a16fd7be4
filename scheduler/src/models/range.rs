//! Interval algebra over [`TimeRange`] lists.
//!
//! Every operation takes and returns normalized lists: sorted by start,
//! non-overlapping, with empty ranges dropped. The placement engine leans on
//! these primitives for mask folding, material subtraction and window
//! clipping.

use crate::api::TimeRange;

/// Sort ranges in place by their start instant.
pub fn sort_by_start(ranges: &mut [TimeRange]) {
    ranges.sort_by(|a, b| {
        a.start
            .partial_cmp(&b.start)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
}

/// Normalize a range list: drop empty ranges, sort by start, merge
/// overlapping or touching neighbours.
pub fn normalize(ranges: &[TimeRange]) -> Vec<TimeRange> {
    let mut sorted: Vec<TimeRange> = ranges.iter().copied().filter(|r| !r.is_empty()).collect();
    sort_by_start(&mut sorted);

    let mut merged: Vec<TimeRange> = Vec::with_capacity(sorted.len());
    for range in sorted {
        match merged.last_mut() {
            Some(last) if range.start <= last.end => {
                if range.end > last.end {
                    last.end = range.end;
                }
            }
            _ => merged.push(range),
        }
    }
    merged
}

/// Strict overlap test (touching endpoints do not overlap).
pub fn is_overlapping(a: &TimeRange, b: &TimeRange) -> bool {
    a.start < b.end && b.start < a.end
}

/// Containment test: `inner` lies entirely within `outer`.
pub fn is_during(inner: &TimeRange, outer: &TimeRange) -> bool {
    outer.start <= inner.start && inner.end <= outer.end
}

/// Intersection of two range lists.
pub fn intersect(a: &[TimeRange], b: &[TimeRange]) -> Vec<TimeRange> {
    let a = normalize(a);
    let b = normalize(b);
    let mut out = Vec::new();
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        let start = a[i].start.max(b[j].start);
        let end = a[i].end.min(b[j].end);
        if end > start {
            out.push(TimeRange::new(start, end));
        }
        // Advance whichever range finishes first.
        if a[i].end < b[j].end {
            i += 1;
        } else {
            j += 1;
        }
    }
    out
}

/// Union of two range lists.
pub fn unify(a: &[TimeRange], b: &[TimeRange]) -> Vec<TimeRange> {
    let mut all: Vec<TimeRange> = Vec::with_capacity(a.len() + b.len());
    all.extend_from_slice(a);
    all.extend_from_slice(b);
    normalize(&all)
}

/// Set difference: the parts of `a` not covered by `b`.
pub fn substract(a: &[TimeRange], b: &[TimeRange]) -> Vec<TimeRange> {
    let a = normalize(a);
    let b = normalize(b);
    let mut out = Vec::new();
    for range in &a {
        let mut cursor = range.start;
        for hole in b.iter().filter(|h| is_overlapping(h, range)) {
            if hole.start > cursor {
                out.push(TimeRange::new(cursor, hole.start));
            }
            cursor = cursor.max(hole.end);
        }
        if cursor < range.end {
            out.push(TimeRange::new(cursor, range.end));
        }
    }
    out
}

/// Complement of `ranges` within a single covering range.
pub fn complement(within: &TimeRange, ranges: &[TimeRange]) -> Vec<TimeRange> {
    substract(std::slice::from_ref(within), ranges)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn r(start: f64, end: f64) -> TimeRange {
        TimeRange::new(start, end)
    }

    #[test]
    fn test_normalize_merges_overlapping() {
        let out = normalize(&[r(5.0, 8.0), r(0.0, 3.0), r(2.0, 6.0)]);
        assert_eq!(out, vec![r(0.0, 8.0)]);
    }

    #[test]
    fn test_normalize_merges_touching() {
        let out = normalize(&[r(0.0, 2.0), r(2.0, 4.0)]);
        assert_eq!(out, vec![r(0.0, 4.0)]);
    }

    #[test]
    fn test_normalize_drops_empty() {
        let out = normalize(&[r(3.0, 3.0), r(1.0, 2.0)]);
        assert_eq!(out, vec![r(1.0, 2.0)]);
    }

    #[test]
    fn test_intersect_basic() {
        let out = intersect(&[r(0.0, 5.0), r(7.0, 10.0)], &[r(3.0, 8.0)]);
        assert_eq!(out, vec![r(3.0, 5.0), r(7.0, 8.0)]);
    }

    #[test]
    fn test_intersect_disjoint_is_empty() {
        assert!(intersect(&[r(0.0, 2.0)], &[r(2.0, 4.0)]).is_empty());
    }

    #[test]
    fn test_unify() {
        let out = unify(&[r(0.0, 2.0), r(8.0, 9.0)], &[r(1.0, 4.0)]);
        assert_eq!(out, vec![r(0.0, 4.0), r(8.0, 9.0)]);
    }

    #[test]
    fn test_substract_carves_hole() {
        let out = substract(&[r(0.0, 10.0)], &[r(3.0, 6.0)]);
        assert_eq!(out, vec![r(0.0, 3.0), r(6.0, 10.0)]);
    }

    #[test]
    fn test_substract_swallows_range() {
        assert!(substract(&[r(2.0, 4.0)], &[r(0.0, 10.0)]).is_empty());
    }

    #[test]
    fn test_substract_edges() {
        let out = substract(&[r(0.0, 10.0)], &[r(0.0, 2.0), r(9.0, 12.0)]);
        assert_eq!(out, vec![r(2.0, 9.0)]);
    }

    #[test]
    fn test_complement() {
        let out = complement(&r(0.0, 10.0), &[r(2.0, 3.0), r(5.0, 7.0)]);
        assert_eq!(out, vec![r(0.0, 2.0), r(3.0, 5.0), r(7.0, 10.0)]);
    }

    #[test]
    fn test_is_during() {
        assert!(is_during(&r(2.0, 3.0), &r(0.0, 10.0)));
        assert!(is_during(&r(0.0, 10.0), &r(0.0, 10.0)));
        assert!(!is_during(&r(9.0, 11.0), &r(0.0, 10.0)));
    }

    fn range_list() -> impl Strategy<Value = Vec<TimeRange>> {
        prop::collection::vec((0u32..100, 1u32..20), 0..8).prop_map(|pairs| {
            pairs
                .into_iter()
                .map(|(start, len)| r(start as f64, (start + len) as f64))
                .collect()
        })
    }

    proptest! {
        #[test]
        fn prop_substract_is_disjoint_from_subtrahend(a in range_list(), b in range_list()) {
            let diff = substract(&a, &b);
            prop_assert!(intersect(&diff, &b).is_empty());
        }

        #[test]
        fn prop_intersect_is_contained_in_both(a in range_list(), b in range_list()) {
            let inter = intersect(&a, &b);
            let na = normalize(&a);
            let nb = normalize(&b);
            for piece in &inter {
                prop_assert!(na.iter().any(|outer| is_during(piece, outer)));
                prop_assert!(nb.iter().any(|outer| is_during(piece, outer)));
            }
        }

        #[test]
        fn prop_unify_covers_operands(a in range_list(), b in range_list()) {
            let union = unify(&a, &b);
            for piece in normalize(&a).iter().chain(normalize(&b).iter()) {
                prop_assert!(union.iter().any(|outer| is_during(piece, outer)));
            }
        }

        #[test]
        fn prop_substract_then_add_back_restores(a in range_list(), b in range_list()) {
            let na = normalize(&a);
            let kept = substract(&a, &b);
            let removed = intersect(&a, &b);
            prop_assert_eq!(unify(&kept, &removed), na);
        }
    }
}
