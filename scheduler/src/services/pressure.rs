//! Pressure model.
//!
//! Pressure is a scalar measure of how tightly a potentiality's duration
//! demand matches the space available to it: `0` for no demand, saturating
//! toward `1` as the target duration grows against fixed space, and above `1`
//! once even the minimum duration no longer fits. Per-potentiality pressures
//! are folded into a piecewise-linear pressure function over the timeline
//! ("pressure chunks") by summing the linear contributions of every window
//! boundary marker.

use crate::api::{Config, Material, QueryPosition, TimeDuration, TimeRange};
use crate::models::range;
use crate::services::potentials::{
    atomic_to_places, place_max_duration, PotRange, PotRangeKind, Potentiality,
};

/// Numeric slack for instants and pressures.
pub(crate) const EPSILON: f64 = 1e-9;

/// A maximal timeline segment over which the aggregate pressure varies
/// linearly between its endpoints.
///
/// Invariant: a chunk list is contiguous, non-overlapping, sorted by start,
/// and covers exactly the schedule's timeline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PressureChunk {
    pub start: f64,
    pub end: f64,
    pub pressure_start: f64,
    pub pressure_end: f64,
}

impl PressureChunk {
    pub fn new(start: f64, end: f64, pressure_start: f64, pressure_end: f64) -> Self {
        Self {
            start,
            end,
            pressure_start,
            pressure_end,
        }
    }

    pub fn width(&self) -> f64 {
        self.end - self.start
    }

    pub fn time_range(&self) -> TimeRange {
        TimeRange::new(self.start, self.end)
    }

    /// Pressure at an instant, linearly interpolated between the endpoints.
    pub fn pressure_at(&self, instant: f64) -> f64 {
        if self.width() <= EPSILON {
            return self.pressure_start;
        }
        let t = (instant - self.start) / self.width();
        self.pressure_start + t * (self.pressure_end - self.pressure_start)
    }
}

/// `x / (x + 1) * limit`: grows from 0 toward `limit` as `x` grows without
/// bound, so pressure saturates smoothly instead of spiking.
fn asymptote_to(limit: f64, value: f64) -> f64 {
    value / (value + 1.0) * limit
}

/// Pressure of a duration demand against a given amount of available space.
pub fn compute_pressure_with_space(duration: &TimeDuration, space: f64) -> f64 {
    if space <= EPSILON {
        return f64::INFINITY;
    }
    let min = duration.min / space;
    if min >= 1.0 {
        return min;
    }
    min + asymptote_to(1.0 - min, duration.target / space)
}

/// Pressure of a potentiality's duration demand against its candidate
/// windows. Space is the summed crisp extent of the windows; soft markers do
/// not count as space.
pub fn compute_pressure(duration: &TimeDuration, places: &[Vec<PotRange>]) -> f64 {
    let space: f64 = places.iter().map(|place| place_max_duration(place)).sum();
    compute_pressure_with_space(duration, space)
}

/// Signed trapezoid area under a chunk's linear pressure segment.
///
/// Used as the ascending sort key for least-pressured-first chunk selection;
/// non-negative for well-formed chunks, so callers wanting a true area should
/// still take the absolute value.
pub fn compute_pressure_area(chunk: &PressureChunk) -> f64 {
    (chunk.end - chunk.start) * (chunk.pressure_start + chunk.pressure_end) / 2.0
}

fn clip_to(chunk: &PressureChunk, bounds: &TimeRange) -> Option<PressureChunk> {
    let start = chunk.start.max(bounds.start);
    let end = chunk.end.min(bounds.end);
    if end - start <= EPSILON {
        return None;
    }
    Some(PressureChunk::new(
        start,
        end,
        chunk.pressure_at(start),
        chunk.pressure_at(end),
    ))
}

/// Merge adjacent chunks lying on the same line.
fn coalesce(chunks: Vec<PressureChunk>) -> Vec<PressureChunk> {
    let mut out: Vec<PressureChunk> = Vec::with_capacity(chunks.len());
    for chunk in chunks {
        if let Some(last) = out.last_mut() {
            let continuous = (last.pressure_end - chunk.pressure_start).abs() < EPSILON;
            // pressure_at does not clamp, so this extrapolates last's line.
            let same_line = (last.pressure_at(chunk.end) - chunk.pressure_end).abs() < EPSILON;
            if continuous && same_line {
                last.end = chunk.end;
                last.pressure_end = chunk.pressure_end;
                continue;
            }
        }
        out.push(chunk);
    }
    out
}

/// Fold all potentialities' pressure contributions into a gap-free, sorted
/// chunk list covering the config timeline.
///
/// Each pressure-bearing window marker contributes a linear segment over its
/// own range: the potentiality's pressure at both ends for crisp markers,
/// ramping from zero at the early edge of a `StartBefore` and to zero at the
/// late edge of an `EndAfter`. Overlapping contributions add.
pub fn compute_pressure_chunks(config: &Config, potentialities: &[Potentiality]) -> Vec<PressureChunk> {
    let bounds = config.time_range();

    let mut contributions: Vec<PressureChunk> = Vec::new();
    for pot in potentialities {
        for place in &pot.places {
            for marker in place.iter().filter(|m| m.kind.bears_pressure()) {
                let pressure_start = if marker.kind == PotRangeKind::StartBefore {
                    0.0
                } else {
                    pot.pressure
                };
                let pressure_end = if marker.kind == PotRangeKind::EndAfter {
                    0.0
                } else {
                    pot.pressure
                };
                let contribution =
                    PressureChunk::new(marker.start, marker.end, pressure_start, pressure_end);
                if let Some(clipped) = clip_to(&contribution, &bounds) {
                    contributions.push(clipped);
                }
            }
        }
    }

    let mut cuts: Vec<f64> = Vec::with_capacity(contributions.len() * 2 + 2);
    cuts.push(bounds.start);
    cuts.push(bounds.end);
    for c in &contributions {
        cuts.push(c.start);
        cuts.push(c.end);
    }
    cuts.retain(|&x| x >= bounds.start - EPSILON && x <= bounds.end + EPSILON);
    cuts.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    cuts.dedup_by(|a, b| (*a - *b).abs() <= EPSILON);

    let mut chunks = Vec::with_capacity(cuts.len().saturating_sub(1));
    for pair in cuts.windows(2) {
        let (start, end) = (pair[0], pair[1]);
        if end - start <= EPSILON {
            continue;
        }
        let active = |c: &&PressureChunk| c.start <= start + EPSILON && c.end >= end - EPSILON;
        let pressure_start: f64 = contributions.iter().filter(active).map(|c| c.pressure_at(start)).sum();
        let pressure_end: f64 = contributions.iter().filter(active).map(|c| c.pressure_at(end)).sum();
        chunks.push(PressureChunk::new(start, end, pressure_start, pressure_end));
    }

    coalesce(chunks)
}

/// Clip a chunk list to a set of allowed ranges, interpolating pressures at
/// the cut points. The result is sorted by start.
pub(crate) fn clip_chunks_to_ranges(
    chunks: &[PressureChunk],
    ranges: &[TimeRange],
) -> Vec<PressureChunk> {
    let ranges = range::normalize(ranges);
    let mut out = Vec::new();
    for chunk in chunks {
        for r in &ranges {
            if let Some(clipped) = clip_to(chunk, r) {
                out.push(clipped);
            }
        }
    }
    out.sort_by(|a, b| a.start.partial_cmp(&b.start).unwrap_or(std::cmp::Ordering::Equal));
    out
}

/// Refresh a potentiality against the current masks and committed materials.
///
/// The candidate windows are rebuilt from the intersection of all masks with
/// the timeline, minus every material that is not this potentiality's own
/// prior placement (self-exclusion keeps a potentiality from being pushed
/// away by its own tentative placement), and the pressure recomputed.
pub fn update_potentials_pressure(
    config: &Config,
    position: &QueryPosition,
    potentiality: &Potentiality,
    materials: &[Material],
    masks: &[Vec<TimeRange>],
) -> Potentiality {
    let mut bounds = vec![config.time_range()];
    for mask in masks {
        bounds = range::intersect(mask, &bounds);
    }
    let occupied: Vec<TimeRange> = materials
        .iter()
        .filter(|m| {
            m.query_id != potentiality.query_id || m.material_id != potentiality.potential_id
        })
        .map(|m| m.time_range())
        .collect();
    let free = range::substract(&bounds, &occupied);

    let places: Vec<_> = free
        .iter()
        .filter_map(|b| atomic_to_places(b, position))
        .collect();
    let pressure = compute_pressure(&potentiality.duration, &places);

    Potentiality {
        places,
        pressure,
        ..potentiality.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{QueryId, TimeBoundary};
    use crate::services::potentials::PotRange;

    /// Crisp marker window over `[start, end]`.
    fn window(start: f64, end: f64) -> Vec<PotRange> {
        let mid = (start + end) / 2.0;
        vec![
            PotRange::new(PotRangeKind::Start, start, mid),
            PotRange::new(PotRangeKind::End, mid, end),
        ]
    }

    fn pot(query_id: i64, pressure: f64, windows: &[(f64, f64)]) -> Potentiality {
        Potentiality {
            query_id: QueryId::new(query_id),
            potential_id: 0,
            duration: TimeDuration::new(1.0, 1.0),
            is_splittable: false,
            places: windows.iter().map(|&(s, e)| window(s, e)).collect(),
            pressure,
        }
    }

    #[test]
    fn test_compute_pressure_exact_fit() {
        let p = compute_pressure(&TimeDuration::new(1.0, 1.0), &[window(0.0, 1.0)]);
        assert!((p - 1.0).abs() < EPSILON);
    }

    #[test]
    fn test_compute_pressure_no_min() {
        let p = compute_pressure(&TimeDuration::new(0.0, 1.0), &[window(0.0, 1.0)]);
        assert!((p - 0.5).abs() < EPSILON);
    }

    #[test]
    fn test_compute_pressure_no_min_double_space() {
        let p = compute_pressure(&TimeDuration::new(0.0, 1.0), &[window(0.0, 2.0)]);
        assert!((p - 1.0 / 3.0).abs() < EPSILON);
    }

    #[test]
    fn test_compute_pressure_half_min() {
        let p = compute_pressure(&TimeDuration::new(1.0, 1.0), &[window(0.0, 2.0)]);
        assert!((p - 2.0 / 3.0).abs() < EPSILON);
    }

    #[test]
    fn test_compute_pressure_sums_window_space() {
        let p = compute_pressure(
            &TimeDuration::new(1.0, 1.0),
            &[window(0.0, 1.0), window(1.0, 2.0)],
        );
        assert!((p - 2.0 / 3.0).abs() < EPSILON);
    }

    #[test]
    fn test_compute_pressure_overflow_is_min_ratio() {
        let p = compute_pressure(&TimeDuration::new(5.0, 5.0), &[window(0.0, 1.0)]);
        assert!((p - 5.0).abs() < EPSILON);
    }

    #[test]
    fn test_compute_pressure_no_space_is_infinite() {
        let p = compute_pressure(&TimeDuration::new(1.0, 2.0), &[]);
        assert!(p.is_infinite());
    }

    #[test]
    fn test_chunks_no_potentialities() {
        let chunks = compute_pressure_chunks(&Config::new(0.0, 10.0), &[]);
        assert_eq!(chunks, vec![PressureChunk::new(0.0, 10.0, 0.0, 0.0)]);
    }

    #[test]
    fn test_chunks_single_potentiality() {
        let chunks = compute_pressure_chunks(&Config::new(0.0, 10.0), &[pot(1, 1.0, &[(1.0, 2.0)])]);
        assert_eq!(
            chunks,
            vec![
                PressureChunk::new(0.0, 1.0, 0.0, 0.0),
                PressureChunk::new(1.0, 2.0, 1.0, 1.0),
                PressureChunk::new(2.0, 10.0, 0.0, 0.0),
            ]
        );
    }

    #[test]
    fn test_chunks_overlapping_pressures_sum() {
        let chunks = compute_pressure_chunks(
            &Config::new(0.0, 10.0),
            &[pot(1, 0.5, &[(1.0, 2.0)]), pot(2, 1.0, &[(1.0, 3.0)])],
        );
        assert_eq!(
            chunks,
            vec![
                PressureChunk::new(0.0, 1.0, 0.0, 0.0),
                PressureChunk::new(1.0, 2.0, 1.5, 1.5),
                PressureChunk::new(2.0, 3.0, 1.0, 1.0),
                PressureChunk::new(3.0, 10.0, 0.0, 0.0),
            ]
        );
    }

    #[test]
    fn test_chunks_soft_start_ramps_from_zero() {
        let mut soft = pot(1, 1.0, &[(4.0, 8.0)]);
        soft.places[0].insert(0, PotRange::new(PotRangeKind::StartBefore, 2.0, 4.0));

        let chunks = compute_pressure_chunks(&Config::new(0.0, 10.0), &[soft]);
        assert_eq!(
            chunks,
            vec![
                PressureChunk::new(0.0, 2.0, 0.0, 0.0),
                PressureChunk::new(2.0, 4.0, 0.0, 1.0),
                PressureChunk::new(4.0, 8.0, 1.0, 1.0),
                PressureChunk::new(8.0, 10.0, 0.0, 0.0),
            ]
        );
    }

    #[test]
    fn test_chunks_are_contiguous_and_sorted() {
        let chunks = compute_pressure_chunks(
            &Config::new(0.0, 100.0),
            &[
                pot(1, 0.7, &[(10.0, 30.0)]),
                pot(2, 0.2, &[(25.0, 60.0)]),
                pot(3, 1.0, &[(55.0, 90.0)]),
            ],
        );
        assert_eq!(chunks.first().unwrap().start, 0.0);
        assert_eq!(chunks.last().unwrap().end, 100.0);
        for pair in chunks.windows(2) {
            assert!(pair[0].end == pair[1].start, "chunks must be gap-free");
        }
    }

    #[test]
    fn test_pressure_area() {
        let chunk = PressureChunk::new(0.0, 4.0, 0.0, 1.0);
        assert!((compute_pressure_area(&chunk) - 2.0).abs() < EPSILON);

        let flat = PressureChunk::new(2.0, 5.0, 0.5, 0.5);
        assert!((compute_pressure_area(&flat) - 1.5).abs() < EPSILON);
    }

    #[test]
    fn test_clip_chunks_to_ranges_interpolates() {
        let chunks = vec![PressureChunk::new(0.0, 10.0, 0.0, 1.0)];
        let clipped = clip_chunks_to_ranges(&chunks, &[TimeRange::new(5.0, 8.0)]);

        assert_eq!(clipped.len(), 1);
        assert!((clipped[0].pressure_start - 0.5).abs() < EPSILON);
        assert!((clipped[0].pressure_end - 0.8).abs() < EPSILON);
    }

    fn refresh_fixture() -> (Config, QueryPosition, Potentiality, Vec<Material>) {
        let config = Config::new(0.0, 10.0);
        let position = QueryPosition::with_duration(TimeDuration::new(2.0, 4.0));
        let potentiality = pot(1, -1.0, &[(0.0, 10.0)]);
        let materials = vec![
            Material {
                query_id: QueryId::new(2),
                material_id: 0,
                start: 3.0,
                end: 6.0,
                split_id: None,
            },
            Material {
                query_id: QueryId::new(1),
                material_id: 0,
                start: 8.0,
                end: 9.0,
                split_id: None,
            },
        ];
        (config, position, potentiality, materials)
    }

    #[test]
    fn test_update_excludes_own_materials_from_subtraction() {
        let (config, position, potentiality, materials) = refresh_fixture();
        let updated = update_potentials_pressure(&config, &position, &potentiality, &materials, &[]);

        // The other query's [3,6] is carved out; the potentiality's own [8,9]
        // placement is not.
        let extents: Vec<TimeRange> = updated
            .places
            .iter()
            .map(|p| crate::services::potentials::place_extent(p).unwrap())
            .collect();
        assert_eq!(extents, vec![TimeRange::new(0.0, 3.0), TimeRange::new(6.0, 10.0)]);
    }

    #[test]
    fn test_update_is_idempotent() {
        let (config, position, potentiality, materials) = refresh_fixture();
        let masks = vec![vec![TimeRange::new(0.0, 9.5)]];

        let once = update_potentials_pressure(&config, &position, &potentiality, &materials, &masks);
        let twice = update_potentials_pressure(&config, &position, &once, &materials, &masks);

        assert_eq!(once.places, twice.places);
        assert_eq!(once.pressure, twice.pressure);
    }

    #[test]
    fn test_update_places_never_cover_other_materials() {
        let (config, position, potentiality, materials) = refresh_fixture();
        let updated = update_potentials_pressure(&config, &position, &potentiality, &materials, &[]);

        for place in &updated.places {
            let extent = crate::services::potentials::place_extent(place).unwrap();
            for m in materials.iter().filter(|m| m.query_id != potentiality.query_id) {
                assert!(
                    !extent.overlaps(&m.time_range()),
                    "window {:?} overlaps foreign material {:?}",
                    extent,
                    m
                );
            }
        }
    }

    #[test]
    fn test_update_applies_position_inside_free_ranges() {
        let config = Config::new(0.0, 10.0);
        let mut position = QueryPosition::with_duration(TimeDuration::new(1.0, 1.0));
        position.start = Some(TimeBoundary::at(4.0));
        let potentiality = pot(1, -1.0, &[(0.0, 10.0)]);

        let updated = update_potentials_pressure(&config, &position, &potentiality, &[], &[]);
        assert_eq!(updated.places.len(), 1);
        assert_eq!(
            crate::services::potentials::place_extent(&updated.places[0]),
            Some(TimeRange::new(4.0, 10.0))
        );
    }
}
