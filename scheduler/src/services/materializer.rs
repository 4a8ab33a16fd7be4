//! Placement simulation and materialization.
//!
//! Simulation turns a potentiality plus the current pressure chunks into
//! candidate materials at one specific duration. Materialization runs the
//! equilibrium search: it probes the minimum and target durations, then
//! bisects between them until the potentiality's own pressure balances the
//! mean pressure of everything its placement would displace, reporting a
//! [`Conflict`] when no balance stays inside feasible pressure bounds.

use crate::api::{Conflict, Material, TimeDuration, TimeRange};
use crate::models::range;
use crate::services::potentials::{
    earliest_end, latest_start, max_place_available, place_extent, total_place_available,
    Potentiality,
};
use crate::services::pressure::{
    clip_chunks_to_ranges, compute_pressure_area, compute_pressure_with_space, PressureChunk,
    EPSILON,
};

/// Two pressures within this distance are treated as equal; also the
/// convergence cutoff of the equilibrium search. Tunable.
pub(crate) const SAME_PRESSURE_TOLERANCE: f64 = 0.1;

/// Shrink factor applied to the search step on every iteration. Tunable.
pub(crate) const DELTA_CONTRACTION: f64 = 2.0;

/// How many recent pressure deltas the stall detector looks at.
const PROGRESS_WINDOW: usize = 3;

/// Tolerance-based float equality.
pub(crate) fn are_same_number(tolerance: f64, a: f64, b: f64) -> bool {
    a == b || (a - b).abs() < tolerance
}

/// Fixed-size history of the most recent search deltas.
#[derive(Debug, Default)]
pub(crate) struct ProgressHistory {
    deltas: Vec<f64>,
}

impl ProgressHistory {
    pub(crate) fn new() -> Self {
        Self {
            deltas: Vec::with_capacity(PROGRESS_WINDOW),
        }
    }

    pub(crate) fn push(&mut self, delta: f64) {
        if self.deltas.len() == PROGRESS_WINDOW {
            self.deltas.remove(0);
        }
        self.deltas.push(delta);
    }

    pub(crate) fn deltas(&self) -> &[f64] {
        &self.deltas
    }
}

/// Stall detector for the equilibrium search.
///
/// The search keeps going while the most recent delta is still above the
/// tolerance and the history window shows some consecutive pair still
/// strictly improving. A full window of non-decreasing deltas means the
/// search has stopped gaining ground.
pub(crate) fn is_progressing(deltas: &[f64]) -> bool {
    let Some(&last) = deltas.last() else {
        return true;
    };
    if last < SAME_PRESSURE_TOLERANCE {
        return false;
    }
    if deltas.len() < PROGRESS_WINDOW {
        return true;
    }
    deltas.windows(2).any(|pair| pair[1] < pair[0])
}

fn to_material(pot: &Potentiality, start: f64, end: f64, split_id: Option<u32>) -> Material {
    Material {
        query_id: pot.query_id,
        material_id: pot.potential_id,
        start,
        end,
        split_id,
    }
}

/// Total duration covered by a material list.
pub fn placed_duration(materials: &[Material]) -> f64 {
    materials.iter().map(|m| m.duration()).sum()
}

fn covers(materials: &[Material], duration: f64) -> bool {
    !materials.is_empty() && placed_duration(materials) + EPSILON >= duration
}

/// Mean pressure across potentialities; zero for an empty set (a placement
/// with nothing to displace).
pub(crate) fn potentials_to_mean_pressure(pots: &[Potentiality]) -> f64 {
    if pots.is_empty() {
        return 0.0;
    }
    pots.iter().map(|p| p.pressure).sum::<f64>() / pots.len() as f64
}

/// No affected potentiality may end up above pressure 1.
pub(crate) fn validate_potentials(pots: &[Potentiality]) -> bool {
    pots.iter().all(|p| p.pressure <= 1.0 + EPSILON)
}

/// Chunks overlapping the potentiality's windows, clipped to the windows'
/// crisp extents and sorted least-pressured first (area, then start).
fn candidate_chunks(pot: &Potentiality, chunks: &[PressureChunk]) -> Vec<PressureChunk> {
    let extents: Vec<TimeRange> = pot.places.iter().filter_map(|p| place_extent(p)).collect();
    let mut clipped = clip_chunks_to_ranges(chunks, &extents);
    clipped.sort_by(|a, b| {
        let by_area = compute_pressure_area(a)
            .partial_cmp(&compute_pressure_area(b))
            .unwrap_or(std::cmp::Ordering::Equal);
        by_area.then(
            a.start
                .partial_cmp(&b.start)
                .unwrap_or(std::cmp::Ordering::Equal),
        )
    });
    clipped
}

/// Mean pressure over a span, or `None` when the chunks do not cover it
/// contiguously.
fn mean_pressure_over(chunks_by_start: &[PressureChunk], span: &TimeRange) -> Option<f64> {
    let mut covered = 0.0;
    let mut area = 0.0;
    for chunk in chunks_by_start {
        let start = chunk.start.max(span.start);
        let end = chunk.end.min(span.end);
        if end <= start {
            continue;
        }
        covered += end - start;
        area += (end - start) * (chunk.pressure_at(start) + chunk.pressure_at(end)) / 2.0;
    }
    if covered + EPSILON < span.duration() || covered <= EPSILON {
        return None;
    }
    Some(area / covered)
}

fn place_atomic(pot: &Potentiality, duration: f64, sorted_chunks: &[PressureChunk]) -> Vec<Material> {
    if duration <= EPSILON {
        return Vec::new();
    }

    // A window already matching the requested duration exactly takes the
    // direct intersection.
    if pot.places.len() == 1 {
        if let Some(extent) = place_extent(&pot.places[0]) {
            let exact = (extent.duration() - duration).abs() < EPSILON;
            let reachable = sorted_chunks
                .iter()
                .any(|c| range::is_overlapping(&c.time_range(), &extent));
            if exact && reachable {
                return vec![to_material(pot, extent.start, extent.end, None)];
            }
        }
    }

    let mut by_start = sorted_chunks.to_vec();
    by_start.sort_by(|a, b| {
        a.start
            .partial_cmp(&b.start)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut best: Option<(f64, TimeRange)> = None;
    for chunk in &by_start {
        for anchor in [chunk.start, chunk.end - duration] {
            let candidate = TimeRange::new(anchor, anchor + duration);
            // Must sit inside a single window and honour its boundary
            // constraints.
            let Some(window) = pot.places.iter().find(|place| {
                place_extent(place).is_some_and(|ext| range::is_during(&candidate, &ext))
            }) else {
                continue;
            };
            if latest_start(window).is_some_and(|limit| candidate.start > limit + EPSILON) {
                continue;
            }
            if earliest_end(window).is_some_and(|limit| candidate.end < limit - EPSILON) {
                continue;
            }
            let Some(mean) = mean_pressure_over(&by_start, &candidate) else {
                continue;
            };
            let improves = match &best {
                None => true,
                Some((best_mean, best_range)) => {
                    mean + EPSILON < *best_mean
                        || (are_same_number(EPSILON, mean, *best_mean)
                            && candidate.start < best_range.start)
                }
            };
            if improves {
                best = Some((mean, candidate));
            }
        }
    }

    best.map(|(_, span)| vec![to_material(pot, span.start, span.end, None)])
        .unwrap_or_default()
}

fn place_splittable(
    pot: &Potentiality,
    duration: f64,
    sorted_chunks: &[PressureChunk],
) -> Vec<Material> {
    let mut materials = Vec::new();
    let mut remaining = duration;
    let mut split_id = 0u32;
    for chunk in sorted_chunks {
        if remaining <= EPSILON {
            break;
        }
        if chunk.width() <= EPSILON {
            continue;
        }
        let take = chunk.width().min(remaining);
        materials.push(to_material(pot, chunk.start, chunk.start + take, Some(split_id)));
        split_id += 1;
        remaining -= take;
    }
    materials
}

/// Simulate placing a potentiality at one specific duration against the
/// current pressure chunks.
///
/// Atomic potentialities get the least-pressured contiguous span of the
/// requested duration inside a single window, or nothing. Splittable ones
/// greedily consume the least-pressured chunks; the result may fall short of
/// the requested duration, which callers detect via the summed duration.
pub fn simulate_placement(
    pot: &Potentiality,
    duration: f64,
    pressure_chunks: &[PressureChunk],
) -> Vec<Material> {
    let sorted = candidate_chunks(pot, pressure_chunks);
    if sorted.is_empty() {
        return Vec::new();
    }
    if pot.is_splittable {
        place_splittable(pot, duration, &sorted)
    } else {
        place_atomic(pot, duration, &sorted)
    }
}

/// Materialize a potentiality into concrete intervals, or report why it
/// cannot be placed.
///
/// `refresh` recomputes the pressure of every potentiality that would be
/// affected if the candidate materials were committed: the ripple of one
/// placement onto all competing demands.
pub fn materialize_potentiality<F>(
    to_place: &Potentiality,
    mut refresh: F,
    pressure_chunks: &[PressureChunk],
) -> Result<Vec<Material>, Conflict>
where
    F: FnMut(&[Material]) -> Vec<Potentiality>,
{
    let min_materials = simulate_placement(to_place, to_place.duration.min, pressure_chunks);
    let target_materials = simulate_placement(to_place, to_place.duration.target, pressure_chunks);
    if min_materials.is_empty() && target_materials.is_empty() {
        return Err(Conflict::no_place(to_place.query_id));
    }

    let min_pots = refresh(&min_materials);
    let target_pots = refresh(&target_materials);
    let min_avg = potentials_to_mean_pressure(&min_pots);
    let max_avg = potentials_to_mean_pressure(&target_pots);
    let target_ok = covers(&target_materials, to_place.duration.target);

    // More duration does not change the competitive landscape: take the
    // target placement, unless even the minimal one oversubscribes.
    if target_ok && are_same_number(SAME_PRESSURE_TOLERANCE, min_avg, max_avg) {
        if validate_potentials(&min_pots) {
            return Ok(target_materials);
        }
        return Err(Conflict::pressure_overflow(to_place.query_id));
    }

    find_max_finite_placement(to_place, min_avg, refresh, pressure_chunks)
}

/// Equilibrium search over candidate durations between `min` and `target`.
fn find_max_finite_placement<F>(
    to_place: &Potentiality,
    min_avg: f64,
    mut refresh: F,
    pressure_chunks: &[PressureChunk],
) -> Result<Vec<Material>, Conflict>
where
    F: FnMut(&[Material]) -> Vec<Potentiality>,
{
    let min_duration = to_place.duration.min;
    // An atomic placement can never exceed one window; a splittable one can
    // use them all.
    let max_test = if to_place.is_splittable {
        total_place_available(to_place)
    } else {
        max_place_available(to_place)
    };
    let clamp_duration = |d: f64| d.clamp(min_duration, max_test.max(min_duration));

    let mut delta = to_place.duration.target - min_duration;
    let mut test_duration = clamp_duration(min_duration + delta / DELTA_CONTRACTION);
    let mut history = ProgressHistory::new();

    loop {
        let materials = simulate_placement(to_place, test_duration, pressure_chunks);
        let pots = refresh(&materials);
        let mean = potentials_to_mean_pressure(&pots);
        let own = compute_pressure_with_space(
            &TimeDuration::new(min_duration, test_duration),
            max_test,
        );
        log::trace!(
            "query {}: test_duration={:.3} own={:.4} mean={:.4}",
            to_place.query_id,
            test_duration,
            own,
            mean
        );

        // The step shrinks every pass, so the deltas stabilise and the stall
        // check below fires even when the pressures never meet.
        delta /= DELTA_CONTRACTION;
        let grow = own < mean && mean <= 1.0;
        test_duration = clamp_duration(if grow {
            test_duration + delta
        } else {
            test_duration - delta
        });
        history.push((mean - own).abs());

        if are_same_number(SAME_PRESSURE_TOLERANCE, min_avg, mean)
            || !is_progressing(history.deltas())
        {
            if materials.is_empty() || placed_duration(&materials) + EPSILON < min_duration {
                return Err(Conflict::no_place(to_place.query_id));
            }
            if !validate_potentials(&pots) {
                return Err(Conflict::pressure_overflow(to_place.query_id));
            }
            return Ok(materials);
        }
    }
}
