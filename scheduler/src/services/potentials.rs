//! Potentiality generation.
//!
//! A potentiality is a not-yet-placed candidate occupation of time for one
//! query: its duration demand, splittability, and one or more candidate
//! placement windows. Windows are expressed as small sets of boundary markers
//! so that asymmetric boundary softness (a query that may start early, or run
//! late, at decaying priority) survives into the pressure model.

use crate::api::{Config, LinkOrigin, Material, Query, QueryId, QueryPosition, TimeDuration, TimeRange};
use crate::models::range;

/// Kind of boundary marker making up a candidate window.
///
/// `Start`, `End`, `StartBefore` and `EndAfter` bear pressure; a `StartBefore`
/// contributes zero pressure at its early edge and an `EndAfter` zero at its
/// late edge. `StartAfter` and `EndBefore` are placement constraints only
/// (latest allowed start, earliest allowed end).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PotRangeKind {
    Start,
    End,
    StartBefore,
    StartAfter,
    EndBefore,
    EndAfter,
}

impl PotRangeKind {
    /// Whether chunks folded from this marker carry the potentiality's
    /// pressure.
    pub fn bears_pressure(self) -> bool {
        matches!(
            self,
            PotRangeKind::Start | PotRangeKind::End | PotRangeKind::StartBefore | PotRangeKind::EndAfter
        )
    }
}

/// One boundary marker of a candidate window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PotRange {
    pub kind: PotRangeKind,
    pub start: f64,
    pub end: f64,
}

impl PotRange {
    pub fn new(kind: PotRangeKind, start: f64, end: f64) -> Self {
        Self { kind, start, end }
    }

    pub fn time_range(&self) -> TimeRange {
        TimeRange::new(self.start, self.end)
    }
}

/// A not-yet-placed candidate occupation of time for one query.
///
/// Mutable by replacement only: refreshes after a materialization produce a
/// new value via [`crate::services::pressure::update_potentials_pressure`].
#[derive(Debug, Clone, PartialEq)]
pub struct Potentiality {
    pub query_id: QueryId,
    pub potential_id: u32,
    pub duration: TimeDuration,
    pub is_splittable: bool,
    /// Candidate windows, each a small set of boundary markers
    pub places: Vec<Vec<PotRange>>,
    /// Last computed pressure, `-1.0` before the first computation
    pub pressure: f64,
}

/// Crisp outer extent of a window: the span between its `Start` and `End`
/// markers. Soft markers are ignored for space computation and placement.
pub fn place_extent(place: &[PotRange]) -> Option<TimeRange> {
    let start = place
        .iter()
        .find(|p| p.kind == PotRangeKind::Start)
        .map(|p| p.start)?;
    let end = place
        .iter()
        .find(|p| p.kind == PotRangeKind::End)
        .map(|p| p.end)?;
    Some(TimeRange::new(start, end))
}

/// Width of a window's crisp extent.
pub fn place_max_duration(place: &[PotRange]) -> f64 {
    place_extent(place).map(|r| r.duration()).unwrap_or(0.0)
}

/// Latest allowed start instant, when a `StartAfter` marker constrains it.
pub fn latest_start(place: &[PotRange]) -> Option<f64> {
    place
        .iter()
        .find(|p| p.kind == PotRangeKind::StartAfter)
        .map(|p| p.end)
}

/// Earliest allowed end instant, when an `EndBefore` marker constrains it.
pub fn earliest_end(place: &[PotRange]) -> Option<f64> {
    place
        .iter()
        .find(|p| p.kind == PotRangeKind::EndBefore)
        .map(|p| p.start)
}

/// Largest single-window extent of a potentiality.
pub fn max_place_available(pot: &Potentiality) -> f64 {
    pot.places
        .iter()
        .map(|place| place_max_duration(place))
        .fold(0.0, f64::max)
}

/// Summed crisp extent across all of a potentiality's windows.
pub fn total_place_available(pot: &Potentiality) -> f64 {
    pot.places.iter().map(|place| place_max_duration(place)).sum()
}

/// Build the marker window for a query position inside free bounds.
///
/// The crisp span is the intersection of the bounds with the position's
/// boundary targets (each defaulting to the corresponding bound). The crisp
/// body is split at its midpoint into `Start` and `End` markers so the window
/// contributes its pressure exactly once over the span; soft `min`/`max`
/// boundary fields become the before/after markers. Returns `None` when the
/// window is empty or the boundary constraints cannot be met inside the
/// bounds.
pub fn atomic_to_places(bounds: &TimeRange, position: &QueryPosition) -> Option<Vec<PotRange>> {
    let start_boundary = position.start.unwrap_or_default();
    let end_boundary = position.end.unwrap_or_default();

    let s = start_boundary.target.unwrap_or(bounds.start).max(bounds.start);
    let e = end_boundary.target.unwrap_or(bounds.end).min(bounds.end);
    if e <= s {
        return None;
    }
    // A latest-start before the span or an earliest-end past it cannot be met.
    if start_boundary.max.is_some_and(|m| m < s) || end_boundary.min.is_some_and(|m| m > e) {
        return None;
    }

    let mid = (s + e) / 2.0;
    let mut place = Vec::with_capacity(4);

    if let Some(s_min) = start_boundary.min {
        let soft_start = s_min.max(bounds.start);
        if soft_start < s {
            place.push(PotRange::new(PotRangeKind::StartBefore, soft_start, s));
        }
    }
    place.push(PotRange::new(PotRangeKind::Start, s, mid));
    place.push(PotRange::new(PotRangeKind::End, mid, e));
    if let Some(e_max) = end_boundary.max {
        let soft_end = e_max.min(bounds.end);
        if soft_end > e {
            place.push(PotRange::new(PotRangeKind::EndAfter, e, soft_end));
        }
    }
    if let Some(s_max) = start_boundary.max {
        let limit = s_max.min(e);
        if limit > s {
            place.push(PotRange::new(PotRangeKind::StartAfter, s, limit));
        }
    }
    if let Some(e_min) = end_boundary.min {
        let limit = e_min.max(s);
        if limit < e {
            place.push(PotRange::new(PotRangeKind::EndBefore, limit, e));
        }
    }

    Some(place)
}

/// Turn one query into its initial potentiality: one window derived from the
/// query's own boundaries defaulted to the config timeline, pressure not yet
/// computed.
pub fn atomic_to_potentiality(config: &Config, query: &Query) -> Potentiality {
    let places = atomic_to_places(&config.time_range(), &query.position)
        .into_iter()
        .collect();
    Potentiality {
        query_id: query.id,
        potential_id: 0,
        duration: query.position.duration,
        is_splittable: query.is_splittable(),
        places,
        pressure: -1.0,
    }
}

/// Derive the placement mask imposed by a query's links.
///
/// Per link, every matching target material yields a window anchored at the
/// material's origin instant shifted by the link distance (unset distance
/// fields default to the origin itself), wide enough to hold the query's
/// target duration; a link's windows are unioned, and all links' unions
/// intersected. A query without links is masked by the whole timeline; a link
/// whose target has no materials yields an empty mask.
pub fn link_to_mask(materials: &[Material], config: &Config, query: &Query) -> Vec<TimeRange> {
    let links = match &query.links {
        Some(links) if !links.is_empty() => links,
        _ => return vec![config.time_range()],
    };
    let duration = query.position.duration;

    links
        .iter()
        .map(|link| {
            materials
                .iter()
                .filter(|m| {
                    m.query_id == link.query_id
                        && m.material_id == link.potential_id
                        && m.split_id == link.split_id
                })
                .map(|target| {
                    let origin = match link.origin {
                        LinkOrigin::Start => target.start,
                        LinkOrigin::End => target.end,
                    };
                    let min = origin + link.distance.min.unwrap_or(0.0);
                    let max = origin + link.distance.max.unwrap_or(0.0);
                    vec![TimeRange::new(min, max + duration.target)]
                })
                .fold(Vec::new(), |acc, windows| range::unify(&acc, &windows))
        })
        .reduce(|a, b| range::intersect(&a, &b))
        .unwrap_or_default()
}
