//! Public API surface for the placement engine.
//!
//! This file consolidates the input and output data model: queries and their
//! positional/recurrence constraints on the input side, materials and
//! conflicts on the output side. All types derive Serialize/Deserialize for
//! JSON serialization.

use serde::{Deserialize, Serialize};

/// Query identifier (assigned by the authoring layer).
#[derive(
    Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct QueryId(pub i64);

impl QueryId {
    pub fn new(value: i64) -> Self {
        QueryId(value)
    }

    pub fn value(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for QueryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<QueryId> for i64 {
    fn from(id: QueryId) -> Self {
        id.0
    }
}

/// Half-open time interval `[start, end)` in epoch milliseconds.
///
/// Zero-length ranges are degenerate but legal (they arise as intersection
/// results).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeRange {
    /// Start instant in epoch milliseconds
    pub start: f64,
    /// End instant in epoch milliseconds
    pub end: f64,
}

impl TimeRange {
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    /// Checked constructor; `None` when `start > end`.
    pub fn checked(start: f64, end: f64) -> Option<Self> {
        if start <= end {
            Some(Self { start, end })
        } else {
            None
        }
    }

    /// Length of the interval in milliseconds.
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    /// Check if a given instant lies inside this interval (inclusive start,
    /// exclusive end).
    pub fn contains(&self, instant: f64) -> bool {
        self.start <= instant && instant < self.end
    }

    /// Check if this interval overlaps with another.
    pub fn overlaps(&self, other: &Self) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// Occupied-duration demand of a query: the minimum acceptable duration and
/// the desired one, `0 <= min <= target`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeDuration {
    /// Minimum acceptable occupied duration in milliseconds
    pub min: f64,
    /// Desired occupied duration in milliseconds
    pub target: f64,
}

impl TimeDuration {
    pub fn new(min: f64, target: f64) -> Self {
        Self { min, target }
    }
}

/// Optional bounds used when deriving absolute timestamps from relative
/// offsets; any unset field defaults to the anchor instant itself.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TimeBoundary {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
}

impl TimeBoundary {
    pub fn at(target: f64) -> Self {
        Self {
            min: None,
            target: Some(target),
            max: None,
        }
    }
}

/// Whether placement must fall inside or outside the restricted ranges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RestrictionCondition {
    InRange,
    OutRange,
}

/// A set of recurring relative ranges (hours of day, days of week or decimal
/// months of year, depending on which slot it occupies) plus the condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeRestriction {
    pub condition: RestrictionCondition,
    /// Relative `[from, to]` offsets within the recurring calendar period
    pub ranges: Vec<(f64, f64)>,
}

impl TimeRestriction {
    pub fn new(condition: RestrictionCondition, ranges: Vec<(f64, f64)>) -> Self {
        Self { condition, ranges }
    }
}

/// Per-calendar-unit recurring restrictions; the engine applies them in
/// hour, weekday, month order, each narrowing the candidate windows further.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TimeRestrictions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hour: Option<TimeRestriction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weekday: Option<TimeRestriction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub month: Option<TimeRestriction>,
}

/// Which instant of the target material a link is anchored to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkOrigin {
    Start,
    End,
}

/// Positional dependency tying this query's placement window to an already
/// materialized target, shifted by `distance`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryLink {
    /// Target query
    pub query_id: QueryId,
    /// Target potentiality (materials carry it as `material_id`)
    pub potential_id: u32,
    /// Target split piece, when the target is splittable
    #[serde(skip_serializing_if = "Option::is_none")]
    pub split_id: Option<u32>,
    /// Relative shift applied to the target's origin instant
    pub distance: TimeBoundary,
    /// Anchor instant on the target material
    pub origin: LinkOrigin,
}

/// Whether a query must occupy one contiguous interval or may be cut into
/// pieces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryKind {
    Atomic,
    Splittable,
}

/// Placement demand of a query: optional start/end boundaries plus the
/// duration range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryPosition {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<TimeBoundary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<TimeBoundary>,
    pub duration: TimeDuration,
}

impl QueryPosition {
    pub fn with_duration(duration: TimeDuration) -> Self {
        Self {
            start: None,
            end: None,
            duration,
        }
    }
}

/// A time-bounded work item to place on the timeline. Created once per
/// scheduling request and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Query {
    pub id: QueryId,
    #[serde(default)]
    pub name: String,
    pub kind: QueryKind,
    pub position: QueryPosition,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub links: Option<Vec<QueryLink>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_restrictions: Option<TimeRestrictions>,
}

impl Query {
    pub fn new(id: QueryId, name: impl Into<String>, kind: QueryKind, position: QueryPosition) -> Self {
        Self {
            id,
            name: name.into(),
            kind,
            position,
            links: None,
            time_restrictions: None,
        }
    }

    pub fn with_links(mut self, links: Vec<QueryLink>) -> Self {
        self.links = Some(links);
        self
    }

    pub fn with_time_restrictions(mut self, restrictions: TimeRestrictions) -> Self {
        self.time_restrictions = Some(restrictions);
        self
    }

    pub fn is_splittable(&self) -> bool {
        self.kind == QueryKind::Splittable
    }
}

/// Schedulable timeline bounds for one scheduling run, in epoch milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub start_date: f64,
    pub end_date: f64,
}

impl Config {
    pub fn new(start_date: f64, end_date: f64) -> Self {
        Self {
            start_date,
            end_date,
        }
    }

    pub fn time_range(&self) -> TimeRange {
        TimeRange::new(self.start_date, self.end_date)
    }
}

/// A committed, concrete placement. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Material {
    pub query_id: QueryId,
    /// Potentiality that produced this material
    pub material_id: u32,
    pub start: f64,
    pub end: f64,
    /// Emission order of the piece, for splittable queries
    #[serde(skip_serializing_if = "Option::is_none")]
    pub split_id: Option<u32>,
}

impl Material {
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    pub fn time_range(&self) -> TimeRange {
        TimeRange::new(self.start, self.end)
    }
}

/// Why a query could not be placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictReason {
    /// No candidate duration yields any placement
    NoPlacePossible,
    /// Every viable placement pushes some region's pressure above 1
    PressureOverflow,
}

/// Terminal failure to place one query within feasible pressure bounds.
///
/// Conflicts are collected, not thrown: the engine keeps processing the
/// remaining queries and returns the maximal feasible partial schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conflict {
    pub query_id: QueryId,
    pub reason: ConflictReason,
}

impl Conflict {
    pub fn no_place(query_id: QueryId) -> Self {
        Self {
            query_id,
            reason: ConflictReason::NoPlacePossible,
        }
    }

    pub fn pressure_overflow(query_id: QueryId) -> Self {
        Self {
            query_id,
            reason: ConflictReason::PressureOverflow,
        }
    }
}

impl std::fmt::Display for Conflict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.reason {
            ConflictReason::NoPlacePossible => {
                write!(f, "query {} has no feasible placement", self.query_id)
            }
            ConflictReason::PressureOverflow => write!(
                f,
                "query {} can only be placed by oversubscribing the timeline",
                self.query_id
            ),
        }
    }
}

/// Result of one scheduling run: committed materials plus the queries that
/// could not be placed.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ScheduleOutcome {
    pub materials: Vec<Material>,
    pub conflicts: Vec<Conflict>,
}

impl ScheduleOutcome {
    /// Materials committed for one query, in emission order.
    pub fn materials_for(&self, query_id: QueryId) -> Vec<&Material> {
        self.materials
            .iter()
            .filter(|m| m.query_id == query_id)
            .collect()
    }

    pub fn is_conflicted(&self, query_id: QueryId) -> bool {
        self.conflicts.iter().any(|c| c.query_id == query_id)
    }
}
