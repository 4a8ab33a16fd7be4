//! # autosched
//!
//! Pressure-based placement engine for time-bounded work items.
//!
//! Given a set of queries, each with a duration range, optional fixed
//! boundaries, optional splittability, recurring calendar restrictions and
//! positional links to other queries, the engine decides concrete
//! `[start, end)` intervals on a shared timeline that satisfy all constraints
//! simultaneously, or reports which queries cannot be placed.
//!
//! ## Features
//!
//! - **Data Loading**: Parse query documents from JSON format
//! - **Potentialities**: Derive candidate placement windows from boundaries,
//!   recurring restrictions and links
//! - **Pressure Model**: Fold competing demands into a piecewise-linear
//!   pressure function over the timeline
//! - **Materialization**: Equilibrium search balancing each query's demand
//!   against everything its placement would displace
//! - **Conflict Reporting**: Unplaceable queries surface as collected values,
//!   never as control-flow errors
//!
//! ## Architecture
//!
//! The crate is organized into several logical modules:
//!
//! - [`api`]: Input/output data model (queries, materials, conflicts)
//! - [`error`]: Typed errors for unusable input
//! - [`models`]: Interval algebra, calendar arithmetic and JSON parsing
//! - [`services`]: The placement engine and its run pipeline
//!
//! A whole run is a pure, synchronous, in-memory computation: no persistence,
//! no network I/O, no background tasks.

pub mod api;
pub mod error;
pub mod models;
pub mod services;

pub use api::{Config, Conflict, Material, Query, QueryId, ScheduleOutcome};
pub use error::{SchedulerError, SchedulerResult};
pub use services::schedule;
