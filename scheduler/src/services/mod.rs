//! Service layer: the placement engine proper.
//!
//! Leaf-first: restriction expansion and potentiality generation feed the
//! pressure model, the materializer consumes both, and the scheduler drives
//! the sequential pipeline over a whole query set.

pub mod materializer;
pub mod potentials;
pub mod pressure;
pub mod restrictions;
pub mod scheduler;


pub use materializer::{materialize_potentiality, simulate_placement};
pub use potentials::{atomic_to_potentiality, link_to_mask, Potentiality};
pub use pressure::{
    compute_pressure, compute_pressure_area, compute_pressure_chunks, update_potentials_pressure,
    PressureChunk,
};
pub use restrictions::restriction_masks;
pub use scheduler::schedule;
