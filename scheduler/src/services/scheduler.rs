//! Scheduling pipeline.
//!
//! A run validates the input, orders queries so link targets materialize
//! before their dependents, then places queries one at a time: each
//! materialization consumes shared space, so every remaining potentiality is
//! refreshed against the committed materials before the next placement.
//! Conflicts are collected, never thrown; the caller always receives the
//! maximal feasible partial schedule.

use std::collections::{BTreeSet, HashMap, HashSet};

use crate::api::{Config, Conflict, Material, Query, QueryId, ScheduleOutcome, TimeBoundary, TimeRange};
use crate::error::{SchedulerError, SchedulerResult};
use crate::services::materializer::materialize_potentiality;
use crate::services::potentials::{atomic_to_potentiality, link_to_mask, Potentiality};
use crate::services::pressure::{compute_pressure_chunks, update_potentials_pressure};
use crate::services::restrictions::restriction_masks;

/// Run one scheduling pass over the queries.
///
/// # Arguments
///
/// * `config` - Schedulable timeline bounds
/// * `queries` - Query list from the authoring layer
///
/// # Returns
///
/// The committed materials plus a conflict per unplaceable query, or a typed
/// error when the input itself is unusable (malformed durations, unknown or
/// cyclic link targets).
pub fn schedule(config: &Config, queries: &[Query]) -> SchedulerResult<ScheduleOutcome> {
    validate_config(config)?;
    validate_queries(queries)?;
    let order = dependency_order(queries)?;

    let masks_by_query: Vec<Vec<TimeRange>> = queries
        .iter()
        .map(|q| restriction_masks(config.time_range(), q.time_restrictions.as_ref()))
        .collect();

    let mut committed: Vec<Material> = Vec::new();
    let mut conflicts: Vec<Conflict> = Vec::new();

    for (step, &index) in order.iter().enumerate() {
        let query = &queries[index];
        let potentiality =
            refreshed_potentiality(config, query, &masks_by_query[index], &committed);
        if potentiality.places.is_empty() {
            log::debug!("query {}: no candidate window, conflicted", query.id);
            conflicts.push(Conflict::no_place(query.id));
            continue;
        }

        // Everything still waiting that could compete for the same space.
        let competitors: Vec<usize> = order[step + 1..]
            .iter()
            .copied()
            .filter(|&j| is_placeable(&queries[j], &committed))
            .collect();
        let field: Vec<Potentiality> = competitors
            .iter()
            .map(|&j| refreshed_potentiality(config, &queries[j], &masks_by_query[j], &committed))
            .collect();
        let chunks = compute_pressure_chunks(config, &field);

        let refresh = |candidates: &[Material]| -> Vec<Potentiality> {
            let mut all = committed.clone();
            all.extend_from_slice(candidates);
            competitors
                .iter()
                .map(|&j| refreshed_potentiality(config, &queries[j], &masks_by_query[j], &all))
                .collect()
        };

        let result = materialize_potentiality(&potentiality, refresh, &chunks);
        match result {
            Ok(materials) => {
                log::debug!("query {}: placed {} material(s)", query.id, materials.len());
                committed.extend(materials);
            }
            Err(conflict) => {
                log::debug!("query {}: {}", query.id, conflict);
                conflicts.push(conflict);
            }
        }
    }

    committed.sort_by(|a, b| {
        a.start
            .partial_cmp(&b.start)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.query_id.cmp(&b.query_id))
            .then(a.split_id.cmp(&b.split_id))
    });
    Ok(ScheduleOutcome {
        materials: committed,
        conflicts,
    })
}

/// Build a query's potentiality against the current materials: restriction
/// and link masks folded in, pressure recomputed.
fn refreshed_potentiality(
    config: &Config,
    query: &Query,
    restriction_mask: &[TimeRange],
    materials: &[Material],
) -> Potentiality {
    let masks = vec![
        restriction_mask.to_vec(),
        link_to_mask(materials, config, query),
    ];
    let potentiality = atomic_to_potentiality(config, query);
    update_potentials_pressure(config, &query.position, &potentiality, materials, &masks)
}

/// A query is placeable once every link target has materialized.
fn is_placeable(query: &Query, materials: &[Material]) -> bool {
    match &query.links {
        None => true,
        Some(links) => links.iter().all(|link| {
            materials.iter().any(|m| {
                m.query_id == link.query_id
                    && m.material_id == link.potential_id
                    && m.split_id == link.split_id
            })
        }),
    }
}

/// Topological order over the link graph (target before dependent), with
/// original query order as the deterministic tie-break.
fn dependency_order(queries: &[Query]) -> SchedulerResult<Vec<usize>> {
    let index_of: HashMap<QueryId, usize> = queries
        .iter()
        .enumerate()
        .map(|(i, q)| (q.id, i))
        .collect();

    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); queries.len()];
    let mut in_degree = vec![0usize; queries.len()];
    for (i, query) in queries.iter().enumerate() {
        if let Some(links) = &query.links {
            for link in links {
                // Validation guarantees the target exists.
                let target = index_of[&link.query_id];
                dependents[target].push(i);
                in_degree[i] += 1;
            }
        }
    }

    let mut ready: BTreeSet<usize> = in_degree
        .iter()
        .enumerate()
        .filter(|(_, &d)| d == 0)
        .map(|(i, _)| i)
        .collect();
    let mut order = Vec::with_capacity(queries.len());
    while let Some(next) = ready.pop_first() {
        order.push(next);
        for &dependent in &dependents[next] {
            in_degree[dependent] -= 1;
            if in_degree[dependent] == 0 {
                ready.insert(dependent);
            }
        }
    }

    if order.len() < queries.len() {
        let stuck: Vec<QueryId> = (0..queries.len())
            .filter(|i| !order.contains(i))
            .map(|i| queries[i].id)
            .collect();
        return Err(SchedulerError::cyclic_links(stuck));
    }
    Ok(order)
}

fn validate_config(config: &Config) -> SchedulerResult<()> {
    if !(config.start_date < config.end_date) {
        return Err(SchedulerError::invalid_config(format!(
            "start_date {} must precede end_date {}",
            config.start_date, config.end_date
        )));
    }
    Ok(())
}

fn check_boundary(boundary: &TimeBoundary, field: &str) -> Result<(), String> {
    let TimeBoundary { min, target, max } = *boundary;
    if let (Some(min), Some(target)) = (min, target) {
        if min > target {
            return Err(format!("{field}.min exceeds {field}.target"));
        }
    }
    if let (Some(target), Some(max)) = (target, max) {
        if target > max {
            return Err(format!("{field}.target exceeds {field}.max"));
        }
    }
    if let (Some(min), Some(max)) = (min, max) {
        if min > max {
            return Err(format!("{field}.min exceeds {field}.max"));
        }
    }
    Ok(())
}

fn validate_queries(queries: &[Query]) -> SchedulerResult<()> {
    let mut ids: HashSet<QueryId> = HashSet::with_capacity(queries.len());
    for query in queries {
        if !ids.insert(query.id) {
            return Err(SchedulerError::invalid_query(query.id, "duplicate query id"));
        }
    }

    for query in queries {
        let invalid = |message: String| SchedulerError::invalid_query(query.id, message);

        let duration = query.position.duration;
        if !(duration.min >= 0.0) {
            return Err(invalid("duration.min must be non-negative".into()));
        }
        if !(duration.target >= duration.min) {
            return Err(invalid("duration.min exceeds duration.target".into()));
        }
        if !(duration.target > 0.0) {
            return Err(invalid("duration.target must be positive".into()));
        }
        if let Some(start) = &query.position.start {
            check_boundary(start, "start").map_err(|m| invalid(m))?;
        }
        if let Some(end) = &query.position.end {
            check_boundary(end, "end").map_err(|m| invalid(m))?;
        }

        if let Some(restrictions) = &query.time_restrictions {
            for restriction in [
                restrictions.hour.as_ref(),
                restrictions.weekday.as_ref(),
                restrictions.month.as_ref(),
            ]
            .into_iter()
            .flatten()
            {
                for &(from, to) in &restriction.ranges {
                    if !(from >= 0.0 && from <= to) {
                        return Err(invalid(format!(
                            "restriction range [{from}, {to}] is not ordered"
                        )));
                    }
                }
            }
        }

        if let Some(links) = &query.links {
            for link in links {
                if !ids.contains(&link.query_id) {
                    return Err(invalid(format!(
                        "link targets unknown query {}",
                        link.query_id
                    )));
                }
                check_boundary(&link.distance, "distance").map_err(|m| invalid(m))?;
            }
        }
    }
    Ok(())
}
