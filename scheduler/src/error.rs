//! Error types for scheduling runs.
//!
//! Input-shape problems fail fast with a typed error. Placement failures are
//! not errors: they are [`crate::api::Conflict`] values collected alongside
//! the materials so a run always yields the maximal feasible partial schedule.

use crate::api::QueryId;

/// Result type for scheduling operations
pub type SchedulerResult<T> = Result<T, SchedulerError>;

/// Error type for scheduling operations
#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    /// The timeline bounds are unusable.
    #[error("Invalid config: {message}")]
    InvalidConfig { message: String },

    /// A query document violates the input contract.
    #[error("Invalid query {query_id}: {message}")]
    InvalidQuery { query_id: QueryId, message: String },

    /// The link graph contains a cycle; no materialization order exists.
    #[error("Cyclic link dependency among queries {query_ids:?}")]
    CyclicLinks { query_ids: Vec<QueryId> },
}

impl SchedulerError {
    /// Create an invalid-config error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Create an invalid-query error.
    pub fn invalid_query(query_id: QueryId, message: impl Into<String>) -> Self {
        Self::InvalidQuery {
            query_id,
            message: message.into(),
        }
    }

    /// Create a cyclic-links error.
    pub fn cyclic_links(query_ids: Vec<QueryId>) -> Self {
        Self::CyclicLinks { query_ids }
    }
}
