//! Planning error types.

use funk_core::{CoreError, ResourceId};
use thiserror::Error;

use crate::distribute::{Distribution, Shortfall};
use crate::query::Mode;

/// Errors returned by the planning engine.
///
/// None of these abort the process; the caller decides whether to stop,
/// ask the user, or carry on with a degraded result.
#[derive(Debug, Error)]
pub enum PlanningError {
    #[error("unknown resource: {0}")]
    UnknownResource(ResourceId),

    #[error("not a cluster: {0}")]
    NotACluster(ResourceId),

    #[error("no slot found for {mode} query")]
    NoSlotFound { mode: Mode },

    #[error("insufficient capacity for {} request(s)", shortfalls.len())]
    InsufficientCapacity {
        shortfalls: Vec<Shortfall>,
        partial: Distribution,
    },

    #[error("invalid query window: start {start} is not before end {end}")]
    InvalidWindow { start: i64, end: i64 },

    #[error("walltime must be positive")]
    InvalidWalltime,

    #[error("ratio must be in (0, 1], got {0}")]
    InvalidRatio(f64),

    #[error(transparent)]
    Core(#[from] CoreError),
}

pub type PlanningResult<T> = Result<T, PlanningError>;
