//! Post-selection adjustments.
//!
//! These run after a slot has been chosen and hosts distributed: they
//! change how much is reserved, never which slot is picked.

use crate::distribute::Distribution;
use crate::error::{PlanningError, PlanningResult};
use crate::topology::{Level, Topology};

/// Scale every cluster allocation by `ratio` (in `(0, 1]`), rounding
/// down. Clusters that drop to zero are removed; standalone counters
/// such as `kavlan` are kept as they are.
pub fn apply_ratio(
    distribution: &Distribution,
    topology: &Topology,
    ratio: f64,
) -> PlanningResult<Distribution> {
    if !(ratio > 0.0 && ratio <= 1.0) {
        return Err(PlanningError::InvalidRatio(ratio));
    }

    let mut allocations = distribution.allocations.clone();
    for (id, n) in allocations.iter_mut() {
        if topology.level_of(id.as_str())? == Level::Cluster {
            *n = (f64::from(*n) * ratio).floor() as u32;
        }
    }
    allocations.retain(|_, n| *n > 0);

    Ok(Distribution { allocations })
}
