//! Booking timeline: free capacity over the query window.
//!
//! Every booking contributes a `-quantity` event at its start and a
//! `+quantity` event at its end, against its own resource and each of its
//! ancestors. Sweeping the sorted events yields one breakpoint per
//! distinct timestamp, carrying the free-capacity vector valid until the
//! next breakpoint.

use std::collections::{BTreeMap, BTreeSet};

use funk_core::{Booking, FreeVector, ResourceId, TimeWindow};
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{PlanningError, PlanningResult};
use crate::topology::Topology;

/// Free capacity from `timestamp` until the next breakpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Breakpoint {
    pub timestamp: i64,
    pub free: FreeVector,
}

/// A point where the booking feed starts reserving more than a resource
/// holds, or where the excess changes. The free count is clamped to zero
/// until the excess is gone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Inconsistency {
    pub timestamp: i64,
    pub resource: ResourceId,
    pub deficit: u64,
}

/// Ordered breakpoints spanning exactly `[window.start, window.end]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Timeline {
    pub window: TimeWindow,
    pub breakpoints: Vec<Breakpoint>,
    pub inconsistencies: Vec<Inconsistency>,
}

impl Timeline {
    /// Free capacity in effect at `ts`, if `ts` lies in the window.
    pub fn free_at(&self, ts: i64) -> Option<&FreeVector> {
        if ts < self.window.start || ts >= self.window.end {
            return None;
        }
        let idx = self.breakpoints.partition_point(|b| b.timestamp <= ts);
        self.breakpoints.get(idx.checked_sub(1)?).map(|b| &b.free)
    }
}

#[derive(Debug, Default)]
struct Delta {
    changes: BTreeMap<ResourceId, i64>,
    blackout: i32,
}

/// Build the timeline of `tracked` resources over `window`.
///
/// Bookings are clipped to the window; those outside it are ignored, as
/// are bookings on resources the topology doesn't know (with a warning).
/// Blackout bookings (`out_of_window`) zero every tracked resource over
/// their interval.
pub fn build_timeline(
    window: TimeWindow,
    topology: &Topology,
    tracked: &BTreeSet<ResourceId>,
    bookings: &[Booking],
) -> PlanningResult<Timeline> {
    if !window.is_valid() {
        return Err(PlanningError::InvalidWindow {
            start: window.start,
            end: window.end,
        });
    }

    let mut capacity: BTreeMap<&ResourceId, i64> = BTreeMap::new();
    for id in tracked {
        capacity.insert(id, i64::from(topology.capacity_of(id.as_str())?));
    }

    let mut events: BTreeMap<i64, Delta> = BTreeMap::new();
    events.entry(window.start).or_default();
    events.entry(window.end).or_default();

    for booking in bookings {
        let Some(booking) = booking.clip(&window) else {
            continue;
        };

        if booking.out_of_window {
            events.entry(booking.start).or_default().blackout += 1;
            events.entry(booking.end).or_default().blackout -= 1;
            continue;
        }

        if !topology.contains(booking.resource.as_str()) {
            warn!(resource = %booking.resource, "booking on unknown resource ignored");
            continue;
        }

        let quantity = i64::from(booking.quantity);
        let mut targets = topology.ancestors_of(booking.resource.as_str())?;
        targets.push(booking.resource.clone());
        for target in targets.into_iter().filter(|t| tracked.contains(t)) {
            *events
                .entry(booking.start)
                .or_default()
                .changes
                .entry(target.clone())
                .or_default() -= quantity;
            *events
                .entry(booking.end)
                .or_default()
                .changes
                .entry(target)
                .or_default() += quantity;
        }
    }

    let mut used: BTreeMap<ResourceId, i64> = BTreeMap::new();
    let mut blackout_depth = 0i32;
    let mut breakpoints = Vec::with_capacity(events.len());
    let mut inconsistencies = Vec::new();
    let mut deficits: BTreeMap<&ResourceId, u64> = BTreeMap::new();

    for (timestamp, delta) in events {
        for (id, change) in delta.changes {
            // Stored as consumption, so a booking start (negative delta)
            // raises usage.
            *used.entry(id).or_default() -= change;
        }
        blackout_depth += delta.blackout;

        let mut free = FreeVector::new();
        for (id, cap) in &capacity {
            let value = if blackout_depth > 0 {
                0
            } else {
                let raw = cap - used.get(*id).copied().unwrap_or(0);
                if raw < 0 {
                    let deficit = raw.unsigned_abs();
                    if deficits.insert(*id, deficit) != Some(deficit) {
                        warn!(
                            resource = %id,
                            timestamp,
                            deficit,
                            "booking feed over-commits resource, clamping to zero"
                        );
                        inconsistencies.push(Inconsistency {
                            timestamp,
                            resource: (*id).clone(),
                            deficit,
                        });
                    }
                } else {
                    deficits.remove(*id);
                }
                raw.clamp(0, *cap)
            };
            free.insert((*id).clone(), value as u32);
        }
        breakpoints.push(Breakpoint { timestamp, free });
    }

    debug!(
        breakpoints = breakpoints.len(),
        resources = capacity.len(),
        "timeline built"
    );

    Ok(Timeline {
        window,
        breakpoints,
        inconsistencies,
    })
}
