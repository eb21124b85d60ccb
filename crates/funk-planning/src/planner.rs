//! Planner: runs the whole pipeline for one request.
//!
//! The planner holds the immutable inputs of a run (topology and booking
//! feed). Each call to [`Planner::plan`] rebuilds the timeline from
//! scratch; nothing is cached between calls.

use std::collections::BTreeSet;

use chrono::TimeZone;
use funk_core::{Booking, FreeVector, Inventory, Request, ResourceId, TimeWindow};
use serde::Serialize;
use tracing::{debug, info};

use crate::adjust::apply_ratio;
use crate::charter::charter_blackouts;
use crate::distribute::{Distribution, Shortfall, distribute_hosts};
use crate::error::{PlanningError, PlanningResult};
use crate::query::{Mode, QueryEngine, QueryOutcome};
use crate::slots::SlotSet;
use crate::timeline::{Timeline, build_timeline};
use crate::topology::Topology;

/// What to plan for.
#[derive(Debug, Clone, Serialize)]
pub struct PlanRequest {
    pub window: TimeWindow,
    pub mode: Mode,
    pub request: Request,
    /// Seconds.
    pub walltime: u64,
    /// Treat usage-charter hours as blackouts.
    pub charter: bool,
    /// Clusters or sites that must not receive nodes.
    pub blacklist: BTreeSet<ResourceId>,
    pub ratio: Option<f64>,
}

impl PlanRequest {
    pub fn new(window: TimeWindow, mode: Mode, request: Request, walltime: u64) -> Self {
        Self {
            window,
            mode,
            request,
            walltime,
            charter: false,
            blacklist: BTreeSet::new(),
            ratio: None,
        }
    }

    pub fn with_charter(mut self, charter: bool) -> Self {
        self.charter = charter;
        self
    }

    pub fn with_blacklist(mut self, blacklist: impl IntoIterator<Item = ResourceId>) -> Self {
        self.blacklist = blacklist.into_iter().collect();
        self
    }

    pub fn with_ratio(mut self, ratio: Option<f64>) -> Self {
        self.ratio = ratio;
        self
    }
}

/// Everything one run produced.
#[derive(Debug, Clone, Serialize)]
pub struct PlanReport {
    pub mode: Mode,
    pub request: Request,
    pub timeline: Timeline,
    pub slots: SlotSet,
    pub outcome: QueryOutcome,
    /// Free counts of the requested resources in the chosen slot.
    pub available: Option<FreeVector>,
    pub distribution: Option<Distribution>,
    pub shortfalls: Vec<Shortfall>,
}

#[derive(Debug, Clone)]
pub struct Planner {
    topology: Topology,
    bookings: Vec<Booking>,
}

impl Planner {
    pub fn new(topology: Topology, bookings: Vec<Booking>) -> Self {
        Self { topology, bookings }
    }

    pub fn from_inventory(inventory: &Inventory) -> PlanningResult<Self> {
        let topology = Topology::from_spec(&inventory.topology)?;
        Ok(Self::new(topology, inventory.bookings.clone()))
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    pub fn bookings(&self) -> &[Booking] {
        &self.bookings
    }

    fn validate(&self, req: &PlanRequest) -> PlanningResult<()> {
        if !req.window.is_valid() {
            return Err(PlanningError::InvalidWindow {
                start: req.window.start,
                end: req.window.end,
            });
        }
        if req.walltime == 0 {
            return Err(PlanningError::InvalidWalltime);
        }
        if let Some(ratio) = req.ratio {
            if !(ratio > 0.0 && ratio <= 1.0) {
                return Err(PlanningError::InvalidRatio(ratio));
            }
        }
        self.topology.validate_request(&req.request)?;
        for id in &req.blacklist {
            self.topology.level_of(id.as_str())?;
        }
        Ok(())
    }

    /// Timeline of the requested resources and everything beneath them.
    pub fn timeline<Tz: TimeZone>(&self, req: &PlanRequest, tz: &Tz) -> PlanningResult<Timeline> {
        self.validate(req)?;
        let tracked = self.topology.closure(req.request.resources())?;

        let blackouts = if req.charter {
            charter_blackouts(req.window, self.topology.federation(), tz)
        } else {
            Vec::new()
        };
        debug!(
            bookings = self.bookings.len(),
            blackouts = blackouts.len(),
            tracked = tracked.len(),
            "building timeline"
        );

        let mut bookings = Vec::with_capacity(self.bookings.len() + blackouts.len());
        bookings.extend(self.bookings.iter().cloned());
        bookings.extend(blackouts);
        build_timeline(req.window, &self.topology, &tracked, &bookings)
    }

    /// Build, compile, query, distribute and adjust.
    ///
    /// An empty query result is not an error: the report's outcome has no
    /// chosen slot and no distribution.
    pub fn plan<Tz: TimeZone>(&self, req: &PlanRequest, tz: &Tz) -> PlanningResult<PlanReport> {
        let timeline = self.timeline(req, tz)?;
        let slots = SlotSet::compile(&timeline);
        let outcome = QueryEngine::new(&slots).run(req.mode, &req.request, req.walltime)?;

        let mut available = None;
        let mut distribution = None;
        let mut shortfalls = Vec::new();

        if let Some(chosen) = &outcome.chosen {
            info!(mode = %req.mode, from = chosen.from, to = chosen.to, "slot found");
            available = Some(
                chosen
                    .free
                    .iter()
                    .filter(|(id, _)| req.request.contains(id.as_str()))
                    .map(|(id, n)| (id.clone(), *n))
                    .collect(),
            );

            let distributed =
                match distribute_hosts(&chosen.free, &req.request, &self.topology, &req.blacklist) {
                    Ok(d) => d,
                    Err(PlanningError::InsufficientCapacity {
                        shortfalls: missing,
                        partial,
                    }) => {
                        shortfalls = missing;
                        partial
                    }
                    Err(e) => return Err(e),
                };

            distribution = Some(match req.ratio {
                Some(ratio) => apply_ratio(&distributed, &self.topology, ratio)?,
                None => distributed,
            });
        } else {
            info!(mode = %req.mode, "no slot matches the request");
        }

        Ok(PlanReport {
            mode: req.mode,
            request: req.request.clone(),
            timeline,
            slots,
            outcome,
            available,
            distribution,
            shortfalls,
        })
    }
}
