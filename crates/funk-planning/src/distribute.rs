//! Host distributor: turns aggregate requests ("100 nodes on grid5000",
//! "8 on lyon") into per-cluster counts.
//!
//! Children are filled greedily in descending order of free capacity, so
//! a request tends to land on as few sites and clusters as possible.
//! Specific requests are served before aggregate ones, and every node
//! handed out is removed from the free pool of its ancestors too.

use std::collections::{BTreeMap, BTreeSet};

use funk_core::{FreeVector, Request, ResourceId};
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{PlanningError, PlanningResult};
use crate::topology::{Level, Topology};

/// Concrete allocation: cluster (or standalone counter) → node count.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Distribution {
    pub allocations: BTreeMap<ResourceId, u32>,
}

impl Distribution {
    pub fn get(&self, resource: &str) -> u32 {
        self.allocations.get(resource).copied().unwrap_or(0)
    }

    pub fn total(&self) -> u64 {
        self.allocations.values().map(|n| u64::from(*n)).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.allocations.values().all(|n| *n == 0)
    }

    /// Cluster allocations grouped by site. Standalone counters are left
    /// out.
    pub fn per_site(&self, topology: &Topology) -> BTreeMap<ResourceId, BTreeMap<ResourceId, u32>> {
        let mut out: BTreeMap<ResourceId, BTreeMap<ResourceId, u32>> = BTreeMap::new();
        for (id, count) in &self.allocations {
            if *count == 0 {
                continue;
            }
            if let Ok(site) = topology.site_of(id.as_str()) {
                out.entry(site.clone()).or_default().insert(id.clone(), *count);
            }
        }
        out
    }
}

/// A request the free capacity could not cover.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Shortfall {
    pub resource: ResourceId,
    pub requested: u32,
    pub allocated: u32,
}

struct Pool<'a> {
    topology: &'a Topology,
    excluded: &'a BTreeSet<ResourceId>,
    remaining: FreeVector,
    out: Distribution,
}

impl Pool<'_> {
    fn free(&self, id: &str) -> u32 {
        self.remaining.get(id).copied().unwrap_or(0)
    }

    fn take(&mut self, id: &ResourceId, count: u32) -> PlanningResult<()> {
        if let Some(free) = self.remaining.get_mut(id) {
            *free = free.saturating_sub(count);
        }
        for ancestor in self.topology.ancestors_of(id.as_str())? {
            if let Some(free) = self.remaining.get_mut(&ancestor) {
                *free = free.saturating_sub(count);
            }
        }
        *self.out.allocations.entry(id.clone()).or_default() += count;
        Ok(())
    }

    /// Hand out up to `want` nodes beneath `id`; returns how many were given.
    fn fill(&mut self, id: &ResourceId, want: u32) -> PlanningResult<u32> {
        if want == 0 || self.excluded.contains(id) {
            return Ok(0);
        }

        match self.topology.level_of(id.as_str())? {
            Level::Cluster | Level::Standalone => {
                let given = want.min(self.free(id.as_str()));
                if given > 0 {
                    self.take(id, given)?;
                }
                Ok(given)
            }
            Level::Site | Level::Federation => {
                let budget = want.min(self.free(id.as_str()));
                let mut children = self.topology.children_of(id.as_str())?.to_vec();
                children.sort_by(|a, b| {
                    self.free(b.as_str())
                        .cmp(&self.free(a.as_str()))
                        .then_with(|| a.cmp(b))
                });

                let mut given = 0;
                for child in &children {
                    if given == budget {
                        break;
                    }
                    given += self.fill(child, budget - given)?;
                }
                Ok(given)
            }
        }
    }
}

/// Spread `request` over the clusters of `free`, skipping `excluded`
/// clusters and sites.
///
/// A minimum of 0 takes everything available beneath that resource. When
/// some request can't be met in full, `InsufficientCapacity` carries the
/// partial allocation so the caller can go ahead with less.
pub fn distribute_hosts(
    free: &FreeVector,
    request: &Request,
    topology: &Topology,
    excluded: &BTreeSet<ResourceId>,
) -> PlanningResult<Distribution> {
    let mut ordered: Vec<(&ResourceId, u32, u8)> = Vec::with_capacity(request.len());
    for (id, wanted) in request.iter() {
        let depth = topology.level_of(id.as_str())?.depth();
        ordered.push((id, wanted, depth));
    }
    ordered.sort_by(|a, b| b.2.cmp(&a.2).then_with(|| a.0.cmp(b.0)));

    let mut pool = Pool {
        topology,
        excluded,
        remaining: free.clone(),
        out: Distribution::default(),
    };
    let mut shortfalls = Vec::new();

    for (id, wanted, _) in ordered {
        if excluded.contains(id) {
            debug!(resource = %id, "requested resource is blacklisted, skipping");
            continue;
        }
        let target = if wanted == 0 { u32::MAX } else { wanted };
        let allocated = pool.fill(id, target)?;
        debug!(resource = %id, wanted, allocated, "distributed request");

        if wanted > 0 && allocated < wanted {
            warn!(resource = %id, wanted, allocated, "not enough free nodes");
            shortfalls.push(Shortfall {
                resource: id.clone(),
                requested: wanted,
                allocated,
            });
        }
    }

    let mut distribution = pool.out;
    distribution.allocations.retain(|_, n| *n > 0);

    if shortfalls.is_empty() {
        Ok(distribution)
    } else {
        Err(PlanningError::InsufficientCapacity {
            shortfalls,
            partial: distribution,
        })
    }
}
