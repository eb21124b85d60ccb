//! Shared types used across Funk crates.
//!
//! These are the normalized inputs of one planning run: the resource
//! names, the booking feed, the query window and the user's request.
//! All of them serialize to/from the JSON inventory format.

use std::borrow::Borrow;
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// Name of a schedulable unit: the federation, a site, a cluster or a
/// standalone counter such as `kavlan`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceId(String);

impl ResourceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for ResourceId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ResourceId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ResourceId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Free node count per resource, ordered by resource name.
pub type FreeVector = BTreeMap<ResourceId, u32>;

// ── Time ───────────────────────────────────────────────────────────

/// Half-open planning window `[start, end)` in Unix seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: i64,
    pub end: i64,
}

impl TimeWindow {
    pub fn new(start: i64, end: i64) -> Self {
        Self { start, end }
    }

    pub fn is_valid(&self) -> bool {
        self.start < self.end
    }

    pub fn duration(&self) -> i64 {
        self.end - self.start
    }

    /// Intersection of `[start, end)` with this window, if non-empty.
    pub fn clip(&self, start: i64, end: i64) -> Option<(i64, i64)> {
        let from = start.max(self.start);
        let to = end.min(self.end);
        (from < to).then_some((from, to))
    }
}

// ── Bookings ───────────────────────────────────────────────────────

/// An existing reservation of `quantity` nodes on `resource` over
/// `[start, end)`.
///
/// `out_of_window` bookings are blackouts: they make every tracked
/// resource unavailable over their interval, whatever `quantity` says.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
    pub resource: ResourceId,
    pub start: i64,
    pub end: i64,
    #[serde(default)]
    pub quantity: u32,
    #[serde(default)]
    pub out_of_window: bool,
}

impl Booking {
    pub fn new(resource: impl Into<ResourceId>, start: i64, end: i64, quantity: u32) -> Self {
        Self {
            resource: resource.into(),
            start,
            end,
            quantity,
            out_of_window: false,
        }
    }

    /// A blackout over `[start, end)` attached to `resource` (usually the
    /// federation).
    pub fn blackout(resource: impl Into<ResourceId>, start: i64, end: i64) -> Self {
        Self {
            resource: resource.into(),
            start,
            end,
            quantity: 0,
            out_of_window: true,
        }
    }

    pub fn validate(&self) -> CoreResult<()> {
        if self.start >= self.end {
            return Err(CoreError::Booking {
                resource: self.resource.to_string(),
                reason: format!("start {} is not before end {}", self.start, self.end),
            });
        }
        if self.quantity == 0 && !self.out_of_window {
            return Err(CoreError::Booking {
                resource: self.resource.to_string(),
                reason: "quantity must be positive".to_string(),
            });
        }
        Ok(())
    }

    /// This booking restricted to `window`, or `None` when they don't
    /// overlap.
    pub fn clip(&self, window: &TimeWindow) -> Option<Booking> {
        let (start, end) = window.clip(self.start, self.end)?;
        Some(Booking {
            start,
            end,
            ..self.clone()
        })
    }
}

// ── Topology description ───────────────────────────────────────────

fn default_federation() -> String {
    "grid5000".to_string()
}

/// Site → cluster → node count, as delivered by the inventory service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopologySpec {
    #[serde(default = "default_federation")]
    pub federation: String,
    #[serde(default)]
    pub sites: BTreeMap<String, BTreeMap<String, u32>>,
    /// Counters outside the node hierarchy (e.g. `kavlan`).
    #[serde(default)]
    pub standalone: BTreeMap<String, u32>,
}

impl Default for TopologySpec {
    fn default() -> Self {
        Self {
            federation: default_federation(),
            sites: BTreeMap::new(),
            standalone: BTreeMap::new(),
        }
    }
}

/// Topology plus booking feed for one planning run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Inventory {
    pub topology: TopologySpec,
    #[serde(default)]
    pub bookings: Vec<Booking>,
}

impl Inventory {
    pub fn from_file(path: &Path) -> CoreResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    pub fn from_json_str(content: &str) -> CoreResult<Self> {
        let inventory: Inventory = serde_json::from_str(content)?;
        for booking in &inventory.bookings {
            booking.validate()?;
        }
        Ok(inventory)
    }
}

// ── Requests ───────────────────────────────────────────────────────

/// Requested resources: resource → minimum node count.
///
/// A minimum of 0 means "any amount": the resource is reported and
/// distributed, but never constrains slot selection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Request(BTreeMap<ResourceId, u32>);

impl Request {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, resource: impl Into<ResourceId>, minimum: u32) -> Self {
        self.insert(resource, minimum);
        self
    }

    pub fn insert(&mut self, resource: impl Into<ResourceId>, minimum: u32) {
        self.0.insert(resource.into(), minimum);
    }

    pub fn get(&self, resource: &str) -> Option<u32> {
        self.0.get(resource).copied()
    }

    pub fn contains(&self, resource: &str) -> bool {
        self.0.contains_key(resource)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ResourceId, u32)> {
        self.0.iter().map(|(id, n)| (id, *n))
    }

    pub fn resources(&self) -> impl Iterator<Item = &ResourceId> {
        self.0.keys()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when at least one resource carries a non-zero minimum.
    pub fn has_minimums(&self) -> bool {
        self.0.values().any(|n| *n > 0)
    }

    /// Same resources with every minimum reset to 0.
    pub fn without_minimums(&self) -> Self {
        Self(self.0.keys().map(|id| (id.clone(), 0)).collect())
    }
}

/// Parses `element[:n],element[:n],...`.
impl FromStr for Request {
    type Err = CoreError;

    fn from_str(s: &str) -> CoreResult<Self> {
        let mut request = Request::new();
        for element in s.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let (name, count) = match element.split_once(':') {
                Some((name, count)) => {
                    let count = count.trim().parse::<u32>().map_err(|_| {
                        CoreError::Request(format!("bad node count in '{element}'"))
                    })?;
                    (name.trim(), count)
                }
                None => (element, 0),
            };
            if name.is_empty() {
                return Err(CoreError::Request(format!("missing resource name in '{element}'")));
            }
            request.insert(name, count);
        }
        if request.is_empty() {
            return Err(CoreError::Request("no resources given".to_string()));
        }
        Ok(request)
    }
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .iter()
            .map(|(id, n)| if n > 0 { format!("{id}:{n}") } else { id.to_string() })
            .collect();
        f.write_str(&parts.join(","))
    }
}
