//! Slot compiler: groups breakpoints into maximal windows of constant
//! free capacity.
//!
//! Slots are kept whatever their length; the walltime filter belongs to
//! the query engine so one compiled set can serve every query mode.

use funk_core::{FreeVector, Request, TimeWindow};
use serde::Serialize;

use crate::timeline::Timeline;

/// Half-open window `[from, to)` with a constant free-capacity vector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Slot {
    pub from: i64,
    pub to: i64,
    pub free: FreeVector,
}

impl Slot {
    pub fn duration(&self) -> u64 {
        (self.to - self.from).max(0) as u64
    }

    pub fn free_of(&self, resource: &str) -> u32 {
        self.free.get(resource).copied().unwrap_or(0)
    }

    /// Every non-zero minimum in `request` is met.
    pub fn satisfies(&self, request: &Request) -> bool {
        request
            .iter()
            .filter(|(_, min)| *min > 0)
            .all(|(id, min)| self.free_of(id.as_str()) >= min)
    }

    /// Date-mode test: every non-zero minimum is met and, when the request
    /// names resources with a minimum of 0, at least one of them has a free
    /// node. Counters asked for explicitly (`kavlan:1`) don't count as free
    /// nodes.
    pub fn admits(&self, request: &Request) -> bool {
        if !self.satisfies(request) {
            return false;
        }
        let mut open = request.iter().filter(|(_, min)| *min == 0).peekable();
        open.peek().is_none() || open.any(|(id, _)| self.free_of(id.as_str()) > 0)
    }

    /// Sum of free counts over the requested resources.
    pub fn total(&self, request: &Request) -> u64 {
        request
            .resources()
            .map(|id| u64::from(self.free_of(id.as_str())))
            .sum()
    }
}

/// Ordered slots partitioning the timeline's window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SlotSet {
    pub window: TimeWindow,
    slots: Vec<Slot>,
}

impl SlotSet {
    /// Pair each breakpoint with the next, then merge neighbours whose
    /// vectors are equal.
    pub fn compile(timeline: &Timeline) -> Self {
        let mut slots: Vec<Slot> = Vec::new();
        for pair in timeline.breakpoints.windows(2) {
            let (bp, next) = (&pair[0], &pair[1]);
            match slots.last_mut() {
                Some(last) if last.free == bp.free => last.to = next.timestamp,
                _ => slots.push(Slot {
                    from: bp.timestamp,
                    to: next.timestamp,
                    free: bp.free.clone(),
                }),
            }
        }
        Self {
            window: timeline.window,
            slots,
        }
    }

    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Slot> {
        self.slots.iter()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

impl<'a> IntoIterator for &'a SlotSet {
    type Item = &'a Slot;
    type IntoIter = std::slice::Iter<'a, Slot>;

    fn into_iter(self) -> Self::IntoIter {
        self.slots.iter()
    }
}
