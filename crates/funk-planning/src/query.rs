//! Slot query engine: the three planning modes.
//!
//! - **date**: first slot long enough for the walltime that meets every
//!   non-zero minimum and has a free node on the resources asked for
//!   without a count
//! - **free**: every slot meeting the full combination, earliest first
//! - **max**: the slot with the most free nodes over the requested
//!   resources, earliest on ties
//!
//! Queries only read the compiled [`SlotSet`], so several can run at
//! once against the same set.

use std::fmt;
use std::str::FromStr;

use funk_core::Request;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{PlanningError, PlanningResult};
use crate::slots::{Slot, SlotSet};

/// Query mode, chosen by the caller instead of a separate tool per mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    #[default]
    Date,
    Free,
    Max,
}

impl Mode {
    pub const ALL: [Mode; 3] = [Mode::Date, Mode::Free, Mode::Max];

    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Date => "date",
            Mode::Free => "free",
            Mode::Max => "max",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "date" => Ok(Mode::Date),
            "free" => Ok(Mode::Free),
            "max" => Ok(Mode::Max),
            other => Err(format!("unknown mode '{other}' (expected date, free or max)")),
        }
    }
}

fn long_enough(slot: &Slot, walltime: u64) -> bool {
    slot.duration() >= walltime
}

/// First slot at least `walltime` long that the request fits, see
/// [`Slot::admits`].
pub fn find_first<'a>(slots: &'a [Slot], request: &Request, walltime: u64) -> Option<&'a Slot> {
    slots
        .iter()
        .find(|s| long_enough(s, walltime) && s.admits(request))
}

/// Slot maximizing the free total over the requested resources, among
/// those at least `walltime` long. Minimums are not enforced.
pub fn find_max<'a>(slots: &'a [Slot], request: &Request, walltime: u64) -> Option<&'a Slot> {
    let mut best: Option<(&Slot, u64)> = None;
    for slot in slots.iter().filter(|s| long_enough(s, walltime)) {
        let total = slot.total(request);
        // Strict comparison keeps the earliest slot on ties.
        if best.is_none_or(|(_, t)| total > t) {
            best = Some((slot, total));
        }
    }
    best.map(|(slot, _)| slot)
}

/// Every slot at least `walltime` long in which the whole combination
/// fits, in chronological order. Each slot is judged on its own vector.
pub fn find_free<'a>(slots: &'a [Slot], request: &Request, walltime: u64) -> Vec<&'a Slot> {
    slots
        .iter()
        .filter(|s| long_enough(s, walltime) && s.satisfies(request))
        .collect()
}

/// Result of one query: the chosen slot and, in free mode, every
/// qualifying alternative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueryOutcome {
    pub mode: Mode,
    pub walltime: u64,
    pub chosen: Option<Slot>,
    pub candidates: Vec<Slot>,
}

impl QueryOutcome {
    /// The chosen slot, or `NoSlotFound`.
    pub fn require(&self) -> PlanningResult<&Slot> {
        self.chosen
            .as_ref()
            .ok_or(PlanningError::NoSlotFound { mode: self.mode })
    }
}

/// Runs queries against one compiled slot set.
#[derive(Debug, Clone, Copy)]
pub struct QueryEngine<'a> {
    slots: &'a SlotSet,
}

impl<'a> QueryEngine<'a> {
    pub fn new(slots: &'a SlotSet) -> Self {
        Self { slots }
    }

    pub fn run(&self, mode: Mode, request: &Request, walltime: u64) -> PlanningResult<QueryOutcome> {
        if walltime == 0 {
            return Err(PlanningError::InvalidWalltime);
        }

        let slots = self.slots.slots();
        let (chosen, candidates) = match mode {
            Mode::Date => {
                let first = find_first(slots, request, walltime).cloned();
                let candidates = first.iter().cloned().collect();
                (first, candidates)
            }
            Mode::Max => {
                let best = find_max(slots, request, walltime).cloned();
                let candidates = best.iter().cloned().collect();
                (best, candidates)
            }
            Mode::Free => {
                let all: Vec<Slot> = find_free(slots, request, walltime)
                    .into_iter()
                    .cloned()
                    .collect();
                (all.first().cloned(), all)
            }
        };

        debug!(
            mode = %mode,
            walltime,
            found = chosen.is_some(),
            candidates = candidates.len(),
            "query evaluated"
        );

        Ok(QueryOutcome {
            mode,
            walltime,
            chosen,
            candidates,
        })
    }

    /// Evaluate all three modes side by side, one thread per mode.
    pub fn compare(&self, request: &Request, walltime: u64) -> PlanningResult<Vec<QueryOutcome>> {
        std::thread::scope(|scope| {
            let handles: Vec<_> = Mode::ALL
                .into_iter()
                .map(|mode| scope.spawn(move || self.run(mode, request, walltime)))
                .collect();
            handles
                .into_iter()
                .map(|h| match h.join() {
                    Ok(outcome) => outcome,
                    Err(panic) => std::panic::resume_unwind(panic),
                })
                .collect()
        })
    }
}
