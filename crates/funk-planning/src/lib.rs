//! Funk planning engine: finds reservable windows on a federated testbed.
//!
//! This crate turns a topology and a feed of existing bookings into
//! scheduling answers. It owns no I/O: the inventory is fetched and the
//! reservation is submitted by the caller.
//!
//! # Pipeline
//!
//! ```text
//! Topology + bookings
//!   └── timeline   (breakpoints with free-capacity vectors)
//!       └── slots  (maximal constant-capacity windows)
//!           └── query       (date / free / max modes)
//!               └── distribute  (aggregate request → per-cluster counts)
//!                   └── adjust, submission  (ratio, job specs, oarsub text)
//! ```
//!
//! [`Planner`] runs the whole chain; every stage is public so callers can
//! reuse one compiled [`SlotSet`] across several query modes.

pub mod adjust;
pub mod charter;
pub mod distribute;
pub mod error;
pub mod planner;
pub mod query;
pub mod slots;
pub mod submission;
pub mod timeline;
pub mod topology;

pub use adjust::apply_ratio;
pub use charter::charter_blackouts;
pub use distribute::{Distribution, Shortfall, distribute_hosts};
pub use error::{PlanningError, PlanningResult};
pub use planner::{PlanReport, PlanRequest, Planner};
pub use query::{Mode, QueryEngine, QueryOutcome, find_first, find_free, find_max};
pub use slots::{Slot, SlotSet};
pub use submission::{JobSpec, SubmissionOptions, job_specs, parse_subnets, submission_command};
pub use timeline::{Breakpoint, Inconsistency, Timeline, build_timeline};
pub use topology::{Level, Topology};
