//! Invariants checked over a deterministic family of booking feeds.

use std::collections::BTreeSet;

use chrono::Utc;
use funk_core::*;
use funk_planning::*;

const HOUR: i64 = 3600;
const WINDOW: TimeWindow = TimeWindow { start: 10 * HOUR, end: 10 * HOUR + 7 * 24 * HOUR };
const FEEDS: u64 = 40;

/// Linear congruential generator for reproducible feeds.
struct Lcg(u64);

impl Lcg {
    fn next(&mut self) -> u64 {
        self.0 = self.0.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(1_442_695_040_888_963_407);
        self.0 >> 33
    }

    fn below(&mut self, n: u64) -> u64 {
        self.next() % n
    }
}

fn make_topology() -> Topology {
    let mut spec = TopologySpec {
        federation: "fed".to_string(),
        ..Default::default()
    };
    spec.sites.insert(
        "siteA".to_string(),
        [("a1".to_string(), 30), ("a2".to_string(), 20)].into(),
    );
    spec.sites
        .insert("siteB".to_string(), [("b1".to_string(), 30)].into());
    Topology::from_spec(&spec).unwrap()
}

fn make_feed(seed: u64) -> Vec<Booking> {
    let mut rng = Lcg(seed);
    let clusters = ["a1", "a2", "b1"];
    let count = 5 + rng.below(25);
    (0..count)
        .map(|_| {
            // Some bookings start before or end after the window.
            let start = WINDOW.start - 12 * HOUR + (rng.below(8 * 24) as i64) * HOUR;
            let end = start + (1 + rng.below(36) as i64) * HOUR;
            if rng.below(15) == 0 {
                Booking::blackout("fed", start, end)
            } else {
                let cluster = clusters[rng.below(3) as usize];
                Booking::new(cluster, start, end, 1 + rng.below(5) as u32)
            }
        })
        .collect()
}

fn all_tracked(topo: &Topology) -> BTreeSet<ResourceId> {
    topo.closure([topo.federation().clone()].iter()).unwrap()
}

fn compiled(seed: u64) -> (Topology, Timeline, SlotSet) {
    let topo = make_topology();
    let timeline = build_timeline(WINDOW, &topo, &all_tracked(&topo), &make_feed(seed)).unwrap();
    let slots = SlotSet::compile(&timeline);
    (topo, timeline, slots)
}

#[test]
fn free_counts_stay_within_capacity() {
    for seed in 0..FEEDS {
        let (topo, timeline, _) = compiled(seed);
        for bp in &timeline.breakpoints {
            for (id, free) in &bp.free {
                assert!(*free <= topo.capacity_of(id.as_str()).unwrap(), "seed {seed}");
            }
        }
    }
}

#[test]
fn breakpoints_span_the_window() {
    for seed in 0..FEEDS {
        let (_, timeline, _) = compiled(seed);
        let stamps: Vec<i64> = timeline.breakpoints.iter().map(|b| b.timestamp).collect();
        assert_eq!(stamps.first(), Some(&WINDOW.start));
        assert_eq!(stamps.last(), Some(&WINDOW.end));
        assert!(stamps.windows(2).all(|w| w[0] < w[1]), "seed {seed}");
    }
}

#[test]
fn slots_partition_the_window_without_equal_neighbours() {
    for seed in 0..FEEDS {
        let (_, _, slots) = compiled(seed);
        let s = slots.slots();
        assert_eq!(s.first().unwrap().from, WINDOW.start);
        assert_eq!(s.last().unwrap().to, WINDOW.end);
        for pair in s.windows(2) {
            assert_eq!(pair[0].to, pair[1].from, "seed {seed}");
            assert_ne!(pair[0].free, pair[1].free, "seed {seed}");
        }
    }
}

#[test]
fn first_fit_respects_walltime() {
    let req = Request::new().with("siteA", 8).with("b1", 4);
    for seed in 0..FEEDS {
        let (_, _, slots) = compiled(seed);
        for walltime in [HOUR as u64, 6 * HOUR as u64, 30 * HOUR as u64] {
            if let Some(slot) = find_first(slots.slots(), &req, walltime) {
                assert!(slot.duration() >= walltime);
                assert!(slot.admits(&req));
                let earlier = slots.iter().take_while(|s| s.from < slot.from);
                assert!(earlier
                    .filter(|s| s.duration() >= walltime)
                    .all(|s| !s.admits(&req)));
            }
        }
    }
}

#[test]
fn max_is_maximal_and_earliest() {
    let req = Request::new().with("a1", 0).with("b1", 0);
    let walltime = 4 * HOUR as u64;
    for seed in 0..FEEDS {
        let (_, _, slots) = compiled(seed);
        let Some(best) = find_max(slots.slots(), &req, walltime) else {
            continue;
        };
        for other in slots.iter().filter(|s| s.duration() >= walltime) {
            assert!(best.total(&req) >= other.total(&req), "seed {seed}");
            if other.total(&req) == best.total(&req) {
                assert!(best.from <= other.from, "seed {seed}");
            }
        }
    }
}

#[test]
fn free_mode_lists_every_qualifying_slot() {
    let req = Request::new().with("a2", 3);
    for seed in 0..FEEDS {
        let (_, _, slots) = compiled(seed);
        let found = find_free(slots.slots(), &req, 2 * HOUR as u64);
        let expected = slots
            .iter()
            .filter(|s| s.duration() >= 2 * HOUR as u64 && s.free_of("a2") >= 3)
            .count();
        assert_eq!(found.len(), expected);
        assert!(found.windows(2).all(|w| w[0].from < w[1].from));
    }
}

#[test]
fn distribution_sums_to_min_of_request_and_free() {
    let mut checked = 0;
    for seed in 0..FEEDS {
        let (topo, timeline, slots) = compiled(seed);
        if !timeline.inconsistencies.is_empty() {
            continue;
        }
        for slot in &slots {
            for (aggregate, wanted) in [("siteA", 35u32), ("fed", 70), ("siteB", 10)] {
                let children_free: u64 = topo
                    .clusters_under(aggregate)
                    .unwrap()
                    .iter()
                    .map(|c| u64::from(slot.free_of(c.as_str())))
                    .sum();
                let req = Request::new().with(aggregate, wanted);
                let total = match distribute_hosts(&slot.free, &req, &topo, &BTreeSet::new()) {
                    Ok(d) => d.total(),
                    Err(PlanningError::InsufficientCapacity { partial, .. }) => partial.total(),
                    Err(e) => panic!("seed {seed}: {e}"),
                };
                assert_eq!(total, u64::from(wanted).min(children_free), "seed {seed}");
                checked += 1;
            }
        }
    }
    assert!(checked > 0);
}

#[test]
fn pipeline_is_idempotent() {
    let topo = make_topology();
    for seed in 0..10 {
        let planner = Planner::new(topo.clone(), make_feed(seed));
        let req = PlanRequest::new(WINDOW, Mode::Free, "fed:12,a2:2".parse().unwrap(), 3 * HOUR as u64)
            .with_charter(seed % 2 == 0);
        let first = serde_json::to_string(&planner.plan(&req, &Utc).unwrap()).unwrap();
        let second = serde_json::to_string(&planner.plan(&req, &Utc).unwrap()).unwrap();
        assert_eq!(first, second);
    }
}

#[test]
fn slot_sets_are_shareable_across_threads() {
    let (_, _, slots) = compiled(7);
    let engine = QueryEngine::new(&slots);
    let req = Request::new().with("siteB", 4);
    let outcomes = engine.compare(&req, HOUR as u64).unwrap();
    let sequential: Vec<QueryOutcome> = Mode::ALL
        .iter()
        .map(|m| engine.run(*m, &req, HOUR as u64).unwrap())
        .collect();
    assert_eq!(outcomes, sequential);
}
