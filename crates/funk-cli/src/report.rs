//! Human-readable output.

use chrono::TimeZone;
use funk_core::oar::{format_oar_date, format_walltime};
use funk_core::{FreeVector, Request};
use funk_planning::{Mode, PlanReport, SlotSet};

fn join_counts<'a>(counts: impl Iterator<Item = (&'a str, u32)>) -> String {
    let parts: Vec<String> = counts.map(|(id, n)| format!("{id}:{n}")).collect();
    if parts.is_empty() {
        "-".to_string()
    } else {
        parts.join(" ")
    }
}

fn show_request(request: &Request) -> String {
    join_counts(request.iter().map(|(id, n)| (id.as_str(), n)))
}

fn show_free(free: &FreeVector) -> String {
    join_counts(free.iter().map(|(id, n)| (id.as_str(), *n)))
}

pub fn format_plan<Tz>(report: &PlanReport, command: Option<&str>, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    let mut out = String::new();
    let window = report.slots.window;

    out.push_str("\n╔══════════════════════════════════════════╗\n");
    out.push_str("║  Funk: find your nodes                   ║\n");
    out.push_str("╠══════════════════════════════════════════╣\n");
    out.push_str(&format!("║  From:     {:<30}║\n", format_oar_date(window.start, tz)));
    out.push_str(&format!("║  To:       {:<30}║\n", format_oar_date(window.end, tz)));
    out.push_str(&format!("║  Walltime: {:<30}║\n", format_walltime(report.outcome.walltime)));
    out.push_str(&format!("║  Mode:     {:<30}║\n", report.mode));
    out.push_str("╚══════════════════════════════════════════╝\n\n");

    out.push_str(&format!("Wanted:    {}\n", show_request(&report.request)));
    out.push_str(&format!("Slots:     {} in window\n", report.slots.len()));
    if !report.timeline.inconsistencies.is_empty() {
        out.push_str(&format!(
            "⚠️  {} inconsistent booking points clamped to zero\n",
            report.timeline.inconsistencies.len()
        ));
    }
    out.push('\n');

    let Some(chosen) = &report.outcome.chosen else {
        out.push_str("❌ No slot matches the request.\n");
        return out;
    };

    out.push_str(&format!(
        "✅ Slot found: {} → {}\n",
        format_oar_date(chosen.from, tz),
        format_oar_date(chosen.to, tz)
    ));
    if let Some(available) = &report.available {
        out.push_str(&format!("   Available:   {}\n", show_free(available)));
    }
    if let Some(distribution) = &report.distribution {
        out.push_str(&format!(
            "   Distributed: {} ({} nodes)\n",
            show_free(&distribution.allocations),
            distribution.total()
        ));
    }
    out.push('\n');

    if report.mode == Mode::Free && report.outcome.candidates.len() > 1 {
        out.push_str(&format!("Other qualifying slots ({}):\n", report.outcome.candidates.len() - 1));
        for slot in report.outcome.candidates.iter().filter(|s| s.from != chosen.from) {
            out.push_str(&format!(
                "  • {} → {}\n",
                format_oar_date(slot.from, tz),
                format_oar_date(slot.to, tz)
            ));
        }
        out.push('\n');
    }

    if !report.shortfalls.is_empty() {
        out.push_str("⚠️  SHORTFALLS:\n\n");
        for s in &report.shortfalls {
            out.push_str(&format!(
                "  • {}: wanted {}, got {}\n",
                s.resource, s.requested, s.allocated
            ));
        }
        out.push('\n');
    }

    match command {
        Some(cmd) => {
            out.push_str("RESERVATION COMMAND:\n\n");
            out.push_str(&format!("  {cmd}\n"));
        }
        None => out.push_str("Nothing to reserve.\n"),
    }

    out
}

/// One line per slot, with the free counts of the requested resources.
/// Slots at least `walltime` long are marked with `*`.
pub fn format_slots<Tz>(slots: &SlotSet, request: &Request, walltime: u64, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    let mut out = String::new();
    out.push_str(&format!(
        "{} slots, walltime {} (* = long enough)\n\n",
        slots.len(),
        format_walltime(walltime)
    ));
    for slot in slots {
        let mark = if slot.duration() >= walltime { '*' } else { ' ' };
        let counts = join_counts(request.resources().map(|id| (id.as_str(), slot.free_of(id.as_str()))));
        out.push_str(&format!(
            "{mark} {}  {}  {:>9}  {counts}\n",
            format_oar_date(slot.from, tz),
            format_oar_date(slot.to, tz),
            format_walltime(slot.duration())
        ));
    }
    out
}
