//! Usage-charter periods.
//!
//! The testbed charter reserves weekdays from 09:00 to 19:00 (local time)
//! for small interactive jobs. Planning with the charter in mind means
//! treating those hours as blackouts.

use chrono::{DateTime, Datelike, NaiveTime, TimeZone, Weekday};
use funk_core::{Booking, ResourceId, TimeWindow};

const DAY_START_HOUR: u32 = 9;
const DAY_END_HOUR: u32 = 19;

/// One blackout booking per charter period intersecting `window`,
/// clipped to it.
pub fn charter_blackouts<Tz: TimeZone>(
    window: TimeWindow,
    federation: &ResourceId,
    tz: &Tz,
) -> Vec<Booking> {
    let mut out = Vec::new();
    let (Some(first), Some(last)) = (
        DateTime::from_timestamp(window.start, 0),
        DateTime::from_timestamp(window.end, 0),
    ) else {
        return out;
    };
    let (Some(day_start), Some(day_end)) = (
        NaiveTime::from_hms_opt(DAY_START_HOUR, 0, 0),
        NaiveTime::from_hms_opt(DAY_END_HOUR, 0, 0),
    ) else {
        return out;
    };

    let mut day = first.with_timezone(tz).date_naive();
    let last_day = last.with_timezone(tz).date_naive();

    while day <= last_day {
        if !matches!(day.weekday(), Weekday::Sat | Weekday::Sun) {
            let from = tz.from_local_datetime(&day.and_time(day_start)).earliest();
            let to = tz.from_local_datetime(&day.and_time(day_end)).earliest();
            if let (Some(from), Some(to)) = (from, to) {
                if let Some((start, end)) = window.clip(from.timestamp(), to.timestamp()) {
                    out.push(Booking::blackout(federation.clone(), start, end));
                }
            }
        }
        match day.succ_opt() {
            Some(next) => day = next,
            None => break,
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    // 2024-01-01 00:00:00 UTC, a Monday.
    const MONDAY: i64 = 1_704_067_200;
    const HOUR: i64 = 3600;
    const DAY: i64 = 24 * HOUR;

    #[test]
    fn one_period_per_weekday() {
        let fed = ResourceId::from("grid5000");
        let window = TimeWindow::new(MONDAY, MONDAY + 7 * DAY);
        let periods = charter_blackouts(window, &fed, &Utc);

        assert_eq!(periods.len(), 5);
        assert_eq!(periods[0].start, MONDAY + 9 * HOUR);
        assert_eq!(periods[0].end, MONDAY + 19 * HOUR);
        assert_eq!(periods[4].start, MONDAY + 4 * DAY + 9 * HOUR);
        assert!(periods.iter().all(|b| b.out_of_window));
    }

    #[test]
    fn periods_are_clipped_to_window() {
        let fed = ResourceId::from("grid5000");
        let window = TimeWindow::new(MONDAY + 12 * HOUR, MONDAY + DAY + 10 * HOUR);
        let periods = charter_blackouts(window, &fed, &Utc);

        assert_eq!(periods.len(), 2);
        assert_eq!((periods[0].start, periods[0].end), (MONDAY + 12 * HOUR, MONDAY + 19 * HOUR));
        assert_eq!(
            (periods[1].start, periods[1].end),
            (MONDAY + DAY + 9 * HOUR, MONDAY + DAY + 10 * HOUR)
        );
    }

    #[test]
    fn weekend_has_no_periods() {
        let fed = ResourceId::from("grid5000");
        let saturday = MONDAY + 5 * DAY;
        let window = TimeWindow::new(saturday, saturday + 2 * DAY);
        assert!(charter_blackouts(window, &fed, &Utc).is_empty());
    }
}
