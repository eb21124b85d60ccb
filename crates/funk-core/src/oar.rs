//! OAR text formats: walltimes (`1:30:00`) and reservation dates
//! (`2024-05-02 19:00:00`).
//!
//! Dates are interpreted in a caller-supplied time zone. The CLI passes
//! `chrono::Local`, tests pass `chrono::Utc`.

use std::fmt::Display;

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone};

use crate::error::{CoreError, CoreResult};

const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Parse an OAR walltime into seconds.
///
/// Accepts `H:MM:SS`, `H:MM`, `H` and `<n>s`. Zero is rejected.
pub fn parse_walltime(s: &str) -> CoreResult<u64> {
    let s = s.trim();
    let bad = || CoreError::Walltime(s.to_string());

    let secs = if let Some(n) = s.strip_suffix('s') {
        n.parse::<u64>().map_err(|_| bad())?
    } else {
        let parts: Vec<&str> = s.split(':').collect();
        if parts.is_empty() || parts.len() > 3 {
            return Err(bad());
        }
        let mut fields = [0u64; 3];
        for (slot, part) in fields.iter_mut().zip(&parts) {
            *slot = part.trim().parse::<u64>().map_err(|_| bad())?;
        }
        if parts.len() > 1 && (fields[1] >= 60 || fields[2] >= 60) {
            return Err(bad());
        }
        fields[0]
            .checked_mul(3600)
            .and_then(|secs| secs.checked_add(fields[1] * 60 + fields[2]))
            .ok_or_else(bad)?
    };

    if secs == 0 {
        return Err(bad());
    }
    Ok(secs)
}

/// Render seconds as `H:MM:SS`.
pub fn format_walltime(secs: u64) -> String {
    format!("{}:{:02}:{:02}", secs / 3600, (secs % 3600) / 60, secs % 60)
}

/// Parse an OAR date in `tz` into a Unix timestamp.
///
/// Seconds and the time of day are optional; a bare integer is taken as
/// a Unix timestamp.
pub fn parse_oar_date<Tz: TimeZone>(s: &str, tz: &Tz) -> CoreResult<i64> {
    let s = s.trim();
    if let Ok(ts) = s.parse::<i64>() {
        return Ok(ts);
    }

    let naive = NaiveDateTime::parse_from_str(s, DATE_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M"))
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
        .ok_or_else(|| CoreError::Date(s.to_string()))?;

    tz.from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.timestamp())
        .ok_or_else(|| CoreError::Date(format!("{s} does not exist in this time zone")))
}

/// Render a Unix timestamp as an OAR date in `tz`.
pub fn format_oar_date<Tz>(ts: i64, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    match DateTime::from_timestamp(ts, 0) {
        Some(dt) => dt.with_timezone(tz).format(DATE_FORMAT).to_string(),
        None => ts.to_string(),
    }
}

/// Parse a planning horizon: `3w`, `2d`, `12h`, `30m` or plain seconds.
pub fn parse_horizon(s: &str) -> CoreResult<i64> {
    let s = s.trim();
    let bad = || CoreError::Horizon(s.to_string());
    let (digits, unit) = match s.char_indices().last() {
        Some((i, c)) if c.is_ascii_alphabetic() => (&s[..i], c),
        Some(_) => (s, 's'),
        None => return Err(bad()),
    };
    let n = digits.parse::<i64>().map_err(|_| bad())?;
    let mult = match unit {
        's' => 1,
        'm' => 60,
        'h' => 3600,
        'd' => 86_400,
        'w' => 7 * 86_400,
        _ => return Err(bad()),
    };
    if n <= 0 {
        return Err(bad());
    }
    n.checked_mul(mult).ok_or_else(bad)
}
