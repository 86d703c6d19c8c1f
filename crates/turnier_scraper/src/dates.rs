//! Date handling for the fixed Europe/Berlin zone.
//!
//! The site prints `DD.MM.YYYY` in day columns and `DD.MM.YYYY HH:MM` in
//! minute columns, always in German local time. Host-local time is never
//! consulted.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use tracing::debug;

pub const TIMEZONE: Tz = chrono_tz::Europe::Berlin;

const DATE_FORMAT: &str = "%d.%m.%Y";
const DATE_TIME_FORMAT: &str = "%d.%m.%Y %H:%M";

/// Day-granularity cell ("Erster Turniertag"). Empty or unparsable → `None`.
pub fn parse_date(raw: &str) -> Option<DateTime<Tz>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    match NaiveDate::parse_from_str(raw, DATE_FORMAT) {
        Ok(date) => to_berlin(date.and_hms_opt(0, 0, 0)?),
        Err(e) => {
            debug!("unparsable date cell {raw:?}: {e}");
            None
        }
    }
}

/// Minute-granularity cell ("Anmeldung öffnet", "Letzte Änderung").
pub fn parse_date_time(raw: &str) -> Option<DateTime<Tz>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    match NaiveDateTime::parse_from_str(raw, DATE_TIME_FORMAT) {
        Ok(dt) => to_berlin(dt),
        Err(e) => {
            debug!("unparsable date-time cell {raw:?}: {e}");
            None
        }
    }
}

/// Zero timestamp; stands in for a missing "Letzte Änderung" marker.
pub fn epoch() -> DateTime<Tz> {
    DateTime::<Utc>::UNIX_EPOCH.with_timezone(&TIMEZONE)
}

/// `HH:MM` wall clock in the fixed zone, for message rendering.
pub fn format_clock(t: &DateTime<Tz>) -> String {
    t.format("%H:%M").to_string()
}

fn to_berlin(naive: NaiveDateTime) -> Option<DateTime<Tz>> {
    // Ambiguous local times (DST fall-back hour) resolve to the earlier
    // offset; nonexistent ones (spring-forward gap) count as parse failures.
    match TIMEZONE.from_local_datetime(&naive).earliest() {
        Some(t) => Some(t),
        None => {
            debug!("local time {naive} does not exist in {TIMEZONE}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_day_granularity() {
        let parsed = parse_date("14.06.2024").unwrap();
        assert_eq!(parsed, TIMEZONE.with_ymd_and_hms(2024, 6, 14, 0, 0, 0).unwrap());
    }

    #[test]
    fn parses_minute_granularity() {
        let parsed = parse_date_time("01.05.2024 18:00").unwrap();
        assert_eq!(parsed, TIMEZONE.with_ymd_and_hms(2024, 5, 1, 18, 0, 0).unwrap());
    }

    #[test]
    fn surrounding_whitespace_is_trimmed() {
        assert!(parse_date_time("  01.05.2024 18:00\n").is_some());
    }

    #[test]
    fn empty_and_garbage_cells_are_absent() {
        assert_eq!(parse_date(""), None);
        assert_eq!(parse_date("   "), None);
        assert_eq!(parse_date("nicht bekannt"), None);
        assert_eq!(parse_date_time(""), None);
        assert_eq!(parse_date_time("2024-05-01 18:00"), None);
    }

    #[test]
    fn epoch_precedes_any_site_timestamp() {
        let changed = parse_date_time("01.01.2024 00:01").unwrap();
        assert!(epoch() < changed);
    }

    #[test]
    fn clock_renders_berlin_wall_time() {
        let opens = parse_date_time("01.06.2024 21:30").unwrap();
        assert_eq!(format_clock(&opens), "21:30");
    }
}
