//! Shared utilities for CLI commands.

use std::sync::LazyLock;

use anyhow::Context;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use chrono_tz::Tz;
use lb_core::TimePeriod;
use regex::Regex;

/// Pre-compiled regex for relative time parsing.
static RELATIVE_TIME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)\s+(minute|hour|day|week)s?\s+ago$").unwrap());

/// Conservative bounds for relative time parsing (~1000 years in minutes).
const MAX_RELATIVE_MINUTES: i64 = 1000 * 365 * 24 * 60;

/// Parse a datetime string as either RFC 3339 or relative time.
///
/// Supports:
/// - RFC 3339: "2024-01-15T10:30:00Z"
/// - Relative: "2 hours ago", "30 minutes ago", "1 day ago", "1 week ago"
pub fn parse_datetime(s: &str, now: DateTime<Utc>) -> anyhow::Result<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }

    let Some(caps) = RELATIVE_TIME_RE.captures(s) else {
        anyhow::bail!(
            "Invalid datetime: {s}. Use RFC 3339 (e.g., 2024-01-15T10:30:00Z) or relative (e.g., '2 hours ago')"
        );
    };

    let n: i64 = caps[1]
        .parse()
        .context("failed to parse number in relative time")?;

    let (max_for_unit, minutes_per_unit) = match &caps[2] {
        "minute" => (MAX_RELATIVE_MINUTES, 1),
        "hour" => (MAX_RELATIVE_MINUTES / 60, 60),
        "day" => (MAX_RELATIVE_MINUTES / (60 * 24), 60 * 24),
        "week" => (MAX_RELATIVE_MINUTES / (60 * 24 * 7), 60 * 24 * 7),
        unit => anyhow::bail!("Unknown time unit: {unit}"),
    };

    if n > max_for_unit {
        anyhow::bail!("Relative time value too large: {n} {}", &caps[2]);
    }

    Ok(now - Duration::minutes(n * minutes_per_unit))
}

/// Parse a query period from two edges.
///
/// Two plain dates give a whole-day period in `zone`; anything else is parsed
/// with [`parse_datetime`].
pub fn parse_period(
    from: &str,
    to: &str,
    zone: Tz,
    now: DateTime<Utc>,
) -> anyhow::Result<TimePeriod> {
    if let (Ok(first), Ok(last)) = (from.parse::<NaiveDate>(), to.parse::<NaiveDate>()) {
        return TimePeriod::from_edge_dates(first, last, zone)
            .with_context(|| format!("invalid date range {from}..{to}"));
    }
    let start = parse_datetime(from, now)?;
    let end = parse_datetime(to, now)?;
    Ok(TimePeriod::from_edge_instants(start, end))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 2, 4, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_parses_rfc3339_with_offset() {
        let parsed = parse_datetime("2024-02-04T13:00:00+01:00", now()).unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2024, 2, 4, 12, 0, 0).unwrap());
    }

    #[test]
    fn test_parses_relative_times() {
        assert_eq!(
            parse_datetime("2 hours ago", now()).unwrap(),
            Utc.with_ymd_and_hms(2024, 2, 4, 10, 0, 0).unwrap()
        );
        assert_eq!(
            parse_datetime("1 week ago", now()).unwrap(),
            Utc.with_ymd_and_hms(2024, 1, 28, 12, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_rejects_garbage_and_huge_values() {
        assert!(parse_datetime("yesterday-ish", now()).is_err());
        assert!(parse_datetime("99999999 weeks ago", now()).is_err());
    }

    #[test]
    fn test_two_dates_make_a_whole_day_period() {
        let period = parse_period("2024-02-05", "2024-02-03", chrono_tz::UTC, now()).unwrap();
        assert_eq!(period.full_day_count(), Some(3));
        assert_eq!(period.start(), Utc.with_ymd_and_hms(2024, 2, 3, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_mixed_edges_make_a_precise_period() {
        let period = parse_period("3 hours ago", "2024-02-04T12:00:00Z", chrono_tz::UTC, now()).unwrap();
        assert!(!period.is_full_day());
        assert_eq!(period.duration(), Duration::hours(3));
    }
}
