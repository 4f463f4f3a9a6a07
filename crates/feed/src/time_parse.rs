// ABOUTME: Flexible time parsing for RSS/Atom feed dates.
// ABOUTME: RFC-822 style dates (named or numeric zones, optional weekday) and ISO-8601.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone, Utc};

/// Formats carrying a numeric offset, tried after the weekday is removed.
const OFFSET_FORMATS: &[&str] = &[
    "%d %b %Y %H:%M:%S %z",
    "%e %b %Y %H:%M:%S %z",
    "%d %B %Y %H:%M:%S %z",
    "%d %b %Y %H:%M %z",
    "%d %b %y %H:%M:%S %z",
    "%Y-%m-%dT%H:%M:%S%:z",
    "%Y-%m-%dT%H:%M:%S%.f%:z",
    "%Y-%m-%dT%H:%M:%S%z",
    "%Y-%m-%d %H:%M:%S %z",
];

/// Formats without a zone; these are read as UTC.
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%d %b %Y %H:%M:%S",
    "%e %b %Y %H:%M:%S",
    "%d %B %Y %H:%M:%S",
    "%d %b %Y %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d %b %Y", "%d %B %Y"];

const WEEKDAYS: &[&str] = &[
    "mon", "tue", "wed", "thu", "fri", "sat", "sun", "monday", "tuesday", "wednesday",
    "thursday", "friday", "saturday", "sunday",
];

/// Parses a feed date into a Unix timestamp in seconds.
/// Returns None when the text is not a recognizable date.
pub fn parse_pubdate(s: &str) -> Option<i64> {
    parse_flexible_time(s).map(|dt| dt.timestamp())
}

/// Parses a datetime string using the formats feeds actually use.
/// Returns a UTC datetime if successful, None if no format matches.
///
/// Weekday names are ignored when they disagree with the date, since feeds
/// get them wrong often enough that the date itself has to win.
pub fn parse_flexible_time(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.with_timezone(&Utc));
    }

    let body = strip_weekday(s);
    parse_with_offset(body)
        .or_else(|| parse_with_named_zone(body))
        .or_else(|| parse_naive(body))
}

/// Drops a leading weekday (`"Mon, "`, `"Tuesday "`) if there is one.
fn strip_weekday(s: &str) -> &str {
    if let Some((head, rest)) = s.split_once(',') {
        if !head.is_empty() && head.trim().chars().all(|c| c.is_ascii_alphabetic()) {
            return rest.trim_start();
        }
    }
    if let Some((head, rest)) = s.split_once(char::is_whitespace) {
        if WEEKDAYS.contains(&head.to_ascii_lowercase().as_str()) {
            return rest.trim_start();
        }
    }
    s
}

fn parse_with_offset(s: &str) -> Option<DateTime<Utc>> {
    OFFSET_FORMATS
        .iter()
        .find_map(|fmt| DateTime::parse_from_str(s, fmt).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

/// Handles trailing zone abbreviations chrono can't parse (`PST`, `CEST`, ...).
fn parse_with_named_zone(s: &str) -> Option<DateTime<Utc>> {
    let (base, zone) = s.rsplit_once(char::is_whitespace)?;
    let offset = FixedOffset::east_opt(named_offset(zone)?)?;
    let naive = NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(base.trim_end(), fmt).ok())?;
    let dt = offset.from_local_datetime(&naive).single()?;
    Some(dt.with_timezone(&Utc))
}

fn parse_naive(s: &str) -> Option<DateTime<Utc>> {
    if let Some(naive) = NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
    {
        return Some(Utc.from_utc_datetime(&naive));
    }

    let date = DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())?;
    Some(Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0)?))
}

/// Offset in seconds east of UTC for common zone abbreviations.
/// Ambiguous names resolve to their North American / European reading.
fn named_offset(zone: &str) -> Option<i32> {
    const H: i32 = 3600;
    let offset = match zone.to_ascii_uppercase().as_str() {
        "GMT" | "UTC" | "UT" | "Z" | "WET" => 0,
        "EST" => -5 * H,
        "EDT" => -4 * H,
        "CST" => -6 * H,
        "CDT" => -5 * H,
        "MST" => -7 * H,
        "MDT" => -6 * H,
        "PST" => -8 * H,
        "PDT" => -7 * H,
        "AKST" => -9 * H,
        "AKDT" => -8 * H,
        "HST" | "HAST" => -10 * H,
        "HADT" => -9 * H,
        "AST" => -4 * H,
        "ADT" => -3 * H,
        "NST" => -(3 * H + 30 * 60),
        "NDT" => -(2 * H + 30 * 60),
        "WEST" | "CET" | "BST" | "IST" | "MEZ" => H,
        "CEST" | "EET" | "MESZ" => 2 * H,
        "EEST" | "MSK" => 3 * H,
        "JST" | "KST" => 9 * H,
        "AWST" => 8 * H,
        "AEST" => 10 * H,
        "AEDT" => 11 * H,
        "NZST" => 12 * H,
        "NZDT" => 13 * H,
        _ => return None,
    };
    Some(offset)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;

    #[test]
    fn test_rfc2822_numeric_offset() {
        assert_eq!(parse_pubdate("Fri, 21 Nov 1997 09:55:06 -0600"), Some(880127706));
    }

    #[test]
    fn test_before_epoch() {
        assert_eq!(parse_pubdate("Mon, 02 May 1960 09:05:01 +0100"), Some(-305049299));
    }

    #[test]
    fn test_iso8601() {
        assert_eq!(parse_pubdate("2003-12-13T00:00:00+02:00"), Some(1071266400));
        assert_eq!(parse_pubdate("2003-12-13T18:30:02Z"), Some(1071340202));
    }

    #[test]
    fn test_unknown() {
        assert_eq!(parse_pubdate(""), None);
        assert_eq!(parse_pubdate("unknown"), None);
        assert_eq!(parse_pubdate("   "), None);
    }

    #[test]
    fn test_wrong_weekday_is_ignored() {
        // 21 Nov 1997 was a Friday.
        assert_eq!(parse_pubdate("Mon, 21 Nov 1997 09:55:06 -0600"), Some(880127706));
    }

    #[test]
    fn test_without_weekday() {
        assert_eq!(parse_pubdate("21 Nov 1997 09:55:06 -0600"), Some(880127706));
    }

    #[test]
    fn test_named_timezone() {
        let dt = parse_flexible_time("Mon, 02 Jan 2006 15:04:05 MST").unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(2006, 1, 2, 22, 4, 5).unwrap());

        let dt = parse_flexible_time("Tue, 10 Jun 2003 04:00:00 CEST").unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(2003, 6, 10, 2, 0, 0).unwrap());
    }

    #[test]
    fn test_aest_is_not_mistaken_for_est() {
        let dt = parse_flexible_time("02 Jan 2006 15:04:05 AEST").unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(2006, 1, 2, 5, 4, 5).unwrap());
    }

    #[test]
    fn test_naive_datetime_assumes_utc() {
        let dt = parse_flexible_time("2006-01-02 15:04:05").unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(2006, 1, 2, 15, 4, 5).unwrap());
    }

    #[test]
    fn test_date_only() {
        let dt = parse_flexible_time("2023-12-25").unwrap();
        assert_eq!(dt.year(), 2023);
        assert_eq!(dt.month(), 12);
        assert_eq!(dt.day(), 25);
    }
}
