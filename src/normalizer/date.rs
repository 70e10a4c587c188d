//! Publish-date parsing for feed items.
//!
//! Feeds in the wild disagree about date formats, so a date string is tried
//! against [`DATE_LAYOUTS`] in order and the first layout that accepts it wins.
//! The order is significant and must not be rearranged.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone, Utc};

use crate::app::{GatorError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateLayout {
    /// `Mon, 02 Jan 2006 15:04:05 MST`
    Rfc1123,
    /// `Mon, 02 Jan 2006 15:04:05 -0700`
    Rfc1123Z,
    /// `2006-01-02T15:04:05Z07:00`
    Rfc3339,
    /// `2006-01-02 15:04`, read as UTC
    DateTimeMinutes,
    /// `02 Jan 2006`, midnight UTC
    DayMonthYear,
}

pub const DATE_LAYOUTS: [DateLayout; 5] = [
    DateLayout::Rfc1123,
    DateLayout::Rfc1123Z,
    DateLayout::Rfc3339,
    DateLayout::DateTimeMinutes,
    DateLayout::DayMonthYear,
];

const RFC1123_STAMP: &str = "%d %b %Y %H:%M:%S";

const WEEKDAYS: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];

/// Strips a leading `Mon, ` from an RFC 1123 date.
///
/// The name must be a real weekday abbreviation but is not checked against
/// the date itself; feeds routinely get it wrong.
fn strip_weekday(s: &str) -> Option<&str> {
    let (day, rest) = s.split_once(", ")?;
    WEEKDAYS
        .iter()
        .any(|w| w.eq_ignore_ascii_case(day))
        .then_some(rest)
}

impl DateLayout {
    pub fn parse(self, s: &str) -> Option<DateTime<FixedOffset>> {
        match self {
            DateLayout::Rfc1123 => {
                let (stamp, zone) = strip_weekday(s)?.rsplit_once(' ')?;
                let offset = zone_offset(zone)?;
                let naive = NaiveDateTime::parse_from_str(stamp, RFC1123_STAMP).ok()?;
                offset.from_local_datetime(&naive).single()
            }
            DateLayout::Rfc1123Z => {
                DateTime::parse_from_str(strip_weekday(s)?, &format!("{RFC1123_STAMP} %z")).ok()
            }
            DateLayout::Rfc3339 => DateTime::parse_from_rfc3339(s).ok(),
            DateLayout::DateTimeMinutes => NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M")
                .ok()
                .map(|naive| Utc.from_utc_datetime(&naive).fixed_offset()),
            DateLayout::DayMonthYear => NaiveDate::parse_from_str(s, "%d %b %Y")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
                .map(|naive| Utc.from_utc_datetime(&naive).fixed_offset()),
        }
    }
}

/// Maps an alphabetic zone abbreviation to its offset.
///
/// The RFC 822 North American names are honored; any other alphabetic
/// abbreviation is accepted as UTC. Numeric zones are left to `Rfc1123Z`.
fn zone_offset(zone: &str) -> Option<FixedOffset> {
    if zone.is_empty() || !zone.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }

    let hours = match zone.to_ascii_uppercase().as_str() {
        "EST" => -5,
        "EDT" => -4,
        "CST" => -6,
        "CDT" => -5,
        "MST" => -7,
        "MDT" => -6,
        "PST" => -8,
        "PDT" => -7,
        _ => 0,
    };
    FixedOffset::east_opt(hours * 3600)
}

/// Parses `s` with the first matching entry of [`DATE_LAYOUTS`].
pub fn parse_date(s: &str) -> Result<DateTime<FixedOffset>> {
    let trimmed = s.trim();
    DATE_LAYOUTS
        .iter()
        .find_map(|layout| layout.parse(trimmed))
        .ok_or_else(|| GatorError::UnsupportedDateFormat(s.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn test_rfc1123_with_abbreviation() {
        let dt = parse_date("Mon, 02 Jan 2006 15:04:05 MST").unwrap();
        assert_eq!(dt.offset().local_minus_utc(), -7 * 3600);
        assert_eq!((dt.year(), dt.month(), dt.day()), (2006, 1, 2));
        assert_eq!((dt.hour(), dt.minute(), dt.second()), (15, 4, 5));
        assert_eq!(dt.to_rfc3339(), "2006-01-02T15:04:05-07:00");
    }

    #[test]
    fn test_rfc1123_gmt() {
        let dt = parse_date("Mon, 01 Jan 2024 00:00:00 GMT").unwrap();
        assert_eq!(dt.to_rfc3339(), "2024-01-01T00:00:00+00:00");
    }

    #[test]
    fn test_rfc1123_unknown_abbreviation_is_utc() {
        let dt = parse_date("Tue, 05 Mar 2024 08:30:00 CET").unwrap();
        assert_eq!(dt.offset().local_minus_utc(), 0);
        assert_eq!(dt.hour(), 8);
    }

    #[test]
    fn test_rfc1123_numeric_zone() {
        let dt = parse_date("Mon, 02 Jan 2006 15:04:05 -0700").unwrap();
        assert_eq!(dt.to_rfc3339(), "2006-01-02T15:04:05-07:00");

        let dt = parse_date("Fri, 15 Mar 2024 10:00:00 +0530").unwrap();
        assert_eq!(dt.offset().local_minus_utc(), 5 * 3600 + 30 * 60);
    }

    #[test]
    fn test_rfc1123_ignores_wrong_weekday() {
        // 03 Jan 2006 was a Tuesday
        let dt = parse_date("Mon, 03 Jan 2006 15:04:05 MST").unwrap();
        assert_eq!(dt.to_rfc3339(), "2006-01-03T15:04:05-07:00");

        let dt = parse_date("Mon, 03 Jan 2006 15:04:05 -0700").unwrap();
        assert_eq!(dt.to_rfc3339(), "2006-01-03T15:04:05-07:00");
    }

    #[test]
    fn test_rfc1123_requires_weekday_name() {
        assert!(parse_date("Xyz, 03 Jan 2006 15:04:05 MST").is_err());
        assert!(parse_date("03 Jan 2006 15:04:05 MST").is_err());
        assert!(parse_date("Tuesday, 03 Jan 2006 15:04:05 -0700").is_err());
    }

    #[test]
    fn test_rfc3339() {
        let dt = parse_date("2006-01-02T15:04:05Z").unwrap();
        assert_eq!(dt.offset().local_minus_utc(), 0);

        let dt = parse_date("2024-06-01T12:00:00+02:00").unwrap();
        assert_eq!(dt.offset().local_minus_utc(), 2 * 3600);
        assert_eq!(dt.hour(), 12);
    }

    #[test]
    fn test_bare_date_time_is_utc() {
        let dt = parse_date("2024-02-29 23:59").unwrap();
        assert_eq!(dt.to_rfc3339(), "2024-02-29T23:59:00+00:00");
    }

    #[test]
    fn test_bare_date_is_midnight() {
        let dt = parse_date("02 Jan 2006").unwrap();
        assert_eq!(dt.to_rfc3339(), "2006-01-02T00:00:00+00:00");
    }

    #[test]
    fn test_surrounding_whitespace_ignored() {
        assert!(parse_date("\n   02 Jan 2006  \n").is_ok());
    }

    #[test]
    fn test_unsupported_format_carries_input() {
        let err = parse_date("not a date").unwrap_err();
        assert!(matches!(err, GatorError::UnsupportedDateFormat(ref s) if s == "not a date"));

        assert!(parse_date("").is_err());
        assert!(parse_date("2024/01/02").is_err());
        assert!(parse_date("32 Jan 2006").is_err());
    }

    #[test]
    fn test_layouts_tried_in_order() {
        assert_eq!(DATE_LAYOUTS[0], DateLayout::Rfc1123);
        assert!(DateLayout::Rfc1123
            .parse("Mon, 02 Jan 2006 15:04:05 -0700")
            .is_none());
        assert!(DateLayout::Rfc1123Z
            .parse("Mon, 02 Jan 2006 15:04:05 MST")
            .is_none());
        assert!(DateLayout::DayMonthYear.parse("2006-01-02 15:04").is_none());
    }
}
