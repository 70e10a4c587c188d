use std::time::Duration;

use crate::app::{GatorError, Result};

/// Parse a polling interval such as `"30s"`, `"1m"`, `"1h30m"`, `"1.5h"` or
/// `"500ms"`.
///
/// The string is a sequence of decimal numbers, each followed by a unit
/// (`ns`, `us`/`µs`, `ms`, `s`, `m`, `h`, `d`). The total must be positive.
pub fn parse_interval(s: &str) -> Result<Duration> {
    let input = s.trim();
    if input.is_empty() {
        return Err(invalid(s, "empty interval"));
    }

    let mut total_nanos = 0f64;
    let mut rest = input;

    while !rest.is_empty() {
        let number_len = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        let (number, tail) = rest.split_at(number_len);
        let value: f64 = number
            .parse()
            .map_err(|_| invalid(s, "expected a number before each unit"))?;

        let unit_len = tail
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(tail.len());
        let (unit, tail) = tail.split_at(unit_len);
        let nanos_per_unit = match unit {
            "ns" => 1.0,
            "us" | "µs" => 1e3,
            "ms" => 1e6,
            "s" => 1e9,
            "m" => 60.0 * 1e9,
            "h" => 3600.0 * 1e9,
            "d" => 86400.0 * 1e9,
            "" => return Err(invalid(s, "missing unit, use e.g. '30s', '1m' or '1h'")),
            other => return Err(invalid(s, &format!("unknown unit '{}'", other))),
        };

        total_nanos += value * nanos_per_unit;
        rest = tail;
    }

    if total_nanos < 1.0 {
        return Err(invalid(s, "interval must be positive"));
    }
    if total_nanos >= u64::MAX as f64 {
        return Err(invalid(s, "interval is too large"));
    }

    Ok(Duration::from_nanos(total_nanos.round() as u64))
}

fn invalid(input: &str, reason: &str) -> GatorError {
    GatorError::InvalidInterval(format!("{:?}: {}", input, reason))
}

/// Format an interval for display, e.g. `1h30m`, `45s`, `500ms`.
pub fn format_interval(d: Duration) -> String {
    let secs = d.as_secs();
    let millis = d.subsec_millis();

    if secs == 0 {
        return if millis > 0 {
            format!("{}ms", millis)
        } else {
            format!("{}ns", d.as_nanos())
        };
    }

    let mut out = String::new();
    let (hours, minutes, seconds) = (secs / 3600, secs % 3600 / 60, secs % 60);
    if hours > 0 {
        out.push_str(&format!("{}h", hours));
    }
    if minutes > 0 {
        out.push_str(&format!("{}m", minutes));
    }
    if millis > 0 {
        let frac = format!("{:03}", millis);
        out.push_str(&format!("{}.{}s", seconds, frac.trim_end_matches('0')));
    } else if seconds > 0 {
        out.push_str(&format!("{}s", seconds));
    }
    out
}
