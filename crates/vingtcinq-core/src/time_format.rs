//! Clock-face formatting and lenient parsing of typed durations.

use regex::Regex;
use std::sync::LazyLock;

static HOUR_FORMAT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d+)\s*h\s*(\d+)\s*m?\s*(\d+)\s*s?").expect("valid hour pattern")
});

/// `MM:SS` below one hour, `Hh:MM:SS` from one hour up.
pub fn format_clock(secs: u64) -> String {
    let total_minutes = secs / 60;
    let seconds = secs % 60;
    if total_minutes >= 60 {
        format!("{}h:{:02}:{:02}", total_minutes / 60, total_minutes % 60, seconds)
    } else {
        format!("{total_minutes:02}:{seconds:02}")
    }
}

/// Parse what a user typed into the timer field.
///
/// Accepted forms:
/// - `1h 01m 59s` or `1h 01 59`
/// - `MM:SS`
/// - bare digits, read as `MMSS` from the last four digits (`"2500"` is 25:00)
///
/// Anything else parses to 0.
pub fn parse_time_to_seconds(input: &str) -> u64 {
    if input.is_empty() {
        return 0;
    }

    if let Some(caps) = HOUR_FORMAT.captures(input) {
        let field = |i: usize| number(caps.get(i).map_or("", |m| m.as_str()));
        return field(1)
            .saturating_mul(3600)
            .saturating_add(field(2).saturating_mul(60))
            .saturating_add(field(3));
    }

    let cleaned: String = input
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == ':')
        .collect();

    if !cleaned.contains(':') {
        let tail = &cleaned[cleaned.len().saturating_sub(4)..];
        let digits = format!("{tail:0>4}");
        return number(&digits[..2]) * 60 + number(&digits[2..]);
    }

    let mut parts = cleaned.split(':');
    let minutes = number(parts.next().unwrap_or(""));
    let seconds = number(parts.next().unwrap_or(""));
    minutes.saturating_mul(60).saturating_add(seconds)
}

fn number(s: &str) -> u64 {
    s.parse().unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_minutes_and_hours() {
        assert_eq!(format_clock(0), "00:00");
        assert_eq!(format_clock(59), "00:59");
        assert_eq!(format_clock(1500), "25:00");
        assert_eq!(format_clock(3599), "59:59");
        assert_eq!(format_clock(3600), "1h:00:00");
        assert_eq!(format_clock(3719), "1h:01:59");
        assert_eq!(format_clock(36_000), "10h:00:00");
    }

    #[test]
    fn parses_hour_forms() {
        assert_eq!(parse_time_to_seconds("1h 01m 59s"), 3719);
        assert_eq!(parse_time_to_seconds("1h 01 59"), 3719);
        assert_eq!(parse_time_to_seconds("2H 0M 5S"), 7205);
    }

    #[test]
    fn parses_colon_form() {
        assert_eq!(parse_time_to_seconds("25:00"), 1500);
        assert_eq!(parse_time_to_seconds("5:30"), 330);
        assert_eq!(parse_time_to_seconds(":45"), 45);
        assert_eq!(parse_time_to_seconds(":"), 0);
    }

    #[test]
    fn parses_bare_digits_as_mmss() {
        assert_eq!(parse_time_to_seconds("2500"), 1500);
        assert_eq!(parse_time_to_seconds("130"), 90);
        assert_eq!(parse_time_to_seconds("9"), 9);
        // Only the last four digits count.
        assert_eq!(parse_time_to_seconds("992500"), 1500);
    }

    #[test]
    fn garbage_is_zero() {
        assert_eq!(parse_time_to_seconds(""), 0);
        assert_eq!(parse_time_to_seconds("soon"), 0);
    }

    #[test]
    fn formatted_values_parse_back_below_one_hour() {
        for secs in [0, 1, 61, 1500, 3599] {
            assert_eq!(parse_time_to_seconds(&format_clock(secs)), secs);
        }
    }
}
