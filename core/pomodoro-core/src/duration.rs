//! Human-time parsing and `mm:ss` rendering (spec §4.E, §4.F, §10.4).
//!
//! Grammar: one or more `<integer><unit>` pairs, units `h`/`m`/`s`, e.g.
//! `25m`, `1h30m`, `90s`. No single crate in this lineage covers that
//! compound grammar, so it's hand-written; `mm:ss` rendering follows the
//! hours/minutes/seconds decomposition used elsewhere in this corpus for
//! displaying a `Duration` as a clock string.

use crate::error::PomodoroError;

/// Parses a human-time string such as `25m` or `1h30m` into whole seconds.
pub fn parse_human_secs(input: &str) -> Result<i64, PomodoroError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(invalid(input, "duration must not be empty"));
    }

    let mut total: i64 = 0;
    let mut digits = String::new();
    let mut saw_any_pair = false;

    for ch in trimmed.chars() {
        if ch.is_ascii_digit() {
            digits.push(ch);
            continue;
        }

        if digits.is_empty() {
            return Err(invalid(
                input,
                &format!("expected a number before unit '{}'", ch),
            ));
        }

        let amount: i64 = digits
            .parse()
            .map_err(|_| invalid(input, "number too large"))?;
        digits.clear();

        let multiplier = match ch {
            'h' => 3600,
            'm' => 60,
            's' => 1,
            other => return Err(invalid(input, &format!("unknown unit '{}'", other))),
        };

        total += amount * multiplier;
        saw_any_pair = true;
    }

    if !digits.is_empty() {
        return Err(invalid(
            input,
            "trailing number has no unit (expected h, m, or s)",
        ));
    }
    if !saw_any_pair {
        return Err(invalid(input, "no <number><unit> pairs found"));
    }
    if total <= 0 {
        return Err(invalid(input, "duration must be greater than zero"));
    }

    Ok(total)
}

fn invalid(input: &str, reason: &str) -> PomodoroError {
    PomodoroError::InvalidDuration {
        input: input.to_string(),
        reason: reason.to_string(),
    }
}

/// Renders a non-negative second count as `mm:ss`, clamping negative input
/// to zero (the renderer never passes negative values, but this keeps the
/// function total).
pub fn format_mmss(total_secs: i64) -> String {
    let clamped = total_secs.max(0);
    let minutes = clamped / 60;
    let seconds = clamped % 60;
    format!("{:02}:{:02}", minutes, seconds)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_single_unit() {
        assert_eq!(parse_human_secs("25m").unwrap(), 1500);
        assert_eq!(parse_human_secs("5m").unwrap(), 300);
        assert_eq!(parse_human_secs("90s").unwrap(), 90);
    }

    #[test]
    fn parses_compound_units() {
        assert_eq!(parse_human_secs("1h30m").unwrap(), 5400);
        assert_eq!(parse_human_secs("1h1m1s").unwrap(), 3661);
    }

    #[test]
    fn rejects_malformed_strings() {
        assert!(parse_human_secs("").is_err());
        assert!(parse_human_secs("abc").is_err());
        assert!(parse_human_secs("25").is_err());
        assert!(parse_human_secs("25x").is_err());
        assert!(parse_human_secs("0m").is_err());
        assert!(parse_human_secs("-5m").is_err());
    }

    #[test]
    fn formats_mmss() {
        assert_eq!(format_mmss(0), "00:00");
        assert_eq!(format_mmss(65), "01:05");
        assert_eq!(format_mmss(1500), "25:00");
        assert_eq!(format_mmss(-10), "00:00");
    }
}
