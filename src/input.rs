/// Parsing of typed durations, adjustments and dates.
use chrono::NaiveDate;

use crate::error::InputError;

/// Parses `90`, `1:30` or `01:30` into seconds.
pub fn parse_duration(value: &str) -> Result<u64, InputError> {
    let raw = value.trim();
    parse_unsigned(raw).ok_or_else(|| InputError::InvalidDuration(value.to_string()))
}

/// Parses a signed adjustment: `+30`, `-1:30`, `45`.
pub fn parse_adjustment(value: &str) -> Result<i64, InputError> {
    let raw = value.trim();
    let invalid = || InputError::InvalidAdjustment(value.to_string());
    let (sign, rest) = match raw.chars().next() {
        Some('-') => (-1, &raw[1..]),
        Some('+') => (1, &raw[1..]),
        Some(_) => (1, raw),
        None => return Err(invalid()),
    };
    let seconds = parse_unsigned(rest.trim()).ok_or_else(invalid)?;
    let seconds = i64::try_from(seconds).map_err(|_| invalid())?;
    Ok(sign * seconds)
}

fn parse_unsigned(raw: &str) -> Option<u64> {
    if raw.is_empty() {
        return None;
    }
    match raw.split_once(':') {
        Some((minutes, seconds)) => {
            let minutes = parse_digits(minutes)?;
            let seconds = parse_digits(seconds)?;
            if seconds >= 60 {
                return None;
            }
            minutes.checked_mul(60)?.checked_add(seconds)
        }
        None => parse_digits(raw),
    }
}

fn parse_digits(raw: &str) -> Option<u64> {
    if raw.is_empty() || !raw.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    raw.parse().ok()
}

pub fn parse_day(value: &str) -> Result<NaiveDate, InputError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|_| InputError::InvalidDate(value.to_string()))
}

/// Parses `YYYY-MM` into a (year, 1-based month) pair.
pub fn parse_month(value: &str) -> Result<(i32, u32), InputError> {
    let invalid = || InputError::InvalidMonth(value.to_string());
    let (year, month) = value.trim().split_once('-').ok_or_else(invalid)?;
    let year: i32 = year.parse().map_err(|_| invalid())?;
    let month: u32 = month.parse().map_err(|_| invalid())?;
    if !(1..=12).contains(&month) {
        return Err(invalid());
    }
    Ok((year, month))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn durations_accept_seconds_and_minutes() {
        assert_eq!(parse_duration("90"), Ok(90));
        assert_eq!(parse_duration("1:30"), Ok(90));
        assert_eq!(parse_duration(" 02:05 "), Ok(125));
    }

    #[test]
    fn durations_reject_garbage() {
        assert_matches!(parse_duration("abc"), Err(InputError::InvalidDuration(_)));
        assert_matches!(parse_duration("1:75"), Err(InputError::InvalidDuration(_)));
        assert_matches!(parse_duration("-5"), Err(InputError::InvalidDuration(_)));
        assert_matches!(parse_duration(""), Err(InputError::InvalidDuration(_)));
    }

    #[test]
    fn adjustments_are_signed() {
        assert_eq!(parse_adjustment("+30"), Ok(30));
        assert_eq!(parse_adjustment("-1:30"), Ok(-90));
        assert_eq!(parse_adjustment("45"), Ok(45));
        assert_matches!(parse_adjustment("-"), Err(InputError::InvalidAdjustment(_)));
        assert_matches!(parse_adjustment("ten"), Err(InputError::InvalidAdjustment(_)));
    }

    #[test]
    fn months_are_validated() {
        assert_eq!(parse_month("2024-03"), Ok((2024, 3)));
        assert_matches!(parse_month("2024-13"), Err(InputError::InvalidMonth(_)));
        assert_matches!(parse_day("2024-02-30"), Err(InputError::InvalidDate(_)));
    }
}
