use super::error::ResolveError;

const DAY_NAMES: [&str; 6] = [
    "monday",
    "tuesday",
    "wednesday",
    "thursday",
    "friday",
    "saturday",
];

/// Maps a free-text day token to 1 (Monday) .. 6 (Saturday).
///
/// Accepts full names and three-letter abbreviations, case-insensitively.
pub fn normalize_day(token: &str) -> Result<u8, ResolveError> {
    let t = token.trim().to_lowercase();
    for (i, name) in DAY_NAMES.iter().enumerate() {
        if t == *name || (t.len() == 3 && name.starts_with(t.as_str())) {
            return Ok(i as u8 + 1);
        }
    }
    Err(ResolveError::InvalidDay {
        token: token.trim().to_string(),
    })
}

pub fn day_label(day_of_week: u8) -> &'static str {
    match day_of_week {
        1 => "Monday",
        2 => "Tuesday",
        3 => "Wednesday",
        4 => "Thursday",
        5 => "Friday",
        6 => "Saturday",
        _ => "Unknown",
    }
}

pub fn parse_period(raw: &str, max_periods: u8) -> Result<u8, ResolveError> {
    let t = raw.trim();
    match t.parse::<i64>() {
        Ok(n) if n >= 1 && n <= max_periods as i64 => Ok(n as u8),
        _ => Err(ResolveError::InvalidPeriod {
            value: t.to_string(),
            max: max_periods,
        }),
    }
}

pub fn check_period(n: i64, max_periods: u8) -> Result<u8, ResolveError> {
    if n >= 1 && n <= max_periods as i64 {
        Ok(n as u8)
    } else {
        Err(ResolveError::InvalidPeriod {
            value: n.to_string(),
            max: max_periods,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn abbreviations_and_full_names() {
        assert_eq!(normalize_day("Tue"), Ok(2));
        assert_eq!(normalize_day("  MONDAY "), Ok(1));
        assert_eq!(normalize_day("sat"), Ok(6));
        assert_eq!(normalize_day("Thursday"), Ok(4));
    }

    #[test]
    fn unknown_tokens_fail() {
        assert_eq!(
            normalize_day("funday"),
            Err(ResolveError::InvalidDay {
                token: "funday".to_string()
            })
        );
        assert!(normalize_day("sunday").is_err());
        assert!(normalize_day("tues").is_err());
        assert!(normalize_day("mo").is_err());
        assert!(normalize_day("").is_err());
    }

    #[test]
    fn period_bounds() {
        assert_eq!(parse_period("8", 8), Ok(8));
        assert!(parse_period("9", 8).is_err());
        assert!(parse_period("0", 8).is_err());
        assert!(parse_period("two", 8).is_err());
        assert!(check_period(7, 6).is_err());
    }
}
