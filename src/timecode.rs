//! # Timecodes
//!
//! Offsets into a video are given either as a number of seconds or as a
//! human-readable string in `H:MM:SS`, `MM:SS` or bare-seconds form.

use std::fmt;

use crate::error::ClipError;

/// An offset into a video, as it was written in the clip table
#[derive(Debug, Clone, PartialEq)]
pub enum TimeSpec {
    /// Plain number of seconds
    Seconds(f64),
    /// `H:MM:SS`, `MM:SS` or bare seconds
    Text(String),
}

impl TimeSpec {
    /// Resolve to seconds. See [`parse_time`].
    pub fn seconds(&self) -> Result<f64, ClipError> {
        match self {
            Self::Seconds(value) => {
                if !value.is_finite() {
                    return Err(ClipError::malformed_time(value.to_string(), "not a finite number"));
                }
                if *value < 0.0 {
                    return Err(ClipError::malformed_time(value.to_string(), "negative offset"));
                }
                Ok(*value)
            }
            Self::Text(text) => parse_text(text),
        }
    }
}

impl fmt::Display for TimeSpec {
    /// Writes the value as given, without normalizing it
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Seconds(value) => write!(f, "{}", value),
            Self::Text(text) => f.write_str(text),
        }
    }
}

impl From<f64> for TimeSpec {
    fn from(value: f64) -> Self {
        Self::Seconds(value)
    }
}

impl From<f32> for TimeSpec {
    fn from(value: f32) -> Self {
        Self::Seconds(f64::from(value))
    }
}

impl From<i32> for TimeSpec {
    fn from(value: i32) -> Self {
        Self::Seconds(f64::from(value))
    }
}

impl From<u32> for TimeSpec {
    fn from(value: u32) -> Self {
        Self::Seconds(f64::from(value))
    }
}

impl From<&str> for TimeSpec {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for TimeSpec {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// Convert a time specification to seconds
///
/// Numbers are returned unchanged. Strings made only of digits and at most
/// one decimal point are bare seconds; anything else is split on `:` and read
/// as `H:MM:SS` (three parts) or `MM:SS` (two parts). Hours and minutes are
/// whole numbers, seconds may carry a fraction. Out-of-range components such as
/// `1:75` are accepted and simply summed.
///
/// Negative values are rejected rather than clamped; clamping against the
/// source duration is left to the caller.
pub fn parse_time<T: Into<TimeSpec>>(value: T) -> Result<f64, ClipError> {
    value.into().seconds()
}

fn parse_text(raw: &str) -> Result<f64, ClipError> {
    let text = raw.trim();

    if is_bare_seconds(text) {
        return parse_seconds(raw, text);
    }

    let parts: Vec<&str> = text.split(':').map(str::trim).collect();
    match parts.as_slice() {
        [hours, minutes, seconds] => {
            let hours = parse_whole(raw, hours, "hours")?;
            let minutes = parse_whole(raw, minutes, "minutes")?;
            let seconds = parse_seconds(raw, seconds)?;
            Ok(hours * 3600.0 + minutes * 60.0 + seconds)
        }
        [minutes, seconds] => {
            let minutes = parse_whole(raw, minutes, "minutes")?;
            let seconds = parse_seconds(raw, seconds)?;
            Ok(minutes * 60.0 + seconds)
        }
        _ => Err(ClipError::malformed_time(
            raw,
            "expected H:MM:SS, MM:SS or a number of seconds",
        )),
    }
}

/// Digits with at most one decimal point, and at least one digit
fn is_bare_seconds(text: &str) -> bool {
    let mut dots = 0;
    let mut digits = 0;
    for c in text.chars() {
        match c {
            '0'..='9' => digits += 1,
            '.' => dots += 1,
            _ => return false,
        }
    }
    digits > 0 && dots <= 1
}

fn parse_seconds(raw: &str, text: &str) -> Result<f64, ClipError> {
    if !is_bare_seconds(text) {
        return Err(ClipError::malformed_time(raw, format!("invalid seconds '{}'", text)));
    }
    text.parse::<f64>()
        .map_err(|e| ClipError::malformed_time(raw, format!("invalid seconds '{}': {}", text, e)))
}

fn parse_whole(raw: &str, text: &str, component: &str) -> Result<f64, ClipError> {
    if text.is_empty() || !text.chars().all(|c| c.is_ascii_digit()) {
        return Err(ClipError::malformed_time(raw, format!("invalid {} '{}'", component, text)));
    }
    text.parse::<u64>()
        .map(|v| v as f64)
        .map_err(|e| ClipError::malformed_time(raw, format!("invalid {} '{}': {}", component, text, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ClipErrorKind;

    #[test]
    fn test_hours_minutes_seconds() {
        assert_eq!(parse_time("01:02:03").unwrap(), 3723.0);
        assert_eq!(parse_time("0:00:10.5").unwrap(), 10.5);
    }

    #[test]
    fn test_minutes_seconds() {
        assert_eq!(parse_time("02:03").unwrap(), 123.0);
        assert_eq!(parse_time("1:30").unwrap(), 90.0);
        // Components are summed, not range-checked
        assert_eq!(parse_time("1:75").unwrap(), 135.0);
    }

    #[test]
    fn test_bare_seconds() {
        assert_eq!(parse_time("45").unwrap(), 45.0);
        assert_eq!(parse_time(" 90 ").unwrap(), 90.0);
        assert_eq!(parse_time("12.25").unwrap(), 12.25);
    }

    #[test]
    fn test_numeric_values() {
        assert_eq!(parse_time(45).unwrap(), 45.0);
        assert_eq!(parse_time(2.5).unwrap(), 2.5);
        assert_eq!(parse_time(0u32).unwrap(), 0.0);
    }

    #[test]
    fn test_too_many_parts_rejected() {
        let err = parse_time("01:02:03:04").unwrap_err();
        assert_eq!(err.kind(), ClipErrorKind::MalformedTimeSpec);
        assert!(parse_time("1:2:3:4:5").is_err());
    }

    #[test]
    fn test_garbage_rejected() {
        assert!(parse_time("").is_err());
        assert!(parse_time(".").is_err());
        assert!(parse_time("1.2.3").is_err());
        assert!(parse_time("abc").is_err());
        assert!(parse_time("1:xx").is_err());
        assert!(parse_time("1::30").is_err());
    }

    #[test]
    fn test_negative_values_rejected() {
        assert!(parse_time(-5).is_err());
        assert!(parse_time("-5").is_err());
        assert!(parse_time("-1:30").is_err());
        assert!(parse_time(f64::NAN).is_err());
    }

    #[test]
    fn test_display_keeps_raw_text() {
        assert_eq!(TimeSpec::from("0:01:30").to_string(), "0:01:30");
        assert_eq!(TimeSpec::from(45).to_string(), "45");
    }
}
