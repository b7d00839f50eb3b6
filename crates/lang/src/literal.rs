//! Classification of literal text into typed values.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Utc};

use crate::ast::{MonthDay, Operator, Value};
use crate::escape::{contains_wrap, resolve_escapes};
use crate::instant::{parse_instant_in, DateTimeError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LiteralKind {
    Number,
    DateTime,
    Date,
    Time,
    MonthDay,
    Year,
    EscapedString,
}

#[derive(Debug)]
pub(crate) enum LiteralError {
    UnknownValueType,
    DateTime(DateTimeError),
}

impl From<DateTimeError> for LiteralError {
    fn from(e: DateTimeError) -> Self {
        LiteralError::DateTime(e)
    }
}

fn digits(s: &str, n: usize) -> bool {
    s.len() == n && s.bytes().all(|b| b.is_ascii_digit())
}

fn is_date(s: &str) -> bool {
    s.len() == 10
        && s.is_ascii()
        && digits(&s[..4], 4)
        && &s[4..5] == "-"
        && digits(&s[5..7], 2)
        && &s[7..8] == "-"
        && digits(&s[8..], 2)
}

/// `HH:MM`, `HH:MM:SS` or `HH:MM:SS.fff`.
fn is_time(s: &str) -> bool {
    let parts: Vec<&str> = s.split(':').collect();
    match parts.as_slice() {
        [h, m] => digits(h, 2) && digits(m, 2),
        [h, m, sec] => {
            let (whole, fraction) = sec.split_once('.').unwrap_or((*sec, "0"));
            digits(h, 2)
                && digits(m, 2)
                && digits(whole, 2)
                && !fraction.is_empty()
                && fraction.bytes().all(|b| b.is_ascii_digit())
        }
        _ => false,
    }
}

pub(crate) fn is_number(s: &str) -> bool {
    let unsigned = s.strip_prefix('-').unwrap_or(s);
    let (whole, fraction) = match unsigned.split_once('.') {
        Some((whole, fraction)) => (whole, Some(fraction)),
        None => (unsigned, None),
    };
    let all_digits = |p: &str| !p.is_empty() && p.bytes().all(|b| b.is_ascii_digit());
    all_digits(whole) && fraction.map_or(true, all_digits)
}

fn classify(raw: &str) -> LiteralKind {
    if is_number(raw) {
        return LiteralKind::Number;
    }
    if raw.len() > 11 && raw.is_char_boundary(10) && is_date(&raw[..10]) && raw.as_bytes()[10] == b'T' {
        return LiteralKind::DateTime;
    }
    if is_date(raw) {
        return LiteralKind::Date;
    }
    if is_time(raw) {
        return LiteralKind::Time;
    }
    if let Some(year) = raw.strip_suffix("--").or_else(|| raw.strip_suffix('-')) {
        if digits(year, 4) {
            return LiteralKind::Year;
        }
    }
    let month_day = raw.strip_prefix("--").unwrap_or(raw);
    if month_day.len() == 5
        && month_day.is_ascii()
        && digits(&month_day[..2], 2)
        && &month_day[2..3] == "-"
        && digits(&month_day[3..], 2)
    {
        return LiteralKind::MonthDay;
    }
    LiteralKind::EscapedString
}

/// True if bare `raw` would be read back as a string.
pub(crate) fn reads_as_string(raw: &str) -> bool {
    !raw.is_empty() && classify(raw) == LiteralKind::EscapedString
}

/// Coerce literal text to a value. `operator` decides the LIKE contains-wrap.
pub(crate) fn coerce(raw: &str, quoted: bool, operator: Operator) -> Result<Value, LiteralError> {
    let kind = if quoted {
        LiteralKind::EscapedString
    } else {
        classify(raw)
    };
    tracing::trace!(raw, ?kind, "coercing literal");

    let invalid = || DateTimeError::InvalidFormat(raw.to_string());
    let value = match kind {
        LiteralKind::Number => number(raw)?,
        LiteralKind::EscapedString => string_or_boolean(raw, operator),
        LiteralKind::DateTime => datetime(raw)?,
        LiteralKind::Date => Value::Date(NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| invalid())?),
        LiteralKind::Time => {
            let format = if raw.len() == 5 { "%H:%M" } else { "%H:%M:%S%.f" };
            Value::Time(NaiveTime::parse_from_str(raw, format).map_err(|_| invalid())?)
        }
        LiteralKind::MonthDay => {
            let text = raw.trim_start_matches('-');
            let month = text[..2].parse().map_err(|_| invalid())?;
            let day = text[3..].parse().map_err(|_| invalid())?;
            Value::MonthDay(MonthDay::new(month, day).ok_or_else(invalid)?)
        }
        LiteralKind::Year => Value::Year(raw.trim_end_matches('-').parse().map_err(|_| invalid())?),
    };
    Ok(value)
}

/// Parse a NUMBER literal, integer or decimal.
pub(crate) fn number(raw: &str) -> Result<Value, LiteralError> {
    if raw.contains('.') {
        raw.parse()
            .map(Value::Double)
            .map_err(|_| LiteralError::UnknownValueType)
    } else {
        raw.parse()
            .map(Value::Long)
            .map_err(|_| LiteralError::UnknownValueType)
    }
}

fn string_or_boolean(raw: &str, operator: Operator) -> Value {
    match raw.to_lowercase().as_str() {
        "true" => return Value::Boolean(true),
        "false" => return Value::Boolean(false),
        _ => {}
    }
    let resolved = resolve_escapes(raw);
    if operator == Operator::Like {
        Value::String(contains_wrap(resolved))
    } else {
        Value::String(resolved)
    }
}

fn datetime(raw: &str) -> Result<Value, LiteralError> {
    let time = &raw[11..];
    let zoned = raw.ends_with('Z') || raw.ends_with(']') || time.contains(['+', '-']);
    if zoned {
        return Ok(Value::UtcInstant(parse_instant_in(raw, &Utc)?));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .map(Value::DateTime)
        .ok_or_else(|| DateTimeError::InvalidFormat(raw.to_string()).into())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eq(raw: &str) -> Value {
        coerce(raw, false, Operator::Eq).unwrap()
    }

    #[test]
    fn numbers() {
        assert_eq!(eq("10"), Value::Long(10));
        assert_eq!(eq("-3"), Value::Long(-3));
        assert_eq!(eq("10.5"), Value::Double(10.5));
        assert!(matches!(
            coerce("99999999999999999999", false, Operator::Eq),
            Err(LiteralError::UnknownValueType)
        ));
    }

    #[test]
    fn booleans_ignore_case() {
        assert_eq!(eq("TRUE"), Value::Boolean(true));
        assert_eq!(eq("false"), Value::Boolean(false));
        assert_eq!(eq("truth"), Value::String("truth".into()));
    }

    #[test]
    fn partial_dates() {
        assert_eq!(eq("12-01"), Value::MonthDay(MonthDay::new(12, 1).unwrap()));
        assert_eq!(eq("--02-29"), Value::MonthDay(MonthDay::new(2, 29).unwrap()));
        assert_eq!(eq("1995--"), Value::Year(1995));
        assert_eq!(eq("1995-"), Value::Year(1995));
        assert!(matches!(
            coerce("13-01", false, Operator::Eq),
            Err(LiteralError::DateTime(_))
        ));
    }

    #[test]
    fn dates_and_times() {
        assert_eq!(eq("2023-12-01"), Value::Date(NaiveDate::from_ymd_opt(2023, 12, 1).unwrap()));
        assert_eq!(eq("08:30"), Value::Time(NaiveTime::from_hms_opt(8, 30, 0).unwrap()));
        assert_eq!(eq("08:30:15"), Value::Time(NaiveTime::from_hms_opt(8, 30, 15).unwrap()));
        assert_eq!(
            eq("08:30:15.250"),
            Value::Time(NaiveTime::from_hms_milli_opt(8, 30, 15, 250).unwrap())
        );
        assert_eq!(eq("08:30:15."), Value::String("08:30:15.".into()));
    }

    #[test]
    fn datetime_zone_decides_variant() {
        assert!(matches!(eq("2023-11-02T15:22:45Z"), Value::UtcInstant(_)));
        assert!(matches!(eq("2023-11-02T15:22:45+02:00"), Value::UtcInstant(_)));
        assert!(matches!(eq("2023-11-02T15:22[Europe/Oslo]"), Value::UtcInstant(_)));
        let naive = NaiveDate::from_ymd_opt(2023, 11, 2)
            .unwrap()
            .and_hms_opt(15, 22, 45)
            .unwrap();
        assert_eq!(eq("2023-11-02T15:22:45"), Value::DateTime(naive));
    }

    #[test]
    fn like_wraps_plain_text() {
        assert_eq!(
            coerce("port", false, Operator::Like).unwrap(),
            Value::String("*port*".into())
        );
        assert_eq!(
            coerce("value$*", false, Operator::Like).unwrap(),
            Value::String("value**".into())
        );
        assert_eq!(
            coerce("port", false, Operator::Eq).unwrap(),
            Value::String("port".into())
        );
    }

    #[test]
    fn quoted_text_is_always_a_string() {
        assert_eq!(
            coerce("2023-12-01", true, Operator::Eq).unwrap(),
            Value::String("2023-12-01".into())
        );
    }
}
