//! Flexible parsing of absolute instants.
//!
//! Accepted forms, tried in order:
//!
//! - RFC 3339 (`2023-11-02T15:22:45.123Z`, `2023-11-02T15:22:45+01:00`)
//! - `yyyy-MM-ddTHH:mm[:ss][.fffffffff]` followed by one of
//!   - `±HH:MM`, `±HHMM`, `±HH` or `Z`
//!   - a bracketed region id, `[America/New_York]`
//!   - nothing, in which case the caller's default zone applies

use chrono::{
    DateTime, Duration, FixedOffset, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, Offset,
    TimeZone, Utc,
};
use chrono_tz::Tz;

/// Date/time parse failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DateTimeError {
    #[error("unrecognized date/time format: '{0}'")]
    InvalidFormat(String),
    #[error("unknown time zone '{0}'")]
    UnknownZone(String),
    #[error("invalid zone offset '{0}'")]
    InvalidOffset(String),
    #[error("local time '{0}' does not exist in the given zone")]
    NonexistentLocalTime(String),
}

/// Parse `input` into a UTC instant, anchoring local times to the system zone.
pub fn parse_instant(input: &str) -> Result<DateTime<Utc>, DateTimeError> {
    parse_instant_in(input, &chrono::Local)
}

/// Parse `input` into a UTC instant, anchoring local times to `default_zone`.
pub fn parse_instant_in<Z: TimeZone>(
    input: &str,
    default_zone: &Z,
) -> Result<DateTime<Utc>, DateTimeError> {
    if let Ok(instant) = DateTime::parse_from_rfc3339(input) {
        return Ok(instant.with_timezone(&Utc));
    }

    let (local, zone) = split_zone(input)?;
    let naive = parse_local(local).ok_or_else(|| DateTimeError::InvalidFormat(input.to_string()))?;

    match zone {
        ZonePart::Region(tz) => resolve_local(&tz, naive, input),
        ZonePart::Offset(offset) => resolve_local(&offset, naive, input),
        ZonePart::None => resolve_local(default_zone, naive, input),
    }
}

enum ZonePart {
    Region(Tz),
    Offset(FixedOffset),
    None,
}

fn split_zone(input: &str) -> Result<(&str, ZonePart), DateTimeError> {
    if let Some(stripped) = input.strip_suffix(']') {
        let open = stripped
            .rfind('[')
            .ok_or_else(|| DateTimeError::InvalidFormat(input.to_string()))?;
        let id = &stripped[open + 1..];
        let tz: Tz = id
            .parse()
            .map_err(|_| DateTimeError::UnknownZone(id.to_string()))?;
        return Ok((&stripped[..open], ZonePart::Region(tz)));
    }

    if let Some(local) = input.strip_suffix('Z') {
        return Ok((local, ZonePart::Offset(Utc.fix())));
    }

    // An offset sign can only appear after the time separator.
    let Some(time_start) = input.find('T') else {
        return Ok((input, ZonePart::None));
    };
    match input[time_start..].rfind(['+', '-']) {
        Some(rel) => {
            let at = time_start + rel;
            let offset = parse_offset(&input[at..])?;
            Ok((&input[..at], ZonePart::Offset(offset)))
        }
        None => Ok((input, ZonePart::None)),
    }
}

/// Parse `±HH:MM`, `±HHMM` or `±HH`, in that order of preference.
fn parse_offset(text: &str) -> Result<FixedOffset, DateTimeError> {
    let invalid = || DateTimeError::InvalidOffset(text.to_string());

    let (sign, digits) = match text.split_at(1) {
        ("+", rest) => (1, rest),
        ("-", rest) => (-1, rest),
        _ => return Err(invalid()),
    };

    let (hours, minutes) = if digits.len() == 5 && digits.as_bytes()[2] == b':' {
        (&digits[..2], &digits[3..])
    } else if digits.len() == 4 {
        (&digits[..2], &digits[2..])
    } else if digits.len() == 2 {
        (digits, "00")
    } else {
        return Err(invalid());
    };

    if !hours.bytes().chain(minutes.bytes()).all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    let hours: i32 = hours.parse().map_err(|_| invalid())?;
    let minutes: i32 = minutes.parse().map_err(|_| invalid())?;
    if hours > 18 || minutes > 59 {
        return Err(invalid());
    }

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60)).ok_or_else(invalid)
}

/// Parse `yyyy-MM-ddTHH:mm[:ss][.f{0,9}]`.
fn parse_local(text: &str) -> Option<NaiveDateTime> {
    let (date, time) = text.split_once('T')?;
    let date = NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()?;

    let (clock, fraction) = match time.split_once('.') {
        Some((clock, fraction)) => (clock, Some(fraction)),
        None => (time, None),
    };

    let clock = match clock.len() {
        5 => NaiveTime::parse_from_str(clock, "%H:%M").ok()?,
        8 => NaiveTime::parse_from_str(clock, "%H:%M:%S").ok()?,
        _ => return None,
    };

    let nanos = match fraction {
        Some(digits) => parse_fraction(digits)?,
        None => 0,
    };

    Some(date.and_time(clock) + Duration::nanoseconds(i64::from(nanos)))
}

fn parse_fraction(digits: &str) -> Option<u32> {
    if digits.len() > 9 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if digits.is_empty() {
        return Some(0);
    }
    let scale = 10u32.pow(9 - digits.len() as u32);
    digits.parse::<u32>().ok().map(|n| n * scale)
}

fn resolve_local<Z: TimeZone>(
    zone: &Z,
    naive: NaiveDateTime,
    input: &str,
) -> Result<DateTime<Utc>, DateTimeError> {
    match zone.from_local_datetime(&naive) {
        LocalResult::Single(dt) => Ok(dt.with_timezone(&Utc)),
        LocalResult::Ambiguous(earliest, _) => Ok(earliest.with_timezone(&Utc)),
        // Times inside a gap move forward by the length of the gap.
        LocalResult::None => zone
            .from_local_datetime(&(naive + Duration::hours(1)))
            .earliest()
            .map(|dt| dt.with_timezone(&Utc))
            .ok_or_else(|| DateTimeError::NonexistentLocalTime(input.to_string())),
    }
}
